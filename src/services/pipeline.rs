use crate::error::AppError;
use crate::models::{GenerateRequest, GenerateResponse, SlideData};
use crate::services::batch::{self, BatchBuilder};
use crate::services::llm::LanguageModel;
use crate::services::oracle;
use crate::services::reconciler;
use crate::services::store::DocumentStore;
use crate::services::summarizer;
use crate::services::transplant;
use crate::utils;

fn require<'a>(field: &'a Option<String>, name: &'static str) -> Result<&'a str, AppError> {
    field
        .as_deref()
        .filter(|value| !value.trim().is_empty())
        .ok_or(AppError::MissingField(name))
}

/// Runs the whole pipeline for one request: pool, selection, target
/// reconciliation, transplant, one atomic commit, then sharing for freshly
/// created decks. All I/O is sequential; nothing is retried.
pub async fn generate_presentation(
    store: &dyn DocumentStore,
    llm: &dyn LanguageModel,
    payload: &GenerateRequest,
) -> Result<GenerateResponse, AppError> {
    let customer_request = require(&payload.customer_request, "customer_request")?;
    let duration = require(&payload.duration, "duration")?;
    let source_folder_url = require(&payload.source_folder_url, "source_folder_url")?;

    let folder_id =
        utils::extract_folder_id(source_folder_url).ok_or(AppError::InvalidFolderUrl)?;

    // Update-mode URL is validated before any upstream call is made.
    let update_target = match payload
        .slides_to_update
        .as_deref()
        .filter(|url| !url.trim().is_empty())
    {
        Some(url) => {
            let id =
                utils::extract_presentation_id(url).ok_or(AppError::InvalidPresentationUrl)?;
            Some((id, url.to_string()))
        }
        None => None,
    };

    let pool = summarizer::build_pool(store, &folder_id).await?;
    let selected = oracle::select(llm, pool, customer_request, duration).await?;
    let selected_titles: Vec<String> = selected.iter().map(|r| r.title.clone()).collect();

    let mut operations = BatchBuilder::new();
    let presentation_id = match &update_target {
        Some((id, _)) => {
            reconciler::prepare_existing(store, id, &mut operations).await?;
            id.clone()
        }
        None => {
            let title = payload.presentation_title();
            reconciler::seed_new_presentation(
                store,
                llm,
                &title,
                customer_request,
                &mut operations,
            )
            .await?
        }
    };

    let report = transplant::transplant_all(store, &selected, &mut operations).await;
    tracing::info!(
        copied = report.copied.len(),
        skipped = report.skipped.len(),
        "transplant operations queued"
    );
    for skipped in &report.skipped {
        tracing::warn!(
            slide = %skipped.source_slide_id,
            title = %skipped.title,
            "slide skipped: {}",
            skipped.reason
        );
    }

    batch::commit(store, &presentation_id, operations).await?;

    let updating = update_target.is_some();
    if !updating {
        let share_with = payload
            .user_account
            .clone()
            .or_else(|| std::env::var("DRIVE_SHARE_EMAIL").ok());
        batch::share(store, &presentation_id, share_with.as_deref()).await?;
    }

    let presentation_url = match update_target {
        Some((_, url)) => url,
        None => format!("https://docs.google.com/presentation/d/{presentation_id}/edit"),
    };
    tracing::info!(%presentation_url, "successfully processed presentation");

    Ok(GenerateResponse {
        message: if updating {
            "Presentation updated successfully".to_string()
        } else {
            "Presentation created successfully".to_string()
        },
        presentation_id,
        presentation_url,
        selected_slides: selected_titles,
    })
}

/// Speaker-notes action: one model call per slide, assembled under a
/// heading per input title so the output structure does not depend on the
/// model following instructions.
pub async fn generate_speaker_notes(
    llm: &dyn LanguageModel,
    payload: &GenerateRequest,
) -> Result<String, AppError> {
    let slides = payload
        .slides_data
        .as_deref()
        .filter(|slides| !slides.is_empty())
        .ok_or(AppError::MissingField("slides_data"))?;

    let mut notes = String::new();
    for slide in slides {
        notes.push_str(&format!("## {}\n\n", slide.title));
        notes.push_str(speaker_notes_body(llm, slide).await?.trim());
        notes.push_str("\n\n");
    }
    Ok(notes.trim_end().to_string())
}

async fn speaker_notes_body(
    llm: &dyn LanguageModel,
    slide: &SlideData,
) -> Result<String, AppError> {
    let context = slide
        .content
        .as_deref()
        .map(|content| format!(" The slide content is: \"{content}\"."))
        .unwrap_or_default();
    let prompt = format!(
        "Write concise speaker notes in markdown for a presentation slide titled \
         '{}'.{context} Return only the notes body, without a heading.",
        slide.title
    );
    Ok(llm.generate(&prompt).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccessGrant, DriveFile, Page, Presentation};
    use crate::services::llm::LlmError;
    use crate::services::store::StoreError;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct MockStore {
        files: Vec<DriveFile>,
        presentations: HashMap<String, Value>,
        pages: HashMap<(String, String), Value>,
        created: Option<Value>,
        batches: Mutex<Vec<(String, Vec<Value>)>>,
        grants: Mutex<Vec<(String, AccessGrant)>>,
        calls: AtomicUsize,
    }

    impl MockStore {
        fn submitted_ops(&self) -> Vec<Value> {
            self.batches
                .lock()
                .unwrap()
                .iter()
                .flat_map(|(_, ops)| ops.clone())
                .collect()
        }

        fn op_ids(&self, kind: &str) -> Vec<String> {
            self.submitted_ops()
                .iter()
                .filter_map(|op| op.get(kind))
                .filter_map(|body| body.get("objectId"))
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        }
    }

    #[async_trait]
    impl super::DocumentStore for MockStore {
        async fn resolve_folder(&self, _folder_id: &str) -> Result<Vec<DriveFile>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.files.clone())
        }

        async fn get_presentation(
            &self,
            presentation_id: &str,
        ) -> Result<Presentation, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let raw = self
                .presentations
                .get(presentation_id)
                .cloned()
                .ok_or(StoreError::Api {
                    status: 404,
                    detail: format!("presentation {presentation_id} not found"),
                })?;
            serde_json::from_value(raw).map_err(|e| StoreError::Decode(e.to_string()))
        }

        async fn get_slide(
            &self,
            presentation_id: &str,
            slide_id: &str,
        ) -> Result<Page, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let key = (presentation_id.to_string(), slide_id.to_string());
            let raw = self.pages.get(&key).cloned().ok_or(StoreError::Api {
                status: 404,
                detail: format!("slide {slide_id} not found"),
            })?;
            serde_json::from_value(raw).map_err(|e| StoreError::Decode(e.to_string()))
        }

        async fn create_presentation(&self, _title: &str) -> Result<Presentation, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let raw = self.created.clone().ok_or(StoreError::Api {
                status: 500,
                detail: "create not configured".to_string(),
            })?;
            serde_json::from_value(raw).map_err(|e| StoreError::Decode(e.to_string()))
        }

        async fn batch_update(
            &self,
            presentation_id: &str,
            requests: Vec<Value>,
        ) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.batches
                .lock()
                .unwrap()
                .push((presentation_id.to_string(), requests));
            Ok(())
        }

        async fn grant_access(
            &self,
            file_id: &str,
            grant: &AccessGrant,
        ) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.grants
                .lock()
                .unwrap()
                .push((file_id.to_string(), grant.clone()));
            Ok(())
        }
    }

    struct MockLlm {
        selection_response: String,
    }

    #[async_trait]
    impl LanguageModel for MockLlm {
        async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
            if prompt.contains("presentation strategist") {
                Ok(self.selection_response.clone())
            } else if prompt.contains("agenda for a presentation") {
                Ok("- Overview\n- Numbers\n- Next steps".to_string())
            } else if prompt.contains("speaker notes") {
                Ok("Remember to pause here.".to_string())
            } else {
                Err(LlmError::Response(format!("unexpected prompt: {prompt}")))
            }
        }
    }

    fn titled_slide(object_id: &str, title: &str) -> Value {
        json!({
            "objectId": object_id,
            "pageElements": [{
                "objectId": format!("{object_id}_title"),
                "shape": {
                    "placeholder": {"type": "TITLE"},
                    "text": {"textElements": [{"textRun": {"content": title}}]}
                }
            }]
        })
    }

    fn machine_generated_slide(object_id: &str) -> Value {
        json!({
            "objectId": object_id,
            "pageElements": [{
                "objectId": format!("{object_id}_hdr"),
                "shape": {"text": {"textElements": [{
                    "textRun": {
                        "content": "Source: Sales Library (Slide 2)",
                        "style": {"link": {"url": "https://docs.google.com/presentation/d/deck1/edit"}}
                    }
                }]}}
            }]
        })
    }

    fn library_store() -> MockStore {
        MockStore {
            files: vec![DriveFile {
                id: "deck1".to_string(),
                name: "Sales Library".to_string(),
            }],
            presentations: HashMap::from([(
                "deck1".to_string(),
                json!({
                    "presentationId": "deck1",
                    "slides": [titled_slide("s1", "Intro"), titled_slide("s2", "Pricing")]
                }),
            )]),
            pages: HashMap::from([
                (
                    ("deck1".to_string(), "s1".to_string()),
                    json!({"objectId": "s1", "pageElements": []}),
                ),
                (
                    ("deck1".to_string(), "s2".to_string()),
                    json!({"objectId": "s2", "pageElements": []}),
                ),
            ]),
            created: Some(json!({
                "presentationId": "new_pres",
                "slides": [{"objectId": "default_slide", "pageElements": []}]
            })),
            ..Default::default()
        }
    }

    fn create_payload() -> GenerateRequest {
        GenerateRequest {
            customer_request: Some("Q3 sales pitch".to_string()),
            duration: Some("15 minutes".to_string()),
            source_folder_url: Some(
                "https://drive.google.com/drive/folders/ABC123".to_string(),
            ),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_flow_orders_transplants_after_seed_slides() {
        let store = library_store();
        let llm = MockLlm {
            selection_response: r#"{"selected_slides": ["Pricing", "Intro"]}"#.to_string(),
        };

        let response = generate_presentation(&store, &llm, &create_payload())
            .await
            .unwrap();

        assert_eq!(response.message, "Presentation created successfully");
        assert_eq!(response.presentation_id, "new_pres");
        assert_eq!(response.selected_slides, vec!["Pricing", "Intro"]);
        assert_eq!(
            response.presentation_url,
            "https://docs.google.com/presentation/d/new_pres/edit"
        );

        // One atomic batch against the new deck.
        let batches = store.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].0, "new_pres");
        drop(batches);

        // Default slide deleted, then seed slides, then transplants in
        // oracle order.
        let deletes = store.op_ids("deleteObject");
        assert_eq!(deletes, vec!["default_slide"]);
        let creates = store.op_ids("createSlide");
        assert_eq!(
            creates,
            vec!["title_slide_01", "agenda_slide_01", "copied_s2", "copied_s1"]
        );

        // Create mode with no sharing target goes public read-only.
        let grants = store.grants.lock().unwrap();
        assert_eq!(
            *grants,
            vec![("new_pres".to_string(), AccessGrant::PublicReader)]
        );
    }

    #[tokio::test]
    async fn missing_duration_is_rejected_before_any_upstream_call() {
        let store = library_store();
        let llm = MockLlm {
            selection_response: String::new(),
        };
        let mut payload = create_payload();
        payload.duration = None;

        let err = generate_presentation(&store, &llm, &payload)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MissingField("duration")));
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn bad_folder_url_is_rejected_before_any_upstream_call() {
        let store = library_store();
        let llm = MockLlm {
            selection_response: String::new(),
        };
        let mut payload = create_payload();
        payload.source_folder_url = Some("https://drive.google.com/".to_string());

        let err = generate_presentation(&store, &llm, &payload)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidFolderUrl));
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn update_flow_deletes_only_machine_generated_slides_and_never_shares() {
        let mut store = library_store();
        store.presentations.insert(
            "existing1".to_string(),
            json!({
                "presentationId": "existing1",
                "slides": [
                    machine_generated_slide("t0"),
                    machine_generated_slide("t1"),
                    machine_generated_slide("old_copy"),
                    titled_slide("user_slide", "Hand-made notes")
                ]
            }),
        );
        let llm = MockLlm {
            selection_response: r#"{"selected_slides": ["Pricing"]}"#.to_string(),
        };
        let mut payload = create_payload();
        payload.slides_to_update =
            Some("https://docs.google.com/presentation/d/existing1/edit".to_string());

        let response = generate_presentation(&store, &llm, &payload).await.unwrap();

        assert_eq!(response.message, "Presentation updated successfully");
        assert_eq!(
            response.presentation_url,
            "https://docs.google.com/presentation/d/existing1/edit"
        );

        // First two slides survive even though they look machine-generated;
        // the user slide survives because it has no provenance marker.
        let deletes = store.op_ids("deleteObject");
        assert_eq!(deletes, vec!["old_copy"]);

        // Deletions precede insertions in the submitted batch.
        let ops = store.submitted_ops();
        let delete_pos = ops.iter().position(|op| op.get("deleteObject").is_some());
        let create_pos = ops.iter().position(|op| op.get("createSlide").is_some());
        assert!(delete_pos.unwrap() < create_pos.unwrap());

        assert!(store.grants.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unreadable_update_target_is_a_terminal_access_error() {
        let store = library_store();
        let llm = MockLlm {
            selection_response: r#"{"selected_slides": []}"#.to_string(),
        };
        let mut payload = create_payload();
        payload.slides_to_update =
            Some("https://docs.google.com/presentation/d/missing9/edit".to_string());

        let err = generate_presentation(&store, &llm, &payload)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TargetNotAccessible(_)));
        assert_eq!(err.status(), axum::http::StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn unfetchable_source_slide_is_skipped_not_fatal() {
        let mut store = library_store();
        store.pages.remove(&("deck1".to_string(), "s2".to_string()));
        let llm = MockLlm {
            selection_response: r#"{"selected_slides": ["Pricing", "Intro"]}"#.to_string(),
        };

        let response = generate_presentation(&store, &llm, &create_payload())
            .await
            .unwrap();

        // Selection still reports both; only the fetchable slide was copied.
        assert_eq!(response.selected_slides, vec!["Pricing", "Intro"]);
        let creates = store.op_ids("createSlide");
        assert!(creates.contains(&"copied_s1".to_string()));
        assert!(!creates.contains(&"copied_s2".to_string()));
    }

    #[tokio::test]
    async fn undecodable_oracle_response_is_a_500() {
        let store = library_store();
        let llm = MockLlm {
            selection_response: "I'd rather not say.".to_string(),
        };

        let err = generate_presentation(&store, &llm, &create_payload())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::OracleParse { .. }));
        assert_eq!(
            err.status(),
            axum::http::StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn empty_folder_is_a_resolution_error() {
        let mut store = library_store();
        store.files.clear();
        let llm = MockLlm {
            selection_response: String::new(),
        };

        let err = generate_presentation(&store, &llm, &create_payload())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NoPresentationsFound(_)));
    }

    #[tokio::test]
    async fn speaker_notes_carry_a_heading_per_slide() {
        let llm = MockLlm {
            selection_response: String::new(),
        };
        let payload = GenerateRequest {
            slides_data: Some(vec![
                SlideData {
                    title: "Market Overview".to_string(),
                    content: Some("TAM, SAM, SOM".to_string()),
                },
                SlideData {
                    title: "Pricing".to_string(),
                    content: None,
                },
            ]),
            ..Default::default()
        };

        let notes = generate_speaker_notes(&llm, &payload).await.unwrap();
        assert!(notes.contains("## Market Overview"));
        assert!(notes.contains("## Pricing"));
        assert!(notes.contains("Remember to pause here."));
    }

    #[tokio::test]
    async fn speaker_notes_require_slides_data() {
        let llm = MockLlm {
            selection_response: String::new(),
        };
        let err = generate_speaker_notes(&llm, &GenerateRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MissingField("slides_data")));
    }
}
