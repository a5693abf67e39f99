use serde_json::json;

use crate::error::AppError;
use crate::models::Page;
use crate::services::batch::BatchBuilder;
use crate::services::llm::LanguageModel;
use crate::services::store::DocumentStore;

/// Marker prefix written into every transplanted slide's provenance header.
/// Update mode keys off it (together with a hyperlink) to recognize slides
/// this pipeline created earlier.
pub const PROVENANCE_PREFIX: &str = "Source: ";

const SUBTITLE_MARKER: &str = "Generated by Gemini Code Assist";

const TITLE_SLIDE_ID: &str = "title_slide_01";
const TITLE_SHAPE_ID: &str = "title_shape_01";
const SUBTITLE_SHAPE_ID: &str = "subtitle_shape_01";
const AGENDA_SLIDE_ID: &str = "agenda_slide_01";
const AGENDA_TITLE_SHAPE_ID: &str = "agenda_title_shape_01";
const AGENDA_BODY_SHAPE_ID: &str = "agenda_body_shape_01";

/// Create mode: makes an empty deck, queues removal of its auto-created
/// default slide, then queues the title slide and an LLM-written agenda
/// slide. Transplanted slides land after these two. Returns the new deck id.
pub async fn seed_new_presentation(
    store: &dyn DocumentStore,
    llm: &dyn LanguageModel,
    title: &str,
    request_text: &str,
    batch: &mut BatchBuilder,
) -> Result<String, AppError> {
    let created = store.create_presentation(title).await?;
    let presentation_id = created.presentation_id.clone();

    if let Some(default_slide) = created.slides.first() {
        batch.push(json!({"deleteObject": {"objectId": default_slide.object_id}}));
    }

    batch.push(json!({
        "createSlide": {
            "objectId": TITLE_SLIDE_ID,
            "insertionIndex": 0,
            "slideLayoutReference": {"predefinedLayout": "TITLE"},
            "placeholderIdMappings": [
                {"layoutPlaceholder": {"type": "CENTERED_TITLE"}, "objectId": TITLE_SHAPE_ID},
                {"layoutPlaceholder": {"type": "SUBTITLE"}, "objectId": SUBTITLE_SHAPE_ID}
            ]
        }
    }));
    batch.push(json!({"insertText": {"objectId": TITLE_SHAPE_ID, "text": title}}));
    batch.push(json!({"insertText": {"objectId": SUBTITLE_SHAPE_ID, "text": SUBTITLE_MARKER}}));

    let agenda_prompt = format!(
        "Generate a concise, bulleted list for an agenda for a presentation about the \
         following topic: '{request_text}'. Do not add any introductory text, just the \
         bullet points."
    );
    let agenda_content = llm.generate(&agenda_prompt).await?;

    batch.push(json!({
        "createSlide": {
            "objectId": AGENDA_SLIDE_ID,
            "insertionIndex": 1,
            "slideLayoutReference": {"predefinedLayout": "TITLE_AND_BODY"},
            "placeholderIdMappings": [
                {"layoutPlaceholder": {"type": "TITLE"}, "objectId": AGENDA_TITLE_SHAPE_ID},
                {"layoutPlaceholder": {"type": "BODY"}, "objectId": AGENDA_BODY_SHAPE_ID}
            ]
        }
    }));
    batch.push(json!({"insertText": {"objectId": AGENDA_TITLE_SHAPE_ID, "text": "Agenda"}}));
    batch.push(json!({"insertText": {"objectId": AGENDA_BODY_SHAPE_ID, "text": agenda_content}}));

    Ok(presentation_id)
}

/// Update mode: fetches the existing deck and queues deletion of every
/// machine-generated slide past the first two. The title/agenda pair at
/// indices 0 and 1 is never touched; user-authored slides are left alone.
/// Deletions queue ahead of any transplant insertions, so recreated slides
/// cannot collide with the ids they replace.
pub async fn prepare_existing(
    store: &dyn DocumentStore,
    presentation_id: &str,
    batch: &mut BatchBuilder,
) -> Result<(), AppError> {
    let existing = store
        .get_presentation(presentation_id)
        .await
        .map_err(|err| AppError::TargetNotAccessible(err.to_string()))?;

    let mut deleted = 0usize;
    for slide in existing.slides.iter().skip(2) {
        if is_machine_generated(slide) {
            batch.push(json!({"deleteObject": {"objectId": slide.object_id}}));
            deleted += 1;
        }
    }
    tracing::info!(
        deleted,
        total = existing.slides.len(),
        "queued removal of machine-generated slides"
    );
    Ok(())
}

/// A slide counts as machine-generated when any text-bearing element both
/// starts with the provenance prefix and carries an active hyperlink on
/// some text run. Prefix alone is not enough; a user might type it.
pub fn is_machine_generated(slide: &Page) -> bool {
    slide.page_elements.iter().any(|element| {
        element.plain_text().starts_with(PROVENANCE_PREFIX) && element.has_link()
    })
}
