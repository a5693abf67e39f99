use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;

use crate::models::{AccessGrant, DriveFile, Page, Presentation};

const DRIVE_API_URL: &str = "https://www.googleapis.com/drive/v3";
const SLIDES_API_URL: &str = "https://slides.googleapis.com/v1";

const PRESENTATION_MIME: &str = "application/vnd.google-apps.presentation";
const SHORTCUT_MIME: &str = "application/vnd.google-apps.shortcut";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("http error: {0}")]
    Http(String),
    #[error("upstream returned status {status}: {detail}")]
    Api { status: u16, detail: String },
    #[error("decode error: {0}")]
    Decode(String),
}

/// Everything the pipeline needs from the document/storage backend. Kept as
/// a trait so the pipeline can run against a mock in tests.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Lists presentation documents in a folder, resolving shortcut
    /// pointers. Shortcut resolution failures are skipped with a warning.
    async fn resolve_folder(&self, folder_id: &str) -> Result<Vec<DriveFile>, StoreError>;

    async fn get_presentation(&self, presentation_id: &str) -> Result<Presentation, StoreError>;

    async fn get_slide(&self, presentation_id: &str, slide_id: &str) -> Result<Page, StoreError>;

    /// Creates an empty presentation and returns its full document tree,
    /// including the auto-created default slide.
    async fn create_presentation(&self, title: &str) -> Result<Presentation, StoreError>;

    /// Applies the accumulated operation list as one atomic edit.
    async fn batch_update(
        &self,
        presentation_id: &str,
        requests: Vec<Value>,
    ) -> Result<(), StoreError>;

    async fn grant_access(&self, file_id: &str, grant: &AccessGrant) -> Result<(), StoreError>;
}

/// Production store talking to the Drive and Slides REST APIs with a bearer
/// token. Token acquisition happens outside this service.
pub struct GoogleDocumentStore {
    client: reqwest::Client,
    token: String,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<RawDriveFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDriveFile {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    shortcut_details: Option<ShortcutDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShortcutDetails {
    #[serde(default)]
    target_id: Option<String>,
}

impl GoogleDocumentStore {
    pub fn new() -> anyhow::Result<Self> {
        let token = std::env::var("GOOGLE_ACCESS_TOKEN").unwrap_or_default();
        Ok(GoogleDocumentStore {
            client: reqwest::Client::new(),
            token,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, StoreError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;
        Self::decode(response).await
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        body: &Value,
    ) -> Result<T, StoreError> {
        let response = self
            .client
            .post(url)
            .query(query)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;
        Self::decode(response).await
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, StoreError> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(StoreError::Api {
                status: status.as_u16(),
                detail: text,
            });
        }
        serde_json::from_str(&text).map_err(|e| StoreError::Decode(e.to_string()))
    }
}

#[async_trait]
impl DocumentStore for GoogleDocumentStore {
    async fn resolve_folder(&self, folder_id: &str) -> Result<Vec<DriveFile>, StoreError> {
        let query = format!(
            "'{}' in parents and (mimeType='{}' or mimeType='{}') and trashed=false",
            folder_id, PRESENTATION_MIME, SHORTCUT_MIME
        );
        let listing: FileList = self
            .get_json(
                &format!("{}/files", DRIVE_API_URL),
                &[
                    ("q", query.as_str()),
                    ("fields", "files(id, name, mimeType, shortcutDetails)"),
                ],
            )
            .await?;

        let mut presentations = Vec::new();
        for file in listing.files {
            if file.mime_type == PRESENTATION_MIME {
                presentations.push(DriveFile {
                    id: file.id,
                    name: file.name,
                });
            } else if file.mime_type == SHORTCUT_MIME {
                let Some(target_id) = file.shortcut_details.and_then(|d| d.target_id) else {
                    continue;
                };
                match self
                    .get_json::<RawDriveFile>(
                        &format!("{}/files/{}", DRIVE_API_URL, target_id),
                        &[("fields", "id, name, mimeType")],
                    )
                    .await
                {
                    Ok(target) if target.mime_type == PRESENTATION_MIME => {
                        presentations.push(DriveFile {
                            id: target.id,
                            name: target.name,
                        });
                    }
                    Ok(_) => {}
                    Err(err) => {
                        tracing::warn!(
                            shortcut = %file.name,
                            target = %target_id,
                            "could not resolve shortcut: {err}"
                        );
                    }
                }
            }
        }
        Ok(presentations)
    }

    async fn get_presentation(&self, presentation_id: &str) -> Result<Presentation, StoreError> {
        self.get_json(
            &format!("{}/presentations/{}", SLIDES_API_URL, presentation_id),
            &[],
        )
        .await
    }

    async fn get_slide(&self, presentation_id: &str, slide_id: &str) -> Result<Page, StoreError> {
        self.get_json(
            &format!(
                "{}/presentations/{}/pages/{}",
                SLIDES_API_URL, presentation_id, slide_id
            ),
            &[],
        )
        .await
    }

    async fn create_presentation(&self, title: &str) -> Result<Presentation, StoreError> {
        self.post_json(
            &format!("{}/presentations", SLIDES_API_URL),
            &[],
            &json!({"title": title}),
        )
        .await
    }

    async fn batch_update(
        &self,
        presentation_id: &str,
        requests: Vec<Value>,
    ) -> Result<(), StoreError> {
        let _: Value = self
            .post_json(
                &format!(
                    "{}/presentations/{}:batchUpdate",
                    SLIDES_API_URL, presentation_id
                ),
                &[],
                &json!({"requests": requests}),
            )
            .await?;
        Ok(())
    }

    async fn grant_access(&self, file_id: &str, grant: &AccessGrant) -> Result<(), StoreError> {
        let url = format!("{}/files/{}/permissions", DRIVE_API_URL, file_id);
        let _: Value = match grant {
            AccessGrant::Writer { email } => {
                self.post_json(
                    &url,
                    &[("sendNotificationEmail", "true")],
                    &json!({"type": "user", "role": "writer", "emailAddress": email}),
                )
                .await?
            }
            AccessGrant::PublicReader => {
                self.post_json(&url, &[], &json!({"type": "anyone", "role": "reader"}))
                    .await?
            }
        };
        Ok(())
    }
}
