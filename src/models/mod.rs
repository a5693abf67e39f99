use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Incoming payload for the generate endpoint. Every field is optional at
/// the deserialization layer; the handler validates per action.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateRequest {
    pub customer_request: Option<String>,
    pub duration: Option<String>,
    pub source_folder_url: Option<String>,
    pub slides_to_update: Option<String>,
    pub slide_title: Option<String>,
    pub meeting_date: Option<String>,
    pub user_account: Option<String>,
    pub action: Option<String>,
    pub slides_data: Option<Vec<SlideData>>,
}

impl GenerateRequest {
    /// Effective title for a newly created deck: `slide_title` (falling back
    /// to `customer_request`), with the meeting date appended in parentheses
    /// when present.
    pub fn presentation_title(&self) -> String {
        let base = self
            .slide_title
            .as_deref()
            .or(self.customer_request.as_deref())
            .unwrap_or_default();
        match self.meeting_date.as_deref() {
            Some(date) => format!("{} ({})", base, date),
            None => base.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SlideData {
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub message: String,
    pub presentation_id: String,
    pub presentation_url: String,
    pub selected_slides: Vec<String>,
}

/// One slide from the source library, reduced to what selection and
/// transplanting need. Built once by the summarizer, immutable after.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlideRecord {
    pub title: String,
    pub content: Option<String>,
    pub source_deck_id: String,
    pub source_slide_id: String,
    pub source_deck_name: String,
    pub slide_number: usize,
}

impl SlideRecord {
    /// Header text placed on every transplanted slide. The `"Source: "`
    /// prefix doubles as the marker update mode uses to recognize
    /// machine-generated slides.
    pub fn provenance_text(&self) -> String {
        format!(
            "Source: {} (Slide {})",
            self.source_deck_name, self.slide_number
        )
    }

    /// Deep link back to the original slide.
    pub fn source_link(&self) -> String {
        format!(
            "https://docs.google.com/presentation/d/{}/edit#slide=id.{}",
            self.source_deck_id, self.source_slide_id
        )
    }
}

/// A presentation document resolved from a source folder.
#[derive(Debug, Clone, PartialEq)]
pub struct DriveFile {
    pub id: String,
    pub name: String,
}

/// Who gets access to a freshly created deck after commit.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessGrant {
    /// Named account, writer role, notified by email.
    Writer { email: String },
    /// Anyone with the link, reader role.
    PublicReader,
}

// Raw document tree as the slides service returns it. Opaque fragments the
// pipeline only ever copies verbatim (fills, transforms, run styles) stay
// as `Value`.

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presentation {
    #[serde(default)]
    pub presentation_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slides: Vec<Page>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    #[serde(default)]
    pub object_id: String,
    #[serde(default)]
    pub page_elements: Vec<PageElement>,
    #[serde(default)]
    pub slide_properties: Option<SlideProperties>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideProperties {
    #[serde(default)]
    pub slide_background_fill: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageElement {
    #[serde(default)]
    pub object_id: String,
    #[serde(default)]
    pub size: Option<Value>,
    #[serde(default)]
    pub transform: Option<Value>,
    #[serde(default)]
    pub shape: Option<Shape>,
    #[serde(default)]
    pub image: Option<Image>,
}

impl PageElement {
    /// Concatenated text-run content of this element, trimmed. Empty string
    /// when the element carries no text.
    pub fn plain_text(&self) -> String {
        let mut text = String::new();
        if let Some(content) = self.shape.as_ref().and_then(|s| s.text.as_ref()) {
            for text_element in &content.text_elements {
                if let Some(run) = &text_element.text_run {
                    if let Some(chunk) = &run.content {
                        text.push_str(chunk);
                    }
                }
            }
        }
        text.trim().to_string()
    }

    /// True when any text run on this element carries an active hyperlink.
    pub fn has_link(&self) -> bool {
        self.shape
            .as_ref()
            .and_then(|s| s.text.as_ref())
            .is_some_and(|content| {
                content.text_elements.iter().any(|te| {
                    te.text_run
                        .as_ref()
                        .and_then(|run| run.style.as_ref())
                        .and_then(|style| style.get("link"))
                        .is_some_and(|link| !link.is_null())
                })
            })
    }

    /// Style of the first text run that carries one. The transplanter
    /// broadcasts it across the whole copied range.
    pub fn first_run_style(&self) -> Option<&Value> {
        self.shape
            .as_ref()
            .and_then(|s| s.text.as_ref())?
            .text_elements
            .iter()
            .find_map(|te| te.text_run.as_ref().and_then(|run| run.style.as_ref()))
    }

    /// Placeholder kind this element is bound to, if any.
    pub fn placeholder_kind(&self) -> Option<&str> {
        self.shape
            .as_ref()?
            .placeholder
            .as_ref()
            .map(|p| p.kind.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    #[serde(default)]
    pub shape_type: Option<String>,
    #[serde(default)]
    pub placeholder: Option<Placeholder>,
    #[serde(default)]
    pub text: Option<TextContent>,
    #[serde(default)]
    pub shape_properties: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Placeholder {
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextContent {
    #[serde(default)]
    pub text_elements: Vec<TextElement>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextElement {
    #[serde(default)]
    pub text_run: Option<TextRun>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRun {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub style: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    #[serde(default)]
    pub content_url: Option<String>,
}
