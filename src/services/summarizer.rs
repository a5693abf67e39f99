use crate::error::AppError;
use crate::models::{Presentation, SlideRecord};
use crate::services::store::DocumentStore;

/// Placeholder kinds whose text counts as a slide title.
const TITLE_KINDS: [&str; 3] = ["TITLE", "CENTERED_TITLE", "SUBTITLE"];

/// Reduces one presentation to a flat list of slide records. Slides without
/// a title are left out. Slide numbers are 1-based positions in the deck,
/// counted over all slides, titled or not.
pub fn summarize(presentation: &Presentation, deck_name: &str) -> Vec<SlideRecord> {
    let mut records = Vec::new();
    for (index, slide) in presentation.slides.iter().enumerate() {
        let mut title = String::new();
        let mut body_parts: Vec<String> = Vec::new();
        for element in &slide.page_elements {
            match element.placeholder_kind() {
                Some(kind) if TITLE_KINDS.contains(&kind) => {
                    title = element.plain_text();
                }
                Some("BODY") => {
                    let text = element.plain_text();
                    if !text.is_empty() {
                        body_parts.push(text);
                    }
                }
                _ => {}
            }
        }
        if title.is_empty() {
            continue;
        }
        let content = if body_parts.is_empty() {
            None
        } else {
            Some(body_parts.join("\n"))
        };
        records.push(SlideRecord {
            title,
            content,
            source_deck_id: presentation.presentation_id.clone(),
            source_slide_id: slide.object_id.clone(),
            source_deck_name: deck_name.to_string(),
            slide_number: index + 1,
        });
    }
    records
}

/// Builds the candidate pool across every presentation in the folder, in
/// folder-listing order then per-deck slide order.
pub async fn build_pool(
    store: &dyn DocumentStore,
    folder_id: &str,
) -> Result<Vec<SlideRecord>, AppError> {
    let files = store.resolve_folder(folder_id).await?;
    if files.is_empty() {
        return Err(AppError::NoPresentationsFound(folder_id.to_string()));
    }

    let mut pool = Vec::new();
    for file in &files {
        let presentation = store.get_presentation(&file.id).await?;
        pool.extend(summarize(&presentation, &file.name));
    }
    if pool.is_empty() {
        return Err(AppError::NoTitledSlidesFound);
    }
    tracing::info!(
        decks = files.len(),
        candidates = pool.len(),
        "built candidate pool"
    );
    Ok(pool)
}
