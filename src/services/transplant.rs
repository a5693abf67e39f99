use serde_json::json;

use crate::models::{Page, PageElement, SlideRecord};
use crate::services::batch::BatchBuilder;
use crate::services::store::DocumentStore;

/// Field masks keep the property updates away from read-only fields.
const SHAPE_PROPERTY_FIELDS: &str = "shapeBackgroundFill,outline,shadow";
const TEXT_STYLE_FIELDS: &str =
    "bold,italic,underline,strikethrough,fontFamily,fontSize,foregroundColor,backgroundColor";

/// Deterministic id remap for everything recreated in the target deck. The
/// prefix keeps ids unique within one batch and referenceable by the
/// operations that follow.
fn remapped_id(object_id: &str) -> String {
    format!("copied_{object_id}")
}

/// What happened to each selected record. Skips are per-slide only and
/// never fail the overall request.
#[derive(Debug)]
pub struct TransplantReport {
    pub copied: Vec<String>,
    pub skipped: Vec<SkippedSlide>,
}

#[derive(Debug)]
pub struct SkippedSlide {
    pub title: String,
    pub source_slide_id: String,
    pub reason: String,
}

/// Transplants every selected record in order. A record whose source slide
/// cannot be fetched is logged and skipped; operations already queued for
/// earlier records stay in the batch.
pub async fn transplant_all(
    store: &dyn DocumentStore,
    records: &[SlideRecord],
    batch: &mut BatchBuilder,
) -> TransplantReport {
    let mut report = TransplantReport {
        copied: Vec::new(),
        skipped: Vec::new(),
    };
    tracing::info!(slides = records.len(), "constructing transplant operations");
    for record in records {
        match store
            .get_slide(&record.source_deck_id, &record.source_slide_id)
            .await
        {
            Ok(source) => {
                emit_slide_operations(record, &source, batch);
                report.copied.push(record.title.clone());
            }
            Err(err) => {
                tracing::error!(
                    slide = %record.source_slide_id,
                    deck = %record.source_deck_id,
                    "could not copy slide: {err}"
                );
                report.skipped.push(SkippedSlide {
                    title: record.title.clone(),
                    source_slide_id: record.source_slide_id.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }
    report
}

/// Queues the full reconstruction of one source slide: the new slide, a
/// hyperlinked provenance header, the background fill, and a copy of every
/// non-placeholder element.
pub fn emit_slide_operations(record: &SlideRecord, source: &Page, batch: &mut BatchBuilder) {
    let new_slide_id = remapped_id(&record.source_slide_id);
    let header_shape_id = format!("title_for_{new_slide_id}");

    // Layout reference deliberately omitted: the target's master picks a
    // default, which survives custom themes that lack a BLANK layout.
    batch.push(json!({"createSlide": {"objectId": new_slide_id}}));

    batch.push(json!({
        "createShape": {
            "objectId": header_shape_id,
            "shapeType": "TEXT_BOX",
            "elementProperties": {
                "pageObjectId": new_slide_id,
                "size": {
                    "height": {"magnitude": 500000, "unit": "EMU"},
                    "width": {"magnitude": 8500000, "unit": "EMU"}
                },
                "transform": {
                    "scaleX": 1,
                    "scaleY": 1,
                    "translateX": 300000,
                    "translateY": 200000,
                    "unit": "EMU"
                }
            }
        }
    }));
    batch.push(json!({
        "insertText": {"objectId": header_shape_id, "text": record.provenance_text()}
    }));
    batch.push(json!({
        "updateTextStyle": {
            "objectId": header_shape_id,
            "style": {"link": {"url": record.source_link()}},
            "textRange": {"type": "ALL"},
            "fields": "link"
        }
    }));

    if let Some(fill) = source
        .slide_properties
        .as_ref()
        .and_then(|p| p.slide_background_fill.as_ref())
    {
        batch.push(json!({
            "updatePageProperties": {
                "objectId": new_slide_id,
                "pageProperties": {"pageBackgroundFill": fill},
                "fields": "pageBackgroundFill"
            }
        }));
    }

    for element in &source.page_elements {
        if element.placeholder_kind().is_some() {
            // Placeholder-bound elements come from the layout.
            continue;
        }
        emit_element_operations(element, &new_slide_id, batch);
    }
}

fn emit_element_operations(element: &PageElement, new_slide_id: &str, batch: &mut BatchBuilder) {
    let new_element_id = remapped_id(&element.object_id);

    if let Some(shape) = &element.shape {
        let shape_type = shape.shape_type.as_deref().unwrap_or("RECTANGLE");
        batch.push(json!({
            "createShape": {
                "objectId": new_element_id,
                "elementProperties": {
                    "pageObjectId": new_slide_id,
                    "size": element.size,
                    "transform": element.transform
                },
                "shapeType": shape_type
            }
        }));

        if let Some(properties) = &shape.shape_properties {
            batch.push(json!({
                "updateShapeProperties": {
                    "objectId": new_element_id,
                    "shapeProperties": properties,
                    "fields": SHAPE_PROPERTY_FIELDS
                }
            }));
        }

        let full_text = element.plain_text();
        if !full_text.is_empty() {
            batch.push(json!({
                "insertText": {
                    "objectId": new_element_id,
                    "text": full_text,
                    "insertionIndex": 0
                }
            }));
            // Per-run style variation is not preserved: the first styled
            // run is broadcast over the whole copied range.
            if let Some(style) = element.first_run_style() {
                batch.push(json!({
                    "updateTextStyle": {
                        "objectId": new_element_id,
                        "style": style,
                        "textRange": {"type": "ALL"},
                        "fields": TEXT_STYLE_FIELDS
                    }
                }));
            }
        }
    } else if let Some(image) = &element.image {
        if let Some(url) = &image.content_url {
            batch.push(json!({
                "createImage": {
                    "objectId": new_element_id,
                    "url": url,
                    "elementProperties": {
                        "pageObjectId": new_slide_id,
                        "size": element.size,
                        "transform": element.transform
                    }
                }
            }));
        }
    }
}
