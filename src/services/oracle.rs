use regex::Regex;
use serde_json::{Value, json};

use crate::error::AppError;
use crate::models::SlideRecord;
use crate::services::llm::LanguageModel;

const SELECTED_SLIDES_KEY: &str = "selected_slides";

/// Asks the model to pick and order slides from the pool, then resolves the
/// returned titles back to records. One model call, no retry; an
/// undecodable response is terminal for the whole request.
pub async fn select(
    llm: &dyn LanguageModel,
    pool: Vec<SlideRecord>,
    request_text: &str,
    duration: &str,
) -> Result<Vec<SlideRecord>, AppError> {
    let titles: Vec<&str> = pool.iter().map(|r| r.title.as_str()).collect();
    let prompt = build_selection_prompt(request_text, duration, &titles);
    let response = llm.generate(&prompt).await?;
    let selected_titles = parse_selected_titles(&response)?;
    tracing::info!(
        proposed = selected_titles.len(),
        pool = pool.len(),
        "model proposed slide selection"
    );
    Ok(resolve_titles(pool, &selected_titles))
}

pub fn build_selection_prompt(request_text: &str, duration: &str, titles: &[&str]) -> String {
    format!(
        "You are a presentation strategist. A user wants to create a presentation deck. \
         Their request is: \"{request_text}\".\n\
         You have a library of all available slide titles. Select the most relevant titles \
         to create a coherent presentation for a {duration} presentation.\n\
         The user has provided an agenda for the new slide deck in their request. Think \
         carefully about your selected slides to ensure they match the agenda provided by \
         the user in their request.\n\
         Available Slides: {}\n\
         Return a JSON object with a single key \"{SELECTED_SLIDES_KEY}\" which is an array \
         of the selected slide titles in the optimal order.",
        json!(titles)
    )
}

/// Tolerant parse of the model response: a fenced ```json block wins, else
/// the whole trimmed body is tried as JSON. The object must carry the
/// `selected_slides` array.
pub fn parse_selected_titles(raw: &str) -> Result<Vec<String>, AppError> {
    let candidate = fenced_json_block(raw).unwrap_or_else(|| raw.trim().to_string());

    let parsed: Value = serde_json::from_str(&candidate).map_err(|_| AppError::OracleParse {
        raw: raw.to_string(),
    })?;
    let titles = parsed
        .get(SELECTED_SLIDES_KEY)
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::OracleParse {
            raw: raw.to_string(),
        })?;
    Ok(titles
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect())
}

fn fenced_json_block(raw: &str) -> Option<String> {
    let re = Regex::new(r"```json\s*(\{[\s\S]*?\})\s*```").ok()?;
    re.captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Maps chosen titles back to pool records in the model-given order.
/// First-match-wins, and a matched record is consumed so it can never be
/// picked twice; titles with no remaining match are dropped.
pub fn resolve_titles(pool: Vec<SlideRecord>, titles: &[String]) -> Vec<SlideRecord> {
    let mut remaining = pool;
    let mut selected = Vec::new();
    for title in titles {
        if let Some(position) = remaining.iter().position(|r| &r.title == title) {
            selected.push(remaining.remove(position));
        }
    }
    selected
}
