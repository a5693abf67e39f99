use regex::Regex;

/// Pulls the folder identifier out of a drive folder URL.
pub fn extract_folder_id(url: &str) -> Option<String> {
    let re = Regex::new(r"/folders/([a-zA-Z0-9-_]+)").ok()?;
    re.captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Pulls the document identifier out of a presentation URL.
pub fn extract_presentation_id(url: &str) -> Option<String> {
    let re = Regex::new(r"/d/([a-zA-Z0-9-_]+)").ok()?;
    re.captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
