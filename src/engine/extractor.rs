use regex::Regex;
use std::sync::OnceLock;

/// Pulls classifiable features out of free-text task descriptions.
/// Swappable so the heuristic can be replaced without touching the
/// classifier or the assignment engine.
pub trait TaskFeatureExtractor: Send + Sync {
    fn extract_files(&self, description: &str) -> Vec<String>;
}

/// Default heuristic: any token that looks like a filename with a
/// short extension (`report.sql`, `index-v2.html`).
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexFileExtractor;

fn filename_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b[\w-]+\.[a-z]{2,4}\b").unwrap())
}

impl TaskFeatureExtractor for RegexFileExtractor {
    fn extract_files(&self, description: &str) -> Vec<String> {
        filename_pattern()
            .find_iter(description)
            .map(|m| m.as_str().to_string())
            .collect()
    }
}
