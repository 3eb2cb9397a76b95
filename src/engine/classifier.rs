use std::collections::HashMap;

use crate::types::Specialization;

/// Per-specialization pattern sets used to route tasks. Patterns are
/// either keyword substrings or `*.ext` file-extension globs. The
/// table is mutable between classifications, read-only during one.
#[derive(Debug, Clone)]
pub struct PatternTable {
    patterns: HashMap<Specialization, Vec<String>>,
}

impl PatternTable {
    /// Empty table: everything classifies as `General`.
    pub fn empty() -> Self {
        Self {
            patterns: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut table = Self::empty();

        for pattern in [
            "frontend", "ui", "css", "react", "component", "layout", "*.css", "*.tsx", "*.jsx",
            "*.html", "*.vue",
        ] {
            table.add_pattern(Specialization::Frontend, pattern);
        }
        for pattern in [
            "backend", "api", "endpoint", "server", "service", "auth", "*.go", "*.py", "*.java",
        ] {
            table.add_pattern(Specialization::Backend, pattern);
        }
        for pattern in [
            "database", "sql", "query", "migration", "schema", "postgres", "*.sql",
        ] {
            table.add_pattern(Specialization::Database, pattern);
        }
        for pattern in [
            "deploy", "docker", "kubernetes", "pipeline", "jenkins", "terraform", "infra",
            "*.yml", "*.yaml", "*.tf",
        ] {
            table.add_pattern(Specialization::Devops, pattern);
        }
        // General stays empty on purpose: it is the fallback, not a
        // scoring category.

        table
    }

    pub fn add_pattern(&mut self, specialization: Specialization, pattern: impl Into<String>) {
        self.patterns
            .entry(specialization)
            .or_default()
            .push(pattern.into().to_lowercase());
    }

    pub fn patterns(&self, specialization: Specialization) -> &[String] {
        self.patterns
            .get(&specialization)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Score the description and filenames against every pattern set
    /// and return the best tag. Keyword hits score 1; an extension
    /// glob hit on a filename scores 2, a concrete artifact type being
    /// stronger evidence than a word in prose. Ties keep the first tag
    /// in enumeration order; all zeros fall back to `General`.
    pub fn classify(&self, description: &str, files: &[String]) -> Specialization {
        let description = description.to_lowercase();

        let mut best = Specialization::General;
        let mut best_score = 0u32;

        for tag in Specialization::ALL {
            let mut score = 0u32;

            for pattern in self.patterns(tag) {
                if let Some(ext) = extension_of(pattern) {
                    for file in files {
                        if file.to_lowercase().ends_with(ext) {
                            score += 2;
                        }
                    }
                } else {
                    if description.contains(pattern.as_str()) {
                        score += 1;
                    }
                    for file in files {
                        if file.to_lowercase().contains(pattern.as_str()) {
                            score += 1;
                        }
                    }
                }
            }

            if score > best_score {
                best = tag;
                best_score = score;
            }
        }

        best
    }
}

impl Default for PatternTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// `*.ext` glob -> `.ext`; anything else is a keyword pattern.
fn extension_of(pattern: &str) -> Option<&str> {
    pattern.strip_prefix('*').filter(|rest| rest.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_inputs_are_general() {
        let table = PatternTable::with_defaults();
        assert_eq!(table.classify("", &[]), Specialization::General);
    }

    #[test]
    fn test_unmatched_description_is_general() {
        let table = PatternTable::with_defaults();
        assert_eq!(
            table.classify("water the office plants", &[]),
            Specialization::General
        );
    }

    #[test]
    fn test_keyword_match() {
        let table = PatternTable::with_defaults();
        assert_eq!(
            table.classify("write a migration for the users table", &[]),
            Specialization::Database
        );
    }

    #[test]
    fn test_description_is_case_insensitive() {
        let table = PatternTable::with_defaults();
        assert_eq!(
            table.classify("Deploy the Docker image", &[]),
            Specialization::Devops
        );
    }

    #[test]
    fn test_extension_outweighs_keyword() {
        // "api" gives backend 1 point; schema.sql gives database
        // 2 (glob) + 1 ("schema" substring of the filename).
        let table = PatternTable::with_defaults();
        let files = vec!["schema.sql".to_string()];
        assert_eq!(table.classify("api", &files), Specialization::Database);
    }

    #[test]
    fn test_filename_keyword_match() {
        let table = PatternTable::with_defaults();
        let files = vec!["docker-compose-prod".to_string()];
        assert_eq!(table.classify("", &files), Specialization::Devops);
    }

    #[test]
    fn test_tie_keeps_enumeration_order() {
        let mut table = PatternTable::empty();
        table.add_pattern(Specialization::Backend, "widget");
        table.add_pattern(Specialization::Frontend, "widget");

        // One point each; Frontend comes first in enumeration order.
        assert_eq!(
            table.classify("polish the widget", &[]),
            Specialization::Frontend
        );
    }

    #[test]
    fn test_runtime_pattern_addition() {
        let mut table = PatternTable::with_defaults();
        assert_eq!(table.classify("tune the flux capacitor", &[]), Specialization::General);

        table.add_pattern(Specialization::Devops, "flux capacitor");
        assert_eq!(table.classify("tune the flux capacitor", &[]), Specialization::Devops);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let table = PatternTable::with_defaults();
        let files = vec!["index.html".to_string(), "server.py".to_string()];
        let first = table.classify("refactor the api layout", &files);
        let second = table.classify("refactor the api layout", &files);
        assert_eq!(first, second);
    }

    #[test]
    fn test_general_never_scores() {
        let mut table = PatternTable::with_defaults();
        table.add_pattern(Specialization::General, "anything");
        // Even with a pattern registered under General, a Backend hit
        // must win: General is scanned last.
        assert_eq!(
            table.classify("anything touching the api", &[]),
            Specialization::Backend
        );
    }
}
