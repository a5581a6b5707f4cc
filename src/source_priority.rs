//! # Source Priority
//!
//! Static ranking of research providers used by the merge engine to pick a
//! single winner per field (higher wins).
//!
//! - Loads from JSON config (priorities + aliases).
//! - Case-insensitive lookup with normalization of punctuation, dashes, etc.
//! - Aliases map alternative provider names ("newsapi", "company_website")
//!   to canonical source names.
//! - Fallback order: aliases → exact match → default.
//! - Includes a built-in `default_seed()` mirroring the production ranking.
//!
//! Priority is a tie-break rank, not a reliability score; it never changes at runtime.

use serde::Deserialize;
use std::{collections::HashMap, fs, path::Path};

use crate::research::types::SourceId;

/// Priority table, loaded from JSON or defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct SourcePriorityTable {
    /// Priority for sources missing from the table.
    #[serde(default)]
    pub default_priority: i32,
    /// Explicit priorities for canonical source names.
    #[serde(default)]
    pub priorities: HashMap<String, i32>,
    /// Aliases mapping non-canonical names → canonical names.
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

impl Default for SourcePriorityTable {
    fn default() -> Self {
        Self::default_seed()
    }
}

impl SourcePriorityTable {
    /// Load the table from a JSON file.
    /// Falls back to `default_seed()` on error.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(s) => serde_json::from_str::<SourcePriorityTable>(&s)
                .map(Self::normalized)
                .unwrap_or_else(|e| {
                    tracing::warn!(path = %path.display(), error = %e, "bad priority table, using seed");
                    Self::default_seed()
                }),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "priority table unreadable, using seed");
                Self::default_seed()
            }
        }
    }

    /// Priority of a known source.
    pub fn priority_for(&self, source: SourceId) -> i32 {
        self.priority_for_name(source.as_str())
    }

    /// Priority for a free-form provider name.
    ///
    /// Steps:
    /// 1. Alias lookup (normalized) → canonical → priority.
    /// 2. Exact match.
    /// 3. Default priority.
    pub fn priority_for_name(&self, name: &str) -> i32 {
        let s = normalize(name);

        // 1) Alias resolution.
        if let Some(canon) = self.aliases.get(&s) {
            if let Some(&p) = self.priorities.get(&normalize(canon)) {
                return p;
            }
        }

        // 2) Exact match.
        if let Some(&p) = self.priorities.get(&s) {
            return p;
        }

        // 3) Default.
        self.default_priority
    }

    /// Override one source's priority (tests, per-deployment tuning).
    pub fn with_priority(mut self, source: SourceId, priority: i32) -> Self {
        self.priorities.insert(normalize(source.as_str()), priority);
        self
    }

    /// A table with no entries: every source gets `default_priority`.
    pub fn flat(default_priority: i32) -> Self {
        Self {
            default_priority,
            priorities: HashMap::new(),
            aliases: HashMap::new(),
        }
    }

    /// Built-in production ranking.
    pub(crate) fn default_seed() -> Self {
        let mut priorities = HashMap::new();
        let mut aliases = HashMap::new();

        for (k, v) in [
            ("linkedin", 11),
            ("brandfetch", 10),
            ("opencorporates", 9),
            ("hunter", 8),
            ("news", 6),
            ("web scraping", 4),
        ] {
            priorities.insert(k.to_string(), v);
        }

        for (a, c) in [
            ("newsapi", "news"),
            ("gnews", "news"),
            ("company website", "web scraping"),
            ("website", "web scraping"),
            ("scraper", "web scraping"),
            ("hunter io", "hunter"),
            ("open corporates", "opencorporates"),
            ("linked in", "linkedin"),
        ] {
            aliases.insert(a.to_string(), c.to_string());
        }

        Self {
            default_priority: 0,
            priorities,
            aliases,
        }
    }

    // Keys in a loaded file may use any spelling; store them normalized.
    fn normalized(self) -> Self {
        Self {
            default_priority: self.default_priority,
            priorities: self
                .priorities
                .into_iter()
                .map(|(k, v)| (normalize(&k), v))
                .collect(),
            aliases: self
                .aliases
                .into_iter()
                .map(|(k, v)| (normalize(&k), normalize(&v)))
                .collect(),
        }
    }
}

/// Normalize input string: lowercase, replace punctuation/dashes with spaces,
/// collapse multiple spaces into one.
fn normalize(s: &str) -> String {
    let mut out = s.trim().to_ascii_lowercase();

    // Replace common separators with spaces.
    for ch in ['—', '–', '-', '_', '/', '\\'] {
        out = out.replace(ch, " ");
    }

    out = out.replace(['\n', '\r', '\t', '.', ','], " ");

    // Collapse multiple spaces.
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}
