// src/research/conflicts.rs
//! Advisory disagreement check on a few scalar fields. Runs over the same
//! source map as the merge engine but never influences which value wins.

use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::research::merge::{FieldMap, TargetField};
use crate::research::result::Conflict;
use crate::research::types::{FieldValue, SourceMap};

/// Fields most likely to disagree across providers.
pub const WATCHED: [TargetField; 3] = [TargetField::Name, TargetField::Employees, TargetField::Founded];

#[derive(Debug, Clone, Default)]
pub struct ConflictDetector {
    field_map: FieldMap,
}

impl ConflictDetector {
    pub fn new(field_map: FieldMap) -> Self {
        Self { field_map }
    }

    pub fn detect(&self, sources: &SourceMap) -> Vec<Conflict> {
        let mut out = Vec::new();

        for target in WATCHED {
            let mut values = BTreeMap::new();
            let mut distinct = BTreeSet::new();

            for r in sources.healthy() {
                let Some(field) = self.field_map.field_for(target, r.source) else {
                    continue;
                };
                let Some(v) = r.non_empty(field) else {
                    continue;
                };
                values.insert(r.source.to_string(), v.to_string());
                distinct.insert(normalize(target, v));
            }

            if distinct.len() > 1 {
                out.push(Conflict {
                    field: target.as_str().to_string(),
                    values,
                    description: format!("Conflicting {} values found", target.as_str()),
                });
            }
        }

        out
    }
}

/// Comparison key for a watched value.
///
/// Numbers and numeric text compare numerically, so `50`, `"50"` and `50.0`
/// are equal. Other text is trimmed, whitespace-collapsed and lowercased.
/// For `founded`, date text reduces to its leading four-digit year.
pub fn normalize(target: TargetField, v: &FieldValue) -> String {
    if target == TargetField::Founded {
        static RE_YEAR: OnceCell<Regex> = OnceCell::new();
        let re_year = RE_YEAR.get_or_init(|| Regex::new(r"^\s*(\d{4})(?:\D|$)").unwrap());
        if let Some(text) = v.as_text() {
            if let Some(c) = re_year.captures(text) {
                return c[1].to_string();
            }
        }
    }
    if let Some(n) = v.as_number() {
        return format_number(n);
    }
    v.to_string()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}
