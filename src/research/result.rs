// src/research/result.rs
//! Request/response envelope of one research run.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::research::types::{FieldValue, NewsItem, SourceId, SourceMap};

fn default_true() -> bool {
    true
}

/// Input of `Aggregator::research`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchRequest {
    pub company_name: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default = "default_true")]
    pub include_news: bool,
    #[serde(default = "default_true")]
    pub include_officers: bool,
}

impl ResearchRequest {
    pub fn new(company_name: impl Into<String>) -> Self {
        Self {
            company_name: company_name.into(),
            domain: None,
            include_news: true,
            include_officers: true,
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn include_news(mut self, on: bool) -> Self {
        self.include_news = on;
        self
    }

    pub fn include_officers(mut self, on: bool) -> Self {
        self.include_officers = on;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchStatus {
    InProgress,
    Complete,
}

/// One canonical record. Unresolved fields keep their empty default; nothing is ever absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedProfile {
    pub name: String,
    pub legal_name: String,
    pub domain: String,
    pub description: String,
    pub founded: Option<FieldValue>,
    pub employees: Option<FieldValue>,
    pub revenue: Option<FieldValue>,
    pub industry: String,
    pub location: BTreeMap<String, FieldValue>,
    pub status: String,
    pub leadership: Vec<FieldValue>,
    pub social_media: BTreeMap<String, String>,
    pub technologies: Vec<FieldValue>,
}

impl ConsolidatedProfile {
    /// True when no field was resolved.
    pub fn is_empty(&self) -> bool {
        *self == ConsolidatedProfile::default()
    }
}

/// Disagreement between sources on a watched scalar field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub field: String,
    /// Source name -> value as that source reported it.
    pub values: BTreeMap<String, String>,
    pub description: String,
}

/// The envelope handed back to the plan generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchResult {
    pub company_name: String,
    pub research_date: DateTime<Utc>,
    /// Domain used for domain-keyed lookups (supplied or derived).
    pub domain_used: Option<String>,
    /// Successful sources, in completion order.
    pub sources_used: Vec<SourceId>,
    /// Raw per-source records, error-tagged ones included.
    pub data: SourceMap,
    pub news: Vec<NewsItem>,
    pub consolidated: ConsolidatedProfile,
    pub conflicts: Vec<Conflict>,
    pub status: ResearchStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults_include_everything() {
        let r: ResearchRequest = serde_json::from_str(r#"{"company_name":"Acme"}"#).unwrap();
        assert_eq!(r, ResearchRequest::new("Acme"));
        assert!(r.include_news && r.include_officers);
    }

    #[test]
    fn empty_profile_serializes_every_field() {
        let v = serde_json::to_value(ConsolidatedProfile::default()).unwrap();
        for key in [
            "name",
            "legal_name",
            "domain",
            "description",
            "founded",
            "employees",
            "revenue",
            "industry",
            "location",
            "status",
            "leadership",
            "social_media",
            "technologies",
        ] {
            assert!(v.get(key).is_some(), "missing {key}");
        }
        assert!(v["founded"].is_null());
        assert_eq!(v["name"], "");
        assert!(ConsolidatedProfile::default().is_empty());
    }
}
