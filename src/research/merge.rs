// src/research/merge.rs
//! # Merge Engine
//! Pure consolidation of per-source records into one `ConsolidatedProfile`.
//! No I/O; the same source map always yields the same profile.
//!
//! Policy: for each target field, candidate sources (present, not failed, and
//! mapped for that field) are ranked by static priority, ties keeping the
//! source map's first-seen order. The first non-empty value wins.
//! `social_media` is a union instead: first writer per platform key wins.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::research::result::ConsolidatedProfile;
use crate::research::types::{FieldValue, RecordField, SourceId, SourceMap, SourceRecord};
use crate::source_priority::SourcePriorityTable;

/// Fields of the consolidated profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetField {
    Name,
    LegalName,
    Domain,
    Description,
    Founded,
    Employees,
    Revenue,
    Industry,
    Location,
    Status,
    Leadership,
    SocialMedia,
    Technologies,
}

impl TargetField {
    pub const ALL: [TargetField; 13] = [
        TargetField::Name,
        TargetField::LegalName,
        TargetField::Domain,
        TargetField::Description,
        TargetField::Founded,
        TargetField::Employees,
        TargetField::Revenue,
        TargetField::Industry,
        TargetField::Location,
        TargetField::Status,
        TargetField::Leadership,
        TargetField::SocialMedia,
        TargetField::Technologies,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetField::Name => "name",
            TargetField::LegalName => "legal_name",
            TargetField::Domain => "domain",
            TargetField::Description => "description",
            TargetField::Founded => "founded",
            TargetField::Employees => "employees",
            TargetField::Revenue => "revenue",
            TargetField::Industry => "industry",
            TargetField::Location => "location",
            TargetField::Status => "status",
            TargetField::Leadership => "leadership",
            TargetField::SocialMedia => "social_media",
            TargetField::Technologies => "technologies",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldMapError {
    #[error("field map has no entry for `{0}`")]
    MissingTarget(&'static str),

    #[error("field map lists `{1}` twice for `{0}`")]
    DuplicateSource(&'static str, SourceId),
}

/// Which record field of which source feeds each target field, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap {
    entries: BTreeMap<TargetField, Vec<(SourceId, RecordField)>>,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self::standard()
    }
}

impl FieldMap {
    /// Map with an empty entry for every target field.
    pub fn empty() -> Self {
        Self {
            entries: TargetField::ALL.into_iter().map(|t| (t, Vec::new())).collect(),
        }
    }

    /// Production mapping.
    pub fn standard() -> Self {
        use RecordField as R;
        use SourceId as S;
        use TargetField as T;

        Self::empty()
            .with_entry(
                T::Name,
                vec![
                    (S::Linkedin, R::Name),
                    (S::Brandfetch, R::Name),
                    (S::Hunter, R::Name),
                    (S::Opencorporates, R::Name),
                    (S::WebScraping, R::Name),
                ],
            )
            .with_entry(T::LegalName, vec![(S::Opencorporates, R::Name)])
            .with_entry(
                T::Domain,
                vec![
                    (S::Hunter, R::Domain),
                    (S::Brandfetch, R::Domain),
                    (S::Linkedin, R::Website),
                    (S::WebScraping, R::Domain),
                ],
            )
            .with_entry(
                T::Description,
                vec![
                    (S::Linkedin, R::Description),
                    (S::Brandfetch, R::Description),
                    (S::WebScraping, R::Description),
                ],
            )
            .with_entry(
                T::Founded,
                vec![(S::Linkedin, R::Founded), (S::Opencorporates, R::IncorporationDate)],
            )
            .with_entry(
                T::Employees,
                vec![(S::Linkedin, R::Employees), (S::Hunter, R::Employees)],
            )
            .with_entry(T::Revenue, Vec::new())
            .with_entry(
                T::Industry,
                vec![(S::Linkedin, R::Industry), (S::Brandfetch, R::Industry)],
            )
            .with_entry(
                T::Location,
                vec![(S::Linkedin, R::Location), (S::Opencorporates, R::RegisteredAddress)],
            )
            .with_entry(T::Status, vec![(S::Opencorporates, R::Status)])
            .with_entry(T::Leadership, vec![(S::Opencorporates, R::Leadership)])
            .with_entry(
                T::SocialMedia,
                vec![
                    (S::Linkedin, R::SocialMedia),
                    (S::Brandfetch, R::SocialMedia),
                    (S::Hunter, R::SocialMedia),
                    (S::WebScraping, R::SocialMedia),
                ],
            )
            .with_entry(T::Technologies, vec![(S::WebScraping, R::Technologies)])
    }

    pub fn with_entry(mut self, target: TargetField, sources: Vec<(SourceId, RecordField)>) -> Self {
        self.entries.insert(target, sources);
        self
    }

    /// Record field a source reports for `target`, if mapped.
    pub fn field_for(&self, target: TargetField, source: SourceId) -> Option<RecordField> {
        self.entries
            .get(&target)?
            .iter()
            .find(|(s, _)| *s == source)
            .map(|(_, f)| *f)
    }

    pub fn sources_for(&self, target: TargetField) -> &[(SourceId, RecordField)] {
        self.entries.get(&target).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every target has an entry, and no entry names the same source twice.
    pub fn validate(&self) -> Result<(), FieldMapError> {
        for target in TargetField::ALL {
            let Some(list) = self.entries.get(&target) else {
                return Err(FieldMapError::MissingTarget(target.as_str()));
            };
            for (i, (s, _)) in list.iter().enumerate() {
                if list[..i].iter().any(|(prev, _)| prev == s) {
                    return Err(FieldMapError::DuplicateSource(target.as_str(), *s));
                }
            }
        }
        Ok(())
    }

    /// Registered sources that feed no target field at all.
    pub fn unreferenced<'a>(&self, registered: impl IntoIterator<Item = &'a SourceId>) -> Vec<SourceId> {
        registered
            .into_iter()
            .copied()
            .filter(|s| !self.entries.values().any(|l| l.iter().any(|(x, _)| x == s)))
            .collect()
    }
}

/// Priority-based consolidation.
#[derive(Debug, Clone, Default)]
pub struct MergeEngine {
    priorities: SourcePriorityTable,
    field_map: FieldMap,
}

impl MergeEngine {
    pub fn new(priorities: SourcePriorityTable, field_map: FieldMap) -> Self {
        Self {
            priorities,
            field_map,
        }
    }

    pub fn field_map(&self) -> &FieldMap {
        &self.field_map
    }

    pub fn priorities(&self) -> &SourcePriorityTable {
        &self.priorities
    }

    pub fn consolidate(&self, sources: &SourceMap) -> ConsolidatedProfile {
        let mut p = ConsolidatedProfile::default();

        for target in TargetField::ALL {
            if target == TargetField::SocialMedia {
                p.social_media = self.merge_social_media(sources);
                continue;
            }
            let Some(value) = self.pick(target, sources) else {
                continue;
            };
            match target {
                TargetField::Name => p.name = text_of(value),
                TargetField::LegalName => p.legal_name = text_of(value),
                TargetField::Domain => p.domain = text_of(value),
                TargetField::Description => p.description = text_of(value),
                TargetField::Industry => p.industry = text_of(value),
                TargetField::Status => p.status = text_of(value),
                TargetField::Founded => p.founded = Some(value.clone()),
                TargetField::Employees => p.employees = Some(value.clone()),
                TargetField::Revenue => p.revenue = Some(value.clone()),
                TargetField::Location => p.location = map_of(value),
                TargetField::Leadership => p.leadership = list_of(value),
                TargetField::Technologies => p.technologies = list_of(value),
                TargetField::SocialMedia => {}
            }
        }

        p
    }

    /// Candidate (record, field) pairs for `target`, highest priority first.
    /// Stable: equal priorities keep source-map order.
    fn ranked<'a>(&self, target: TargetField, sources: &'a SourceMap) -> Vec<(&'a SourceRecord, RecordField)> {
        let mut candidates: Vec<(&SourceRecord, RecordField, i32)> = sources
            .healthy()
            .filter_map(|r| {
                self.field_map
                    .field_for(target, r.source)
                    .map(|f| (r, f, self.priorities.priority_for(r.source)))
            })
            .collect();
        candidates.sort_by(|a, b| b.2.cmp(&a.2));
        candidates.into_iter().map(|(r, f, _)| (r, f)).collect()
    }

    fn pick<'a>(&self, target: TargetField, sources: &'a SourceMap) -> Option<&'a FieldValue> {
        self.ranked(target, sources)
            .into_iter()
            .find_map(|(r, f)| r.non_empty(f))
    }

    // First writer wins per platform key; priority plays no part here.
    fn merge_social_media(&self, sources: &SourceMap) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        for r in sources.healthy() {
            let Some(field) = self.field_map.field_for(TargetField::SocialMedia, r.source) else {
                continue;
            };
            let Some(links) = r.get(field).and_then(FieldValue::as_map) else {
                continue;
            };
            for (platform, v) in links {
                if v.is_empty() || out.contains_key(platform) {
                    continue;
                }
                out.insert(platform.clone(), v.to_string().trim().to_string());
            }
        }
        out
    }
}

fn text_of(v: &FieldValue) -> String {
    v.to_string().trim().to_string()
}

fn map_of(v: &FieldValue) -> BTreeMap<String, FieldValue> {
    match v {
        FieldValue::Map(m) => m.clone(),
        other => BTreeMap::from([("address".to_string(), FieldValue::Text(text_of(other)))]),
    }
}

fn list_of(v: &FieldValue) -> Vec<FieldValue> {
    match v {
        FieldValue::List(items) => items.clone(),
        other => vec![other.clone()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> MergeEngine {
        MergeEngine::default()
    }

    #[test]
    fn standard_map_validates_and_covers_structured_sources() {
        let m = FieldMap::standard();
        assert_eq!(m.validate(), Ok(()));
        let unref = m.unreferenced(&SourceId::ALL);
        assert_eq!(unref, vec![SourceId::News]);
    }

    #[test]
    fn validation_catches_missing_and_duplicate_entries() {
        let mut m = FieldMap::standard();
        m.entries.remove(&TargetField::Revenue);
        assert_eq!(m.validate(), Err(FieldMapError::MissingTarget("revenue")));

        let m = FieldMap::standard().with_entry(
            TargetField::Name,
            vec![(SourceId::Hunter, RecordField::Name), (SourceId::Hunter, RecordField::LegalName)],
        );
        assert_eq!(
            m.validate(),
            Err(FieldMapError::DuplicateSource("name", SourceId::Hunter))
        );
    }

    #[test]
    fn legal_name_and_founded_come_from_registry_fields() {
        let map: SourceMap = vec![SourceRecord::new(SourceId::Opencorporates)
            .with(RecordField::Name, "ACME CORPORATION")
            .with(RecordField::IncorporationDate, "1999-03-01")
            .with(RecordField::RegisteredAddress, "1 Main St, Springfield")
            .with(RecordField::Status, "Active")]
        .into_iter()
        .collect();

        let p = engine().consolidate(&map);
        assert_eq!(p.name, "ACME CORPORATION");
        assert_eq!(p.legal_name, "ACME CORPORATION");
        assert_eq!(p.founded, Some(FieldValue::from("1999-03-01")));
        assert_eq!(p.status, "Active");
        assert_eq!(
            p.location.get("address"),
            Some(&FieldValue::from("1 Main St, Springfield"))
        );
    }

    #[test]
    fn failed_records_are_ignored() {
        let map: SourceMap = vec![
            SourceRecord::failed(SourceId::Linkedin, "HTTP 500"),
            SourceRecord::new(SourceId::WebScraping).with(RecordField::Name, "Acme"),
        ]
        .into_iter()
        .collect();
        assert_eq!(engine().consolidate(&map).name, "Acme");
    }

    #[test]
    fn unmapped_pairs_are_skipped() {
        // hunter's description is not mapped
        let map: SourceMap = vec![
            SourceRecord::new(SourceId::Hunter).with(RecordField::Description, "from hunter")
        ]
        .into_iter()
        .collect();
        assert_eq!(engine().consolidate(&map).description, "");
    }

    #[test]
    fn numbers_render_into_text_fields() {
        let map: SourceMap = vec![SourceRecord::new(SourceId::Brandfetch).with(RecordField::Name, 3)]
            .into_iter()
            .collect();
        assert_eq!(engine().consolidate(&map).name, "3");
    }

    #[test]
    fn single_value_wraps_into_list_fields() {
        let map: SourceMap = vec![
            SourceRecord::new(SourceId::WebScraping).with(RecordField::Technologies, "WordPress")
        ]
        .into_iter()
        .collect();
        assert_eq!(
            engine().consolidate(&map).technologies,
            vec![FieldValue::from("WordPress")]
        );
    }
}
