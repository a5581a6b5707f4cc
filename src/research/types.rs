// src/research/types.rs
//! Shared shapes for the research pipeline: provider identities, field values,
//! normalized per-source records and the adapter contract.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::research::error::ProviderError;

/// Known providers. The set is closed so the merge table can be checked against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    News,
    Hunter,
    Brandfetch,
    Opencorporates,
    Linkedin,
    WebScraping,
}

impl SourceId {
    pub const ALL: [SourceId; 6] = [
        SourceId::News,
        SourceId::Hunter,
        SourceId::Brandfetch,
        SourceId::Opencorporates,
        SourceId::Linkedin,
        SourceId::WebScraping,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::News => "news",
            SourceId::Hunter => "hunter",
            SourceId::Brandfetch => "brandfetch",
            SourceId::Opencorporates => "opencorporates",
            SourceId::Linkedin => "linkedin",
            SourceId::WebScraping => "web_scraping",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let want = s.trim().to_ascii_lowercase();
        SourceId::ALL
            .into_iter()
            .find(|id| id.as_str() == want)
            .ok_or_else(|| format!("unknown source: {s}"))
    }
}

/// A provider-native value. Null is never a value: absence is expressed by omission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    /// Empty string (after trim), empty list and empty map count as "no value".
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::List(v) => v.is_empty(),
            FieldValue::Map(m) => m.is_empty(),
            FieldValue::Bool(_) | FieldValue::Int(_) | FieldValue::Float(_) => false,
        }
    }

    /// Numeric reading of the value; numeric-looking text counts ("1,200" -> 1200).
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Int(n) => Some(*n as f64),
            FieldValue::Float(x) if x.is_finite() => Some(*x),
            FieldValue::Text(s) => {
                let t = s.trim().replace(',', "");
                if t.is_empty() {
                    return None;
                }
                t.parse::<f64>().ok().filter(|x| x.is_finite())
            }
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, FieldValue>> {
        match self {
            FieldValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Convert loosely-typed JSON into a value, dropping nulls at every level.
    pub fn from_json(v: &serde_json::Value) -> Option<FieldValue> {
        use serde_json::Value;
        match v {
            Value::Null => None,
            Value::Bool(b) => Some(FieldValue::Bool(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(FieldValue::Int)
                .or_else(|| n.as_f64().map(FieldValue::Float)),
            Value::String(s) => Some(FieldValue::Text(s.clone())),
            Value::Array(items) => Some(FieldValue::List(
                items.iter().filter_map(FieldValue::from_json).collect(),
            )),
            Value::Object(obj) => Some(FieldValue::Map(
                obj.iter()
                    .filter_map(|(k, v)| FieldValue::from_json(v).map(|fv| (k.clone(), fv)))
                    .collect(),
            )),
        }
    }

    /// Like `from_json`, but only keeps non-empty values. Used by adapters so that
    /// blank provider fields are omitted from records.
    pub fn non_empty_json(v: Option<&serde_json::Value>) -> Option<FieldValue> {
        v.and_then(FieldValue::from_json).filter(|fv| !fv.is_empty())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Int(n) => write!(f, "{n}"),
            FieldValue::Float(x) => {
                if x.fract() == 0.0 && x.abs() < 1e15 {
                    write!(f, "{}", *x as i64)
                } else {
                    write!(f, "{x}")
                }
            }
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::List(items) => {
                for (i, it) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{it}")?;
                }
                Ok(())
            }
            FieldValue::Map(m) => {
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Int(n)
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        FieldValue::Int(n as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(x: f64) -> Self {
        FieldValue::Float(x)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<Vec<FieldValue>> for FieldValue {
    fn from(v: Vec<FieldValue>) -> Self {
        FieldValue::List(v)
    }
}

impl From<BTreeMap<String, FieldValue>> for FieldValue {
    fn from(m: BTreeMap<String, FieldValue>) -> Self {
        FieldValue::Map(m)
    }
}

/// Field names an adapter may report. Canonical vocabulary first, then the
/// provider-native names the merge table refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordField {
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
    Website,
    IncorporationDate,
    EmployeeRange,
    RegisteredAddress,
}

/// One news article as surfaced to the plan generator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub published_at: String,
    /// Outlet name, e.g. "Reuters".
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub content: String,
}

/// Normalized output of one adapter. A failed adapter is the same shape with
/// `error` set and no data, so consumers test one key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub source: SourceId,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<RecordField, FieldValue>,
    /// Provider-specific extras (logo, email pattern, company number, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, FieldValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub news: Vec<NewsItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SourceRecord {
    pub fn new(source: SourceId) -> Self {
        Self {
            source,
            fields: BTreeMap::new(),
            extra: BTreeMap::new(),
            news: Vec::new(),
            error: None,
        }
    }

    pub fn failed(source: SourceId, reason: impl Into<String>) -> Self {
        Self {
            error: Some(reason.into()),
            ..Self::new(source)
        }
    }

    pub fn with(mut self, field: RecordField, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(field, value.into());
        self
    }

    pub fn with_extra(mut self, key: &str, value: impl Into<FieldValue>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    /// Insert only when a value is present.
    pub fn set(&mut self, field: RecordField, value: Option<FieldValue>) {
        if let Some(v) = value {
            self.fields.insert(field, v);
        }
    }

    pub fn set_extra(&mut self, key: &str, value: Option<FieldValue>) {
        if let Some(v) = value {
            self.extra.insert(key.to_string(), v);
        }
    }

    pub fn get(&self, field: RecordField) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    pub fn non_empty(&self, field: RecordField) -> Option<&FieldValue> {
        self.get(field).filter(|v| !v.is_empty())
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Per-request map from source to record, kept in first-seen order.
/// Inserting an existing source replaces its record in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceMap {
    entries: Vec<SourceRecord>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: SourceRecord) {
        match self.entries.iter_mut().find(|r| r.source == record.source) {
            Some(slot) => *slot = record,
            None => self.entries.push(record),
        }
    }

    pub fn get(&self, source: SourceId) -> Option<&SourceRecord> {
        self.entries.iter().find(|r| r.source == source)
    }

    pub fn contains(&self, source: SourceId) -> bool {
        self.get(source).is_some()
    }

    /// Records in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &SourceRecord> {
        self.entries.iter()
    }

    /// Records that carry data (no `error`).
    pub fn healthy(&self) -> impl Iterator<Item = &SourceRecord> {
        self.entries.iter().filter(|r| !r.is_error())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<SourceRecord> for SourceMap {
    fn from_iter<I: IntoIterator<Item = SourceRecord>>(iter: I) -> Self {
        let mut out = SourceMap::new();
        for r in iter {
            out.insert(r);
        }
        out
    }
}

impl Serialize for SourceMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for r in &self.entries {
            map.serialize_entry(r.source.as_str(), r)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SourceMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = SourceMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of source name to record")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<SourceMap, A::Error> {
                let mut out = SourceMap::new();
                while let Some((source, mut record)) =
                    access.next_entry::<SourceId, SourceRecord>()?
                {
                    record.source = source;
                    out.insert(record);
                }
                Ok(out)
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

/// What one adapter call produced.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Found(SourceRecord),
    NotFound,
    Failed(String),
}

impl FetchOutcome {
    /// Fold a provider error: 404-style misses become `NotFound`, the rest `Failed`.
    pub fn from_error(e: ProviderError) -> Self {
        match e {
            ProviderError::NotFound => FetchOutcome::NotFound,
            other => FetchOutcome::Failed(other.to_string()),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FetchOutcome::Found(_) => "found",
            FetchOutcome::NotFound => "not_found",
            FetchOutcome::Failed(_) => "failed",
        }
    }
}

/// What an adapter keys its lookup on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupKey {
    CompanyName,
    Domain,
}

/// Everything an adapter may key a lookup on for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTarget {
    pub company_name: String,
    /// Supplied or derived domain, if any.
    pub domain: Option<String>,
    /// Professional-network handle discovered elsewhere (e.g. scraped markup).
    pub handle: Option<String>,
}

impl LookupTarget {
    pub fn new(company_name: impl Into<String>, domain: Option<String>) -> Self {
        Self {
            company_name: company_name.into(),
            domain,
            handle: None,
        }
    }

    pub fn with_handle(&self, handle: impl Into<String>) -> Self {
        Self {
            handle: Some(handle.into()),
            ..self.clone()
        }
    }
}

/// Contract every provider adapter implements.
///
/// Adapters never panic or return errors to the caller: provider failures are
/// reported as `FetchOutcome::Failed`, explicit misses as `FetchOutcome::NotFound`.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> SourceId;

    /// False when the adapter's credential is missing; disabled adapters are skipped.
    fn enabled(&self) -> bool;

    fn keyed_on(&self) -> LookupKey {
        LookupKey::CompanyName
    }

    async fn fetch(&self, target: &LookupTarget) -> FetchOutcome;

    /// Optional officer/leadership lookup for a record this adapter produced.
    async fn fetch_leadership(&self, _record: &SourceRecord) -> Option<FieldValue> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_values() {
        assert!(FieldValue::from("  ").is_empty());
        assert!(FieldValue::List(vec![]).is_empty());
        assert!(FieldValue::Map(BTreeMap::new()).is_empty());
        assert!(!FieldValue::Int(0).is_empty());
        assert!(!FieldValue::from("x").is_empty());
    }

    #[test]
    fn numeric_reading_accepts_text() {
        assert_eq!(FieldValue::from("50").as_number(), Some(50.0));
        assert_eq!(FieldValue::from(" 1,200 ").as_number(), Some(1200.0));
        assert_eq!(FieldValue::Int(50).as_number(), Some(50.0));
        assert_eq!(FieldValue::from("fifty").as_number(), None);
        assert_eq!(FieldValue::from("NaN").as_number(), None);
    }

    #[test]
    fn from_json_drops_nulls() {
        let v = json!({"a": null, "b": [1, null, "x"], "c": 2.5});
        let fv = FieldValue::from_json(&v).unwrap();
        let m = fv.as_map().unwrap();
        assert!(!m.contains_key("a"));
        assert_eq!(
            m["b"],
            FieldValue::List(vec![FieldValue::Int(1), FieldValue::from("x")])
        );
        assert_eq!(m["c"], FieldValue::Float(2.5));
        assert_eq!(FieldValue::from_json(&json!(null)), None);
    }

    #[test]
    fn display_renders_whole_floats_as_integers() {
        assert_eq!(FieldValue::Float(120.0).to_string(), "120");
        assert_eq!(FieldValue::Float(1.5).to_string(), "1.5");
        assert_eq!(
            FieldValue::List(vec![FieldValue::from("a"), FieldValue::Int(2)]).to_string(),
            "a, 2"
        );
    }

    #[test]
    fn source_map_keeps_first_seen_order_on_replace() {
        let mut m = SourceMap::new();
        m.insert(SourceRecord::failed(SourceId::Linkedin, "boom"));
        m.insert(SourceRecord::new(SourceId::Hunter));
        m.insert(SourceRecord::new(SourceId::Linkedin).with(RecordField::Name, "Acme"));

        let order: Vec<_> = m.iter().map(|r| r.source).collect();
        assert_eq!(order, vec![SourceId::Linkedin, SourceId::Hunter]);
        assert!(!m.get(SourceId::Linkedin).unwrap().is_error());
    }

    #[test]
    fn source_map_serializes_as_ordered_object() {
        let m: SourceMap = vec![
            SourceRecord::new(SourceId::WebScraping).with(RecordField::Name, "Acme"),
            SourceRecord::failed(SourceId::Hunter, "HTTP 500: boom"),
        ]
        .into_iter()
        .collect();

        let s = serde_json::to_string(&m).unwrap();
        assert!(s.find("web_scraping").unwrap() < s.find("hunter").unwrap());
        assert!(s.contains(r#""error":"HTTP 500: boom""#));

        let back: SourceMap = serde_json::from_str(&s).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn source_id_parses_case_insensitively() {
        assert_eq!("LinkedIn".parse::<SourceId>(), Ok(SourceId::Linkedin));
        assert_eq!(" web_scraping ".parse::<SourceId>(), Ok(SourceId::WebScraping));
        assert!("clearbit".parse::<SourceId>().is_err());
    }

    #[test]
    fn not_found_error_folds_to_not_found() {
        assert_eq!(
            FetchOutcome::from_error(ProviderError::NotFound),
            FetchOutcome::NotFound
        );
        assert!(matches!(
            FetchOutcome::from_error(ProviderError::Timeout),
            FetchOutcome::Failed(_)
        ));
    }
}
