// src/research/providers/linkedin.rs
//! LinkedIn organization lookup by vanity name.
//!
//! Candidate handles are tried in order: an explicit handle (e.g. scraped
//! from the company site), the company-name slug, then the domain stem.
//! The first candidate LinkedIn knows wins. Follower stats are best effort.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::text;
use crate::config::ResearchConfig;
use crate::research::error::ProviderError;
use crate::research::http::{clean_domain, ProviderHttp};
use crate::research::types::{
    FetchOutcome, FieldValue, LookupTarget, RecordField, SourceAdapter, SourceId, SourceRecord,
};

const RESTLI_HEADER: &str = "X-Restli-Protocol-Version";
const RESTLI_VERSION: &str = "2.0.0";

#[derive(Debug, Deserialize)]
struct Organizations {
    #[serde(default)]
    elements: Vec<Organization>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Organization {
    id: Option<Value>,
    localized_name: Option<String>,
    staff_count: Option<StaffCount>,
    founded_on: Option<FoundedOn>,
    #[serde(default)]
    locations: Vec<OrgLocation>,
    description: Option<Localizable>,
    tagline: Option<Localizable>,
    specialties: Option<Value>,
    #[serde(default)]
    industries: Vec<Value>,
    company_type: Option<Localizable>,
    website: Option<Localizable>,
}

#[derive(Debug, Deserialize)]
struct StaffCount {
    range: Option<StaffRange>,
}

#[derive(Debug, Deserialize)]
struct StaffRange {
    #[serde(default)]
    start: i64,
    #[serde(default)]
    end: i64,
}

#[derive(Debug, Deserialize)]
struct FoundedOn {
    year: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrgLocation {
    location_type: Option<String>,
    address: Option<OrgAddress>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrgAddress {
    city: Option<String>,
    geographic_area: Option<String>,
    country: Option<String>,
}

/// LinkedIn fields arrive either as plain strings or as
/// `{"localized": {"en_US": ...}}` / `{"localizedName": ...}` objects.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Localizable {
    Plain(String),
    Object(Value),
}

impl Localizable {
    fn english(&self) -> Option<String> {
        match self {
            Localizable::Plain(s) => Some(s.clone()),
            Localizable::Object(v) => v
                .pointer("/localized/en_US")
                .or_else(|| v.get("localizedName"))
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageStats {
    follower_count: Option<i64>,
}

pub struct LinkedinAdapter {
    http: ProviderHttp,
    base: String,
    token: String,
}

impl LinkedinAdapter {
    pub fn new(cfg: &ResearchConfig, http: ProviderHttp) -> Self {
        Self {
            http,
            base: cfg.endpoints.linkedin.trim_end_matches('/').to_string(),
            token: cfg.credentials.linkedin_access_token.clone(),
        }
    }

    async fn by_vanity_name(&self, vanity: &str) -> Result<Option<Organization>, ProviderError> {
        let url = format!("{}/organizations", self.base);
        let orgs: Organizations = self
            .http
            .get_json("linkedin", |c| {
                c.get(&url)
                    .bearer_auth(&self.token)
                    .header(RESTLI_HEADER, RESTLI_VERSION)
                    .query(&[("q", "vanityName"), ("vanityName", vanity)])
            })
            .await?;
        Ok(orgs.elements.into_iter().next())
    }

    async fn follower_count(&self, org_id: &str) -> Option<i64> {
        let url = format!("{}/organizationPageStatistics/{}", self.base, org_id);
        let res: Result<PageStats, _> = self
            .http
            .get_json("linkedin", |c| {
                c.get(&url)
                    .bearer_auth(&self.token)
                    .header(RESTLI_HEADER, RESTLI_VERSION)
            })
            .await;
        match res {
            Ok(s) => s.follower_count,
            Err(e) => {
                tracing::debug!(target: "research", error = %e, "linkedin stats unavailable");
                None
            }
        }
    }
}

/// "Acme, Inc" -> "acme-inc"
pub fn name_slug(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .replace(',', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// "www.acme.co.uk" -> "acme"
pub fn domain_stem(domain: &str) -> String {
    let d = clean_domain(domain);
    let d = d.strip_prefix("www.").unwrap_or(&d);
    d.split('.').next().unwrap_or_default().to_string()
}

/// Vanity names to try, in order. A discovered handle is tried alone.
fn candidates(target: &LookupTarget) -> Vec<String> {
    if let Some(h) = target.handle.as_deref().map(str::trim).filter(|h| !h.is_empty()) {
        return vec![h.to_string()];
    }
    let mut out: Vec<String> = Vec::with_capacity(3);
    let mut push = |s: String| {
        if !s.is_empty() && !out.contains(&s) {
            out.push(s);
        }
    };
    push(name_slug(&target.company_name));
    if let Some(d) = &target.domain {
        push(domain_stem(d));
    }
    out
}

fn to_record(org: Organization, vanity: &str) -> SourceRecord {
    let mut r = SourceRecord::new(SourceId::Linkedin);
    let profile_url = format!("https://www.linkedin.com/company/{vanity}");

    r.set(RecordField::Name, text(org.localized_name.as_deref()));

    if let Some(range) = org.staff_count.and_then(|s| s.range) {
        let (employees, label) = if range.end > 0 {
            ((range.start + range.end) / 2, format!("{}-{}", range.start, range.end))
        } else {
            (range.start, format!("{}+", range.start))
        };
        r.set(RecordField::Employees, Some(FieldValue::Int(employees)));
        r.set(RecordField::EmployeeRange, Some(FieldValue::Text(label)));
    }

    r.set(
        RecordField::Description,
        text(org.description.and_then(|d| d.english()).as_deref()),
    );
    r.set(
        RecordField::Industry,
        org.industries.first().and_then(|v| match v {
            Value::String(s) => text(Some(s.as_str())),
            other => other
                .get("localizedName")
                .and_then(Value::as_str)
                .and_then(|s| text(Some(s))),
        }),
    );
    r.set(
        RecordField::Website,
        text(org.website.and_then(|w| w.english()).as_deref()),
    );
    r.set(
        RecordField::Founded,
        org.founded_on.and_then(|f| f.year).map(FieldValue::Int),
    );

    let hq = org
        .locations
        .iter()
        .find(|l| l.location_type.as_deref() == Some("HEADQUARTERS"))
        .or_else(|| org.locations.first())
        .and_then(|l| l.address.as_ref());
    if let Some(a) = hq {
        let loc: BTreeMap<String, FieldValue> = [
            ("city", a.city.as_deref()),
            ("state", a.geographic_area.as_deref()),
            ("country", a.country.as_deref()),
        ]
        .into_iter()
        .filter_map(|(k, v)| text(v).map(|fv| (k.to_string(), fv)))
        .collect();
        if !loc.is_empty() {
            r.set(RecordField::Location, Some(FieldValue::Map(loc)));
        }
    }

    r.set(
        RecordField::SocialMedia,
        Some(FieldValue::Map(BTreeMap::from([(
            "linkedin".to_string(),
            FieldValue::Text(profile_url.clone()),
        )]))),
    );

    r.set_extra("linkedin_id", org.id.as_ref().and_then(FieldValue::from_json));
    r.set_extra("vanity_name", text(Some(vanity)));
    r.set_extra("linkedin_url", Some(FieldValue::Text(profile_url)));
    r.set_extra(
        "specialties",
        org.specialties
            .as_ref()
            .map(|v| v.pointer("/localized/en_US").unwrap_or(v))
            .and_then(FieldValue::from_json)
            .filter(|v| !v.is_empty()),
    );
    r.set_extra(
        "company_type",
        text(org.company_type.and_then(|c| c.english()).as_deref()),
    );
    r.set_extra("tagline", text(org.tagline.and_then(|t| t.english()).as_deref()));
    r
}

#[async_trait]
impl SourceAdapter for LinkedinAdapter {
    fn source(&self) -> SourceId {
        SourceId::Linkedin
    }

    fn enabled(&self) -> bool {
        !self.token.is_empty()
    }

    async fn fetch(&self, target: &LookupTarget) -> FetchOutcome {
        for vanity in candidates(target) {
            match self.by_vanity_name(&vanity).await {
                Ok(Some(org)) => {
                    let mut record = to_record(org, &vanity);
                    let id = record
                        .extra
                        .get("linkedin_id")
                        .map(ToString::to_string)
                        .filter(|s| !s.is_empty());
                    if let Some(id) = id {
                        let followers = self.follower_count(&id).await;
                        record.set_extra("follower_count", followers.map(FieldValue::Int));
                    }
                    return FetchOutcome::Found(record);
                }
                Ok(None) | Err(ProviderError::NotFound) => {
                    tracing::debug!(target: "research", vanity = %vanity, "no linkedin organization");
                }
                Err(ProviderError::Unauthorized(_)) => {
                    return FetchOutcome::Failed("authentication failed".into());
                }
                Err(e) => return FetchOutcome::Failed(e.to_string()),
            }
        }
        FetchOutcome::NotFound
    }
}
