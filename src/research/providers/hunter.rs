// src/research/providers/hunter.rs
//! Hunter.io domain search: organization name, email pattern and the
//! social handles Hunter has on file for a domain.

use async_trait::async_trait;
use serde::Deserialize;

use super::{string_map, text};
use crate::config::ResearchConfig;
use crate::research::http::{clean_domain, ProviderHttp};
use crate::research::types::{
    FetchOutcome, FieldValue, LookupKey, LookupTarget, RecordField, SourceAdapter, SourceId,
    SourceRecord,
};

#[derive(Debug, Deserialize)]
struct DomainSearch {
    data: Option<DomainData>,
}

#[derive(Debug, Default, Deserialize)]
struct DomainData {
    organization: Option<String>,
    pattern: Option<String>,
    emails_count: Option<i64>,
    headcount: Option<String>,
    #[serde(default)]
    emails: Vec<serde_json::Value>,
    twitter: Option<String>,
    facebook: Option<String>,
    linkedin: Option<String>,
}

pub struct HunterAdapter {
    http: ProviderHttp,
    base: String,
    api_key: String,
}

impl HunterAdapter {
    pub fn new(cfg: &ResearchConfig, http: ProviderHttp) -> Self {
        Self {
            http,
            base: cfg.endpoints.hunter.trim_end_matches('/').to_string(),
            api_key: cfg.credentials.hunter_api_key.clone(),
        }
    }
}

fn to_record(d: DomainData, domain: &str) -> SourceRecord {
    let mut r = SourceRecord::new(SourceId::Hunter).with(RecordField::Domain, domain);
    r.set(RecordField::Name, text(d.organization.as_deref()));
    r.set(RecordField::Employees, d.emails_count.map(FieldValue::Int));
    r.set(RecordField::EmployeeRange, text(d.headcount.as_deref()));
    r.set(
        RecordField::SocialMedia,
        string_map([
            ("twitter".to_string(), d.twitter.unwrap_or_default()),
            ("facebook".to_string(), d.facebook.unwrap_or_default()),
            ("linkedin".to_string(), d.linkedin.unwrap_or_default()),
        ]),
    );
    r.set_extra("email_pattern", text(d.pattern.as_deref()));
    r.set_extra("emails_found", Some(FieldValue::Int(d.emails.len() as i64)));
    r
}

#[async_trait]
impl SourceAdapter for HunterAdapter {
    fn source(&self) -> SourceId {
        SourceId::Hunter
    }

    fn enabled(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn keyed_on(&self) -> LookupKey {
        LookupKey::Domain
    }

    async fn fetch(&self, target: &LookupTarget) -> FetchOutcome {
        let Some(domain) = target.domain.as_deref().map(clean_domain).filter(|d| !d.is_empty())
        else {
            return FetchOutcome::NotFound;
        };
        let url = format!("{}/domain-search", self.base);

        let res: Result<DomainSearch, _> = self
            .http
            .get_json("hunter", |c| {
                c.get(&url)
                    .query(&[("domain", domain.as_str()), ("api_key", self.api_key.as_str())])
            })
            .await;

        match res {
            Ok(DomainSearch { data: Some(d) }) => FetchOutcome::Found(to_record(d, &domain)),
            Ok(DomainSearch { data: None }) => FetchOutcome::NotFound,
            Err(e) => FetchOutcome::from_error(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_domain_search_payload() {
        let d: DomainSearch = serde_json::from_str(
            r#"{"data": {
                "organization": "Acme Corp",
                "pattern": "{first}.{last}",
                "emails_count": 42,
                "emails": [{"value": "a@acme.com"}, {"value": "b@acme.com"}],
                "twitter": "acmecorp",
                "facebook": null,
                "linkedin": "https://www.linkedin.com/company/acme"
            }}"#,
        )
        .unwrap();
        let r = to_record(d.data.unwrap(), "acme.com");
        assert_eq!(r.get(RecordField::Name), Some(&FieldValue::from("Acme Corp")));
        assert_eq!(r.get(RecordField::Employees), Some(&FieldValue::Int(42)));
        assert_eq!(r.get(RecordField::Domain), Some(&FieldValue::from("acme.com")));
        let social = r.get(RecordField::SocialMedia).unwrap().as_map().unwrap();
        assert_eq!(social.len(), 2);
        assert!(!social.contains_key("facebook"));
        assert_eq!(r.extra["emails_found"], FieldValue::Int(2));
        assert_eq!(r.extra["email_pattern"], FieldValue::from("{first}.{last}"));
    }
}
