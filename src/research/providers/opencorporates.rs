// src/research/providers/opencorporates.rs
//! OpenCorporates registry search. The best of the first few hits by name
//! similarity becomes the record; officers are looked up on request.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;

use super::text;
use crate::config::ResearchConfig;
use crate::research::http::ProviderHttp;
use crate::research::types::{
    FetchOutcome, FieldValue, LookupTarget, RecordField, SourceAdapter, SourceId, SourceRecord,
};

const SEARCH_WINDOW: usize = 5;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    results: T,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(default)]
    companies: Vec<CompanyWrapper>,
}

#[derive(Debug, Deserialize)]
struct CompanyWrapper {
    company: Company,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Company {
    name: Option<String>,
    company_number: Option<String>,
    jurisdiction_code: Option<String>,
    incorporation_date: Option<String>,
    company_type: Option<String>,
    current_status: Option<String>,
    registered_address_in_full: Option<String>,
    opencorporates_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OfficerResults {
    #[serde(default)]
    officers: Vec<OfficerWrapper>,
}

#[derive(Debug, Deserialize)]
struct OfficerWrapper {
    officer: Officer,
}

#[derive(Debug, Deserialize)]
struct Officer {
    name: Option<String>,
    position: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    nationality: Option<String>,
    occupation: Option<String>,
}

impl Officer {
    fn into_value(self) -> Option<FieldValue> {
        let m: BTreeMap<String, FieldValue> = [
            ("name", self.name),
            ("position", self.position),
            ("start_date", self.start_date),
            ("end_date", self.end_date),
            ("nationality", self.nationality),
            ("occupation", self.occupation),
        ]
        .into_iter()
        .filter_map(|(k, v)| text(v.as_deref()).map(|fv| (k.to_string(), fv)))
        .collect();
        m.contains_key("name").then_some(FieldValue::Map(m))
    }
}

pub struct OpencorporatesAdapter {
    http: ProviderHttp,
    base: String,
    api_token: String,
}

impl OpencorporatesAdapter {
    pub fn new(cfg: &ResearchConfig, http: ProviderHttp) -> Self {
        Self {
            http,
            base: cfg.endpoints.opencorporates.trim_end_matches('/').to_string(),
            api_token: cfg.credentials.opencorporates_api_key.clone(),
        }
    }
}

/// Highest Jaro-Winkler similarity to the query among the first hits; ties keep the earlier hit.
fn best_match<'a>(query: &str, companies: &'a [Company]) -> Option<&'a Company> {
    let q = query.trim().to_lowercase();
    let mut best: Option<(&Company, f64)> = None;
    for c in companies.iter().take(SEARCH_WINDOW) {
        let name = c.name.as_deref().unwrap_or_default().to_lowercase();
        let score = strsim::jaro_winkler(&q, &name);
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((c, score));
        }
    }
    best.map(|(c, _)| c)
}

fn leading_year(date: &str) -> Option<i64> {
    let y = date.trim().get(..4)?;
    y.chars().all(|c| c.is_ascii_digit()).then(|| y.parse().ok())?
}

fn to_record(c: &Company) -> SourceRecord {
    let mut r = SourceRecord::new(SourceId::Opencorporates);
    r.set(RecordField::Name, text(c.name.as_deref()));
    r.set(RecordField::LegalName, text(c.name.as_deref()));
    r.set(RecordField::IncorporationDate, text(c.incorporation_date.as_deref()));
    r.set(
        RecordField::Founded,
        c.incorporation_date
            .as_deref()
            .and_then(leading_year)
            .map(FieldValue::Int),
    );
    r.set(RecordField::Status, text(c.current_status.as_deref()));
    r.set(
        RecordField::RegisteredAddress,
        text(c.registered_address_in_full.as_deref()),
    );
    r.set_extra("company_number", text(c.company_number.as_deref()));
    r.set_extra("jurisdiction", text(c.jurisdiction_code.as_deref()));
    r.set_extra("company_type", text(c.company_type.as_deref()));
    r.set_extra("url", text(c.opencorporates_url.as_deref()));
    r
}

#[async_trait]
impl SourceAdapter for OpencorporatesAdapter {
    fn source(&self) -> SourceId {
        SourceId::Opencorporates
    }

    fn enabled(&self) -> bool {
        !self.api_token.is_empty()
    }

    async fn fetch(&self, target: &LookupTarget) -> FetchOutcome {
        let url = format!("{}/companies/search", self.base);
        let per_page = SEARCH_WINDOW.to_string();
        let query = target.company_name.trim();

        let res: Result<Envelope<SearchResults>, _> = self
            .http
            .get_json("opencorporates", |c| {
                c.get(&url).query(&[
                    ("q", query),
                    ("per_page", per_page.as_str()),
                    ("api_token", self.api_token.as_str()),
                ])
            })
            .await;

        match res {
            Ok(env) => {
                let companies: Vec<Company> =
                    env.results.companies.into_iter().map(|w| w.company).collect();
                match best_match(query, &companies) {
                    Some(c) => FetchOutcome::Found(to_record(c)),
                    None => FetchOutcome::NotFound,
                }
            }
            Err(e) => FetchOutcome::from_error(e),
        }
    }

    async fn fetch_leadership(&self, record: &SourceRecord) -> Option<FieldValue> {
        let jurisdiction = record.extra.get("jurisdiction")?.as_text()?;
        let number = record.extra.get("company_number")?.as_text()?;
        let url = format!("{}/companies/{}/{}/officers", self.base, jurisdiction, number);

        let res: Result<Envelope<OfficerResults>, _> = self
            .http
            .get_json("opencorporates", |c| {
                c.get(&url).query(&[("api_token", self.api_token.as_str())])
            })
            .await;

        match res {
            Ok(env) => {
                let officers: Vec<FieldValue> = env
                    .results
                    .officers
                    .into_iter()
                    .filter_map(|w| w.officer.into_value())
                    .collect();
                (!officers.is_empty()).then_some(FieldValue::List(officers))
            }
            Err(e) => {
                tracing::warn!(target: "research", error = %e, "officer lookup failed");
                None
            }
        }
    }
}
