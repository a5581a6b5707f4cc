// src/research/providers/mod.rs
//! Provider adapters. Each one turns a third-party response into a
//! `SourceRecord` and folds every provider failure into `FetchOutcome`.

pub mod brandfetch;
pub mod hunter;
pub mod linkedin;
pub mod news;
pub mod opencorporates;
pub mod web_scraper;

use std::sync::Arc;

use anyhow::Result;

use crate::config::ResearchConfig;
use crate::research::http::ProviderHttp;
use crate::research::types::{FieldValue, SourceAdapter};

pub use brandfetch::BrandfetchAdapter;
pub use hunter::HunterAdapter;
pub use linkedin::LinkedinAdapter;
pub use news::NewsAdapter;
pub use opencorporates::OpencorporatesAdapter;
pub use web_scraper::WebScraperAdapter;

/// All production adapters in registration order. Adapters without
/// credentials are still registered; they report `enabled() == false`.
pub fn standard_adapters(cfg: &ResearchConfig) -> Result<Vec<Arc<dyn SourceAdapter>>> {
    let http = ProviderHttp::new(&cfg.http, cfg.retry)?;
    let scraper_http =
        ProviderHttp::with_user_agent(&cfg.http, &cfg.http.scraper_user_agent, cfg.retry)?;

    Ok(vec![
        Arc::new(NewsAdapter::new(cfg, http.clone())),
        Arc::new(HunterAdapter::new(cfg, http.clone())),
        Arc::new(BrandfetchAdapter::new(cfg, http.clone())),
        Arc::new(OpencorporatesAdapter::new(cfg, http.clone())),
        Arc::new(LinkedinAdapter::new(cfg, http)),
        Arc::new(WebScraperAdapter::new(cfg, scraper_http)),
    ])
}

/// Non-blank text as a field value.
pub(crate) fn text(s: Option<&str>) -> Option<FieldValue> {
    s.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| FieldValue::Text(t.to_string()))
}

/// Non-empty string map as a field value.
pub(crate) fn string_map<I>(pairs: I) -> Option<FieldValue>
where
    I: IntoIterator<Item = (String, String)>,
{
    let m: std::collections::BTreeMap<String, FieldValue> = pairs
        .into_iter()
        .filter(|(_, v)| !v.trim().is_empty())
        .map(|(k, v)| (k, FieldValue::Text(v.trim().to_string())))
        .collect();
    (!m.is_empty()).then_some(FieldValue::Map(m))
}
