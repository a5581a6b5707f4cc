// src/research/aggregator.rs
//! # Aggregator
//! Fans one research request out to every applicable adapter, each as its
//! own tokio task under a per-adapter timeout, then merges and checks the
//! collected per-source records.
//!
//! Waves:
//! 1. every enabled adapter that can key on what the request provides
//!    (the scraper too when `scrape_always`);
//! 2. fallback scrape when no structured source found anything;
//! 3. LinkedIn retry with a handle discovered by the scraper.
//!
//! Provider failures never escape: they become error-tagged records, and so
//! does an adapter task that panics. Only a cancelled task fails the request.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::join_all;
use metrics::{counter, gauge, histogram};
use serde::Serialize;
use thiserror::Error;

use crate::config::ResearchConfig;
use crate::research::conflicts::ConflictDetector;
use crate::research::ensure_metrics_described;
use crate::research::error::ResearchError;
use crate::research::http::clean_domain;
use crate::research::merge::{FieldMap, FieldMapError, MergeEngine};
use crate::research::providers::standard_adapters;
use crate::research::result::{ResearchRequest, ResearchResult, ResearchStatus};
use crate::research::types::{
    FetchOutcome, FieldValue, LookupKey, LookupTarget, RecordField, SourceAdapter, SourceId,
    SourceMap, SourceRecord,
};
use crate::source_priority::SourcePriorityTable;

const DEFAULT_ADAPTER_TIMEOUT: Duration = Duration::from_secs(15);

/// Social keys under which the scraper reports a LinkedIn company handle.
const LINKEDIN_HANDLE_KEYS: [&str; 2] = ["linkedin_vanity_name", "linkedin_id"];

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    FieldMap(#[from] FieldMapError),

    #[error("adapter `{0}` registered twice")]
    DuplicateAdapter(SourceId),
}

/// Registration-time view of one adapter (served by `/sources`).
#[derive(Debug, Clone, Serialize)]
pub struct AdapterStatus {
    pub source: SourceId,
    pub enabled: bool,
    pub keyed_on: LookupKey,
    pub priority: i32,
}

/// Result of one adapter task.
struct Completed {
    source: SourceId,
    outcome: FetchOutcome,
    finished: Instant,
    elapsed: Duration,
}

/// Per-request accumulator; lives only inside `research`.
#[derive(Default)]
struct Collected {
    map: SourceMap,
    attempted: Vec<SourceId>,
    found: Vec<(Instant, SourceId)>,
    structured_found: bool,
}

impl Collected {
    fn absorb(&mut self, calls: Vec<Completed>) {
        for c in calls {
            let label = c.outcome.label();
            let ms = c.elapsed.as_secs_f64() * 1_000.0;
            counter!("research_adapter_calls_total", "source" => c.source.as_str(), "outcome" => label)
                .increment(1);
            histogram!("research_adapter_ms", "source" => c.source.as_str()).record(ms);
            if !self.attempted.contains(&c.source) {
                self.attempted.push(c.source);
            }

            match c.outcome {
                FetchOutcome::Found(mut record) => {
                    tracing::info!(target: "research", source = %c.source, elapsed_ms = ms as u64, "source found");
                    record.source = c.source;
                    record.error = None;
                    if !matches!(c.source, SourceId::News | SourceId::WebScraping) {
                        self.structured_found = true;
                    }
                    self.found.retain(|(_, s)| *s != c.source);
                    self.found.push((c.finished, c.source));
                    self.map.insert(record);
                }
                FetchOutcome::NotFound => {
                    tracing::info!(target: "research", source = %c.source, elapsed_ms = ms as u64, "source has no match");
                }
                FetchOutcome::Failed(reason) => {
                    tracing::warn!(target: "research", source = %c.source, elapsed_ms = ms as u64, error = %reason, "source failed");
                    // A later failure never overwrites data an earlier wave found.
                    if self.map.get(c.source).map_or(true, |r| r.is_error()) {
                        self.map.insert(SourceRecord::failed(c.source, reason));
                    }
                }
            }
        }
    }

    fn succeeded(&self, source: SourceId) -> bool {
        self.found.iter().any(|(_, s)| *s == source)
    }

    /// Successful sources by completion time.
    fn sources_used(&self) -> Vec<SourceId> {
        let mut found = self.found.clone();
        found.sort_by_key(|(t, _)| *t);
        found.into_iter().map(|(_, s)| s).collect()
    }
}

pub struct Aggregator {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    merge: MergeEngine,
    detector: ConflictDetector,
    adapter_timeout: Duration,
    scrape_always: bool,
    last: Mutex<Option<ResearchResult>>,
}

pub struct AggregatorBuilder {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    priorities: SourcePriorityTable,
    field_map: FieldMap,
    adapter_timeout: Duration,
    scrape_always: bool,
}

impl Default for AggregatorBuilder {
    fn default() -> Self {
        Self {
            adapters: Vec::new(),
            priorities: SourcePriorityTable::default(),
            field_map: FieldMap::standard(),
            adapter_timeout: DEFAULT_ADAPTER_TIMEOUT,
            scrape_always: true,
        }
    }
}

impl AggregatorBuilder {
    /// Register an adapter. Registration order is the source-map order.
    pub fn adapter(mut self, adapter: Arc<dyn SourceAdapter>) -> Self {
        self.adapters.push(adapter);
        self
    }

    pub fn adapters<I: IntoIterator<Item = Arc<dyn SourceAdapter>>>(mut self, adapters: I) -> Self {
        self.adapters.extend(adapters);
        self
    }

    pub fn priorities(mut self, priorities: SourcePriorityTable) -> Self {
        self.priorities = priorities;
        self
    }

    pub fn field_map(mut self, field_map: FieldMap) -> Self {
        self.field_map = field_map;
        self
    }

    pub fn adapter_timeout(mut self, timeout: Duration) -> Self {
        self.adapter_timeout = timeout;
        self
    }

    pub fn scrape_always(mut self, on: bool) -> Self {
        self.scrape_always = on;
        self
    }

    pub fn build(self) -> Result<Aggregator, BuildError> {
        self.field_map.validate()?;

        let mut seen: Vec<SourceId> = Vec::with_capacity(self.adapters.len());
        for a in &self.adapters {
            let s = a.source();
            if seen.contains(&s) {
                return Err(BuildError::DuplicateAdapter(s));
            }
            seen.push(s);
        }
        for s in self.field_map.unreferenced(&seen) {
            tracing::debug!(target: "research", source = %s, "adapter feeds no consolidated field");
        }

        Ok(Aggregator {
            adapters: self.adapters,
            detector: ConflictDetector::new(self.field_map.clone()),
            merge: MergeEngine::new(self.priorities, self.field_map),
            adapter_timeout: self.adapter_timeout,
            scrape_always: self.scrape_always,
            last: Mutex::new(None),
        })
    }
}

impl Aggregator {
    pub fn builder() -> AggregatorBuilder {
        AggregatorBuilder::default()
    }

    /// Production wiring: every provider adapter, priorities from the configured
    /// file (or the built-in seed), timeouts from config.
    pub fn from_config(cfg: &ResearchConfig) -> anyhow::Result<Self> {
        let priorities = cfg
            .priorities_path
            .as_deref()
            .map(SourcePriorityTable::load_from_file)
            .unwrap_or_default();

        let agg = Self::builder()
            .adapters(standard_adapters(cfg)?)
            .priorities(priorities)
            .adapter_timeout(cfg.adapter_timeout())
            .scrape_always(cfg.scrape_always)
            .build()?;

        let enabled: Vec<&str> = agg
            .adapters
            .iter()
            .filter(|a| a.enabled())
            .map(|a| a.source().as_str())
            .collect();
        tracing::info!(target: "research", enabled = ?enabled, "research adapters ready");
        Ok(agg)
    }

    pub fn adapters_status(&self) -> Vec<AdapterStatus> {
        self.adapters
            .iter()
            .map(|a| AdapterStatus {
                source: a.source(),
                enabled: a.enabled(),
                keyed_on: a.keyed_on(),
                priority: self.merge.priorities().priority_for(a.source()),
            })
            .collect()
    }

    /// Clone of the most recent completed result.
    pub fn last_result(&self) -> Option<ResearchResult> {
        match self.last.lock() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub async fn research(&self, request: ResearchRequest) -> Result<ResearchResult, ResearchError> {
        ensure_metrics_described();

        let company = request.company_name.trim();
        if company.is_empty() {
            return Err(ResearchError::EmptyCompanyName);
        }
        let research_date = Utc::now();
        let domain = request
            .domain
            .as_deref()
            .map(clean_domain)
            .filter(|d| !d.is_empty())
            .or_else(|| derive_domain(company));
        let target = LookupTarget::new(company, domain.clone());

        tracing::info!(target: "research", company, domain = ?domain, "research started");

        let mut collected = Collected::default();

        // Wave 1
        let first: Vec<_> = self
            .adapters
            .iter()
            .filter(|a| self.applicable(a.as_ref(), &request, &target))
            .filter(|a| self.scrape_always || a.source() != SourceId::WebScraping)
            .cloned()
            .collect();
        collected.absorb(self.run_wave(first, &target, request.include_officers).await?);

        // Wave 2: fallback scrape
        if !collected.structured_found && !collected.attempted.contains(&SourceId::WebScraping) {
            if let Some(scraper) = self.usable(SourceId::WebScraping, &request, &target) {
                tracing::info!(target: "research", "no structured source answered, scraping company site");
                counter!("research_fallback_scrapes_total").increment(1);
                collected.absorb(
                    self.run_wave(vec![scraper], &target, request.include_officers)
                        .await?,
                );
            }
        }

        // Wave 3: LinkedIn via scraped handle
        if !collected.succeeded(SourceId::Linkedin) {
            let handle = scraped_linkedin_handle(&collected.map);
            let linkedin = self.usable(SourceId::Linkedin, &request, &target);
            if let (Some(handle), Some(linkedin)) = (handle, linkedin) {
                tracing::info!(target: "research", handle = %handle, "retrying linkedin with scraped handle");
                let enriched = target.with_handle(handle);
                collected.absorb(
                    self.run_wave(vec![linkedin], &enriched, request.include_officers)
                        .await?,
                );
            }
        }

        let sources_used = collected.sources_used();
        let mut data = collected.map;

        let mut news = Vec::new();
        if let Some(mut r) = data.get(SourceId::News).filter(|r| !r.is_error()).cloned() {
            news = std::mem::take(&mut r.news);
            data.insert(r);
        }

        let consolidated = self.merge.consolidate(&data);
        let conflicts = self.detector.detect(&data);

        counter!("research_runs_total").increment(1);
        counter!("research_conflicts_total").increment(conflicts.len() as u64);
        gauge!("research_last_run_ts").set(Utc::now().timestamp() as f64);
        tracing::info!(
            target: "research",
            company,
            sources = sources_used.len(),
            conflicts = conflicts.len(),
            articles = news.len(),
            "research complete"
        );

        let result = ResearchResult {
            company_name: company.to_string(),
            research_date,
            domain_used: domain,
            sources_used,
            data,
            news,
            consolidated,
            conflicts,
            status: ResearchStatus::Complete,
        };

        match self.last.lock() {
            Ok(mut g) => *g = Some(result.clone()),
            Err(poisoned) => *poisoned.into_inner() = Some(result.clone()),
        }
        Ok(result)
    }

    fn applicable(&self, a: &dyn SourceAdapter, req: &ResearchRequest, target: &LookupTarget) -> bool {
        let source = a.source();
        if !a.enabled() {
            tracing::debug!(target: "research", source = %source, "adapter disabled, skipping");
            return false;
        }
        if source == SourceId::News && !req.include_news {
            return false;
        }
        if a.keyed_on() == LookupKey::Domain && target.domain.is_none() {
            tracing::debug!(target: "research", source = %source, "no domain, skipping");
            return false;
        }
        true
    }

    fn usable(
        &self,
        source: SourceId,
        req: &ResearchRequest,
        target: &LookupTarget,
    ) -> Option<Arc<dyn SourceAdapter>> {
        self.adapters
            .iter()
            .find(|a| a.source() == source)
            .filter(|a| self.applicable(a.as_ref(), req, target))
            .cloned()
    }

    async fn run_wave(
        &self,
        adapters: Vec<Arc<dyn SourceAdapter>>,
        target: &LookupTarget,
        include_officers: bool,
    ) -> Result<Vec<Completed>, ResearchError> {
        let timeout = self.adapter_timeout;
        let started = Instant::now();
        let (sources, handles): (Vec<SourceId>, Vec<_>) = adapters
            .into_iter()
            .map(|adapter| {
                let source = adapter.source();
                let target = target.clone();
                let handle = tokio::spawn(async move {
                    let t0 = Instant::now();
                    let outcome = match tokio::time::timeout(
                        timeout,
                        call_adapter(adapter.as_ref(), &target, include_officers),
                    )
                    .await
                    {
                        Ok(o) => o,
                        Err(_) => FetchOutcome::Failed(format!(
                            "timed out after {} ms",
                            timeout.as_millis()
                        )),
                    };
                    Completed {
                        source,
                        outcome,
                        finished: Instant::now(),
                        elapsed: t0.elapsed(),
                    }
                });
                (source, handle)
            })
            .unzip();

        let mut out = Vec::with_capacity(sources.len());
        for (source, joined) in sources.into_iter().zip(join_all(handles).await) {
            match joined {
                Ok(c) => out.push(c),
                Err(e) if e.is_panic() => {
                    tracing::error!(target: "research", source = %source, "adapter task panicked");
                    out.push(Completed {
                        source,
                        outcome: FetchOutcome::Failed("adapter panicked".into()),
                        finished: Instant::now(),
                        elapsed: started.elapsed(),
                    });
                }
                Err(_) => return Err(ResearchError::AdapterCancelled { adapter: source }),
            }
        }
        Ok(out)
    }
}

async fn call_adapter(
    adapter: &dyn SourceAdapter,
    target: &LookupTarget,
    include_officers: bool,
) -> FetchOutcome {
    let mut outcome = adapter.fetch(target).await;
    if include_officers {
        if let FetchOutcome::Found(record) = &mut outcome {
            if record.non_empty(RecordField::Leadership).is_none() {
                if let Some(leaders) = adapter.fetch_leadership(record).await {
                    record.set(RecordField::Leadership, Some(leaders));
                }
            }
        }
    }
    outcome
}

/// Guess a domain from a company name: "Acme, Inc." -> "acmeinc.com".
pub fn derive_domain(company: &str) -> Option<String> {
    let stem: String = company
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect();
    (!stem.is_empty()).then(|| format!("{stem}.com"))
}

fn scraped_linkedin_handle(map: &SourceMap) -> Option<String> {
    let social = map
        .get(SourceId::WebScraping)
        .filter(|r| !r.is_error())?
        .get(RecordField::SocialMedia)?
        .as_map()?;
    LINKEDIN_HANDLE_KEYS
        .iter()
        .find_map(|k| social.get(*k).filter(|v| !v.is_empty()))
        .map(FieldValue::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_domain_drops_punctuation_and_spaces() {
        assert_eq!(derive_domain("Acme, Inc."), Some("acmeinc.com".into()));
        assert_eq!(derive_domain("  Big Co 2 "), Some("bigco2.com".into()));
        assert_eq!(derive_domain("!!!"), None);
    }

    #[test]
    fn handle_comes_from_scraped_social_links() {
        let mut social = std::collections::BTreeMap::new();
        social.insert("linkedin_id".to_string(), FieldValue::from("acme-co"));
        let map: SourceMap = vec![SourceRecord::new(SourceId::WebScraping)
            .with(RecordField::SocialMedia, FieldValue::Map(social))]
        .into_iter()
        .collect();
        assert_eq!(scraped_linkedin_handle(&map), Some("acme-co".into()));
        assert_eq!(scraped_linkedin_handle(&SourceMap::new()), None);
    }

    #[test]
    fn later_failure_keeps_earlier_data() {
        let now = Instant::now();
        let mut c = Collected::default();
        c.absorb(vec![Completed {
            source: SourceId::Linkedin,
            outcome: FetchOutcome::Found(
                SourceRecord::new(SourceId::Linkedin).with(RecordField::Name, "Acme"),
            ),
            finished: now,
            elapsed: Duration::ZERO,
        }]);
        c.absorb(vec![Completed {
            source: SourceId::Linkedin,
            outcome: FetchOutcome::Failed("HTTP 500".into()),
            finished: now,
            elapsed: Duration::ZERO,
        }]);
        assert!(!c.map.get(SourceId::Linkedin).unwrap().is_error());
        assert_eq!(c.sources_used(), vec![SourceId::Linkedin]);
        assert!(c.structured_found);
    }
}
