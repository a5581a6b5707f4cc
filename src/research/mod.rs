// src/research/mod.rs
pub mod aggregator;
pub mod conflicts;
pub mod error;
pub mod http;
pub mod merge;
pub mod providers;
pub mod result;
pub mod retry;
pub mod summary;
pub mod types;

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

pub use aggregator::{Aggregator, AggregatorBuilder};
pub use conflicts::ConflictDetector;
pub use error::{ProviderError, ResearchError};
pub use merge::{FieldMap, FieldMapError, MergeEngine, TargetField};
pub use result::{Conflict, ConsolidatedProfile, ResearchRequest, ResearchResult, ResearchStatus};
pub use summary::get_summary;
pub use types::{
    FetchOutcome, FieldValue, LookupKey, LookupTarget, NewsItem, RecordField, SourceAdapter,
    SourceId, SourceMap, SourceRecord,
};

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("research_runs_total", "Research requests completed.");
        describe_counter!(
            "research_adapter_calls_total",
            "Adapter invocations by source and outcome."
        );
        describe_histogram!(
            "research_adapter_ms",
            "Adapter call latency in milliseconds, retries included."
        );
        describe_counter!(
            "research_conflicts_total",
            "Conflicts detected across all research runs."
        );
        describe_counter!(
            "research_fallback_scrapes_total",
            "Scrapes issued because no structured source answered."
        );
        describe_gauge!(
            "research_last_run_ts",
            "Unix ts when the last research request completed."
        );
    });
}

/// Provider text cleanup: decode entities, strip tags, straighten quotes,
/// collapse whitespace, cap length.
pub fn clean_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Curly quotes to ASCII
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 5) Length cap: 2000 chars
    if out.chars().count() > 2000 {
        out = out.chars().take(2000).collect();
    }

    out
}
