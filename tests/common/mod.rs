// tests/common/mod.rs
//
// Scriptable in-memory adapter shared by the aggregator and API tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use account_research::research::types::{
    FetchOutcome, FieldValue, LookupKey, LookupTarget, SourceAdapter, SourceId, SourceRecord,
};

pub struct FakeAdapter {
    source: SourceId,
    outcome: FetchOutcome,
    delay: Duration,
    panics: bool,
    keyed_on: LookupKey,
    enabled: bool,
    leadership: Option<FieldValue>,
    /// Outcome used when the target carries a handle (LinkedIn retry path).
    with_handle: Option<FetchOutcome>,
    calls: AtomicUsize,
    seen: Mutex<Vec<LookupTarget>>,
}

impl FakeAdapter {
    pub fn new(source: SourceId, outcome: FetchOutcome) -> Self {
        Self {
            source,
            outcome,
            delay: Duration::ZERO,
            panics: false,
            keyed_on: LookupKey::CompanyName,
            enabled: true,
            leadership: None,
            with_handle: None,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn found(record: SourceRecord) -> Self {
        Self::new(record.source, FetchOutcome::Found(record))
    }

    pub fn failing(source: SourceId, reason: &str) -> Self {
        Self::new(source, FetchOutcome::Failed(reason.to_string()))
    }

    pub fn not_found(source: SourceId) -> Self {
        Self::new(source, FetchOutcome::NotFound)
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panics = true;
        self
    }

    pub fn keyed_on(mut self, key: LookupKey) -> Self {
        self.keyed_on = key;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn leadership(mut self, leaders: FieldValue) -> Self {
        self.leadership = Some(leaders);
        self
    }

    pub fn on_handle(mut self, outcome: FetchOutcome) -> Self {
        self.with_handle = Some(outcome);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn targets(&self) -> Vec<LookupTarget> {
        self.seen.lock().unwrap().clone()
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl SourceAdapter for FakeAdapter {
    fn source(&self) -> SourceId {
        self.source
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn keyed_on(&self) -> LookupKey {
        self.keyed_on
    }

    async fn fetch(&self, target: &LookupTarget) -> FetchOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(target.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.panics {
            panic!("fake adapter {} blew up", self.source);
        }
        match (&target.handle, &self.with_handle) {
            (Some(_), Some(o)) => o.clone(),
            _ => self.outcome.clone(),
        }
    }

    async fn fetch_leadership(&self, _record: &SourceRecord) -> Option<FieldValue> {
        self.leadership.clone()
    }
}
