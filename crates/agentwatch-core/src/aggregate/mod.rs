//! Unified aggregator
//!
//! There is no canonical merged log. On every request the aggregator scans
//! the external key-space for each record family, checks each key's kind,
//! decodes what it can, synthesizes feed entries and merges them with recent
//! stored events. Per-record problems are counted, never raised.

mod decode;
mod entry;
mod events;
mod family;
mod keyspace;
mod synthesize;


pub use decode::{AggregateDiagnostics, Decoded};
pub use entry::{LogType, UnifiedLogEntry};
pub use family::{
    FamilyDescriptor, Identity, RawRecord, Record, RecordContext, RecordFamily, SynthesisOptions,
};
pub use keyspace::{
    KeyDescriptor, KeyKind, KeySpace, MemoryKeySpace, RedisKeySpace, TextItems,
};
pub use synthesize::TaskRecord;

use agentwatch_store::EventStoreTrait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::Result;

/// Default number of stored events folded into the feed
const DEFAULT_EVENT_WINDOW: i64 = 200;

/// Result of one aggregation
#[derive(Debug, Clone, Serialize)]
pub struct AggregateReport {
    /// Newest first, at most `limit`
    pub logs: Vec<UnifiedLogEntry>,
    /// Entries produced before truncation
    pub total: usize,
    /// What was left out and why
    pub diagnostics: AggregateDiagnostics,
}

/// Merges external record families and stored events into one feed
pub struct UnifiedAggregator {
    keyspace: Arc<dyn KeySpace>,
    events: Option<Arc<dyn EventStoreTrait>>,
    event_window: i64,
    families: Vec<RecordFamily>,
    options: SynthesisOptions,
}

impl UnifiedAggregator {
    /// Aggregate every record family from `keyspace`
    pub fn new(keyspace: Arc<dyn KeySpace>) -> Self {
        Self {
            keyspace,
            events: None,
            event_window: DEFAULT_EVENT_WINDOW,
            families: RecordFamily::ALL.to_vec(),
            options: SynthesisOptions::default(),
        }
    }

    /// Also fold in the most recent `window` stored events
    #[must_use]
    pub fn with_events(mut self, store: Arc<dyn EventStoreTrait>, window: i64) -> Self {
        self.events = Some(store);
        self.event_window = window;
        self
    }

    /// Restrict aggregation to `families`
    #[must_use]
    pub fn with_families(mut self, families: impl IntoIterator<Item = RecordFamily>) -> Self {
        self.families = families.into_iter().collect();
        self
    }

    /// Override synthesis options
    #[must_use]
    pub fn with_options(mut self, options: SynthesisOptions) -> Self {
        self.options = options;
        self
    }

    /// Key-space backend in use
    #[must_use]
    pub fn keyspace(&self) -> &Arc<dyn KeySpace> {
        &self.keyspace
    }

    /// Build the feed, newest first, truncated to `limit`
    ///
    /// Fails only when a prefix scan (or the event log) cannot be read at all;
    /// entries with equal timestamps come out in no particular order.
    #[instrument(skip(self))]
    pub async fn aggregate(&self, limit: usize) -> Result<AggregateReport> {
        let mut diagnostics = AggregateDiagnostics::default();
        let mut logs = Vec::new();

        // Several families share a prefix; scan each prefix once
        let mut scans: HashMap<&'static str, Vec<String>> = HashMap::new();

        for family in &self.families {
            let descriptor = family.descriptor();
            if !scans.contains_key(descriptor.prefix) {
                let scanned = self.keyspace.scan_prefix(descriptor.prefix).await?;
                // Undecodable names are counted once per prefix
                diagnostics.skipped_records += scanned.invalid as u64;
                scans.insert(descriptor.prefix, scanned.items);
            }
            let keys = scans.get(descriptor.prefix).map(Vec::as_slice).unwrap_or_default();

            for key in keys {
                self.collect_key(descriptor, key, &mut logs, &mut diagnostics)
                    .await;
            }
        }

        if let Some(store) = &self.events {
            for event in store.recent(self.event_window).await? {
                match events::event_entry(&event) {
                    Some(entry) => logs.push(entry),
                    None => diagnostics.skipped_entries += 1,
                }
            }
        }

        let total = logs.len();
        logs.sort_unstable_by(|a, b| b.timestamp.cmp(&a.timestamp));
        logs.truncate(limit);

        if diagnostics.is_clean() {
            debug!(total, returned = logs.len(), "Aggregated unified log");
        } else {
            info!(total, returned = logs.len(), diagnostics = ?diagnostics, "Aggregated unified log with skips");
        }

        Ok(AggregateReport {
            logs,
            total,
            diagnostics,
        })
    }

    async fn collect_key(
        &self,
        descriptor: &FamilyDescriptor,
        key: &str,
        logs: &mut Vec<UnifiedLogEntry>,
        diagnostics: &mut AggregateDiagnostics,
    ) {
        let id = match descriptor.identify(key) {
            Identity::Record(id) => id,
            Identity::Ignore => return,
            Identity::Malformed => {
                debug!(key = %key, family = %descriptor.family, "Skipping key with malformed identifier");
                diagnostics.skipped_records += 1;
                return;
            }
        };

        match self.keyspace.describe(key).await {
            Ok(found) if found.matches(&descriptor.expects) => {}
            Ok(found) => {
                debug!(key = %key, kind = ?found.kind, "Skipping key of unexpected kind");
                diagnostics.type_mismatches += 1;
                return;
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to describe key");
                diagnostics.skipped_records += 1;
                return;
            }
        }

        let raw = match self.fetch(descriptor, key, diagnostics).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read key");
                diagnostics.skipped_records += 1;
                return;
            }
        };

        let ctx = descriptor.context(id);
        match (descriptor.decode)(&ctx, raw, diagnostics) {
            Decoded::Ok(record) => logs.extend((descriptor.synthesize)(record, &self.options)),
            Decoded::Skip(reason) => {
                debug!(key = %key, reason = %reason, "Skipping record");
                diagnostics.skipped_records += 1;
            }
        }
    }

    async fn fetch(
        &self,
        descriptor: &FamilyDescriptor,
        key: &str,
        diagnostics: &mut AggregateDiagnostics,
    ) -> Result<RawRecord> {
        if descriptor.expects == KeyKind::List {
            let items = self.keyspace.list_items(key).await?;
            diagnostics.skipped_entries += items.invalid as u64;
            return Ok(RawRecord::List(items.items));
        }

        let fields = self.keyspace.hash_fields(key).await?;
        let sidecar = match descriptor.sidecar_key(key) {
            Some(sidecar_key) => self.fetch_sidecar(&sidecar_key, diagnostics).await,
            None => None,
        };
        Ok(RawRecord::Hash { fields, sidecar })
    }

    /// Sidecar problems never cost the main record
    async fn fetch_sidecar(
        &self,
        key: &str,
        diagnostics: &mut AggregateDiagnostics,
    ) -> Option<HashMap<String, String>> {
        let found = self.keyspace.describe(key).await.ok()?;
        if !found.present {
            return None;
        }
        if found.kind != KeyKind::Hash {
            diagnostics.type_mismatches += 1;
            return None;
        }
        match self.keyspace.hash_fields(key).await {
            Ok(fields) => Some(fields),
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read output sidecar");
                None
            }
        }
    }
}
