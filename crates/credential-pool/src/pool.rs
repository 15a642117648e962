//! Pool manager: snapshot, vendor index, allocation and release
//!
//! One `tokio::sync::Mutex` guards the whole pool. Allocation and release hold
//! it across "select row, write status externally, mutate local row", so two
//! callers can never both see the same AVAILABLE row before either marks it.
//! The external write happens first; the local row only changes after the
//! store accepted it.
//!
//! Refresh fetches outside the lock and takes it only to publish. Writes that
//! land while a fetch is in flight are journaled and replayed on top of the
//! fetched table, otherwise a fetch started just before an allocation would
//! hand the freshly issued row out again. A fetch that started before the
//! currently published snapshot is dropped as stale.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use pool_store::StoreAdapter;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::layout::{PoolRow, RowStatus, SheetLayout};
use crate::stats::PoolStats;

/// Default bound on a single store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(10);

/// Whether the last refresh reached the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolHealth {
    Healthy,
    /// The last fetch failed and the pool was emptied.
    Degraded { reason: String },
}

impl PoolHealth {
    pub fn label(&self) -> &'static str {
        match self {
            PoolHealth::Healthy => "healthy",
            PoolHealth::Degraded { .. } => "degraded",
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, PoolHealth::Healthy)
    }
}

/// An issued credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Allocation {
    /// Vendor as written in the table.
    pub vendor: String,
    pub credential: String,
    /// 1-based slot position within the row.
    pub slot: usize,
    /// 1-based external row number, header included.
    pub row: usize,
}

/// A released row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Release {
    pub vendor: String,
    pub row: usize,
    /// False when the row was already AVAILABLE locally.
    pub was_used: bool,
}

#[derive(Debug, Clone, Copy)]
struct JournalEntry {
    seq: u64,
    position: usize,
    status: RowStatus,
}

#[derive(Debug)]
struct PoolState {
    rows: Vec<PoolRow>,
    /// Lowercased vendor -> indices into `rows`, table order.
    index: HashMap<String, Vec<usize>>,
    health: PoolHealth,
    /// Bumped by every refresh start and every local write.
    seq: u64,
    /// Start seq of the refresh that produced the published snapshot.
    published_seq: u64,
    refreshes_in_flight: usize,
    journal: Vec<JournalEntry>,
}

impl PoolState {
    fn empty() -> Self {
        Self {
            rows: Vec::new(),
            index: HashMap::new(),
            health: PoolHealth::Healthy,
            seq: 0,
            published_seq: 0,
            refreshes_in_flight: 0,
            journal: Vec::new(),
        }
    }

    fn candidates(&self, vendor: &str) -> Option<&[usize]> {
        self.index
            .get(&normalize(vendor))
            .map(Vec::as_slice)
            .filter(|rows| !rows.is_empty())
    }

    /// Change a row's status locally, journaling it if a refresh could miss it.
    fn set_status(&mut self, idx: usize, status: RowStatus) {
        self.rows[idx].status = status;
        self.seq += 1;
        if self.refreshes_in_flight > 0 {
            self.journal.push(JournalEntry {
                seq: self.seq,
                position: self.rows[idx].position,
                status,
            });
        }
    }

    /// Publish a new snapshot, replaying writes made after `started`.
    fn publish(&mut self, mut rows: Vec<PoolRow>, started: u64) {
        for entry in self.journal.iter().filter(|e| e.seq > started) {
            if let Some(row) = rows.iter_mut().find(|r| r.position == entry.position) {
                row.status = entry.status;
            }
        }
        self.index = build_index(&rows);
        self.rows = rows;
        self.published_seq = started;
    }

    fn finish_refresh(&mut self, started: u64) {
        self.refreshes_in_flight = self.refreshes_in_flight.saturating_sub(1);
        if self.refreshes_in_flight == 0 {
            self.journal.clear();
        } else {
            self.journal.retain(|e| e.seq > started);
        }
    }

    fn set_health(&mut self, health: PoolHealth) {
        match (&self.health, &health) {
            (PoolHealth::Healthy, PoolHealth::Degraded { reason }) => {
                warn!(reason = %reason, "pool degraded, serving empty pool");
            }
            (PoolHealth::Degraded { .. }, PoolHealth::Healthy) => {
                info!(rows = self.rows.len(), "pool recovered");
            }
            _ => {}
        }
        self.health = health;
    }
}

fn normalize(vendor: &str) -> String {
    vendor.trim().to_lowercase()
}

fn build_index(rows: &[PoolRow]) -> HashMap<String, Vec<usize>> {
    let mut index: HashMap<String, Vec<usize>> = HashMap::new();
    for (idx, row) in rows.iter().enumerate() {
        index.entry(normalize(&row.vendor)).or_default().push(idx);
    }
    index
}

/// In-process cache of the pool table and the only mutator of pool state.
///
/// Multi-slot rows share one status: issuing any slot marks the whole row
/// USED, and its remaining slots are unreachable until the row is released.
pub struct PoolManager {
    store: Arc<dyn StoreAdapter>,
    layout: SheetLayout,
    store_timeout: Duration,
    state: Mutex<PoolState>,
}

impl PoolManager {
    /// Create the manager and load the table.
    ///
    /// A failed initial fetch does not fail construction: the pool starts
    /// empty and degraded.
    pub async fn new(
        store: Arc<dyn StoreAdapter>,
        layout: SheetLayout,
        store_timeout: Duration,
    ) -> Self {
        let pool = Self {
            store,
            layout,
            store_timeout,
            state: Mutex::new(PoolState::empty()),
        };
        let health = pool.refresh().await;
        let rows = pool.state.lock().await.rows.len();
        info!(
            store = pool.store.id(),
            range = %pool.layout.fetch_range(),
            rows,
            health = health.label(),
            "pool initialized"
        );
        pool
    }

    pub fn layout(&self) -> &SheetLayout {
        &self.layout
    }

    /// Reload the table from the store and rebuild the vendor index.
    ///
    /// Never fails: a store error empties the pool and marks it degraded.
    /// Returns the health after the refresh.
    pub async fn refresh(&self) -> PoolHealth {
        let started = {
            let mut state = self.state.lock().await;
            state.seq += 1;
            state.refreshes_in_flight += 1;
            state.seq
        };

        let range = self.layout.fetch_range();
        let fetched = self
            .timed("fetch", self.store.fetch_table(&range))
            .await
            .map(|table| self.parse_table(table));

        let mut state = self.state.lock().await;
        let outcome = if started < state.published_seq {
            debug!(started, published = state.published_seq, "discarding stale refresh");
            "stale"
        } else {
            match fetched {
                Ok(rows) => {
                    state.publish(rows, started);
                    state.set_health(PoolHealth::Healthy);
                    debug!(rows = state.rows.len(), vendors = state.index.len(), "pool refreshed");
                    "ok"
                }
                Err(e) => {
                    state.publish(Vec::new(), started);
                    state.set_health(PoolHealth::Degraded {
                        reason: e.to_string(),
                    });
                    "failed"
                }
            }
        };
        state.finish_refresh(started);
        metrics::counter!("pool_refreshes_total", "outcome" => outcome).increment(1);
        state.health.clone()
    }

    /// Issue the first available slot for `vendor`.
    ///
    /// Rows are tried in table order; within a row, slots in column order.
    pub async fn allocate(&self, vendor: &str) -> Result<Allocation> {
        let result = self.allocate_locked(vendor).await;
        let outcome = match &result {
            Ok(_) => "issued",
            Err(e) => e.label(),
        };
        metrics::counter!("credential_allocations_total", "outcome" => outcome).increment(1);
        result
    }

    async fn allocate_locked(&self, vendor: &str) -> Result<Allocation> {
        let mut state = self.state.lock().await;

        let candidates = state
            .candidates(vendor)
            .ok_or_else(|| Error::VendorUnknown(vendor.to_string()))?;

        let pick = candidates.iter().copied().find_map(|idx| {
            let row = &state.rows[idx];
            if row.status == RowStatus::Used {
                return None;
            }
            match row.first_slot() {
                Some((slot, value)) => Some((idx, slot, value.to_string())),
                None => {
                    debug!(row = row.external_row(), "skipping available row with no slots");
                    None
                }
            }
        });

        let Some((idx, slot, credential)) = pick else {
            debug!(vendor, "pool exhausted");
            return Err(Error::PoolExhausted(vendor.to_string()));
        };

        let row = state.rows[idx].external_row();
        let column = self.layout.status_column();
        if let Err(e) = self
            .timed("write", self.store.write_cell(row, column, self.layout.used_marker()))
            .await
        {
            warn!(vendor, row, error = %e, "failed to mark row used");
            return Err(e);
        }

        state.set_status(idx, RowStatus::Used);
        let allocation = Allocation {
            vendor: state.rows[idx].vendor.clone(),
            credential,
            slot: slot + 1,
            row,
        };
        info!(vendor = %allocation.vendor, row, slot = allocation.slot, "credential issued");
        Ok(allocation)
    }

    /// Clear the status of the first row of `vendor` holding `credential`.
    ///
    /// Any slot of any of the vendor's rows matches. Releasing an AVAILABLE
    /// row still writes the cell and succeeds.
    pub async fn try_release(&self, vendor: &str, credential: &str) -> Result<Release> {
        let result = self.release_locked(vendor, credential).await;
        let outcome = match &result {
            Ok(_) => "released",
            Err(e) => e.label(),
        };
        metrics::counter!("credential_releases_total", "outcome" => outcome).increment(1);
        result
    }

    /// [`try_release`](Self::try_release) reduced to success or failure.
    pub async fn release(&self, vendor: &str, credential: &str) -> bool {
        self.try_release(vendor, credential).await.is_ok()
    }

    async fn release_locked(&self, vendor: &str, credential: &str) -> Result<Release> {
        let mut state = self.state.lock().await;

        let candidates = state
            .candidates(vendor)
            .ok_or_else(|| Error::VendorUnknown(vendor.to_string()))?;

        let credential = credential.trim();
        let idx = candidates
            .iter()
            .copied()
            .find(|&idx| state.rows[idx].holds(credential))
            .ok_or_else(|| Error::CredentialNotFound(vendor.to_string()))?;

        let row = state.rows[idx].external_row();
        if let Err(e) = self
            .timed("write", self.store.write_cell(row, self.layout.status_column(), ""))
            .await
        {
            warn!(vendor, row, error = %e, "failed to clear row status");
            return Err(e);
        }

        let was_used = state.rows[idx].status == RowStatus::Used;
        state.set_status(idx, RowStatus::Available);
        info!(vendor = %state.rows[idx].vendor, row, was_used, "credential released");
        Ok(Release {
            vendor: state.rows[idx].vendor.clone(),
            row,
            was_used,
        })
    }

    /// Slot counts over the current snapshot. Always returns a full report.
    pub async fn statistics(&self) -> PoolStats {
        let state = self.state.lock().await;
        PoolStats::from_rows(&state.rows)
    }

    pub async fn pool_health(&self) -> PoolHealth {
        self.state.lock().await.health.clone()
    }

    /// Health summary for the health endpoint.
    pub async fn health(&self) -> serde_json::Value {
        let state = self.state.lock().await;
        let available = state
            .rows
            .iter()
            .filter(|r| r.status == RowStatus::Available && r.first_slot().is_some())
            .count();
        let mut body = serde_json::json!({
            "status": state.health.label(),
            "store": self.store.id(),
            "rows": state.rows.len(),
            "vendors": state.index.len(),
            "rows_available": available,
        });
        if let PoolHealth::Degraded { reason } = &state.health {
            body["reason"] = serde_json::Value::String(reason.clone());
        }
        body
    }

    /// Copy of the current snapshot.
    pub async fn rows(&self) -> Vec<PoolRow> {
        self.state.lock().await.rows.clone()
    }

    /// Parse a fetched table, dropping the header and skipping malformed rows.
    fn parse_table(&self, table: pool_store::Table) -> Vec<PoolRow> {
        table
            .into_iter()
            .skip(1)
            .enumerate()
            .filter(|(_, cells)| cells.iter().any(|c| !c.trim().is_empty()))
            .filter_map(|(position, cells)| match self.layout.parse_row(position, &cells) {
                Ok(row) => Some(row),
                Err(e) => {
                    warn!(error = %e, "skipping malformed row");
                    None
                }
            })
            .collect()
    }

    async fn timed<T>(
        &self,
        op: &str,
        fut: impl Future<Output = pool_store::Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.store_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(Error::StoreUnavailable(format!("{op}: {e}"))),
            Err(_) => Err(Error::StoreUnavailable(format!(
                "{op} timed out after {}s",
                self.store_timeout.as_secs_f64()
            ))),
        }
    }
}
