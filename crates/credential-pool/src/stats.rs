//! Pool statistics
//!
//! Counts are in slots, not rows: each row contributes its number of
//! non-empty slots to either the `available` or the `used` bucket according
//! to the row's status.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::layout::{PoolRow, RowStatus};

/// Slot counts for one vendor, aggregated across its rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VendorStats {
    pub total: u64,
    pub available: u64,
    pub used: u64,
}

impl VendorStats {
    fn add(&mut self, slots: u64, status: RowStatus) -> Option<()> {
        self.total = self.total.checked_add(slots)?;
        match status {
            RowStatus::Available => self.available = self.available.checked_add(slots)?,
            RowStatus::Used => self.used = self.used.checked_add(slots)?,
        }
        Some(())
    }
}

/// Whole-pool report. `available + used == total` and the per-vendor totals
/// sum to `total`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub total_vendors: u64,
    pub total: u64,
    pub available: u64,
    pub used: u64,
    /// Keyed by the first spelling of each vendor seen in the table.
    pub vendors: BTreeMap<String, VendorStats>,
}

impl PoolStats {
    /// Tally `rows`. Falls back to the zeroed report if a counter overflows,
    /// so callers always get a complete structure.
    pub fn from_rows(rows: &[PoolRow]) -> Self {
        tally(rows).unwrap_or_default()
    }
}

fn tally(rows: &[PoolRow]) -> Option<PoolStats> {
    let mut display: HashMap<String, String> = HashMap::new();
    let mut totals = VendorStats::default();
    let mut vendors: BTreeMap<String, VendorStats> = BTreeMap::new();

    for row in rows {
        let slots = u64::try_from(row.filled_slots()).ok()?;
        let name = display
            .entry(row.vendor.to_lowercase())
            .or_insert_with(|| row.vendor.clone());
        vendors
            .entry(name.clone())
            .or_default()
            .add(slots, row.status)?;
        totals.add(slots, row.status)?;
    }

    Some(PoolStats {
        total_vendors: u64::try_from(vendors.len()).ok()?,
        total: totals.total,
        available: totals.available,
        used: totals.used,
        vendors,
    })
}
