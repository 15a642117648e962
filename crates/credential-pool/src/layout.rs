//! Table layout and row parsing
//!
//! A pool table row is `vendor | slot 1 .. slot N | status`. Column A always
//! holds the vendor; the slot count and the status column depend on the
//! deployment:
//!
//! | layout      | slots | status column |
//! |-------------|-------|---------------|
//! | single slot | B     | C             |
//! | five slot   | B..F  | G             |
//!
//! Status is tracked per row, not per slot. Issuing any slot flips the whole
//! row to USED, so the remaining slots of that row stay unreachable until the
//! row is released.

use pool_store::a1::{column_index, column_letter};

use crate::error::{Error, Result};

/// Status cell value written when a row is issued (the source sheet's marker).
pub const DEFAULT_USED_MARKER: &str = "Usada";

/// Row-level issuance status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStatus {
    Available,
    Used,
}

/// One vendor bucket of credential slots sharing a single status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolRow {
    /// 0-based position in the table, header excluded.
    pub position: usize,
    /// Vendor name as written in the sheet.
    pub vendor: String,
    /// Slot values in column order; blank cells are `None`.
    pub slots: Vec<Option<String>>,
    pub status: RowStatus,
}

impl PoolRow {
    /// 1-based external row number (header occupies row 1).
    pub fn external_row(&self) -> usize {
        self.position + 2
    }

    /// First non-empty slot as `(0-based slot index, value)`.
    pub fn first_slot(&self) -> Option<(usize, &str)> {
        self.slots
            .iter()
            .enumerate()
            .find_map(|(i, slot)| slot.as_deref().map(|value| (i, value)))
    }

    /// Whether any slot holds exactly `value`.
    pub fn holds(&self, value: &str) -> bool {
        self.slots.iter().flatten().any(|slot| slot == value)
    }

    /// Number of non-empty slots.
    pub fn filled_slots(&self) -> usize {
        self.slots.iter().flatten().count()
    }
}

/// Column layout of the pool table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetLayout {
    slot_count: usize,
    status_column: String,
    status_index: usize,
    used_marker: String,
}

impl SheetLayout {
    /// Build a layout, rejecting shapes where the status column overlaps the
    /// vendor or slot columns.
    pub fn new(slot_count: usize, status_column: &str, used_marker: &str) -> Result<Self> {
        if slot_count == 0 {
            return Err(Error::InvalidLayout("slot_count must be at least 1".into()));
        }
        let status_column = status_column.trim();
        let status_index = column_index(status_column).ok_or_else(|| {
            Error::InvalidLayout(format!("status column {status_column:?} is not an A1 column"))
        })?;
        if status_index <= slot_count {
            return Err(Error::InvalidLayout(format!(
                "status column {status_column} overlaps slot columns B..{}",
                column_letter(slot_count)
            )));
        }
        let used_marker = used_marker.trim();
        if used_marker.is_empty() {
            return Err(Error::InvalidLayout("used_marker must not be empty".into()));
        }
        Ok(Self {
            slot_count,
            status_column: status_column.to_ascii_uppercase(),
            status_index,
            used_marker: used_marker.to_string(),
        })
    }

    /// One credential per row: vendor A, slot B, status C.
    pub fn single_slot() -> Self {
        Self {
            slot_count: 1,
            status_column: "C".into(),
            status_index: 2,
            used_marker: DEFAULT_USED_MARKER.into(),
        }
    }

    /// Up to five credentials per row: vendor A, slots B..F, status G.
    pub fn five_slot() -> Self {
        Self {
            slot_count: 5,
            status_column: "G".into(),
            status_index: 6,
            used_marker: DEFAULT_USED_MARKER.into(),
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    pub fn status_column(&self) -> &str {
        &self.status_column
    }

    pub fn used_marker(&self) -> &str {
        &self.used_marker
    }

    /// Column range to fetch: vendor column through status column.
    pub fn fetch_range(&self) -> String {
        format!("A:{}", self.status_column)
    }

    /// Parse one data row. `position` is the 0-based index with the header removed.
    ///
    /// Rows without a vendor are malformed. Missing trailing cells are treated as
    /// blank, so a row with no status cell is AVAILABLE.
    pub fn parse_row(&self, position: usize, cells: &[String]) -> Result<PoolRow> {
        let vendor = cells.first().map(|v| v.trim()).unwrap_or_default();
        if vendor.is_empty() {
            return Err(Error::MalformedRow {
                row: position + 2,
                reason: "missing vendor".into(),
            });
        }

        let slots = (1..=self.slot_count)
            .map(|col| {
                cells
                    .get(col)
                    .map(|cell| cell.trim())
                    .filter(|cell| !cell.is_empty())
                    .map(str::to_string)
            })
            .collect();

        let status = match cells.get(self.status_index) {
            Some(cell) if cell.trim().eq_ignore_ascii_case(&self.used_marker) => RowStatus::Used,
            _ => RowStatus::Available,
        };

        Ok(PoolRow {
            position,
            vendor: vendor.to_string(),
            slots,
            status,
        })
    }
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self::single_slot()
    }
}
