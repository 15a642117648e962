//! In-process store
//!
//! Holds the table in memory behind a tokio Mutex. Used for the gateway's
//! demo/offline mode and as the store double in tests, so it carries
//! switches to make reads or writes fail and optional read and write delays
//! to widen race windows or stall past a caller's timeout.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::debug;

use crate::a1::{column_index, parse_column_range};
use crate::error::{Result, StoreError};
use crate::{StoreAdapter, Table};

/// Canned pool rows for demo mode (single-slot layout: vendor, code, status).
pub fn demo_rows() -> Table {
    [
        ["Fornecedor", "Senha", "Status"],
        ["Acme", "ACME-7431", ""],
        ["Acme", "ACME-2290", ""],
        ["Globex", "GLX-5512", "Usada"],
        ["Globex", "GLX-8820", ""],
        ["Initech", "INI-3317", ""],
        ["Umbrella", "UMB-0042", "Usada"],
    ]
    .iter()
    .map(|row| row.iter().map(|cell| cell.to_string()).collect())
    .collect()
}

/// Table kept in process memory.
pub struct MemoryStore {
    rows: Mutex<Table>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
    write_delay: Option<Duration>,
    read_delay: Option<Duration>,
}

impl MemoryStore {
    pub fn new(rows: Table) -> Self {
        Self {
            rows: Mutex::new(rows),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
            write_delay: None,
            read_delay: None,
        }
    }

    /// Store seeded with [`demo_rows`].
    pub fn demo() -> Self {
        Self::new(demo_rows())
    }

    /// Sleep this long inside every write before touching the rows.
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    /// Sleep this long inside every fetch before reading the rows.
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful cell writes.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Clone of the full table, header included.
    pub async fn rows(&self) -> Table {
        self.rows.lock().await.clone()
    }

    /// Replace the full table.
    pub async fn set_rows(&self, rows: Table) {
        *self.rows.lock().await = rows;
    }

    /// Read one cell by 1-based row and A1 column. Missing cells read as "".
    pub async fn cell(&self, row: usize, column: &str) -> String {
        let Some(col) = column_index(column) else {
            return String::new();
        };
        let rows = self.rows.lock().await;
        row.checked_sub(1)
            .and_then(|r| rows.get(r))
            .and_then(|cells| cells.get(col))
            .cloned()
            .unwrap_or_default()
    }
}

impl StoreAdapter for MemoryStore {
    fn id(&self) -> &str {
        "memory"
    }

    fn fetch_table<'a>(
        &'a self,
        range: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Table>> + Send + 'a>> {
        Box::pin(async move {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("memory store reads disabled".into()));
            }
            let (start, end) = parse_column_range(range)?;
            if let Some(delay) = self.read_delay {
                tokio::time::sleep(delay).await;
            }
            let rows = self.rows.lock().await;
            let table: Table = rows
                .iter()
                .map(|cells| {
                    cells
                        .iter()
                        .skip(start)
                        .take(end - start + 1)
                        .cloned()
                        .collect()
                })
                .collect();
            debug!(rows = table.len(), range, "memory store fetched table");
            Ok(table)
        })
    }

    fn write_cell<'a>(
        &'a self,
        row: usize,
        column: &'a str,
        value: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("memory store writes disabled".into()));
            }
            let col = column_index(column)
                .ok_or_else(|| StoreError::InvalidAddress(format!("bad column {column:?}")))?;
            let row_idx = row
                .checked_sub(1)
                .ok_or_else(|| StoreError::InvalidAddress("row numbers start at 1".into()))?;

            if let Some(delay) = self.write_delay {
                tokio::time::sleep(delay).await;
            }

            let mut rows = self.rows.lock().await;
            if rows.len() <= row_idx {
                rows.resize_with(row_idx + 1, Vec::new);
            }
            let cells = &mut rows[row_idx];
            if cells.len() <= col {
                cells.resize(col + 1, String::new());
            }
            cells[col] = value.to_string();
            self.writes.fetch_add(1, Ordering::SeqCst);
            debug!(row, column, "memory store wrote cell");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[&[&str]]) -> Table {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[tokio::test]
    async fn fetch_returns_rows_within_range() {
        let store = MemoryStore::new(table(&[
            &["Vendor", "Code", "Status", "Notes"],
            &["Acme", "A1", "", "extra"],
        ]));
        let rows = store.fetch_table("A:C").await.unwrap();
        assert_eq!(rows[0], vec!["Vendor", "Code", "Status"]);
        assert_eq!(rows[1], vec!["Acme", "A1", ""]);
    }

    #[tokio::test]
    async fn fetch_keeps_ragged_rows() {
        let store = MemoryStore::new(table(&[&["Vendor", "Code", "Status"], &["Acme"]]));
        let rows = store.fetch_table("A:C").await.unwrap();
        assert_eq!(rows[1], vec!["Acme"]);
    }

    #[tokio::test]
    async fn write_cell_grows_short_rows() {
        let store = MemoryStore::new(table(&[&["Vendor", "Code", "Status"], &["Acme", "A1"]]));
        store.write_cell(2, "C", "Usada").await.unwrap();
        assert_eq!(store.cell(2, "C").await, "Usada");
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn write_cell_past_end_appends_rows() {
        let store = MemoryStore::new(table(&[&["Vendor"]]));
        store.write_cell(4, "B", "x").await.unwrap();
        let rows = store.rows().await;
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[3], vec!["", "x"]);
    }

    #[tokio::test]
    async fn write_cell_rejects_row_zero_and_bad_column() {
        let store = MemoryStore::new(Table::new());
        assert!(matches!(
            store.write_cell(0, "C", "x").await,
            Err(StoreError::InvalidAddress(_))
        ));
        assert!(matches!(
            store.write_cell(2, "3", "x").await,
            Err(StoreError::InvalidAddress(_))
        ));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn failure_switches() {
        let store = MemoryStore::demo();
        store.set_fail_reads(true);
        assert!(store.fetch_table("A:C").await.is_err());
        store.set_fail_reads(false);
        assert!(store.fetch_table("A:C").await.is_ok());

        store.set_fail_writes(true);
        assert!(store.write_cell(2, "C", "Usada").await.is_err());
        assert_eq!(store.cell(2, "C").await, "");
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn demo_rows_have_header_and_data() {
        let rows = demo_rows();
        assert!(rows.len() > 1);
        assert!(rows.iter().all(|r| r.len() == 3));
    }

    #[tokio::test(start_paused = true)]
    async fn read_delay_holds_fetch() {
        let store = MemoryStore::new(table(&[&["Vendor", "Code", "Status"]]))
            .with_read_delay(Duration::from_secs(30));
        let fetch = store.fetch_table("A:C");
        let timed_out = tokio::time::timeout(Duration::from_secs(5), fetch).await;
        assert!(timed_out.is_err());

        let rows = tokio::time::timeout(Duration::from_secs(60), store.fetch_table("A:C"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rows.len(), 1);
    }
}
