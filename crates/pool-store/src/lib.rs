//! Store adapter for credential pool tables
//!
//! The pool's authoritative state lives in an external spreadsheet-like store
//! that offers exactly two operations: read every row of a range, and write a
//! single cell. There is no batching, no transaction and no row locking, so
//! all consistency decisions are left to the caller.
//!
//! Implementations:
//! - `SheetsStore` talks to the Google Sheets v4 values API
//! - `MemoryStore` keeps rows in process (demo/offline mode and tests)

pub mod a1;
pub mod error;
pub mod memory;
pub mod sheets;

pub use error::{Result, StoreError};
pub use memory::{MemoryStore, demo_rows};
pub use sheets::SheetsStore;

use std::future::Future;
use std::pin::Pin;

/// Ordered rows of ordered string cells, header row included.
pub type Table = Vec<Vec<String>>;

/// Persistence boundary for the pool table.
///
/// Row numbers are 1-based and count the header row, matching spreadsheet
/// addressing. Columns are A1 letters (`"C"`, `"G"`, `"AA"`).
///
/// Uses `Pin<Box<dyn Future>>` return types so the pool can hold an
/// `Arc<dyn StoreAdapter>`.
pub trait StoreAdapter: Send + Sync {
    /// Identifier for logging (e.g. "sheets", "memory")
    fn id(&self) -> &str;

    /// Fetch every row in `range` (A1 column range such as `"A:C"`).
    ///
    /// An empty table is a valid answer. Rows may be ragged: trailing empty
    /// cells are commonly omitted by the store.
    fn fetch_table<'a>(
        &'a self,
        range: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Table>> + Send + 'a>>;

    /// Overwrite one cell.
    fn write_cell<'a>(
        &'a self,
        row: usize,
        column: &'a str,
        value: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}
