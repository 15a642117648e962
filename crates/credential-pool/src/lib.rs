//! Credential pool manager
//!
//! Hands out single-use credentials from vendor pools kept in an external
//! table, so that no credential is issued twice until it is released. The
//! table is cached in process; the store is only asked to read everything or
//! write one status cell.
//!
//! Row lifecycle:
//! 1. Refresh loads the table, skips the header, indexes rows by lowercased vendor
//! 2. Allocate picks the vendor's first AVAILABLE row, writes the used marker to
//!    its status cell, then marks the row USED locally
//! 3. Release finds the vendor's row holding a credential, clears its status
//!    cell, then marks it AVAILABLE locally
//! 4. A failed refresh empties the pool and marks it degraded until the next
//!    successful refresh

pub mod error;
pub mod issue;
pub mod layout;
pub mod pool;
pub mod stats;

pub use error::{Error, Result};
pub use issue::{DEFAULT_MESSAGE_TEMPLATE, Issued, Issuer};
pub use layout::{DEFAULT_USED_MARKER, PoolRow, RowStatus, SheetLayout};
pub use pool::{Allocation, DEFAULT_STORE_TIMEOUT, PoolHealth, PoolManager, Release};
pub use stats::{PoolStats, VendorStats};
