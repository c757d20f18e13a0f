//! Collaborator traits the interpreter consumes.
//!
//! The interpreter never touches storage or transport directly; the host
//! supplies these. Calls are synchronous and made strictly in pipeline order.

use crate::error::Result;
use crate::models::{Row, RowValues, Shortcut, StructuredQuery, TableDescriptor};

/// Read-only table metadata
#[cfg_attr(test, mockall::automock)]
pub trait TableCatalog {
    /// Find a data table by the name users type after `@`
    fn find_data_table(&self, display_name: &str) -> Result<Option<TableDescriptor>>;

    /// Every shortcut from every shortcut table
    fn shortcuts(&self) -> Result<Vec<Shortcut>>;
}

/// Lookup against an access-control table
#[cfg_attr(test, mockall::automock)]
pub trait AccessControl {
    /// True when a completed row in `access_table` pairs `phone` with `password`
    fn has_credential(&self, access_table: &str, phone: &str, password: &str) -> Result<bool>;
}

/// Query execution and row insertion
#[cfg_attr(test, mockall::automock)]
pub trait RowStore {
    /// Run `query` and return the cells of `columns` (storage names), in order
    fn select(
        &self,
        table: &TableDescriptor,
        query: &StructuredQuery,
        columns: &[String],
    ) -> Result<Vec<Row>>;

    /// Persist one completed row on behalf of `sender`
    fn insert(&self, table: &TableDescriptor, values: &RowValues, sender: &str) -> Result<()>;
}

/// Delivery of reply text
#[cfg_attr(test, mockall::automock)]
pub trait ResponseSender {
    /// Deliver `body` to `phone`; any length cutoff is the sender's business
    fn send(&self, phone: &str, body: &str) -> Result<()>;
}
