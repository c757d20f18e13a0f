//! Target table and mode of an expanded command.

use crate::error::{Rejection, StageResult};
use crate::models::TableDescriptor;
use crate::repository::TableCatalog;
use crate::shortcut::target_name;

/// What a command asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Insert a row: `@table +col value ...`
    Add,
    /// Read rows: `@table ?col =col value ...`
    Query,
}

/// Classify a command by its second token
pub fn determine_mode(message: &str) -> std::result::Result<Mode, Rejection> {
    let mut tokens = message.split_whitespace().skip(1);
    match tokens.next() {
        None => Err(Rejection::MissingArguments),
        Some(token) if token.starts_with('+') => Ok(Mode::Add),
        Some(_) => Ok(Mode::Query),
    }
}

/// Look up the data table a command addresses
pub fn resolve_table(catalog: &dyn TableCatalog, message: &str) -> StageResult<TableDescriptor> {
    let name = target_name(message);
    catalog
        .find_data_table(name)?
        .ok_or_else(|| Rejection::UnknownTable(name.to_string()).into())
}

/// Text after the `@table` token, leading space included
#[must_use]
pub fn arguments(message: &str) -> &str {
    message.find(' ').map_or("", |at| &message[at..])
}
