//! Compiles `@table +label value +label value` into a validated row.

use tracing::debug;

use crate::error::Rejection;
use crate::models::{RowValues, TableDescriptor};
use crate::temporal::TemporalParser;
use crate::validation::ValueValidator;

/// Split the arguments of an add command into `(label, raw value)` pairs.
///
/// A pair starts at each `+` that opens the text or follows a space; its value
/// runs to the next such marker. Text before the first marker is ignored.
pub fn split_pairs(args: &str) -> Result<Vec<(&str, &str)>, Rejection> {
    let mut starts: Vec<usize> = args
        .match_indices(" +")
        .map(|(at, _)| at + 1)
        .collect();
    if args.starts_with('+') {
        starts.insert(0, 0);
    }

    let mut pairs = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).map_or(args.len(), |next| next - 1);
        let segment = &args[start + 1..end];
        let Some((label, value)) = segment.split_once(char::is_whitespace) else {
            return Err(Rejection::MissingValue(segment.trim().to_string()));
        };
        pairs.push((label, value.trim()));
    }
    Ok(pairs)
}

/// Build the row an add command inserts.
///
/// Every label must name a column and every value must validate; pairs for
/// columns closed to SMS input are then dropped. A later pair for the same
/// column replaces an earlier one.
pub fn compile_add(
    parser: &TemporalParser,
    table: &TableDescriptor,
    args: &str,
) -> Result<RowValues, Rejection> {
    let mut row = RowValues::new();
    for (label, raw) in split_pairs(args)? {
        let column = table
            .column_by_label(label)
            .ok_or_else(|| Rejection::UnknownColumn(label.to_string()))?;
        let value = ValueValidator::normalize(parser, column, raw)?;
        if column.sms_in {
            row.insert(column.storage_name.clone(), value);
        } else {
            debug!(column = label, "dropping value for column closed to SMS input");
        }
    }
    Ok(row)
}
