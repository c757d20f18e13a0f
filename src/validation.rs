use crate::error::Rejection;
use crate::models::{ColumnDescriptor, ColumnType};
use crate::temporal::{format_instant, format_interval, TemporalParser};

/// Type-specific validation and normalization of cell values
#[derive(Debug, Copy, Clone)]
pub struct ValueValidator;

impl ValueValidator {
    /// Check `input` against the column's type and return the stored form
    pub fn normalize(
        parser: &TemporalParser,
        column: &ColumnDescriptor,
        input: &str,
    ) -> Result<String, Rejection> {
        let normalized = match column.column_type {
            ColumnType::Text => Some(input.to_string()),
            ColumnType::Number => Self::normalize_number(input),
            ColumnType::Date | ColumnType::DateTime | ColumnType::Time => {
                Self::normalize_instant(parser, input)
            },
            ColumnType::DateRange => parser.parse_interval(input).map(|i| format_interval(&i)),
            ColumnType::MultipleChoice => Self::normalize_choice(column, input),
        };

        normalized.ok_or_else(|| Rejection::InvalidValue {
            column: column.display_name.clone(),
            value: input.to_string(),
        })
    }

    fn normalize_number(input: &str) -> Option<String> {
        let trimmed = input.trim();
        trimmed.parse::<f64>().ok().filter(|n| n.is_finite())?;
        Some(trimmed.to_string())
    }

    /// A whole interval stands for its start
    fn normalize_instant(parser: &TemporalParser, input: &str) -> Option<String> {
        parser
            .parse_instant(input)
            .or_else(|| parser.parse_interval(input).map(|i| i.start))
            .map(format_instant)
    }

    fn normalize_choice(column: &ColumnDescriptor, input: &str) -> Option<String> {
        column
            .options
            .iter()
            .find(|opt| opt.eq_ignore_ascii_case(input.trim()))
            .cloned()
    }
}
