//! Data models for inbound commands and structured queries
//!
//! This module contains the table metadata handed to the interpreter by the
//! host, and the query representation the interpreter hands back.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TablesSmsError;

/// A text message received from a phone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Phone number of the sender
    pub sender: String,
    /// Raw message text
    pub body: String,
}

impl InboundMessage {
    /// Create a message from a sender and its text
    pub fn new(sender: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            body: body.into(),
        }
    }
}

/// Value type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Free text
    Text,
    /// Decimal number
    Number,
    /// Calendar date
    Date,
    /// Date and time of day
    DateTime,
    /// Time of day
    Time,
    /// Half-open span between two instants, stored as `start/end`
    DateRange,
    /// One of a fixed list of options
    MultipleChoice,
}

impl ColumnType {
    /// True for every type whose values are instants or intervals
    #[must_use]
    pub const fn is_temporal(self) -> bool {
        matches!(self, Self::Date | Self::DateTime | Self::Time | Self::DateRange)
    }

    /// Name used in stored definitions
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Date => "date",
            Self::DateTime => "date_time",
            Self::Time => "time",
            Self::DateRange => "date_range",
            Self::MultipleChoice => "multiple_choice",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = TablesSmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "number" => Ok(Self::Number),
            "date" => Ok(Self::Date),
            "date_time" => Ok(Self::DateTime),
            "time" => Ok(Self::Time),
            "date_range" => Ok(Self::DateRange),
            "multiple_choice" => Ok(Self::MultipleChoice),
            other => Err(TablesSmsError::InvalidDefinition(format!(
                "unknown column type: {other}"
            ))),
        }
    }
}

fn default_sms_in() -> bool {
    true
}

/// Metadata for one column of a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Name of the column in storage
    pub storage_name: String,
    /// Label users type after `+`, `=`, `?` and friends
    pub display_name: String,
    /// Label used when the column is printed in a reply
    #[serde(default)]
    pub sms_label: Option<String>,
    /// Value type
    pub column_type: ColumnType,
    /// Whether values may be written through SMS
    #[serde(default = "default_sms_in")]
    pub sms_in: bool,
    /// Allowed values for multiple-choice columns
    #[serde(default)]
    pub options: Vec<String>,
}

impl ColumnDescriptor {
    /// Create an SMS-writable column whose storage name and label coincide
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        let name = name.into();
        Self {
            storage_name: name.clone(),
            display_name: name,
            sms_label: None,
            column_type,
            sms_in: true,
            options: Vec::new(),
        }
    }

    /// Label printed next to values in replies
    #[must_use]
    pub fn response_label(&self) -> &str {
        self.sms_label.as_deref().unwrap_or(&self.display_name)
    }
}

/// Metadata for a table addressable by `@name`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Storage identifier of the table
    pub id: String,
    /// Name used after `@`
    pub display_name: String,
    /// Columns in declaration order
    pub columns: Vec<ColumnDescriptor>,
    /// Access-control table guarding this one, if any
    #[serde(default)]
    pub access_table: Option<String>,
}

impl TableDescriptor {
    /// Find a column by its display label
    #[must_use]
    pub fn column_by_label(&self, label: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.display_name == label)
    }

    /// Find a column by its storage name
    #[must_use]
    pub fn column_by_storage_name(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.storage_name == name)
    }
}

/// A named macro rewriting an abbreviated command into its full form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortcut {
    /// Name used after `@`
    pub name: String,
    /// Pattern matched against the text after the name, with `%key%` holes
    pub input_pattern: String,
    /// Replacement message, with the same `%key%` holes
    pub output_pattern: String,
}

/// Comparison operators for constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    /// Equality (=)
    Equals,
    /// Less than (<)
    LessThan,
    /// Greater than (>)
    GreaterThan,
    /// Greater than or equal (>=)
    GreaterThanEquals,
    /// Inequality (!=)
    NotEquals,
}

impl Comparator {
    /// SQL spelling of the operator
    #[must_use]
    pub const fn sql_operator(self) -> &'static str {
        match self {
            Self::Equals => "=",
            Self::LessThan => "<",
            Self::GreaterThan => ">",
            Self::GreaterThanEquals => ">=",
            Self::NotEquals => "!=",
        }
    }
}

/// One comparator applied to one value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    /// Operator
    pub comparator: Comparator,
    /// Stored-form value compared against
    pub value: String,
}

impl Comparison {
    /// Create a comparison
    pub fn new(comparator: Comparator, value: impl Into<String>) -> Self {
        Self {
            comparator,
            value: value.into(),
        }
    }
}

/// A filter on one column.
///
/// With a second comparison the constraint matches when either side matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    /// Storage name of the filtered column
    pub column: String,
    /// First comparison
    pub first: Comparison,
    /// Alternative comparison
    pub second: Option<Comparison>,
}

impl Constraint {
    /// A single-comparison constraint
    pub fn single(column: impl Into<String>, comparator: Comparator, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            first: Comparison::new(comparator, value),
            second: None,
        }
    }

    /// A constraint that matches when either comparison matches
    pub fn either(column: impl Into<String>, first: Comparison, second: Comparison) -> Self {
        Self {
            column: column.into(),
            first,
            second: Some(second),
        }
    }

    /// Iterate over the comparisons in order
    pub fn comparisons(&self) -> impl Iterator<Item = &Comparison> {
        std::iter::once(&self.first).chain(self.second.as_ref())
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Smallest first
    Ascending,
    /// Largest first
    Descending,
}

impl SortOrder {
    /// SQL spelling of the direction
    #[must_use]
    pub const fn sql_keyword(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// Column and direction to order results by
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// Storage name of the column
    pub column: String,
    /// Direction
    pub order: SortOrder,
}

/// Filters and ordering handed to the row store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredQuery {
    /// Constraints, all of which must hold
    pub constraints: Vec<Constraint>,
    /// Optional ordering
    pub order_by: Option<OrderBy>,
}

impl StructuredQuery {
    /// Create an empty query
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a constraint
    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    /// Set the ordering, replacing any previous one
    pub fn set_order_by(&mut self, column: impl Into<String>, order: SortOrder) {
        self.order_by = Some(OrderBy {
            column: column.into(),
            order,
        });
    }

    /// Remove and return every constraint on `column`, keeping the rest in order
    pub fn take_constraints_on(&mut self, column: &str) -> Vec<Constraint> {
        let (taken, kept): (Vec<Constraint>, Vec<Constraint>) = std::mem::take(&mut self.constraints)
            .into_iter()
            .partition(|c| c.column == column);
        self.constraints = kept;
        taken
    }
}

/// Slot column and minimum free-window length of an availability query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRequest {
    /// The date-range column describing occupied time
    pub column: ColumnDescriptor,
    /// Minimum gap reported as free
    pub duration: chrono::Duration,
}

/// A compiled query command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    /// Filters and ordering
    pub query: StructuredQuery,
    /// Columns printed in the reply, in request order
    pub projection: Vec<ColumnDescriptor>,
    /// Present for availability queries
    pub slot: Option<SlotRequest>,
}

/// Validated values of a row to insert, keyed by storage name
pub type RowValues = BTreeMap<String, String>;

/// One result row, cells in the requested column order
pub type Row = Vec<String>;
