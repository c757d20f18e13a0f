//! Compiles `@table ?col =col value ~col d /slot 30m` into a [`QueryPlan`].
//!
//! Arguments are cut into segments at every space followed by one of the
//! operator characters `= < > ! / ~ ?`. A segment reads
//! `<operator><column label>[ <value>]`.

use crate::error::Rejection;
use crate::models::{
    ColumnDescriptor, ColumnType, Comparator, Comparison, Constraint, QueryPlan, SlotRequest,
    SortOrder, StructuredQuery, TableDescriptor,
};
use crate::temporal::{format_instant, format_interval, parse_duration, TemporalParser};
use crate::validation::ValueValidator;

/// Comparison requested by a filter segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    /// `=`
    Equals,
    /// `<`
    LessThan,
    /// `>`
    GreaterThan,
    /// `!`
    NotEquals,
}

/// What one query segment does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// `= < > !` filter
    Filter(FilterOp),
    /// `/` free-slot search on a date-range column
    Slot,
    /// `~` ordering; a value starting with `d` sorts descending
    Order,
    /// `?` column to print
    Project,
}

impl SegmentKind {
    /// Kind introduced by an operator character
    #[must_use]
    pub const fn from_marker(marker: char) -> Option<Self> {
        match marker {
            '=' => Some(Self::Filter(FilterOp::Equals)),
            '<' => Some(Self::Filter(FilterOp::LessThan)),
            '>' => Some(Self::Filter(FilterOp::GreaterThan)),
            '!' => Some(Self::Filter(FilterOp::NotEquals)),
            '/' => Some(Self::Slot),
            '~' => Some(Self::Order),
            '?' => Some(Self::Project),
            _ => None,
        }
    }
}

/// One operator segment of a query command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<'a> {
    /// Operator
    pub kind: SegmentKind,
    /// Column display label
    pub label: &'a str,
    /// Trimmed value, if the segment has one
    pub value: Option<&'a str>,
}

/// Cut query arguments into operator segments; text before the first one is ignored
#[must_use]
pub fn split_segments(args: &str) -> Vec<Segment<'_>> {
    let starts: Vec<(usize, SegmentKind)> = args
        .char_indices()
        .zip(args.chars().skip(1))
        .filter(|((_, c), _)| *c == ' ')
        .filter_map(|((at, _), next)| SegmentKind::from_marker(next).map(|kind| (at + 1, kind)))
        .collect();

    starts
        .iter()
        .enumerate()
        .map(|(i, &(start, kind))| {
            let end = starts.get(i + 1).map_or(args.len(), |&(next, _)| next - 1);
            let body = &args[start + 1..end];
            match body.split_once(' ') {
                Some((label, value)) => Segment {
                    kind,
                    label: label.trim(),
                    value: Some(value.trim()),
                },
                None => Segment {
                    kind,
                    label: body.trim(),
                    value: None,
                },
            }
        })
        .collect()
}

/// Compiles query commands against one table
#[derive(Debug, Clone, Copy)]
pub struct QueryCompiler<'a> {
    parser: &'a TemporalParser,
    table: &'a TableDescriptor,
}

impl<'a> QueryCompiler<'a> {
    /// Compiler for `table`, reading dates through `parser`
    #[must_use]
    pub const fn new(parser: &'a TemporalParser, table: &'a TableDescriptor) -> Self {
        Self { parser, table }
    }

    /// Compile the arguments of a query command.
    ///
    /// A plan without any `?` column must be a slot query.
    pub fn compile(&self, args: &str) -> Result<QueryPlan, Rejection> {
        let mut query = StructuredQuery::new();
        let mut projection = Vec::new();
        let mut slot: Option<SlotRequest> = None;

        for segment in split_segments(args) {
            let column = self
                .table
                .column_by_label(segment.label)
                .ok_or_else(|| Rejection::UnknownColumn(segment.label.to_string()))?;

            match segment.kind {
                SegmentKind::Project => projection.push(column.clone()),
                SegmentKind::Order => {
                    let order = if segment.value.is_some_and(|v| v.starts_with('d')) {
                        SortOrder::Descending
                    } else {
                        SortOrder::Ascending
                    };
                    query.set_order_by(column.storage_name.clone(), order);
                },
                SegmentKind::Slot => {
                    if slot.is_some() {
                        return Err(Rejection::DuplicateSlot);
                    }
                    if column.column_type != ColumnType::DateRange {
                        return Err(Rejection::SlotColumnNotRange(column.display_name.clone()));
                    }
                    let raw = required_value(&segment, column)?;
                    let duration = parse_duration(raw)
                        .ok_or_else(|| Rejection::InvalidDuration(raw.to_string()))?;
                    slot = Some(SlotRequest {
                        column: column.clone(),
                        duration,
                    });
                },
                SegmentKind::Filter(op) => {
                    let raw = required_value(&segment, column)?;
                    for constraint in self.build_constraints(column, op, raw)? {
                        query.add_constraint(constraint);
                    }
                },
            }
        }

        if projection.is_empty() && slot.is_none() {
            return Err(Rejection::NoOutputColumns);
        }
        Ok(QueryPlan {
            query,
            projection,
            slot,
        })
    }

    /// Constraints expressing `column <kind> raw`
    pub fn build_constraints(
        &self,
        column: &ColumnDescriptor,
        op: FilterOp,
        raw: &str,
    ) -> Result<Vec<Constraint>, Rejection> {
        if column.column_type.is_temporal() {
            self.temporal_constraints(column, op, raw)
        } else {
            let value = ValueValidator::normalize(self.parser, column, raw)?;
            let comparator = match op {
                FilterOp::Equals => Comparator::Equals,
                FilterOp::LessThan => Comparator::LessThan,
                FilterOp::GreaterThan => Comparator::GreaterThan,
                FilterOp::NotEquals => Comparator::NotEquals,
            };
            Ok(vec![Constraint::single(&column.storage_name, comparator, value)])
        }
    }

    fn temporal_constraints(
        &self,
        column: &ColumnDescriptor,
        op: FilterOp,
        raw: &str,
    ) -> Result<Vec<Constraint>, Rejection> {
        let name = column.storage_name.as_str();
        let is_range = column.column_type == ColumnType::DateRange;

        if let Some(interval) = self.parser.parse_interval(raw) {
            let start = format_instant(interval.start);
            let end = format_instant(interval.end);
            let constraints = match op {
                FilterOp::Equals if is_range => vec![Constraint::single(
                    name,
                    Comparator::Equals,
                    format_interval(&interval),
                )],
                FilterOp::Equals => vec![
                    Constraint::single(name, Comparator::GreaterThanEquals, start),
                    Constraint::single(name, Comparator::LessThan, end),
                ],
                FilterOp::LessThan => vec![Constraint::single(name, Comparator::LessThan, start)],
                FilterOp::GreaterThan => {
                    vec![Constraint::single(name, Comparator::GreaterThanEquals, end)]
                },
                FilterOp::NotEquals if is_range => vec![Constraint::single(
                    name,
                    Comparator::NotEquals,
                    format_interval(&interval),
                )],
                FilterOp::NotEquals => vec![Constraint::either(
                    name,
                    Comparison::new(Comparator::LessThan, start),
                    Comparison::new(Comparator::GreaterThanEquals, end),
                )],
            };
            return Ok(constraints);
        }

        let instant = self.parser.parse_instant(raw).ok_or_else(|| Rejection::InvalidValue {
            column: column.display_name.clone(),
            value: raw.to_string(),
        })?;
        let value = format_instant(instant);
        let comparator = match op {
            FilterOp::Equals if is_range => {
                return Err(Rejection::RangeEqualityNeedsInterval(column.display_name.clone()));
            },
            FilterOp::Equals => Comparator::Equals,
            FilterOp::LessThan => Comparator::LessThan,
            FilterOp::GreaterThan => Comparator::GreaterThan,
            FilterOp::NotEquals => Comparator::NotEquals,
        };
        Ok(vec![Constraint::single(name, comparator, value)])
    }
}

fn required_value<'s>(segment: &Segment<'s>, column: &ColumnDescriptor) -> Result<&'s str, Rejection> {
    segment
        .value
        .ok_or_else(|| Rejection::MissingValue(column.display_name.clone()))
}
