//! Runs compiled query plans and renders the reply text.

use tracing::debug;

use crate::availability::AvailabilityMerger;
use crate::error::{Rejection, StageResult};
use crate::models::{ColumnDescriptor, QueryPlan, Row, SortOrder, TableDescriptor};
use crate::repository::RowStore;

/// Reply when a simple query matches nothing
pub const NO_ROWS: &str = "No rows found.";

/// Render rows as `label:value` cells joined by `,`, rows joined by `;`.
///
/// At most `limit` rows are rendered.
#[must_use]
pub fn render_rows(columns: &[ColumnDescriptor], rows: &[Row], limit: usize) -> String {
    if rows.is_empty() {
        return NO_ROWS.to_string();
    }
    rows.iter()
        .take(limit)
        .map(|row| {
            columns
                .iter()
                .zip(row)
                .map(|(column, value)| format!("{}:{value}", column.response_label()))
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Executes query plans against a [`RowStore`]
pub struct Responder<'a> {
    store: &'a dyn RowStore,
    row_limit: usize,
}

impl<'a> Responder<'a> {
    /// Responder rendering at most `row_limit` rows per reply
    #[must_use]
    pub fn new(store: &'a dyn RowStore, row_limit: usize) -> Self {
        Self { store, row_limit }
    }

    /// Run `plan` and produce the reply body
    pub fn respond(&self, table: &TableDescriptor, plan: QueryPlan) -> StageResult<String> {
        if plan.slot.is_some() {
            self.respond_slots(table, plan)
        } else {
            self.respond_rows(table, &plan)
        }
    }

    fn respond_rows(&self, table: &TableDescriptor, plan: &QueryPlan) -> StageResult<String> {
        let columns: Vec<String> = plan
            .projection
            .iter()
            .map(|c| c.storage_name.clone())
            .collect();
        let rows = self.store.select(table, &plan.query, &columns)?;
        debug!(table = %table.display_name, rows = rows.len(), "simple query executed");
        Ok(render_rows(&plan.projection, &rows, self.row_limit))
    }

    /// Availability reply: slot-column constraints are lifted out of the
    /// query and folded into the merge instead of filtering rows.
    fn respond_slots(&self, table: &TableDescriptor, plan: QueryPlan) -> StageResult<String> {
        let QueryPlan {
            mut query, slot, ..
        } = plan;
        let Some(slot) = slot else {
            return Err(Rejection::NoOutputColumns.into());
        };
        let column = slot.column.storage_name;

        let bounds = query.take_constraints_on(&column);
        query.set_order_by(column.clone(), SortOrder::Ascending);
        let rows = self.store.select(table, &query, std::slice::from_ref(&column))?;
        debug!(
            table = %table.display_name,
            rows = rows.len(),
            bounds = bounds.len(),
            "slot query executed"
        );

        let cells: Vec<&str> = rows
            .iter()
            .filter_map(|row| row.first().map(String::as_str))
            .collect();
        Ok(AvailabilityMerger::new(slot.duration).free_windows(&cells, &bounds)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Comparator, ColumnType, Constraint, SlotRequest, StructuredQuery,
    };
    use crate::repository::MockRowStore;

    fn table() -> TableDescriptor {
        TableDescriptor {
            id: "house".to_string(),
            display_name: "house".to_string(),
            columns: vec![
                ColumnDescriptor::new("Name", ColumnType::Text),
                ColumnDescriptor::new("avail", ColumnType::DateRange),
            ],
            access_table: None,
        }
    }

    #[test]
    fn test_render_rows() {
        let mut name = ColumnDescriptor::new("Name", ColumnType::Text);
        name.sms_label = Some("n".to_string());
        let beds = ColumnDescriptor::new("Beds", ColumnType::Number);
        let rows = vec![
            vec!["Joe's Cafe".to_string(), "2".to_string()],
            vec!["Elm".to_string(), "4".to_string()],
        ];
        assert_eq!(
            render_rows(&[name, beds], &rows, 25),
            "n:Joe's Cafe,Beds:2;n:Elm,Beds:4"
        );
    }

    #[test]
    fn test_render_no_rows() {
        assert_eq!(render_rows(&[], &[], 25), NO_ROWS);
    }

    #[test]
    fn test_render_caps_rows() {
        let name = ColumnDescriptor::new("Name", ColumnType::Text);
        let rows: Vec<Row> = (0..30).map(|i| vec![i.to_string()]).collect();
        let body = render_rows(std::slice::from_ref(&name), &rows, 25);
        assert_eq!(body.split(';').count(), 25);
        assert!(body.ends_with("Name:24"));
    }

    #[test]
    fn test_slot_query_lifts_slot_constraints() {
        let table = table();
        let avail = table.columns[1].clone();
        let mut query = StructuredQuery::new();
        query.add_constraint(Constraint::single("Name", Comparator::Equals, "Elm"));
        query.add_constraint(Constraint::single(
            "avail",
            Comparator::LessThan,
            "2024-01-10T17:00",
        ));
        let plan = QueryPlan {
            query,
            projection: Vec::new(),
            slot: Some(SlotRequest {
                column: avail,
                duration: chrono::Duration::minutes(30),
            }),
        };

        let mut store = MockRowStore::new();
        store
            .expect_select()
            .withf(|_, query, columns| {
                columns == ["avail".to_string()]
                    && query.constraints.len() == 1
                    && query.constraints[0].column == "Name"
                    && query
                        .order_by
                        .as_ref()
                        .is_some_and(|o| o.column == "avail" && o.order == SortOrder::Ascending)
            })
            .times(1)
            .returning(|_, _, _| Ok(vec![vec!["2024-01-10T09:00/2024-01-10T10:00".to_string()]]));

        let body = Responder::new(&store, 25).respond(&table, plan).unwrap();
        assert_eq!(body, "before 2024-01-10T09:00;2024-01-10T10:00-2024-01-10T17:00");
    }
}
