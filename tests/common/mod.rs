//! In-memory host used by the integration tests

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;

use tables_sms::models::{
    ColumnDescriptor, ColumnType, Comparator, Comparison, Row, RowValues, Shortcut, SortOrder,
    StructuredQuery, TableDescriptor,
};
use tables_sms::repository::{AccessControl, ResponseSender, RowStore, TableCatalog};
use tables_sms::Result;

/// Tables, rows, credentials and outgoing replies kept in memory.
///
/// Values compare as strings, which matches the canonical date encoding.
#[derive(Default)]
pub struct FakeHost {
    pub tables: Vec<TableDescriptor>,
    pub shortcuts: Vec<Shortcut>,
    pub credentials: Vec<(String, String, String)>,
    pub rows: RefCell<HashMap<String, Vec<RowValues>>>,
    pub sent: RefCell<Vec<(String, String)>>,
    pub calls: RefCell<usize>,
}

impl FakeHost {
    pub fn new(tables: Vec<TableDescriptor>) -> Self {
        Self {
            tables,
            ..Self::default()
        }
    }

    pub fn seed(&self, table: &str, rows: Vec<RowValues>) {
        self.rows
            .borrow_mut()
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    pub fn rows_of(&self, table: &str) -> Vec<RowValues> {
        self.rows.borrow().get(table).cloned().unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        *self.calls.borrow()
    }

    fn touch(&self) {
        *self.calls.borrow_mut() += 1;
    }
}

fn matches(comparison: &Comparison, cell: &str) -> bool {
    let value = comparison.value.as_str();
    match comparison.comparator {
        Comparator::Equals => cell == value,
        Comparator::NotEquals => cell != value,
        Comparator::LessThan => cell < value,
        Comparator::GreaterThan => cell > value,
        Comparator::GreaterThanEquals => cell >= value,
    }
}

impl TableCatalog for FakeHost {
    fn find_data_table(&self, display_name: &str) -> Result<Option<TableDescriptor>> {
        self.touch();
        Ok(self
            .tables
            .iter()
            .find(|t| t.display_name == display_name)
            .cloned())
    }

    fn shortcuts(&self) -> Result<Vec<Shortcut>> {
        self.touch();
        Ok(self.shortcuts.clone())
    }
}

impl AccessControl for FakeHost {
    fn has_credential(&self, access_table: &str, phone: &str, password: &str) -> Result<bool> {
        self.touch();
        Ok(self
            .credentials
            .iter()
            .any(|(t, p, pw)| t == access_table && p == phone && pw == password))
    }
}

impl RowStore for FakeHost {
    fn select(
        &self,
        table: &TableDescriptor,
        query: &StructuredQuery,
        columns: &[String],
    ) -> Result<Vec<Row>> {
        self.touch();
        let mut rows: Vec<RowValues> = self
            .rows_of(&table.id)
            .into_iter()
            .filter(|row| {
                query.constraints.iter().all(|constraint| {
                    let cell = row.get(&constraint.column).map_or("", String::as_str);
                    constraint.comparisons().any(|c| matches(c, cell))
                })
            })
            .collect();
        if let Some(order) = &query.order_by {
            rows.sort_by(|a, b| a.get(&order.column).cmp(&b.get(&order.column)));
            if order.order == SortOrder::Descending {
                rows.reverse();
            }
        }
        Ok(rows
            .into_iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|c| row.get(c).cloned().unwrap_or_default())
                    .collect()
            })
            .collect())
    }

    fn insert(&self, table: &TableDescriptor, values: &RowValues, _sender: &str) -> Result<()> {
        self.touch();
        self.seed(&table.id, vec![values.clone()]);
        Ok(())
    }
}

impl ResponseSender for FakeHost {
    fn send(&self, phone: &str, body: &str) -> Result<()> {
        self.touch();
        self.sent
            .borrow_mut()
            .push((phone.to_string(), body.to_string()));
        Ok(())
    }
}

/// `@house`: Name, Region (closed to SMS input), Beds, avail (date range)
pub fn house() -> TableDescriptor {
    let mut region = ColumnDescriptor::new("Region", ColumnType::Text);
    region.sms_in = false;
    TableDescriptor {
        id: "house".to_string(),
        display_name: "house".to_string(),
        columns: vec![
            ColumnDescriptor::new("Name", ColumnType::Text),
            region,
            ColumnDescriptor::new("Beds", ColumnType::Number),
            ColumnDescriptor::new("avail", ColumnType::DateRange),
        ],
        access_table: None,
    }
}

pub fn row(pairs: &[(&str, &str)]) -> RowValues {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}
