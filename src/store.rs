use std::fs;
use std::path::Path;

use chrono::Local;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Result, TablesSmsError};
use crate::models::{
    ColumnDescriptor, ColumnType, Comparison, Constraint, Row, RowValues, Shortcut,
    StructuredQuery, TableDescriptor,
};
use crate::repository::{AccessControl, RowStore, TableCatalog};
use crate::schema::{access_table, bookkeeping, columns, shortcut_table, tables};
use crate::temporal::format_instant;

// Type alias for the database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Quote `name` for use as an SQL identifier, refusing anything outside
/// `[A-Za-z0-9_]`
pub fn quote_identifier(name: &str) -> Result<String> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(TablesSmsError::InvalidDefinition(format!(
            "invalid identifier: {name:?}"
        )));
    }
    Ok(format!("\"{name}\""))
}

/// SQLite-backed table catalog, credential lookup and row store
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path`
    pub fn open(path: &str, max_connections: u32) -> Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            fs::create_dir_all(parent)?;
        }

        let manager = SqliteConnectionManager::file(path)
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder().max_size(max_connections).build(manager)?;

        let conn = pool.get()?;
        Self::run_migrations(&conn)?;
        info!(path, "database opened");

        Ok(Self { pool })
    }

    fn run_migrations(conn: &Connection) -> Result<()> {
        conn.execute_batch(include_str!(
            "../migrations/2024-01-01-000000_create_metadata/up.sql"
        ))?;
        Ok(())
    }

    /// Get a connection from the pool
    pub fn get_connection(&self) -> Result<DbConnection> {
        Ok(self.pool.get()?)
    }

    /// Create a data table and register its columns
    pub fn define_table(&self, table: &TableDescriptor) -> Result<()> {
        let quoted = quote_identifier(&table.id)?;
        if table.columns.is_empty() {
            return Err(TablesSmsError::InvalidDefinition(format!(
                "table {} has no columns",
                table.display_name
            )));
        }
        let mut column_sql = Vec::with_capacity(table.columns.len());
        for column in &table.columns {
            if column.storage_name.starts_with('_') {
                return Err(TablesSmsError::InvalidDefinition(format!(
                    "column name {} is reserved",
                    column.storage_name
                )));
            }
            if column.column_type == ColumnType::MultipleChoice && column.options.is_empty() {
                return Err(TablesSmsError::InvalidDefinition(format!(
                    "multiple-choice column {} has no options",
                    column.display_name
                )));
            }
            column_sql.push(format!("{} TEXT", quote_identifier(&column.storage_name)?));
        }

        let mut conn = self.get_connection()?;
        let tx = conn.transaction()?;
        tx.execute(
            &format!(
                "INSERT INTO {} ({}, {}, {}, {}) VALUES (?, ?, ?, ?)",
                tables::TABLE,
                tables::ID,
                tables::DISPLAY_NAME,
                tables::KIND,
                tables::ACCESS_TABLE
            ),
            params![table.id, table.display_name, tables::KIND_DATA, table.access_table],
        )?;
        for (position, column) in table.columns.iter().enumerate() {
            tx.execute(
                &format!(
                    "INSERT INTO {} ({}, {}, {}, {}, {}, {}, {}, {}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                    columns::TABLE,
                    columns::TABLE_ID,
                    columns::POSITION,
                    columns::STORAGE_NAME,
                    columns::DISPLAY_NAME,
                    columns::SMS_LABEL,
                    columns::COLUMN_TYPE,
                    columns::SMS_IN,
                    columns::OPTIONS
                ),
                params![
                    table.id,
                    position as i64,
                    column.storage_name,
                    column.display_name,
                    column.sms_label,
                    column.column_type.as_str(),
                    column.sms_in,
                    serde_json::to_string(&column.options)?
                ],
            )?;
        }
        tx.execute_batch(&format!(
            "CREATE TABLE {quoted} ({}, {});",
            Self::bookkeeping_sql(),
            column_sql.join(", ")
        ))?;
        tx.commit()?;

        info!(table = %table.display_name, columns = table.columns.len(), "table defined");
        Ok(())
    }

    fn bookkeeping_sql() -> String {
        format!(
            "{} INTEGER PRIMARY KEY, {} TEXT, {} TEXT, {} TEXT",
            bookkeeping::ID,
            bookkeeping::SAVED,
            bookkeeping::PHONE,
            bookkeeping::TIMESTAMP
        )
    }

    /// Register a helper table of `kind` with `fields` if it does not exist yet
    fn ensure_helper_table(&self, id: &str, kind: &str, fields: &[&str]) -> Result<()> {
        let quoted = quote_identifier(id)?;
        let mut conn = self.get_connection()?;
        let existing: Option<String> = conn
            .query_row(
                &format!("SELECT {} FROM {} WHERE {} = ?", tables::KIND, tables::TABLE, tables::ID),
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        match existing {
            Some(found) if found == kind => return Ok(()),
            Some(found) => {
                return Err(TablesSmsError::InvalidDefinition(format!(
                    "table {id} already exists as a {found} table"
                )))
            },
            None => {},
        }

        let field_sql: Vec<String> = fields.iter().map(|f| format!("{f} TEXT")).collect();
        let tx = conn.transaction()?;
        tx.execute(
            &format!(
                "INSERT INTO {} ({}, {}, {}) VALUES (?, ?, ?)",
                tables::TABLE,
                tables::ID,
                tables::DISPLAY_NAME,
                tables::KIND
            ),
            params![id, id, kind],
        )?;
        tx.execute_batch(&format!(
            "CREATE TABLE {quoted} ({}, {});",
            Self::bookkeeping_sql(),
            field_sql.join(", ")
        ))?;
        tx.commit()?;
        debug!(table = id, kind, "helper table created");
        Ok(())
    }

    fn insert_completed(&self, id: &str, fields: &[(&str, &str)], phone: &str) -> Result<()> {
        let quoted = quote_identifier(id)?;
        let mut names: Vec<String> = Vec::with_capacity(fields.len() + 3);
        let mut values: Vec<String> = Vec::with_capacity(fields.len() + 3);
        for (name, value) in fields {
            names.push(quote_identifier(name)?);
            values.push((*value).to_string());
        }
        names.extend([
            bookkeeping::SAVED.to_string(),
            bookkeeping::PHONE.to_string(),
            bookkeeping::TIMESTAMP.to_string(),
        ]);
        values.extend([
            bookkeeping::COMPLETE.to_string(),
            phone.to_string(),
            format_instant(Local::now().naive_local()),
        ]);

        let placeholders = vec!["?"; values.len()].join(", ");
        let conn = self.get_connection()?;
        conn.execute(
            &format!("INSERT INTO {quoted} ({}) VALUES ({placeholders})", names.join(", ")),
            params_from_iter(values.iter()),
        )?;
        Ok(())
    }

    /// Add a shortcut to shortcut table `table`, creating the table if needed
    pub fn add_shortcut(&self, table: &str, shortcut: &Shortcut) -> Result<()> {
        self.ensure_helper_table(
            table,
            tables::KIND_SHORTCUT,
            &[shortcut_table::LABEL, shortcut_table::INPUT, shortcut_table::OUTPUT],
        )?;
        self.insert_completed(
            table,
            &[
                (shortcut_table::LABEL, shortcut.name.as_str()),
                (shortcut_table::INPUT, shortcut.input_pattern.as_str()),
                (shortcut_table::OUTPUT, shortcut.output_pattern.as_str()),
            ],
            "",
        )?;
        info!(table, shortcut = %shortcut.name, "shortcut added");
        Ok(())
    }

    /// Store a credential in access table `table`, creating it if needed
    pub fn grant(&self, table: &str, phone: &str, password: &str) -> Result<()> {
        self.ensure_helper_table(
            table,
            tables::KIND_ACCESS,
            &[access_table::PHONE, access_table::PASSWORD],
        )?;
        self.insert_completed(
            table,
            &[(access_table::PHONE, phone), (access_table::PASSWORD, password)],
            phone,
        )?;
        info!(table, phone, "credential granted");
        Ok(())
    }

    fn load_columns(conn: &Connection, table_id: &str) -> Result<Vec<ColumnDescriptor>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {}, {}, {}, {}, {}, {} FROM {} WHERE {} = ? ORDER BY {}",
            columns::STORAGE_NAME,
            columns::DISPLAY_NAME,
            columns::SMS_LABEL,
            columns::COLUMN_TYPE,
            columns::SMS_IN,
            columns::OPTIONS,
            columns::TABLE,
            columns::TABLE_ID,
            columns::POSITION
        ))?;
        let raw = stmt.query_map(params![table_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, bool>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut result = Vec::new();
        for entry in raw {
            let (storage_name, display_name, sms_label, column_type, sms_in, options) = entry?;
            result.push(ColumnDescriptor {
                storage_name,
                display_name,
                sms_label,
                column_type: column_type.parse()?,
                sms_in,
                options: serde_json::from_str(&options)?,
            });
        }
        Ok(result)
    }

    /// Left-hand side of a comparison; numbers compare numerically
    fn column_expression(table: &TableDescriptor, column: &str) -> Result<String> {
        let quoted = quote_identifier(column)?;
        let numeric = table
            .column_by_storage_name(column)
            .is_some_and(|c| c.column_type == ColumnType::Number);
        Ok(if numeric {
            format!("CAST({quoted} AS REAL)")
        } else {
            quoted
        })
    }

    fn comparison_sql(
        table: &TableDescriptor,
        column: &str,
        comparison: &Comparison,
        params: &mut Vec<String>,
    ) -> Result<String> {
        let lhs = Self::column_expression(table, column)?;
        params.push(comparison.value.clone());
        let rhs = if lhs.starts_with("CAST") {
            "CAST(? AS REAL)"
        } else {
            "?"
        };
        Ok(format!("{lhs} {} {rhs}", comparison.comparator.sql_operator()))
    }

    /// SQL for one constraint; two comparisons are joined with `OR`
    fn constraint_sql(
        table: &TableDescriptor,
        constraint: &Constraint,
        params: &mut Vec<String>,
    ) -> Result<String> {
        let parts = constraint
            .comparisons()
            .map(|c| Self::comparison_sql(table, &constraint.column, c, params))
            .collect::<Result<Vec<_>>>()?;
        Ok(if parts.len() == 1 {
            parts.join("")
        } else {
            format!("({})", parts.join(" OR "))
        })
    }

    /// Build the `SELECT` for `query`, returning the SQL and its parameters
    pub fn select_sql(
        table: &TableDescriptor,
        query: &StructuredQuery,
        columns: &[String],
    ) -> Result<(String, Vec<String>)> {
        let projection = columns
            .iter()
            .map(|c| quote_identifier(c))
            .collect::<Result<Vec<_>>>()?;
        let mut params = vec![bookkeeping::COMPLETE.to_string()];
        let mut clauses = vec![format!("{} = ?", bookkeeping::SAVED)];
        for constraint in &query.constraints {
            clauses.push(Self::constraint_sql(table, constraint, &mut params)?);
        }

        let mut sql = format!(
            "SELECT {} FROM {} WHERE {}",
            projection.join(", "),
            quote_identifier(&table.id)?,
            clauses.join(" AND ")
        );
        if let Some(order) = &query.order_by {
            sql.push_str(&format!(
                " ORDER BY {} {}",
                Self::column_expression(table, &order.column)?,
                order.order.sql_keyword()
            ));
        } else {
            sql.push_str(&format!(" ORDER BY {}", bookkeeping::ID));
        }
        Ok((sql, params))
    }
}

impl TableCatalog for SqliteStore {
    fn find_data_table(&self, display_name: &str) -> Result<Option<TableDescriptor>> {
        let conn = self.get_connection()?;
        let found: Option<(String, String, Option<String>)> = conn
            .query_row(
                &format!(
                    "SELECT {}, {}, {} FROM {} WHERE {} = ? AND {} = ?",
                    tables::ID,
                    tables::DISPLAY_NAME,
                    tables::ACCESS_TABLE,
                    tables::TABLE,
                    tables::DISPLAY_NAME,
                    tables::KIND
                ),
                params![display_name, tables::KIND_DATA],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((id, display_name, access_table)) = found else {
            return Ok(None);
        };
        let columns = Self::load_columns(&conn, &id)?;
        Ok(Some(TableDescriptor {
            id,
            display_name,
            columns,
            access_table,
        }))
    }

    fn shortcuts(&self) -> Result<Vec<Shortcut>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} WHERE {} = ? ORDER BY {}",
            tables::ID,
            tables::TABLE,
            tables::KIND,
            tables::ID
        ))?;
        let ids = stmt
            .query_map(params![tables::KIND_SHORTCUT], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut shortcuts = Vec::new();
        for id in ids {
            let mut stmt = conn.prepare(&format!(
                "SELECT {}, {}, {} FROM {} WHERE {} = ? ORDER BY {}",
                shortcut_table::LABEL,
                shortcut_table::INPUT,
                shortcut_table::OUTPUT,
                quote_identifier(&id)?,
                bookkeeping::SAVED,
                bookkeeping::ID
            ))?;
            let rows = stmt.query_map(params![bookkeeping::COMPLETE], |row| {
                Ok(Shortcut {
                    name: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                    input_pattern: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    output_pattern: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                })
            })?;
            for shortcut in rows {
                shortcuts.push(shortcut?);
            }
        }
        Ok(shortcuts)
    }
}

impl AccessControl for SqliteStore {
    fn has_credential(&self, acl: &str, phone: &str, password: &str) -> Result<bool> {
        let conn = self.get_connection()?;
        let exists: bool = conn.query_row(
            &format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ? AND {} = ? AND {} = ?)",
                quote_identifier(acl)?,
                bookkeeping::SAVED,
                access_table::PHONE,
                access_table::PASSWORD
            ),
            params![bookkeeping::COMPLETE, phone, password],
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}

impl RowStore for SqliteStore {
    fn select(
        &self,
        table: &TableDescriptor,
        query: &StructuredQuery,
        columns: &[String],
    ) -> Result<Vec<Row>> {
        let (sql, params) = Self::select_sql(table, query, columns)?;
        debug!(%sql, "running select");

        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&sql)?;
        let width = columns.len();
        let rows = stmt.query_map(params_from_iter(params.iter()), |row| {
            (0..width)
                .map(|i| Ok(row.get::<_, Option<String>>(i)?.unwrap_or_default()))
                .collect::<rusqlite::Result<Row>>()
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    fn insert(&self, table: &TableDescriptor, values: &RowValues, sender: &str) -> Result<()> {
        for name in values.keys() {
            if table.column_by_storage_name(name).is_none() {
                return Err(TablesSmsError::InvalidDefinition(format!(
                    "table {} has no column {name}",
                    table.display_name
                )));
            }
        }
        let fields: Vec<(&str, &str)> = values
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        self.insert_completed(&table.id, &fields, sender)
    }
}
