//! Database schema definitions
//!
//! Constants for the metadata tables and the bookkeeping columns every
//! user-defined table carries, used with rusqlite.

/// Registry of user-defined tables
pub mod tables {
    /// Table name
    pub const TABLE: &str = "_tables";
    /// Storage identifier, also the SQLite table name
    pub const ID: &str = "id";
    /// Name used after `@`
    pub const DISPLAY_NAME: &str = "display_name";
    /// One of [`KIND_DATA`], [`KIND_SHORTCUT`], [`KIND_ACCESS`]
    pub const KIND: &str = "kind";
    /// Access-control table guarding a data table
    pub const ACCESS_TABLE: &str = "access_table";

    /// Rows are user data addressable by `@name`
    pub const KIND_DATA: &str = "data";
    /// Rows are shortcuts
    pub const KIND_SHORTCUT: &str = "shortcut";
    /// Rows are phone/password credentials
    pub const KIND_ACCESS: &str = "access";
}

/// Column definitions of data tables
pub mod columns {
    /// Table name
    pub const TABLE: &str = "_columns";
    /// Owning table
    pub const TABLE_ID: &str = "table_id";
    /// Declaration order
    pub const POSITION: &str = "position";
    /// SQLite column name
    pub const STORAGE_NAME: &str = "storage_name";
    /// Label used in commands
    pub const DISPLAY_NAME: &str = "display_name";
    /// Label used in replies
    pub const SMS_LABEL: &str = "sms_label";
    /// Value type name
    pub const COLUMN_TYPE: &str = "column_type";
    /// Writable through SMS
    pub const SMS_IN: &str = "sms_in";
    /// JSON array of multiple-choice options
    pub const OPTIONS: &str = "options";
}

/// Bookkeeping columns present on every user-defined table
pub mod bookkeeping {
    /// Row key
    pub const ID: &str = "_id";
    /// Completion marker
    pub const SAVED: &str = "_saved";
    /// Phone number that wrote the row
    pub const PHONE: &str = "_phone";
    /// Insert time
    pub const TIMESTAMP: &str = "_timestamp";

    /// Value of [`SAVED`] on completed rows
    pub const COMPLETE: &str = "COMPLETE";
}

/// Columns of shortcut tables
pub mod shortcut_table {
    /// Shortcut name
    pub const LABEL: &str = "label";
    /// Input pattern
    pub const INPUT: &str = "input";
    /// Output pattern
    pub const OUTPUT: &str = "output";
}

/// Columns of access-control tables
pub mod access_table {
    /// Phone number
    pub const PHONE: &str = "phone";
    /// Password
    pub const PASSWORD: &str = "password";
}
