//! Error types for the tables-sms library.
//!
//! Two families live here. [`TablesSmsError`] covers failures of the
//! collaborators the interpreter talks to (storage, transport, configuration)
//! and is propagated with `?`. [`Rejection`] describes why an inbound message
//! was not handled; it is an ordinary outcome, never an error raised to the
//! transport layer.

use thiserror::Error;

/// Errors that can occur while talking to storage, transport or configuration.
#[derive(Error, Debug)]
pub enum TablesSmsError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Connection pool errors
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A table, column or shortcut definition that cannot be stored
    #[error("Invalid table definition: {0}")]
    InvalidDefinition(String),

    /// The response transport failed to deliver a reply
    #[error("Transport error: {0}")]
    Transport(String),

    /// General error with context
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Result with TablesSmsError
pub type Result<T> = std::result::Result<T, TablesSmsError>;

impl From<anyhow::Error> for TablesSmsError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

/// Reasons an inbound message is not handled.
///
/// Every variant is terminal: nothing is inserted and no query runs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The text does not start with `@` or has no space
    #[error("not a command")]
    NotACommand,

    /// The command has no second token
    #[error("command has no arguments")]
    MissingArguments,

    /// No data table carries this display name
    #[error("unknown table: {0}")]
    UnknownTable(String),

    /// The table has no column with this display label
    #[error("unknown column: {0}")]
    UnknownColumn(String),

    /// A `+label` or operator segment is missing its value
    #[error("missing value for column: {0}")]
    MissingValue(String),

    /// A value failed its column type's validator
    #[error("invalid value {value:?} for column {column}")]
    InvalidValue {
        /// Display label of the column
        column: String,
        /// Raw value from the message
        value: String,
    },

    /// The slot duration could not be parsed
    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    /// Equality against a date-range column needs two bounds
    #[error("equality on date-range column {0} needs an interval")]
    RangeEqualityNeedsInterval(String),

    /// `/` was used on a column that is not a date range
    #[error("slot column {0} is not a date range")]
    SlotColumnNotRange(String),

    /// More than one `/` segment
    #[error("only one slot column is allowed")]
    DuplicateSlot,

    /// A simple query without any `?` column
    #[error("query has no output columns")]
    NoOutputColumns,

    /// A stored date-range cell could not be decoded
    #[error("stored value {0:?} is not a date range")]
    CorruptRange(String),

    /// The access guard refused the sender
    #[error("access denied for {0}")]
    Unauthorized(String),
}

impl Rejection {
    /// Short, stable reason label used for metrics and logs.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::NotACommand => "not_a_command",
            Self::MissingArguments | Self::UnknownTable(_) | Self::UnknownColumn(_) => {
                "unresolvable_reference"
            },
            Self::Unauthorized(_) => "unauthorized",
            Self::MissingValue(_)
            | Self::InvalidValue { .. }
            | Self::InvalidDuration(_)
            | Self::RangeEqualityNeedsInterval(_)
            | Self::SlotColumnNotRange(_)
            | Self::DuplicateSlot
            | Self::NoOutputColumns
            | Self::CorruptRange(_) => "validation",
        }
    }
}

/// Why a pipeline stage stopped: the message was rejected, or a collaborator failed
#[derive(Error, Debug)]
pub enum StageError {
    /// The message is not handled
    #[error(transparent)]
    Rejected(#[from] Rejection),

    /// A collaborator call failed
    #[error(transparent)]
    Failed(#[from] TablesSmsError),
}

/// Result of one pipeline stage
pub type StageResult<T> = std::result::Result<T, StageError>;
