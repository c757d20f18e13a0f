//! The per-message pipeline.
//!
//! A message flows strictly top to bottom: command check, shortcut
//! expansion, table and mode resolution, password check, then compilation
//! into either one insert or one query. Any stage may stop the message with a
//! [`Rejection`]; nothing is inserted or queried in that case.

use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::access::{strip_password, AccessGuard};
use crate::add::compile_add;
use crate::command::{arguments, determine_mode, resolve_table, Mode};
use crate::config::InterpreterConfig;
use crate::error::{Rejection, Result, StageError, StageResult};
use crate::logging::OperationTimer;
use crate::metrics::InterpreterMetrics;
use crate::models::{InboundMessage, RowValues};
use crate::query::QueryCompiler;
use crate::repository::{AccessControl, ResponseSender, RowStore, TableCatalog};
use crate::respond::Responder;
use crate::shortcut::{is_command, ShortcutExpander};
use crate::temporal::TemporalParser;

/// What became of a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// One row was inserted into `table`
    Inserted {
        /// Display name of the table
        table: String,
        /// Stored values, keyed by storage name
        values: RowValues,
    },
    /// A query ran and `body` was sent back to the sender
    Responded {
        /// Reply text
        body: String,
    },
    /// The message was ignored or refused
    NotHandled(Rejection),
}

impl Outcome {
    /// False only for [`Outcome::NotHandled`]
    #[must_use]
    pub const fn is_handled(&self) -> bool {
        !matches!(self, Self::NotHandled(_))
    }

    const fn label(&self) -> &'static str {
        match self {
            Self::Inserted { .. } => "inserted",
            Self::Responded { .. } => "responded",
            Self::NotHandled(_) => "not_handled",
        }
    }
}

/// Interprets inbound messages against the host's collaborators
pub struct MessageHandler<'a> {
    catalog: &'a dyn TableCatalog,
    access: &'a dyn AccessControl,
    store: &'a dyn RowStore,
    sender: &'a dyn ResponseSender,
    config: InterpreterConfig,
    metrics: InterpreterMetrics,
}

impl<'a> MessageHandler<'a> {
    /// Handler using `catalog` for metadata, `access` for passwords, `store`
    /// for rows and `sender` for replies
    pub fn new(
        catalog: &'a dyn TableCatalog,
        access: &'a dyn AccessControl,
        store: &'a dyn RowStore,
        sender: &'a dyn ResponseSender,
        config: InterpreterConfig,
    ) -> Self {
        Self {
            catalog,
            access,
            store,
            sender,
            config,
            metrics: InterpreterMetrics::default(),
        }
    }

    /// Handle `message`, reading relative dates against the local clock
    pub fn handle(&self, message: &InboundMessage) -> Result<Outcome> {
        self.handle_at(message, chrono::Local::now().naive_local())
    }

    /// Handle `message` as if received at `now`.
    ///
    /// Rejections come back as [`Outcome::NotHandled`]; only collaborator
    /// failures are errors.
    pub fn handle_at(&self, message: &InboundMessage, now: NaiveDateTime) -> Result<Outcome> {
        let timer = OperationTimer::new("handle_message");
        let parser = TemporalParser::new(now);

        let result = match self.run(message, &parser) {
            Ok(outcome) => Ok(outcome),
            Err(StageError::Rejected(rejection)) => {
                debug!(
                    sender = %message.sender,
                    reason = rejection.reason(),
                    %rejection,
                    "message not handled"
                );
                self.metrics.record_rejection(&rejection);
                Ok(Outcome::NotHandled(rejection))
            },
            Err(StageError::Failed(err)) => Err(err),
        };

        let label = result.as_ref().map_or("error", Outcome::label);
        self.metrics.record_message(label, timer.finish());
        result
    }

    fn run(&self, message: &InboundMessage, parser: &TemporalParser) -> StageResult<Outcome> {
        if !is_command(&message.body) {
            return Err(Rejection::NotACommand.into());
        }

        let shortcuts = self.catalog.shortcuts()?;
        let expanded =
            ShortcutExpander::new(&shortcuts, self.config.max_shortcut_depth).expand(&message.body);
        debug!(original = %message.body, %expanded, "shortcuts expanded");

        let table = resolve_table(self.catalog, &expanded)?;
        let mode = determine_mode(&expanded)?;
        debug!(table = %table.display_name, ?mode, "command resolved");

        let (command, password) = strip_password(&expanded);
        AccessGuard::new(self.access).check(&table, &message.sender, password)?;
        let args = arguments(command);

        match mode {
            Mode::Add => {
                let values = compile_add(parser, &table, args)?;
                self.store.insert(&table, &values, &message.sender)?;
                info!(
                    table = %table.display_name,
                    sender = %message.sender,
                    columns = values.len(),
                    "row inserted"
                );
                Ok(Outcome::Inserted {
                    table: table.display_name,
                    values,
                })
            },
            Mode::Query => {
                let plan = QueryCompiler::new(parser, &table).compile(args)?;
                let body =
                    Responder::new(self.store, self.config.response_row_limit).respond(&table, plan)?;
                self.sender.send(&message.sender, &body)?;
                info!(
                    table = %table.display_name,
                    sender = %message.sender,
                    length = body.len(),
                    "query answered"
                );
                Ok(Outcome::Responded { body })
            },
        }
    }
}
