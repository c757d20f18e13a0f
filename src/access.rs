//! Password check for tables guarded by an access-control table.

use tracing::{debug, warn};

use crate::error::{Rejection, StageResult};
use crate::models::TableDescriptor;
use crate::repository::AccessControl;

/// Split a trailing ` #password` token off a command.
///
/// Returns the command without the token and the password, `""` when the
/// command carries none. A bare `#` is not a password and is left in place.
#[must_use]
pub fn strip_password(message: &str) -> (&str, &str) {
    let Some(at) = message.rfind(' ') else {
        return (message, "");
    };
    match message[at + 1..].strip_prefix('#') {
        Some(password) if !password.is_empty() => (message[..at].trim_end(), password),
        _ => (message, ""),
    }
}

/// Validates senders against a table's access-control table
pub struct AccessGuard<'a> {
    access: &'a dyn AccessControl,
}

impl<'a> AccessGuard<'a> {
    /// Guard backed by `access`
    #[must_use]
    pub fn new(access: &'a dyn AccessControl) -> Self {
        Self { access }
    }

    /// Check `sender` may use `table` with `password`.
    ///
    /// Tables without an access-control table admit everyone.
    pub fn check(
        &self,
        table: &TableDescriptor,
        sender: &str,
        password: &str,
    ) -> StageResult<()> {
        let Some(access_table) = table.access_table.as_deref() else {
            return Ok(());
        };
        if self.access.has_credential(access_table, sender, password)? {
            debug!(table = %table.display_name, sender, "access granted");
            Ok(())
        } else {
            warn!(table = %table.display_name, sender, "access denied");
            Err(Rejection::Unauthorized(sender.to_string()).into())
        }
    }
}
