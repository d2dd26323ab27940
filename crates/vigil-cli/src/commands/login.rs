//! Login command implementation.

use std::io::Write;

use serde::Serialize;
use vigil_store::{AuthSession, HttpStore, HttpStoreConfig};

use crate::cli::LoginArgs;
use crate::error::CliError;
use crate::output::{OutputFormat, TableDisplay};

/// Handler for the login command.
pub struct LoginCommand {
    config: HttpStoreConfig,
}

impl LoginCommand {
    /// Creates a login handler for the given backend.
    #[must_use]
    pub const fn new(config: HttpStoreConfig) -> Self {
        Self { config }
    }

    /// Signs in and prints the token.
    ///
    /// # Errors
    ///
    /// Returns error if the backend is unreachable or rejects the
    /// credentials.
    pub async fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        args: &LoginArgs,
    ) -> Result<(), CliError> {
        let store = HttpStore::new(self.config.clone())?;
        let session = store.authenticate(&args.email, &args.password).await?;
        format.write(out, &LoginResponse::from(session))?;
        Ok(())
    }
}

/// A successful login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    /// Auth token.
    pub token: String,
    /// Authenticated user id.
    pub user_id: String,
}

impl From<AuthSession> for LoginResponse {
    fn from(session: AuthSession) -> Self {
        Self {
            token: session.token,
            user_id: session.user_id,
        }
    }
}

impl TableDisplay for LoginResponse {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "✓ Logged in as {}", self.user_id)?;
        writeln!(writer)?;
        writeln!(writer, "export VIGIL_TOKEN={}", self.token)?;
        writeln!(writer, "export VIGIL_USER={}", self.user_id)?;
        Ok(())
    }
}
