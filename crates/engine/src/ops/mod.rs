use chrono::Duration;
use sea_orm::DatabaseConnection;

use crate::{EngineError, ResultEngine, locks::PairLocks};

mod access;
mod balances;
mod expenses;
mod groups;
mod invitations;
mod settlements;

pub use balances::BalanceSummary;
pub use groups::{GroupMember, GroupOverview};
pub use invitations::InvitationCreated;
pub use settlements::SettlementOutcome;

const DEFAULT_INVITATION_TTL_DAYS: i64 = 7;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    settlement_locks: PairLocks,
    invitation_ttl: Duration,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

fn normalize_required_text(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidAmount(format!(
            "{label} must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    invitation_ttl: Option<Duration>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Override the pending-invitation lifetime (default 7 days).
    pub fn invitation_ttl(mut self, ttl: Duration) -> EngineBuilder {
        self.invitation_ttl = Some(ttl);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            settlement_locks: PairLocks::default(),
            invitation_ttl: self
                .invitation_ttl
                .unwrap_or_else(|| Duration::days(DEFAULT_INVITATION_TTL_DAYS)),
        })
    }
}
