//! Credit ledger trait and backend configuration.

use std::path::PathBuf;
use std::sync::Arc;

use qcommon::{BoxFuture, UserId};

use crate::backends::sqlite::default_sqlite_path;
use crate::error::LedgerError;

pub use crate::backends::memory::InMemoryCreditLedger;
pub use crate::backends::sqlite::SqliteCreditLedger;

/// Outcome of a clamped settlement debit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettledDebit {
    /// Credits actually removed; less than the requested amount when the
    /// balance floored at zero.
    pub charged: u64,
    pub remaining: u64,
}

/// Durable per-user integer balance.
///
/// `debit` is the authority on affordability: two concurrent debits for the
/// same user never both succeed past the balance. `balance` is advisory
/// only; a positive read does not guarantee a later debit succeeds.
pub trait CreditLedger: Send + Sync {
    /// Provisioning hook for the external account collaborator. Returns
    /// whether a new account row was created; an existing balance is never
    /// overwritten.
    fn open_account<'a>(
        &'a self,
        user: &'a UserId,
        initial_credits: u64,
    ) -> BoxFuture<'a, Result<bool, LedgerError>>;

    fn balance<'a>(&'a self, user: &'a UserId) -> BoxFuture<'a, Result<u64, LedgerError>>;

    /// Top-up from the external billing collaborator; returns the new
    /// balance.
    fn credit<'a>(
        &'a self,
        user: &'a UserId,
        amount: u64,
    ) -> BoxFuture<'a, Result<u64, LedgerError>>;

    /// Strict atomic conditional decrement: rejects in full with
    /// `InsufficientBalance` when `balance < amount`; never drives the
    /// balance negative, never partially debits. Returns the remaining
    /// balance.
    fn debit<'a>(
        &'a self,
        user: &'a UserId,
        amount: u64,
    ) -> BoxFuture<'a, Result<u64, LedgerError>>;

    /// Clamped decrement flooring at zero. Used to bill a completion that
    /// was already streaming when the advisory check passed: the content was
    /// delivered and cannot be un-shown, so the overdraft is absorbed
    /// instead of rejected post hoc.
    fn settle<'a>(
        &'a self,
        user: &'a UserId,
        amount: u64,
    ) -> BoxFuture<'a, Result<SettledDebit, LedgerError>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerConfig {
    Sqlite { path: PathBuf },
    InMemory,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: default_sqlite_path(),
        }
    }
}

pub fn create_credit_ledger(config: LedgerConfig) -> Result<Arc<dyn CreditLedger>, LedgerError> {
    match config {
        LedgerConfig::Sqlite { path } => Ok(Arc::new(SqliteCreditLedger::new(path)?)),
        LedgerConfig::InMemory => Ok(Arc::new(InMemoryCreditLedger::new())),
    }
}

pub fn create_default_credit_ledger() -> Result<Arc<dyn CreditLedger>, LedgerError> {
    create_credit_ledger(LedgerConfig::default())
}
