use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use qcommon::{BoxFuture, UserId};
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::LedgerError;
use crate::ledger::{CreditLedger, SettledDebit};

#[derive(Debug)]
pub struct SqliteCreditLedger {
    connection: Mutex<Connection>,
}

impl SqliteCreditLedger {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|error| {
                LedgerError::storage(format!(
                    "failed to create sqlite parent directory: {error}"
                ))
            })?;
        }

        let connection = Connection::open(path).map_err(|error| {
            LedgerError::storage(format!("failed to open sqlite database: {error}"))
        })?;
        Self::from_connection(connection)
    }

    pub fn new_in_memory() -> Result<Self, LedgerError> {
        let connection = Connection::open_in_memory().map_err(|error| {
            LedgerError::storage(format!("failed to open in-memory sqlite database: {error}"))
        })?;
        Self::from_connection(connection)
    }

    fn from_connection(connection: Connection) -> Result<Self, LedgerError> {
        connection
            .busy_timeout(Duration::from_secs(5))
            .map_err(|error| {
                LedgerError::storage(format!("failed to configure sqlite busy timeout: {error}"))
            })?;
        let ledger = Self {
            connection: Mutex::new(connection),
        };
        ledger.initialize_schema()?;
        Ok(ledger)
    }

    fn connection(&self) -> Result<std::sync::MutexGuard<'_, Connection>, LedgerError> {
        self.connection
            .lock()
            .map_err(|_| LedgerError::storage("sqlite ledger lock poisoned"))
    }

    fn initialize_schema(&self) -> Result<(), LedgerError> {
        let conn = self.connection()?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;

            CREATE TABLE IF NOT EXISTS accounts (
                user_id TEXT PRIMARY KEY,
                balance INTEGER NOT NULL CHECK (balance >= 0)
            );
            ",
        )
        .map_err(|error| {
            LedgerError::storage(format!("failed to initialize sqlite schema: {error}"))
        })?;

        Ok(())
    }

    // Amounts are stored as sqlite integers; anything past i64::MAX would
    // wrap negative and defeat the balance guard.
    fn storable_amount(amount: u64) -> Result<i64, LedgerError> {
        i64::try_from(amount).map_err(|_| {
            LedgerError::invalid_request(format!("amount {amount} exceeds the storable maximum"))
        })
    }

    fn query_balance(conn: &Connection, user: &UserId) -> Result<Option<u64>, LedgerError> {
        conn.query_row(
            "SELECT balance FROM accounts WHERE user_id = ?1",
            params![user.as_str()],
            |row| row.get::<_, i64>(0),
        )
        .optional()
        .map_err(|error| LedgerError::storage(format!("failed to query balance: {error}")))
        .map(|balance| balance.map(|value| value.max(0) as u64))
    }
}

impl CreditLedger for SqliteCreditLedger {
    fn open_account<'a>(
        &'a self,
        user: &'a UserId,
        initial_credits: u64,
    ) -> BoxFuture<'a, Result<bool, LedgerError>> {
        Box::pin(async move {
            let conn = self.connection()?;
            let inserted = conn
                .execute(
                    "INSERT OR IGNORE INTO accounts (user_id, balance) VALUES (?1, ?2)",
                    params![user.as_str(), Self::storable_amount(initial_credits)?],
                )
                .map_err(|error| {
                    LedgerError::storage(format!("failed to open account: {error}"))
                })?;

            Ok(inserted > 0)
        })
    }

    fn balance<'a>(&'a self, user: &'a UserId) -> BoxFuture<'a, Result<u64, LedgerError>> {
        Box::pin(async move {
            let conn = self.connection()?;
            Self::query_balance(&conn, user)?
                .ok_or_else(|| LedgerError::not_found(format!("no account for user '{user}'")))
        })
    }

    fn credit<'a>(
        &'a self,
        user: &'a UserId,
        amount: u64,
    ) -> BoxFuture<'a, Result<u64, LedgerError>> {
        Box::pin(async move {
            let conn = self.connection()?;
            let updated = conn
                .execute(
                    "UPDATE accounts SET balance = balance + ?2 WHERE user_id = ?1",
                    params![user.as_str(), Self::storable_amount(amount)?],
                )
                .map_err(|error| {
                    LedgerError::storage(format!("failed to credit account: {error}"))
                })?;

            if updated == 0 {
                return Err(LedgerError::not_found(format!(
                    "no account for user '{user}'"
                )));
            }

            Self::query_balance(&conn, user)?
                .ok_or_else(|| LedgerError::storage("credited account row disappeared"))
        })
    }

    fn debit<'a>(
        &'a self,
        user: &'a UserId,
        amount: u64,
    ) -> BoxFuture<'a, Result<u64, LedgerError>> {
        Box::pin(async move {
            let conn = self.connection()?;

            // Single conditional decrement: the guard and the write are one
            // statement, so concurrent debits cannot lose an update.
            let updated = conn
                .execute(
                    "
                    UPDATE accounts
                    SET balance = balance - ?2
                    WHERE user_id = ?1 AND balance >= ?2
                    ",
                    params![user.as_str(), Self::storable_amount(amount)?],
                )
                .map_err(|error| {
                    LedgerError::storage(format!("failed to debit account: {error}"))
                })?;

            if updated == 1 {
                return Self::query_balance(&conn, user)?
                    .ok_or_else(|| LedgerError::storage("debited account row disappeared"));
            }

            match Self::query_balance(&conn, user)? {
                Some(balance) => Err(LedgerError::insufficient_balance(format!(
                    "balance {balance} cannot cover debit of {amount}"
                ))),
                None => Err(LedgerError::not_found(format!(
                    "no account for user '{user}'"
                ))),
            }
        })
    }

    fn settle<'a>(
        &'a self,
        user: &'a UserId,
        amount: u64,
    ) -> BoxFuture<'a, Result<SettledDebit, LedgerError>> {
        Box::pin(async move {
            // The prior balance is needed to report the charged amount; the
            // read and clamped write share the connection lock, so no other
            // debit can interleave.
            let conn = self.connection()?;
            let prior = Self::query_balance(&conn, user)?
                .ok_or_else(|| LedgerError::not_found(format!("no account for user '{user}'")))?;

            let charged = amount.min(prior);
            conn.execute(
                "UPDATE accounts SET balance = balance - ?2 WHERE user_id = ?1",
                params![user.as_str(), charged as i64],
            )
            .map_err(|error| {
                LedgerError::storage(format!("failed to settle debit: {error}"))
            })?;

            Ok(SettledDebit {
                charged,
                remaining: prior - charged,
            })
        })
    }
}

pub(crate) fn default_sqlite_path() -> PathBuf {
    if let Some(explicit) = std::env::var_os("QUILL_SQLITE_PATH") {
        return PathBuf::from(explicit);
    }

    if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
        return PathBuf::from(home).join(".quill").join("qledger.sqlite3");
    }

    PathBuf::from("qledger.sqlite3")
}
