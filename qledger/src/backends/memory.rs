//! In-memory credit ledger, the default test substrate.

use std::collections::HashMap;
use std::sync::Mutex;

use qcommon::{BoxFuture, UserId};

use crate::error::LedgerError;
use crate::ledger::{CreditLedger, SettledDebit};

#[derive(Debug, Default)]
pub struct InMemoryCreditLedger {
    balances: Mutex<HashMap<UserId, u64>>,
}

impl InMemoryCreditLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<UserId, u64>>, LedgerError> {
        self.balances
            .lock()
            .map_err(|_| LedgerError::storage("credit ledger lock poisoned"))
    }
}

impl CreditLedger for InMemoryCreditLedger {
    fn open_account<'a>(
        &'a self,
        user: &'a UserId,
        initial_credits: u64,
    ) -> BoxFuture<'a, Result<bool, LedgerError>> {
        Box::pin(async move {
            let mut balances = self.lock()?;
            if balances.contains_key(user) {
                return Ok(false);
            }

            balances.insert(user.clone(), initial_credits);
            Ok(true)
        })
    }

    fn balance<'a>(&'a self, user: &'a UserId) -> BoxFuture<'a, Result<u64, LedgerError>> {
        Box::pin(async move {
            let balances = self.lock()?;
            balances
                .get(user)
                .copied()
                .ok_or_else(|| LedgerError::not_found(format!("no account for user '{user}'")))
        })
    }

    fn credit<'a>(
        &'a self,
        user: &'a UserId,
        amount: u64,
    ) -> BoxFuture<'a, Result<u64, LedgerError>> {
        Box::pin(async move {
            let mut balances = self.lock()?;
            let balance = balances
                .get_mut(user)
                .ok_or_else(|| LedgerError::not_found(format!("no account for user '{user}'")))?;

            *balance = balance.saturating_add(amount);
            Ok(*balance)
        })
    }

    fn debit<'a>(
        &'a self,
        user: &'a UserId,
        amount: u64,
    ) -> BoxFuture<'a, Result<u64, LedgerError>> {
        Box::pin(async move {
            // Check and decrement under one lock hold, never read-then-write
            // across lock boundaries.
            let mut balances = self.lock()?;
            let balance = balances
                .get_mut(user)
                .ok_or_else(|| LedgerError::not_found(format!("no account for user '{user}'")))?;

            if *balance < amount {
                return Err(LedgerError::insufficient_balance(format!(
                    "balance {balance} cannot cover debit of {amount}"
                )));
            }

            *balance -= amount;
            Ok(*balance)
        })
    }

    fn settle<'a>(
        &'a self,
        user: &'a UserId,
        amount: u64,
    ) -> BoxFuture<'a, Result<SettledDebit, LedgerError>> {
        Box::pin(async move {
            let mut balances = self.lock()?;
            let balance = balances
                .get_mut(user)
                .ok_or_else(|| LedgerError::not_found(format!("no account for user '{user}'")))?;

            let charged = amount.min(*balance);
            *balance -= charged;
            Ok(SettledDebit {
                charged,
                remaining: *balance,
            })
        })
    }
}
