//! Per-user credit metering for the quill conversation pipeline.
//!
//! The ledger owns the only cross-conversation contended resource: the
//! integer balance. Strict debits are a single conditional decrement;
//! settlement debits clamp at zero to absorb the documented overdraft of an
//! already-streaming completion.

mod backends;
mod error;
mod ledger;

pub mod prelude {
    pub use crate::{
        CreditLedger, InMemoryCreditLedger, LedgerConfig, LedgerError, LedgerErrorKind,
        SettledDebit, SqliteCreditLedger, create_credit_ledger, create_default_credit_ledger,
    };
    pub use qcommon::UserId;
}

pub use error::{LedgerError, LedgerErrorKind};
pub use ledger::{
    CreditLedger, InMemoryCreditLedger, LedgerConfig, SettledDebit, SqliteCreditLedger,
    create_credit_ledger, create_default_credit_ledger,
};
