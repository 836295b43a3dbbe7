//! Expense sharing engine of the trip planner.
//!
//! The engine is pure: it validates and reconciles the share map of an
//! expense, derives balances for display and gates actions by trip role. It
//! performs no I/O; the `client` crate sends what the engine validated.
//!
//! ```rust
//! use engine::{ParticipantId, SplitDraft};
//!
//! let mut split = SplitDraft::new([ParticipantId(1), ParticipantId(2)]);
//! assert_eq!(split.share(ParticipantId(1)), 50.0);
//!
//! split.set_custom_share(ParticipantId(1), 70.0).unwrap();
//! assert!(split.validate().is_err());
//! split.set_custom_share(ParticipantId(2), 30.0).unwrap();
//! assert!(split.validate().is_ok());
//! ```

pub use access::{Capability, Permissions, TripRole};
pub use balance::{BalanceStanding, BudgetSummary, ParticipantBalance, derive_balances};
pub use error::EngineError;
pub use expense::{ExpenseCategory, ExpenseDraft, ExpenseRecord, ShareLine, ValidatedExpense};
pub use ids::{ExpenseId, ParticipantId, TripId, UserId};
pub use money::MoneyCents;
pub use participant::{
    Participant, ParticipantStatus, capitalize, current_role, ensure_organizer_present,
    ensure_organizer_remains, name_from_email,
};
pub use split::{
    SHARE_TOLERANCE, SHARE_TOTAL, SplitDraft, SplitMode, active_share_total,
    compute_equal_shares, parse_percentage, validate_share_total,
};

mod access;
mod balance;
mod error;
mod expense;
mod ids;
mod money;
mod participant;
mod split;

pub type ResultEngine<T> = Result<T, EngineError>;
