use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::{
    Capability, EngineError, ExpenseId, MoneyCents, ParticipantId, Permissions, ResultEngine,
    SplitDraft,
    split::{SHARE_TOLERANCE, SHARE_TOTAL},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExpenseCategory {
    Transport,
    Food,
    Accommodation,
    Activities,
    #[default]
    Other,
}

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 5] = [
        Self::Transport,
        Self::Food,
        Self::Accommodation,
        Self::Activities,
        Self::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transport => "TRANSPORT",
            Self::Food => "FOOD",
            Self::Accommodation => "ACCOMMODATION",
            Self::Activities => "ACTIVITIES",
            Self::Other => "OTHER",
        }
    }
}

impl TryFrom<&str> for ExpenseCategory {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let upper = value.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == upper)
            .ok_or_else(|| EngineError::Validation(format!("invalid category: {value}")))
    }
}

/// The "add expense" form before submission.
#[derive(Clone, Debug)]
pub struct ExpenseDraft {
    pub name: String,
    /// Amount as typed; parsed on validation.
    pub amount: String,
    pub category: ExpenseCategory,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub payer: Option<ParticipantId>,
    pub split: SplitDraft,
}

impl ExpenseDraft {
    pub fn new(date: NaiveDate, split: SplitDraft) -> Self {
        Self {
            name: String::new(),
            amount: String::new(),
            category: ExpenseCategory::default(),
            description: None,
            date,
            payer: None,
            split,
        }
    }

    /// Checks every local invariant. Nothing may be sent to the backend
    /// unless this succeeds.
    pub fn validate(&self) -> ResultEngine<ValidatedExpense> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(EngineError::Validation("expense name is required".to_string()));
        }

        let amount: MoneyCents = self.amount.parse()?;
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "amount must be greater than 0".to_string(),
            ));
        }

        let payer = self
            .payer
            .ok_or_else(|| EngineError::Validation("payer is required".to_string()))?;
        if !self.split.participants().contains(&payer) {
            return Err(EngineError::UnknownParticipant(payer.to_string()));
        }

        self.split.validate()?;

        let description = self
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        Ok(ValidatedExpense {
            name: name.to_string(),
            amount,
            category: self.category,
            description,
            date: self.date,
            payer,
            shares: self.split.active_shares(),
        })
    }
}

/// An expense that passed [`ExpenseDraft::validate`].
#[derive(Clone, Debug, PartialEq)]
pub struct ValidatedExpense {
    pub name: String,
    pub amount: MoneyCents,
    pub category: ExpenseCategory,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub payer: ParticipantId,
    /// Percentages, active participants only.
    pub shares: BTreeMap<ParticipantId, f64>,
}

impl ValidatedExpense {
    /// Shares as fractions (`percentage / 100`), the form the backend takes.
    pub fn participant_fractions(&self) -> BTreeMap<ParticipantId, f64> {
        self.shares
            .iter()
            .map(|(id, pct)| (*id, pct / SHARE_TOTAL))
            .collect()
    }
}

/// One row of an expense's share table.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShareLine {
    pub participant: ParticipantId,
    pub percentage: f64,
    pub owed: MoneyCents,
    pub paid: bool,
}

/// A persisted expense as the engine sees it.
#[derive(Clone, Debug, PartialEq)]
pub struct ExpenseRecord {
    pub id: ExpenseId,
    pub name: String,
    pub category: ExpenseCategory,
    pub date: NaiveDate,
    pub amount: MoneyCents,
    pub payer: Option<ParticipantId>,
    /// Percentages. May be empty for an expense that is not split yet.
    pub shares: BTreeMap<ParticipantId, f64>,
    pub paid: BTreeMap<ParticipantId, bool>,
}

impl ExpenseRecord {
    pub fn share_total(&self) -> f64 {
        self.shares.values().filter(|share| **share > 0.0).sum()
    }

    pub fn is_fully_split(&self) -> bool {
        (self.share_total() - SHARE_TOTAL).abs() <= SHARE_TOLERANCE + 1e-9
    }

    /// Owed amount of each participant with a nonzero share, i.e.
    /// `amount × share / 100`.
    ///
    /// The covered part (`amount × share total / 100`) is allocated to the
    /// cent, so shares summing to exactly 100 owe exactly
    /// [`amount`](Self::amount). Thirds typed as 33.33 cover 99.99% and leave
    /// the rest unallocated.
    pub fn owed_amounts(&self) -> BTreeMap<ParticipantId, MoneyCents> {
        let entries: Vec<(ParticipantId, f64)> = self
            .shares
            .iter()
            .filter(|(_, share)| **share > 0.0)
            .map(|(id, share)| (*id, *share))
            .collect();
        if entries.is_empty() {
            return BTreeMap::new();
        }

        let covered = self.amount.percentage(self.share_total());
        let weights: Vec<f64> = entries.iter().map(|(_, share)| *share).collect();
        entries
            .iter()
            .map(|(id, _)| *id)
            .zip(covered.allocate(&weights))
            .collect()
    }

    pub fn share_lines(&self) -> Vec<ShareLine> {
        let owed = self.owed_amounts();
        self.shares
            .iter()
            .map(|(id, pct)| ShareLine {
                participant: *id,
                percentage: *pct,
                owed: owed.get(id).copied().unwrap_or_default(),
                paid: self.is_paid(*id),
            })
            .collect()
    }

    pub fn is_paid(&self, participant: ParticipantId) -> bool {
        self.paid.get(&participant).copied().unwrap_or(false)
    }

    /// Flips the paid flag of `participant` and returns the new value.
    ///
    /// The permission check runs first: a caller without
    /// [`Capability::ManagePayments`] never mutates anything.
    pub fn toggle_paid(
        &mut self,
        permissions: &Permissions,
        participant: ParticipantId,
    ) -> ResultEngine<bool> {
        permissions.require(Capability::ManagePayments)?;
        if !self.shares.contains_key(&participant) {
            return Err(EngineError::UnknownParticipant(participant.to_string()));
        }
        let flag = self.paid.entry(participant).or_insert(false);
        *flag = !*flag;
        Ok(*flag)
    }
}
