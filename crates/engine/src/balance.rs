use std::collections::BTreeMap;

use crate::{ExpenseRecord, MoneyCents, ParticipantId};

/// Sign of a balance as shown to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BalanceStanding {
    /// Paid more than their share; gets money back.
    Refund,
    /// Paid less than their share.
    ToPay,
    Settled,
}

impl BalanceStanding {
    pub fn label(self) -> &'static str {
        match self {
            Self::Refund => "to receive",
            Self::ToPay => "to pay",
            Self::Settled => "settled",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParticipantBalance {
    pub participant: ParticipantId,
    pub share_total: MoneyCents,
    pub paid_total: MoneyCents,
    /// `paid_total - share_total`.
    pub balance: MoneyCents,
}

impl ParticipantBalance {
    fn empty(participant: ParticipantId) -> Self {
        Self {
            participant,
            share_total: MoneyCents::ZERO,
            paid_total: MoneyCents::ZERO,
            balance: MoneyCents::ZERO,
        }
    }

    pub fn standing(&self) -> BalanceStanding {
        if self.balance.is_positive() {
            BalanceStanding::Refund
        } else if self.balance.is_negative() {
            BalanceStanding::ToPay
        } else {
            BalanceStanding::Settled
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BudgetSummary {
    pub total_cost: MoneyCents,
    pub planned_budget: Option<MoneyCents>,
    /// Sorted by descending balance, largest creditor first.
    pub balances: Vec<ParticipantBalance>,
}

impl BudgetSummary {
    pub fn with_planned_budget(mut self, planned: Option<MoneyCents>) -> Self {
        self.planned_budget = planned;
        self
    }

    /// Planned budget minus what was spent so far.
    pub fn remaining_budget(&self) -> Option<MoneyCents> {
        self.planned_budget.map(|planned| planned - self.total_cost)
    }

    pub fn balance_of(&self, participant: ParticipantId) -> Option<&ParticipantBalance> {
        self.balances.iter().find(|b| b.participant == participant)
    }
}

/// Derives per-participant totals from a trip's expenses.
///
/// Every listed participant gets a row, even without expenses. Payers and
/// share holders missing from `participants` (e.g. removed since) still get
/// one so that totals always add up. An expense with no shares only counts
/// toward [`BudgetSummary::total_cost`].
pub fn derive_balances(
    expenses: &[ExpenseRecord],
    participants: &[ParticipantId],
) -> BudgetSummary {
    let mut rows: BTreeMap<ParticipantId, ParticipantBalance> = participants
        .iter()
        .map(|id| (*id, ParticipantBalance::empty(*id)))
        .collect();
    let mut total_cost = MoneyCents::ZERO;

    for expense in expenses {
        total_cost += expense.amount;

        if let Some(payer) = expense.payer {
            rows.entry(payer)
                .or_insert_with(|| ParticipantBalance::empty(payer))
                .paid_total += expense.amount;
        }

        for (participant, owed) in expense.owed_amounts() {
            rows.entry(participant)
                .or_insert_with(|| ParticipantBalance::empty(participant))
                .share_total += owed;
        }
    }

    let mut balances: Vec<ParticipantBalance> = rows
        .into_values()
        .map(|mut row| {
            row.balance = row.paid_total - row.share_total;
            row
        })
        .collect();
    balances.sort_by(|a, b| {
        b.balance
            .cmp(&a.balance)
            .then_with(|| a.participant.cmp(&b.participant))
    });

    BudgetSummary {
        total_cost,
        planned_budget: None,
        balances,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ExpenseCategory, ExpenseId};
    use chrono::NaiveDate;

    fn expense(id: i64, amount: i64, payer: i64, shares: &[(i64, f64)]) -> ExpenseRecord {
        ExpenseRecord {
            id: ExpenseId(id),
            name: format!("expense {id}"),
            category: ExpenseCategory::Other,
            date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            amount: MoneyCents::new(amount),
            payer: Some(ParticipantId(payer)),
            shares: shares
                .iter()
                .map(|(p, pct)| (ParticipantId(*p), *pct))
                .collect(),
            paid: BTreeMap::new(),
        }
    }

    #[test]
    fn negative_balance_is_to_pay() {
        // B owes 175.00 over two expenses and fronted 100.00.
        let expenses = vec![
            expense(1, 20000, 1, &[(1, 50.0), (2, 50.0)]),
            expense(2, 10000, 2, &[(1, 25.0), (2, 75.0)]),
        ];
        let summary = derive_balances(&expenses, &[ParticipantId(1), ParticipantId(2)]);
        let b = summary.balance_of(ParticipantId(2)).unwrap();
        assert_eq!(b.share_total, MoneyCents::new(17500));
        assert_eq!(b.paid_total, MoneyCents::new(10000));
        assert_eq!(b.balance, MoneyCents::new(-7500));
        assert_eq!(b.balance.to_string(), "-75.00");
        assert_eq!(b.standing(), BalanceStanding::ToPay);
        assert_eq!(b.standing().label(), "to pay");
    }

    #[test]
    fn balances_sorted_by_descending_balance() {
        let expenses = vec![expense(1, 9000, 3, &[(1, 100.0 / 3.0), (2, 100.0 / 3.0), (3, 100.0 / 3.0)])];
        let summary = derive_balances(&expenses, &[ParticipantId(1), ParticipantId(2), ParticipantId(3)]);
        let order: Vec<i64> = summary.balances.iter().map(|b| b.participant.0).collect();
        assert_eq!(order, vec![3, 1, 2]);
        assert_eq!(summary.balances[0].standing(), BalanceStanding::Refund);
    }

    #[test]
    fn unsplit_expense_only_counts_toward_total() {
        let mut unsplit = expense(1, 4200, 1, &[]);
        unsplit.payer = None;
        let summary = derive_balances(&[unsplit], &[ParticipantId(1), ParticipantId(2)]);
        assert_eq!(summary.total_cost, MoneyCents::new(4200));
        assert!(summary.balances.iter().all(|b| b.balance.is_zero()));
        assert!(summary.balances.iter().all(|b| b.standing() == BalanceStanding::Settled));
    }

    #[test]
    fn unknown_share_holder_gets_a_row() {
        let expenses = vec![expense(1, 1000, 1, &[(1, 50.0), (9, 50.0)])];
        let summary = derive_balances(&expenses, &[ParticipantId(1)]);
        assert_eq!(summary.balances.len(), 2);
        assert_eq!(
            summary.balance_of(ParticipantId(9)).unwrap().balance,
            MoneyCents::new(-500)
        );
    }

    #[test]
    fn remaining_budget() {
        let expenses = vec![expense(1, 35000, 1, &[(1, 100.0)])];
        let summary = derive_balances(&expenses, &[ParticipantId(1)])
            .with_planned_budget(Some(MoneyCents::new(50000)));
        assert_eq!(summary.remaining_budget(), Some(MoneyCents::new(15000)));
        assert_eq!(BudgetSummary::default().remaining_budget(), None);
    }
}
