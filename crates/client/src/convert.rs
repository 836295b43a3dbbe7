//! Mapping between wire types and engine types.

use std::collections::BTreeMap;

use api_types::{
    budget,
    expense::{self, Expense, ExpenseNew},
    participant::{self, ParticipantRole},
};
use engine::{
    BudgetSummary, ExpenseCategory, ExpenseId, ExpenseRecord, MoneyCents, Participant,
    ParticipantBalance, ParticipantId, ParticipantStatus, ResultEngine, SHARE_TOTAL, TripId,
    TripRole, UserId, ValidatedExpense,
};

pub fn role_from_api(role: ParticipantRole) -> TripRole {
    match role {
        ParticipantRole::Organizer => TripRole::Organizer,
        ParticipantRole::Member => TripRole::Member,
        ParticipantRole::Guest => TripRole::Guest,
    }
}

pub fn role_to_api(role: TripRole) -> ParticipantRole {
    match role {
        TripRole::Organizer => ParticipantRole::Organizer,
        TripRole::Member => ParticipantRole::Member,
        TripRole::Guest => ParticipantRole::Guest,
    }
}

pub fn status_from_api(status: participant::ParticipantStatus) -> ParticipantStatus {
    match status {
        participant::ParticipantStatus::Pending => ParticipantStatus::Pending,
        participant::ParticipantStatus::Accepted => ParticipantStatus::Accepted,
        participant::ParticipantStatus::Declined => ParticipantStatus::Declined,
    }
}

pub fn status_to_api(status: ParticipantStatus) -> participant::ParticipantStatus {
    match status {
        ParticipantStatus::Pending => participant::ParticipantStatus::Pending,
        ParticipantStatus::Accepted => participant::ParticipantStatus::Accepted,
        ParticipantStatus::Declined => participant::ParticipantStatus::Declined,
    }
}

pub fn category_from_api(category: expense::ExpenseCategory) -> ExpenseCategory {
    match category {
        expense::ExpenseCategory::Transport => ExpenseCategory::Transport,
        expense::ExpenseCategory::Food => ExpenseCategory::Food,
        expense::ExpenseCategory::Accommodation => ExpenseCategory::Accommodation,
        expense::ExpenseCategory::Activities => ExpenseCategory::Activities,
        expense::ExpenseCategory::Other => ExpenseCategory::Other,
    }
}

pub fn category_to_api(category: ExpenseCategory) -> expense::ExpenseCategory {
    match category {
        ExpenseCategory::Transport => expense::ExpenseCategory::Transport,
        ExpenseCategory::Food => expense::ExpenseCategory::Food,
        ExpenseCategory::Accommodation => expense::ExpenseCategory::Accommodation,
        ExpenseCategory::Activities => expense::ExpenseCategory::Activities,
        ExpenseCategory::Other => expense::ExpenseCategory::Other,
    }
}

pub fn participant_from_api(p: participant::Participant) -> Participant {
    Participant {
        id: ParticipantId(p.id),
        user_id: p.user_id.map(UserId),
        email: p.email,
        first_name: p.first_name,
        last_name: p.last_name,
        role: role_from_api(p.role),
        status: status_from_api(p.status),
    }
}

/// Shares come back as fractions; the engine works in percentages.
pub fn expense_from_api(e: Expense) -> ResultEngine<ExpenseRecord> {
    Ok(ExpenseRecord {
        id: ExpenseId(e.id),
        name: e.name,
        category: category_from_api(e.category),
        date: e.date,
        amount: MoneyCents::from_decimal(e.amount)?,
        payer: e.payer_id.map(ParticipantId),
        shares: e
            .participant_shares
            .into_iter()
            .map(|(id, fraction)| (ParticipantId(id), fraction * SHARE_TOTAL))
            .collect(),
        paid: e
            .participant_payment_status
            .into_iter()
            .map(|(id, paid)| (ParticipantId(id), paid))
            .collect(),
    })
}

/// Builds the create-expense body. Shares go out as fractions.
pub fn expense_new(expense: &ValidatedExpense, trip: TripId, creator: UserId) -> ExpenseNew {
    ExpenseNew {
        name: expense.name.clone(),
        amount: expense.amount.to_decimal(),
        category: category_to_api(expense.category),
        description: expense.description.clone(),
        date: expense.date,
        payer_id: expense.payer.0,
        participant_shares: expense
            .participant_fractions()
            .into_iter()
            .map(|(id, fraction)| (id.0, fraction))
            .collect::<BTreeMap<i64, f64>>(),
        trip_id: trip.0,
        creator_id: creator.0,
    }
}

pub fn summary_from_api(summary: budget::BudgetSummary) -> ResultEngine<BudgetSummary> {
    let mut balances = summary
        .balances
        .into_iter()
        .map(|b| {
            Ok(ParticipantBalance {
                participant: ParticipantId(b.participant_id),
                share_total: MoneyCents::from_decimal(b.share_total)?,
                paid_total: MoneyCents::from_decimal(b.paid_total)?,
                balance: MoneyCents::from_decimal(b.balance)?,
            })
        })
        .collect::<ResultEngine<Vec<_>>>()?;
    balances.sort_by(|a, b| b.balance.cmp(&a.balance).then(a.participant.cmp(&b.participant)));

    Ok(BudgetSummary {
        total_cost: MoneyCents::from_decimal(summary.total_cost)?,
        planned_budget: summary
            .total_budget
            .map(MoneyCents::from_decimal)
            .transpose()?,
        balances,
    })
}
