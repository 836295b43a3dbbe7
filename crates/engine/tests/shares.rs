use std::collections::BTreeMap;

use chrono::NaiveDate;

use engine::{
    BalanceStanding, EngineError, ExpenseCategory, ExpenseDraft, ExpenseId, ExpenseRecord,
    MoneyCents, ParticipantId, Permissions, SplitDraft, SplitMode, TripRole, derive_balances,
};

const A: ParticipantId = ParticipantId(1);
const B: ParticipantId = ParticipantId(2);
const C: ParticipantId = ParticipantId(3);

fn trip_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 7, 12).unwrap()
}

fn form(amount: &str, payer: ParticipantId, participants: &[ParticipantId]) -> ExpenseDraft {
    let mut draft = ExpenseDraft::new(trip_day(), SplitDraft::new(participants.iter().copied()));
    draft.name = "Ferry tickets".to_string();
    draft.amount = amount.to_string();
    draft.category = ExpenseCategory::Transport;
    draft.payer = Some(payer);
    draft
}

/// Turns a submitted form into the record the backend would hand back.
fn persisted(id: i64, draft: &ExpenseDraft) -> ExpenseRecord {
    let validated = draft.validate().unwrap();
    ExpenseRecord {
        id: ExpenseId(id),
        name: validated.name,
        category: validated.category,
        date: validated.date,
        amount: validated.amount,
        payer: Some(validated.payer),
        shares: validated.shares,
        paid: BTreeMap::new(),
    }
}

#[test]
fn three_way_split_typed_as_two_decimals_is_accepted() {
    let mut draft = form("300.00", A, &[A, B, C]);
    for id in [A, B, C] {
        draft.split.set_custom_share_text(id, "33.33").unwrap();
    }
    assert!((draft.split.total() - 99.99).abs() < 1e-9);
    let validated = draft.validate().unwrap();
    assert_eq!(validated.shares.len(), 3);

    let record = persisted(1, &draft);
    let owed = record.owed_amounts();
    for id in [A, B, C] {
        assert_eq!(owed[&id], MoneyCents::new(9999));
    }

    // Each owes 99.99; the 0.03 the typed shares leave out stays with the payer.
    let summary = derive_balances(&[record], &[A, B, C]);
    assert_eq!(summary.balance_of(A).unwrap().balance, MoneyCents::new(20001));
    assert_eq!(summary.balance_of(B).unwrap().share_total, MoneyCents::new(9999));
    assert_eq!(summary.balance_of(B).unwrap().balance, MoneyCents::new(-9999));
}

#[test]
fn fifty_fifty_submits_halves() {
    let draft = form("200.00", A, &[A, B]);
    let fractions = draft.validate().unwrap().participant_fractions();
    assert_eq!(fractions, BTreeMap::from([(A, 0.5), (B, 0.5)]));
}

#[test]
fn mode_round_trip_restores_equal_values() {
    let mut split = SplitDraft::new([A, B, C]);
    let equal = split.shares().clone();

    split.set_custom_mode(true);
    split.set_custom_mode(false);
    assert_eq!(split.mode(), SplitMode::Equal);
    assert_eq!(split.shares(), &equal);

    // Manual edits are thrown away too, as long as nobody left the split.
    split.set_custom_share(A, 60.0).unwrap();
    split.set_custom_share(B, 20.0).unwrap();
    split.set_custom_mode(false);
    assert_eq!(split.shares(), &equal);
}

#[test]
fn zeroed_participant_stays_out_of_equal_split() {
    let mut split = SplitDraft::new([A, B, C]);
    split.set_custom_share(B, 0.0).unwrap();
    split.set_custom_mode(false);

    assert_eq!(split.active(), vec![A, C]);
    assert_eq!(split.share(A), 50.0);
    assert_eq!(split.share(C), 50.0);
    assert_eq!(split.share(B), 0.0);
}

#[test]
fn rapid_toggles_keep_only_the_latest_map() {
    let mut draft = form("90", C, &[A, B, C]);
    for _ in 0..5 {
        draft.split.toggle_participant(A).unwrap();
    }
    // Odd number of toggles: A is out.
    let validated = draft.validate().unwrap();
    assert_eq!(validated.shares.keys().copied().collect::<Vec<_>>(), vec![B, C]);
    assert_eq!(validated.participant_fractions()[&B], 0.5);
}

#[test]
fn fully_split_trip_conserves_money() {
    let mut expenses = Vec::new();

    expenses.push(persisted(1, &form("300.00", A, &[A, B, C])));
    expenses.push(persisted(2, &form("100.00", B, &[A, B, C])));

    let mut custom = form("87.65", C, &[A, B, C]);
    custom.split.set_custom_share(A, 12.5).unwrap();
    custom.split.set_custom_share(B, 62.5).unwrap();
    custom.split.set_custom_share(C, 25.0).unwrap();
    expenses.push(persisted(3, &custom));

    let summary = derive_balances(&expenses, &[A, B, C]);
    assert_eq!(summary.total_cost, MoneyCents::new(48765));

    let balance_sum: MoneyCents = summary.balances.iter().map(|b| b.balance).sum();
    let paid_sum: MoneyCents = summary.balances.iter().map(|b| b.paid_total).sum();
    let share_sum: MoneyCents = summary.balances.iter().map(|b| b.share_total).sum();
    assert_eq!(balance_sum, MoneyCents::ZERO);
    assert_eq!(paid_sum, share_sum);
    assert_eq!(paid_sum, summary.total_cost);

    // Largest creditor first.
    assert_eq!(summary.balances[0].participant, A);
    assert_eq!(summary.balances[0].standing(), BalanceStanding::Refund);
}

#[test]
fn guest_cannot_mark_payments() {
    let mut record = persisted(1, &form("200.00", A, &[A, B]));
    let guest = Permissions::for_role(Some(TripRole::Guest));
    let err = record.toggle_paid(&guest, B).unwrap_err();
    assert!(matches!(err, EngineError::Permission(_)));
    assert!(!record.is_paid(B));

    let organizer = Permissions::for_role(Some(TripRole::Organizer));
    assert!(record.toggle_paid(&organizer, B).unwrap());
}

#[test]
fn delete_gate_by_role() {
    assert!(TripRole::Organizer.can_delete_expense());
    assert!(!TripRole::Member.can_delete_expense());
}
