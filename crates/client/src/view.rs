use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use api_types::{expense::PaymentStatusUpdate, trip::Trip};
use chrono::NaiveDate;
use engine::{
    BudgetSummary, Capability, EngineError, ExpenseDraft, ExpenseId, ExpenseRecord, MoneyCents,
    Participant, ParticipantId, Permissions, SplitDraft, TripId, TripRole, current_role,
    derive_balances, ensure_organizer_present, ensure_organizer_remains,
};

use crate::{
    api::ApiClient,
    convert,
    error::{ClientError, Result},
    generation::{Generations, Slot},
    session::Session,
};

#[derive(Debug, Default)]
struct ViewState {
    trip: Option<Trip>,
    participants: Vec<Participant>,
    expenses: Vec<ExpenseRecord>,
    server_summary: Option<BudgetSummary>,
    permissions: Permissions,
    generations: Generations,
}

/// Cached state of one trip's budget and participants.
///
/// Everything here is a view-scoped cache of the backend: a refresh simply
/// overwrites it. Local checks (share totals, role gates) run before any
/// request is built, so a rejected action never reaches the network.
///
/// Methods take `&self`; the lock is never held across a request, so
/// several loads may run at once and the newest one wins.
#[derive(Debug)]
pub struct TripView {
    api: ApiClient,
    session: Session,
    trip_id: TripId,
    state: Mutex<ViewState>,
}

impl TripView {
    pub fn new(api: ApiClient, session: Session, trip_id: TripId) -> Self {
        Self {
            api,
            session,
            trip_id,
            state: Mutex::new(ViewState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn trip_id(&self) -> TripId {
        self.trip_id
    }

    pub fn trip(&self) -> Option<Trip> {
        self.state().trip.clone()
    }

    pub fn participants(&self) -> Vec<Participant> {
        self.state().participants.clone()
    }

    pub fn expenses(&self) -> Vec<ExpenseRecord> {
        self.state().expenses.clone()
    }

    pub fn expense(&self, expense: ExpenseId) -> Option<ExpenseRecord> {
        self.state()
            .expenses
            .iter()
            .find(|e| e.id == expense)
            .cloned()
    }

    pub fn permissions(&self) -> Permissions {
        self.state().permissions
    }

    /// The backend's own summary, if it was loaded.
    pub fn server_summary(&self) -> Option<BudgetSummary> {
        self.state().server_summary.clone()
    }

    /// Reloads everything. Each part is applied as soon as it succeeds; the
    /// first failure is returned once all requests are done.
    pub async fn refresh(&self) -> Result<()> {
        let (trip, participants, expenses, summary) = tokio::join!(
            self.refresh_trip(),
            self.refresh_participants(),
            self.refresh_expenses(),
            self.refresh_summary(),
        );
        trip?;
        participants?;
        expenses?;
        summary?;
        Ok(())
    }

    pub async fn refresh_trip(&self) -> Result<()> {
        let ticket = self.state().generations.begin(Slot::Trip);
        let trip = self.api.trip(&self.session, self.trip_id).await?;

        let mut state = self.state();
        if let Some(trip) = state.generations.accept(ticket, trip) {
            state.trip = Some(trip);
        }
        Ok(())
    }

    /// Reloads participants and re-derives the current user's permissions,
    /// since an organizer may have changed the role in the meantime.
    pub async fn refresh_participants(&self) -> Result<()> {
        let ticket = self.state().generations.begin(Slot::Participants);
        let participants: Vec<Participant> = self
            .api
            .participants(&self.session, self.trip_id)
            .await?
            .into_iter()
            .map(convert::participant_from_api)
            .collect();

        let mut state = self.state();
        if let Some(participants) = state.generations.accept(ticket, participants) {
            if let Err(err) = ensure_organizer_present(&participants) {
                tracing::warn!(trip = %self.trip_id, "inconsistent participant list: {err}");
            }
            let role = current_role(&participants, self.session.user_id());
            if role != state.permissions.role() {
                tracing::info!(trip = %self.trip_id, ?role, "trip role changed");
            }
            state.permissions = Permissions::for_role(role);
            state.participants = participants;
        }
        Ok(())
    }

    pub async fn refresh_expenses(&self) -> Result<()> {
        let ticket = self.state().generations.begin(Slot::Expenses);
        let expenses = self
            .api
            .expenses(&self.session, self.trip_id)
            .await?
            .into_iter()
            .map(convert::expense_from_api)
            .collect::<std::result::Result<Vec<_>, EngineError>>()?;

        let mut state = self.state();
        if let Some(expenses) = state.generations.accept(ticket, expenses) {
            state.expenses = expenses;
        }
        Ok(())
    }

    pub async fn refresh_summary(&self) -> Result<()> {
        let ticket = self.state().generations.begin(Slot::Summary);
        let summary = self.api.budget_summary(&self.session, self.trip_id).await?;
        let summary = convert::summary_from_api(summary)?;

        let mut state = self.state();
        if let Some(summary) = state.generations.accept(ticket, summary) {
            state.server_summary = Some(summary);
        }
        Ok(())
    }

    /// Participant record of the signed-in user.
    pub fn me(&self) -> Option<Participant> {
        let user = self.session.user_id();
        self.state()
            .participants
            .iter()
            .find(|p| p.user_id == Some(user))
            .cloned()
    }

    /// Fresh "add expense" form: accepted participants split equally, the
    /// current user as payer.
    pub fn new_expense_draft(&self, date: NaiveDate) -> ExpenseDraft {
        let accepted: Vec<ParticipantId> = self
            .state()
            .participants
            .iter()
            .filter(|p| p.is_accepted())
            .map(|p| p.id)
            .collect();
        let mut draft = ExpenseDraft::new(date, SplitDraft::new(accepted));
        draft.payer = self.me().map(|p| p.id);
        draft
    }

    /// Validates `draft` locally and creates the expense.
    pub async fn submit_expense(&self, draft: &ExpenseDraft) -> Result<ExpenseRecord> {
        let validated = draft.validate()?;
        let payload = convert::expense_new(&validated, self.trip_id, self.session.user_id());

        let created = self.api.create_expense(&self.session, &payload).await?;
        let record = convert::expense_from_api(created)?;
        tracing::info!(trip = %self.trip_id, expense = %record.id, amount = %record.amount, "expense created");

        self.state().expenses.push(record.clone());
        Ok(record)
    }

    /// Flips one participant's paid flag on one expense and returns the new
    /// value.
    ///
    /// The role check and the local flip happen before the request; if the
    /// request fails the flip is undone.
    pub async fn toggle_paid_status(
        &self,
        expense: ExpenseId,
        participant: ParticipantId,
    ) -> Result<bool> {
        let paid = {
            let mut state = self.state();
            let permissions = state.permissions;
            permissions.require(Capability::ManagePayments)?;
            let record = state
                .expenses
                .iter_mut()
                .find(|e| e.id == expense)
                .ok_or(ClientError::NotFound)?;
            record.toggle_paid(&permissions, participant)?
        };

        let payload = PaymentStatusUpdate {
            participant_payment_status: BTreeMap::from([(participant.0, paid)]),
        };
        if let Err(err) = self
            .api
            .update_payment_status(&self.session, expense, &payload)
            .await
        {
            tracing::warn!(%expense, %participant, "payment status update failed: {err}");
            let mut state = self.state();
            if let Some(record) = state.expenses.iter_mut().find(|e| e.id == expense) {
                record.paid.insert(participant, !paid);
            }
            return Err(err);
        }

        Ok(paid)
    }

    pub async fn delete_expense(&self, expense: ExpenseId) -> Result<()> {
        self.permissions().require(Capability::DeleteExpense)?;
        self.api.delete_expense(&self.session, expense).await?;
        tracing::info!(trip = %self.trip_id, %expense, "expense deleted");
        self.state().expenses.retain(|e| e.id != expense);
        Ok(())
    }

    pub async fn invite(&self, email: &str, role: TripRole) -> Result<()> {
        self.permissions().require(Capability::Invite)?;
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(EngineError::Validation(format!("invalid email address: {email}")).into());
        }
        self.api
            .invite(&self.session, self.trip_id, email, convert::role_to_api(role))
            .await?;
        tracing::info!(trip = %self.trip_id, %role, "participant invited");
        self.refresh_participants().await
    }

    pub async fn change_role(&self, participant: ParticipantId, role: TripRole) -> Result<()> {
        self.permissions().require(Capability::ManageParticipants)?;
        ensure_organizer_remains(&self.participants(), participant, Some(role))?;
        self.api
            .change_role(&self.session, self.trip_id, participant, convert::role_to_api(role))
            .await?;
        tracing::info!(trip = %self.trip_id, %participant, %role, "participant role changed");

        let mut state = self.state();
        if let Some(p) = state.participants.iter_mut().find(|p| p.id == participant) {
            p.role = role;
        }
        let me = current_role(&state.participants, self.session.user_id());
        state.permissions = Permissions::for_role(me);
        Ok(())
    }

    pub async fn remove_participant(&self, participant: ParticipantId) -> Result<()> {
        self.permissions().require(Capability::ManageParticipants)?;
        ensure_organizer_remains(&self.participants(), participant, None)?;
        self.api
            .remove_participant(&self.session, self.trip_id, participant)
            .await?;
        tracing::info!(trip = %self.trip_id, %participant, "participant removed");
        self.state().participants.retain(|p| p.id != participant);
        Ok(())
    }

    /// Balances derived locally from the cached expenses.
    pub fn balances(&self) -> Result<BudgetSummary> {
        let state = self.state();
        let ids: Vec<ParticipantId> = state.participants.iter().map(|p| p.id).collect();
        let planned = state
            .trip
            .as_ref()
            .and_then(|t| t.budget)
            .map(MoneyCents::from_decimal)
            .transpose()?;
        Ok(derive_balances(&state.expenses, &ids).with_planned_budget(planned))
    }
}
