use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use api_types::auth::CurrentUser;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch},
};
use chrono::NaiveDate;
use client::{ApiClient, ClientError, Session, SessionStore, TripView};
use engine::{
    BalanceStanding, EngineError, ExpenseId, MoneyCents, ParticipantId, TripId, TripRole,
};
use serde_json::{Value, json};

const ORGANIZER_USER: i64 = 10;
const MEMBER_USER: i64 = 20;
const GUEST_USER: i64 = 30;

#[derive(Default)]
struct Backend {
    hits: AtomicUsize,
    participant_calls: AtomicUsize,
    slow_first_participants: AtomicBool,
    without_organizer: AtomicBool,
    fail_payments: AtomicBool,
    expenses: Mutex<Vec<Value>>,
    last_expense: Mutex<Option<Value>>,
    last_payment: Mutex<Option<Value>>,
}

impl Backend {
    fn hit(&self) {
        self.hits.fetch_add(1, Ordering::SeqCst);
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

fn participants(organizer_role: &str, member_role: &str) -> Value {
    json!([
        {"id": 1, "userId": ORGANIZER_USER, "email": "anna@example.com", "firstName": "Anna",
         "role": organizer_role, "status": "ACCEPTED"},
        {"id": 2, "userId": MEMBER_USER, "email": "bartek@example.com",
         "role": member_role, "status": "ACCEPTED"},
        {"id": 3, "userId": GUEST_USER, "email": "celina@example.com",
         "role": "GUEST", "status": "ACCEPTED"},
        {"id": 4, "email": "darek@example.com", "role": "MEMBER", "status": "PENDING"}
    ])
}

async fn me(headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    let auth = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if auth != "Bearer good" {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(json!({"id": ORGANIZER_USER, "email": "anna@example.com", "firstName": "Anna"})))
}

async fn validate_reset_token(Query(query): Query<HashMap<String, String>>) -> Response {
    match query.get("token").map(String::as_str) {
        Some("fresh") => Json(json!({"success": true})).into_response(),
        Some("used") => Json(json!({"success": false, "message": "Token expired"})).into_response(),
        _ => (StatusCode::BAD_REQUEST, Json(json!({"message": "Invalid token"}))).into_response(),
    }
}

async fn trip(State(backend): State<Arc<Backend>>, Path(trip): Path<i64>) -> Json<Value> {
    backend.hit();
    Json(json!({"id": trip, "name": "Lisbon", "budget": 500.0, "organizerId": ORGANIZER_USER}))
}

async fn list_participants(State(backend): State<Arc<Backend>>) -> Json<Value> {
    backend.hit();
    let call = backend.participant_calls.fetch_add(1, Ordering::SeqCst);
    let organizer = if backend.without_organizer.load(Ordering::SeqCst) {
        "MEMBER"
    } else {
        "ORGANIZER"
    };
    if call == 0 && backend.slow_first_participants.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(300)).await;
        return Json(participants(organizer, "GUEST"));
    }
    Json(participants(organizer, "MEMBER"))
}

async fn invite(State(backend): State<Arc<Backend>>) -> StatusCode {
    backend.hit();
    StatusCode::CREATED
}

async fn list_expenses(State(backend): State<Arc<Backend>>) -> Json<Value> {
    backend.hit();
    let expenses = backend.expenses.lock().unwrap().clone();
    Json(Value::Array(expenses))
}

async fn create_expense(
    State(backend): State<Arc<Backend>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    backend.hit();
    *backend.last_expense.lock().unwrap() = Some(body.clone());
    let mut created = body;
    created["id"] = json!(100);
    backend.expenses.lock().unwrap().push(created.clone());
    Json(created)
}

async fn patch_expense(
    State(backend): State<Arc<Backend>>,
    Path(_expense): Path<i64>,
    Json(body): Json<Value>,
) -> Response {
    backend.hit();
    *backend.last_payment.lock().unwrap() = Some(body);
    if backend.fail_payments.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"message": "boom"})))
            .into_response();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn delete_expense(
    State(backend): State<Arc<Backend>>,
    Path(expense): Path<i64>,
) -> StatusCode {
    backend.hit();
    backend
        .expenses
        .lock()
        .unwrap()
        .retain(|e| e["id"] != json!(expense));
    StatusCode::NO_CONTENT
}

async fn summary(State(backend): State<Arc<Backend>>) -> StatusCode {
    backend.hit();
    StatusCode::NOT_FOUND
}

async fn spawn_backend() -> (Arc<Backend>, String) {
    let backend = Arc::new(Backend::default());
    backend.expenses.lock().unwrap().push(json!({
        "id": 7, "tripId": 1, "name": "Hotel", "amount": 200.0, "category": "ACCOMMODATION",
        "date": "2025-07-01", "payerId": 1, "participantShares": {"1": 0.5, "2": 0.5}
    }));

    let app = Router::new()
        .route("/api/auth/me", get(me))
        .route("/api/auth/validate-reset-token", get(validate_reset_token))
        .route("/api/trips/{trip}", get(trip))
        .route(
            "/api/trips/{trip}/participants",
            get(list_participants).post(invite),
        )
        .route(
            "/api/trips/{trip}/expenses",
            get(list_expenses).post(create_expense),
        )
        .route("/api/trips/{trip}/budget/summary", get(summary))
        .route(
            "/api/expenses/{expense}",
            patch(patch_expense).delete(delete_expense),
        )
        .with_state(backend.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (backend, format!("http://{addr}"))
}

fn session_for(user: i64, token: &str) -> Session {
    Session::new(
        token.to_string(),
        CurrentUser {
            id: user,
            email: format!("user{user}@example.com"),
            first_name: None,
            last_name: None,
        },
    )
}

async fn view_as(user: i64) -> (Arc<Backend>, TripView) {
    let (backend, base_url) = spawn_backend().await;
    let api = ApiClient::new(&base_url).unwrap();
    let view = TripView::new(api, session_for(user, "good"), TripId(1));
    view.refresh().await.unwrap();
    (backend, view)
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 7, 3).unwrap()
}

#[tokio::test]
async fn refresh_derives_role_and_permissions() {
    let (_backend, view) = view_as(GUEST_USER).await;
    assert_eq!(view.permissions().role(), Some(TripRole::Guest));
    assert_eq!(view.trip().unwrap().name, "Lisbon");
    assert_eq!(view.participants().len(), 4);
    assert_eq!(view.expenses().len(), 1);
}

#[tokio::test]
async fn guest_toggle_is_rejected_without_requests() {
    let (backend, view) = view_as(GUEST_USER).await;
    let before = backend.hits();

    let err = view
        .toggle_paid_status(ExpenseId(7), ParticipantId(2))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Engine(EngineError::Permission(_))));
    assert!(err.is_local());
    assert_eq!(backend.hits(), before);
    assert!(!view.expense(ExpenseId(7)).unwrap().is_paid(ParticipantId(2)));

    // Same answer for an expense the view has never loaded.
    let err = view
        .toggle_paid_status(ExpenseId(999), ParticipantId(2))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Engine(EngineError::Permission(_))));
    assert_eq!(backend.hits(), before);
}

#[tokio::test]
async fn member_toggle_sends_partial_update() {
    let (backend, view) = view_as(MEMBER_USER).await;

    let paid = view
        .toggle_paid_status(ExpenseId(7), ParticipantId(2))
        .await
        .unwrap();
    assert!(paid);
    assert_eq!(
        backend.last_payment.lock().unwrap().clone().unwrap(),
        json!({"participantPaymentStatus": {"2": true}})
    );

    let expense = view.expense(ExpenseId(7)).unwrap();
    assert!(expense.is_paid(ParticipantId(2)));
    assert!(!expense.is_paid(ParticipantId(1)));
    assert_eq!(expense.amount, MoneyCents::new(20000));
}

#[tokio::test]
async fn failed_toggle_is_reverted() {
    let (backend, view) = view_as(ORGANIZER_USER).await;
    backend.fail_payments.store(true, Ordering::SeqCst);

    let err = view
        .toggle_paid_status(ExpenseId(7), ParticipantId(1))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Server { status: 500, .. }));
    assert_eq!(err.user_message(), "Server error: boom");
    assert!(!view.expense(ExpenseId(7)).unwrap().is_paid(ParticipantId(1)));
}

#[tokio::test]
async fn submit_sends_fractions() {
    let (backend, view) = view_as(ORGANIZER_USER).await;

    let mut draft = view.new_expense_draft(day());
    // Pending participants are not part of the split.
    assert_eq!(
        draft.split.participants(),
        &[ParticipantId(1), ParticipantId(2), ParticipantId(3)]
    );
    assert_eq!(draft.payer, Some(ParticipantId(1)));

    draft.split.toggle_participant(ParticipantId(3)).unwrap();
    draft.name = "Dinner".to_string();
    draft.amount = "200.00".to_string();

    let record = view.submit_expense(&draft).await.unwrap();
    assert_eq!(record.id, ExpenseId(100));

    let sent = backend.last_expense.lock().unwrap().clone().unwrap();
    assert_eq!(sent["participantShares"], json!({"1": 0.5, "2": 0.5}));
    assert_eq!(sent["amount"], json!(200.0));
    assert_eq!(sent["payerId"], json!(1));
    assert_eq!(sent["tripId"], json!(1));
    assert_eq!(sent["creatorId"], json!(ORGANIZER_USER));
    assert_eq!(sent["category"], json!("OTHER"));
    assert_eq!(sent["date"], json!("2025-07-03"));

    assert_eq!(view.expenses().len(), 2);
}

#[tokio::test]
async fn invalid_share_total_sends_nothing() {
    let (backend, view) = view_as(ORGANIZER_USER).await;
    let before = backend.hits();

    let mut draft = view.new_expense_draft(day());
    draft.name = "Taxi".to_string();
    draft.amount = "45".to_string();
    draft.split.set_custom_share(ParticipantId(1), 70.0).unwrap();

    let err = view.submit_expense(&draft).await.unwrap_err();
    assert_eq!(err.user_message(), "shares must sum to 100");
    assert_eq!(backend.hits(), before);
    assert!(backend.last_expense.lock().unwrap().is_none());
}

#[tokio::test]
async fn only_organizer_deletes_expenses() {
    let (backend, member_view) = view_as(MEMBER_USER).await;
    let before = backend.hits();
    let err = member_view.delete_expense(ExpenseId(7)).await.unwrap_err();
    assert!(matches!(err, ClientError::Engine(EngineError::Permission(_))));
    assert_eq!(backend.hits(), before);

    let (_backend, organizer_view) = view_as(ORGANIZER_USER).await;
    organizer_view.delete_expense(ExpenseId(7)).await.unwrap();
    assert!(organizer_view.expenses().is_empty());
}

#[tokio::test]
async fn guest_cannot_invite_and_member_can() {
    let (backend, guest_view) = view_as(GUEST_USER).await;
    let before = backend.hits();
    assert!(guest_view.invite("eve@example.com", TripRole::Member).await.is_err());
    assert_eq!(backend.hits(), before);

    let (_backend, member_view) = view_as(MEMBER_USER).await;
    member_view.invite("eve@example.com", TripRole::Guest).await.unwrap();
    assert!(matches!(
        member_view.invite("not-an-email", TripRole::Guest).await,
        Err(ClientError::Engine(EngineError::Validation(_)))
    ));
}

#[tokio::test]
async fn last_organizer_cannot_be_demoted() {
    let (backend, view) = view_as(ORGANIZER_USER).await;
    let before = backend.hits();
    let err = view
        .change_role(ParticipantId(1), TripRole::Member)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Engine(EngineError::Validation(_))));
    assert_eq!(backend.hits(), before);
}

#[tokio::test]
async fn missing_summary_reads_as_empty() {
    let (_backend, view) = view_as(ORGANIZER_USER).await;
    let summary = view.server_summary().unwrap();
    assert_eq!(summary.total_cost, MoneyCents::ZERO);
    assert!(summary.balances.is_empty());
}

#[tokio::test]
async fn local_balances_follow_cached_expenses() {
    let (_backend, view) = view_as(ORGANIZER_USER).await;
    let summary = view.balances().unwrap();

    assert_eq!(summary.total_cost, MoneyCents::new(20000));
    assert_eq!(summary.remaining_budget(), Some(MoneyCents::new(30000)));
    assert_eq!(summary.balances[0].participant, ParticipantId(1));
    assert_eq!(summary.balances[0].balance, MoneyCents::new(10000));

    let bartek = summary.balance_of(ParticipantId(2)).unwrap();
    assert_eq!(bartek.balance, MoneyCents::new(-10000));
    assert_eq!(bartek.standing(), BalanceStanding::ToPay);
}

#[tokio::test]
async fn stale_participants_response_is_dropped() {
    let (backend, base_url) = spawn_backend().await;
    backend.slow_first_participants.store(true, Ordering::SeqCst);
    let view = TripView::new(
        ApiClient::new(&base_url).unwrap(),
        session_for(MEMBER_USER, "good"),
        TripId(1),
    );

    let (slow, fast) = tokio::join!(view.refresh_participants(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        view.refresh_participants().await
    });
    slow.unwrap();
    fast.unwrap();

    // The slow first answer still said GUEST; it arrived last and was ignored.
    assert_eq!(view.permissions().role(), Some(TripRole::Member));
}

#[tokio::test]
async fn rejected_session_is_cleared() {
    let (_backend, base_url) = spawn_backend().await;
    let api = ApiClient::new(&base_url).unwrap();
    let store = SessionStore::new(
        std::env::temp_dir()
            .join(format!("tripshare_restore_{}", std::process::id()))
            .join("session.json"),
    );

    store.save(&session_for(ORGANIZER_USER, "expired")).unwrap();
    assert_eq!(store.restore(&api).await.unwrap(), None);
    assert_eq!(store.load().unwrap(), None);

    store.save(&session_for(ORGANIZER_USER, "good")).unwrap();
    let restored = store.restore(&api).await.unwrap().unwrap();
    assert_eq!(restored.user().first_name.as_deref(), Some("Anna"));
    assert_eq!(store.load().unwrap(), Some(restored));
    store.clear().unwrap();
}

#[tokio::test]
async fn list_without_organizer_still_loads() {
    let (backend, base_url) = spawn_backend().await;
    backend.without_organizer.store(true, Ordering::SeqCst);
    let view = TripView::new(
        ApiClient::new(&base_url).unwrap(),
        session_for(ORGANIZER_USER, "good"),
        TripId(1),
    );

    view.refresh_participants().await.unwrap();
    assert_eq!(view.participants().len(), 4);
    // The former organizer is now a plain member and may not manage roles.
    assert_eq!(view.permissions().role(), Some(TripRole::Member));
    assert!(matches!(
        view.change_role(ParticipantId(2), TripRole::Guest).await,
        Err(ClientError::Engine(EngineError::Permission(_)))
    ));
}

#[tokio::test]
async fn reset_tokens_are_checked_before_use() {
    let (_backend, base_url) = spawn_backend().await;
    let api = ApiClient::new(&base_url).unwrap();

    api.validate_reset_token("fresh").await.unwrap();
    assert!(matches!(
        api.validate_reset_token("used").await,
        Err(ClientError::Validation(message)) if message == "Token expired"
    ));
    assert!(matches!(
        api.validate_reset_token("bogus").await,
        Err(ClientError::Validation(message)) if message == "Invalid token"
    ));
}
