use std::time::Duration;

use api_types::{
    auth::{
        CurrentUser, ForgotPassword, LoginRequest, LoginResponse, MessageResponse,
        RegisterRequest, ResetPassword,
    },
    budget::BudgetSummary,
    expense::{Expense, ExpenseNew, PaymentStatusUpdate},
    participant::{
        Invitation, InvitationResponse, InviteParticipant, Participant, ParticipantRole,
        ParticipantStatus, RoleUpdate,
    },
    trip::{Trip, TripNew},
};
use engine::{ExpenseId, ParticipantId, TripId};
use reqwest::{Method, RequestBuilder, Url};
use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    error::{ClientError, Result},
    session::Session,
};

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Thin typed wrapper over the trip planner REST API.
///
/// Every method maps one endpoint. Nothing is retried; a `404` on listing
/// and summary endpoints reads as "nothing there yet".
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, None)
    }

    /// `timeout` of `None` keeps the HTTP client's default.
    pub fn with_timeout(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut url = Url::parse(base_url)
            .map_err(|err| ClientError::InvalidUrl(format!("{base_url}: {err}")))?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            base_url: url,
            http: builder.build()?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(&format!("api/{}", path.trim_start_matches('/')))
            .map_err(|err| ClientError::InvalidUrl(err.to_string()))
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.endpoint(path)?;
        tracing::debug!(%method, %url, "request");
        Ok(self.http.request(method, url))
    }

    fn authed(&self, session: &Session, method: Method, path: &str) -> Result<RequestBuilder> {
        Ok(self.request(method, path)?.bearer_auth(session.token()))
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let res = req.send().await?;
        if res.status().is_success() {
            return Ok(res.json::<T>().await?);
        }
        Err(error_from_response(res).await)
    }

    async fn send_unit(&self, req: RequestBuilder) -> Result<()> {
        let res = req.send().await?;
        if res.status().is_success() {
            return Ok(());
        }
        Err(error_from_response(res).await)
    }

    // Auth

    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let payload = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let req = self.request(Method::POST, "auth/login")?.json(&payload);
        let res: LoginResponse = self.send_json(req).await?;
        Ok(Session::new(res.token, res.user))
    }

    /// Registers a new account. A missing first name falls back to the email
    /// local-part.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<Session> {
        let email = email.trim();
        let first_name = first_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default());
        let payload = RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.unwrap_or_default().trim().to_string(),
        };
        let req = self.request(Method::POST, "auth/register")?.json(&payload);
        let res: LoginResponse = self.send_json(req).await?;
        Ok(Session::new(res.token, res.user))
    }

    pub async fn current_user(&self, session: &Session) -> Result<CurrentUser> {
        let req = self.authed(session, Method::GET, "auth/me")?;
        self.send_json(req).await
    }

    pub async fn forgot_password(&self, email: &str) -> Result<MessageResponse> {
        let payload = ForgotPassword {
            email: email.trim().to_string(),
        };
        let req = self
            .request(Method::POST, "auth/forgot-password")?
            .json(&payload);
        self.send_json(req).await
    }

    /// Checks a reset token before a new password is asked for. A token the
    /// server answers with `success: false` is rejected like a `400`.
    pub async fn validate_reset_token(&self, token: &str) -> Result<()> {
        let req = self
            .request(Method::GET, "auth/validate-reset-token")?
            .query(&[("token", token)]);
        let res: MessageResponse = self.send_json(req).await?;
        if res.success == Some(false) {
            return Err(ClientError::Validation(
                res.message
                    .unwrap_or_else(|| "invalid reset token".to_string()),
            ));
        }
        Ok(())
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<MessageResponse> {
        let payload = ResetPassword {
            token: token.to_string(),
            new_password: new_password.to_string(),
        };
        let req = self
            .request(Method::POST, "auth/reset-password")?
            .json(&payload);
        self.send_json(req).await
    }

    // Trips

    pub async fn trips(&self, session: &Session) -> Result<Vec<Trip>> {
        let req = self.authed(session, Method::GET, "trips")?;
        empty_if_missing(self.send_json(req).await)
    }

    pub async fn trip(&self, session: &Session, trip: TripId) -> Result<Trip> {
        let req = self.authed(session, Method::GET, &format!("trips/{trip}"))?;
        self.send_json(req).await
    }

    pub async fn create_trip(&self, session: &Session, payload: &TripNew) -> Result<Trip> {
        let req = self.authed(session, Method::POST, "trips")?.json(payload);
        self.send_json(req).await
    }

    // Participants

    pub async fn participants(&self, session: &Session, trip: TripId) -> Result<Vec<Participant>> {
        let req = self.authed(session, Method::GET, &format!("trips/{trip}/participants"))?;
        empty_if_missing(self.send_json(req).await)
    }

    pub async fn invite(
        &self,
        session: &Session,
        trip: TripId,
        email: &str,
        role: ParticipantRole,
    ) -> Result<()> {
        let payload = InviteParticipant {
            email: email.trim().to_string(),
            role,
        };
        let req = self
            .authed(session, Method::POST, &format!("trips/{trip}/participants"))?
            .json(&payload);
        self.send_unit(req).await
    }

    pub async fn change_role(
        &self,
        session: &Session,
        trip: TripId,
        participant: ParticipantId,
        role: ParticipantRole,
    ) -> Result<()> {
        let req = self
            .authed(
                session,
                Method::PUT,
                &format!("trips/{trip}/participants/{participant}"),
            )?
            .json(&RoleUpdate { role });
        self.send_unit(req).await
    }

    pub async fn remove_participant(
        &self,
        session: &Session,
        trip: TripId,
        participant: ParticipantId,
    ) -> Result<()> {
        let req = self.authed(
            session,
            Method::DELETE,
            &format!("trips/{trip}/participants/{participant}"),
        )?;
        self.send_unit(req).await
    }

    pub async fn respond_invitation(
        &self,
        session: &Session,
        trip: TripId,
        participant: ParticipantId,
        status: ParticipantStatus,
    ) -> Result<()> {
        let req = self
            .authed(
                session,
                Method::PATCH,
                &format!("trips/{trip}/participants/{participant}/respond"),
            )?
            .json(&InvitationResponse { status });
        self.send_unit(req).await
    }

    pub async fn my_invitations(&self, session: &Session) -> Result<Vec<Invitation>> {
        let req = self.authed(session, Method::GET, "participants/my-invitations")?;
        empty_if_missing(self.send_json(req).await)
    }

    // Expenses

    pub async fn expenses(&self, session: &Session, trip: TripId) -> Result<Vec<Expense>> {
        let req = self.authed(session, Method::GET, &format!("trips/{trip}/expenses"))?;
        empty_if_missing(self.send_json(req).await)
    }

    pub async fn create_expense(&self, session: &Session, payload: &ExpenseNew) -> Result<Expense> {
        let req = self
            .authed(
                session,
                Method::POST,
                &format!("trips/{}/expenses", payload.trip_id),
            )?
            .json(payload);
        self.send_json(req).await
    }

    /// Partial update of the payment flags of one expense.
    pub async fn update_payment_status(
        &self,
        session: &Session,
        expense: ExpenseId,
        payload: &PaymentStatusUpdate,
    ) -> Result<()> {
        let req = self
            .authed(session, Method::PATCH, &format!("expenses/{expense}"))?
            .json(payload);
        self.send_unit(req).await
    }

    pub async fn delete_expense(&self, session: &Session, expense: ExpenseId) -> Result<()> {
        let req = self.authed(session, Method::DELETE, &format!("expenses/{expense}"))?;
        self.send_unit(req).await
    }

    pub async fn budget_summary(&self, session: &Session, trip: TripId) -> Result<BudgetSummary> {
        let req = self.authed(session, Method::GET, &format!("trips/{trip}/budget/summary"))?;
        empty_if_missing(self.send_json(req).await)
    }
}

async fn error_from_response(res: reqwest::Response) -> ClientError {
    let status = res.status().as_u16();
    let message = res
        .json::<ErrorResponse>()
        .await
        .ok()
        .and_then(|body| body.message.or(body.error))
        .unwrap_or_else(|| "unknown error".to_string());
    tracing::debug!(status, %message, "request failed");
    ClientError::from_status(status, message)
}

/// A `404` on a listing means there is nothing to list.
fn empty_if_missing<T: Default>(res: Result<T>) -> Result<T> {
    match res {
        Err(ClientError::NotFound) => Ok(T::default()),
        other => other,
    }
}
