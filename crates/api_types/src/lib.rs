//! JSON types exchanged with the trip planner REST API.
//!
//! Field names follow the backend's camelCase convention. Identifiers are the
//! backend's numeric ids; amounts are decimals in the trip currency.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub mod auth {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LoginRequest {
        pub email: String,
        pub password: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RegisterRequest {
        pub email: String,
        pub password: String,
        pub first_name: String,
        pub last_name: String,
    }

    /// The signed-in user, as returned by `/api/auth/me`.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CurrentUser {
        /// Some backend versions send `userId` instead of `id`.
        #[serde(alias = "userId")]
        pub id: i64,
        pub email: String,
        #[serde(default)]
        pub first_name: Option<String>,
        #[serde(default)]
        pub last_name: Option<String>,
    }

    /// Login and register both answer with the token next to the user fields.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct LoginResponse {
        pub token: String,
        #[serde(flatten)]
        pub user: CurrentUser,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ForgotPassword {
        pub email: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResetPassword {
        pub token: String,
        pub new_password: String,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct MessageResponse {
        #[serde(default)]
        pub success: Option<bool>,
        #[serde(default)]
        pub message: Option<String>,
    }
}

pub mod trip {
    use super::*;

    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Trip {
        pub id: i64,
        pub name: String,
        #[serde(default)]
        pub description: Option<String>,
        #[serde(default)]
        pub start_date: Option<NaiveDate>,
        #[serde(default)]
        pub end_date: Option<NaiveDate>,
        /// Planned total budget.
        #[serde(default)]
        pub budget: Option<f64>,
        #[serde(default)]
        pub organizer_id: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct TripNew {
        pub name: String,
        pub description: Option<String>,
        pub start_date: Option<NaiveDate>,
        pub end_date: Option<NaiveDate>,
        pub budget: Option<f64>,
    }
}

pub mod participant {
    use super::*;

    /// Role of a participant in a trip.
    ///
    /// - `ORGANIZER`: full control.
    /// - `MEMBER`: can invite and manage payments.
    /// - `GUEST`: read-only.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum ParticipantRole {
        Organizer,
        Member,
        Guest,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum ParticipantStatus {
        Pending,
        Accepted,
        Declined,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Participant {
        pub id: i64,
        /// Absent while an invitation targets an email without an account.
        #[serde(default)]
        pub user_id: Option<i64>,
        pub email: String,
        #[serde(default)]
        pub first_name: Option<String>,
        #[serde(default)]
        pub last_name: Option<String>,
        pub role: ParticipantRole,
        pub status: ParticipantStatus,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InviteParticipant {
        pub email: String,
        pub role: ParticipantRole,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RoleUpdate {
        pub role: ParticipantRole,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InvitationResponse {
        pub status: ParticipantStatus,
    }

    /// A pending invitation addressed to the signed-in user.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Invitation {
        pub id: i64,
        pub trip_id: i64,
        #[serde(default)]
        pub trip_name: Option<String>,
        pub role: ParticipantRole,
        pub status: ParticipantStatus,
    }
}

pub mod expense {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum ExpenseCategory {
        Transport,
        Food,
        Accommodation,
        Activities,
        Other,
    }

    /// Create-expense request body.
    ///
    /// `participant_shares` values are fractions in `0.0..=1.0`, not
    /// percentages.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ExpenseNew {
        pub name: String,
        pub amount: f64,
        pub category: ExpenseCategory,
        pub description: Option<String>,
        pub date: NaiveDate,
        pub payer_id: i64,
        pub participant_shares: BTreeMap<i64, f64>,
        pub trip_id: i64,
        pub creator_id: i64,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Expense {
        pub id: i64,
        pub trip_id: i64,
        pub name: String,
        pub amount: f64,
        pub category: ExpenseCategory,
        #[serde(default)]
        pub description: Option<String>,
        pub date: NaiveDate,
        #[serde(default)]
        pub payer_id: Option<i64>,
        /// Fractions, as sent on creation.
        #[serde(default)]
        pub participant_shares: BTreeMap<i64, f64>,
        #[serde(default)]
        pub participant_payment_status: BTreeMap<i64, bool>,
        #[serde(default)]
        pub creator_id: Option<i64>,
    }

    /// Partial update of an expense's payment flags.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PaymentStatusUpdate {
        pub participant_payment_status: BTreeMap<i64, bool>,
    }
}

pub mod budget {
    use super::*;

    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ParticipantBalanceView {
        pub participant_id: i64,
        pub share_total: f64,
        pub paid_total: f64,
        pub balance: f64,
    }

    /// Server-side budget summary. A `404` means the trip has no expenses
    /// yet and maps to [`BudgetSummary::default`].
    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct BudgetSummary {
        #[serde(default)]
        pub total_budget: Option<f64>,
        #[serde(default)]
        pub total_cost: f64,
        #[serde(default)]
        pub balances: Vec<ParticipantBalanceView>,
    }
}
