//! Role based gating of trip actions.
//!
//! The backend stays authoritative; these checks only give immediate
//! feedback and keep forbidden requests from being sent at all.

use std::fmt;

use crate::{EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TripRole {
    Organizer,
    Member,
    Guest,
}

impl TripRole {
    /// Returns the canonical role string used by the backend.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Organizer => "ORGANIZER",
            Self::Member => "MEMBER",
            Self::Guest => "GUEST",
        }
    }

    pub fn can_invite(self) -> bool {
        matches!(self, Self::Organizer | Self::Member)
    }

    /// Changing roles and removing participants.
    pub fn can_manage_participants(self) -> bool {
        matches!(self, Self::Organizer)
    }

    pub fn can_delete_expense(self) -> bool {
        matches!(self, Self::Organizer)
    }

    pub fn can_manage_payments(self) -> bool {
        matches!(self, Self::Organizer | Self::Member)
    }
}

impl fmt::Display for TripRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TripRole {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ORGANIZER" => Ok(Self::Organizer),
            "MEMBER" => Ok(Self::Member),
            "GUEST" => Ok(Self::Guest),
            other => Err(EngineError::Validation(format!("invalid trip role: {other}"))),
        }
    }
}

/// An action that needs a minimum role.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    Invite,
    ManageParticipants,
    DeleteExpense,
    ManagePayments,
}

impl Capability {
    fn describe(self) -> &'static str {
        match self {
            Self::Invite => "inviting participants",
            Self::ManageParticipants => "managing participants",
            Self::DeleteExpense => "deleting expenses",
            Self::ManagePayments => "managing payments",
        }
    }
}

/// Capabilities of the current user on one trip.
///
/// Derived from the user's participant record; rebuild it every time that
/// record is refetched since an organizer can change the role in between.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Permissions {
    role: Option<TripRole>,
}

impl Permissions {
    /// `None` means the user is not a participant and may do nothing.
    pub fn for_role(role: Option<TripRole>) -> Self {
        Self { role }
    }

    pub fn role(&self) -> Option<TripRole> {
        self.role
    }

    pub fn allows(&self, capability: Capability) -> bool {
        let Some(role) = self.role else {
            return false;
        };
        match capability {
            Capability::Invite => role.can_invite(),
            Capability::ManageParticipants => role.can_manage_participants(),
            Capability::DeleteExpense => role.can_delete_expense(),
            Capability::ManagePayments => role.can_manage_payments(),
        }
    }

    pub fn require(&self, capability: Capability) -> ResultEngine<()> {
        if self.allows(capability) {
            return Ok(());
        }
        let role = self.role.map_or("non-participant", TripRole::as_str);
        Err(EngineError::Permission(format!(
            "{} is not allowed for role {role}",
            capability.describe()
        )))
    }
}
