use crate::{EngineError, ParticipantId, ResultEngine, TripRole, UserId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParticipantStatus {
    Pending,
    Accepted,
    Declined,
}

impl ParticipantStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Accepted => "ACCEPTED",
            Self::Declined => "DECLINED",
        }
    }

    /// Answers a pending invitation. Only `PENDING` can move.
    pub fn respond(self, accept: bool) -> ResultEngine<Self> {
        if self != Self::Pending {
            return Err(EngineError::Validation(format!(
                "invitation already {}",
                self.as_str().to_ascii_lowercase()
            )));
        }
        Ok(if accept { Self::Accepted } else { Self::Declined })
    }
}

/// A user's membership in a trip.
#[derive(Clone, Debug, PartialEq)]
pub struct Participant {
    pub id: ParticipantId,
    pub user_id: Option<UserId>,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: TripRole,
    pub status: ParticipantStatus,
}

impl Participant {
    /// Best-effort human label: "First Last" when any part of the name is
    /// known, otherwise the capitalized email local-part.
    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();
        if parts.is_empty() {
            return name_from_email(&self.email);
        }
        parts.join(" ")
    }

    pub fn is_accepted(&self) -> bool {
        self.status == ParticipantStatus::Accepted
    }
}

/// `"jan.kowalski@example.com"` → `"Jan.kowalski"`.
pub fn name_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    capitalize(local)
}

pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Role of `user` in the trip, if they have a participant record.
pub fn current_role(participants: &[Participant], user: UserId) -> Option<TripRole> {
    participants
        .iter()
        .find(|p| p.user_id == Some(user))
        .map(|p| p.role)
}

fn is_accepted_organizer(participant: &Participant) -> bool {
    participant.role == TripRole::Organizer && participant.is_accepted()
}

/// Checks that the trip keeps at least one accepted organizer.
pub fn ensure_organizer_present(participants: &[Participant]) -> ResultEngine<()> {
    if participants.iter().any(is_accepted_organizer) {
        return Ok(());
    }
    Err(EngineError::Validation(
        "trip has no accepted organizer".to_string(),
    ))
}

/// Checks that changing `target` to `new_role` (or removing it when `None`)
/// leaves an accepted organizer behind.
pub fn ensure_organizer_remains(
    participants: &[Participant],
    target: ParticipantId,
    new_role: Option<TripRole>,
) -> ResultEngine<()> {
    if !participants.iter().any(|p| p.id == target) {
        return Err(EngineError::UnknownParticipant(target.to_string()));
    }
    let remaining = participants.iter().any(|p| {
        if p.id == target {
            new_role == Some(TripRole::Organizer) && p.is_accepted()
        } else {
            is_accepted_organizer(p)
        }
    });
    if remaining {
        return Ok(());
    }
    Err(EngineError::Validation(
        "the last organizer cannot be removed or demoted".to_string(),
    ))
}
