//! Percentage splits of a single expense.
//!
//! A [`SplitDraft`] is the editable share map behind the "add expense" form.
//! It tracks which participants are active, the percentage of each one and
//! whether shares are computed equally or typed by hand.

use std::collections::{BTreeMap, BTreeSet};

use crate::{EngineError, ParticipantId, ResultEngine};

/// Shares of an expense must add up to this many percent.
pub const SHARE_TOTAL: f64 = 100.0;
/// Accepted distance from [`SHARE_TOTAL`]. Equal thirds typed as 33.33 sum to
/// 99.99 and must pass.
pub const SHARE_TOLERANCE: f64 = 0.01;
// Keeps 99.99 and 100.01 inside the band despite binary rounding.
const FLOAT_SLACK: f64 = 1e-9;

/// Equal split over `active`: every id gets `100 / N`.
///
/// Duplicate ids count once. An empty set yields an empty map, i.e. a share
/// of 0 for everybody.
pub fn compute_equal_shares(active: &[ParticipantId]) -> BTreeMap<ParticipantId, f64> {
    let unique: BTreeSet<ParticipantId> = active.iter().copied().collect();
    if unique.is_empty() {
        return BTreeMap::new();
    }
    let share = SHARE_TOTAL / unique.len() as f64;
    unique.into_iter().map(|id| (id, share)).collect()
}

/// Sum of the percentages of active participants only.
pub fn active_share_total(
    shares: &BTreeMap<ParticipantId, f64>,
    active: &BTreeSet<ParticipantId>,
) -> f64 {
    active
        .iter()
        .filter_map(|id| shares.get(id))
        .copied()
        .sum()
}

/// Fails unless the active shares are within [`SHARE_TOLERANCE`] of 100.
pub fn validate_share_total(
    shares: &BTreeMap<ParticipantId, f64>,
    active: &BTreeSet<ParticipantId>,
) -> ResultEngine<()> {
    let total = active_share_total(shares, active);
    if (total - SHARE_TOTAL).abs() > SHARE_TOLERANCE + FLOAT_SLACK {
        return Err(EngineError::Validation("shares must sum to 100".to_string()));
    }
    Ok(())
}

/// Reads a percentage typed by the user. Anything that is not a finite
/// number becomes 0.
pub fn parse_percentage(text: &str) -> f64 {
    text.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SplitMode {
    #[default]
    Equal,
    Custom,
}

/// Editable share map of one expense.
#[derive(Clone, Debug, PartialEq)]
pub struct SplitDraft {
    participants: Vec<ParticipantId>,
    active: BTreeSet<ParticipantId>,
    shares: BTreeMap<ParticipantId, f64>,
    mode: SplitMode,
}

impl SplitDraft {
    /// Starts in [`SplitMode::Equal`] with every participant active.
    pub fn new(participants: impl IntoIterator<Item = ParticipantId>) -> Self {
        let mut ordered = Vec::new();
        for id in participants {
            if !ordered.contains(&id) {
                ordered.push(id);
            }
        }
        let mut draft = Self {
            active: ordered.iter().copied().collect(),
            participants: ordered,
            shares: BTreeMap::new(),
            mode: SplitMode::Equal,
        };
        draft.recompute_equal();
        draft
    }

    pub fn mode(&self) -> SplitMode {
        self.mode
    }

    pub fn participants(&self) -> &[ParticipantId] {
        &self.participants
    }

    pub fn is_active(&self, participant: ParticipantId) -> bool {
        self.active.contains(&participant)
    }

    /// Active participants in form order.
    pub fn active(&self) -> Vec<ParticipantId> {
        self.participants
            .iter()
            .copied()
            .filter(|id| self.active.contains(id))
            .collect()
    }

    /// Percentage of `participant`, 0 when unknown or inactive.
    pub fn share(&self, participant: ParticipantId) -> f64 {
        if !self.is_active(participant) {
            return 0.0;
        }
        self.shares.get(&participant).copied().unwrap_or(0.0)
    }

    /// Full share map, inactive participants included at 0.
    pub fn shares(&self) -> &BTreeMap<ParticipantId, f64> {
        &self.shares
    }

    /// Shares of active participants with a nonzero percentage.
    pub fn active_shares(&self) -> BTreeMap<ParticipantId, f64> {
        self.active
            .iter()
            .filter_map(|id| self.shares.get(id).map(|share| (*id, *share)))
            .filter(|(_, share)| *share != 0.0)
            .collect()
    }

    pub fn total(&self) -> f64 {
        active_share_total(&self.shares, &self.active)
    }

    pub fn validate(&self) -> ResultEngine<()> {
        validate_share_total(&self.shares, &self.active)
    }

    /// Flips `participant` in or out of the split and returns whether it is
    /// now active.
    ///
    /// In equal mode the whole map is recomputed. In custom mode a removed
    /// participant drops to 0 and an added one keeps its current value.
    pub fn toggle_participant(&mut self, participant: ParticipantId) -> ResultEngine<bool> {
        self.ensure_known(participant)?;

        let now_active = if self.active.remove(&participant) {
            self.shares.insert(participant, 0.0);
            false
        } else {
            self.active.insert(participant);
            true
        };

        if self.mode == SplitMode::Equal {
            self.recompute_equal();
        }
        Ok(now_active)
    }

    /// Sets a percentage by hand.
    ///
    /// Exactly 0 deactivates the participant; any other value activates it.
    /// Other shares are left alone, reaching 100 is up to the caller. A
    /// manual value puts the draft in [`SplitMode::Custom`].
    pub fn set_custom_share(
        &mut self,
        participant: ParticipantId,
        percentage: f64,
    ) -> ResultEngine<()> {
        self.ensure_known(participant)?;
        if !percentage.is_finite() || !(0.0..=SHARE_TOTAL).contains(&percentage) {
            return Err(EngineError::Validation(format!(
                "share must be between 0 and 100, got {percentage}"
            )));
        }

        self.mode = SplitMode::Custom;
        self.shares.insert(participant, percentage);
        if percentage == 0.0 {
            self.active.remove(&participant);
        } else {
            self.active.insert(participant);
        }
        Ok(())
    }

    /// Same as [`set_custom_share`](Self::set_custom_share) for raw form
    /// input; unparsable text counts as 0.
    pub fn set_custom_share_text(
        &mut self,
        participant: ParticipantId,
        text: &str,
    ) -> ResultEngine<()> {
        self.set_custom_share(participant, parse_percentage(text))
    }

    /// Switches between equal and custom mode.
    ///
    /// Leaving custom mode discards manual values; entering it keeps the
    /// current ones as a starting point.
    pub fn set_custom_mode(&mut self, custom: bool) {
        match (self.mode, custom) {
            (SplitMode::Custom, false) => {
                self.mode = SplitMode::Equal;
                self.recompute_equal();
            }
            (SplitMode::Equal, true) => self.mode = SplitMode::Custom,
            _ => {}
        }
    }

    fn recompute_equal(&mut self) {
        let equal = compute_equal_shares(&self.active());
        for id in &self.participants {
            self.shares
                .insert(*id, equal.get(id).copied().unwrap_or(0.0));
        }
    }

    fn ensure_known(&self, participant: ParticipantId) -> ResultEngine<()> {
        if self.participants.contains(&participant) {
            return Ok(());
        }
        Err(EngineError::UnknownParticipant(participant.to_string()))
    }
}
