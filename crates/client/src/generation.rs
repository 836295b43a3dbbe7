//! Request generations.
//!
//! Every fetch takes a [`Ticket`] for the slot it will write. When the
//! response arrives it is applied only if no newer fetch for the same slot
//! was started meanwhile, so a slow stale response can never overwrite
//! fresher data.

use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
    Trip,
    Participants,
    Expenses,
    Summary,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ticket {
    slot: Slot,
    generation: u64,
}

impl Ticket {
    pub fn slot(&self) -> Slot {
        self.slot
    }
}

#[derive(Debug, Default)]
pub struct Generations {
    latest: HashMap<Slot, u64>,
}

impl Generations {
    /// Starts a new request for `slot`, superseding any in flight.
    pub fn begin(&mut self, slot: Slot) -> Ticket {
        let generation = self.latest.entry(slot).or_insert(0);
        *generation += 1;
        Ticket {
            slot,
            generation: *generation,
        }
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.get(&ticket.slot) == Some(&ticket.generation)
    }

    /// Returns `value` if `ticket` is still current, `None` otherwise.
    pub fn accept<T>(&self, ticket: Ticket, value: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(value)
        } else {
            tracing::debug!(slot = ?ticket.slot, generation = ticket.generation, "dropping stale response");
            None
        }
    }
}
