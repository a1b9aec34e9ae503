// Optimistic lock tracker.
//
// Marks a command kind as in flight from the moment it is dispatched until a
// snapshot shows the server has dealt with it. There are no timeouts: a reply
// that never arrives leaves the lock held until the reconnect loop delivers a
// fresh snapshot. A lock never outlives the condition it guards.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::authz::Permissions;
use crate::view::{Card, GameStatus, GameView};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockKind {
    Guess,
    EndTurn,
    Restart,
    Start,
}

impl fmt::Display for LockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockKind::Guess => f.write_str("guess"),
            LockKind::EndTurn => f.write_str("end turn"),
            LockKind::Restart => f.write_str("restart"),
            LockKind::Start => f.write_str("start"),
        }
    }
}

#[derive(Debug, Clone)]
struct PendingGuess {
    card: String,
    /// The board as it was when the guess went out. Any difference means the
    /// round trip has resolved.
    cards_at_dispatch: BTreeMap<String, Card>,
}

#[derive(Debug, Clone, Default)]
pub struct LockTracker {
    pending_guess: Option<PendingGuess>,
    pending_end_turn: bool,
    pending_restart: bool,
    pending_start: bool,
}

impl LockTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_guess(&self) -> Option<&str> {
        self.pending_guess.as_ref().map(|p| p.card.as_str())
    }

    pub fn is_held(&self, kind: LockKind) -> bool {
        match kind {
            LockKind::Guess => self.pending_guess.is_some(),
            LockKind::EndTurn => self.pending_end_turn,
            LockKind::Restart => self.pending_restart,
            LockKind::Start => self.pending_start,
        }
    }

    /// Take the guess lock for `card`. Fails if any guess is outstanding.
    pub fn acquire_guess(
        &mut self,
        card: &str,
        cards: &BTreeMap<String, Card>,
    ) -> Result<(), LockKind> {
        if self.pending_guess.is_some() {
            return Err(LockKind::Guess);
        }
        self.pending_guess = Some(PendingGuess {
            card: card.to_string(),
            cards_at_dispatch: cards.clone(),
        });
        Ok(())
    }

    /// Take a lock that is just a flag (everything but guesses).
    pub fn acquire(&mut self, kind: LockKind) -> Result<(), LockKind> {
        let flag = match kind {
            LockKind::EndTurn => &mut self.pending_end_turn,
            LockKind::Restart => &mut self.pending_restart,
            LockKind::Start => &mut self.pending_start,
            LockKind::Guess => return Err(LockKind::Guess),
        };
        if *flag {
            return Err(kind);
        }
        *flag = true;
        Ok(())
    }

    /// Release every lock the new snapshot satisfies. Returns what was
    /// released.
    pub fn reconcile(&mut self, view: &GameView, permissions: &Permissions) -> Vec<LockKind> {
        let mut released = Vec::new();

        if let Some(pending) = &self.pending_guess {
            if pending.cards_at_dispatch != view.cards {
                debug!(card = %pending.card, "guess resolved");
                self.pending_guess = None;
                released.push(LockKind::Guess);
            }
        }

        // Any fresh snapshot answers an end-turn request; losing the turn
        // answers it even without an explicit acknowledgment.
        if self.pending_end_turn {
            self.pending_end_turn = false;
            released.push(LockKind::EndTurn);
        }

        if self.pending_restart && !view.status.is_over() {
            self.pending_restart = false;
            released.push(LockKind::Restart);
        }

        if self.pending_start && view.status != GameStatus::Pending {
            self.pending_start = false;
            released.push(LockKind::Start);
        }

        self.release_if_turn_lost(permissions, &mut released);
        released
    }

    fn release_if_turn_lost(&mut self, permissions: &Permissions, released: &mut Vec<LockKind>) {
        if permissions.my_turn {
            return;
        }
        if self.pending_end_turn {
            self.pending_end_turn = false;
            released.push(LockKind::EndTurn);
        }
        if self.pending_guess.take().is_some() {
            released.push(LockKind::Guess);
        }
    }

    /// Release one lock outright. Returns whether it was held.
    pub fn release(&mut self, kind: LockKind) -> bool {
        match kind {
            LockKind::Guess => self.pending_guess.take().is_some(),
            LockKind::EndTurn => std::mem::take(&mut self.pending_end_turn),
            LockKind::Restart => std::mem::take(&mut self.pending_restart),
            LockKind::Start => std::mem::take(&mut self.pending_start),
        }
    }

    /// Drop everything, e.g. when the view is torn down.
    pub fn clear(&mut self) {
        *self = LockTracker::default();
    }
}
