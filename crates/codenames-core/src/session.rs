// Game session: the single place client-side game state changes.
//
// Accepting a snapshot runs one fixed recomputation: replace the stored view,
// re-derive permissions, release satisfied locks, announce what changed. User
// intents go the other way: they are checked against the current permissions
// and locks and, if allowed, become exactly one `Command` for the emitter.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info};

use crate::authz::Permissions;
use crate::command::Command;
use crate::endpoint::EndpointError;
use crate::locks::{LockKind, LockTracker};
use crate::notify::{Notice, NoticeTracker, Notifier};
use crate::protocol::RawSnapshot;
use crate::store::{Replace, SnapshotStore};
use crate::view::{GameStatus, GameView, SnapshotError, Team};

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// Something the local player wants to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Guess a card; matched against card labels ignoring case.
    Guess(String),
    EndTurn,
    Restart,
    Start,
}

/// Why an intent did not produce a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("not connected to the game")]
    Offline,

    #[error("no game has been received yet")]
    NoSnapshot,

    #[error("spectators cannot act")]
    Spectator,

    #[error("there is no card called `{0}`")]
    UnknownCard(String),

    #[error("`{0}` has already been guessed")]
    AlreadyGuessed(String),

    #[error("you cannot {0} right now")]
    NotAllowed(&'static str),

    #[error("a {0} request is still waiting for the server")]
    InFlight(LockKind),
}

/// What the view layer should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    /// The game could not even be addressed. Terminal.
    InvalidInput(EndpointError),
    /// No snapshot yet, or the connection is down and being recovered.
    Loading,
    Lobby,
    Board,
    GameOver { winner: Team },
    /// The server sent a phase this client does not know. Terminal until a
    /// recognisable snapshot arrives.
    UnknownPhase { status: String, snapshot: String },
    /// The server sent something that is not a readable game. Cleared by the
    /// next good snapshot.
    Malformed { reason: String, snapshot: String },
}

/// Result of feeding a snapshot to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    Updated {
        released: Vec<LockKind>,
        notices: Vec<Notice>,
    },
    /// Older than what is already held; nothing changed.
    Stale,
}

// ---------------------------------------------------------------------------
// GameSession
// ---------------------------------------------------------------------------

pub struct GameSession {
    store: SnapshotStore,
    permissions: Permissions,
    locks: LockTracker,
    notices: NoticeTracker,
    notifier: Arc<dyn Notifier>,
    connected: bool,
    fault: Option<SnapshotError>,
}

impl GameSession {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        GameSession {
            store: SnapshotStore::new(),
            permissions: Permissions::default(),
            locks: LockTracker::new(),
            notices: NoticeTracker::new(),
            notifier,
            connected: false,
            fault: None,
        }
    }

    pub fn view(&self) -> Option<&GameView> {
        self.store.current()
    }

    pub fn permissions(&self) -> &Permissions {
        &self.permissions
    }

    pub fn locks(&self) -> &LockTracker {
        &self.locks
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn set_connected(&mut self, connected: bool) {
        if self.connected != connected {
            debug!(connected, "session connectivity changed");
        }
        self.connected = connected;
    }

    /// Accept a snapshot from the server.
    ///
    /// An unknown status is returned as an error and also switches the view
    /// to `UnknownPhase`; the previously stored snapshot is left in place.
    pub fn apply_snapshot(&mut self, raw: &RawSnapshot) -> Result<Applied, SnapshotError> {
        self.connected = true;

        let view = match GameView::from_raw(raw) {
            Ok(view) => view,
            Err(e) => {
                error!("protocol mismatch: {e}");
                self.fault = Some(e.clone());
                return Err(e);
            }
        };

        let previous = match self.store.replace(view) {
            Replace::Stale { .. } => return Ok(Applied::Stale),
            Replace::Accepted { previous } => previous,
        };
        self.fault = None;

        let Some(view) = self.store.current() else {
            return Ok(Applied::Stale);
        };

        match previous.as_ref().map(|p| p.status) {
            Some(before) if before != view.status => {
                info!(from = %before, to = %view.status, "game status changed");
            }
            None => info!(status = %view.status, "first game snapshot received"),
            _ => {}
        }

        self.permissions = Permissions::derive(view, view.you.as_deref());
        let released = self.locks.reconcile(view, &self.permissions);
        let notices = self.notices.observe(view);
        for notice in &notices {
            notice.deliver(&*self.notifier);
        }

        debug!(
            my_turn = self.permissions.my_turn,
            can_end_turn = self.permissions.can_end_turn,
            released = released.len(),
            "permissions recomputed"
        );

        Ok(Applied::Updated { released, notices })
    }

    /// Turn an intent into a command, taking the matching lock. Nothing is
    /// sent here; the caller hands the command to the emitter.
    pub fn authorize(&mut self, intent: Intent) -> Result<Command, Rejection> {
        if !self.connected {
            return Err(Rejection::Offline);
        }
        let view = self.store.current().ok_or(Rejection::NoSnapshot)?;
        if view.you.is_none() {
            return Err(Rejection::Spectator);
        }

        match intent {
            Intent::Guess(input) => {
                let (label, card) = view
                    .resolve_card(&input)
                    .and_then(|label| view.card(label).map(|card| (label, card)))
                    .ok_or_else(|| Rejection::UnknownCard(input.trim().to_string()))?;
                if card.guessed {
                    return Err(Rejection::AlreadyGuessed(label.to_string()));
                }
                if !self.permissions.can_guess(card) {
                    return Err(Rejection::NotAllowed("guess"));
                }
                self.locks
                    .acquire_guess(label, &view.cards)
                    .map_err(Rejection::InFlight)?;
                Ok(Command::Guess {
                    card: label.to_string(),
                })
            }
            Intent::EndTurn => {
                if !self.permissions.can_end_turn {
                    return Err(Rejection::NotAllowed("end the turn"));
                }
                self.locks
                    .acquire(LockKind::EndTurn)
                    .map_err(Rejection::InFlight)?;
                Ok(Command::EndTurn)
            }
            Intent::Restart => {
                if !self.permissions.can_restart {
                    return Err(Rejection::NotAllowed("restart the game"));
                }
                self.locks
                    .acquire(LockKind::Restart)
                    .map_err(Rejection::InFlight)?;
                Ok(Command::RestartGame)
            }
            Intent::Start => {
                if !self.permissions.can_start {
                    return Err(Rejection::NotAllowed("start the game"));
                }
                self.locks
                    .acquire(LockKind::Start)
                    .map_err(Rejection::InFlight)?;
                Ok(Command::StartGame)
            }
        }
    }

    /// Record a server message that could not be decoded. The stored game is
    /// kept but the view switches to `Malformed` until a good snapshot lands.
    pub fn reject_document(&mut self, text: &str, reason: &str) -> SnapshotError {
        error!(%reason, "unreadable server message: {text}");
        let e = SnapshotError::Malformed {
            reason: reason.to_string(),
            snapshot: text.to_string(),
        };
        self.fault = Some(e.clone());
        e
    }

    /// Hand back the lock `command` took when it never reached the server.
    /// A guess lock is only released for the card it was taken for.
    pub fn release_undelivered(&mut self, command: &Command) -> Option<LockKind> {
        let kind = command.lock_kind()?;
        if let Command::Guess { card } = command {
            if self.locks.pending_guess() != Some(card.as_str()) {
                return None;
            }
        }
        if !self.locks.release(kind) {
            return None;
        }
        debug!(%command, "command never sent, lock released");
        Some(kind)
    }

    /// Whether a guess on `label` would currently be accepted.
    pub fn can_guess(&self, label: &str) -> bool {
        self.connected
            && self.locks.pending_guess().is_none()
            && self
                .view()
                .and_then(|v| v.resolve_card(label).and_then(|l| v.card(l)))
                .is_some_and(|card| self.permissions.can_guess(card))
    }

    pub fn view_state(&self) -> ViewState {
        match &self.fault {
            Some(SnapshotError::UnknownStatus { status, snapshot }) => {
                return ViewState::UnknownPhase {
                    status: status.clone(),
                    snapshot: snapshot.clone(),
                };
            }
            Some(SnapshotError::Malformed { reason, snapshot }) => {
                return ViewState::Malformed {
                    reason: reason.clone(),
                    snapshot: snapshot.clone(),
                };
            }
            None => {}
        }
        match self.store.current() {
            Some(view) if self.connected => match view.status {
                GameStatus::Pending => ViewState::Lobby,
                GameStatus::Running => ViewState::Board,
                GameStatus::Won(winner) => ViewState::GameOver { winner },
            },
            _ => ViewState::Loading,
        }
    }
}
