// Application state and orchestration logic.
//
// The central event loop that serialises connection events from the
// supervisor and user commands from the terminal. All game state lives in the
// `GameSession` owned here; the render side only ever sees `UiUpdate`s.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use codenames_core::authz::Permissions;
use codenames_core::notify::Notifier;
use codenames_core::session::{Applied, GameSession, Intent, ViewState};
use codenames_core::view::GameView;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::connection::{CommandEmitter, ConnectionEvent};

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// A line of user input, parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    Guess(String),
    EndTurn,
    Restart,
    Start,
    /// Print the board again.
    Show,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCommandError {
    #[error("nothing to do")]
    Empty,

    #[error("`guess` needs a card, e.g. `guess apple`")]
    MissingCard,

    #[error("unknown command `{0}` (try guess, end, restart, start, show, quit)")]
    Unknown(String),
}

impl FromStr for UserCommand {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        match word.to_ascii_lowercase().as_str() {
            "" => Err(ParseCommandError::Empty),
            "guess" | "g" if rest.is_empty() => Err(ParseCommandError::MissingCard),
            "guess" | "g" => Ok(UserCommand::Guess(rest.to_string())),
            "end" | "pass" => Ok(UserCommand::EndTurn),
            "restart" => Ok(UserCommand::Restart),
            "start" => Ok(UserCommand::Start),
            "show" | "board" => Ok(UserCommand::Show),
            "quit" | "exit" | "q" => Ok(UserCommand::Quit),
            other => Err(ParseCommandError::Unknown(other.to_string())),
        }
    }
}

impl UserCommand {
    fn intent(self) -> Option<Intent> {
        match self {
            UserCommand::Guess(card) => Some(Intent::Guess(card)),
            UserCommand::EndTurn => Some(Intent::EndTurn),
            UserCommand::Restart => Some(Intent::Restart),
            UserCommand::Start => Some(Intent::Start),
            UserCommand::Show | UserCommand::Quit => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warn,
    Success,
}

impl fmt::Display for ToastLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToastLevel::Info => f.write_str("info"),
            ToastLevel::Warn => f.write_str("warn"),
            ToastLevel::Success => f.write_str("success"),
        }
    }
}

/// Everything the view layer needs to draw one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewUpdate {
    pub state: ViewState,
    pub view: Option<GameView>,
    pub permissions: Permissions,
    pub pending_guess: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    View(Box<ViewUpdate>),
    Toast { level: ToastLevel, message: String },
    /// An intent was refused locally; nothing was sent.
    Rejected(String),
    ServerError(String),
    /// A command was accepted locally but never reached the server.
    NotSent(String),
    /// The game could not be reached at all.
    ConnectFailed(String),
}

/// Routes session notices onto the UI channel.
pub struct ChannelNotifier {
    tx: mpsc::Sender<UiUpdate>,
}

impl ChannelNotifier {
    pub fn new(tx: mpsc::Sender<UiUpdate>) -> Self {
        ChannelNotifier { tx }
    }

    fn push(&self, level: ToastLevel, message: &str) {
        let update = UiUpdate::Toast {
            level,
            message: message.to_string(),
        };
        if self.tx.try_send(update).is_err() {
            warn!(%level, %message, "ui channel unavailable, notice dropped");
        }
    }
}

impl Notifier for ChannelNotifier {
    fn info(&self, message: &str) {
        self.push(ToastLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.push(ToastLevel::Warn, message);
    }

    fn success(&self, message: &str) {
        self.push(ToastLevel::Success, message);
    }
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

pub struct AppState {
    pub session: GameSession,
    /// Outbound side of the supervisor. Dropped with the state, which tears
    /// the connection down.
    pub emitter: CommandEmitter,
}

impl AppState {
    pub fn new(emitter: CommandEmitter, notifier: Arc<dyn Notifier>) -> Self {
        AppState {
            session: GameSession::new(notifier),
            emitter,
        }
    }

    pub fn view_update(&self) -> ViewUpdate {
        ViewUpdate {
            state: self.session.view_state(),
            view: self.session.view().cloned(),
            permissions: self.session.permissions().clone(),
            pending_guess: self.session.locks().pending_guess().map(str::to_string),
        }
    }
}

// ---------------------------------------------------------------------------
// Event loop
// ---------------------------------------------------------------------------

pub async fn run(
    mut conn_rx: mpsc::Receiver<ConnectionEvent>,
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Application event loop started");

    loop {
        tokio::select! {
            // --- Connection events ---
            event = conn_rx.recv() => {
                match event {
                    Some(event) => {
                        if !handle_connection_event(&mut state, event, &ui_tx).await {
                            break;
                        }
                    }
                    None => {
                        info!("Connection channel closed, shutting down");
                        break;
                    }
                }
            }

            // --- User commands ---
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) | None => {
                        info!("User quit");
                        break;
                    }
                    Some(cmd) => handle_user_command(&mut state, cmd, &ui_tx).await,
                }
            }
        }
    }

    info!("Application event loop stopped");
    Ok(())
}

/// Returns false when the loop should stop.
async fn handle_connection_event(
    state: &mut AppState,
    event: ConnectionEvent,
    ui_tx: &mpsc::Sender<UiUpdate>,
) -> bool {
    match event {
        ConnectionEvent::Connected => {
            info!("Connected to game server");
            state.session.set_connected(true);
            push_view(state, ui_tx).await;
        }
        ConnectionEvent::Disconnected => {
            info!("Disconnected from game server");
            state.session.set_connected(false);
            push_view(state, ui_tx).await;
        }
        ConnectionEvent::ConnectFailed(reason) => {
            warn!("Could not reach the game: {reason}");
            let _ = ui_tx.send(UiUpdate::ConnectFailed(reason)).await;
            return false;
        }
        ConnectionEvent::Snapshot(raw) => match state.session.apply_snapshot(&raw) {
            Ok(Applied::Stale) => debug!("Stale snapshot ignored"),
            Ok(Applied::Updated { .. }) | Err(_) => push_view(state, ui_tx).await,
        },
        ConnectionEvent::ServerError(reason) => {
            let _ = ui_tx.send(UiUpdate::ServerError(reason)).await;
        }
        ConnectionEvent::ProtocolError { text, reason } => {
            state.session.reject_document(&text, &reason);
            push_view(state, ui_tx).await;
        }
        ConnectionEvent::CommandDropped(command) => {
            if state.session.release_undelivered(&command).is_some() {
                push_view(state, ui_tx).await;
            }
            let _ = ui_tx.send(UiUpdate::NotSent(command.to_string())).await;
        }
    }
    true
}

async fn handle_user_command(
    state: &mut AppState,
    cmd: UserCommand,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    let Some(intent) = cmd.intent() else {
        push_view(state, ui_tx).await;
        return;
    };

    match state.session.authorize(intent) {
        Ok(command) => {
            debug!(%command, "Dispatching command");
            if !state.emitter.emit(command.clone()) {
                state.session.release_undelivered(&command);
                let _ = ui_tx.send(UiUpdate::NotSent(command.to_string())).await;
            }
            push_view(state, ui_tx).await;
        }
        Err(rejection) => {
            debug!(%rejection, "Intent rejected");
            let _ = ui_tx.send(UiUpdate::Rejected(rejection.to_string())).await;
        }
    }
}

async fn push_view(state: &AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    let _ = ui_tx
        .send(UiUpdate::View(Box::new(state.view_update())))
        .await;
}
