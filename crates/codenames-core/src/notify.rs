// Player-facing notifications derived from snapshot changes.
//
// The presentation layer (toasts, a terminal line, a test recorder) is reached
// only through the injected `Notifier`. Each notice fires once per distinct
// content: re-receiving an identical snapshot, as happens after a heartbeat or
// a reconnect, does not repeat it.

use tracing::{info, warn};

use crate::view::{Clue, GameStatus, GameView, LastGuess, Team};

pub trait Notifier: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn success(&self, message: &str);
}

/// Routes notices into the log. Used when nothing else is plugged in.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn info(&self, message: &str) {
        info!(target: "codenames::notice", "{message}");
    }

    fn warn(&self, message: &str) {
        warn!(target: "codenames::notice", "{message}");
    }

    fn success(&self, message: &str) {
        info!(target: "codenames::notice", success = true, "{message}");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Won,
    Lost,
    /// The viewer is not on either team.
    Watched,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    GuessResult(LastGuess),
    GameOver { winner: Team, outcome: Outcome },
    Clue(Clue),
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Notice::GuessResult(g) if g.correct => {
                format!("{} got \"{}\" right.", g.by, g.card.to_uppercase())
            }
            Notice::GuessResult(g) => {
                format!("{} picked \"{}.\" It was wrong.", g.by, g.card.to_uppercase())
            }
            Notice::GameOver {
                outcome: Outcome::Won,
                ..
            } => "Hey! You Won!".to_string(),
            Notice::GameOver {
                outcome: Outcome::Lost,
                ..
            } => "Welp! Ya Lost!".to_string(),
            Notice::GameOver {
                winner: Team::Red,
                outcome: Outcome::Watched,
            } => "The Red team won the game.".to_string(),
            Notice::GameOver {
                winner: Team::Blue,
                outcome: Outcome::Watched,
            } => "The Blue team won the game.".to_string(),
            Notice::Clue(clue) => {
                format!("Clue: {} for {}", clue.word.to_uppercase(), clue.count)
            }
        }
    }

    pub fn deliver(&self, notifier: &dyn Notifier) {
        let message = self.message();
        match self {
            Notice::GuessResult(g) if g.correct => notifier.success(&message),
            Notice::GuessResult(_) => notifier.warn(&message),
            Notice::GameOver {
                outcome: Outcome::Won,
                ..
            } => notifier.success(&message),
            Notice::GameOver {
                outcome: Outcome::Lost,
                ..
            } => notifier.warn(&message),
            Notice::GameOver { .. } | Notice::Clue(_) => notifier.info(&message),
        }
    }
}

/// Remembers what was last announced so repeats stay quiet.
#[derive(Debug, Default)]
pub struct NoticeTracker {
    last_guess: Option<LastGuess>,
    last_status: Option<GameStatus>,
    last_clue: Option<Clue>,
}

impl NoticeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, view: &GameView) -> Vec<Notice> {
        let mut notices = Vec::new();

        if view.last_guess != self.last_guess {
            if let Some(guess) = &view.last_guess {
                notices.push(Notice::GuessResult(guess.clone()));
            }
            self.last_guess = view.last_guess.clone();
        }

        if self.last_status != Some(view.status) {
            if let GameStatus::Won(winner) = view.status {
                let outcome = match view.you.as_deref().and_then(|you| view.team_of(you)) {
                    Some(team) if team == winner => Outcome::Won,
                    Some(_) => Outcome::Lost,
                    None => Outcome::Watched,
                };
                notices.push(Notice::GameOver { winner, outcome });
            }
            self.last_status = Some(view.status);
        }

        if view.clue != self.last_clue {
            if let Some(clue) = view.clue.as_ref().filter(|c| c.count > 0) {
                notices.push(Notice::Clue(clue.clone()));
            }
            self.last_clue = view.clue.clone();
        }

        notices
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::Notifier;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Level {
        Info,
        Warn,
        Success,
    }

    /// Records every call for assertions.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub calls: Mutex<Vec<(Level, String)>>,
    }

    impl RecordingNotifier {
        pub fn take(&self) -> Vec<(Level, String)> {
            std::mem::take(&mut *self.calls.lock().unwrap())
        }
    }

    impl Notifier for RecordingNotifier {
        fn info(&self, message: &str) {
            self.calls.lock().unwrap().push((Level::Info, message.into()));
        }
        fn warn(&self, message: &str) {
            self.calls.lock().unwrap().push((Level::Warn, message.into()));
        }
        fn success(&self, message: &str) {
            self.calls.lock().unwrap().push((Level::Success, message.into()));
        }
    }
}
