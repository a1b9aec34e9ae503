// Typed game snapshot.
//
// A `GameView` is the client's read-only copy of the authoritative game. It is
// built from a `RawSnapshot` in one shot and never patched afterwards; a newer
// snapshot replaces it wholesale.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::protocol::{RawSnapshot, WireCard};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// The server sent a status this client does not understand. The full
    /// snapshot text is kept so the mismatch can be diagnosed.
    #[error("unknown game status `{status}` in snapshot {snapshot}")]
    UnknownStatus { status: String, snapshot: String },

    /// The message could not be read as a game at all (wrong shape, missing
    /// status, mistyped field).
    #[error("unreadable server message ({reason}): {snapshot}")]
    Malformed { reason: String, snapshot: String },
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Team {
    Red,
    Blue,
}

impl Team {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "red" | "Red" => Some(Team::Red),
            "blue" | "Blue" => Some(Team::Blue),
            _ => None,
        }
    }

    pub fn other(self) -> Self {
        match self {
            Team::Red => Team::Blue,
            Team::Blue => Team::Red,
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Team::Red => f.write_str("red"),
            Team::Blue => f.write_str("blue"),
        }
    }
}

/// Phase of one round. `Won` is terminal until the owner restarts the game,
/// which brings the same session back to `Pending` with a fresh deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Pending,
    Running,
    Won(Team),
}

impl GameStatus {
    /// Parse a wire status. Both the hub spelling (`redwon`) and the
    /// underscored one (`red_won`) are accepted.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(GameStatus::Pending),
            "running" => Some(GameStatus::Running),
            "redwon" | "red_won" => Some(GameStatus::Won(Team::Red)),
            "bluewon" | "blue_won" => Some(GameStatus::Won(Team::Blue)),
            _ => None,
        }
    }

    pub fn is_over(self) -> bool {
        matches!(self, GameStatus::Won(_))
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameStatus::Pending => f.write_str("pending"),
            GameStatus::Running => f.write_str("running"),
            GameStatus::Won(Team::Red) => f.write_str("red_won"),
            GameStatus::Won(Team::Blue) => f.write_str("blue_won"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardOwner {
    Red,
    Blue,
    Neutral,
    Assassin,
}

impl CardOwner {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "red" => Some(CardOwner::Red),
            "blue" => Some(CardOwner::Blue),
            "neutral" => Some(CardOwner::Neutral),
            "assassin" | "black" => Some(CardOwner::Assassin),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    /// Fixed display position, assigned when the round is dealt.
    pub index: u32,
    /// Flips to true once and stays true for the rest of the round.
    pub guessed: bool,
    /// `None` when the server withheld the owner from this viewer.
    pub belongs_to: Option<CardOwner>,
}

impl From<&WireCard> for Card {
    fn from(wire: &WireCard) -> Self {
        Card {
            index: wire.index,
            guessed: wire.guessed,
            belongs_to: wire.belongs_to.as_deref().and_then(CardOwner::parse),
        }
    }
}

/// A spy's clue, sent as `"word, count"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clue {
    pub word: String,
    pub count: u32,
}

impl Clue {
    pub fn parse(s: &str) -> Option<Self> {
        let (word, count) = s.split_once(',')?;
        let word = word.trim();
        if word.is_empty() {
            return None;
        }
        let count = count.trim().parse().ok()?;
        Some(Clue {
            word: word.to_string(),
            count,
        })
    }
}

/// The most recently resolved guess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastGuess {
    pub card: String,
    pub by: String,
    pub correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameView {
    pub status: GameStatus,
    pub whose_turn: Option<Team>,
    pub team_red: Vec<String>,
    pub team_blue: Vec<String>,
    pub team_red_spy: Option<String>,
    pub team_blue_spy: Option<String>,
    pub team_red_guesser: Option<String>,
    pub team_blue_guesser: Option<String>,
    pub cards: BTreeMap<String, Card>,
    pub last_guess: Option<LastGuess>,
    pub clue: Option<Clue>,
    /// The viewer's own name; `None` for spectators.
    pub you: Option<String>,
    pub your_turn: bool,
    pub you_own_game: bool,
    pub seq: Option<u64>,
}

impl GameView {
    /// Classify a raw snapshot. An unrecognised status is returned as an
    /// error carrying the whole snapshot rather than being ignored.
    pub fn from_raw(raw: &RawSnapshot) -> Result<Self, SnapshotError> {
        let game = &raw.game;
        let status =
            GameStatus::parse(&game.status).ok_or_else(|| SnapshotError::UnknownStatus {
                status: game.status.clone(),
                snapshot: raw.text.clone(),
            })?;

        let cards = game
            .cards
            .as_ref()
            .map(|cards| {
                cards
                    .iter()
                    .map(|(label, card)| (label.clone(), Card::from(card)))
                    .collect()
            })
            .unwrap_or_default();

        let last_guess = match (
            non_empty(&game.last_card_guessed),
            non_empty(&game.last_card_guessed_by),
        ) {
            (Some(card), Some(by)) => Some(LastGuess {
                card,
                by,
                correct: game.last_card_guessed_correctly.unwrap_or(false),
            }),
            _ => None,
        };

        Ok(GameView {
            status,
            whose_turn: game.whose_turn.as_deref().and_then(Team::parse),
            team_red: game.team_red.clone().unwrap_or_default(),
            team_blue: game.team_blue.clone().unwrap_or_default(),
            team_red_spy: non_empty(&game.team_red_spy),
            team_blue_spy: non_empty(&game.team_blue_spy),
            team_red_guesser: non_empty(&game.team_red_guesser),
            team_blue_guesser: non_empty(&game.team_blue_guesser),
            cards,
            last_guess,
            clue: game.clue_word.as_deref().and_then(Clue::parse),
            you: non_empty(&game.you),
            your_turn: game.your_turn.unwrap_or(false),
            you_own_game: game.you_own_game.unwrap_or(false),
            seq: game.seq,
        })
    }

    pub fn members(&self, team: Team) -> &[String] {
        match team {
            Team::Red => &self.team_red,
            Team::Blue => &self.team_blue,
        }
    }

    pub fn spy(&self, team: Team) -> Option<&str> {
        match team {
            Team::Red => self.team_red_spy.as_deref(),
            Team::Blue => self.team_blue_spy.as_deref(),
        }
    }

    pub fn guesser(&self, team: Team) -> Option<&str> {
        match team {
            Team::Red => self.team_red_guesser.as_deref(),
            Team::Blue => self.team_blue_guesser.as_deref(),
        }
    }

    /// The team `name` belongs to. Red is checked first; a name on both
    /// teams breaks a server invariant and resolves to red.
    pub fn team_of(&self, name: &str) -> Option<Team> {
        [Team::Red, Team::Blue]
            .into_iter()
            .find(|&team| self.members(team).iter().any(|m| m == name))
    }

    pub fn card(&self, label: &str) -> Option<&Card> {
        self.cards.get(label)
    }

    /// Map user input onto the exact card key. Labels are unique ignoring
    /// case, so an exact match is tried first and a case-insensitive one
    /// second.
    pub fn resolve_card(&self, input: &str) -> Option<&str> {
        let input = input.trim();
        if let Some((label, _)) = self.cards.get_key_value(input) {
            return Some(label.as_str());
        }
        self.cards
            .keys()
            .find(|label| label.eq_ignore_ascii_case(input))
            .map(String::as_str)
    }

    /// Cards in display order.
    pub fn cards_by_index(&self) -> Vec<(&str, &Card)> {
        let mut cards: Vec<_> = self
            .cards
            .iter()
            .map(|(label, card)| (label.as_str(), card))
            .collect();
        cards.sort_by_key(|(_, card)| card.index);
        cards
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{decode_server_message, ServerMessage};

    fn raw(text: &str) -> RawSnapshot {
        match decode_server_message(text).unwrap() {
            ServerMessage::Snapshot(raw) => raw,
            other => panic!("expected snapshot, got {other:?}"),
        }
    }

    #[test]
    fn status_spellings() {
        assert_eq!(GameStatus::parse("redwon"), Some(GameStatus::Won(Team::Red)));
        assert_eq!(GameStatus::parse("red_won"), Some(GameStatus::Won(Team::Red)));
        assert_eq!(GameStatus::parse("bluewon"), Some(GameStatus::Won(Team::Blue)));
        assert_eq!(GameStatus::parse("RUNNING"), None);
        assert!(GameStatus::Won(Team::Blue).is_over());
        assert!(!GameStatus::Running.is_over());
    }

    #[test]
    fn unknown_status_carries_the_snapshot() {
        let text = r#"{"status": "paused", "teamRed": []}"#;
        let err = GameView::from_raw(&raw(text)).unwrap_err();
        assert_eq!(
            err,
            SnapshotError::UnknownStatus {
                status: "paused".into(),
                snapshot: text.into(),
            }
        );
    }

    #[test]
    fn empty_strings_become_none() {
        let view = GameView::from_raw(&raw(
            r#"{"status": "running", "whoseTurn": "", "teamRedSpy": "",
                "lastCardGuessed": "", "lastCardGuessedBy": "", "you": ""}"#,
        ))
        .unwrap();
        assert_eq!(view.whose_turn, None);
        assert_eq!(view.team_red_spy, None);
        assert_eq!(view.last_guess, None);
        assert_eq!(view.you, None);
    }

    #[test]
    fn last_guess_requires_card_and_guesser() {
        let view = GameView::from_raw(&raw(
            r#"{"status": "running", "lastCardGuessed": "banana",
                "lastCardGuessedBy": "Bob", "lastCardGuessedCorrectly": false}"#,
        ))
        .unwrap();
        assert_eq!(
            view.last_guess,
            Some(LastGuess {
                card: "banana".into(),
                by: "Bob".into(),
                correct: false,
            })
        );
    }

    #[test]
    fn clue_parsing() {
        assert_eq!(
            Clue::parse("Swim, 2"),
            Some(Clue {
                word: "Swim".into(),
                count: 2
            })
        );
        assert_eq!(Clue::parse("Swim"), None);
        assert_eq!(Clue::parse(", 2"), None);
        assert_eq!(Clue::parse("Swim, lots"), None);
    }

    #[test]
    fn card_lookup_is_case_insensitive_but_returns_exact_key() {
        let view = GameView::from_raw(&raw(
            r#"{"status": "running", "cards": {
                "Apple": {"index": 1, "guessed": false, "belongsTo": "red"},
                "night": {"index": 0, "guessed": true, "belongsTo": "black"}}}"#,
        ))
        .unwrap();
        assert_eq!(view.resolve_card("Apple"), Some("Apple"));
        assert_eq!(view.resolve_card("APPLE"), Some("Apple"));
        assert_eq!(view.resolve_card(" apple "), Some("Apple"));
        assert_eq!(view.resolve_card("pear"), None);
        assert_eq!(
            view.card("night").unwrap().belongs_to,
            Some(CardOwner::Assassin)
        );

        let order: Vec<&str> = view.cards_by_index().into_iter().map(|(l, _)| l).collect();
        assert_eq!(order, vec!["night", "Apple"]);
    }

    #[test]
    fn team_membership() {
        let view = GameView::from_raw(&raw(
            r#"{"status": "pending", "teamRed": ["Alice"], "teamBlue": ["Bob"],
                "teamBlueGuesser": "Bob"}"#,
        ))
        .unwrap();
        assert_eq!(view.team_of("Alice"), Some(Team::Red));
        assert_eq!(view.team_of("Bob"), Some(Team::Blue));
        assert_eq!(view.team_of("Eve"), None);
        assert_eq!(view.guesser(Team::Blue), Some("Bob"));
        assert_eq!(view.spy(Team::Red), None);
        assert_eq!(Team::Red.other(), Team::Blue);
    }
}
