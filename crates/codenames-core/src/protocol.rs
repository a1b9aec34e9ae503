// Inbound wire protocol: decoding server messages into raw snapshots.
//
// The server pushes one JSON document per message. Two snapshot shapes are
// accepted: the flat camelCase document, and the per-player envelope the hub
// emits (`{"You": .., "YourTurn": .., "YouOwnGame": .., "BaseGame": {..}}`
// with PascalCase game fields). Error documents (`{"error": ".."}`) are sent
// by the hub right before it drops a connection it refuses to register.
//
// Decoding here is deliberately loose: collections and strings may be `null`
// and the status is kept as a string. Classification into a typed `GameView`
// happens in `view.rs`, where an unknown status becomes a surfaced error
// instead of a parse failure.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

/// A single card as it appears on the wire.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireCard {
    #[serde(default, alias = "Index")]
    pub index: u32,
    #[serde(default, alias = "Guessed")]
    pub guessed: bool,
    #[serde(default, alias = "BelongsTo")]
    pub belongs_to: Option<String>,
}

/// The game document with every field optional except `status`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireGame {
    #[serde(alias = "Status")]
    pub status: String,
    #[serde(default, alias = "WhoseTurn")]
    pub whose_turn: Option<String>,
    #[serde(default, alias = "TeamRed")]
    pub team_red: Option<Vec<String>>,
    #[serde(default, alias = "TeamBlue")]
    pub team_blue: Option<Vec<String>>,
    #[serde(default, alias = "TeamRedSpy")]
    pub team_red_spy: Option<String>,
    #[serde(default, alias = "TeamBlueSpy")]
    pub team_blue_spy: Option<String>,
    #[serde(default, alias = "TeamRedGuesser")]
    pub team_red_guesser: Option<String>,
    #[serde(default, alias = "TeamBlueGuesser")]
    pub team_blue_guesser: Option<String>,
    #[serde(default, alias = "Cards")]
    pub cards: Option<BTreeMap<String, WireCard>>,
    #[serde(default, alias = "LastCardGuessed")]
    pub last_card_guessed: Option<String>,
    #[serde(default, alias = "LastCardGuessedBy")]
    pub last_card_guessed_by: Option<String>,
    #[serde(default, alias = "LastCardGuessedCorrectly")]
    pub last_card_guessed_correctly: Option<bool>,
    #[serde(default, alias = "ClueWord")]
    pub clue_word: Option<String>,
    #[serde(default, alias = "You")]
    pub you: Option<String>,
    #[serde(default, alias = "YourTurn")]
    pub your_turn: Option<bool>,
    #[serde(default, alias = "YouOwnGame")]
    pub you_own_game: Option<bool>,
    /// Optional monotonic sequence number. The hub does not send one; servers
    /// that do let the store discard snapshots that arrive out of order.
    #[serde(default, alias = "Seq")]
    pub seq: Option<u64>,
}

/// Viewer-specific fields wrapped around `BaseGame` by the hub.
#[derive(Debug, Deserialize)]
struct PlayerEnvelope {
    #[serde(rename = "BaseGame", alias = "baseGame")]
    base_game: WireGame,
    #[serde(default, rename = "You", alias = "you")]
    you: Option<String>,
    #[serde(default, rename = "YourTurn", alias = "yourTurn")]
    your_turn: Option<bool>,
    #[serde(default, rename = "YouOwnGame", alias = "youOwnGame")]
    you_own_game: Option<bool>,
    #[serde(default, rename = "Seq", alias = "seq")]
    seq: Option<u64>,
}

/// A decoded but not yet classified snapshot, together with the original text
/// so it can be surfaced verbatim for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSnapshot {
    pub game: WireGame,
    pub text: String,
}

/// Anything the server can push down the socket.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Snapshot(RawSnapshot),
    /// The server refused the connection (unknown game, access denied).
    Error { reason: String },
}

/// Decode one inbound text frame.
pub fn decode_server_message(text: &str) -> Result<ServerMessage, serde_json::Error> {
    let value: Value = serde_json::from_str(text)?;

    if let Some(reason) = error_reason(&value) {
        return Ok(ServerMessage::Error { reason });
    }

    let game = if value.get("BaseGame").is_some() || value.get("baseGame").is_some() {
        let envelope: PlayerEnvelope = serde_json::from_value(value)?;
        let mut game = envelope.base_game;
        // Viewer fields live on the envelope; they win over anything nested.
        game.you = envelope.you.or(game.you);
        game.your_turn = envelope.your_turn.or(game.your_turn);
        game.you_own_game = envelope.you_own_game.or(game.you_own_game);
        game.seq = envelope.seq.or(game.seq);
        game
    } else {
        serde_json::from_value(value)?
    };

    Ok(ServerMessage::Snapshot(RawSnapshot {
        game,
        text: text.to_string(),
    }))
}

fn error_reason(value: &Value) -> Option<String> {
    let obj = value.as_object()?;
    if obj.contains_key("status") || obj.contains_key("Status") || obj.contains_key("BaseGame") {
        return None;
    }
    obj.get("error")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENVELOPE: &str = r#"{
        "You": "Alice",
        "YourTurn": true,
        "YouOwnGame": false,
        "BaseGame": {
            "Status": "running",
            "WhoseTurn": "red",
            "TeamRed": ["Alice", "Carol"],
            "TeamBlue": ["Bob", "Dave"],
            "TeamRedSpy": "Carol",
            "TeamBlueSpy": "Dave",
            "TeamRedGuesser": "Alice",
            "TeamBlueGuesser": "Bob",
            "Cards": {
                "APPLE": {"Index": 0, "Guessed": false, "BelongsTo": "red"},
                "night": {"Index": 1, "Guessed": true, "BelongsTo": "black"}
            },
            "LastCardGuessed": "",
            "LastCardGuessedBy": "",
            "LastCardGuessedCorrectly": false,
            "clueWord": "fruit, 2"
        }
    }"#;

    #[test]
    fn envelope_fields_are_lifted_onto_the_game() {
        let msg = decode_server_message(ENVELOPE).unwrap();
        let ServerMessage::Snapshot(raw) = msg else {
            panic!("expected snapshot, got {msg:?}");
        };
        assert_eq!(raw.game.status, "running");
        assert_eq!(raw.game.you.as_deref(), Some("Alice"));
        assert_eq!(raw.game.your_turn, Some(true));
        assert_eq!(raw.game.team_red_guesser.as_deref(), Some("Alice"));
        assert_eq!(raw.game.clue_word.as_deref(), Some("fruit, 2"));
        let cards = raw.game.cards.unwrap();
        assert_eq!(cards["night"].belongs_to.as_deref(), Some("black"));
        assert!(cards["night"].guessed);
        assert_eq!(raw.text, ENVELOPE);
    }

    #[test]
    fn flat_camel_case_document_decodes() {
        let text = r#"{
            "status": "pending",
            "teamRed": ["Alice"],
            "teamBlue": [],
            "cards": {"PEAR": {"index": 3, "guessed": false, "belongsTo": "neutral"}},
            "you": null,
            "yourTurn": false,
            "seq": 7
        }"#;
        let ServerMessage::Snapshot(raw) = decode_server_message(text).unwrap() else {
            panic!("expected snapshot");
        };
        assert_eq!(raw.game.status, "pending");
        assert_eq!(raw.game.you, None);
        assert_eq!(raw.game.seq, Some(7));
        assert_eq!(raw.game.cards.unwrap()["PEAR"].index, 3);
    }

    #[test]
    fn null_collections_are_tolerated() {
        let text = r#"{"BaseGame": {"Status": "pending", "TeamRed": null, "Cards": null}}"#;
        let ServerMessage::Snapshot(raw) = decode_server_message(text).unwrap() else {
            panic!("expected snapshot");
        };
        assert!(raw.game.team_red.is_none());
        assert!(raw.game.cards.is_none());
    }

    #[test]
    fn error_document_is_recognised() {
        let msg = decode_server_message(r#"{"error": "could not find game"}"#).unwrap();
        assert_eq!(
            msg,
            ServerMessage::Error {
                reason: "could not find game".into()
            }
        );
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        assert!(decode_server_message("not json").is_err());
        assert!(decode_server_message(r#"{"teamRed": []}"#).is_err());
    }
}
