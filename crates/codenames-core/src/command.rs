// Outbound commands.
//
// Commands stay a closed enum everywhere inside the engine and are turned into
// text only at the transport boundary. There is no sequence number or
// idempotency token on the wire; at most one command of each kind is kept in
// flight by the lock tracker instead.

use std::fmt;

use serde::Deserialize;

use crate::locks::LockKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Resolve a guess against the card with this exact label.
    Guess { card: String },
    /// The guesser voluntarily hands the turn to the other team.
    EndTurn,
    /// Deal a new round in the same session. Owner only, after a win.
    RestartGame,
    /// Leave the lobby and deal the first round. Owner only.
    StartGame,
    /// Ask the server to resend the current game.
    Heartbeat,
}

/// How commands are framed on the socket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireFormat {
    /// Bare text such as `Guess APPLE`.
    #[default]
    Text,
    /// The hub's JSON framing: `{"Action": "Guess APPLE"}`.
    JsonAction,
}

impl Command {
    pub fn kind(&self) -> &'static str {
        match self {
            Command::Guess { .. } => "guess",
            Command::EndTurn => "end turn",
            Command::RestartGame => "restart",
            Command::StartGame => "start",
            Command::Heartbeat => "heartbeat",
        }
    }

    /// The lock taken when this command was authorized, if any.
    pub fn lock_kind(&self) -> Option<LockKind> {
        match self {
            Command::Guess { .. } => Some(LockKind::Guess),
            Command::EndTurn => Some(LockKind::EndTurn),
            Command::RestartGame => Some(LockKind::Restart),
            Command::StartGame => Some(LockKind::Start),
            Command::Heartbeat => None,
        }
    }

    /// Serialize for the socket.
    pub fn encode(&self, format: WireFormat) -> String {
        match format {
            WireFormat::Text => self.to_string(),
            WireFormat::JsonAction => {
                serde_json::json!({ "Action": self.to_string() }).to_string()
            }
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Guess { card } => write!(f, "Guess {card}"),
            Command::EndTurn => f.write_str("EndTurn"),
            Command::RestartGame => f.write_str("RestartGame"),
            Command::StartGame => f.write_str("StartGame"),
            Command::Heartbeat => f.write_str("HeartBeat"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_encoding() {
        let guess = Command::Guess {
            card: "APPLE".into(),
        };
        assert_eq!(guess.encode(WireFormat::Text), "Guess APPLE");
        assert_eq!(Command::EndTurn.encode(WireFormat::Text), "EndTurn");
        assert_eq!(Command::RestartGame.encode(WireFormat::Text), "RestartGame");
        assert_eq!(Command::StartGame.encode(WireFormat::Text), "StartGame");
        assert_eq!(Command::Heartbeat.encode(WireFormat::Text), "HeartBeat");
    }

    #[test]
    fn guess_label_is_sent_verbatim() {
        let guess = Command::Guess {
            card: "ice cream".into(),
        };
        assert_eq!(guess.encode(WireFormat::Text), "Guess ice cream");
    }

    #[test]
    fn json_action_encoding() {
        let encoded = Command::Guess {
            card: "night".into(),
        }
        .encode(WireFormat::JsonAction);
        let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value["Action"], "Guess night");
    }

    #[test]
    fn wire_format_names() {
        #[derive(Deserialize)]
        struct Holder {
            format: WireFormat,
        }
        let h: Holder = serde_json::from_str(r#"{"format": "json_action"}"#).unwrap();
        assert_eq!(h.format, WireFormat::JsonAction);
        let h: Holder = serde_json::from_str(r#"{"format": "text"}"#).unwrap();
        assert_eq!(h.format, WireFormat::Text);
    }
}
