// Connection endpoint selection.
//
// Participants connect to `/ws` with game id, player id and session id;
// spectators connect to the read-only `/ws/spectate` with game id and session
// id only. A missing or malformed game id is a precondition failure: the
// caller gets an error synchronously and no socket is ever opened.

use thiserror::Error;
use url::Url;

use crate::identity::SessionIdentity;

/// Longest id the session directory hands out or accepts.
pub const MAX_ID_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointError {
    #[error("no game id was given")]
    MissingGameId,

    #[error("game id `{0}` is malformed")]
    MalformedGameId(String),

    #[error("a player id is required unless spectating")]
    MissingPlayerId,

    #[error("player id `{0}` is malformed")]
    MalformedPlayerId(String),

    #[error("websocket base url `{0}` cannot carry a path")]
    BadBaseUrl(String),
}

/// What the caller asked for, before validation.
#[derive(Debug, Clone, Default)]
pub struct EndpointParams {
    pub game_id: Option<String>,
    pub player_id: Option<String>,
    pub spectator: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Participant {
        game_id: String,
        player_id: String,
        session: SessionIdentity,
    },
    Spectator {
        game_id: String,
        session: SessionIdentity,
    },
}

impl Endpoint {
    /// Validate `params`. A spectator flag wins over a player id, matching the
    /// read-only endpoint carrying no player identity.
    pub fn new(params: EndpointParams, session: SessionIdentity) -> Result<Self, EndpointError> {
        let game_id = match params.game_id.as_deref().map(str::trim) {
            None | Some("") => return Err(EndpointError::MissingGameId),
            Some(id) if !is_valid_id(id) => {
                return Err(EndpointError::MalformedGameId(id.to_string()))
            }
            Some(id) => id.to_string(),
        };

        if params.spectator {
            return Ok(Endpoint::Spectator { game_id, session });
        }

        let player_id = match params.player_id.as_deref().map(str::trim) {
            None | Some("") => return Err(EndpointError::MissingPlayerId),
            Some(id) if !is_valid_player_id(id) => {
                return Err(EndpointError::MalformedPlayerId(id.to_string()))
            }
            Some(id) => id.to_string(),
        };

        Ok(Endpoint::Participant {
            game_id,
            player_id,
            session,
        })
    }

    pub fn game_id(&self) -> &str {
        match self {
            Endpoint::Participant { game_id, .. } | Endpoint::Spectator { game_id, .. } => game_id,
        }
    }

    pub fn session(&self) -> &SessionIdentity {
        match self {
            Endpoint::Participant { session, .. } | Endpoint::Spectator { session, .. } => session,
        }
    }

    pub fn is_spectator(&self) -> bool {
        matches!(self, Endpoint::Spectator { .. })
    }

    /// Build the websocket URL under `base` (e.g. `ws://localhost:8080`).
    pub fn url(&self, base: &Url) -> Result<Url, EndpointError> {
        let mut url = base.clone();
        url.set_query(None);
        url.set_fragment(None);
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| EndpointError::BadBaseUrl(base.to_string()))?;
            segments.pop_if_empty().push("ws");
            if self.is_spectator() {
                segments.push("spectate");
            }
        }
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("gameID", self.game_id());
            if let Endpoint::Participant { player_id, .. } = self {
                query.append_pair("playerID", player_id);
            }
            query.append_pair("sessionID", self.session().as_str());
        }
        Ok(url)
    }
}

fn is_valid_id(id: &str) -> bool {
    id.len() <= MAX_ID_LEN && id.chars().all(|c| c.is_ascii_alphanumeric())
}

// Player ids are issued by the directory and may be longer tokens.
fn is_valid_player_id(id: &str) -> bool {
    id.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
