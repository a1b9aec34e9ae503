// Session directory client: creates and joins games over HTTP.
//
// The directory hands out the game id and, for players, the player id that the
// websocket endpoint later needs. Anything that goes wrong here is reported as
// a `DirectoryError`, separate from in-game errors.

use codenames_core::endpoint::MAX_ID_LEN;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("{field} must not be empty")]
    EmptyInput { field: &'static str },

    #[error("bad directory url: {0}")]
    BadUrl(#[from] url::ParseError),

    #[error("directory request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("directory answered with status {0}")]
    Status(u16),

    #[error("directory refused to add the player to game {game_id}")]
    Rejected { game_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedGame {
    pub id: String,
    /// Absent when the game was created for spectating only.
    #[serde(default, rename = "playerID")]
    pub player_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct JoinResponse {
    #[serde(default)]
    success: bool,
    #[serde(default, rename = "playerID")]
    player_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedGame {
    pub game_id: String,
    pub player_id: String,
}

/// Player names lose all whitespace and are cut to the id length.
pub fn normalize_player_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .take(MAX_ID_LEN)
        .collect()
}

/// Game ids are typed by hand, so they are also upper-cased.
pub fn normalize_game_id(raw: &str) -> String {
    normalize_player_name(raw).to_uppercase()
}

pub struct DirectoryClient {
    http: reqwest::Client,
    base: Url,
}

impl DirectoryClient {
    pub fn new(base: Url) -> Self {
        DirectoryClient {
            http: reqwest::Client::new(),
            base,
        }
    }

    /// Create a game. With a player name the creator joins as a player;
    /// without one the game is created for spectating.
    pub async fn create(&self, player_name: Option<&str>) -> Result<CreatedGame, DirectoryError> {
        let mut url = self.base.join("game/create")?;
        if let Some(name) = player_name {
            let name = normalize_player_name(name);
            if name.is_empty() {
                return Err(DirectoryError::EmptyInput {
                    field: "player name",
                });
            }
            url.query_pairs_mut().append_pair("playerName", &name);
        }

        debug!(%url, "creating game");
        let response = self.http.post(url).send().await?;
        if !response.status().is_success() {
            return Err(DirectoryError::Status(response.status().as_u16()));
        }
        let created: CreatedGame = response.json().await?;
        info!(game_id = %created.id, "game created");
        Ok(created)
    }

    pub async fn join(&self, game_id: &str, player_name: &str) -> Result<JoinedGame, DirectoryError> {
        let game_id = normalize_game_id(game_id);
        if game_id.is_empty() {
            return Err(DirectoryError::EmptyInput { field: "game id" });
        }
        let name = normalize_player_name(player_name);
        if name.is_empty() {
            return Err(DirectoryError::EmptyInput {
                field: "player name",
            });
        }

        let mut url = self.base.join("game/join")?;
        url.query_pairs_mut()
            .append_pair("gameID", &game_id)
            .append_pair("playerName", &name);

        debug!(%url, "joining game");
        let response = self.http.post(url).send().await?;
        if !response.status().is_success() {
            return Err(DirectoryError::Status(response.status().as_u16()));
        }
        let joined: JoinResponse = response.json().await?;
        match joined {
            JoinResponse {
                success: true,
                player_id: Some(player_id),
            } if !player_id.is_empty() => {
                info!(%game_id, "joined game");
                Ok(JoinedGame { game_id, player_id })
            }
            _ => Err(DirectoryError::Rejected { game_id }),
        }
    }
}
