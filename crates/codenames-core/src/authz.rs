// Authorization engine.
//
// A pure function of (snapshot, local player name) to the set of actions the
// local player may take right now. It is recomputed after every accepted
// snapshot. These checks only keep the client from sending commands the
// server would refuse; the server stays the sole arbiter.

use crate::view::{Card, GameStatus, GameView, Team};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Spy,
    Guesser,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Permissions {
    /// The team the local player is a member of, if any.
    pub my_team: Option<Team>,
    /// The local player's role on `my_team`.
    pub role: Option<Role>,
    pub my_turn: bool,
    pub can_end_turn: bool,
    pub can_restart: bool,
    pub can_start: bool,
    running: bool,
}

impl Permissions {
    pub fn derive(view: &GameView, local: Option<&str>) -> Self {
        let running = view.status == GameStatus::Running;
        let Some(name) = local else {
            return Permissions {
                running,
                ..Permissions::default()
            };
        };

        let my_team = view.team_of(name);
        let role = my_team.and_then(|team| role_on(view, name, team));
        let my_turn = is_my_turn(view, name);
        let guesser = role == Some(Role::Guesser);

        Permissions {
            my_team,
            role,
            my_turn,
            can_end_turn: my_turn && guesser,
            can_restart: view.you_own_game && view.status.is_over(),
            can_start: view.you_own_game && view.status == GameStatus::Pending,
            running,
        }
    }

    pub fn is_participant(&self) -> bool {
        self.my_team.is_some()
    }

    pub fn is_guesser(&self) -> bool {
        self.role == Some(Role::Guesser)
    }

    pub fn is_spy(&self) -> bool {
        self.role == Some(Role::Spy)
    }

    pub fn can_guess(&self, card: &Card) -> bool {
        self.running && self.my_turn && self.is_guesser() && !card.guessed
    }
}

/// Whether `name` is on the team whose turn it is in a running game.
pub fn is_my_turn(view: &GameView, name: &str) -> bool {
    if view.status != GameStatus::Running {
        return false;
    }
    match view.whose_turn {
        Some(turn) => view.members(turn).iter().any(|m| m == name),
        None => false,
    }
}

pub fn is_guesser(view: &GameView, name: &str, team: Team) -> bool {
    view.guesser(team) == Some(name)
}

pub fn is_spy(view: &GameView, name: &str, team: Team) -> bool {
    view.spy(team) == Some(name)
}

fn role_on(view: &GameView, name: &str, team: Team) -> Option<Role> {
    if is_guesser(view, name, team) {
        Some(Role::Guesser)
    } else if is_spy(view, name, team) {
        Some(Role::Spy)
    } else {
        None
    }
}
