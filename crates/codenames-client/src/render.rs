// Plain-text rendering of UI updates for the terminal.

use codenames_core::authz::Permissions;
use codenames_core::session::ViewState;
use codenames_core::view::{Card, CardOwner, GameView, Team};

use crate::app::{UiUpdate, ViewUpdate};

const COLUMNS: usize = 5;

pub fn render(update: &UiUpdate) -> String {
    match update {
        UiUpdate::View(view) => render_view(view),
        UiUpdate::Toast { level, message } => format!("[{level}] {message}"),
        UiUpdate::Rejected(reason) => format!("! {reason}"),
        UiUpdate::ServerError(reason) => format!("server error: {reason}"),
        UiUpdate::NotSent(command) => format!("! `{command}` was not sent, try again"),
        UiUpdate::ConnectFailed(reason) => format!("could not reach the game: {reason}"),
    }
}

pub fn render_view(update: &ViewUpdate) -> String {
    match (&update.state, &update.view) {
        (ViewState::InvalidInput(e), _) => format!("cannot open game: {e}"),
        (ViewState::Loading, _) => "loading...".to_string(),
        (ViewState::UnknownPhase { status, snapshot }, _) => {
            format!("unsupported game phase `{status}`\n{snapshot}")
        }
        (ViewState::Malformed { reason, snapshot }, _) => {
            format!("unknown game state ({reason})\n{snapshot}")
        }
        (ViewState::Lobby, Some(view)) => render_lobby(view, &update.permissions),
        (ViewState::Board, Some(view)) => render_board(view, update),
        (ViewState::GameOver { winner }, Some(view)) => {
            let mut out = render_board(view, update);
            out.push_str(&format!("\n{} team wins.", team_name(*winner)));
            if update.permissions.can_restart {
                out.push_str(" Type `restart` to play again.");
            }
            out
        }
        (_, None) => "loading...".to_string(),
    }
}

fn render_lobby(view: &GameView, permissions: &Permissions) -> String {
    let mut out = String::from("Waiting for the game to start.\n");
    for team in [Team::Red, Team::Blue] {
        out.push_str(&format!(
            "{}: {}\n",
            team_name(team),
            view.members(team).join(", ")
        ));
    }
    if permissions.can_start {
        out.push_str("Type `start` when everyone is in.");
    }
    out.trim_end().to_string()
}

fn render_board(view: &GameView, update: &ViewUpdate) -> String {
    let perms = &update.permissions;
    let mut out = String::new();

    if let Some(turn) = view.whose_turn.filter(|_| !view.status.is_over()) {
        let whose = if perms.my_turn { " (yours)" } else { "" };
        out.push_str(&format!("{} team's turn{whose}", team_name(turn)));
        if let Some(clue) = &view.clue {
            out.push_str(&format!(" - clue: {} for {}", clue.word.to_uppercase(), clue.count));
        }
        out.push('\n');
    }

    let cards = view.cards_by_index();
    for row in cards.chunks(COLUMNS) {
        let cells: Vec<String> = row
            .iter()
            .map(|(label, card)| {
                let pending = update.pending_guess.as_deref() == Some(*label);
                cell(label, card, pending)
            })
            .collect();
        out.push_str(&cells.join("  "));
        out.push('\n');
    }

    if perms.can_end_turn {
        out.push_str("Type `guess <card>` or `end`.");
    }
    out.trim_end().to_string()
}

fn cell(label: &str, card: &Card, pending: bool) -> String {
    let mark = match (card.guessed, card.belongs_to) {
        _ if pending => "?",
        (_, Some(CardOwner::Red)) => "R",
        (_, Some(CardOwner::Blue)) => "B",
        (_, Some(CardOwner::Neutral)) => "-",
        (_, Some(CardOwner::Assassin)) => "X",
        (_, None) => " ",
    };
    if card.guessed {
        format!("[{mark}]{}", label.to_lowercase())
    } else {
        format!("[{mark}]{label}")
    }
}

fn team_name(team: Team) -> &'static str {
    match team {
        Team::Red => "Red",
        Team::Blue => "Blue",
    }
}
