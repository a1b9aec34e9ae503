// Codenames terminal client entry point.
//
// Startup sequence:
// 1. Parse the command line
// 2. Load config
// 3. Initialize tracing (log to file, stdout is the game view)
// 4. Create or join through the session directory if asked to
// 5. Validate the endpoint; an invalid one never opens a socket
// 6. Spawn the connection supervisor and the app loop
// 7. Read commands from stdin on a plain thread
// 8. Print UI updates until the app loop ends

use std::io::BufRead;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use codenames_client::app::{self, AppState, ChannelNotifier, UserCommand};
use codenames_client::config::{self, Config};
use codenames_client::connection::{Supervisor, SupervisorOptions, TungsteniteConnector};
use codenames_client::directory::DirectoryClient;
use codenames_client::render;
use codenames_core::endpoint::{Endpoint, EndpointParams};
use codenames_core::identity::SessionIdentity;
use codenames_core::session::ViewState;
use tokio::sync::mpsc;
use tracing::{error, info};
use url::Url;

#[derive(Debug, Parser)]
#[command(name = "codenames", about = "Play Codenames from the terminal")]
struct Cli {
    /// Websocket base URL, overriding `server.ws_base_url`.
    #[arg(long, env = "CODENAMES_WS_URL", global = true)]
    ws_url: Option<String>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Create a new game and open it.
    Create {
        /// Your player name. Required unless spectating.
        #[arg(long, required_unless_present = "spectate")]
        name: Option<String>,
        /// Create the game for watching only.
        #[arg(long)]
        spectate: bool,
    },
    /// Join an existing game as a player.
    Join { game: String, name: String },
    /// Open a game you already have ids for.
    Play {
        #[arg(long)]
        game: Option<String>,
        #[arg(long)]
        player: Option<String>,
        #[arg(long)]
        spectate: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Parse the command line
    let cli = Cli::parse();

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;

    // 3. Initialize tracing
    init_tracing(&config.logging.filter)?;
    info!("Codenames client starting up");

    // 4. Resolve the game through the directory if needed
    let params = match cli.command {
        Cmd::Create { name, spectate } => {
            let directory = DirectoryClient::new(config.directory_url()?);
            let name = if spectate { None } else { name };
            let created = directory
                .create(name.as_deref())
                .await
                .context("could not create a game")?;
            println!("created game {}", created.id);
            EndpointParams {
                game_id: Some(created.id),
                spectator: created.player_id.is_none(),
                player_id: created.player_id,
            }
        }
        Cmd::Join { game, name } => {
            let directory = DirectoryClient::new(config.directory_url()?);
            let joined = directory
                .join(&game, &name)
                .await
                .context("could not join the game")?;
            EndpointParams {
                game_id: Some(joined.game_id),
                player_id: Some(joined.player_id),
                spectator: false,
            }
        }
        Cmd::Play {
            game,
            player,
            spectate,
        } => EndpointParams {
            game_id: game,
            player_id: player,
            spectator: spectate,
        },
    };

    // 5. Validate the endpoint
    let endpoint = match Endpoint::new(params, SessionIdentity::generate()) {
        Ok(endpoint) => endpoint,
        Err(e) => {
            error!("Invalid game endpoint: {e}");
            let update = app::UiUpdate::View(Box::new(app::ViewUpdate {
                state: ViewState::InvalidInput(e.clone()),
                view: None,
                permissions: Default::default(),
                pending_guess: None,
            }));
            println!("{}", render::render(&update));
            return Err(e.into());
        }
    };

    let base = match &cli.ws_url {
        Some(raw) => Url::parse(raw).with_context(|| format!("invalid --ws-url `{raw}`"))?,
        None => config.ws_base_url()?,
    };
    let url = endpoint.url(&base)?;
    info!(game_id = endpoint.game_id(), spectator = endpoint.is_spectator(), "Opening game");

    // 6. Spawn supervisor and app loop
    let (conn_tx, conn_rx) = mpsc::channel(256);
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (ui_tx, mut ui_rx) = mpsc::channel(256);

    let supervisor = Supervisor::new(
        url,
        Arc::new(TungsteniteConnector),
        supervisor_options(&config),
        conn_tx,
    );
    let (emitter, supervisor_handle) = supervisor.spawn();

    let notifier = Arc::new(ChannelNotifier::new(ui_tx.clone()));
    let state = AppState::new(emitter, notifier);
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(conn_rx, cmd_rx, ui_tx, state).await {
            error!("Application loop error: {}", e);
        }
    });

    // 7. Read stdin on a plain thread; a blocked read must not hold up
    // runtime shutdown.
    std::thread::spawn(move || read_commands(cmd_tx));

    // 8. Print updates until the app loop drops its senders
    while let Some(update) = ui_rx.recv().await {
        println!("{}", render::render(&update));
    }

    let _ = app_handle.await;
    let _ = tokio::time::timeout(std::time::Duration::from_secs(2), supervisor_handle).await;

    info!("Codenames client shut down cleanly");
    Ok(())
}

fn supervisor_options(config: &Config) -> SupervisorOptions {
    SupervisorOptions {
        reconnect_interval: config.reconnect_interval(),
        connect_timeout: config.connect_timeout(),
        heartbeat: config.heartbeat_interval(),
        wire_format: config.connection.wire_format,
    }
}

fn read_commands(cmd_tx: mpsc::Sender<UserCommand>) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else {
            break;
        };
        match line.parse::<UserCommand>() {
            Ok(cmd) => {
                let quit = cmd == UserCommand::Quit;
                if cmd_tx.blocking_send(cmd).is_err() || quit {
                    return;
                }
            }
            Err(app::ParseCommandError::Empty) => {}
            Err(e) => println!("! {e}"),
        }
    }
}

/// Initialize tracing to log to a file (stdout is used for the game view).
fn init_tracing(default_filter: &str) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("codenames.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
