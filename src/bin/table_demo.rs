use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{fmt::time::Uptime, EnvFilter};
use url::Url;

use bjack_client::domain::{Card, Phase, TableId, TableState};
use bjack_client::store::JsonFileSessionStore;
use bjack_client::sync::{SessionError, TableSession};
use bjack_client::{BlackjackClient, ClientConfig};

const LOG_TARGET: &str = "bin::table_demo";
const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
const COMMANDS: &str = "commands: ready | hit | stand | state | leave | quit";

#[derive(Debug, Parser)]
#[command(name = "table_demo")]
#[command(about = "Host, join, or resume a blackjack table from the terminal", long_about = None)]
struct Args {
    /// Base REST endpoint of the table service
    #[arg(long, env = "BJACK_API_URL", default_value = DEFAULT_API_URL)]
    api_url: Url,

    /// Push endpoint override; derived from --api-url when omitted
    #[arg(long, env = "BJACK_WS_URL")]
    ws_url: Option<Url>,

    /// Display name to take a seat with
    #[arg(long, required_unless_present = "resume")]
    name: Option<String>,

    /// Table id to join; a new table is created when omitted
    #[arg(long)]
    table: Option<String>,

    /// Resume the session persisted in the session file
    #[arg(long)]
    resume: bool,

    /// Where the resumable session is kept
    #[arg(long, default_value = ".bjack-session.json")]
    session_file: PathBuf,

    /// Toggle structured (JSON) tracing output
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_tracing(args.json)?;
    run(args).await
}

async fn run(args: Args) -> Result<()> {
    let mut config = ClientConfig::new(args.api_url.clone())?;
    if let Some(ws_url) = args.ws_url.clone() {
        config = config.with_ws_url(ws_url);
    }
    info!(
        target: LOG_TARGET,
        api_url = %config.api_url,
        ws_url = %config.ws_url,
        "resolved service endpoints"
    );

    let store = Arc::new(
        JsonFileSessionStore::open(&args.session_file)
            .await
            .with_context(|| {
                format!(
                    "failed to open session file {}",
                    args.session_file.display()
                )
            })?,
    );
    let client = BlackjackClient::new(config, store)?;

    let session = if args.resume {
        client
            .resume()
            .await?
            .ok_or_else(|| anyhow!("nothing to resume in {}", args.session_file.display()))?
    } else {
        let name = args.name.as_deref().unwrap_or_default();
        match &args.table {
            Some(raw) => {
                client
                    .join_table(TableId::new(raw.clone())?, name)
                    .await?
            }
            None => client.host_table(name).await?,
        }
    };

    println!();
    println!(
        "seated at table {} as {} (player id {})",
        session.table_id(),
        session.player_name(),
        session.player_id()
    );
    println!("{COMMANDS}");
    println!("quit keeps the seat; rerun with --resume to pick it up again");

    interact(session).await
}

enum Exit {
    Leave,
    Quit,
}

async fn interact(session: TableSession) -> Result<()> {
    let mut state_rx = session.state();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let exit = loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                println!();
                break Exit::Quit;
            }
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break Exit::Quit;
                }
                render(&state_rx.borrow_and_update(), session.player_name());
            }
            line = lines.next_line() => {
                match line.context("failed to read stdin")? {
                    None => break Exit::Quit,
                    Some(line) => {
                        if let Some(exit) = handle_command(&session, line.trim()).await {
                            break exit;
                        }
                    }
                }
            }
        }
    };

    match exit {
        Exit::Leave => {
            match session.leave().await {
                Ok(()) => println!("left the table"),
                Err(SessionError::Api(err)) if err.is_not_found() => {
                    println!("the table is already gone; nothing to leave")
                }
                // The session is already torn down; the seat may linger
                // server-side, but there is nothing more to do locally.
                Err(err) => println!("leave failed: {err}"),
            }
        }
        Exit::Quit => {
            session.shutdown().await;
            println!("session kept; rerun with --resume to pick it up again");
        }
    }
    Ok(())
}

async fn handle_command(session: &TableSession, command: &str) -> Option<Exit> {
    match command {
        "" => {}
        "ready" => report(session.toggle_ready().await, "ready toggle"),
        "hit" => report(session.hit().await, "hit"),
        "stand" => report(session.stand().await, "stand"),
        "state" => render(&session.current_state(), session.player_name()),
        "leave" => return Some(Exit::Leave),
        "quit" | "exit" => return Some(Exit::Quit),
        "help" => println!("{COMMANDS}"),
        other => println!("unknown command {other:?}; try help"),
    }
    None
}

fn report(result: Result<(), SessionError>, action: &str) {
    match result {
        Ok(()) => println!("{action} sent"),
        Err(err) => println!("{action} failed: {err}"),
    }
}

fn render(state: &TableState, player_name: &str) {
    println!();
    println!("=== {} ===", state.phase);
    if let Some(dealer) = state.dealer_hand() {
        println!("  dealer: {}", format_hand(dealer));
    }
    if let Some(turn) = state.turn_player() {
        println!("  waiting on {}", turn.name);
    }
    if state.players.is_empty() {
        println!("  (no players seated yet)");
        return;
    }
    for (seat, player) in state.players.iter().enumerate() {
        let marker = if state.phase == Phase::CardsDealt && state.current_player == seat + 1 {
            ">"
        } else {
            " "
        };
        let you = if player.name == player_name {
            " (you)"
        } else {
            ""
        };
        let ready = if player.is_ready { "ready" } else { "waiting" };
        let hand = state
            .player_hand(seat)
            .map(format_hand)
            .unwrap_or_else(|| "--".to_owned());
        print!(
            "{marker} {}{you} [{ready}] chips {} bet {}: {hand}",
            player.name, player.chips, player.bet
        );
        if state.phase == Phase::Finished {
            print!("  ({})", player.outcome);
        }
        println!();
    }
}

fn format_hand(hand: &[Card]) -> String {
    if hand.is_empty() {
        return "--".to_owned();
    }
    hand.iter()
        .map(|card| card.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("bin=info,client=info,sync=info,api=info,store=info"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_timer(Uptime::default())
            .with_ansi(false)
            .json()
            .try_init()
            .map_err(|err| anyhow!("failed to initialize tracing subscriber: {err}"))?;
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_timer(Uptime::default())
            .try_init()
            .map_err(|err| anyhow!("failed to initialize tracing subscriber: {err}"))?;
    }
    Ok(())
}
