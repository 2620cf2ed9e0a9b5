//! Glasspane CLI
//!
//! Command-line interface for controlling the Glasspane daemon.
//!
//! Commands are sent to the daemon as one line of JSON over a local TCP
//! socket; the daemon answers with one line.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use glasspane_core_layout::{Direction, Edge, Rect};
use glasspane_engine::WindowKind;
use glasspane_ipc::{
    decode_line, encode_line, IpcCommand, IpcResponse, DEFAULT_ADDR, MAX_IPC_MESSAGE_SIZE,
};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// Longest we wait for an answer. Animated commands answer when they finish.
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "glasspane-cli")]
#[command(author, version, about = "Control the Glasspane window group")]
struct Cli {
    /// Daemon address
    #[arg(long, global = true, default_value = DEFAULT_ADDR)]
    addr: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Move the header one step
    Move {
        #[command(subcommand)]
        direction: Side,
    },
    /// Snap the header to a screen edge
    Edge {
        #[command(subcommand)]
        direction: Side,
    },
    /// Move the header to another display
    Display {
        /// Display id (see `query displays`)
        id: u64,
    },
    /// Slide the header off-screen past an edge
    Hide {
        #[command(subcommand)]
        edge: Side,
    },
    /// Bring the header back from its hidden position
    Show,
    /// Hide or show the whole window group
    Toggle,
    /// Recompute companion placement
    Layout,
    /// Show or hide a companion window
    Companion {
        #[command(subcommand)]
        action: CompanionAction,
    },
    /// Open or close the auxiliary panel
    Aux {
        #[command(subcommand)]
        action: AuxAction,
    },
    /// Resize the header around its center
    Resize { width: i32, height: i32 },
    /// Place the header at a screen position
    Place {
        #[arg(allow_hyphen_values = true)]
        x: i32,
        #[arg(allow_hyphen_values = true)]
        y: i32,
    },
    /// Run whatever a keyboard chord is bound to, e.g. "ctrl+shift+left"
    Key { chord: String },
    /// Query daemon state
    Query {
        #[command(subcommand)]
        what: QueryType,
    },
    /// Reload configuration
    Reload,
    /// Stop the daemon
    Stop,
}

#[derive(Subcommand, Clone, Copy)]
enum Side {
    Left,
    Right,
    Up,
    Down,
}

impl Side {
    fn direction(self) -> Direction {
        match self {
            Side::Left => Direction::Left,
            Side::Right => Direction::Right,
            Side::Up => Direction::Up,
            Side::Down => Direction::Down,
        }
    }

    fn edge(self) -> Edge {
        match self {
            Side::Left => Edge::Left,
            Side::Right => Edge::Right,
            Side::Up => Edge::Top,
            Side::Down => Edge::Bottom,
        }
    }
}

#[derive(ValueEnum, Clone, Copy)]
enum CompanionName {
    A,
    B,
}

impl From<CompanionName> for WindowKind {
    fn from(name: CompanionName) -> Self {
        match name {
            CompanionName::A => WindowKind::CompanionA,
            CompanionName::B => WindowKind::CompanionB,
        }
    }
}

#[derive(Subcommand)]
enum CompanionAction {
    Show { which: CompanionName },
    Hide { which: CompanionName },
}

#[derive(Subcommand)]
enum AuxAction {
    /// Open under a trigger rectangle, relative to the header
    Show {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },
    /// Close after the grace period
    Hide,
}

#[derive(Subcommand)]
enum QueryType {
    /// Window bounds, strategy and toggle state
    Layout,
    /// Connected displays
    Displays,
}

impl Commands {
    fn into_ipc(self) -> IpcCommand {
        match self {
            Commands::Move { direction } => IpcCommand::MoveStep {
                direction: direction.direction(),
            },
            Commands::Edge { direction } => IpcCommand::MoveToEdge {
                direction: direction.direction(),
            },
            Commands::Display { id } => IpcCommand::MoveToDisplay { display_id: id },
            Commands::Hide { edge } => IpcCommand::HideToEdge { edge: edge.edge() },
            Commands::Show => IpcCommand::ShowFromEdge,
            Commands::Toggle => IpcCommand::ToggleVisibility,
            Commands::Layout => IpcCommand::UpdateLayout,
            Commands::Companion { action } => match action {
                CompanionAction::Show { which } => IpcCommand::ShowCompanion {
                    window: which.into(),
                },
                CompanionAction::Hide { which } => IpcCommand::HideCompanion {
                    window: which.into(),
                },
            },
            Commands::Aux { action } => match action {
                AuxAction::Show {
                    x,
                    y,
                    width,
                    height,
                } => IpcCommand::ShowAuxiliary {
                    trigger: Rect::new(x, y, width, height),
                },
                AuxAction::Hide => IpcCommand::HideAuxiliary,
            },
            Commands::Resize { width, height } => IpcCommand::ResizeHeader { width, height },
            Commands::Place { x, y } => IpcCommand::MoveHeaderTo { x, y },
            Commands::Key { chord } => IpcCommand::Shortcut { chord },
            Commands::Query { what } => match what {
                QueryType::Layout => IpcCommand::QueryLayout,
                QueryType::Displays => IpcCommand::QueryDisplays,
            },
            Commands::Reload => IpcCommand::Reload,
            Commands::Stop => IpcCommand::Stop,
        }
    }
}

/// Send one command and wait for the daemon's answer.
async fn send_command(addr: &str, cmd: &IpcCommand) -> Result<IpcResponse> {
    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("Failed to connect to daemon at {}. Is glasspane running?", addr))?;
    let (reader, mut writer) = stream.into_split();

    writer.write_all(encode_line(cmd)?.as_bytes()).await?;

    let mut reader = BufReader::new(reader.take(MAX_IPC_MESSAGE_SIZE as u64));
    let mut line = String::new();
    let bytes_read = tokio::time::timeout(RESPONSE_TIMEOUT, reader.read_line(&mut line))
        .await
        .context("Timed out waiting for daemon response")??;
    if bytes_read == 0 {
        bail!("Daemon closed the connection without responding");
    }

    Ok(decode_line(&line)?)
}

/// Human-readable form of a response.
fn render(response: &IpcResponse) -> Result<String> {
    Ok(match response {
        IpcResponse::Ok => "ok".to_string(),
        IpcResponse::Queued => "queued".to_string(),
        IpcResponse::Ignored { reason } => format!("ignored: {}", reason),
        IpcResponse::Error { message } => format!("error: {}", message),
        IpcResponse::Layout { snapshot } => serde_json::to_string_pretty(snapshot)?,
        IpcResponse::Displays { displays } => serde_json::to_string_pretty(displays)?,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cmd = cli.command.into_ipc();

    let response = send_command(&cli.addr, &cmd).await?;
    let text = render(&response)?;

    if response.is_error() {
        eprintln!("{}", text);
        std::process::exit(1);
    }
    println!("{}", text);
    Ok(())
}
