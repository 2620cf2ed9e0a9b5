//! Glasspane Daemon
//!
//! Main daemon process for the Glasspane window group.
//!
//! Responsibilities:
//! - Own the engine and the host it drives
//! - Handle IPC commands from the CLI
//! - Translate keyboard chords into commands
//! - Fire scheduled engine work (animation frames, debounced layout passes,
//!   settle delays) at its deadline

mod config;
mod keymap;

use anyhow::Result;
use config::{BoundCommand, Config};
use glasspane_core_layout::{DisplayResolver, Rect};
use glasspane_engine::memory::MemoryHost;
use glasspane_engine::{
    AnimationHandle, DisplaySource, Engine, EngineError, MotionError, MotionResult,
    ToggleDecision, WindowKind,
};
use glasspane_ipc::{decode_line, encode_line, IpcCommand, IpcResponse, MAX_IPC_MESSAGE_SIZE};
use keymap::Keymap;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, trace, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Events that the daemon event loop processes.
enum DaemonEvent {
    /// An IPC command from a CLI client.
    IpcCommand {
        cmd: IpcCommand,
        responder: oneshot::Sender<IpcResponse>,
    },
    /// Shutdown signal.
    Shutdown,
}

/// IPC read timeout - clients must send within this period.
const IPC_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Sent when even an error response fails to serialize.
const FALLBACK_RESPONSE: &str = "{\"status\":\"error\",\"message\":\"Internal serialization error\"}\n";

/// Outcome of [`AppState::handle_command`].
enum Reply {
    /// Respond right away.
    Now(IpcResponse),
    /// Respond once the animation ends.
    After(AnimationHandle),
}

/// Application state: the engine, its host and the active keymap.
struct AppState {
    engine: Engine<MemoryHost>,
    config: Config,
    keymap: Keymap,
}

impl AppState {
    /// Create new state with config. The header starts centred at the top of
    /// the primary display with every other window hidden.
    fn new_with_config(config: Config, now: Instant) -> Self {
        let host = build_host(&config);
        let mut engine = Engine::new(host, config.engine_settings());
        engine.update_layout(now);
        let keymap = Keymap::from_config(&config.hotkeys);

        Self {
            engine,
            config,
            keymap,
        }
    }

    /// Apply reloaded configuration.
    ///
    /// Window sizes are only read at startup; everything else takes effect
    /// immediately, including display changes.
    fn apply_config(&mut self, config: Config, now: Instant) {
        if config.behavior.log_level != self.config.behavior.log_level
            || config.behavior.ipc_addr != self.config.behavior.ipc_addr
        {
            warn!("log_level and ipc_addr changes take effect after a restart");
        }
        self.engine.apply_settings(config.engine_settings());

        let old = self.engine.host().displays();
        let new = config.display_list();
        self.engine.host_mut().set_displays(new.clone());

        for disp in &old {
            match new.iter().find(|d| d.id == disp.id) {
                None => {
                    info!("Display {} removed", disp.id);
                    self.engine.on_display_removed(disp.id, now);
                }
                Some(updated) if updated != disp => {
                    info!("Display {} changed", disp.id);
                    self.engine.on_display_metrics_changed(disp.id, now);
                }
                Some(_) => {}
            }
        }
        for disp in new.iter().filter(|d| !old.iter().any(|o| o.id == d.id)) {
            info!("Display {} added", disp.id);
            self.engine.on_display_added(disp.id, now);
        }

        self.keymap = Keymap::from_config(&config.hotkeys);
        self.config = config;
    }

    /// Process an IPC command.
    fn handle_command(&mut self, cmd: IpcCommand, now: Instant) -> Reply {
        match cmd {
            IpcCommand::MoveStep { direction } => {
                debug!("Move step {:?}", direction);
                motion_reply(self.engine.move_step(direction, now))
            }
            IpcCommand::MoveToEdge { direction } => {
                debug!("Move to edge {:?}", direction);
                motion_reply(self.engine.move_to_edge(direction, now))
            }
            IpcCommand::MoveToDisplay { display_id } => {
                debug!("Move to display {}", display_id);
                motion_reply(self.engine.move_to_display(display_id, now))
            }
            IpcCommand::HideToEdge { edge } => match self.engine.hide_to_edge(edge, now) {
                Ok(handle) => Reply::After(handle),
                Err(e) => Reply::Now(IpcResponse::error(e.to_string())),
            },
            IpcCommand::ShowFromEdge => match self.engine.show_from_edge(now) {
                Ok(handle) => Reply::After(handle),
                Err(e) => Reply::Now(IpcResponse::error(e.to_string())),
            },
            IpcCommand::ToggleVisibility => {
                let response = match self.engine.toggle_visibility(now) {
                    ToggleDecision::Started { cycle } => {
                        info!("Visibility toggle started (cycle {})", cycle);
                        IpcResponse::Ok
                    }
                    ToggleDecision::Debounced => IpcResponse::ignored("toggle debounced"),
                    ToggleDecision::Queued => IpcResponse::Queued,
                };
                Reply::Now(response)
            }
            IpcCommand::UpdateLayout => {
                self.engine.update_layout(now);
                Reply::Now(IpcResponse::Ok)
            }
            IpcCommand::ShowCompanion { window } => {
                Reply::Now(engine_response(self.engine.show_companion(window, now)))
            }
            IpcCommand::HideCompanion { window } => {
                Reply::Now(engine_response(self.engine.hide_companion(window, now)))
            }
            IpcCommand::ShowAuxiliary { trigger } => {
                Reply::Now(engine_response(self.engine.show_auxiliary(trigger)))
            }
            IpcCommand::HideAuxiliary => {
                self.engine.hide_auxiliary(now);
                Reply::Now(IpcResponse::Ok)
            }
            IpcCommand::ResizeHeader { width, height } => {
                Reply::Now(engine_response(self.engine.resize_header(width, height, now)))
            }
            IpcCommand::MoveHeaderTo { x, y } => {
                Reply::Now(engine_response(self.engine.move_header_to(x, y, now)))
            }
            IpcCommand::Shortcut { chord } => self.handle_shortcut(&chord, now),
            IpcCommand::QueryLayout => Reply::Now(IpcResponse::Layout {
                snapshot: self.engine.snapshot(),
            }),
            IpcCommand::QueryDisplays => Reply::Now(IpcResponse::Displays {
                displays: self.engine.host().displays(),
            }),
            IpcCommand::Reload => {
                let response = match Config::load() {
                    Ok(mut new_config) => {
                        for w in new_config.validate() {
                            warn!("Config: {} - {}", w.field, w.message);
                        }
                        self.apply_config(new_config, now);
                        info!("Configuration reloaded");
                        IpcResponse::Ok
                    }
                    Err(e) => IpcResponse::error(format!("Failed to reload config: {}", e)),
                };
                Reply::Now(response)
            }
            IpcCommand::Stop => {
                // This is handled specially in the client handler
                Reply::Now(IpcResponse::Ok)
            }
        }
    }

    fn handle_shortcut(&mut self, chord: &str, now: Instant) -> Reply {
        let Some(bound) = self.keymap.lookup(chord).cloned() else {
            return Reply::Now(IpcResponse::error(format!("No hotkey bound to '{}'", chord)));
        };
        debug!("Hotkey {} -> {:?}", chord, bound);

        match bound {
            BoundCommand::Ipc(cmd) => self.handle_command(cmd, now),
            BoundCommand::Display(n) => {
                let displays = self.engine.host().displays();
                match n.checked_sub(1).and_then(|i| displays.get(i)) {
                    Some(display) => motion_reply(self.engine.move_to_display(display.id, now)),
                    None => Reply::Now(IpcResponse::ignored(format!("no display {}", n))),
                }
            }
        }
    }
}

/// An in-memory host holding the configured displays and windows.
fn build_host(config: &Config) -> MemoryHost {
    let displays = config.display_list();
    let work_area = DisplayResolver::new(displays.clone())
        .unwrap_or_else(|_| DisplayResolver::fallback())
        .primary()
        .work_area;

    let windows = &config.windows;
    let header_x = work_area.x + (work_area.width - windows.header.width) / 2;
    let hidden_at = |width: i32, height: i32| Rect::new(header_x, work_area.y, width, height);

    let mut host = MemoryHost::new(displays).recording(false);
    host.add_window(
        WindowKind::Header,
        hidden_at(windows.header.width, windows.header.height),
        true,
    );
    host.add_window(
        WindowKind::CompanionA,
        hidden_at(windows.companion_a.width, windows.companion_a.height),
        false,
    );
    host.add_window(
        WindowKind::CompanionB,
        hidden_at(windows.companion_b.width, windows.companion_b.height),
        false,
    );
    host.add_window(
        WindowKind::Auxiliary,
        hidden_at(windows.auxiliary.width, windows.auxiliary.height),
        false,
    );
    host
}

fn motion_reply(result: Result<Option<AnimationHandle>, MotionError>) -> Reply {
    match result {
        Ok(Some(handle)) => Reply::After(handle),
        Ok(None) => Reply::Now(IpcResponse::ignored("nothing to do")),
        Err(e) => Reply::Now(IpcResponse::error(e.to_string())),
    }
}

fn motion_response(result: MotionResult) -> IpcResponse {
    match result {
        Ok(()) => IpcResponse::Ok,
        Err(MotionError::Cancelled) => IpcResponse::ignored("superseded by another movement"),
        Err(e) => IpcResponse::error(e.to_string()),
    }
}

fn engine_response(result: Result<(), EngineError>) -> IpcResponse {
    match result {
        Ok(()) => IpcResponse::Ok,
        Err(e) => IpcResponse::error(e.to_string()),
    }
}

/// Send a response now, or once its animation has finished.
fn dispatch_reply(reply: Reply, responder: oneshot::Sender<IpcResponse>) {
    match reply {
        Reply::Now(response) => {
            if responder.send(response).is_err() {
                debug!("Client disconnected before receiving IPC response");
            }
        }
        Reply::After(handle) => {
            tokio::spawn(async move {
                let response = motion_response(handle.finished().await);
                if responder.send(response).is_err() {
                    debug!("Client disconnected before animation finished");
                }
            });
        }
    }
}

/// Sleep until the engine's next deadline, or forever if nothing is scheduled.
async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
        None => std::future::pending().await,
    }
}

/// Run the IPC server, accepting connections and dispatching commands.
async fn run_ipc_server(listener: TcpListener, event_tx: mpsc::Sender<DaemonEvent>) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("Failed to accept client connection: {}", e);
                tokio::time::sleep(Duration::from_millis(100)).await;
                continue;
            }
        };

        debug!("Client connected from {}", peer);

        // Handle this client
        let event_tx = event_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_client(stream, event_tx).await {
                warn!("Client handler error: {}", e);
            }
        });
    }
}

/// Serialize a response line, falling back to a fixed error line.
fn response_line(response: &IpcResponse) -> String {
    match encode_line(response) {
        Ok(line) => line,
        Err(e) => {
            warn!("Failed to serialize IPC response: {}", e);
            FALLBACK_RESPONSE.to_string()
        }
    }
}

/// Handle a single client connection.
async fn handle_client<S>(stream: S, event_tx: mpsc::Sender<DaemonEvent>) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let limited_reader = reader.take(MAX_IPC_MESSAGE_SIZE as u64);
    let mut reader = BufReader::new(limited_reader);
    let mut line = String::new();

    // Read command (single line of JSON) with timeout and size bound
    let read_result = tokio::time::timeout(IPC_READ_TIMEOUT, reader.read_line(&mut line)).await;
    let bytes_read = match read_result {
        Ok(Ok(n)) => n,
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            // Timeout: client did not send in time, silently close
            return Ok(());
        }
    };
    if bytes_read == 0 {
        return Ok(()); // Client disconnected
    }

    debug!("Received command: {}", line.trim());

    // Parse the command
    let cmd: IpcCommand = match decode_line(&line) {
        Ok(cmd) => cmd,
        Err(e) => {
            let response = IpcResponse::error(format!("Invalid command: {}", e));
            writer.write_all(response_line(&response).as_bytes()).await?;
            return Ok(());
        }
    };

    // Check for stop command (special handling)
    let is_stop = matches!(cmd, IpcCommand::Stop);

    // Create a oneshot channel for the response
    let (resp_tx, resp_rx) = oneshot::channel();

    // Send the command to the event loop
    if event_tx
        .send(DaemonEvent::IpcCommand {
            cmd,
            responder: resp_tx,
        })
        .await
        .is_err()
    {
        let response = IpcResponse::error("Daemon is shutting down");
        writer.write_all(response_line(&response).as_bytes()).await?;
        return Ok(());
    }

    // Wait for the response
    let response = match resp_rx.await {
        Ok(resp) => resp,
        Err(_) => IpcResponse::error("Failed to get response from daemon"),
    };

    // Send response back to client
    writer.write_all(response_line(&response).as_bytes()).await?;

    // If this was a stop command, signal shutdown
    if is_stop {
        let _ = event_tx.send(DaemonEvent::Shutdown).await;
    }

    Ok(())
}

/// Check if another daemon instance is already running by probing the IPC address.
async fn check_already_running(addr: &str) -> bool {
    TcpStream::connect(addr).await.is_ok()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (needed for log level)
    let mut config = Config::load().unwrap_or_else(|e| {
        // Can't use tracing yet, fall back to eprintln
        eprintln!("Failed to load configuration: {}. Using defaults.", e);
        Config::default()
    });

    // Initialize logging with configured log level
    let log_level = match config.behavior.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO, // default fallback for invalid values
    };
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Validate and clamp config values
    let config_warnings = config.validate();
    for w in &config_warnings {
        warn!("Config: {} - {}", w.field, w.message);
    }

    info!("Glasspane daemon starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let addr = config.behavior.ipc_addr.clone();

    // Check if another instance is already running
    if check_already_running(&addr).await {
        error!("Another glasspane daemon is already running (listening on {})", addr);
        return Ok(());
    }

    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind IPC address {}: {}", addr, e);
            return Err(e.into());
        }
    };

    for disp in &config.displays {
        let work_area = disp.work_area.unwrap_or(disp.bounds);
        info!(
            "  Display {}: {}x{} (work area: {}x{} at {},{}){}",
            disp.id,
            disp.bounds.width,
            disp.bounds.height,
            work_area.width,
            work_area.height,
            work_area.x,
            work_area.y,
            if disp.primary { " [PRIMARY]" } else { "" }
        );
    }

    let mut state = AppState::new_with_config(config, Instant::now());

    // Create event channel
    let (event_tx, mut event_rx) = mpsc::channel::<DaemonEvent>(100);

    // Start IPC server
    let server_tx = event_tx.clone();
    let server_handle = tokio::spawn(run_ipc_server(listener, server_tx));

    // Handle Ctrl+C
    {
        let shutdown_tx = event_tx.clone();
        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                info!("Ctrl+C received, initiating shutdown...");
                let _ = shutdown_tx.send(DaemonEvent::Shutdown).await;
            }
        });
    }

    info!("Ready. Use glasspane-cli to send commands (listening on {}).", addr);

    // Main event loop
    loop {
        let deadline = state.engine.next_deadline();
        let event = tokio::select! {
            event = event_rx.recv() => match event {
                Some(e) => e,
                None => break,
            },
            _ = sleep_until_deadline(deadline) => {
                let fired = state.engine.fire_due(Instant::now());
                trace!("Fired {} scheduled task(s)", fired);
                continue;
            }
        };

        match event {
            DaemonEvent::IpcCommand { cmd, responder } => {
                let reply = state.handle_command(cmd, Instant::now());
                dispatch_reply(reply, responder);
            }
            DaemonEvent::Shutdown => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    server_handle.abort();

    info!("Glasspane daemon shutting down.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::DisplayConfig;
    use glasspane_core_layout::Direction;
    use glasspane_engine::{ToggleState, WindowHost};

    fn test_config() -> Config {
        Config::default()
    }

    fn dual_display_config() -> Config {
        let mut config = test_config();
        config.displays.push(DisplayConfig {
            id: 2,
            bounds: Rect::new(1920, 0, 2560, 1440),
            work_area: Some(Rect::new(1920, 25, 2560, 1415)),
            scale_factor: 2.0,
            primary: false,
        });
        config
    }

    /// Fire every scheduled task, one deadline at a time.
    fn settle(state: &mut AppState, from: Instant) -> Instant {
        let mut now = from;
        let limit = from + Duration::from_secs(60);
        while let Some(at) = state.engine.next_deadline() {
            assert!(at <= limit, "engine never went idle");
            now = now.max(at);
            state.engine.fire_due(now);
        }
        now
    }

    fn header(state: &AppState) -> Rect {
        state.engine.host().bounds(WindowKind::Header).unwrap()
    }

    fn expect_now(reply: Reply) -> IpcResponse {
        match reply {
            Reply::Now(response) => response,
            Reply::After(_) => panic!("expected an immediate response"),
        }
    }

    fn expect_after(reply: Reply) -> AnimationHandle {
        match reply {
            Reply::After(handle) => handle,
            Reply::Now(response) => panic!("expected an animation, got {:?}", response),
        }
    }

    #[test]
    fn test_app_state_new() {
        let t0 = Instant::now();
        let mut state = AppState::new_with_config(test_config(), t0);
        settle(&mut state, t0);

        // (1920 - 345) / 2
        assert_eq!(header(&state), Rect::new(787, 0, 345, 60));
        let host = state.engine.host();
        for kind in WindowKind::DEPENDENTS {
            assert!(!host.window(kind).is_some_and(|w| w.visible), "{} visible", kind);
        }
        assert!(!state.keymap.is_empty());
    }

    #[test]
    fn test_app_state_no_displays_fallback() {
        let mut config = test_config();
        config.displays.clear();
        let state = AppState::new_with_config(config, Instant::now());
        assert_eq!(header(&state).origin(), glasspane_core_layout::Point::new(787, 0));
    }

    #[test]
    fn test_move_step_answers_after_animation() {
        let t0 = Instant::now();
        let mut state = AppState::new_with_config(test_config(), t0);
        let now = settle(&mut state, t0);

        let mut handle = expect_after(state.handle_command(
            IpcCommand::MoveStep {
                direction: Direction::Left,
            },
            now,
        ));
        assert!(handle.try_result().is_none());

        settle(&mut state, now);
        assert_eq!(handle.try_result(), Some(Ok(())));
        assert_eq!(header(&state).x, 787 - 80);
    }

    #[test]
    fn test_repeated_moves_leave_no_host_log() {
        let t0 = Instant::now();
        let mut state = AppState::new_with_config(test_config(), t0);
        let mut now = settle(&mut state, t0);

        for i in 0..200 {
            let direction = if i % 2 == 0 { Direction::Left } else { Direction::Right };
            state.handle_command(IpcCommand::MoveStep { direction }, now);
            now = settle(&mut state, now);
        }
        assert!(state.engine.host().writes().is_empty());
        assert!(state.engine.host().signals().is_empty());
        assert_eq!(header(&state).x, 787);
    }

    #[test]
    fn test_move_step_at_boundary_is_ignored() {
        let t0 = Instant::now();
        let mut state = AppState::new_with_config(test_config(), t0);
        let response = expect_now(state.handle_command(IpcCommand::MoveHeaderTo { x: 0, y: 0 }, t0));
        assert_eq!(response, IpcResponse::Ok);
        let now = settle(&mut state, t0);

        let response = expect_now(state.handle_command(
            IpcCommand::MoveStep {
                direction: Direction::Up,
            },
            now,
        ));
        assert!(matches!(response, IpcResponse::Ignored { .. }));
    }

    #[test]
    fn test_show_from_edge_without_hide_is_error() {
        let t0 = Instant::now();
        let mut state = AppState::new_with_config(test_config(), t0);
        let response = expect_now(state.handle_command(IpcCommand::ShowFromEdge, t0));
        assert!(response.is_error());
    }

    #[test]
    fn test_toggle_responses() {
        let t0 = Instant::now();
        let mut state = AppState::new_with_config(test_config(), t0);
        let now = settle(&mut state, t0);

        let first = expect_now(state.handle_command(IpcCommand::ToggleVisibility, now));
        assert_eq!(first, IpcResponse::Ok);
        assert_eq!(state.engine.toggle_state(), ToggleState::Toggling);

        let second = expect_now(state.handle_command(
            IpcCommand::ToggleVisibility,
            now + Duration::from_millis(50),
        ));
        assert!(matches!(second, IpcResponse::Ignored { .. }));

        let third = expect_now(state.handle_command(
            IpcCommand::ToggleVisibility,
            now + Duration::from_millis(250),
        ));
        assert_eq!(third, IpcResponse::Queued);
    }

    #[test]
    fn test_companion_commands() {
        let t0 = Instant::now();
        let mut state = AppState::new_with_config(test_config(), t0);

        let response = expect_now(state.handle_command(
            IpcCommand::ShowCompanion {
                window: WindowKind::CompanionA,
            },
            t0,
        ));
        assert_eq!(response, IpcResponse::Ok);
        settle(&mut state, t0);
        assert!(state
            .engine
            .host()
            .window(WindowKind::CompanionA)
            .is_some_and(|w| w.visible));

        let response = expect_now(state.handle_command(
            IpcCommand::ShowCompanion {
                window: WindowKind::Header,
            },
            t0,
        ));
        assert!(response.is_error());
    }

    #[test]
    fn test_resize_header_rejects_empty_size() {
        let t0 = Instant::now();
        let mut state = AppState::new_with_config(test_config(), t0);
        let response = expect_now(state.handle_command(
            IpcCommand::ResizeHeader {
                width: 0,
                height: 60,
            },
            t0,
        ));
        assert!(response.is_error());
    }

    #[test]
    fn test_shortcut_dispatch() {
        let t0 = Instant::now();
        let mut state = AppState::new_with_config(dual_display_config(), t0);
        let now = settle(&mut state, t0);

        // Already on display 1
        let response = expect_now(state.handle_command(
            IpcCommand::Shortcut {
                chord: "Ctrl+Alt+1".to_string(),
            },
            now,
        ));
        assert!(matches!(response, IpcResponse::Ignored { .. }));

        let response = expect_now(state.handle_command(
            IpcCommand::Shortcut {
                chord: "ctrl+alt+5".to_string(),
            },
            now,
        ));
        assert!(matches!(response, IpcResponse::Ignored { .. }));

        let response = expect_now(state.handle_command(
            IpcCommand::Shortcut {
                chord: "ctrl+q".to_string(),
            },
            now,
        ));
        assert!(response.is_error());

        let mut handle = expect_after(state.handle_command(
            IpcCommand::Shortcut {
                chord: "alt+ctrl+2".to_string(),
            },
            now,
        ));
        settle(&mut state, now);
        assert_eq!(handle.try_result(), Some(Ok(())));
        assert!(header(&state).x >= 1920);
    }

    #[test]
    fn test_query_commands() {
        let t0 = Instant::now();
        let mut state = AppState::new_with_config(dual_display_config(), t0);
        settle(&mut state, t0);

        match expect_now(state.handle_command(IpcCommand::QueryDisplays, t0)) {
            IpcResponse::Displays { displays } => {
                assert_eq!(displays.len(), 2);
                assert!(displays[0].is_primary);
            }
            other => panic!("unexpected response {:?}", other),
        }

        match expect_now(state.handle_command(IpcCommand::QueryLayout, t0)) {
            IpcResponse::Layout { snapshot } => {
                assert_eq!(snapshot.windows[0].kind, WindowKind::Header);
                assert_eq!(snapshot.windows[0].bounds, Some(Rect::new(787, 0, 345, 60)));
                assert!(!snapshot.animating);
            }
            other => panic!("unexpected response {:?}", other),
        }
    }

    #[test]
    fn test_apply_config_removes_display() {
        let t0 = Instant::now();
        let mut state = AppState::new_with_config(dual_display_config(), t0);
        let now = settle(&mut state, t0);

        let mut handle = expect_after(state.handle_command(IpcCommand::MoveToDisplay { display_id: 2 }, now));
        let now = settle(&mut state, now);
        assert_eq!(handle.try_result(), Some(Ok(())));
        assert!(header(&state).x >= 1920);

        state.apply_config(test_config(), now);
        settle(&mut state, now);

        assert_eq!(state.engine.host().displays().len(), 1);
        assert!(header(&state).right() <= 1920);
    }

    #[test]
    fn test_apply_config_rebuilds_keymap() {
        let t0 = Instant::now();
        let mut state = AppState::new_with_config(test_config(), t0);

        let mut config = test_config();
        config.hotkeys.bindings.clear();
        config
            .hotkeys
            .bindings
            .insert("Alt+H".to_string(), "toggle_visibility".to_string());
        state.apply_config(config, t0);

        assert_eq!(state.keymap.len(), 1);
        assert!(state.keymap.lookup("alt+h").is_some());
        assert!(state.keymap.lookup("ctrl+left").is_none());
    }

    #[test]
    fn test_motion_response_mapping() {
        assert_eq!(motion_response(Ok(())), IpcResponse::Ok);
        assert!(matches!(
            motion_response(Err(MotionError::Cancelled)),
            IpcResponse::Ignored { .. }
        ));
        assert!(motion_response(Err(MotionError::NotVisible)).is_error());
    }

    #[test]
    fn test_fallback_response_is_valid() {
        let parsed: IpcResponse = decode_line(FALLBACK_RESPONSE).unwrap();
        assert!(parsed.is_error());
    }

    /// Answer every command with `Ok` until the channel closes.
    fn spawn_fake_loop(mut event_rx: mpsc::Receiver<DaemonEvent>) -> tokio::task::JoinHandle<usize> {
        tokio::spawn(async move {
            let mut shutdowns = 0;
            while let Some(event) = event_rx.recv().await {
                match event {
                    DaemonEvent::IpcCommand { responder, .. } => {
                        let _ = responder.send(IpcResponse::Ok);
                    }
                    DaemonEvent::Shutdown => shutdowns += 1,
                }
            }
            shutdowns
        })
    }

    async fn roundtrip(request: &str) -> (String, usize) {
        let (event_tx, event_rx) = mpsc::channel(8);
        let fake_loop = spawn_fake_loop(event_rx);

        let (mut client, server) = tokio::io::duplex(MAX_IPC_MESSAGE_SIZE * 2);
        let handler = tokio::spawn(handle_client(server, event_tx));

        client.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        BufReader::new(&mut client).read_line(&mut response).await.unwrap();

        handler.await.unwrap().unwrap();
        let shutdowns = fake_loop.await.unwrap();
        (response, shutdowns)
    }

    #[tokio::test]
    async fn test_handle_client_forwards_command() {
        let (response, shutdowns) = roundtrip("{\"type\":\"update_layout\"}\n").await;
        assert_eq!(response, "{\"status\":\"ok\"}\n");
        assert_eq!(shutdowns, 0);
    }

    #[tokio::test]
    async fn test_handle_client_invalid_json() {
        let (response, _) = roundtrip("not json\n").await;
        let parsed: IpcResponse = decode_line(&response).unwrap();
        match parsed {
            IpcResponse::Error { message } => assert!(message.starts_with("Invalid command")),
            other => panic!("unexpected response {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_handle_client_stop_signals_shutdown() {
        let (response, shutdowns) = roundtrip("{\"type\":\"stop\"}\n").await;
        assert_eq!(response, "{\"status\":\"ok\"}\n");
        assert_eq!(shutdowns, 1);
    }

    #[tokio::test]
    async fn test_handle_client_daemon_gone() {
        let (event_tx, event_rx) = mpsc::channel(1);
        drop(event_rx);

        let (mut client, server) = tokio::io::duplex(1024);
        let handler = tokio::spawn(handle_client(server, event_tx));
        client.write_all(b"{\"type\":\"toggle_visibility\"}\n").await.unwrap();

        let mut response = String::new();
        BufReader::new(&mut client).read_line(&mut response).await.unwrap();
        handler.await.unwrap().unwrap();
        assert!(response.contains("Daemon is shutting down"));
    }

    #[test]
    fn test_ipc_read_timeout_is_reasonable() {
        assert!(IPC_READ_TIMEOUT >= Duration::from_secs(1));
        assert!(IPC_READ_TIMEOUT <= Duration::from_secs(30));
    }

    #[test]
    fn test_max_message_size_is_reasonable() {
        const { assert!(MAX_IPC_MESSAGE_SIZE >= 1024) };
        const { assert!(MAX_IPC_MESSAGE_SIZE <= 1024 * 1024) };
    }
}
