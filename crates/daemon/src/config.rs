//! Configuration management for the Glasspane daemon.
//!
//! Configuration is loaded from TOML files in the following locations (in order):
//! 1. The platform config dir, e.g. `~/.config/glasspane/config.toml` or
//!    `%APPDATA%/glasspane/config/config.toml`
//! 2. `~/.config/glasspane/config.toml` (Unix-style)
//! 3. `./config.toml` (current directory, for development)

use anyhow::{Context, Result};
use directories::ProjectDirs;
use glasspane_core_layout::{
    AuxiliaryRules, CompanionRules, Direction, Display, Edge, Rect, Size, StrategyRules,
};
use glasspane_engine::{EngineSettings, LayoutRules, MotionSettings, VisibilitySettings};
use glasspane_ipc::IpcCommand;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for Glasspane.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Companion layout configuration.
    pub layout: LayoutConfig,
    /// Auxiliary panel placement.
    pub auxiliary: AuxiliaryConfig,
    /// Header motion timing.
    pub motion: MotionConfig,
    /// Group visibility timing.
    pub visibility: VisibilityConfig,
    /// Behavior configuration.
    pub behavior: BehaviorConfig,
    /// Initial window sizes.
    pub windows: WindowsConfig,
    /// Displays presented to the engine.
    pub displays: Vec<DisplayConfig>,
    /// Hotkey bindings.
    pub hotkeys: HotkeyConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            auxiliary: AuxiliaryConfig::default(),
            motion: MotionConfig::default(),
            visibility: VisibilityConfig::default(),
            behavior: BehaviorConfig::default(),
            windows: WindowsConfig::default(),
            displays: default_displays(),
            hotkeys: HotkeyConfig::default(),
        }
    }
}

/// A value that [`Config::validate`] had to correct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub field: &'static str,
    pub message: String,
}

impl ConfigWarning {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

// ============================================================================
// Layout
// ============================================================================

/// Strategy thresholds and companion spacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Free space needed above/below the header to open companions vertically.
    #[serde(default = "default_vertical_space")]
    pub vertical_space: i32,

    /// Free space needed beside the header to open companions sideways.
    #[serde(default = "default_side_space")]
    pub side_space: i32,

    /// Relative header x below which the header hugs the left edge.
    #[serde(default = "default_leading_cutoff")]
    pub leading_cutoff: f64,

    /// Relative header x splitting "open right" from "open left".
    #[serde(default = "default_midpoint")]
    pub midpoint: f64,

    /// Relative header x above which the header hugs the right edge.
    #[serde(default = "default_trailing_cutoff")]
    pub trailing_cutoff: f64,

    /// Gap between two side-by-side companions in pixels.
    #[serde(default = "default_companion_gap")]
    pub companion_gap: i32,

    /// Screen-edge clearance for a lone companion in pixels.
    #[serde(default = "default_companion_margin")]
    pub companion_margin: i32,

    /// Coalescing window for layout requests.
    #[serde(default = "default_layout_debounce")]
    pub debounce_ms: u64,

    /// Header moves closer together than this count as a drag.
    #[serde(default = "default_drag_threshold")]
    pub drag_threshold_ms: u64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            vertical_space: default_vertical_space(),
            side_space: default_side_space(),
            leading_cutoff: default_leading_cutoff(),
            midpoint: default_midpoint(),
            trailing_cutoff: default_trailing_cutoff(),
            companion_gap: default_companion_gap(),
            companion_margin: default_companion_margin(),
            debounce_ms: default_layout_debounce(),
            drag_threshold_ms: default_drag_threshold(),
        }
    }
}

fn default_vertical_space() -> i32 {
    400
}

fn default_side_space() -> i32 {
    800
}

fn default_leading_cutoff() -> f64 {
    0.3
}

fn default_midpoint() -> f64 {
    0.5
}

fn default_trailing_cutoff() -> f64 {
    0.7
}

fn default_companion_gap() -> i32 {
    8
}

fn default_companion_margin() -> i32 {
    8
}

fn default_layout_debounce() -> u64 {
    16
}

fn default_drag_threshold() -> u64 {
    100
}

// ============================================================================
// Auxiliary
// ============================================================================

/// Auxiliary panel offsets. Tuned by eye.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuxiliaryConfig {
    #[serde(default = "default_aux_padding")]
    pub padding: i32,
    #[serde(default = "default_trigger_inset")]
    pub trigger_inset: i32,
    #[serde(default = "default_aux_screen_margin")]
    pub screen_margin: i32,
    #[serde(default = "default_aux_overlap_margin")]
    pub overlap_margin: i32,
    #[serde(default = "default_trigger_drop")]
    pub trigger_drop: i32,
    /// Delay before a requested hide takes effect.
    #[serde(default = "default_hide_grace")]
    pub hide_grace_ms: u64,
}

impl Default for AuxiliaryConfig {
    fn default() -> Self {
        Self {
            padding: default_aux_padding(),
            trigger_inset: default_trigger_inset(),
            screen_margin: default_aux_screen_margin(),
            overlap_margin: default_aux_overlap_margin(),
            trigger_drop: default_trigger_drop(),
            hide_grace_ms: default_hide_grace(),
        }
    }
}

fn default_aux_padding() -> i32 {
    5
}

fn default_trigger_inset() -> i32 {
    17
}

fn default_aux_screen_margin() -> i32 {
    10
}

fn default_aux_overlap_margin() -> i32 {
    10
}

fn default_trigger_drop() -> i32 {
    31
}

fn default_hide_grace() -> u64 {
    200
}

// ============================================================================
// Motion
// ============================================================================

/// Header animation distances and durations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Pixels moved by one step.
    #[serde(default = "default_step_size")]
    pub step_size: i32,
    #[serde(default = "default_frame_interval")]
    pub frame_interval_ms: u64,
    #[serde(default = "default_step_duration")]
    pub step_duration_ms: u64,
    #[serde(default = "default_edge_duration")]
    pub edge_duration_ms: u64,
    #[serde(default = "default_hide_duration")]
    pub hide_duration_ms: u64,
    #[serde(default = "default_show_duration")]
    pub show_duration_ms: u64,
    #[serde(default = "default_display_duration")]
    pub display_duration_ms: u64,
    /// Clearance past the work-area edge when hidden.
    #[serde(default = "default_hide_margin")]
    pub hide_margin: i32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            step_size: default_step_size(),
            frame_interval_ms: default_frame_interval(),
            step_duration_ms: default_step_duration(),
            edge_duration_ms: default_edge_duration(),
            hide_duration_ms: default_hide_duration(),
            show_duration_ms: default_show_duration(),
            display_duration_ms: default_display_duration(),
            hide_margin: default_hide_margin(),
        }
    }
}

fn default_step_size() -> i32 {
    80
}

fn default_frame_interval() -> u64 {
    16
}

fn default_step_duration() -> u64 {
    300
}

fn default_edge_duration() -> u64 {
    350
}

fn default_hide_duration() -> u64 {
    300
}

fn default_show_duration() -> u64 {
    400
}

fn default_display_duration() -> u64 {
    300
}

fn default_hide_margin() -> i32 {
    20
}

// ============================================================================
// Visibility
// ============================================================================

/// Toggle debounce, queueing and settle delays.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityConfig {
    #[serde(default = "default_toggle_debounce")]
    pub debounce_ms: u64,
    #[serde(default = "default_queue_delay")]
    pub queue_delay_ms: u64,
    #[serde(default = "default_failsafe")]
    pub failsafe_ms: u64,
    #[serde(default = "default_hide_settle")]
    pub hide_settle_ms: u64,
    #[serde(default = "default_show_settle")]
    pub show_settle_ms: u64,
    #[serde(default = "default_refresh_delay")]
    pub refresh_delay_ms: u64,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_toggle_debounce(),
            queue_delay_ms: default_queue_delay(),
            failsafe_ms: default_failsafe(),
            hide_settle_ms: default_hide_settle(),
            show_settle_ms: default_show_settle(),
            refresh_delay_ms: default_refresh_delay(),
        }
    }
}

fn default_toggle_debounce() -> u64 {
    200
}

fn default_queue_delay() -> u64 {
    300
}

fn default_failsafe() -> u64 {
    2000
}

fn default_hide_settle() -> u64 {
    180
}

fn default_show_settle() -> u64 {
    100
}

fn default_refresh_delay() -> u64 {
    100
}

// ============================================================================
// Behavior, windows, displays
// ============================================================================

/// Behavior-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Address the IPC server listens on. Must be a loopback address.
    #[serde(default = "default_ipc_addr")]
    pub ipc_addr: String,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            ipc_addr: default_ipc_addr(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_ipc_addr() -> String {
    glasspane_ipc::DEFAULT_ADDR.to_string()
}

/// Width and height of one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSize {
    pub width: i32,
    pub height: i32,
}

impl From<WindowSize> for Size {
    fn from(size: WindowSize) -> Self {
        Size::new(size.width, size.height)
    }
}

/// Initial window sizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowsConfig {
    pub header: WindowSize,
    pub companion_a: WindowSize,
    pub companion_b: WindowSize,
    pub auxiliary: WindowSize,
}

impl Default for WindowsConfig {
    fn default() -> Self {
        Self {
            header: WindowSize {
                width: 345,
                height: 60,
            },
            companion_a: WindowSize {
                width: 400,
                height: 300,
            },
            companion_b: WindowSize {
                width: 600,
                height: 350,
            },
            auxiliary: WindowSize {
                width: 400,
                height: 600,
            },
        }
    }
}

/// One display.
///
/// ```toml
/// [[displays]]
/// id = 2
/// bounds = { x = 1920, y = 0, width = 2560, height = 1440 }
/// work_area = { x = 1920, y = 25, width = 2560, height = 1415 }
/// scale_factor = 2.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub id: u64,
    pub bounds: Rect,
    /// Defaults to the full bounds.
    #[serde(default)]
    pub work_area: Option<Rect>,
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f64,
    #[serde(default)]
    pub primary: bool,
}

fn default_scale_factor() -> f64 {
    1.0
}

fn default_displays() -> Vec<DisplayConfig> {
    vec![DisplayConfig {
        id: 1,
        bounds: Rect::new(0, 0, 1920, 1080),
        work_area: Some(Rect::new(0, 0, 1920, 1040)),
        scale_factor: 1.0,
        primary: true,
    }]
}

impl From<&DisplayConfig> for Display {
    fn from(config: &DisplayConfig) -> Self {
        let display = Display::new(
            config.id,
            config.bounds,
            config.work_area.unwrap_or(config.bounds),
        )
        .with_scale_factor(config.scale_factor);
        if config.primary {
            display.primary()
        } else {
            display
        }
    }
}

// ============================================================================
// Hotkeys
// ============================================================================

/// Hotkey bindings configuration.
///
/// Each key is a chord (e.g. "Ctrl+Shift+Left") and each value is a command
/// (e.g. "edge_left"). Supported commands:
/// - move_left, move_right, move_up, move_down (one step)
/// - edge_left, edge_right, edge_up, edge_down (snap to edge)
/// - toggle_visibility
/// - display_1 .. display_9 (n-th display, in enumeration order)
/// - update_layout, reload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HotkeyConfig {
    /// Map of chord to command name.
    #[serde(flatten)]
    pub bindings: HashMap<String, String>,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        let mut bindings = HashMap::new();

        // Step with Ctrl+arrows
        bindings.insert("Ctrl+Left".to_string(), "move_left".to_string());
        bindings.insert("Ctrl+Right".to_string(), "move_right".to_string());
        bindings.insert("Ctrl+Up".to_string(), "move_up".to_string());
        bindings.insert("Ctrl+Down".to_string(), "move_down".to_string());

        // Snap to edges with Ctrl+Shift+arrows
        bindings.insert("Ctrl+Shift+Left".to_string(), "edge_left".to_string());
        bindings.insert("Ctrl+Shift+Right".to_string(), "edge_right".to_string());
        bindings.insert("Ctrl+Shift+Up".to_string(), "edge_up".to_string());
        bindings.insert("Ctrl+Shift+Down".to_string(), "edge_down".to_string());

        // Show/hide everything
        bindings.insert("Ctrl+\\".to_string(), "toggle_visibility".to_string());

        // Jump between displays with Ctrl+Alt+<n>
        for n in 1..=9 {
            bindings.insert(format!("Ctrl+Alt+{}", n), format!("display_{}", n));
        }

        Self { bindings }
    }
}

/// What a hotkey command name resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundCommand {
    /// Run an IPC command as if a client had sent it.
    Ipc(IpcCommand),
    /// Move the header to the n-th display (1-based, enumeration order).
    Display(usize),
}

/// Parse a command string into a bound command.
pub fn parse_command(cmd: &str) -> Option<BoundCommand> {
    let ipc = match cmd.to_lowercase().as_str() {
        "move_left" => IpcCommand::MoveStep { direction: Direction::Left },
        "move_right" => IpcCommand::MoveStep { direction: Direction::Right },
        "move_up" => IpcCommand::MoveStep { direction: Direction::Up },
        "move_down" => IpcCommand::MoveStep { direction: Direction::Down },
        "edge_left" => IpcCommand::MoveToEdge { direction: Direction::Left },
        "edge_right" => IpcCommand::MoveToEdge { direction: Direction::Right },
        "edge_up" => IpcCommand::MoveToEdge { direction: Direction::Up },
        "edge_down" => IpcCommand::MoveToEdge { direction: Direction::Down },
        "hide_left" => IpcCommand::HideToEdge { edge: Edge::Left },
        "hide_right" => IpcCommand::HideToEdge { edge: Edge::Right },
        "hide_up" => IpcCommand::HideToEdge { edge: Edge::Top },
        "hide_down" => IpcCommand::HideToEdge { edge: Edge::Bottom },
        "show" => IpcCommand::ShowFromEdge,
        "toggle_visibility" => IpcCommand::ToggleVisibility,
        "update_layout" => IpcCommand::UpdateLayout,
        "reload" => IpcCommand::Reload,
        other => {
            let n = other.strip_prefix("display_")?.parse::<usize>().ok()?;
            return (n >= 1).then_some(BoundCommand::Display(n));
        }
    };
    Some(BoundCommand::Ipc(ipc))
}

// ============================================================================
// Loading and validation
// ============================================================================

impl Config {
    /// Load configuration from standard locations.
    ///
    /// Returns default config if no file is found.
    pub fn load() -> Result<Self> {
        let paths = config_paths();

        for path in &paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Correct values the engine cannot work with, reporting each fix.
    pub fn validate(&mut self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        let layout = &mut self.layout;
        for (field, value) in [
            ("layout.vertical_space", &mut layout.vertical_space),
            ("layout.side_space", &mut layout.side_space),
            ("layout.companion_gap", &mut layout.companion_gap),
            ("layout.companion_margin", &mut layout.companion_margin),
        ] {
            clamp_non_negative(field, value, &mut warnings);
        }
        for (field, value, default) in [
            ("layout.leading_cutoff", &mut layout.leading_cutoff, default_leading_cutoff()),
            ("layout.midpoint", &mut layout.midpoint, default_midpoint()),
            ("layout.trailing_cutoff", &mut layout.trailing_cutoff, default_trailing_cutoff()),
        ] {
            if !(0.0..=1.0).contains(value) {
                warnings.push(ConfigWarning::new(
                    field,
                    format!("{} is outside 0..1, using {}", value, default),
                ));
                *value = default;
            }
        }
        if layout.leading_cutoff > layout.trailing_cutoff {
            warnings.push(ConfigWarning::new(
                "layout.leading_cutoff",
                "greater than trailing_cutoff, using defaults for both",
            ));
            layout.leading_cutoff = default_leading_cutoff();
            layout.trailing_cutoff = default_trailing_cutoff();
        }

        let aux = &mut self.auxiliary;
        for (field, value) in [
            ("auxiliary.padding", &mut aux.padding),
            ("auxiliary.trigger_inset", &mut aux.trigger_inset),
            ("auxiliary.screen_margin", &mut aux.screen_margin),
            ("auxiliary.overlap_margin", &mut aux.overlap_margin),
            ("auxiliary.trigger_drop", &mut aux.trigger_drop),
        ] {
            clamp_non_negative(field, value, &mut warnings);
        }

        let motion = &mut self.motion;
        if motion.step_size <= 0 {
            warnings.push(ConfigWarning::new(
                "motion.step_size",
                format!("{} is not positive, using {}", motion.step_size, default_step_size()),
            ));
            motion.step_size = default_step_size();
        }
        if motion.frame_interval_ms == 0 {
            warnings.push(ConfigWarning::new(
                "motion.frame_interval_ms",
                format!("must be at least 1, using {}", default_frame_interval()),
            ));
            motion.frame_interval_ms = default_frame_interval();
        }
        clamp_non_negative("motion.hide_margin", &mut motion.hide_margin, &mut warnings);
        for (field, value, default) in [
            ("motion.step_duration_ms", &mut motion.step_duration_ms, default_step_duration()),
            ("motion.edge_duration_ms", &mut motion.edge_duration_ms, default_edge_duration()),
            ("motion.hide_duration_ms", &mut motion.hide_duration_ms, default_hide_duration()),
            ("motion.show_duration_ms", &mut motion.show_duration_ms, default_show_duration()),
            ("motion.display_duration_ms", &mut motion.display_duration_ms, default_display_duration()),
        ] {
            replace_zero(field, value, default, &mut warnings);
        }

        let vis = &mut self.visibility;
        replace_zero("visibility.failsafe_ms", &mut vis.failsafe_ms, default_failsafe(), &mut warnings);
        let cycle = vis.hide_settle_ms + self.motion.hide_duration_ms.max(self.motion.show_duration_ms);
        if vis.failsafe_ms <= cycle {
            warnings.push(ConfigWarning::new(
                "visibility.failsafe_ms",
                format!(
                    "{}ms would fire before a cycle can finish ({}ms), using {}",
                    vis.failsafe_ms,
                    cycle,
                    cycle + default_failsafe()
                ),
            ));
            vis.failsafe_ms = cycle + default_failsafe();
        }

        let loopback = self
            .behavior
            .ipc_addr
            .parse::<std::net::SocketAddr>()
            .map(|addr| addr.ip().is_loopback());
        if !matches!(loopback, Ok(true)) {
            warnings.push(ConfigWarning::new(
                "behavior.ipc_addr",
                format!("{} is not a loopback address, using {}", self.behavior.ipc_addr, default_ipc_addr()),
            ));
            self.behavior.ipc_addr = default_ipc_addr();
        }

        if self.displays.is_empty() {
            warnings.push(ConfigWarning::new("displays", "no displays configured, using defaults"));
            self.displays = default_displays();
        }
        let mut seen = Vec::new();
        self.displays.retain(|d| {
            let work_area = d.work_area.unwrap_or(d.bounds);
            if work_area.width <= 0 || work_area.height <= 0 {
                warnings.push(ConfigWarning::new(
                    "displays",
                    format!("display {} has an empty work area, dropping it", d.id),
                ));
                return false;
            }
            if seen.contains(&d.id) {
                warnings.push(ConfigWarning::new(
                    "displays",
                    format!("duplicate display id {}, dropping it", d.id),
                ));
                return false;
            }
            seen.push(d.id);
            true
        });
        if self.displays.is_empty() {
            self.displays = default_displays();
        }

        for (field, size) in [
            ("windows.header", &mut self.windows.header),
            ("windows.companion_a", &mut self.windows.companion_a),
            ("windows.companion_b", &mut self.windows.companion_b),
            ("windows.auxiliary", &mut self.windows.auxiliary),
        ] {
            if size.width <= 0 || size.height <= 0 {
                let fallback = WindowSize {
                    width: size.width.max(1),
                    height: size.height.max(1),
                };
                warnings.push(ConfigWarning::new(
                    field,
                    format!(
                        "{}x{} is empty, using {}x{}",
                        size.width, size.height, fallback.width, fallback.height
                    ),
                ));
                *size = fallback;
            }
        }

        warnings
    }

    /// Displays for the engine's host.
    pub fn display_list(&self) -> Vec<Display> {
        self.displays.iter().map(Display::from).collect()
    }

    /// Engine settings assembled from every section.
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            layout: LayoutRules::from(self),
            motion: MotionSettings::from(&self.motion),
            visibility: VisibilitySettings::from(&self.visibility),
            auxiliary_hide_grace: Duration::from_millis(self.auxiliary.hide_grace_ms),
        }
    }
}

fn clamp_non_negative(field: &'static str, value: &mut i32, warnings: &mut Vec<ConfigWarning>) {
    if *value < 0 {
        warnings.push(ConfigWarning::new(field, format!("{} is negative, using 0", value)));
        *value = 0;
    }
}

fn replace_zero(field: &'static str, value: &mut u64, default: u64, warnings: &mut Vec<ConfigWarning>) {
    if *value == 0 {
        warnings.push(ConfigWarning::new(field, format!("must be at least 1, using {}", default)));
        *value = default;
    }
}

impl From<&LayoutConfig> for StrategyRules {
    fn from(config: &LayoutConfig) -> Self {
        Self {
            vertical_space: config.vertical_space,
            side_space: config.side_space,
            leading_cutoff: config.leading_cutoff,
            trailing_cutoff: config.trailing_cutoff,
            midpoint: config.midpoint,
        }
    }
}

impl From<&LayoutConfig> for CompanionRules {
    fn from(config: &LayoutConfig) -> Self {
        Self {
            gap: config.companion_gap,
            edge_margin: config.companion_margin,
        }
    }
}

impl From<&AuxiliaryConfig> for AuxiliaryRules {
    fn from(config: &AuxiliaryConfig) -> Self {
        Self {
            padding: config.padding,
            trigger_inset: config.trigger_inset,
            screen_margin: config.screen_margin,
            overlap_margin: config.overlap_margin,
            trigger_drop: config.trigger_drop,
        }
    }
}

impl From<&Config> for LayoutRules {
    fn from(config: &Config) -> Self {
        Self {
            strategy: StrategyRules::from(&config.layout),
            companions: CompanionRules::from(&config.layout),
            auxiliary: AuxiliaryRules::from(&config.auxiliary),
            debounce: Duration::from_millis(config.layout.debounce_ms),
            drag_threshold: Duration::from_millis(config.layout.drag_threshold_ms),
        }
    }
}

impl From<&MotionConfig> for MotionSettings {
    fn from(config: &MotionConfig) -> Self {
        Self {
            step_size: config.step_size,
            frame_interval: Duration::from_millis(config.frame_interval_ms),
            step_duration: Duration::from_millis(config.step_duration_ms),
            edge_duration: Duration::from_millis(config.edge_duration_ms),
            hide_duration: Duration::from_millis(config.hide_duration_ms),
            show_duration: Duration::from_millis(config.show_duration_ms),
            display_duration: Duration::from_millis(config.display_duration_ms),
            hide_margin: config.hide_margin,
        }
    }
}

impl From<&VisibilityConfig> for VisibilitySettings {
    fn from(config: &VisibilityConfig) -> Self {
        Self {
            debounce: Duration::from_millis(config.debounce_ms),
            queue_delay: Duration::from_millis(config.queue_delay_ms),
            failsafe: Duration::from_millis(config.failsafe_ms),
            hide_settle: Duration::from_millis(config.hide_settle_ms),
            show_settle: Duration::from_millis(config.show_settle_ms),
            refresh_delay: Duration::from_millis(config.refresh_delay_ms),
        }
    }
}

/// Get all possible config file paths in priority order.
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // 1. Platform config dir
    if let Some(proj_dirs) = ProjectDirs::from("com", "glasspane", "glasspane") {
        paths.push(proj_dirs.config_dir().join("config.toml"));
    }

    // 2. Unix-style: ~/.config/glasspane/config.toml
    if let Some(home) = dirs_home() {
        let unix = home.join(".config").join("glasspane").join("config.toml");
        if !paths.contains(&unix) {
            paths.push(unix);
        }
    }

    // 3. Current directory: ./config.toml
    paths.push(PathBuf::from("config.toml"));

    paths
}

/// Get the user's home directory.
fn dirs_home() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}
