//! Glasspane IPC Protocol
//!
//! Shared types for daemon-CLI communication over a local TCP socket.
//! Each request is one line of JSON; the daemon answers with one line.

use glasspane_core_layout::{Direction, Display, DisplayId, Edge, Rect};
use glasspane_engine::{EngineSnapshot, WindowKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Loopback address the daemon listens on.
pub const DEFAULT_ADDR: &str = "127.0.0.1:47611";

/// Upper bound on one request line, in bytes.
pub const MAX_IPC_MESSAGE_SIZE: usize = 64 * 1024;

/// Commands that can be sent from the CLI to the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IpcCommand {
    /// Nudge the header one step.
    MoveStep { direction: Direction },
    /// Snap the header flush to a work-area edge.
    MoveToEdge { direction: Direction },
    /// Move the header to another display.
    MoveToDisplay { display_id: DisplayId },

    /// Slide the header off-screen past an edge.
    HideToEdge { edge: Edge },
    /// Bring the header back from its hidden position.
    ShowFromEdge,
    /// Hide or show the whole window group.
    ToggleVisibility,

    /// Request a debounced layout pass.
    UpdateLayout,
    ShowCompanion { window: WindowKind },
    HideCompanion { window: WindowKind },
    /// Open the auxiliary panel under a header-relative trigger rectangle.
    ShowAuxiliary { trigger: Rect },
    /// Hide the auxiliary panel after its grace period.
    HideAuxiliary,
    ResizeHeader { width: i32, height: i32 },
    MoveHeaderTo { x: i32, y: i32 },

    /// Run whatever the hotkey table binds to `chord`, e.g. `"ctrl+shift+left"`.
    Shortcut { chord: String },

    /// Query window bounds, strategy and toggle state.
    QueryLayout,
    /// Query the current display set.
    QueryDisplays,

    /// Reload configuration from file.
    Reload,
    /// Stop the daemon.
    Stop,
}

/// Responses from the daemon to the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IpcResponse {
    /// Command executed successfully.
    Ok,
    /// Command was accepted but had nothing to do.
    Ignored {
        /// Why nothing happened.
        reason: String,
    },
    /// A toggle arrived mid-cycle and will run after it.
    Queued,
    /// Command failed with an error.
    Error {
        /// Error message describing what went wrong.
        message: String,
    },
    /// Layout query response.
    Layout { snapshot: EngineSnapshot },
    /// Display query response.
    Displays { displays: Vec<Display> },
}

impl IpcResponse {
    /// Create an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Create an ignored response.
    pub fn ignored(reason: impl Into<String>) -> Self {
        Self::Ignored {
            reason: reason.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// Errors from framing or parsing a protocol line.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("message exceeds {MAX_IPC_MESSAGE_SIZE} bytes")]
    TooLarge,

    #[error("empty message")]
    Empty,

    #[error("invalid message: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialize `value` as one protocol line, newline included.
pub fn encode_line<T: Serialize>(value: &T) -> Result<String, ProtocolError> {
    let mut line = serde_json::to_string(value)?;
    line.push('\n');
    if line.len() > MAX_IPC_MESSAGE_SIZE {
        return Err(ProtocolError::TooLarge);
    }
    Ok(line)
}

/// Parse one protocol line. Surrounding whitespace is ignored.
pub fn decode_line<T: for<'de> Deserialize<'de>>(line: &str) -> Result<T, ProtocolError> {
    if line.len() > MAX_IPC_MESSAGE_SIZE {
        return Err(ProtocolError::TooLarge);
    }
    let line = line.trim();
    if line.is_empty() {
        return Err(ProtocolError::Empty);
    }
    Ok(serde_json::from_str(line)?)
}
