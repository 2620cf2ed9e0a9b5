//! Keyboard chord table.
//!
//! Chords come in as strings such as `"Ctrl+Shift+Left"`. They are matched
//! case-insensitively with modifiers in any order, so every chord is reduced
//! to a canonical form (`ctrl+alt+shift+win+<key>`) before lookup.

use crate::config::{self, BoundCommand, HotkeyConfig};
use std::collections::HashMap;
use tracing::{debug, info, warn};

const MODIFIER_ORDER: [&str; 4] = ["ctrl", "alt", "shift", "win"];

fn modifier_name(part: &str) -> Option<&'static str> {
    match part {
        "ctrl" | "control" => Some("ctrl"),
        "alt" | "option" => Some("alt"),
        "shift" => Some("shift"),
        "win" | "super" | "meta" | "cmd" => Some("win"),
        _ => None,
    }
}

fn key_name(part: &str) -> &str {
    match part {
        "backslash" => "\\",
        "esc" => "escape",
        "arrowleft" => "left",
        "arrowright" => "right",
        "arrowup" => "up",
        "arrowdown" => "down",
        other => other,
    }
}

/// Reduce a chord to its canonical form.
///
/// Returns `None` unless the chord has exactly one non-modifier key.
pub fn normalize_chord(chord: &str) -> Option<String> {
    let mut modifiers = [false; 4];
    let mut key: Option<String> = None;

    for part in chord.split('+') {
        let part = part.trim().to_lowercase();
        if part.is_empty() {
            return None;
        }
        match modifier_name(&part) {
            Some(name) => {
                if let Some(slot) = MODIFIER_ORDER.iter().position(|m| *m == name) {
                    modifiers[slot] = true;
                }
            }
            None => {
                if key.is_some() {
                    return None;
                }
                key = Some(key_name(&part).to_string());
            }
        }
    }

    let key = key?;
    let mut parts: Vec<&str> = MODIFIER_ORDER
        .iter()
        .zip(modifiers)
        .filter_map(|(name, held)| held.then_some(*name))
        .collect();
    parts.push(&key);
    Some(parts.join("+"))
}

/// Chord to command mapping, rebuilt on startup and on reload.
#[derive(Debug, Clone, Default)]
pub struct Keymap {
    bindings: HashMap<String, BoundCommand>,
}

impl Keymap {
    /// Build the table from config, skipping entries that don't parse.
    pub fn from_config(config: &HotkeyConfig) -> Self {
        let mut bindings = HashMap::new();

        // Sorted so duplicates resolve the same way on every load
        let mut entries: Vec<_> = config.bindings.iter().collect();
        entries.sort();

        for (key_str, cmd_str) in entries {
            let Some(chord) = normalize_chord(key_str) else {
                warn!("Invalid hotkey string in config: {}", key_str);
                continue;
            };
            let Some(cmd) = config::parse_command(cmd_str) else {
                warn!("Unknown command in hotkey config: {} -> {}", key_str, cmd_str);
                continue;
            };
            if bindings.contains_key(&chord) {
                warn!("Duplicate hotkey in config: {} (ignoring -> {})", key_str, cmd_str);
                continue;
            }
            debug!("Configured hotkey {} -> {}", chord, cmd_str);
            bindings.insert(chord, cmd);
        }

        if bindings.is_empty() {
            info!("No hotkeys configured");
        } else {
            info!("Configured {} hotkeys", bindings.len());
        }

        Self { bindings }
    }

    /// The command bound to `chord`, in any spelling.
    pub fn lookup(&self, chord: &str) -> Option<&BoundCommand> {
        self.bindings.get(&normalize_chord(chord)?)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
