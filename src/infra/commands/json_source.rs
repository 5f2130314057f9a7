// Custom commands declared as JSON files in a directory.
//
// Each `*.json` file holds one command: the usual definition fields plus the
// text to reply with. Files are read in name order.

use crate::core::commands::{CommandDefinition, LoadError};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct CustomCommandFile {
    /// File name, used to point at the offending file in errors.
    pub origin: String,
    pub definition: CommandDefinition,
    pub reply: String,
    pub ephemeral: bool,
}

#[derive(Debug, Deserialize)]
struct RawCustomCommand {
    #[serde(flatten)]
    definition: CommandDefinition,
    #[serde(default)]
    reply: String,
    #[serde(default)]
    ephemeral: bool,
}

/// Parse every `*.json` file in `dir`. A missing directory yields nothing.
pub fn read_command_dir(dir: &Path) -> Vec<Result<CustomCommandFile, LoadError>> {
    if !dir.exists() {
        tracing::debug!(dir = %dir.display(), "No custom command directory");
        return Vec::new();
    }

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            return vec![Err(LoadError::Invalid {
                entry: dir.display().to_string(),
                reason: e.to_string(),
            })]
        }
    };

    let mut paths: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    paths.iter().map(|path| read_command_file(path)).collect()
}

fn read_command_file(path: &Path) -> Result<CustomCommandFile, LoadError> {
    let origin = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    let invalid = |reason: String| LoadError::Invalid {
        entry: origin.clone(),
        reason,
    };

    let raw = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
    let parsed: RawCustomCommand = serde_json::from_str(&raw).map_err(|e| invalid(e.to_string()))?;

    if parsed.reply.trim().is_empty() {
        return Err(LoadError::MissingField {
            entry: origin,
            field: "reply",
        });
    }

    Ok(CustomCommandFile {
        origin,
        definition: parsed.definition,
        reply: parsed.reply,
        ephemeral: parsed.ephemeral,
    })
}
