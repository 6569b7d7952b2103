//! Which Steam games are assigned to a compatibility tool.

use std::path::Path;

use crate::SteamError;
use crate::vdf::{KeyValues, Value, load_vdf};

/// Result entry returned when the mapping file cannot be interpreted.
///
/// A tool is never reported as unused because of a parse error.
pub const MAPPING_UNAVAILABLE: &str = "-1";

/// Section path to the per-game tool table in `config.vdf`.
const COMPAT_TOOL_MAPPING_PATH: [&str; 5] = [
    "InstallConfigStore",
    "Software",
    "Valve",
    "Steam",
    "CompatToolMapping",
];

/// Returns the app IDs whose compatibility tool is `tool_name`.
///
/// `tool_name` is the internal name from the tool's
/// `compatibilitytool.vdf` (usually its folder name). If the mapping file
/// is missing or malformed, returns `["-1"]` instead of an empty list.
pub fn find_games_using_tool(tool_name: &str, mapping_file: &Path) -> Vec<String> {
    let path = compatkit_settings::expand_home(mapping_file);

    match load_vdf(&path).and_then(|kv| games_using_tool(&kv, tool_name)) {
        Ok(games) => games,
        Err(e) => {
            tracing::warn!(
                tool = tool_name,
                path = %path.display(),
                error = %e,
                "could not read Steam compat tool mapping"
            );
            vec![MAPPING_UNAVAILABLE.to_string()]
        }
    }
}

/// Returns true if `games` is the unavailable sentinel.
pub fn is_mapping_unavailable(games: &[String]) -> bool {
    matches!(games, [only] if only == MAPPING_UNAVAILABLE)
}

fn games_using_tool(config: &KeyValues, tool_name: &str) -> Result<Vec<String>, SteamError> {
    let mapping = config
        .section_at(&COMPAT_TOOL_MAPPING_PATH)
        .ok_or_else(|| SteamError::Vdf("CompatToolMapping section not found".into()))?;

    let mut games = Vec::new();
    for (app_id, entry) in mapping.iter() {
        let Value::Section(entry) = entry else {
            return Err(SteamError::Vdf(format!(
                "mapping entry for app {app_id} is not a section"
            )));
        };
        if entry.string("name") == Some(tool_name) {
            games.push(app_id.to_string());
        }
    }

    Ok(games)
}
