use std::path::PathBuf;

use etcetera::{BaseStrategy, choose_base_strategy};

/// Name of the configuration file looked up in the user and project directories
pub const CONFIG_FILE_NAME: &str = "wheelpyc.toml";

/// Per-user configuration file, e.g. `~/.config/wheelpyc/wheelpyc.toml`
pub fn user_config_file() -> Option<PathBuf> {
    let strategy = choose_base_strategy().ok()?;
    Some(strategy.config_dir().join("wheelpyc").join(CONFIG_FILE_NAME))
}
