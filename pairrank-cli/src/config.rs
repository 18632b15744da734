/// Config file loading and creation for the pairrank CLI.
///
/// Config lives at ~/.config/pairrank/config.toml.
/// All fields are optional. CLI args override config values.
use pairrank_core::Solver;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::bail;

#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PairrankConfig {
    pub items_per_design: Option<usize>,
    pub block_size: Option<usize>,
    pub appearances: Option<usize>,
    pub sampling_limit: Option<u64>,
    pub mean: Option<f64>,
    pub tolerance: Option<f64>,
    pub solver: Option<Solver>,
}

const DEFAULT_CONFIG_TEMPLATE: &str = "\
# pairrank configuration
# All values here can be overridden by CLI flags.

# Candidate items drawn for each design
# items_per_design = 12

# Items shown together in one block
# block_size = 3

# Minimum blocks each drawn item appears in
# appearances = 2

# Sample count at which an item stops being preferred over others
# sampling_limit = 5

# Target mean score of the ranking
# mean = 1.0

# Relative residual tolerance of the iterative solver
# tolerance = 1e-12

# Linear solver: \"gmres\" or \"direct\"
# solver = \"gmres\"
";

/// Returns the default config path: ~/.config/pairrank/config.toml
pub fn config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| bail("HOME environment variable not set"));
    PathBuf::from(home).join(".config").join("pairrank").join("config.toml")
}

/// Load config from a file path. Returns default (all None) if file doesn't exist.
pub fn load_config(path: &Path) -> PairrankConfig {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_config(&content)
            .unwrap_or_else(|e| bail(format!("Failed to parse config at {}: {e}", path.display()))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => PairrankConfig::default(),
        Err(e) => bail(format!("Failed to read config at {}: {e}", path.display())),
    }
}

fn parse_config(content: &str) -> Result<PairrankConfig, toml::de::Error> {
    toml::from_str(content)
}

/// Create the default config file. Errors if it already exists.
pub fn create_default_config() -> PathBuf {
    let path = config_path();

    if path.exists() {
        bail(format!("Config file already exists at {}", path.display()));
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .unwrap_or_else(|e| bail(format!("Failed to create directory {}: {e}", parent.display())));
    }

    std::fs::write(&path, DEFAULT_CONFIG_TEMPLATE)
        .unwrap_or_else(|e| bail(format!("Failed to write config to {}: {e}", path.display())));

    path
}
