//! Engine configuration loaded from TOML and overlaid with command-line flags.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use tile_cascade_core::EngineConfig;

/// Reads an [`EngineConfig`] from `path`, or returns the defaults when no file is given.
///
/// Keys missing from the file keep their default values.
pub(crate) fn load(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    parse(&text).with_context(|| format!("failed to parse config file {}", path.display()))
}

fn parse(text: &str) -> Result<EngineConfig> {
    Ok(toml::from_str(text)?)
}

/// Flag values that take precedence over the file.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Overrides {
    pub(crate) rows: Option<u32>,
    pub(crate) columns: Option<u32>,
    pub(crate) token_types: Option<u8>,
    pub(crate) move_limit: Option<u32>,
}

impl Overrides {
    pub(crate) fn apply(self, mut config: EngineConfig) -> EngineConfig {
        if let Some(rows) = self.rows {
            config.rows = rows;
        }
        if let Some(columns) = self.columns {
            config.columns = columns;
        }
        if let Some(token_types) = self.token_types {
            config.token_type_count = token_types;
        }
        if self.move_limit.is_some() {
            config.move_limit = self.move_limit;
        }
        config
    }
}
