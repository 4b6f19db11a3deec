// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use anyhow::Result;
use serde::Deserialize;
use serde::Serialize;

pub const CONFIG_PATHS: [&str; 2] = ["/etc/trace_filter/config.toml", "/etc/trace_filter.toml"];

/// How a CPU set is printed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Cpulist,
    Hex,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "cpulist" => Ok(OutputFormat::Cpulist),
            "hex" => Ok(OutputFormat::Hex),
            _ => Err(format!("unknown output format {s:?}, expected cpulist or hex")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OutputFormat::Cpulist => write!(f, "cpulist"),
            OutputFormat::Hex => write!(f, "hex"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Extra verbose output.
    debug: Option<bool>,
    /// Format used to print CPU sets.
    format: Option<OutputFormat>,
    /// Print the visible trace rows after a commit.
    show_rows: Option<bool>,
}

impl Config {
    /// Extra verbose output.
    pub fn debug(&self) -> bool {
        self.debug.unwrap_or(false)
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.debug = Some(debug);
    }

    /// Format used to print CPU sets.
    pub fn format(&self) -> OutputFormat {
        self.format.unwrap_or_default()
    }

    pub fn set_format(&mut self, format: OutputFormat) {
        self.format = Some(format);
    }

    /// Print the visible trace rows after a commit.
    pub fn show_rows(&self) -> bool {
        self.show_rows.unwrap_or(true)
    }

    pub fn set_show_rows(&mut self, show_rows: bool) {
        self.show_rows = Some(show_rows);
    }

    /// Loads the config from a TOML file.
    pub fn load(path: &Path) -> Result<Config> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// Values set in `overrides` win over the ones in `self`.
    pub fn merge(&self, overrides: &Config) -> Config {
        Config {
            debug: overrides.debug.or(self.debug),
            format: overrides.format.or(self.format),
            show_rows: overrides.show_rows.or(self.show_rows),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let config_str = toml::to_string(self)?;
        fs::write(path, config_str)
            .with_context(|| format!("Failed to write config {}", path.display()))
    }
}

/// Load the first config file found in the system directories, otherwise fall
/// back to the defaults.
pub fn init_config() -> Result<Config> {
    match CONFIG_PATHS.iter().map(Path::new).find(|p| p.exists()) {
        Some(path) => Config::load(path),
        None => Ok(Config::default()),
    }
}
