/*
 * This file is a part of the Patricia project
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

//! Configuration layering: command-line flags (`clap`, derive API),
//! `PATRICIA_*` environment variables, or an optional YAML file
//! (`serde` + `serde_yaml`), in that order of precedence. Using more than
//! one non-default source at once is a startup error rather than a silent
//! override, matching the teacher's `Configset::and_then` double-mutation
//! rule (there: a panic; here: a clean [`ConfigError`]).

#[cfg(test)]
mod tests;

use clap::Parser;
use serde::Deserialize;
use std::env;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1));
pub const DEFAULT_PORT: u16 = 5210;
pub const DEFAULT_BACKLOG: i32 = 50;
pub const DEFAULT_BUF_SIZE: usize = 1024;
pub const DEFAULT_MAX_EVENTS: usize = 10;
pub const DEFAULT_MAX_KEY_LEN: usize = 1024;
pub const DEFAULT_MAX_CONNECTIONS: usize = 10_000;

/// The server's fully resolved runtime configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub backlog: i32,
    pub buf_size: usize,
    pub max_events: usize,
    pub max_key_len: usize,
    pub max_connections: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST,
            port: DEFAULT_PORT,
            backlog: DEFAULT_BACKLOG,
            buf_size: DEFAULT_BUF_SIZE,
            max_events: DEFAULT_MAX_EVENTS,
            max_key_len: DEFAULT_MAX_KEY_LEN,
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

/// Command-line overrides.
#[derive(Parser, Debug, Default, Clone)]
#[command(name = "patriciad", about = "An ordered key/value store over TCP")]
pub struct Cli {
    #[arg(long)]
    pub host: Option<IpAddr>,
    #[arg(long)]
    pub port: Option<u16>,
    #[arg(long)]
    pub backlog: Option<i32>,
    /// Path to a YAML config file. Mutually exclusive with every other flag
    /// above and with the `PATRICIA_*` environment variables.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    fn has_field_overrides(&self) -> bool {
        self.host.is_some() || self.port.is_some() || self.backlog.is_some()
    }
}

/// The subset of [`Config`]'s fields a single source (file or environment)
/// may supply; absent fields fall back to [`Config::default`].
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct Overrides {
    host: Option<IpAddr>,
    port: Option<u16>,
    backlog: Option<i32>,
    buf_size: Option<usize>,
    max_events: Option<usize>,
    max_key_len: Option<usize>,
    max_connections: Option<usize>,
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
    Conflict(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "error reading config file: {e}"),
            Self::Yaml(e) => write!(f, "invalid config file: {e}"),
            Self::Conflict(msg) => write!(f, "conflicting configuration sources: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml(e)
    }
}

const ENV_HOST: &str = "PATRICIA_HOST";
const ENV_PORT: &str = "PATRICIA_PORT";
const ENV_BACKLOG: &str = "PATRICIA_BACKLOG";

fn env_var<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_active() -> bool {
    [ENV_HOST, ENV_PORT, ENV_BACKLOG]
        .iter()
        .any(|k| env::var(k).is_ok())
}

fn env_overrides() -> Overrides {
    Overrides {
        host: env_var(ENV_HOST),
        port: env_var(ENV_PORT),
        backlog: env_var(ENV_BACKLOG),
        ..Default::default()
    }
}

fn apply(cfg: &mut Config, over: Overrides) {
    if let Some(v) = over.host {
        cfg.host = v;
    }
    if let Some(v) = over.port {
        cfg.port = v;
    }
    if let Some(v) = over.backlog {
        cfg.backlog = v;
    }
    if let Some(v) = over.buf_size {
        cfg.buf_size = v;
    }
    if let Some(v) = over.max_events {
        cfg.max_events = v;
    }
    if let Some(v) = over.max_key_len {
        cfg.max_key_len = v;
    }
    if let Some(v) = over.max_connections {
        cfg.max_connections = v;
    }
}

/// Parse `std::env::args` and resolve the final [`Config`].
pub fn load() -> Result<Config, ConfigError> {
    resolve(Cli::parse())
}

/// Resolve a [`Config`] from an already-parsed [`Cli`] (split out from
/// [`load`] so the precedence/conflict logic is testable without touching
/// real process argv).
pub fn resolve(cli: Cli) -> Result<Config, ConfigError> {
    let file_active = cli.config.is_some();
    let cli_active = cli.has_field_overrides();
    let from_env = env_active();

    if [file_active, cli_active, from_env]
        .iter()
        .filter(|active| **active)
        .count()
        > 1
    {
        return Err(ConfigError::Conflict(
            "use only one of: command-line flags, PATRICIA_* environment variables, or --config",
        ));
    }

    let mut cfg = Config::default();
    if let Some(path) = &cli.config {
        let text = std::fs::read_to_string(path)?;
        apply(&mut cfg, serde_yaml::from_str(&text)?);
    } else if from_env {
        apply(&mut cfg, env_overrides());
    } else if cli_active {
        apply(
            &mut cfg,
            Overrides {
                host: cli.host,
                port: cli.port,
                backlog: cli.backlog,
                ..Default::default()
            },
        );
    }
    Ok(cfg)
}
