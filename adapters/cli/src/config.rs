//! Optional TOML settings file.

use std::{fs, path::Path, time::Duration};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tower_duel_network::{discovery::DISCOVERY_PORT, session::DEFAULT_GAME_PORT, SessionConfig};

const DEFAULT_TICK_RATE: u32 = 60;

/// Settings read from `--config`, with defaults for everything omitted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Config {
    /// Networking settings.
    pub(crate) session: SessionSettings,
    /// Frame loop settings.
    pub(crate) simulation: SimulationSettings,
}

/// The `[session]` table.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct SessionSettings {
    /// TCP port the host listens on.
    pub(crate) game_port: u16,
    /// UDP port discovery requests are sent to.
    pub(crate) discovery_port: u16,
    /// Name a host advertises on the LAN.
    pub(crate) host_name: String,
    /// Empty accept polls before a host gives up.
    pub(crate) accept_attempt_limit: Option<u32>,
    /// Milliseconds a client waits for the host to answer.
    pub(crate) connect_timeout_ms: Option<u64>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            game_port: DEFAULT_GAME_PORT,
            discovery_port: DISCOVERY_PORT,
            host_name: "tower-duel".to_owned(),
            accept_attempt_limit: None,
            connect_timeout_ms: None,
        }
    }
}

/// The `[simulation]` table.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct SimulationSettings {
    /// Frames per second of the fixed-step loop.
    pub(crate) tick_rate: u32,
    /// Seed for the match's random source.
    pub(crate) seed: u64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            tick_rate: DEFAULT_TICK_RATE,
            seed: 0,
        }
    }
}

impl Config {
    /// Reads the file when one is given, otherwise returns the defaults.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    fn parse(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).context("failed to parse config toml")?;
        if config.simulation.tick_rate == 0 {
            bail!("simulation.tick_rate must be at least 1");
        }
        Ok(config)
    }

    /// Session tunables derived from the `[session]` table.
    pub(crate) fn session_config(&self) -> SessionConfig {
        SessionConfig {
            accept_attempt_limit: self.session.accept_attempt_limit,
            connect_timeout: self.session.connect_timeout_ms.map(Duration::from_millis),
            ..SessionConfig::default()
        }
    }
}
