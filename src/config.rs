//! Runtime settings: defaults, then an optional TOML file, then
//! `EMOTIV_SERVOS_*` environment variables. The engine endpoints are fixed
//! and not part of the settings.

use std::path::Path;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::device::LinkConfig;

/// Prefix of the environment variables read by [`Settings::load`].
pub const ENV_PREFIX: &str = "EMOTIV_SERVOS_";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    /// Longest wait for the engine to accept a connection.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Longest wait for event bytes on each `ler`.
    #[serde(default = "default_poll_window_ms")]
    pub poll_window_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            poll_window_ms: default_poll_window_ms(),
        }
    }
}

fn default_connect_timeout_ms() -> u64 {
    3000
}
fn default_poll_window_ms() -> u64 {
    100
}

impl Settings {
    /// Layers defaults, the file at `path` (if given and present) and the
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
            .map_err(|err| Box::new(err).into())
    }

    pub fn link_config(&self) -> LinkConfig {
        LinkConfig::default()
            .with_connect_timeout(Duration::from_millis(self.connect_timeout_ms))
            .with_poll_window(Duration::from_millis(self.poll_window_ms))
    }
}
