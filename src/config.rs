//! Environment configuration.
//!
//! | Variable        | Required | Meaning                                        |
//! |-----------------|----------|------------------------------------------------|
//! | `HOST`          | yes      | address to bind                                |
//! | `PORT`          | yes      | port to bind                                   |
//! | `BOT_ROUTE`     | yes      | route pattern of the Telegram webhook          |
//! | `WRITE_TO_FILE` | no       | non-zero integer enables fixture recording     |
//! | `FIXTURE_DIR`   | no       | where fixtures go, default `tests/data/server` |

use std::path::PathBuf;

use crate::error::ConfigError;
use crate::recorder::Recorder;

pub const DEFAULT_FIXTURE_DIR: &str = "tests/data/server";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub bot_route: String,
    pub write_to_file: bool,
    pub fixture_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));

        let host = required("HOST")?;
        let port = required("PORT")?;
        let port = port
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::NotAnInteger { name: "PORT", value: port })?;
        let bot_route = required("BOT_ROUTE")?;

        let write_to_file = match lookup("WRITE_TO_FILE") {
            Some(value) => {
                value
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| ConfigError::NotAnInteger { name: "WRITE_TO_FILE", value })?
                    != 0
            }
            None => false,
        };
        let fixture_dir = lookup("FIXTURE_DIR").map_or_else(|| PathBuf::from(DEFAULT_FIXTURE_DIR), PathBuf::from);

        Ok(Self { host, port, bot_route, write_to_file, fixture_dir })
    }

    pub fn recorder(&self) -> Recorder {
        if self.write_to_file { Recorder::new(&self.fixture_dir) } else { Recorder::disabled() }
    }
}
