//! Process configuration read from the environment.

use std::env;

use crate::error::Error;
use crate::logging::Format;

const DEFAULT_PORT: u16 = 8080;

/// Where the process is running. Decides cookie domain policy.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Environment {
    /// `CI=true`.
    Ci,
    /// `NAMESPACE=development`.
    Development,
    /// Anything else.
    #[default]
    Deployed,
}

impl Environment {
    fn detect(lookup: &impl Fn(&str) -> Option<String>) -> Self {
        if lookup("CI").is_some_and(|v| v.eq_ignore_ascii_case("true")) {
            Self::Ci
        } else if lookup("NAMESPACE").as_deref() == Some("development") {
            Self::Development
        } else {
            Self::Deployed
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    pub port: u16,
    pub server_name: Option<String>,
    pub environment: Environment,
    pub log_format: Format,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            server_name: None,
            environment: Environment::default(),
            log_format: Format::default(),
        }
    }
}

impl Config {
    /// Reads `PORT`, `SERVER_NAME`, `CI`, `NAMESPACE` and `LOG_FORMAT`.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Like [`from_env`](Config::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let present = |name| lookup(name).filter(|v: &String| !v.is_empty());

        let port = match present("PORT") {
            Some(port) => port.parse()?,
            None => DEFAULT_PORT,
        };

        let log_format = match present("LOG_FORMAT") {
            Some(format) => format.parse()?,
            None => Format::default(),
        };

        Ok(Self {
            port,
            server_name: present("SERVER_NAME"),
            environment: Environment::detect(&lookup),
            log_format,
        })
    }

    /// `0.0.0.0:<port>`.
    pub fn address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}
