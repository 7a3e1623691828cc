//! Server Settings
//!
//! The settings the reactor reads once at startup: where to listen and how
//! large its per-cycle resources are. Settings come from command-line
//! arguments; anything not given keeps its default.
//!
//! ## Example
//!
//! ```
//! use kvreactor::config::{ParsedArgs, ServerSettings};
//!
//! let args = ["--port", "6380", "--poll-timeout-ms", "0"];
//! let ParsedArgs::Run(settings) = ServerSettings::from_args(args).unwrap() else {
//!     panic!("expected settings");
//! };
//! assert_eq!(settings.port(), 6380);
//! assert_eq!(settings.poll_timeout, None);
//! ```

use std::time::Duration;

/// Default capacity of the shared read buffer, in bytes.
pub const DEFAULT_READ_BUFFER_CAPACITY: usize = 1024;

/// Default number of readiness events fetched per poll.
pub const DEFAULT_EVENTS_CAPACITY: usize = 1024;

/// Default upper bound on one blocking poll.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Reactor configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Host to bind to
    pub host: String,
    /// Port to listen on (0 picks an ephemeral port)
    pub port: u16,
    /// Capacity of the read buffer shared by all connections
    pub read_buffer_capacity: usize,
    /// Maximum readiness events handled per poll cycle
    pub events_capacity: usize,
    /// Upper bound on a blocking poll; `None` blocks until something is ready
    pub poll_timeout: Option<Duration>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: crate::DEFAULT_HOST.to_string(),
            port: crate::DEFAULT_PORT,
            read_buffer_capacity: DEFAULT_READ_BUFFER_CAPACITY,
            events_capacity: DEFAULT_EVENTS_CAPACITY,
            poll_timeout: Some(DEFAULT_POLL_TIMEOUT),
        }
    }
}

/// Outcome of parsing the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedArgs {
    /// Start the server with these settings
    Run(ServerSettings),
    /// `--help` was requested
    Help,
    /// `--version` was requested
    Version,
}

/// Errors produced while parsing settings.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} requires a value")]
    MissingValue(&'static str),

    #[error("invalid value '{value}' for {flag}")]
    InvalidValue { flag: &'static str, value: String },

    #[error("unknown argument: {0}")]
    UnknownArgument(String),
}

impl ServerSettings {
    /// Settings for an ephemeral port on localhost.
    pub fn ephemeral() -> Self {
        Self {
            port: 0,
            ..Self::default()
        }
    }

    /// The configured port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Parses settings from command-line arguments (without the program name).
    pub fn from_args<I, S>(args: I) -> Result<ParsedArgs, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut settings = ServerSettings::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_ref() {
                "--host" | "-h" => {
                    settings.host = next_value(&mut args, "--host")?;
                }
                "--port" | "-p" => {
                    settings.port = parse_value(&mut args, "--port")?;
                }
                "--buffer-size" => {
                    settings.read_buffer_capacity = parse_nonzero(&mut args, "--buffer-size")?;
                }
                "--events" => {
                    settings.events_capacity = parse_nonzero(&mut args, "--events")?;
                }
                "--poll-timeout-ms" => {
                    let millis: u64 = parse_value(&mut args, "--poll-timeout-ms")?;
                    settings.poll_timeout = match millis {
                        0 => None,
                        ms => Some(Duration::from_millis(ms)),
                    };
                }
                "--help" => return Ok(ParsedArgs::Help),
                "--version" | "-v" => return Ok(ParsedArgs::Version),
                other => return Err(ConfigError::UnknownArgument(other.to_string())),
            }
        }

        Ok(ParsedArgs::Run(settings))
    }
}

fn next_value<I, S>(args: &mut I, flag: &'static str) -> Result<String, ConfigError>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    args.next()
        .map(|value| value.as_ref().to_string())
        .ok_or(ConfigError::MissingValue(flag))
}

fn parse_value<I, S, T>(args: &mut I, flag: &'static str) -> Result<T, ConfigError>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
    T: std::str::FromStr,
{
    let value = next_value(args, flag)?;
    value
        .parse()
        .map_err(|_| ConfigError::InvalidValue { flag, value })
}

fn parse_nonzero<I, S>(args: &mut I, flag: &'static str) -> Result<usize, ConfigError>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    match parse_value::<_, _, usize>(args, flag)? {
        0 => Err(ConfigError::InvalidValue {
            flag,
            value: "0".to_string(),
        }),
        n => Ok(n),
    }
}
