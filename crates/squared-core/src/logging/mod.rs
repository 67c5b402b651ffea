// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Logging setup for applications built on the engine.
//!
//! Every crate logs through the `log` facade. This module installs an
//! `env_logger` backend whose line layout follows a small pattern language
//! that can be swapped at runtime through the returned [`LogHandle`]:
//!
//! | Token | Expands to |
//! |---|---|
//! | `%Y` | timestamp |
//! | `%l` | level |
//! | `%n` | logger target |
//! | `%v` | message |
//! | `%%` | a literal `%` |

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, RwLock};

use env_logger::{Builder, Env};
use serde::{Deserialize, Serialize};

/// The pattern used when none is configured.
pub const DEFAULT_PATTERN: &str = "[%Y] [%l] %v";

/// Prefix carried by messages logged through [`critical!`](crate::critical).
pub const CRITICAL_MARKER: &str = "[CRITICAL]";

/// Logs at error level with the [`CRITICAL_MARKER`] prefix.
#[macro_export]
macro_rules! critical {
    ($($arg:tt)+) => {
        $crate::__log::error!("{} {}", $crate::logging::CRITICAL_MARKER, format_args!($($arg)+))
    };
}

/// Errors raised while configuring the logger.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// A global logger was already installed.
    #[error("a logger is already installed: {0}")]
    AlreadyInitialized(#[from] log::SetLoggerError),
    /// The pattern contains a `%` sequence that is not a known token.
    #[error("unknown pattern token '%{0}'")]
    UnknownToken(char),
    /// The pattern ends with a lone `%`.
    #[error("pattern ends with a dangling '%'")]
    DanglingPercent,
}

/// The engine's level taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Very verbose diagnostics.
    Trace,
    /// Diagnostics useful while developing.
    Debug,
    /// Lifecycle information.
    #[default]
    Info,
    /// Recoverable structural problems.
    Warn,
    /// Failures.
    Error,
    /// Failures that end the application. Filtered like [`LogLevel::Error`].
    Critical,
}

impl LogLevel {
    /// Returns the matching `log` filter.
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error | LogLevel::Critical => log::LevelFilter::Error,
        }
    }

    fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

/// Logger settings. `RUST_LOG` takes precedence over `level` when set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Minimum level written.
    pub level: LogLevel,
    /// Line layout, see the module documentation.
    pub pattern: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            pattern: DEFAULT_PATTERN.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Timestamp,
    Level,
    Target,
    Message,
}

/// A parsed line layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    tokens: Vec<Token>,
}

impl Pattern {
    /// Parses `source`, rejecting unknown `%` sequences.
    pub fn parse(source: &str) -> Result<Self, LoggingError> {
        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars();

        while let Some(c) = chars.next() {
            if c != '%' {
                literal.push(c);
                continue;
            }
            let token = match chars.next() {
                Some('%') => {
                    literal.push('%');
                    continue;
                }
                Some('Y') => Token::Timestamp,
                Some('l') => Token::Level,
                Some('n') => Token::Target,
                Some('v') => Token::Message,
                Some(other) => return Err(LoggingError::UnknownToken(other)),
                None => return Err(LoggingError::DanglingPercent),
            };
            if !literal.is_empty() {
                tokens.push(Token::Literal(std::mem::take(&mut literal)));
            }
            tokens.push(token);
        }
        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }

        Ok(Self {
            source: source.to_owned(),
            tokens,
        })
    }

    /// Returns the pattern text this was parsed from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Writes one formatted line body (without the trailing newline).
    pub fn render(
        &self,
        out: &mut dyn Write,
        timestamp: &dyn fmt::Display,
        level: log::Level,
        target: &str,
        message: &fmt::Arguments<'_>,
    ) -> io::Result<()> {
        for token in &self.tokens {
            match token {
                Token::Literal(text) => out.write_all(text.as_bytes())?,
                Token::Timestamp => write!(out, "{timestamp}")?,
                Token::Level => write!(out, "{level}")?,
                Token::Target => out.write_all(target.as_bytes())?,
                Token::Message => write!(out, "{message}")?,
            }
        }
        Ok(())
    }
}

impl Default for Pattern {
    fn default() -> Self {
        Self {
            source: DEFAULT_PATTERN.to_owned(),
            tokens: vec![
                Token::Literal("[".to_owned()),
                Token::Timestamp,
                Token::Literal("] [".to_owned()),
                Token::Level,
                Token::Literal("] ".to_owned()),
                Token::Message,
            ],
        }
    }
}

/// Handle to the installed logger's layout.
#[derive(Debug, Clone)]
pub struct LogHandle {
    pattern: Arc<RwLock<Pattern>>,
}

impl LogHandle {
    /// Replaces the layout used for every following line.
    pub fn set_pattern(&self, pattern: &str) -> Result<(), LoggingError> {
        let parsed = Pattern::parse(pattern)?;
        let mut guard = self.pattern.write().unwrap_or_else(|e| e.into_inner());
        *guard = parsed;
        Ok(())
    }

    /// Returns the current layout text.
    pub fn pattern(&self) -> String {
        let guard = self.pattern.read().unwrap_or_else(|e| e.into_inner());
        guard.as_str().to_owned()
    }
}

/// Installs the global logger.
///
/// Fails if the pattern is invalid or a logger is already installed.
pub fn init(config: &LogConfig) -> Result<LogHandle, LoggingError> {
    let pattern = Arc::new(RwLock::new(Pattern::parse(&config.pattern)?));
    let handle = LogHandle {
        pattern: Arc::clone(&pattern),
    };

    Builder::from_env(Env::default().default_filter_or(config.level.as_filter_str()))
        .format(move |buf, record| {
            let timestamp = buf.timestamp();
            let guard = pattern.read().unwrap_or_else(|e| e.into_inner());
            guard.render(buf, &timestamp, record.level(), record.target(), record.args())?;
            writeln!(buf)
        })
        .try_init()?;

    log::debug!("Logger installed with pattern '{}'.", config.pattern);
    Ok(handle)
}
