//! Configuration schema definitions

use std::collections::HashMap;
use std::path::PathBuf;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (text, json)
    pub format: String,
    /// Directory for log files; `None` disables the file layer
    pub dir: Option<PathBuf>,
    /// Module-specific overrides; transport crates are kept quiet by default
    pub overrides: HashMap<String, String>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl LoggingConfig {
    /// Default settings writing log files into `dir`
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            ..Self::default()
        }
    }

    /// Raise the level to debug when running verbosely
    pub fn verbose(mut self, verbose: bool) -> Self {
        if verbose {
            self.level = "debug".to_string();
        }
        self
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: None,
            overrides: HashMap::from([
                ("hyper".to_string(), "warn".to_string()),
                ("rustls".to_string(), "warn".to_string()),
            ]),
        }
    }
}
