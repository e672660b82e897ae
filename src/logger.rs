//! Structured logging for the client
//!
//! - Log levels (ERROR, WARN, INFO, DEBUG, TRACE)
//! - Human-readable lines in development, JSON lines in production
//! - Size-based file rotation under `<data dir>/logs/`
//! - Redaction of sensitive fields (token, password, ...) before anything
//!   reaches disk or stdout

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use crate::config::LoggingConfig;

/// Log levels following RFC 5424
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "TRACE" => LogLevel::Trace,
            "DEBUG" => LogLevel::Debug,
            "INFO" => LogLevel::Info,
            "WARN" => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}

/// One structured log line
#[derive(Debug, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub target: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Main logger instance
pub struct Logger {
    config: LoggingConfig,
    level: LogLevel,
    log_dir: PathBuf,
    current_file: Mutex<Option<BufWriter<File>>>,
}

impl Logger {
    /// Initialize the logger, creating the log directory if needed
    pub fn init(app_data_dir: &Path, config: LoggingConfig) -> Result<Self, String> {
        let log_dir = app_data_dir.join("logs");

        std::fs::create_dir_all(&log_dir)
            .map_err(|e| format!("No se pudo crear el directorio de logs: {}", e))?;

        let logger = Self {
            level: LogLevel::parse(&config.level),
            config,
            log_dir,
            current_file: Mutex::new(None),
        };

        logger.open_log_file()?;

        Ok(logger)
    }

    fn log_file_path(&self) -> PathBuf {
        let date = Local::now().format("%Y-%m-%d");
        self.log_dir.join(format!("app-{}.log", date))
    }

    /// Rotate the current log file if it exceeds the size limit, then (re)open it
    fn open_log_file(&self) -> Result<(), String> {
        let log_path = self.log_file_path();

        if let Ok(metadata) = std::fs::metadata(&log_path) {
            let max_size = self.config.max_file_size_mb * 1024 * 1024;
            if metadata.len() >= max_size {
                // Shift app-X.log -> app-X.1.log -> app-X.2.log ... dropping the oldest
                let date = Local::now().format("%Y-%m-%d").to_string();
                let oldest = self.log_dir.join(format!("app-{}.{}.log", date, self.config.max_log_files));
                if oldest.exists() {
                    let _ = std::fs::remove_file(&oldest);
                }
                for i in (1..self.config.max_log_files).rev() {
                    let from = self.log_dir.join(format!("app-{}.{}.log", date, i));
                    if from.exists() {
                        let to = self.log_dir.join(format!("app-{}.{}.log", date, i + 1));
                        let _ = std::fs::rename(&from, &to);
                    }
                }
                let _ = std::fs::rename(&log_path, self.log_dir.join(format!("app-{}.1.log", date)));
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .map_err(|e| format!("No se pudo abrir el archivo de log: {}", e))?;

        *self.current_file.lock().unwrap() = Some(BufWriter::new(file));

        Ok(())
    }

    /// Write a log entry (already filtered by level)
    fn write(&self, entry: &LogEntry) {
        if entry.level > self.level {
            return;
        }

        let log_line = if self.config.json_format {
            serde_json::to_string(entry).unwrap_or_else(|_| "{}".to_string())
        } else {
            format!(
                "{} [{}] [{}] {}{}{}",
                entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
                entry.level.as_str(),
                entry.target,
                entry.message,
                entry
                    .data
                    .as_ref()
                    .map(|d| format!(" | {}", d))
                    .unwrap_or_default(),
                entry
                    .error
                    .as_ref()
                    .map(|e| format!(" | error: {}", e))
                    .unwrap_or_default()
            )
        };

        if self.config.log_to_stdout {
            match entry.level {
                LogLevel::Error | LogLevel::Warn => eprintln!("{}", log_line),
                _ => println!("{}", log_line),
            }
        }

        if self.config.log_to_file {
            if let Ok(mut guard) = self.current_file.lock() {
                if let Some(writer) = guard.as_mut() {
                    let _ = writeln!(writer, "{}", log_line);
                    let _ = writer.flush();
                }
            }
        }
    }

    pub fn error(&self, target: &'static str, message: &str, error: Option<&str>) {
        self.write(&LogEntry {
            timestamp: Local::now(),
            level: LogLevel::Error,
            target,
            message: message.to_string(),
            data: None,
            error: error.map(String::from),
        });
    }

    pub fn warn(&self, target: &'static str, message: &str) {
        self.write(&LogEntry {
            timestamp: Local::now(),
            level: LogLevel::Warn,
            target,
            message: message.to_string(),
            data: None,
            error: None,
        });
    }

    pub fn info(&self, target: &'static str, message: &str, data: Option<serde_json::Value>) {
        self.write(&LogEntry {
            timestamp: Local::now(),
            level: LogLevel::Info,
            target,
            message: message.to_string(),
            data: data.map(redact_sensitive),
            error: None,
        });
    }

    pub fn debug(&self, target: &'static str, message: &str, data: Option<serde_json::Value>) {
        self.write(&LogEntry {
            timestamp: Local::now(),
            level: LogLevel::Debug,
            target,
            message: message.to_string(),
            data: data.map(redact_sensitive),
            error: None,
        });
    }
}

/// Redact values under keys that look like credentials
fn redact_sensitive(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(mut map) => {
            for (key, val) in map.iter_mut() {
                let k = key.to_lowercase();
                if k.contains("token") || k.contains("password") || k.contains("secret") {
                    *val = serde_json::Value::String("***REDACTED***".to_string());
                } else {
                    *val = redact_sensitive(val.clone());
                }
            }
            serde_json::Value::Object(map)
        }
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(redact_sensitive).collect())
        }
        _ => value,
    }
}

/// Global logger instance
static GLOBAL_LOGGER: OnceLock<Logger> = OnceLock::new();

/// Initialize the global logger
pub fn init_global_logger(app_data_dir: &Path, config: LoggingConfig) -> Result<(), String> {
    let logger = Logger::init(app_data_dir, config)?;

    GLOBAL_LOGGER
        .set(logger)
        .map_err(|_| "Logger ya inicializado")?;

    Ok(())
}

/// Get the global logger instance
pub fn get_logger() -> Option<&'static Logger> {
    GLOBAL_LOGGER.get()
}

/// Convenience macros for logging
#[macro_export]
macro_rules! log_error {
    ($target:expr, $msg:expr) => {
        if let Some(l) = $crate::logger::get_logger() {
            l.error($target, $msg, None);
        }
    };
    ($target:expr, $msg:expr, $err:expr) => {
        if let Some(l) = $crate::logger::get_logger() {
            l.error($target, $msg, Some(&$err));
        }
    };
}

#[macro_export]
macro_rules! log_warn {
    ($target:expr, $msg:expr) => {
        if let Some(l) = $crate::logger::get_logger() {
            l.warn($target, $msg);
        }
    };
}

#[macro_export]
macro_rules! log_info {
    ($target:expr, $msg:expr) => {
        if let Some(l) = $crate::logger::get_logger() {
            l.info($target, $msg, None);
        }
    };
    ($target:expr, $msg:expr, $data:expr) => {
        if let Some(l) = $crate::logger::get_logger() {
            l.info($target, $msg, Some($data));
        }
    };
}

#[macro_export]
macro_rules! log_debug {
    ($target:expr, $msg:expr) => {
        if let Some(l) = $crate::logger::get_logger() {
            l.debug($target, $msg, None);
        }
    };
    ($target:expr, $msg:expr, $data:expr) => {
        if let Some(l) = $crate::logger::get_logger() {
            l.debug($target, $msg, Some($data));
        }
    };
}
