//! Launcher logging
//!
//! Writes levelled, timestamped lines to `<config dir>/logs/` and the console,
//! preceded by a short system information header.

use chrono::Local;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::process::Command;
use std::sync::{Arc, OnceLock};

static LOGGER: OnceLock<Arc<Mutex<LauncherLogger>>> = OnceLock::new();

// ============================================================================
// System Information Detection
// ============================================================================

#[derive(Debug, Clone)]
pub struct SystemInfo {
    pub app_version: String,
    pub os: String,
    pub kernel: String,
    pub wine: String,
}

impl SystemInfo {
    pub fn detect() -> Self {
        Self {
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            os: detect_os(),
            kernel: detect_kernel(),
            wine: detect_wine(),
        }
    }

    pub fn to_log_header(&self) -> String {
        format!(
r#"================================================================================
W3LF Log - {}
================================================================================
Application:   w3lf v{}
System Info:
  OS:          {}
  Kernel:      {}
  Wine:        {}
================================================================================
"#,
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            self.app_version,
            self.os,
            self.kernel,
            self.wine,
        )
    }
}

fn detect_os() -> String {
    if let Ok(file) = File::open("/etc/os-release") {
        let reader = BufReader::new(file);
        for line in reader.lines().map_while(Result::ok) {
            if line.starts_with("PRETTY_NAME=") {
                return line
                    .trim_start_matches("PRETTY_NAME=")
                    .trim_matches('"')
                    .to_string();
            }
        }
    }
    std::env::consts::OS.to_string()
}

fn detect_kernel() -> String {
    if let Ok(output) = Command::new("uname").arg("-r").output() {
        if output.status.success() {
            return String::from_utf8_lossy(&output.stdout).trim().to_string();
        }
    }
    "Unknown".to_string()
}

fn detect_wine() -> String {
    if cfg!(windows) {
        return "native".to_string();
    }
    let wine = crate::runtime_wrap::wine_binary();
    if wine.is_relative() && crate::runtime_wrap::find_in_path(&wine.to_string_lossy()).is_none() {
        return "Not found".to_string();
    }
    if let Ok(output) = Command::new(&wine).arg("--version").output() {
        if output.status.success() {
            // "wine-9.0 (Staging)"
            return String::from_utf8_lossy(&output.stdout).trim().to_string();
        }
    }
    "Not found".to_string()
}

// ============================================================================
// Log Levels
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogLevel {
    Info,
    Action, // User actions (CLI commands)
    Registry,
    Launch,
    Warning,
    Error,
}

impl LogLevel {
    pub fn prefix(&self) -> &'static str {
        match self {
            LogLevel::Info => "[INFO]",
            LogLevel::Action => "[ACTION]",
            LogLevel::Registry => "[REGISTRY]",
            LogLevel::Launch => "[LAUNCH]",
            LogLevel::Warning => "[WARNING]",
            LogLevel::Error => "[ERROR]",
        }
    }
}

// ============================================================================
// Launcher Logger
// ============================================================================

pub struct LauncherLogger {
    log_file: Option<File>,
}

impl LauncherLogger {
    pub fn new() -> Self {
        // Unit tests log to the console only
        let log_file = if cfg!(test) { None } else { Self::open_log_file() };

        let mut logger = Self { log_file };

        let header = SystemInfo::detect().to_log_header();
        logger.write_raw(&header);

        logger
    }

    fn open_log_file() -> Option<File> {
        let log_dir = crate::w3lf_path!("logs");
        let _ = fs::create_dir_all(&log_dir);

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let log_path = log_dir.join(format!("w3lf_{}.log", timestamp));

        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .ok()
    }

    fn write_raw(&mut self, msg: &str) {
        if let Some(ref mut file) = self.log_file {
            let _ = writeln!(file, "{}", msg);
            let _ = file.flush();
        }

        // Console output goes to stderr so stdout stays clean for command output
        eprintln!("{}", msg);
    }

    pub fn log(&mut self, level: LogLevel, message: &str) {
        let timestamp = Local::now().format("%H:%M:%S");
        let formatted = format!("[{}] {} {}", timestamp, level.prefix(), message);
        self.write_raw(&formatted);
    }
}

impl Default for LauncherLogger {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Global Logger Access
// ============================================================================

/// Initialize the global logger (call once at startup)
pub fn init_logger() {
    LOGGER.get_or_init(|| Arc::new(Mutex::new(LauncherLogger::new())));
}

fn logger() -> Arc<Mutex<LauncherLogger>> {
    LOGGER
        .get_or_init(|| Arc::new(Mutex::new(LauncherLogger::new())))
        .clone()
}

// ============================================================================
// Convenience Logging Functions
// ============================================================================

pub fn log_info(message: &str) {
    logger().lock().log(LogLevel::Info, message);
}

pub fn log_action(message: &str) {
    logger().lock().log(LogLevel::Action, message);
}

pub fn log_registry(message: &str) {
    logger().lock().log(LogLevel::Registry, message);
}

pub fn log_launch(message: &str) {
    logger().lock().log(LogLevel::Launch, message);
}

pub fn log_warning(message: &str) {
    logger().lock().log(LogLevel::Warning, message);
}

pub fn log_error(message: &str) {
    logger().lock().log(LogLevel::Error, message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_names_launcher_and_wine() {
        let info = SystemInfo {
            app_version: "2.1.0".to_string(),
            os: "Debian GNU/Linux 12".to_string(),
            kernel: "6.1.0".to_string(),
            wine: "wine-9.0".to_string(),
        };
        let header = info.to_log_header();
        assert!(header.contains("w3lf v2.1.0"));
        assert!(header.contains("Wine:        wine-9.0"));
    }

    #[test]
    fn registry_and_launch_lines_are_tagged() {
        assert_eq!(LogLevel::Registry.prefix(), "[REGISTRY]");
        assert_eq!(LogLevel::Launch.prefix(), "[LAUNCH]");
    }

    #[test]
    fn tests_do_not_write_log_files() {
        let mut logger = LauncherLogger::new();
        logger.log(LogLevel::Info, "console only");
        assert!(logger.log_file.is_none());
    }
}
