//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{NavLoggerError, Result};
use crate::igc::protocol::DEFAULT_MANUFACTURER;

/// Baud rates accepted for instrument ports
pub const SUPPORTED_BAUD_RATES: [u32; 6] = [4800, 9600, 19200, 38400, 57600, 115200];

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub ports: Vec<PortConfig>,

    #[serde(default)]
    pub logger: LoggerConfig,

    #[serde(default)]
    pub pilot: PilotIdentity,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// One serial device
#[derive(Debug, Deserialize, Clone)]
pub struct PortConfig {
    /// Display name used in logs and messages
    #[serde(default = "default_port_name")]
    pub name: String,

    pub path: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Flight recorder configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Request recording as soon as the process starts
    #[serde(default = "default_true")]
    pub auto_start: bool,

    /// Primary directory, searched first when reclaiming space
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory flight logs are written to
    #[serde(default = "default_igc_dir")]
    pub log_dir: PathBuf,

    /// Use `YMDXAAAF.IGC` names instead of `YYYY-MM-DD-MFG-AAA-NN.IGC`
    #[serde(default)]
    pub short_file_names: bool,

    #[serde(default = "default_manufacturer")]
    pub manufacturer: String,

    #[serde(default = "default_min_free_kb")]
    pub min_free_kb: u64,

    #[serde(default = "default_max_reclaim_attempts")]
    pub max_reclaim_attempts: u32,

    /// Metres; a non-zero offset makes the recorder log GNSS altitude as 0
    #[serde(default)]
    pub gps_altitude_offset: f64,

    /// Sidecar file in `log_dir` whose `$` lines become header remarks
    #[serde(default = "default_extra_headers_file")]
    pub extra_headers_file: String,
}

/// Pilot, aircraft and competition identity used by headers and declarations
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct PilotIdentity {
    #[serde(default)]
    pub pilot_name: String,

    #[serde(default)]
    pub aircraft_type: String,

    #[serde(default)]
    pub aircraft_rego: String,

    #[serde(default)]
    pub competition_class: String,

    #[serde(default)]
    pub competition_id: String,
}

/// Diagnostic logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,

    /// Startup diagnostic trail file name inside `dir`
    #[serde(default = "default_log_file")]
    pub file: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            auto_start: default_true(),
            data_dir: default_data_dir(),
            log_dir: default_igc_dir(),
            short_file_names: false,
            manufacturer: default_manufacturer(),
            min_free_kb: default_min_free_kb(),
            max_reclaim_attempts: default_max_reclaim_attempts(),
            gps_altitude_offset: 0.0,
            extra_headers_file: default_extra_headers_file(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: default_log_dir(),
            file: default_log_file(),
        }
    }
}

// Default value functions
fn default_true() -> bool { true }

fn default_port_name() -> String { "GPS".to_string() }
fn default_baud_rate() -> u32 { 4800 }

fn default_data_dir() -> PathBuf { PathBuf::from("data") }
fn default_igc_dir() -> PathBuf { PathBuf::from("data/logs") }
fn default_manufacturer() -> String { DEFAULT_MANUFACTURER.to_string() }
fn default_min_free_kb() -> u64 { 750 }
fn default_max_reclaim_attempts() -> u32 { 100 }
fn default_extra_headers_file() -> String { "COMPE.CNF".to_string() }

fn default_log_level() -> String { "info".to_string() }
fn default_log_dir() -> PathBuf { PathBuf::from("logs") }
fn default_log_file() -> String { "startup.log".to_string() }

fn invalid(message: &str) -> NavLoggerError {
    NavLoggerError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use nav_logger::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        for port in &self.ports {
            if port.path.is_empty() {
                return Err(invalid("port path cannot be empty"));
            }
            if !SUPPORTED_BAUD_RATES.contains(&port.baud_rate) {
                return Err(invalid(
                    "baud_rate must be one of 4800, 9600, 19200, 38400, 57600, 115200",
                ));
            }
        }

        if self.logger.enabled && self.logger.log_dir.as_os_str().is_empty() {
            return Err(invalid("logger log_dir cannot be empty when enabled"));
        }

        let manufacturer = &self.logger.manufacturer;
        if manufacturer.len() != 3
            || !manufacturer
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        {
            return Err(invalid(
                "manufacturer must be 3 uppercase letters or digits",
            ));
        }

        if self.logger.max_reclaim_attempts == 0 || self.logger.max_reclaim_attempts > 1000 {
            return Err(invalid("max_reclaim_attempts must be between 1 and 1000"));
        }

        if !self.logger.gps_altitude_offset.is_finite() {
            return Err(invalid("gps_altitude_offset must be a finite number"));
        }

        if self.logging.file.is_empty() {
            return Err(invalid("logging file cannot be empty"));
        }

        Ok(())
    }

    /// Ports to open at startup
    pub fn enabled_ports(&self) -> impl Iterator<Item = &PortConfig> {
        self.ports.iter().filter(|p| p.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_valid_config() -> Config {
        Config {
            ports: vec![PortConfig {
                name: default_port_name(),
                path: "/dev/ttyUSB0".to_string(),
                baud_rate: default_baud_rate(),
                enabled: true,
            }],
            logger: LoggerConfig::default(),
            pilot: PilotIdentity::default(),
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_default_values() {
        let logger = LoggerConfig::default();
        assert!(logger.enabled);
        assert_eq!(logger.manufacturer, "XLK");
        assert_eq!(logger.min_free_kb, 750);
        assert_eq!(logger.max_reclaim_attempts, 100);
        assert_eq!(logger.extra_headers_file, "COMPE.CNF");
        assert_eq!(default_baud_rate(), 4800);
    }

    #[test]
    fn test_valid_config() {
        assert!(create_valid_config().validate().is_ok());
    }

    #[test]
    fn test_empty_port_path() {
        let mut config = create_valid_config();
        config.ports[0].path = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unsupported_baud_rate() {
        let mut config = create_valid_config();
        config.ports[0].baud_rate = 420000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_all_supported_baud_rates() {
        let mut config = create_valid_config();
        for rate in SUPPORTED_BAUD_RATES {
            config.ports[0].baud_rate = rate;
            assert!(config.validate().is_ok(), "baud rate {} should be valid", rate);
        }
    }

    #[test]
    fn test_empty_log_dir_when_enabled() {
        let mut config = create_valid_config();
        config.logger.log_dir = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir_when_disabled() {
        let mut config = create_valid_config();
        config.logger.enabled = false;
        config.logger.log_dir = PathBuf::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_manufacturer_rules() {
        let mut config = create_valid_config();
        config.logger.manufacturer = "xlk".to_string();
        assert!(config.validate().is_err());
        config.logger.manufacturer = "XLKK".to_string();
        assert!(config.validate().is_err());
        config.logger.manufacturer = "X1K".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_reclaim_attempts_bounds() {
        let mut config = create_valid_config();
        config.logger.max_reclaim_attempts = 0;
        assert!(config.validate().is_err());
        config.logger.max_reclaim_attempts = 1001;
        assert!(config.validate().is_err());
        config.logger.max_reclaim_attempts = 1000;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_non_finite_altitude_offset() {
        let mut config = create_valid_config();
        config.logger.gps_altitude_offset = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_enabled_ports_filter() {
        let mut config = create_valid_config();
        config.ports.push(PortConfig {
            name: "FLARM".to_string(),
            path: "/dev/ttyUSB1".to_string(),
            baud_rate: 19200,
            enabled: false,
        });
        let names: Vec<_> = config.enabled_ports().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["GPS"]);
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[[ports]]
name = "GPS"
path = "/dev/ttyUSB0"
baud_rate = 9600

[logger]
short_file_names = true
gps_altitude_offset = -12.0

[pilot]
pilot_name = "Hanna Reitsch"
aircraft_type = "DG-300"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.ports.len(), 1);
        assert_eq!(config.ports[0].baud_rate, 9600);
        assert!(config.ports[0].enabled);
        assert!(config.logger.short_file_names);
        assert_eq!(config.logger.gps_altitude_offset, -12.0);
        assert_eq!(config.pilot.pilot_name, "Hanna Reitsch");
        assert_eq!(config.pilot.competition_id, "");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[[ports]]\npath = \"/dev/ttyUSB0\"\nbaud_rate = 1200\n")
            .unwrap();
        temp_file.flush().unwrap();

        assert!(matches!(
            Config::load(temp_file.path()),
            Err(NavLoggerError::Config(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/nav-logger.toml");
        assert!(matches!(result, Err(NavLoggerError::Io(_))));
    }
}
