use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::dashboard::{DEFAULT_PAGE_SIZE, PAGE_SIZES};
use crate::errors::DashboardError;

const CONFIG_FILE_NAME: &str = "config.json";
const APP_DIR_NAME: &str = "fleetview";
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
/// Used when the client's zone cannot be detected.
pub const FALLBACK_TIMEZONE: Tz = Tz::UTC;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    /// IANA name sent with every range query, the client's zone when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    pub page_size: u32,
    pub window_width: f32,
    pub window_height: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            timezone: None,
            page_size: DEFAULT_PAGE_SIZE,
            window_width: 1100.,
            window_height: 800.,
        }
    }
}

impl AppConfig {
    pub fn default_path() -> Result<PathBuf, DashboardError> {
        Ok(dirs::config_dir()
            .ok_or(DashboardError::NoConfigDir)?
            .join(APP_DIR_NAME)
            .join(CONFIG_FILE_NAME))
    }

    /// Reads the config from the user's config directory, `None` if there is
    /// no config file yet.
    pub fn from_local_file() -> Result<Option<Self>, DashboardError> {
        Self::from_path(&Self::default_path()?)
    }

    pub fn from_path(config_path: &Path) -> Result<Option<Self>, DashboardError> {
        if !config_path.exists() {
            return Ok(None);
        }
        let file = std::fs::File::open(config_path)
            .map_err(|e| DashboardError::ConfigIOError { source: e })?;
        let config: Self = serde_json::from_reader(file)
            .map_err(|e| DashboardError::ConfigSerializeError { source: e })?;
        Ok(Some(config.sanitized()))
    }

    pub fn save(&self) -> Result<(), DashboardError> {
        self.save_to(&Self::default_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<(), DashboardError> {
        if let Some(parent) = config_path.parent()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| DashboardError::ConfigIOError { source: e })?;
        }

        let file = std::fs::File::create(config_path)
            .map_err(|e| DashboardError::ConfigIOError { source: e })?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|e| DashboardError::ConfigSerializeError { source: e })
    }

    /// Applies command line / environment overrides on top of the file values.
    pub fn with_overrides(
        mut self,
        api_base_url: Option<String>,
        timezone: Option<String>,
        page_size: Option<u32>,
    ) -> Self {
        if let Some(url) = api_base_url {
            self.api_base_url = url;
        }
        if let Some(tz) = timezone {
            self.timezone = Some(tz);
        }
        if let Some(size) = page_size {
            self.page_size = size;
        }
        self.sanitized()
    }

    pub fn tz(&self) -> Result<Tz, DashboardError> {
        match &self.timezone {
            Some(name) => parse_timezone(name),
            None => Ok(client_timezone()),
        }
    }

    fn sanitized(mut self) -> Self {
        if !PAGE_SIZES.contains(&self.page_size) {
            warn!(
                "Page size {} is not one of {:?}, using {}",
                self.page_size, PAGE_SIZES, DEFAULT_PAGE_SIZE
            );
            self.page_size = DEFAULT_PAGE_SIZE;
        }
        self
    }
}

pub fn parse_timezone(name: &str) -> Result<Tz, DashboardError> {
    name.parse::<Tz>()
        .map_err(|_| DashboardError::InvalidTimezone {
            name: name.to_string(),
        })
}

/// The operating system's zone, or [`FALLBACK_TIMEZONE`] when it is unknown.
pub fn client_timezone() -> Tz {
    match iana_time_zone::get_timezone() {
        Ok(name) => timezone_or_fallback(Some(&name)),
        Err(e) => {
            warn!("Could not detect the local timezone: {}", e);
            FALLBACK_TIMEZONE
        }
    }
}

fn timezone_or_fallback(detected: Option<&str>) -> Tz {
    match detected.map(parse_timezone) {
        Some(Ok(tz)) => tz,
        Some(Err(e)) => {
            warn!("{}, using {}", e, FALLBACK_TIMEZONE);
            FALLBACK_TIMEZONE
        }
        None => FALLBACK_TIMEZONE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        assert_eq!(AppConfig::from_path(&path).unwrap(), None);
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.json");
        let config = AppConfig {
            api_base_url: "https://fleet.example.com".to_string(),
            timezone: Some("Europe/Lisbon".to_string()),
            page_size: 50,
            ..Default::default()
        };
        config.save_to(&path).unwrap();

        let loaded = AppConfig::from_path(&path).unwrap().unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, r#"{"timezone": "Asia/Tokyo", "page_size": 7}"#).unwrap();

        let loaded = AppConfig::from_path(&path).unwrap().unwrap();
        assert_eq!(loaded.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(loaded.timezone.as_deref(), Some("Asia/Tokyo"));
        assert_eq!(loaded.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            AppConfig::from_path(&path),
            Err(DashboardError::ConfigSerializeError { .. })
        ));
    }

    #[test]
    fn test_overrides_take_precedence() {
        let config = AppConfig::default().with_overrides(
            Some("http://10.0.0.5:8000".to_string()),
            None,
            Some(100),
        );
        assert_eq!(config.api_base_url, "http://10.0.0.5:8000");
        assert_eq!(config.timezone, None);
        assert_eq!(config.page_size, 100);
    }

    #[test]
    fn test_timezone_validation() {
        assert_eq!(parse_timezone("America/New_York").unwrap().name(), "America/New_York");
        assert!(matches!(
            parse_timezone("Mars/Olympus_Mons"),
            Err(DashboardError::InvalidTimezone { .. })
        ));
    }

    #[test]
    fn test_default_timezone_follows_client() {
        let config = AppConfig::default();
        assert_eq!(config.timezone, None);
        assert_eq!(config.tz().unwrap(), client_timezone());

        let lisbon = config.with_overrides(None, Some("Europe/Lisbon".to_string()), None);
        assert_eq!(lisbon.tz().unwrap(), chrono_tz::Europe::Lisbon);
    }

    #[test]
    fn test_detected_timezone_is_used() {
        assert_eq!(
            timezone_or_fallback(Some("America/New_York")),
            chrono_tz::America::New_York
        );
        assert_eq!(
            timezone_or_fallback(Some("Asia/Kolkata")),
            chrono_tz::Asia::Kolkata
        );
        assert_eq!(timezone_or_fallback(Some("Not/AZone")), FALLBACK_TIMEZONE);
        assert_eq!(timezone_or_fallback(None), FALLBACK_TIMEZONE);
    }

    #[test]
    fn test_unset_timezone_is_not_persisted() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        AppConfig::default().save_to(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("timezone"));
        let loaded = AppConfig::from_path(&path).unwrap().unwrap();
        assert_eq!(loaded.timezone, None);
    }
}
