use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::loader::LoadOptions;
use crate::data::qc::QcConfig;
use crate::data::schema::TimestampPolicy;

// ---------------------------------------------------------------------------
// User settings (JSON)
// ---------------------------------------------------------------------------

/// Settings the user can load from / save to a JSON file.  Every field has a
/// default, so a partial file is fine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub qc: QcConfig,
    pub timestamps: TimestampPolicy,
    pub http_timeout_secs: u64,
    /// Path or URL of the last dataset opened.
    pub last_source: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            qc: QcConfig::default(),
            timestamps: TimestampPolicy::default(),
            http_timeout_secs: 30,
            last_source: None,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings {}", path.display()))?;
        let settings: Settings = serde_json::from_str(&text)
            .with_context(|| format!("parsing settings {}", path.display()))?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self).context("serializing settings")?;
        std::fs::write(path, text)
            .with_context(|| format!("writing settings {}", path.display()))?;
        log::info!("Saved settings to {}", path.display());
        Ok(())
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            timestamps: self.timestamps,
            http_timeout: Duration::from_secs(self.http_timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::qc::UnmatchedPolicy;

    #[test]
    fn partial_file_uses_defaults() {
        let s: Settings = serde_json::from_str(r#"{"timestamps":"coerce"}"#).unwrap();
        assert_eq!(s.timestamps, TimestampPolicy::Coerce);
        assert_eq!(s.http_timeout_secs, 30);
        assert_eq!(s.qc, QcConfig::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut settings = Settings::default();
        settings.qc.unmatched = UnmatchedPolicy::Zero;
        settings.last_source = Some("https://example.org/summary.csv".to_string());

        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ nope").unwrap();
        let err = Settings::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("broken.json"));
    }

    #[test]
    fn load_options_carry_timeout_and_policy() {
        let settings = Settings {
            http_timeout_secs: 5,
            timestamps: TimestampPolicy::Coerce,
            ..Settings::default()
        };
        let opts = settings.load_options();
        assert_eq!(opts.http_timeout, Duration::from_secs(5));
        assert_eq!(opts.timestamps, TimestampPolicy::Coerce);
    }
}
