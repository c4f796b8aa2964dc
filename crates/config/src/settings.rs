// Group header settings
// Loaded from ~/.config/gridgroup/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderSettings {
    // Group column
    #[serde(rename = "rowGroup.columnWidth")]
    pub group_column_width: i32,

    #[serde(rename = "rowGroup.calculateWidth")]
    pub calculate_width: bool,

    #[serde(rename = "rowGroup.charWidth")]
    pub char_width: i32,

    #[serde(rename = "rowGroup.labelPadding")]
    pub label_padding: i32,

    // Grid
    #[serde(rename = "grid.rowHeight")]
    pub row_height: i32,

    #[serde(rename = "grid.rowHeaderWidth")]
    pub row_header_width: i32,

    // Display
    #[serde(rename = "dpi.scale")]
    pub dpi_scale: i32,
}

impl Default for HeaderSettings {
    fn default() -> Self {
        Self {
            // Group column
            group_column_width: 20,
            calculate_width: false,
            char_width: 7,
            label_padding: 5,
            // Grid
            row_height: 20,
            row_header_width: 40,
            // Display
            dpi_scale: 1,
        }
    }
}

impl HeaderSettings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gridgroup");
        config_dir.join("settings.json")
    }

    /// Load settings from the default location, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load settings from `path`, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match Self::from_json_str(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("Error parsing {}: {}", path.display(), e);
                    log::warn!("Using default header settings");
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Error reading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse settings JSON. Lines starting with `//` are comments.
    pub fn from_json_str(contents: &str) -> Result<Self, String> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");

        let settings: Self = serde_json::from_str(&cleaned).map_err(|e| e.to_string())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to the default location
    pub fn save(&self) -> Result<(), String> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;

        fs::write(path, json).map_err(|e| e.to_string())
    }

    fn validate(&self) -> Result<(), String> {
        if self.group_column_width < 0 {
            return Err(format!("rowGroup.columnWidth must not be negative, got {}", self.group_column_width));
        }
        if self.row_height <= 0 {
            return Err(format!("grid.rowHeight must be positive, got {}", self.row_height));
        }
        if self.row_header_width < 0 {
            return Err(format!("grid.rowHeaderWidth must not be negative, got {}", self.row_header_width));
        }
        if self.dpi_scale < 1 {
            return Err(format!("dpi.scale must be at least 1, got {}", self.dpi_scale));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = HeaderSettings::default();
        assert_eq!(settings.group_column_width, 20);
        assert_eq!(settings.row_height, 20);
        assert_eq!(settings.row_header_width, 40);
        assert!(!settings.calculate_width);
        assert_eq!(settings.dpi_scale, 1);
    }

    #[test]
    fn test_partial_json_with_comments() {
        let json = r#"{
    // wider group column
    "rowGroup.columnWidth": 32,
    "dpi.scale": 2
}"#;
        let settings = HeaderSettings::from_json_str(json).unwrap();
        assert_eq!(settings.group_column_width, 32);
        assert_eq!(settings.dpi_scale, 2);
        // Unspecified keys keep their defaults
        assert_eq!(settings.row_height, 20);
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(HeaderSettings::from_json_str(r#"{"grid.rowHeight": 0}"#).is_err());
        assert!(HeaderSettings::from_json_str(r#"{"dpi.scale": 0}"#).is_err());
        assert!(HeaderSettings::from_json_str("not json").is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let settings = HeaderSettings {
            calculate_width: true,
            row_height: 24,
            ..HeaderSettings::default()
        };
        settings.save_to(&path).unwrap();

        assert_eq!(HeaderSettings::load_from(&path), settings);
    }

    #[test]
    fn test_load_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert_eq!(HeaderSettings::load_from(&missing), HeaderSettings::default());

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ broken").unwrap();
        assert_eq!(HeaderSettings::load_from(&broken), HeaderSettings::default());
    }
}
