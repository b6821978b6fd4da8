//! JSON configuration for detection runs.
//!
//! ```json
//! {
//!   "classifiers": { "face": "classifiers/face.json" },
//!   "scan": { "initial_scale": 1.0, "scale_factor": 1.25, "step_size": 1.5, "edges_density": 0.2 },
//!   "overlap": 0.5
//! }
//! ```
//!
//! Every section is optional. Relative classifier paths are resolved
//! against the directory holding the config file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::merge::DEFAULT_OVERLAP;
use crate::registry::ClassifierRegistry;
use crate::scanner::ScanParams;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Registry name -> classifier file.
    pub classifiers: BTreeMap<String, PathBuf>,
    pub scan: ScanParams,
    pub overlap: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            classifiers: BTreeMap::new(),
            scan: ScanParams::default(),
            overlap: DEFAULT_OVERLAP,
        }
    }
}

impl DetectorConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load every configured classifier into a fresh registry.
    pub fn build_registry(&self) -> Result<ClassifierRegistry> {
        let mut registry = ClassifierRegistry::new();
        for (name, path) in &self.classifiers {
            registry.load(name.as_str(), path)?;
        }
        Ok(registry)
    }
}

pub fn load_config(path: &Path) -> Result<DetectorConfig> {
    let data = fs::read_to_string(path)?;
    let mut config = DetectorConfig::from_json(&data)?;

    if let Some(base) = path.parent() {
        for classifier_path in config.classifiers.values_mut() {
            if classifier_path.is_relative() {
                *classifier_path = base.join(&*classifier_path);
            }
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_uses_defaults() {
        let config = DetectorConfig::from_json("{}").unwrap();
        assert_eq!(config, DetectorConfig::default());
        assert_eq!(config.scan, ScanParams::default());
        assert_eq!(config.overlap, 0.5);
    }

    #[test]
    fn partial_scan_section_keeps_other_defaults() {
        let config = DetectorConfig::from_json(r#"{ "scan": { "step_size": 2.0 } }"#).unwrap();
        assert_eq!(config.scan.step_size, 2.0);
        assert_eq!(config.scan.scale_factor, 1.25);
        assert_eq!(config.scan.edges_density, 0.2);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(DetectorConfig::from_json("{ scan: }").is_err());
    }

    #[test]
    fn relative_paths_resolve_against_config_dir() {
        let dir = std::env::temp_dir().join("cascade_detect_config_test");
        fs::create_dir_all(&dir).unwrap();

        let blob = [
            20.0, 20.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 20.0, 20.0, 1.0, 0.0, 1.0, 1.0,
        ];
        fs::write(dir.join("face.json"), serde_json::to_string(&blob).unwrap()).unwrap();
        let config_path = dir.join("detect.json");
        fs::write(
            &config_path,
            r#"{ "classifiers": { "face": "face.json" }, "overlap": 0.6 }"#,
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.classifiers["face"], dir.join("face.json"));
        assert_eq!(config.overlap, 0.6);

        let registry = config.build_registry().unwrap();
        assert_eq!(registry.get("face").unwrap().min_width(), 20.0);

        fs::remove_dir_all(dir).ok();
    }
}
