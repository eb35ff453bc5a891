use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use super::page::{DEFAULT_DPI, PaperSize};
use crate::encode::OutputKind;
use crate::stitch::overlap::DetectorConfig;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub dpi: u32,
    pub paper: String,
    /// Fallback output kind when neither the job nor the output extension names one.
    pub format: Option<OutputKind>,
    pub jpeg_quality: u8,
    /// Additional named paper presets.
    pub papers: BTreeMap<String, PaperSize>,
    pub detector: DetectorConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            dpi: DEFAULT_DPI,
            paper: "8.5x13in".to_string(),
            format: None,
            jpeg_quality: 95,
            papers: BTreeMap::new(),
            detector: DetectorConfig::default(),
        }
    }
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> crate::error::Result<Self> {
        serde_yml::from_str(yaml).map_err(|e| {
            crate::error::StitchError::config(format!("Failed to parse settings YAML: {e}"))
        })
    }

    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}
