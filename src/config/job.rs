use serde::Deserialize;

use crate::encode::OutputKind;
use crate::stitch::overlap::SearchMode;

#[derive(Debug, Clone, Deserialize)]
pub struct JobFile {
    pub jobs: Vec<Job>,
}

/// 1組の画像（上・下）を1ページに合成するジョブ。
#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    pub top: String,
    pub bottom: String,
    pub output: String,
    pub paper: Option<String>,
    pub format: Option<OutputKind>,
    pub sad_threshold: Option<f64>,
    pub search: Option<SearchMode>,
}

impl JobFile {
    pub fn from_yaml(yaml: &str) -> crate::error::Result<Self> {
        let file: JobFile = serde_yml::from_str(yaml)?;
        if file.jobs.is_empty() {
            return Err(crate::error::StitchError::config(
                "Job file contains no jobs",
            ));
        }
        Ok(file)
    }
}
