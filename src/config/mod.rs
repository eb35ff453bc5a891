pub mod job;
pub mod merged;
pub mod page;
pub mod settings;

use std::path::{Path, PathBuf};

use settings::Settings;
use tracing::debug;

/// Name of the optional settings file looked up next to each job file.
pub const SETTINGS_FILE: &str = "settings.yaml";

/// Directory that relative paths in a job file are resolved against.
///
/// A bare file name (`jobs.yaml`) has an empty parent; that means the
/// current directory.
pub fn job_dir(job_file_path: &Path) -> PathBuf {
    match job_file_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// ジョブファイルと同じディレクトリの `settings.yaml` を読む。無ければ既定値。
pub fn load_settings_for_job(job_file_path: &Path) -> crate::error::Result<Settings> {
    let settings_path = job_dir(job_file_path).join(SETTINGS_FILE);
    if !settings_path.is_file() {
        debug!(job = %job_file_path.display(), "no settings file, using defaults");
        return Ok(Settings::default());
    }
    debug!(path = %settings_path.display(), "loading settings");
    Settings::from_file(&settings_path)
}
