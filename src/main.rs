use std::path::{Path, PathBuf};
use std::process::ExitCode;

use page_stitch::config::job::JobFile;
use page_stitch::config::merged::MergedConfig;
use page_stitch::config::{self};
use page_stitch::pipeline::job_runner::{JobConfig, ProcessOptions};
use page_stitch::pipeline::orchestrator::run_all_jobs;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        eprintln!("Usage: page_stitch <jobs.yaml>...");
        eprintln!("  Stitch overlapping scan pairs onto fixed-size pages.");
        eprintln!("  settings.yaml next to each job file is loaded if present.");
        return if args.is_empty() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        };
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        eprintln!("page_stitch {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    // Collect job configs from all job files.
    let mut job_configs: Vec<JobConfig> = Vec::new();

    for job_file_arg in &args {
        let job_file_path = Path::new(job_file_arg);

        // Load settings from the same directory as the job file.
        let settings = match config::load_settings_for_job(job_file_path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("ERROR: Failed to load settings for {job_file_arg}: {e}");
                return ExitCode::FAILURE;
            }
        };

        let yaml_content = match std::fs::read_to_string(job_file_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("ERROR: Failed to read job file {job_file_arg}: {e}");
                return ExitCode::FAILURE;
            }
        };

        let job_file = match JobFile::from_yaml(&yaml_content) {
            Ok(jf) => jf,
            Err(e) => {
                eprintln!("ERROR: Failed to parse job file {job_file_arg}: {e}");
                return ExitCode::FAILURE;
            }
        };

        let job_dir = config::job_dir(job_file_path);

        // Page size and detector settings are validated before any job runs.
        for job in &job_file.jobs {
            let merged = match MergedConfig::new(&settings, job) {
                Ok(m) => m,
                Err(e) => {
                    eprintln!("ERROR: {job_file_arg}: {} -> {}: {e}", job.top, job.output);
                    return ExitCode::FAILURE;
                }
            };

            job_configs.push(JobConfig {
                top_path: resolve_path(&job_dir, &job.top),
                bottom_path: resolve_path(&job_dir, &job.bottom),
                output_path: resolve_path(&job_dir, &job.output),
                page: merged.page,
                output_kind: merged.output_kind,
                options: ProcessOptions {
                    detector: merged.detector,
                    encode: merged.encode,
                },
            });
        }
    }

    let results = run_all_jobs(&job_configs);

    let mut has_error = false;
    for (i, result) in results.iter().enumerate() {
        match result {
            Ok(job_result) => {
                eprintln!(
                    "OK: {} + {} -> {} ({}x{}, overlap {}px)",
                    job_result.top_path.display(),
                    job_result.bottom_path.display(),
                    job_result.output_path.display(),
                    job_result.width,
                    job_result.height,
                    job_result.overlap.height
                );
            }
            Err(e) => {
                eprintln!(
                    "ERROR: {} + {} -> {}: {e}",
                    job_configs[i].top_path.display(),
                    job_configs[i].bottom_path.display(),
                    job_configs[i].output_path.display()
                );
                has_error = true;
            }
        }
    }

    if has_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Resolve a potentially relative path against a base directory.
/// If the path is already absolute, return it as-is.
fn resolve_path(base_dir: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}
