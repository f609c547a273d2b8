//! Output directory layout of a run.

use crate::error::{ConfigError, ConfigResult};
use crate::storage::SCREENSHOT_SUBDIR;
use chrono::NaiveDateTime;
use std::fs;
use std::path::{Path, PathBuf};

/// JSON file name when none is derived from the arguments.
pub const DEFAULT_JSON_FILENAME: &str = "pagehawk_results.json";

/// Probe file used to verify write access.
const WRITE_PROBE: &str = ".pagehawk_test";

/// Options that shape the layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutOptions {
    /// Write screenshots into `screenshots/` under the run directory.
    pub subdir_screenshots: bool,
    /// Create a `pagehawk-<timestamp>` run directory.
    pub subdir_timestamped: bool,
}

/// Where a run writes its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub run_dir: PathBuf,
    pub json_path: PathBuf,
    pub subdir_screenshots: bool,
}

impl OutputLayout {
    /// Resolve `-o` into a layout, creating any subdirectories.
    ///
    /// `output` is an existing writable directory, or a `.json`/`.html`
    /// file path inside one; the file stem then names the JSON output.
    pub fn prepare(output: &Path, options: LayoutOptions, now: NaiveDateTime) -> ConfigResult<Self> {
        let (base_dir, file_stem) = split_output(output);
        tracing::debug!("Checking output: {}", output.display());

        if !base_dir.is_dir() {
            return Err(ConfigError::OutputMissing(base_dir));
        }
        check_writable(&base_dir)?;
        tracing::debug!("Write permissions verified for: {}", base_dir.display());

        let stamp = now.format("pagehawk-%Y-%m-%d_%H-%M").to_string();
        let json_name = match (&file_stem, options.subdir_timestamped) {
            (Some(stem), _) => format!("{}.json", stem),
            (None, true) => format!("{}.json", stamp),
            (None, false) => DEFAULT_JSON_FILENAME.to_string(),
        };

        let run_dir = if options.subdir_timestamped {
            let dir = base_dir.join(&stamp);
            create_dir(&dir)?;
            tracing::debug!("Created timestamped directory: {}", dir.display());
            dir
        } else {
            base_dir
        };

        if options.subdir_screenshots {
            let dir = run_dir.join(SCREENSHOT_SUBDIR);
            create_dir(&dir)?;
            tracing::debug!("Created screenshots directory: {}", dir.display());
        }

        Ok(Self {
            json_path: run_dir.join(json_name),
            run_dir,
            subdir_screenshots: options.subdir_screenshots,
        })
    }
}

/// Split `-o` into its directory and, for file paths, the file stem.
fn split_output(output: &Path) -> (PathBuf, Option<String>) {
    let is_file = output
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| {
            ext.eq_ignore_ascii_case("json") || ext.eq_ignore_ascii_case("html")
        });

    if !is_file {
        return (output.to_path_buf(), None);
    }

    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let stem = output
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned());
    (dir, stem)
}

fn check_writable(dir: &Path) -> ConfigResult<()> {
    let probe = dir.join(WRITE_PROBE);
    fs::write(&probe, "test")
        .and_then(|()| fs::remove_file(&probe))
        .map_err(|e| ConfigError::OutputNotWritable {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })
}

fn create_dir(dir: &Path) -> ConfigResult<()> {
    fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDirFailed {
        path: dir.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(14, 7, 0)
            .unwrap()
    }

    #[test]
    fn test_plain_directory() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::prepare(dir.path(), LayoutOptions::default(), now()).unwrap();

        assert_eq!(layout.run_dir, dir.path());
        assert_eq!(layout.json_path, dir.path().join(DEFAULT_JSON_FILENAME));
        assert!(!dir.path().join(WRITE_PROBE).exists());
    }

    #[test]
    fn test_html_file_names_json() {
        let dir = tempfile::tempdir().unwrap();
        let layout =
            OutputLayout::prepare(&dir.path().join("report.html"), LayoutOptions::default(), now()).unwrap();

        assert_eq!(layout.json_path, dir.path().join("report.json"));
    }

    #[test]
    fn test_timestamped_with_screenshots() {
        let dir = tempfile::tempdir().unwrap();
        let options = LayoutOptions {
            subdir_screenshots: true,
            subdir_timestamped: true,
        };
        let layout = OutputLayout::prepare(dir.path(), options, now()).unwrap();

        let run_dir = dir.path().join("pagehawk-2024-05-01_14-07");
        assert_eq!(layout.run_dir, run_dir);
        assert_eq!(layout.json_path, run_dir.join("pagehawk-2024-05-01_14-07.json"));
        assert!(run_dir.join(SCREENSHOT_SUBDIR).is_dir());
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            OutputLayout::prepare(&missing, LayoutOptions::default(), now()),
            Err(ConfigError::OutputMissing(_))
        ));
        assert!(matches!(
            OutputLayout::prepare(&missing.join("out.json"), LayoutOptions::default(), now()),
            Err(ConfigError::OutputMissing(_))
        ));
    }
}
