//! Screenshot files.

use super::record::ScreenshotRef;
use crate::error::{StorageError, StorageResult};
use crate::types::{HostIdentity, Port};
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

/// Subdirectory name used with `--subdir-screenshots`.
pub const SCREENSHOT_SUBDIR: &str = "screenshots";

/// Writes screenshots into the run directory (or its `screenshots/` subdir).
#[derive(Debug, Clone)]
pub struct ScreenshotWriter {
    run_dir: PathBuf,
    use_subdir: bool,
}

impl ScreenshotWriter {
    pub fn new(run_dir: impl Into<PathBuf>, use_subdir: bool) -> Self {
        Self {
            run_dir: run_dir.into(),
            use_subdir,
        }
    }

    /// Directory the files land in.
    pub fn dir(&self) -> PathBuf {
        if self.use_subdir {
            self.run_dir.join(SCREENSHOT_SUBDIR)
        } else {
            self.run_dir.clone()
        }
    }

    fn pathname(&self) -> &'static str {
        if self.use_subdir {
            SCREENSHOT_SUBDIR
        } else {
            "."
        }
    }

    /// File name for one capture: sanitized identity, port, scheme, time.
    pub fn filename(identity: &HostIdentity, port: Port, scheme: &str, at: NaiveDateTime) -> String {
        let safe = identity
            .to_string()
            .replace("://", "_")
            .replace(['/', ':', '.'], "_");
        format!("{}_{}_{}_{}.png", safe, port, scheme, at.format("%Y%m%d_%H%M%S"))
    }

    /// Write the image bytes and describe where they went.
    pub async fn save(
        &self,
        identity: &HostIdentity,
        port: Port,
        scheme: &str,
        bytes: &[u8],
        at: NaiveDateTime,
    ) -> StorageResult<ScreenshotRef> {
        let filename = Self::filename(identity, port, scheme, at);
        let path_full = self.dir().join(&filename);

        tokio::fs::write(&path_full, bytes)
            .await
            .map_err(|source| StorageError::ScreenshotFailed {
                path: path_full.clone(),
                source,
            })?;
        tracing::debug!("Screenshot saved: {}", filename);

        let path_relative = Path::new(self.pathname())
            .join(&filename)
            .to_string_lossy()
            .into_owned();
        Ok(ScreenshotRef {
            path_full,
            path_relative,
            pathname: self.pathname().to_string(),
            filename,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(9, 30, 15)
            .unwrap()
    }

    #[test]
    fn test_filename_sanitizes_identity() {
        let name = ScreenshotWriter::filename(
            &HostIdentity::from_host("a.com/admin"),
            Port::new(8080).unwrap(),
            "https",
            at(),
        );
        assert_eq!(name, "a_com_admin_8080_https_20240501_093015.png");

        let name = ScreenshotWriter::filename(
            &HostIdentity::from_host("10.0.0.1"),
            Port::HTTP,
            "http",
            at(),
        );
        assert_eq!(name, "10_0_0_1_80_http_20240501_093015.png");
    }

    #[tokio::test]
    async fn test_save_into_subdir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(SCREENSHOT_SUBDIR)).unwrap();
        let writer = ScreenshotWriter::new(dir.path(), true);

        let shot = writer
            .save(&HostIdentity::from_host("10.0.0.1"), Port::HTTPS, "https", b"png", at())
            .await
            .unwrap();

        assert_eq!(shot.pathname, "screenshots");
        assert_eq!(shot.path_relative, "screenshots/10_0_0_1_443_https_20240501_093015.png");
        assert_eq!(std::fs::read(&shot.path_full).unwrap(), b"png");
    }

    #[tokio::test]
    async fn test_save_into_run_dir() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ScreenshotWriter::new(dir.path(), false);

        let shot = writer
            .save(&HostIdentity::from_host("a.com"), Port::HTTP, "http", b"png", at())
            .await
            .unwrap();

        assert_eq!(shot.pathname, ".");
        assert_eq!(shot.path_full, dir.path().join("a_com_80_http_20240501_093015.png"));
    }
}
