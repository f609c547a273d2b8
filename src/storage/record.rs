//! Per-socket visit records.

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Timestamp format used in the persisted state.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Outcome of visiting one socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub enum ResponseClass {
    /// Not visited yet.
    #[default]
    Pending,
    /// An HTTP status was received, whatever its value.
    Status(u16),
    Timeout,
    Refused,
    Reset,
    /// A navigation failure that fits no other class.
    Error,
    /// Navigation completed without a response object.
    NoResponse,
    /// Both protocols were tried and neither connected.
    Unreachable,
}

impl ResponseClass {
    pub fn is_pending(self) -> bool {
        self == Self::Pending
    }
}

impl fmt::Display for ResponseClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => Ok(()),
            Self::Status(code) => write!(f, "{}", code),
            Self::Timeout => write!(f, "timeout"),
            Self::Refused => write!(f, "refused"),
            Self::Reset => write!(f, "reset"),
            Self::Error => write!(f, "error"),
            Self::NoResponse => write!(f, "no_response"),
            Self::Unreachable => write!(f, "unreachable"),
        }
    }
}

impl FromStr for ResponseClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(Self::Pending),
            "timeout" => Ok(Self::Timeout),
            "refused" => Ok(Self::Refused),
            "reset" => Ok(Self::Reset),
            "error" => Ok(Self::Error),
            "no_response" => Ok(Self::NoResponse),
            "unreachable" => Ok(Self::Unreachable),
            other => other
                .parse::<u16>()
                .map(Self::Status)
                .map_err(|_| format!("unknown response class: {:?}", other)),
        }
    }
}

impl Serialize for ResponseClass {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ResponseClass {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Where a screenshot was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenshotRef {
    /// Absolute (or as-given) path of the file.
    pub path_full: PathBuf,
    /// Path relative to the run directory.
    pub path_relative: String,
    /// Directory relative to the run directory (`"screenshots"` or `"."`).
    pub pathname: String,
    pub filename: String,
}

/// Visit record of one (identity, port) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "RecordRepr", try_from = "RecordRepr")]
pub struct VisitRecord {
    pub response: ResponseClass,
    pub visited_first: Option<NaiveDateTime>,
    pub visited_last: Option<NaiveDateTime>,
    pub user_agent: String,
    pub screenshot: Option<ScreenshotRef>,
}

impl VisitRecord {
    pub fn is_pending(&self) -> bool {
        self.response.is_pending()
    }

    /// Apply the outcome of one visit made at `at`.
    ///
    /// `visited_first` is written once; `visited_last` never moves
    /// backwards. The screenshot reference always reflects the latest visit.
    pub fn record_visit(
        &mut self,
        response: ResponseClass,
        user_agent: impl Into<String>,
        screenshot: Option<ScreenshotRef>,
        at: NaiveDateTime,
    ) {
        if self.visited_first.is_none() {
            self.visited_first = Some(at);
        }
        self.visited_last = Some(self.visited_last.map_or(at, |last| last.max(at)));
        self.response = response;
        self.user_agent = user_agent.into();
        self.screenshot = screenshot;
    }
}

/// Flat on-disk form of a [`VisitRecord`]. Absent values are empty strings.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct RecordRepr {
    response: String,
    visited_first: String,
    visited_last: String,
    user_agent: String,
    screenshot_path_full: String,
    screenshot_path_relative: String,
    screenshot_pathname: String,
    screenshot_filename: String,
}

fn format_timestamp(ts: Option<NaiveDateTime>) -> String {
    ts.map(|t| t.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_default()
}

fn parse_timestamp(s: &str) -> Result<Option<NaiveDateTime>, String> {
    if s.is_empty() {
        return Ok(None);
    }
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .map(Some)
        .map_err(|e| format!("invalid timestamp {:?}: {}", s, e))
}

impl From<VisitRecord> for RecordRepr {
    fn from(record: VisitRecord) -> Self {
        let mut repr = RecordRepr {
            response: record.response.to_string(),
            visited_first: format_timestamp(record.visited_first),
            visited_last: format_timestamp(record.visited_last),
            user_agent: record.user_agent,
            ..Default::default()
        };
        if let Some(shot) = record.screenshot {
            repr.screenshot_path_full = shot.path_full.to_string_lossy().into_owned();
            repr.screenshot_path_relative = shot.path_relative;
            repr.screenshot_pathname = shot.pathname;
            repr.screenshot_filename = shot.filename;
        }
        repr
    }
}

impl TryFrom<RecordRepr> for VisitRecord {
    type Error = String;

    fn try_from(repr: RecordRepr) -> Result<Self, Self::Error> {
        let screenshot = (!repr.screenshot_filename.is_empty()).then(|| ScreenshotRef {
            path_full: PathBuf::from(repr.screenshot_path_full),
            path_relative: repr.screenshot_path_relative,
            pathname: repr.screenshot_pathname,
            filename: repr.screenshot_filename,
        });

        Ok(Self {
            response: repr.response.parse()?,
            visited_first: parse_timestamp(&repr.visited_first)?,
            visited_last: parse_timestamp(&repr.visited_last)?,
            user_agent: repr.user_agent,
            screenshot,
        })
    }
}
