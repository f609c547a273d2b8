//! Visit state and its persistence.
//!
//! The whole state is rewritten to a single JSON file after every visit so
//! that an interrupted run leaves its last complete snapshot behind.

mod record;
mod screenshots;
mod visit_store;

pub use record::{ResponseClass, ScreenshotRef, VisitRecord, TIMESTAMP_FORMAT};
pub use screenshots::{ScreenshotWriter, SCREENSHOT_SUBDIR};
pub use visit_store::{HostEntry, PortEntry, SharedStore, VisitStore, VisitTask};
