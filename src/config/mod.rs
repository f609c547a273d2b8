//! Configuration management for PageHawk.
//!
//! XDG-located settings plus the per-run output layout.

mod output_layout;
mod settings;

pub use output_layout::{LayoutOptions, OutputLayout, DEFAULT_JSON_FILENAME};
pub use settings::{Paths, ProxySettings, Settings, DEFAULT_USER_AGENT};
