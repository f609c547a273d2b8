//! Output formatting module.
//!
//! Console output of run headers, summaries and dry-run results.

mod json_format;
mod plain;

pub use json_format::print_json;
pub use plain::{print_error, print_scan_header, print_sockets, print_summary, print_warning};
