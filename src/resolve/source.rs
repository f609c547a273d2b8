//! Raw target sources.
//!
//! The `-i` argument is either a path to a file (nmap XML export or a plain
//! target list) or direct comma-separated input.

use super::nmap::{self, AdapterError};
use crate::types::TargetError;
use std::fs;
use std::path::Path;

/// Raw targets, tagged by where they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetInput {
    /// Comma-separated input given on the command line.
    Direct(Vec<String>),
    /// Entries read from a plain target-list file.
    TargetList(Vec<String>),
    /// `host:port` strings produced by a structured-export adapter.
    Export(Vec<String>),
}

impl TargetInput {
    /// Number of raw items.
    pub fn len(&self) -> usize {
        match self {
            Self::Direct(items) | Self::TargetList(items) | Self::Export(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read the `-i` argument into raw targets.
pub fn read_input(input: &str) -> Result<TargetInput, TargetError> {
    let path = Path::new(input);
    if !path.is_file() {
        return Ok(TargetInput::Direct(split_direct(input)));
    }

    tracing::info!("Input is a file: {}", input);

    let is_xml = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("xml"));

    if is_xml {
        tracing::info!("Detected XML file, attempting to parse as nmap output");
        match nmap::parse_file(path) {
            Ok(sockets) => {
                tracing::info!(
                    "Successfully parsed nmap XML file with {} HTTP sockets",
                    sockets.len()
                );
                return Ok(TargetInput::Export(sockets));
            }
            Err(AdapterError::NotThisFormat(reason)) => {
                tracing::warn!("{}: {}, trying as regular file", input, reason);
            }
            Err(e) => {
                tracing::warn!("Failed to parse as nmap XML file ({}), trying as regular file", e);
            }
        }
    }

    let content = fs::read_to_string(path).map_err(|e| TargetError::FileRead {
        path: input.to_string(),
        reason: e.to_string(),
    })?;

    let targets = parse_target_list(&content);
    tracing::debug!("Parsed {} targets from file", targets.len());
    Ok(TargetInput::TargetList(targets))
}

/// Split direct input on commas. Empty items are kept so they fail loudly.
pub fn split_direct(input: &str) -> Vec<String> {
    input.split(',').map(|item| item.trim().to_string()).collect()
}

/// Parse a target-list file: one entry per line, or comma/tab/space
/// separated entries. Blank lines and `#` comments are skipped.
pub fn parse_target_list(content: &str) -> Vec<String> {
    let mut targets = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let delimiter = [',', '\t', ' '].into_iter().find(|d| line.contains(*d));
        match delimiter {
            Some(d) => targets.extend(
                line.split(d)
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(str::to_string),
            ),
            None => targets.push(line.to_string()),
        }
    }

    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_split_direct() {
        assert_eq!(
            split_direct("10.0.0.1, example.com ,"),
            vec!["10.0.0.1", "example.com", ""]
        );
        assert_eq!(split_direct("10.0.0.1"), vec!["10.0.0.1"]);
    }

    #[test]
    fn test_parse_target_list_mixed_delimiters() {
        let content = "# staging hosts\n\
                       10.0.0.1\n\
                       \n\
                       a.com, b.com,\n\
                       c.com\td.com\n\
                       e.com  f.com\n";
        assert_eq!(
            parse_target_list(content),
            vec!["10.0.0.1", "a.com", "b.com", "c.com", "d.com", "e.com", "f.com"]
        );
    }

    #[test]
    fn test_comma_wins_over_space() {
        assert_eq!(parse_target_list("a.com, b.com c.com"), vec!["a.com", "b.com c.com"]);
    }

    #[test]
    fn test_read_input_direct() {
        let input = read_input("10.0.0.1,example.com").unwrap();
        assert_eq!(
            input,
            TargetInput::Direct(vec!["10.0.0.1".to_string(), "example.com".to_string()])
        );
    }

    #[test]
    fn test_read_input_target_list_file() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        writeln!(file, "10.0.0.1\n# skip\nexample.com/admin").unwrap();

        let input = read_input(file.path().to_str().unwrap()).unwrap();
        assert_eq!(
            input,
            TargetInput::TargetList(vec!["10.0.0.1".to_string(), "example.com/admin".to_string()])
        );
    }

    #[test]
    fn test_xml_without_doctype_falls_back_to_list() {
        let mut file = tempfile::Builder::new().suffix(".xml").tempfile().unwrap();
        writeln!(file, "10.0.0.9").unwrap();

        let input = read_input(file.path().to_str().unwrap()).unwrap();
        assert_eq!(input, TargetInput::TargetList(vec!["10.0.0.9".to_string()]));
    }
}
