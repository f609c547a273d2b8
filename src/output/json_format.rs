//! JSON output formatting.

use crate::storage::VisitStore;
use std::io;

/// Print the visit state in its persisted JSON form.
pub fn print_json(store: &VisitStore) -> io::Result<()> {
    let json = store
        .to_json()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    println!("{}", json);
    Ok(())
}
