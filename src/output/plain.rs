//! Plain text output formatting.
//!
//! Produces human-readable output with colors and formatting.

use crate::scanner::ScanSummary;
use crate::storage::ResponseClass;
use crate::types::Socket;
use console::{style, Style};
use std::io::{self, Write};
use std::path::Path;

const RULE: &str = "═══════════════════════════════════════════════════════════════";

/// Print the run header before scanning begins.
pub fn print_scan_header(sockets: usize, identities: usize, ports: usize, threads: usize, json: &Path) {
    println!();
    println!(
        "{} {} v{}",
        style("Starting").cyan(),
        style("PageHawk").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!(
        "{} Targets: {} ({} sockets across {} ports)",
        style("•").dim(),
        style(identities).white().bold(),
        sockets,
        ports
    );
    println!(
        "{} Using {} concurrent workers",
        style("•").dim(),
        style(threads).yellow()
    );
    println!("{} Saving output to {}", style("•").dim(), json.display());
    println!(
        "{} {}",
        style("•").dim(),
        style("Press Ctrl-C to stop; unvisited sockets stay pending for --resume").dim()
    );
    println!();
}

/// Print the end-of-run summary.
pub fn print_summary(summary: &ScanSummary, json: &Path) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    writeln!(out)?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(out, "                    {} Summary", style("PageHawk").cyan().bold())?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(out)?;

    if summary.cancelled {
        writeln!(
            out,
            "  {} interrupted, {} of {} sockets left pending",
            style("Scan:").bold(),
            style(summary.skipped).yellow().bold(),
            summary.total
        )?;
    }
    writeln!(
        out,
        "  {} {} sockets visited in {}",
        style("Statistics:").bold(),
        summary.visited,
        summary.elapsed_human()
    )?;
    writeln!(out)?;

    if !summary.counts.is_empty() {
        writeln!(out, "  {:>14}  {}", style("RESPONSE").bold(), style("COUNT").bold())?;
        for (response, count) in &summary.counts {
            writeln!(
                out,
                "  {:>14}  {}",
                response_style(*response).apply_to(response.to_string()),
                count
            )?;
        }
        writeln!(out)?;
    }

    writeln!(out, "  {} {}", style("Results:").bold(), json.display())?;
    writeln!(out)?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(out)?;

    Ok(())
}

/// Print the socket task list of a dry run.
pub fn print_sockets(sockets: &[Socket]) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for socket in sockets {
        writeln!(out, "{}", socket)?;
    }
    Ok(())
}

fn response_style(response: ResponseClass) -> Style {
    match response {
        ResponseClass::Status(code) if code < 400 => Style::new().green().bold(),
        ResponseClass::Status(_) => Style::new().yellow(),
        ResponseClass::Timeout | ResponseClass::NoResponse => Style::new().yellow().dim(),
        ResponseClass::Pending => Style::new().dim(),
        _ => Style::new().red(),
    }
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), msg);
}
