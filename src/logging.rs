//! Console logging.
//!
//! Events are printed to stderr as `[symbol] message`, one per line.

use console::Style;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::{self, Writer};
use tracing_subscriber::fmt::{FmtContext, FormatEvent};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

/// Compact formatter with one status symbol per level.
pub struct HawkFormatter;

impl<S, N> FormatEvent<S, N> for HawkFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> format::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let (symbol, style) = match *event.metadata().level() {
            Level::TRACE => ("[ ]", Style::new().dim()),
            Level::DEBUG => ("[?]", Style::new().blue()),
            Level::INFO => ("[+]", Style::new().green().bold()),
            Level::WARN => ("[*]", Style::new().yellow().bold()),
            Level::ERROR => ("[-]", Style::new().red().bold()),
        };

        write!(writer, "{} ", style.apply_to(symbol))?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Level shown for a `-v` count: errors only, then warn, info, debug.
pub fn level_for(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        _ => Level::DEBUG,
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the verbosity.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("pagehawk={}", level_for(verbosity).as_str().to_lowercase()))
    });

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .event_format(HawkFormatter)
        .try_init();

    if installed.is_err() {
        tracing::debug!("Logging already initialised");
    }
}
