//! Scan subcommand implementation.
//!
//! Handles the `pagehawk scan -i <INPUT> -o <OUTPUT>` command.

use super::TargetArgs;
use crate::config::{LayoutOptions, OutputLayout, ProxySettings, Settings};
use crate::error::CliResult;
use crate::output;
use crate::scanner::{HttpRenderer, RendererConfig, ScanJobConfig, ScanOrchestrator, VisitDelay};
use crate::storage::{ScreenshotWriter, SharedStore, VisitStore};
use chrono::Local;
use clap::Parser;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Visit every socket and record the responses.
#[derive(Parser, Debug)]
pub struct ScanCommand {
    #[command(flatten)]
    pub targets: TargetArgs,

    /// Output directory, or a .json/.html file path inside one
    #[arg(short, long, value_name = "PATH")]
    pub output: PathBuf,

    /// Number of concurrent visits
    #[arg(short = 't', long)]
    pub threads: Option<usize>,

    /// Navigation timeout in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout: Option<u64>,

    /// Idle wait after the page loaded, in milliseconds
    #[arg(long, value_name = "MS")]
    pub idle_timeout: Option<u64>,

    /// Lower bound of the random delay before each visit, in milliseconds
    #[arg(long, value_name = "MS")]
    pub delay_from: Option<u64>,

    /// Upper bound of the random delay before each visit, in milliseconds
    #[arg(long, value_name = "MS")]
    pub delay_to: Option<u64>,

    /// Proxy address
    #[arg(long, requires = "proxy_port")]
    pub proxy_ip: Option<String>,

    /// Proxy port
    #[arg(long, requires = "proxy_ip")]
    pub proxy_port: Option<u16>,

    /// Proxy username
    #[arg(long, requires_all = ["proxy_ip", "proxy_password"])]
    pub proxy_username: Option<String>,

    /// Proxy password
    #[arg(long, requires_all = ["proxy_ip", "proxy_username"])]
    pub proxy_password: Option<String>,

    /// Headless-capable Chromium binary used for screenshots
    #[arg(long, value_name = "PATH")]
    pub browser: Option<PathBuf>,

    /// User agent sent with every request
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Store screenshots in a screenshots/ subdirectory
    #[arg(long)]
    pub subdir_screenshots: bool,

    /// Write everything into a pagehawk-<timestamp> subdirectory
    #[arg(long)]
    pub subdir_timestamped: bool,

    /// Skip sockets that already hold a response in the JSON output
    #[arg(long)]
    pub resume: bool,
}

impl ScanCommand {
    /// Execute the scan command.
    pub async fn execute(&self, config: Option<&Path>, verbose: u8, quiet: bool) -> CliResult<()> {
        let settings = self.settings(config)?;
        let plan = self.targets.plan()?;

        let layout = OutputLayout::prepare(
            &self.output,
            LayoutOptions {
                subdir_screenshots: self.subdir_screenshots,
                subdir_timestamped: self.subdir_timestamped,
            },
            Local::now().naive_local(),
        )?;
        tracing::info!("Saving results to {}", layout.json_path.display());

        let mut store = VisitStore::from_sockets(&plan.sockets);
        if layout.json_path.exists() {
            match VisitStore::load(&layout.json_path) {
                Ok(previous) => {
                    let kept = store.merge_previous(previous);
                    tracing::info!("Carried over {} records from the previous run", kept);
                }
                Err(e) => tracing::warn!("Ignoring previous results: {}", e),
            }
        } else if self.resume {
            tracing::warn!("Nothing to resume, {} does not exist", layout.json_path.display());
        }

        let identities = plan
            .sockets
            .iter()
            .map(|s| s.identity())
            .collect::<HashSet<_>>()
            .len();

        let store = Arc::new(SharedStore::new(store, &layout.json_path));
        store.flush().await?;

        let renderer = HttpRenderer::new(
            RendererConfig::default()
                .with_user_agent(settings.user_agent.clone())
                .with_idle_timeout(settings.idle_timeout())
                .with_browser(settings.browser.clone())
                .with_proxy(settings.proxy.clone()),
        )?;

        if !quiet {
            output::print_scan_header(
                plan.sockets.len(),
                identities,
                plan.ports.len(),
                settings.threads,
                &layout.json_path,
            );
        }

        let job = ScanJobConfig::default()
            .with_concurrency(settings.threads)
            .with_timeout(settings.timeout())
            .with_delay(VisitDelay::from_millis(
                settings.delay_from_ms,
                settings.delay_to_ms,
            ))
            .with_resume(self.resume)
            .with_progress(!quiet && verbose < 2);

        let cancel = CancellationToken::new();
        tokio::spawn(watch_interrupts(cancel.clone()));

        let summary = ScanOrchestrator::new(Arc::new(renderer), Arc::clone(&store), job)
            .with_screenshots(ScreenshotWriter::new(
                &layout.run_dir,
                layout.subdir_screenshots,
            ))
            .with_cancellation(cancel)
            .run()
            .await;

        if !quiet {
            output::print_summary(&summary, &layout.json_path)?;
        }
        if summary.cancelled {
            output::print_warning("Scan interrupted; rerun with --resume to continue");
        }

        Ok(())
    }

    /// Settings file values with command-line overrides applied.
    fn settings(&self, config: Option<&Path>) -> CliResult<Settings> {
        let mut settings = match config {
            Some(path) => Settings::load_from(path)?,
            None => Settings::load()?,
        };

        if let Some(threads) = self.threads {
            settings.threads = threads;
        }
        if let Some(timeout) = self.timeout {
            settings.timeout_ms = timeout;
        }
        if let Some(idle) = self.idle_timeout {
            settings.idle_timeout_ms = idle;
        }
        if let Some(from) = self.delay_from {
            settings.delay_from_ms = from;
        }
        if let Some(to) = self.delay_to {
            settings.delay_to_ms = to;
        }
        if let Some(ua) = &self.user_agent {
            settings.user_agent = ua.clone();
        }
        if self.browser.is_some() {
            settings.browser = self.browser.clone();
        }
        if let (Some(ip), Some(port)) = (&self.proxy_ip, self.proxy_port) {
            let mut proxy = ProxySettings::new(ip.clone(), port);
            if let (Some(user), Some(pass)) = (&self.proxy_username, &self.proxy_password) {
                proxy = proxy.with_credentials(user.clone(), pass.clone());
            }
            settings.proxy = Some(proxy);
        }

        settings.validate()?;
        Ok(settings)
    }
}

/// Exit status used when a second interrupt aborts the run.
const INTERRUPT_EXIT_CODE: i32 = 130;

/// What an incoming Ctrl-C should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InterruptAction {
    /// Stop starting visits and let in-flight ones finish.
    Drain,
    /// Leave immediately; the last flushed snapshot stays on disk.
    Abort,
}

fn interrupt_action(signals_seen: usize) -> InterruptAction {
    if signals_seen <= 1 {
        InterruptAction::Drain
    } else {
        InterruptAction::Abort
    }
}

/// First Ctrl-C cancels `token`, a second one exits the process.
async fn watch_interrupts(token: CancellationToken) {
    let mut seen = 0;
    while tokio::signal::ctrl_c().await.is_ok() {
        seen += 1;
        match interrupt_action(seen) {
            InterruptAction::Drain => {
                tracing::warn!("Interrupted, finishing in-flight visits (Ctrl-C again to quit)");
                token.cancel();
            }
            InterruptAction::Abort => {
                output::print_warning("Aborted; rerun with --resume to continue");
                std::process::exit(INTERRUPT_EXIT_CODE);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use std::io::Write;

    fn parse(args: &[&str]) -> ScanCommand {
        let mut argv = vec!["pagehawk", "scan", "-i", "10.0.0.1", "-o", "/tmp"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Scan(cmd) => cmd,
            other => panic!("expected scan, got {:?}", other),
        }
    }

    fn empty_config() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{}}").unwrap();
        file
    }

    #[test]
    fn test_flags_override_settings() {
        let config = empty_config();
        let cmd = parse(&[
            "--threads", "3", "--timeout", "500", "--delay-to", "200",
            "--proxy-ip", "127.0.0.1", "--proxy-port", "8080",
        ]);
        let settings = cmd.settings(Some(config.path())).unwrap();

        assert_eq!(settings.threads, 3);
        assert_eq!(settings.timeout_ms, 500);
        assert_eq!(settings.delay_to_ms, 200);
        assert_eq!(settings.idle_timeout_ms, 5_000);
        assert_eq!(settings.proxy, Some(ProxySettings::new("127.0.0.1", 8080)));
    }

    #[test]
    fn test_proxy_port_requires_ip() {
        let argv = ["pagehawk", "scan", "-i", "x.com", "-o", "/tmp", "--proxy-port", "8080"];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_second_interrupt_aborts() {
        assert_eq!(interrupt_action(1), InterruptAction::Drain);
        assert_eq!(interrupt_action(2), InterruptAction::Abort);
        assert_eq!(interrupt_action(5), InterruptAction::Abort);
    }

    #[test]
    fn test_zero_threads_rejected() {
        let config = empty_config();
        let cmd = parse(&["--threads", "0"]);
        assert!(cmd.settings(Some(config.path())).is_err());
    }
}
