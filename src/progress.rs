//! Live status lines emitted while the sync engine walks the catalog.

use owo_colors::OwoColorize;
use std::path::Path;

/// Something the user should see as it happens.
#[derive(Debug, Clone, Copy)]
pub enum SyncEvent<'a> {
    FirstRun,
    StateEntryRemoved { path: &'a Path },
    CourseStarted { name: &'a str },
    CourseSkipped { name: &'a str, reason: &'a str },
    Downloading { file_name: &'a str, redownload: bool },
    Downloaded { path: &'a Path },
    DownloadFailed { file_name: &'a str, reason: &'a str },
}

/// Receives [`SyncEvent`]s in walk order.
pub trait ProgressReporter {
    fn report(&mut self, event: SyncEvent<'_>);
}

/// Discards every event.
#[derive(Debug, Default)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&mut self, _event: SyncEvent<'_>) {}
}

/// Prints colored status lines to stdout.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn render(event: SyncEvent<'_>) -> String {
        match event {
            SyncEvent::FirstRun => format!("{}", "First run - downloading all content".bold()),
            SyncEvent::StateEntryRemoved { path } => format!(
                "  {} {}",
                "Removed missing file from state:".yellow(),
                path.display()
            ),
            SyncEvent::CourseStarted { name } => format!("\n{} {}", "Course:".bold(), name),
            SyncEvent::CourseSkipped { name, reason } => format!(
                "{} {} ({})",
                "Skipped course:".red(),
                name,
                reason
            ),
            SyncEvent::Downloading {
                file_name,
                redownload: true,
            } => format!("  {} {}", "Re-downloading deleted file:".blue(), file_name),
            SyncEvent::Downloading {
                file_name,
                redownload: false,
            } => format!("  {} {}", "Downloading:".blue(), file_name),
            SyncEvent::Downloaded { path } => {
                format!("  {} {}", "Downloaded to".green(), path.display())
            }
            SyncEvent::DownloadFailed { file_name, reason } => {
                format!("  {} {}: {}", "Failed to download".red(), file_name, reason)
            }
        }
    }
}

impl ProgressReporter for ConsoleReporter {
    fn report(&mut self, event: SyncEvent<'_>) {
        println!("{}", Self::render(event));
    }
}

/// Collects rendered lines; used where output must be captured instead of printed.
#[derive(Debug, Default)]
pub struct BufferedReporter {
    pub lines: Vec<String>,
}

impl ProgressReporter for BufferedReporter {
    fn report(&mut self, event: SyncEvent<'_>) {
        self.lines.push(ConsoleReporter::render(event));
    }
}
