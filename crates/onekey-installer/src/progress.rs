use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::time::Duration;

pub const BAR_WIDTH: usize = 40;
pub const REPORT_INTERVAL: Duration = Duration::from_millis(100);

const FILLED_CELL: &str = "█";
const EMPTY_CELL: &str = "░";
const UNITS: [&str; 7] = ["B", "KB", "MB", "GB", "TB", "PB", "EB"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    pub bytes_read: u64,
    pub total_bytes: u64,
}

impl DownloadProgress {
    pub fn percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        self.bytes_read as f64 / self.total_bytes as f64 * 100.0
    }

    pub fn is_complete(&self) -> bool {
        self.bytes_read >= self.total_bytes
    }
}

pub fn filled_cells(percent: f64) -> usize {
    let clamped = percent.clamp(0.0, 100.0);
    ((clamped / 100.0) * BAR_WIDTH as f64).floor() as usize
}

pub fn render_progress_line(description: &str, progress: DownloadProgress) -> String {
    let percent = progress.percent().min(100.0);
    let filled = filled_cells(percent);
    format!(
        "{description} [{}{}] {percent:.1}% ({}/{})",
        FILLED_CELL.repeat(filled),
        EMPTY_CELL.repeat(BAR_WIDTH - filled),
        format_bytes(progress.bytes_read),
        format_bytes(progress.total_bytes)
    )
}

pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

/// Destination for download progress output. Shared with the reporter thread.
pub trait ProgressSink: Sync {
    /// Redraws the current progress line in place.
    fn frame(&self, line: &str);
    /// Terminates the in-place line.
    fn finish_line(&self);
    /// Emits text verbatim.
    fn message(&self, text: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StderrProgress;

impl ProgressSink for StderrProgress {
    fn frame(&self, line: &str) {
        let mut stderr = io::stderr().lock();
        let _ = write!(stderr, "\r{line}");
        let _ = stderr.flush();
    }

    fn finish_line(&self) {
        let _ = writeln!(io::stderr().lock());
    }

    fn message(&self, text: &str) {
        let mut stderr = io::stderr().lock();
        let _ = write!(stderr, "{text}");
        let _ = stderr.flush();
    }
}

const STATE_RUNNING: u8 = 0;
const STATE_SUCCEEDED: u8 = 1;
const STATE_FAILED: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TransferState {
    Running,
    Succeeded,
    Failed,
}

/// Latest-value cell between the copying thread and the reporter. Readers
/// only ever see the most recent byte count, never a backlog.
#[derive(Debug, Default)]
pub(crate) struct ProgressCell {
    bytes: AtomicU64,
    state: AtomicU8,
}

impl ProgressCell {
    pub(crate) fn advance(&self, delta: u64) {
        self.bytes.fetch_add(delta, Ordering::Release);
    }

    pub(crate) fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Acquire)
    }

    pub(crate) fn finish(&self, succeeded: bool) {
        let state = if succeeded {
            STATE_SUCCEEDED
        } else {
            STATE_FAILED
        };
        self.state.store(state, Ordering::Release);
    }

    pub(crate) fn state(&self) -> TransferState {
        match self.state.load(Ordering::Acquire) {
            STATE_RUNNING => TransferState::Running,
            STATE_SUCCEEDED => TransferState::Succeeded,
            _ => TransferState::Failed,
        }
    }
}

pub(crate) fn report_progress(
    cell: &ProgressCell,
    total_bytes: u64,
    description: &str,
    sink: &dyn ProgressSink,
    interval: Duration,
) {
    let mut last_drawn = None;
    loop {
        std::thread::park_timeout(interval);
        let bytes_read = cell.bytes();
        match cell.state() {
            TransferState::Failed => {
                if last_drawn.is_some() {
                    sink.finish_line();
                }
                return;
            }
            TransferState::Succeeded => break,
            TransferState::Running if bytes_read >= total_bytes => break,
            TransferState::Running => {
                if last_drawn != Some(bytes_read) {
                    let progress = DownloadProgress {
                        bytes_read,
                        total_bytes,
                    };
                    sink.frame(&render_progress_line(description, progress));
                    last_drawn = Some(bytes_read);
                }
            }
        }
    }

    let final_bytes = cell.bytes().max(total_bytes);
    let progress = DownloadProgress {
        bytes_read: final_bytes,
        total_bytes: final_bytes,
    };
    sink.frame(&render_progress_line(description, progress));
    sink.finish_line();
}
