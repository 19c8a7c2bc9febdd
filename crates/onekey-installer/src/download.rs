use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use onekey_core::OnekeyError;
use tracing::{debug, info};

use crate::fetch::Fetcher;
use crate::progress::{report_progress, ProgressCell, ProgressSink, REPORT_INTERVAL};

pub const SMALL_FILE_THRESHOLD: u64 = 10 * 1024;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadKind {
    Binary,
    Script,
}

impl DownloadKind {
    pub fn fallback_total(self) -> u64 {
        match self {
            Self::Binary => 1,
            Self::Script => 8 * 1024,
        }
    }

    pub fn shows_progress_bar(self, total_bytes: u64) -> bool {
        match self {
            Self::Binary => true,
            Self::Script => total_bytes > SMALL_FILE_THRESHOLD,
        }
    }
}

pub struct Downloader<'a> {
    fetcher: &'a dyn Fetcher,
    sink: &'a dyn ProgressSink,
    interval: Duration,
}

impl<'a> Downloader<'a> {
    pub fn new(fetcher: &'a dyn Fetcher, sink: &'a dyn ProgressSink) -> Self {
        Self {
            fetcher,
            sink,
            interval: REPORT_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Streams `url` into `dest`, returning the number of bytes written.
    pub fn download(
        &self,
        url: &str,
        dest: &Path,
        description: &str,
        kind: DownloadKind,
    ) -> Result<u64> {
        info!(url, dest = %dest.display(), "downloading");
        let mut response = self.fetcher.get(url)?;
        let total_bytes = response
            .content_length
            .filter(|length| *length > 0)
            .unwrap_or_else(|| kind.fallback_total());
        let mut file = File::create(dest).map_err(|err| OnekeyError::filesystem(dest, err))?;

        let cell = ProgressCell::default();
        let written = if kind.shows_progress_bar(total_bytes) {
            let sink = self.sink;
            let interval = self.interval;
            let cell_ref = &cell;
            std::thread::scope(|scope| {
                let reporter = scope.spawn(move || {
                    report_progress(cell_ref, total_bytes, description, sink, interval)
                });
                let result = copy_counted(&mut response.body, &mut file, &cell, url, dest);
                cell.finish(result.is_ok());
                reporter.thread().unpark();
                let _ = reporter.join();
                result
            })?
        } else {
            self.sink.message(&format!("{description}..."));
            match copy_counted(&mut response.body, &mut file, &cell, url, dest) {
                Ok(written) => {
                    self.sink.message(" done\n");
                    written
                }
                Err(err) => {
                    self.sink.message(" failed\n");
                    return Err(err);
                }
            }
        };

        file.flush()
            .map_err(|err| OnekeyError::filesystem(dest, err))?;
        debug!(url, written, "download finished");
        Ok(written)
    }
}

fn copy_counted(
    reader: &mut dyn Read,
    writer: &mut dyn Write,
    cell: &ProgressCell,
    url: &str,
    dest: &Path,
) -> Result<u64> {
    let mut buffer = vec![0_u8; COPY_BUFFER_SIZE];
    let mut written = 0_u64;
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => return Ok(written),
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(OnekeyError::network(url, err).into()),
        };
        writer
            .write_all(&buffer[..read])
            .map_err(|err| OnekeyError::filesystem(dest, err))?;
        written += read as u64;
        cell.advance(read as u64);
    }
}
