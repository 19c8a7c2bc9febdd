mod archive;
mod binary;
mod download;
mod fetch;
mod fs_utils;
mod pipeline;
mod progress;
mod resolve;
mod runner;
mod service;
mod uninstall;

pub use archive::{extract_tar_gz, sanitize_entry_path, ExtractReport};
pub use binary::{download_binary, install_binary, BinaryOutcome, BinaryRequest};
pub use download::{DownloadKind, Downloader, SMALL_FILE_THRESHOLD};
pub use fetch::{FetchResponse, Fetcher, HttpFetcher};
pub use pipeline::{
    require_installed, HostPlatform, InstallOutcome, InstallRequest, Interaction, Orchestrator,
    Stage, UpdateOutcome,
};
pub use progress::{
    filled_cells, format_bytes, render_progress_line, DownloadProgress, ProgressSink,
    StderrProgress, BAR_WIDTH, REPORT_INTERVAL,
};
pub use resolve::{detect_public_ip, resolve_latest_release, FALLBACK_SERVER_IP};
pub use runner::{argv, run_checked, CommandOutput, CommandRunner, SystemRunner};
pub use service::{
    provision_init_script, ServiceAction, ServiceController, ServiceOutcome, ServiceStatus,
    UnregisterReport,
};
pub use uninstall::{uninstall_service, UninstallOutcome};
