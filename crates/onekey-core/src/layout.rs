use std::path::{Path, PathBuf};

pub const SERVICE_NAME: &str = "frps";
pub const CONFIG_FILE_NAME: &str = "frps.toml";
pub const LOG_FILE_NAME: &str = "frps.log";

const SYSTEM_INSTALL_DIR: &str = "/usr/local/frps";
const SYSTEM_INIT_SCRIPT: &str = "/etc/init.d/frps";
const SYSTEM_SYMLINK: &str = "/usr/bin/frps";
const SYSTEM_PID_FILE: &str = "/var/run/frps.pid";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallTarget {
    install_dir: PathBuf,
    binary_name: String,
    init_script_path: PathBuf,
    symlink_path: PathBuf,
    pid_file_path: PathBuf,
}

impl InstallTarget {
    pub fn system() -> Self {
        Self {
            install_dir: PathBuf::from(SYSTEM_INSTALL_DIR),
            binary_name: SERVICE_NAME.to_string(),
            init_script_path: PathBuf::from(SYSTEM_INIT_SCRIPT),
            symlink_path: PathBuf::from(SYSTEM_SYMLINK),
            pid_file_path: PathBuf::from(SYSTEM_PID_FILE),
        }
    }

    /// The system layout with every absolute path re-anchored under `root`.
    pub fn rooted(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let reroot = |path: &str| root.join(path.trim_start_matches('/'));
        Self {
            install_dir: reroot(SYSTEM_INSTALL_DIR),
            binary_name: SERVICE_NAME.to_string(),
            init_script_path: reroot(SYSTEM_INIT_SCRIPT),
            symlink_path: reroot(SYSTEM_SYMLINK),
            pid_file_path: reroot(SYSTEM_PID_FILE),
        }
    }

    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    pub fn binary_name(&self) -> &str {
        &self.binary_name
    }

    pub fn init_script_path(&self) -> &Path {
        &self.init_script_path
    }

    pub fn symlink_path(&self) -> &Path {
        &self.symlink_path
    }

    pub fn pid_file_path(&self) -> &Path {
        &self.pid_file_path
    }

    pub fn binary_path(&self) -> PathBuf {
        self.install_dir.join(&self.binary_name)
    }

    pub fn backup_path(&self) -> PathBuf {
        self.install_dir.join(format!("{}.backup", self.binary_name))
    }

    pub fn config_path(&self) -> PathBuf {
        self.install_dir.join(CONFIG_FILE_NAME)
    }

    pub fn log_path(&self) -> PathBuf {
        self.install_dir.join(LOG_FILE_NAME)
    }

    pub fn staging_dir(&self, run_id: &str) -> PathBuf {
        self.install_dir.join(format!(".staging-{run_id}"))
    }

    /// Paths removed on uninstall, in removal order.
    pub fn removal_paths(&self) -> Vec<PathBuf> {
        vec![
            self.init_script_path.clone(),
            self.pid_file_path.clone(),
            self.symlink_path.clone(),
            self.install_dir.clone(),
        ]
    }
}
