use thiserror::Error;

#[derive(Debug, Error)]
pub enum OnekeyError {
    #[error("network request failed for {url}: {detail}")]
    Network { url: String, detail: String },

    #[error("failed to decode {what}: {detail}")]
    Decode { what: String, detail: String },

    #[error("archive error in {path}: {detail}")]
    Archive { path: String, detail: String },

    #[error("filesystem error at {path}: {detail}")]
    Filesystem { path: String, detail: String },

    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("service verification failed: {0}")]
    ServiceVerification(String),

    #[error("{0} is not installed")]
    NotInstalled(String),

    #[error("{context}: status={status} stdout='{stdout}' stderr='{stderr}'")]
    Command {
        context: String,
        status: String,
        stdout: String,
        stderr: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Decode,
    Archive,
    Filesystem,
    UnsupportedPlatform,
    ServiceVerification,
    NotInstalled,
    Command,
}

impl OnekeyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } => ErrorKind::Network,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::Archive { .. } => ErrorKind::Archive,
            Self::Filesystem { .. } => ErrorKind::Filesystem,
            Self::UnsupportedPlatform(_) => ErrorKind::UnsupportedPlatform,
            Self::ServiceVerification(_) => ErrorKind::ServiceVerification,
            Self::NotInstalled(_) => ErrorKind::NotInstalled,
            Self::Command { .. } => ErrorKind::Command,
        }
    }

    pub fn network(url: &str, detail: impl ToString) -> Self {
        Self::Network {
            url: url.to_string(),
            detail: detail.to_string(),
        }
    }

    pub fn decode(what: &str, detail: impl ToString) -> Self {
        Self::Decode {
            what: what.to_string(),
            detail: detail.to_string(),
        }
    }

    pub fn archive(path: &std::path::Path, detail: impl ToString) -> Self {
        Self::Archive {
            path: path.display().to_string(),
            detail: detail.to_string(),
        }
    }

    pub fn filesystem(path: &std::path::Path, detail: impl ToString) -> Self {
        Self::Filesystem {
            path: path.display().to_string(),
            detail: detail.to_string(),
        }
    }
}

/// Finds the first typed failure anywhere in an error chain.
pub fn error_kind(err: &anyhow::Error) -> Option<ErrorKind> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<OnekeyError>())
        .map(OnekeyError::kind)
}
