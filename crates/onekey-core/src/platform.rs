use crate::layout::SERVICE_NAME;

pub const DEPENDENCY_PACKAGES: [&str; 4] = ["wget", "psmisc", "net-tools", "curl"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    RedHat,
    Debian,
}

impl OsFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RedHat => "redhat",
            Self::Debian => "debian",
        }
    }

    pub fn from_os_release(content: &str) -> Option<Self> {
        const MARKERS: [(&str, OsFamily); 6] = [
            ("CentOS", OsFamily::RedHat),
            ("Ubuntu", OsFamily::Debian),
            ("Debian", OsFamily::Debian),
            ("Red Hat", OsFamily::RedHat),
            ("Rocky", OsFamily::RedHat),
            ("AlmaLinux", OsFamily::RedHat),
        ];
        MARKERS
            .iter()
            .find(|(marker, _)| content.contains(marker))
            .map(|(_, family)| *family)
    }

    pub fn dependency_install_commands(self) -> Vec<Vec<String>> {
        let mut commands = Vec::new();
        let mut install = match self {
            Self::RedHat => argv(&["yum", "install", "-y"]),
            Self::Debian => {
                commands.push(argv(&["apt-get", "-y", "update"]));
                argv(&["apt-get", "-y", "install"])
            }
        };
        install.extend(DEPENDENCY_PACKAGES.iter().map(|name| name.to_string()));
        commands.push(install);
        commands
    }

    pub fn boot_register_command(self) -> Vec<String> {
        match self {
            Self::RedHat => argv(&["chkconfig", "--add", SERVICE_NAME]),
            Self::Debian => argv(&["update-rc.d", "-f", SERVICE_NAME, "defaults"]),
        }
    }

    pub fn boot_unregister_command(self) -> Vec<String> {
        match self {
            Self::RedHat => argv(&["chkconfig", "--del", SERVICE_NAME]),
            Self::Debian => argv(&["update-rc.d", "-f", SERVICE_NAME, "remove"]),
        }
    }
}

/// Maps a Rust `target_arch` (plus endianness for MIPS) to frp's release naming.
pub fn service_arch(rust_arch: &str, little_endian: bool) -> &'static str {
    match (rust_arch, little_endian) {
        ("x86_64", _) => "amd64",
        ("x86", _) => "386",
        ("aarch64", _) => "arm64",
        ("arm", _) => "arm",
        ("mips", false) => "mips",
        ("mips", true) => "mipsle",
        ("mips64", false) => "mips64",
        ("mips64", true) => "mips64le",
        ("riscv64", _) => "riscv64",
        _ => "amd64",
    }
}

pub fn host_service_arch() -> &'static str {
    service_arch(std::env::consts::ARCH, cfg!(target_endian = "little"))
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|part| part.to_string()).collect()
}
