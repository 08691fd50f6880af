//! Command-line and environment configuration for the server binary.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use hypercontacts_observability::LogFormat;
use hypercontacts_server_jobs::StepSchedule;

/// Default port for the server.
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, Parser)]
#[command(name = "hypercontacts", version, about = "Contact manager with background archive export")]
pub struct Config {
    /// Address to bind.
    #[arg(long, env = "HYPERCONTACTS_HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    #[arg(long, env = "HYPERCONTACTS_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// JSON file the contact list is loaded from at startup.
    #[arg(long, env = "HYPERCONTACTS_CONTACTS", default_value = "contacts.json")]
    pub contacts: PathBuf,

    /// Directory finished archives are written to.
    #[arg(long, env = "HYPERCONTACTS_ARCHIVE_DIR")]
    pub archive_dir: Option<PathBuf>,

    /// Directory served under /static.
    #[arg(long, env = "STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    /// Progress steps in one archive export.
    #[arg(long, env = "HYPERCONTACTS_ARCHIVE_STEPS", default_value_t = 100)]
    pub archive_steps: u32,

    /// Pause before each archive progress step, in milliseconds.
    #[arg(long, env = "HYPERCONTACTS_ARCHIVE_STEP_MS", default_value_t = 50)]
    pub archive_step_ms: u64,

    #[arg(long, env = "HYPERCONTACTS_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Log line format: json or compact.
    #[arg(long, env = "HYPERCONTACTS_LOG_FORMAT", default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,
}

impl Config {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Archive directory, defaulting to `<tmp>/hypercontacts`.
    pub fn archive_dir(&self) -> PathBuf {
        self.archive_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("hypercontacts"))
    }

    /// Static directory.
    ///
    /// Priority:
    /// 1. `--static-dir` / STATIC_DIR (explicit override)
    /// 2. ./static (if it exists)
    /// 3. None (no static files)
    pub fn static_dir(&self) -> Option<PathBuf> {
        self.static_dir.clone().or_else(|| {
            let dir = PathBuf::from("static");
            dir.exists().then_some(dir)
        })
    }

    pub fn archive_schedule(&self) -> StepSchedule {
        StepSchedule::new(self.archive_steps, Duration::from_millis(self.archive_step_ms))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
