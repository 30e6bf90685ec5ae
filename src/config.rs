use std::path::PathBuf;
use std::time::Duration;

use crate::lsof::PortRecord;

/// Startup restrictions applied to every snapshot, independent of the
/// interactive filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    pub port: Option<u16>,
    pub user: Option<String>,
    pub command: Option<String>,
}

impl Scope {
    pub fn matches(&self, record: &PortRecord) -> bool {
        if let Some(port) = self.port {
            if record.port_number() != Some(port) {
                return false;
            }
        }
        if let Some(user) = &self.user {
            if &record.user != user {
                return false;
            }
        }
        if let Some(command) = &self.command {
            if !record
                .command
                .to_lowercase()
                .contains(&command.to_lowercase())
            {
                return false;
            }
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        self.port.is_none() && self.user.is_none() && self.command.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub refresh_interval: Duration,
    pub lsof_timeout: Duration,
    pub initial_filter: Option<String>,
    pub scope: Scope,
    pub mouse: bool,
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(1),
            lsof_timeout: Duration::from_secs(3),
            initial_filter: None,
            scope: Scope::default(),
            mouse: true,
            log_file: None,
        }
    }
}
