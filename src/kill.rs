use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TerminationError {
    #[error("invalid pid {0:?}")]
    InvalidPid(String),
    #[error("failed to kill process {pid}: {source}")]
    SignalFailed { pid: i32, source: Errno },
}

pub trait Terminator {
    fn terminate(&self, pid: &str) -> Result<(), TerminationError>;
}

/// Sends SIGKILL once. Delivery is not verified against the process table.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalTerminator;

impl Terminator for SignalTerminator {
    fn terminate(&self, pid: &str) -> Result<(), TerminationError> {
        let raw = parse_pid(pid)?;
        signal::kill(Pid::from_raw(raw), Signal::SIGKILL)
            .map_err(|source| TerminationError::SignalFailed { pid: raw, source })
    }
}

/// Zero and negative values address process groups, so they are rejected.
fn parse_pid(pid: &str) -> Result<i32, TerminationError> {
    match pid.trim().parse::<i32>() {
        Ok(raw) if raw > 0 => Ok(raw),
        _ => Err(TerminationError::InvalidPid(pid.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn non_numeric_pid_is_invalid() {
        assert_eq!(
            SignalTerminator.terminate("abc"),
            Err(TerminationError::InvalidPid("abc".into()))
        );
        assert_eq!(
            SignalTerminator.terminate(""),
            Err(TerminationError::InvalidPid(String::new()))
        );
    }

    #[test]
    fn group_addressing_pids_are_invalid() {
        assert_eq!(
            SignalTerminator.terminate("0"),
            Err(TerminationError::InvalidPid("0".into()))
        );
        assert_eq!(
            SignalTerminator.terminate("-1"),
            Err(TerminationError::InvalidPid("-1".into()))
        );
    }

    #[test]
    fn missing_process_reports_signal_failure() {
        // Above the kernel's pid_max ceiling, so nothing can own it.
        let err = SignalTerminator.terminate("2147483647").unwrap_err();
        assert_eq!(
            err,
            TerminationError::SignalFailed {
                pid: i32::MAX,
                source: Errno::ESRCH,
            }
        );
    }

    #[test]
    fn kills_a_live_child_with_sigkill() {
        use std::os::unix::process::ExitStatusExt;
        use std::process::Command;

        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        SignalTerminator
            .terminate(&child.id().to_string())
            .unwrap();
        let status = child.wait().unwrap();
        assert_eq!(status.signal(), Some(Signal::SIGKILL as i32));
    }
}
