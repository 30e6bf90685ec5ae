use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

const LSOF_ARGS: [&str; 4] = ["-i", "-P", "-n", "-sTCP:LISTEN"];
const ADDRESS_FIELD: usize = 8;
const WAIT_STEP: Duration = Duration::from_millis(20);

/// One process bound to a listening TCP port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortRecord {
    pub port: String,
    pub pid: String,
    pub user: String,
    pub command: String,
}

impl PortRecord {
    pub fn port_number(&self) -> Option<u16> {
        self.port.parse().ok()
    }
}

/// Every record from one `lsof` run. Replaced wholesale on refresh.
pub type Snapshot = Vec<PortRecord>;

pub trait SnapshotSource {
    /// Never fails: an unavailable or failing tool yields an empty snapshot.
    fn list_ports(&self) -> Snapshot;
}

#[derive(Debug, Error)]
enum SnapshotError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("child stdout was not captured")]
    MissingStdout,
    #[error("failed to wait for child: {0}")]
    Wait(std::io::Error),
    #[error("failed to read child output: {0}")]
    Read(std::io::Error),
    #[error("output reader thread panicked")]
    ReaderPanicked,
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
    #[error("exited with {0}")]
    Exit(ExitStatus),
}

impl SnapshotError {
    /// lsof exits 1 when nothing is listening, so a bad exit status is routine.
    fn is_routine(&self) -> bool {
        matches!(self, SnapshotError::Exit(_))
    }
}

/// Runs `lsof -i -P -n -sTCP:LISTEN` with an upper bound on its run time.
#[derive(Debug, Clone)]
pub struct LsofSource {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl LsofSource {
    pub fn new(timeout: Duration) -> Self {
        Self::with_program("lsof", timeout)
    }

    pub fn with_program(program: impl Into<String>, timeout: Duration) -> Self {
        Self::with_command(program, &LSOF_ARGS, timeout)
    }

    pub fn with_command(program: impl Into<String>, args: &[&str], timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
            timeout,
        }
    }

    fn run(&self) -> Result<String, SnapshotError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| SnapshotError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // Drain stdout concurrently so a full pipe can't stall the child past the deadline.
        let mut stdout = child.stdout.take().ok_or(SnapshotError::MissingStdout)?;
        let reader = thread::spawn(move || {
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).map(|_| buf)
        });

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait().map_err(SnapshotError::Wait)? {
                break status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(SnapshotError::TimedOut(self.timeout));
            }
            thread::sleep(WAIT_STEP);
        };

        let output = reader
            .join()
            .map_err(|_| SnapshotError::ReaderPanicked)?
            .map_err(SnapshotError::Read)?;

        if !status.success() {
            return Err(SnapshotError::Exit(status));
        }
        // Command names are not guaranteed UTF-8; a bad byte must not cost the other rows.
        Ok(String::from_utf8_lossy(&output).into_owned())
    }
}

impl SnapshotSource for LsofSource {
    fn list_ports(&self) -> Snapshot {
        match self.run() {
            Ok(output) => {
                let records = parse_lsof_output(&output);
                tracing::debug!(count = records.len(), "listed listening ports");
                records
            }
            Err(err) if err.is_routine() => {
                tracing::debug!(program = %self.program, "snapshot empty: {err}");
                Vec::new()
            }
            Err(err) => {
                tracing::warn!(program = %self.program, "snapshot unavailable: {err}");
                Vec::new()
            }
        }
    }
}

/// Parses `lsof` tabular output. The first line is the header; blank and
/// malformed lines are skipped without affecting the rest.
pub fn parse_lsof_output(output: &str) -> Snapshot {
    output.lines().skip(1).filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<PortRecord> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() <= ADDRESS_FIELD {
        return None;
    }

    let (_, port) = fields[ADDRESS_FIELD].rsplit_once(':')?;
    if port.is_empty() {
        return None;
    }

    Some(PortRecord {
        port: port.to_string(),
        pid: fields[1].to_string(),
        user: fields[2].to_string(),
        command: fields[0].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "\
COMMAND   PID  USER   FD   TYPE DEVICE SIZE/OFF NODE NAME
nginx     111  root    6u  IPv4  12345      0t0  TCP 0.0.0.0:8080 (LISTEN)
node      222  alice  21u  IPv4  23456      0t0  TCP 127.0.0.1:3000 (LISTEN)
postgres  333  pg      7u  IPv6  34567      0t0  TCP [::1]:5432 (LISTEN)
";

    fn record(port: &str, pid: &str, user: &str, command: &str) -> PortRecord {
        PortRecord {
            port: port.into(),
            pid: pid.into(),
            user: user.into(),
            command: command.into(),
        }
    }

    #[test]
    fn parses_every_well_formed_row() {
        assert_eq!(
            parse_lsof_output(SAMPLE),
            vec![
                record("8080", "111", "root", "nginx"),
                record("3000", "222", "alice", "node"),
                record("5432", "333", "pg", "postgres"),
            ]
        );
    }

    #[test]
    fn short_rows_are_skipped_without_affecting_others() {
        let output = "\
COMMAND PID USER FD TYPE DEVICE SIZE/OFF NODE NAME
broken 999 root 6u IPv4 12345 0t0 TCP
node 222 alice 21u IPv4 23456 0t0 TCP 127.0.0.1:3000 (LISTEN)
";
        assert_eq!(
            parse_lsof_output(output),
            vec![record("3000", "222", "alice", "node")]
        );
    }

    #[test]
    fn address_without_port_separator_is_skipped() {
        let output = "\
COMMAND PID USER FD TYPE DEVICE SIZE/OFF NODE NAME
odd 10 root 6u IPv4 12345 0t0 TCP localhost (LISTEN)
odd 11 root 6u IPv4 12345 0t0 TCP localhost: (LISTEN)
";
        assert!(parse_lsof_output(output).is_empty());
    }

    #[test]
    fn blank_lines_are_ignored() {
        let output = "HEADER\n\n  \nnode 222 alice 21u IPv4 1 0t0 TCP *:3000 (LISTEN)\n\n";
        assert_eq!(
            parse_lsof_output(output),
            vec![record("3000", "222", "alice", "node")]
        );
    }

    #[test]
    fn header_only_or_empty_output_yields_nothing() {
        assert!(parse_lsof_output("").is_empty());
        assert!(parse_lsof_output("COMMAND PID USER FD TYPE DEVICE SIZE/OFF NODE NAME\n").is_empty());
    }

    #[test]
    fn port_number_parses_numeric_ports_only() {
        assert_eq!(record("8080", "1", "u", "c").port_number(), Some(8080));
        assert_eq!(record("http", "1", "u", "c").port_number(), None);
    }

    #[test]
    fn missing_program_degrades_to_empty_snapshot() {
        let source = LsofSource::with_program("gruyere-no-such-tool", Duration::from_secs(1));
        assert!(source.list_ports().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn invalid_utf8_row_keeps_the_other_rows() {
        let script = "printf 'COMMAND PID USER FD TYPE DEVICE SIZE/OFF NODE NAME\\n\
nginx 111 root 6u IPv4 12345 0t0 TCP 0.0.0.0:8080 (LISTEN)\\n\
w\\377rd 222 alice 21u IPv4 23456 0t0 TCP 127.0.0.1:3000 (LISTEN)\\n'";
        let source = LsofSource::with_command("sh", &["-c", script], Duration::from_secs(2));

        let snapshot = source.list_ports();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0], record("8080", "111", "root", "nginx"));
        assert_eq!(snapshot[1].pid, "222");
        assert_eq!(snapshot[1].command, "w\u{FFFD}rd");
    }

    #[cfg(unix)]
    #[test]
    fn failing_program_degrades_to_empty_snapshot() {
        let source = LsofSource::with_program("false", Duration::from_secs(1));
        assert!(source.list_ports().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn only_a_bad_exit_status_counts_as_routine() {
        let exited = LsofSource::with_program("false", Duration::from_secs(1))
            .run()
            .unwrap_err();
        assert!(matches!(exited, SnapshotError::Exit(_)));
        assert!(exited.is_routine());

        let missing = LsofSource::with_program("gruyere-no-such-tool", Duration::from_secs(1))
            .run()
            .unwrap_err();
        assert!(!missing.is_routine());

        let timed_out = LsofSource::with_command("sleep", &["5"], Duration::from_millis(50))
            .run()
            .unwrap_err();
        assert!(matches!(timed_out, SnapshotError::TimedOut(_)));
        assert!(!timed_out.is_routine());
    }
}
