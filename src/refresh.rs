use std::io;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use crate::lsof::{Snapshot, SnapshotSource};

/// Spawns the periodic refresh worker. Each tick's snapshot is posted to the
/// returned receiver; the worker stops once the receiver is dropped.
pub fn spawn<S>(source: S, interval: Duration) -> io::Result<Receiver<Snapshot>>
where
    S: SnapshotSource + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("snapshot-refresh".into())
        .spawn(move || {
            loop {
                thread::sleep(interval);
                if tx.send(source.list_ports()).is_err() {
                    tracing::debug!("refresh receiver dropped, stopping worker");
                    break;
                }
            }
        })?;
    Ok(rx)
}
