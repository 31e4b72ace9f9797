//! Line-oriented standard input that never blocks the transport.
//!
//! Reading happens on a helper thread which hands each line over a
//! rendezvous channel. The command loop waits on that channel for a short
//! interval at a time and services the transport between waits.

use std::io::{self, BufRead};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::debug;

/// Outcome of waiting briefly for a line of input.
#[derive(Debug)]
pub enum LinePoll {
    /// A complete line, including its terminator if it had one.
    Line(String),
    /// Nothing arrived within the wait.
    Pending,
    /// Input is exhausted.
    Closed,
    /// Reading failed.
    Failed(io::Error),
}

/// A source of input lines that can be polled with a bounded wait.
pub trait LineSource {
    /// Waits up to `wait` for the next line.
    fn poll_line(&mut self, wait: Duration) -> LinePoll;
}

/// [`LineSource`] backed by any buffered reader, read on a helper thread.
///
/// The thread is started on the first poll, so constructing one for a
/// command that never reads input costs nothing.
#[derive(Debug)]
pub struct ReaderLines<R> {
    reader: Option<R>,
    receiver: Option<Receiver<io::Result<String>>>,
}

impl<R> ReaderLines<R>
where
    R: BufRead + Send + 'static,
{
    /// Wraps `reader` without starting to read from it.
    #[must_use]
    pub const fn new(reader: R) -> Self {
        Self {
            reader: Some(reader),
            receiver: None,
        }
    }

    fn receiver(&mut self) -> Option<&Receiver<io::Result<String>>> {
        if self.receiver.is_none()
            && let Some(reader) = self.reader.take()
        {
            self.receiver = Some(spawn_reader(reader));
        }
        self.receiver.as_ref()
    }
}

impl ReaderLines<io::BufReader<io::Stdin>> {
    /// Lines from the process's standard input.
    #[must_use]
    pub fn stdin() -> Self {
        Self::new(io::BufReader::new(io::stdin()))
    }
}

impl<R> LineSource for ReaderLines<R>
where
    R: BufRead + Send + 'static,
{
    fn poll_line(&mut self, wait: Duration) -> LinePoll {
        let Some(receiver) = self.receiver() else {
            return LinePoll::Closed;
        };
        match receiver.recv_timeout(wait) {
            Ok(Ok(line)) => LinePoll::Line(line),
            Ok(Err(error)) => LinePoll::Failed(error),
            Err(RecvTimeoutError::Timeout) => LinePoll::Pending,
            Err(RecvTimeoutError::Disconnected) => LinePoll::Closed,
        }
    }
}

fn spawn_reader<R>(mut reader: R) -> Receiver<io::Result<String>>
where
    R: BufRead + Send + 'static,
{
    let (sender, receiver) = mpsc::sync_channel(0);
    thread::spawn(move || {
        loop {
            let mut line = String::new();
            let result = match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => Ok(line),
                Err(error) => Err(error),
            };
            let failed = result.is_err();
            if sender.send(result).is_err() || failed {
                break;
            }
        }
        debug!("input reader finished");
    });
    receiver
}

/// Strips one trailing `\n` or `\r\n` from `line`.
#[must_use]
pub fn trim_terminator(line: &str) -> &str {
    line.strip_suffix('\n')
        .map_or(line, |body| body.strip_suffix('\r').unwrap_or(body))
}
