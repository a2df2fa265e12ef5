//! A terminal progress ticker for long-running imports.

use std::io::Write;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::consts::format_number;

/// Braille spinner frames.
const FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Frame interval.
const INTERVAL: Duration = Duration::from_millis(80);

/// A progress line drawn by a background task: a spinner plus a live row
/// count fed through [`Progress::set`].
///
/// Call [`Progress::start`] to begin, then [`Progress::stop`] when done.
/// The line goes to stderr so it doesn't interfere with stdout output.
pub struct Progress {
    handle: JoinHandle<()>,
    count: watch::Sender<Option<u64>>,
    cancel: watch::Sender<bool>,
}

impl Progress {
    /// Start a progress line with the given message (e.g. `"importing"`).
    pub fn start(message: &str) -> Self {
        let (count_tx, count_rx) = watch::channel(None);
        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        let message = message.to_string();

        let handle = tokio::spawn(async move {
            let mut i = 0;
            loop {
                let frame = FRAMES[i % FRAMES.len()];
                let suffix = match *count_rx.borrow() {
                    Some(n) => format!(" {} rows", format_number(n)),
                    None => String::new(),
                };
                // \r moves to start of line, \x1b[2K clears the line
                eprint!("\x1b[2K\r{frame} {message}{suffix}");
                let _ = std::io::stderr().flush();

                tokio::select! {
                    _ = tokio::time::sleep(INTERVAL) => {}
                    _ = cancel_rx.changed() => break,
                }
                i += 1;
            }
            // Clear the progress line
            eprint!("\x1b[2K\r");
            let _ = std::io::stderr().flush();
        });

        Self {
            handle,
            count: count_tx,
            cancel: cancel_tx,
        }
    }

    /// Update the row count shown next to the spinner.
    pub fn set(&self, rows: u64) {
        let _ = self.count.send(Some(rows));
    }

    /// Stop the ticker and clear its line.
    pub async fn stop(self) {
        let _ = self.cancel.send(true);
        let _ = self.handle.await;
    }
}
