//! Notification sink that writes JSONL.
//!
//! Each notification becomes one line:
//! ```json
//! {"recipient":"Char_1","kind":"move_losses","fields":["Army_3","42","Kent"]}
//! ```
//! Output goes to any `Write` destination (stdout, file, pipe).

use super::{Notification, NotificationSink};
use std::io::{BufWriter, Write};
use std::path::Path;

pub struct JsonlSink<W: Write> {
    writer: W,
    written: usize,
}

impl JsonlSink<BufWriter<std::io::Stdout>> {
    /// Create a sink writing to stdout.
    ///
    /// Useful for piping to tools like `jq`.
    pub fn stdout() -> Self {
        Self::new(BufWriter::new(std::io::stdout()))
    }
}

impl JsonlSink<BufWriter<std::fs::File>> {
    pub fn file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> JsonlSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Number of lines written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, notification: &Notification) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, notification)?;
        self.writer.write_all(b"\n")
    }
}

impl<W: Write> NotificationSink for JsonlSink<W> {
    fn notify(&mut self, notification: Notification) {
        // Delivery problems must not abort a simulation step.
        match self.write_line(&notification) {
            Ok(()) => self.written += 1,
            Err(e) => log::warn!("Failed to write notification: {}", e),
        }
    }
}
