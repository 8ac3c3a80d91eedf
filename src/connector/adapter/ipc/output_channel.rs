use std::path::Path;

use serde::Serialize;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::domain::DomainError;

/// File descriptor 3, which the host opens for results before spawning us.
pub const DEFAULT_OUTPUT_CHANNEL: &str = "/dev/fd/3";

/// Newline-delimited JSON sink, kept apart from stdout and stderr.
///
/// Every line is flushed as soon as it is written so the host sees lazy
/// results element by element.
pub struct OutputChannel<W = File> {
    writer: W,
    lines: u64,
}

impl OutputChannel<File> {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| {
                DomainError::transport(format!(
                    "cannot open output channel {}: {}",
                    path.display(),
                    e
                ))
            })?;
        Ok(Self::new(file))
    }
}

impl<W: AsyncWrite + Unpin> OutputChannel<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, lines: 0 }
    }

    pub async fn send<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), DomainError> {
        let mut line = serde_json::to_vec(value)?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        self.writer.flush().await?;
        self.lines += 1;
        Ok(())
    }

    /// Number of lines written so far.
    pub fn lines(&self) -> u64 {
        self.lines
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
