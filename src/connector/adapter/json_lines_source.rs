use std::path::PathBuf;

use futures_util::stream::{self, BoxStream};
use futures_util::{StreamExt, TryStreamExt};
use serde_json::Value;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::domain::DomainError;

/// A newline-delimited JSON file read lazily, one record at a time.
#[derive(Debug, Clone)]
pub struct JsonLinesSource {
    path: PathBuf,
    missing_ok: bool,
}

impl JsonLinesSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            missing_ok: false,
        }
    }

    /// Treat a missing file as an empty source.
    pub fn allow_missing(mut self) -> Self {
        self.missing_ok = true;
        self
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Records from line `skip` onwards, each tagged with the line offset
    /// to resume from after it. Blank lines are skipped but still counted.
    pub fn read_from(&self, skip: u64) -> BoxStream<'static, Result<(Value, u64), DomainError>> {
        let path = self.path.clone();
        let missing_ok = self.missing_ok;

        stream::once(async move {
            match File::open(&path).await {
                Ok(file) => Ok(Some(file)),
                Err(e) if missing_ok && e.kind() == std::io::ErrorKind::NotFound => {
                    debug!("{} does not exist, nothing to read", path.display());
                    Ok(None)
                }
                Err(e) => Err(DomainError::invalid_input(format!(
                    "cannot read {}: {}",
                    path.display(),
                    e
                ))),
            }
        })
        .map_ok(move |file| {
            let lines = file.map(|f| BufReader::new(f).lines());
            stream::try_unfold((lines, 0u64), move |(mut lines, mut offset)| async move {
                let Some(reader) = lines.as_mut() else {
                    return Ok(None);
                };
                while let Some(line) = reader.next_line().await? {
                    offset += 1;
                    if offset <= skip || line.trim().is_empty() {
                        continue;
                    }
                    let record: Value = serde_json::from_str(&line)?;
                    return Ok(Some(((record, offset), (lines, offset))));
                }
                Ok::<_, DomainError>(None)
            })
        })
        .try_flatten()
        .boxed()
    }
}
