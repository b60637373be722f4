use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use reaper_core::BoxFuture;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::error::LedgerError;
use crate::ledger::OutcomeLedger;
use crate::record::{LedgerEntry, RunId};

const FILE_PREFIX: &str = "run-";
const FILE_SUFFIX: &str = ".jsonl";

/// Directory of `run-<id>.jsonl` files, one JSON entry per line.
///
/// Each append is written and `sync_data`'d before returning, so an entry
/// the caller has seen acknowledged survives a crash. A torn final line
/// (crash mid-write) is ignored on load and cut off before the next append.
pub struct FileLedger {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileLedger {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn run_path(&self, run_id: RunId) -> PathBuf {
        self.dir.join(format!("{FILE_PREFIX}{run_id}{FILE_SUFFIX}"))
    }

    async fn write_line(&self, run_id: RunId, line: &[u8]) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.run_path(run_id);
        let mut file = tokio::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .await?;

        let len = file.metadata().await?.len();
        if len > 0 {
            file.seek(SeekFrom::Start(len - 1)).await?;
            let mut last = [0u8; 1];
            file.read_exact(&mut last).await?;
            if last[0] != b'\n' {
                file.seek(SeekFrom::Start(0)).await?;
                let mut contents = Vec::new();
                file.read_to_end(&mut contents).await?;
                let keep = contents
                    .iter()
                    .rposition(|b| *b == b'\n')
                    .map_or(0, |pos| pos as u64 + 1);
                tracing::warn!(
                    path = %path.display(),
                    dropped_bytes = len - keep,
                    "truncating torn trailing ledger line"
                );
                file.set_len(keep).await?;
            }
        }

        file.seek(SeekFrom::End(0)).await?;
        file.write_all(line).await?;
        file.sync_data().await
    }
}

impl OutcomeLedger for FileLedger {
    fn append<'a>(&'a self, entry: &'a LedgerEntry) -> BoxFuture<'a, Result<(), LedgerError>> {
        Box::pin(async move {
            let run_id = entry.run_id();
            let mut line = serde_json::to_vec(entry)?;
            line.push(b'\n');

            let _guard = self.write_lock.lock().await;
            self.write_line(run_id, &line)
                .await
                .map_err(|e| LedgerError::WriteFailed {
                    run_id,
                    message: e.to_string(),
                })?;

            tracing::trace!(run_id = %run_id, "ledger entry appended");
            Ok(())
        })
    }

    fn entries_for(&self, run_id: RunId) -> BoxFuture<'_, Result<Vec<LedgerEntry>, LedgerError>> {
        Box::pin(async move {
            let path = self.run_path(run_id);
            let contents = match tokio::fs::read_to_string(&path).await {
                Ok(contents) => contents,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
                Err(e) => return Err(LedgerError::ReadFailed(format!("{}: {e}", path.display()))),
            };

            let lines: Vec<&str> = contents.lines().collect();
            let mut entries = Vec::with_capacity(lines.len());
            for (idx, line) in lines.iter().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<LedgerEntry>(line) {
                    Ok(entry) => entries.push(entry),
                    Err(e) if idx + 1 == lines.len() && !contents.ends_with('\n') => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "ignoring torn trailing ledger line"
                        );
                    }
                    Err(e) => {
                        return Err(LedgerError::Corrupt {
                            path,
                            line: idx + 1,
                            message: e.to_string(),
                        });
                    }
                }
            }
            Ok(entries)
        })
    }

    fn latest_run_id(&self) -> BoxFuture<'_, Result<Option<RunId>, LedgerError>> {
        Box::pin(async move {
            let mut dir = match tokio::fs::read_dir(&self.dir).await {
                Ok(dir) => dir,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
                Err(e) => return Err(e.into()),
            };

            let mut latest: Option<RunId> = None;
            while let Some(entry) = dir.next_entry().await? {
                let name = entry.file_name();
                let Some(id) = name
                    .to_str()
                    .and_then(|n| n.strip_prefix(FILE_PREFIX))
                    .and_then(|n| n.strip_suffix(FILE_SUFFIX))
                    .and_then(|n| n.parse::<RunId>().ok())
                else {
                    continue;
                };
                latest = latest.max(Some(id));
            }
            Ok(latest)
        })
    }
}
