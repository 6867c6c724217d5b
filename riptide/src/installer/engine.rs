//! Concurrent fetch engine.
//!
//! Downloads planned entries into the staging directory with a fixed-size
//! worker pool. Workers pull entry indices from a shared cursor, stream
//! bodies into a `.tmp` sibling, and rename into place only when the byte
//! stream completed. One failing entry never aborts the run; its relative
//! path is recorded and reported at the end.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;

use md5::{Digest, Md5};
use tracing::{debug, warn};

use crate::cancel::CancelToken;
use crate::http::{HttpClient, HttpError};
use crate::manifest::ResourceEntry;

use super::checksum::{checksum_matches, BUFFER_SIZE};
use super::progress::{Phase, ProgressReporter};
use super::scanner::PlanEntry;
use super::urls::candidate_urls;

/// Why fetching one entry failed.
#[derive(Debug)]
enum FetchError {
    Http(HttpError),
    Io(io::Error),
    ChunkChecksum { index: usize },
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "{}", e),
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::ChunkChecksum { index } => {
                write!(f, "chunk {} failed checksum validation", index)
            }
        }
    }
}

impl From<io::Error> for FetchError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Staging-side `.tmp` sibling of a final path.
pub(super) fn tmp_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".tmp");
    PathBuf::from(os)
}

/// Worker-pool downloader over a slice of planned entries.
pub(super) struct FetchEngine<'a> {
    pub http: &'a dyn HttpClient,
    pub base_url: &'a str,
    pub staging_dir: &'a Path,
    pub concurrency: usize,
    pub reporter: &'a ProgressReporter,
    pub cancel: &'a CancelToken,
}

impl FetchEngine<'_> {
    /// Download every entry, returning the relative paths that failed.
    ///
    /// Entries whose staged file already has the manifest size are counted
    /// complete without touching the network. Cancellation stops workers at
    /// the next entry or chunk boundary.
    pub fn run(&self, entries: &[&PlanEntry]) -> Vec<String> {
        if entries.is_empty() {
            return Vec::new();
        }

        let cursor = AtomicUsize::new(0);
        let failed = Mutex::new(Vec::new());
        let workers = self.concurrency.max(1).min(entries.len());

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| {
                    loop {
                        if self.cancel.is_cancelled() {
                            break;
                        }
                        let idx = cursor.fetch_add(1, Ordering::SeqCst);
                        let Some(planned) = entries.get(idx) else {
                            break;
                        };

                        match self.fetch_one(planned) {
                            Ok(()) => {
                                self.reporter.counters().file_done();
                                self.reporter.report(Phase::Download);
                            }
                            Err(e) => {
                                warn!(dest = %planned.rel_path, err = %e, "download failed");
                                if let Ok(mut guard) = failed.lock() {
                                    guard.push(planned.rel_path.clone());
                                }
                            }
                        }
                    }
                });
            }
        });

        failed.into_inner().unwrap_or_default()
    }

    fn fetch_one(&self, planned: &PlanEntry) -> Result<(), FetchError> {
        let staged = self.staging_dir.join(&planned.rel_path);
        if let Some(parent) = staged.parent() {
            fs::create_dir_all(parent)?;
        }

        // A staged file of the right size was produced by an earlier run.
        if planned.entry.size > 0 {
            if let Ok(metadata) = staged.metadata() {
                if metadata.is_file() && metadata.len() == planned.entry.size {
                    debug!(dest = %planned.rel_path, "staged file already complete");
                    return Ok(());
                }
            }
        }

        let tmp = tmp_path(&staged);
        if planned.entry.is_chunked() {
            self.fetch_chunked(&planned.entry, &planned.rel_path, &tmp)?;
        } else {
            self.fetch_whole(&planned.rel_path, &tmp)?;
        }

        if staged.exists() {
            fs::remove_file(&staged)?;
        }
        fs::rename(&tmp, &staged)?;
        Ok(())
    }

    /// Stream the entry body into `tmp`, walking the candidate URLs until
    /// one responds. Transport and status errors move to the next
    /// candidate; a stream that breaks mid-body fails the entry.
    fn fetch_whole(&self, rel_path: &str, tmp: &Path) -> Result<(), FetchError> {
        let mut last_err = None;
        for url in candidate_urls(self.base_url, rel_path) {
            match self.http.get(&url) {
                Ok(body) => {
                    let mut file = File::create(tmp)?;
                    self.stream_body(body, &mut file, false)?;
                    file.flush()?;
                    return Ok(());
                }
                Err(e) => {
                    debug!(url = %url, err = %e, "candidate URL failed");
                    last_err = Some(e);
                }
            }
        }
        Err(FetchError::Http(last_err.unwrap_or(HttpError::Transport {
            url: rel_path.to_string(),
            reason: "no candidate URLs".to_string(),
        })))
    }

    /// Fetch each chunk as a ranged request, in manifest order, into `tmp`.
    /// Each candidate URL gets a full pass over the chunk sequence; when
    /// any chunk fails against one candidate, the whole sequence restarts
    /// on the next.
    fn fetch_chunked(
        &self,
        entry: &ResourceEntry,
        rel_path: &str,
        tmp: &Path,
    ) -> Result<(), FetchError> {
        let mut last_err = None;
        for url in candidate_urls(self.base_url, rel_path) {
            match self.fetch_chunk_sequence(&url, entry, tmp) {
                Ok(()) => return Ok(()),
                Err(e @ (FetchError::Http(_) | FetchError::ChunkChecksum { .. })) => {
                    debug!(url = %url, err = %e, "candidate URL failed");
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or(FetchError::Http(HttpError::Transport {
            url: rel_path.to_string(),
            reason: "no candidate URLs".to_string(),
        })))
    }

    fn fetch_chunk_sequence(
        &self,
        url: &str,
        entry: &ResourceEntry,
        tmp: &Path,
    ) -> Result<(), FetchError> {
        // Truncates whatever a failed earlier candidate left behind.
        let mut file = File::create(tmp)?;
        for (index, chunk) in entry.chunks.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(FetchError::Io(io::Error::new(
                    io::ErrorKind::Interrupted,
                    "cancelled",
                )));
            }

            let body = self
                .http
                .get_range(url, chunk.start, chunk.end)
                .map_err(FetchError::Http)?;
            let digest = self.stream_body(body, &mut file, chunk.checksum.is_some())?;
            if let (Some(expected), Some(actual)) = (&chunk.checksum, digest) {
                if !checksum_matches(&actual, expected) {
                    return Err(FetchError::ChunkChecksum { index });
                }
            }
        }
        file.flush()?;
        Ok(())
    }

    /// Copy a body into the writer in buffer-sized reads, bumping the byte
    /// counters as data arrives. Returns the MD5 hex digest when `hash` is
    /// set.
    fn stream_body(
        &self,
        mut body: Box<dyn Read + Send>,
        file: &mut File,
        hash: bool,
    ) -> Result<Option<String>, FetchError> {
        let mut hasher = hash.then(Md5::new);
        let mut buffer = vec![0u8; BUFFER_SIZE];
        loop {
            let n = body.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            file.write_all(&buffer[..n])?;
            if let Some(h) = hasher.as_mut() {
                h.update(&buffer[..n]);
            }
            self.reporter.counters().add_bytes(n as u64);
            self.reporter.report(Phase::Download);
        }
        Ok(hasher.map(|h| format!("{:x}", h.finalize())))
    }
}
