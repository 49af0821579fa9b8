//! Disk spool for streamed audio.
//!
//! A fetch thread copies the source into a temporary file while the decoder
//! reads behind it, blocking only when it catches up with the download.

use std::fs::File;
use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use tempfile::NamedTempFile;

#[derive(Debug, Default)]
struct Progress {
    written: u64,
    finished: bool,
    cancelled: bool,
    failure: Option<String>,
}

/// Download progress shared by the writer, the readers and the sink
#[derive(Debug, Clone, Default)]
pub struct SpoolState {
    inner: Arc<(Mutex<Progress>, Condvar)>,
}

impl SpoolState {
    fn lock(&self) -> MutexGuard<'_, Progress> {
        self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, change: impl FnOnce(&mut Progress)) {
        change(&mut self.lock());
        self.inner.1.notify_all();
    }

    /// Wake every reader with end of stream and stop the writer
    pub fn cancel(&self) {
        self.update(|p| p.cancelled = true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }

    /// Why the download ended early, if it did
    pub fn failure(&self) -> Option<String> {
        self.lock().failure.clone()
    }

    fn wait_while(&self, mut blocked: impl FnMut(&Progress) -> bool) -> MutexGuard<'_, Progress> {
        let mut progress = self.lock();
        while blocked(&*progress) {
            progress = self
                .inner
                .1
                .wait(progress)
                .unwrap_or_else(PoisonError::into_inner);
        }
        progress
    }

    /// Bytes readable from `pos` once some are; 0 at the end of the stream
    fn readable_from(&self, pos: u64) -> io::Result<u64> {
        let progress = self.wait_while(|p| p.written <= pos && !p.finished && !p.cancelled);
        if progress.cancelled {
            return Ok(0);
        }
        if progress.written > pos {
            return Ok(progress.written - pos);
        }
        match &progress.failure {
            Some(reason) => Err(io::Error::other(reason.clone())),
            None => Ok(0),
        }
    }

    /// Full length, once the download is over
    fn total_len(&self) -> io::Result<u64> {
        let progress = self.wait_while(|p| !p.finished && !p.cancelled);
        match &progress.failure {
            Some(reason) => Err(io::Error::other(reason.clone())),
            None => Ok(progress.written),
        }
    }
}

/// Temporary file being filled; removed from disk when dropped
pub struct Spool {
    file: NamedTempFile,
    state: SpoolState,
}

impl Spool {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            file: NamedTempFile::new()?,
            state: SpoolState::default(),
        })
    }

    pub fn state(&self) -> SpoolState {
        self.state.clone()
    }

    pub fn writer(&self) -> io::Result<File> {
        self.file.as_file().try_clone()
    }

    /// Independent read handle starting at byte 0
    pub fn reader(&self) -> io::Result<SpoolReader> {
        Ok(SpoolReader {
            file: self.file.reopen()?,
            pos: 0,
            state: self.state.clone(),
        })
    }
}

/// Copy `source` into the spool until it ends, fails or is cancelled
pub fn fill(mut out: File, mut source: impl Read, state: &SpoolState) {
    let mut chunk = vec![0u8; 64 * 1024];
    loop {
        if state.is_cancelled() {
            return;
        }
        let n = match source.read(&mut chunk) {
            Ok(0) => {
                state.update(|p| p.finished = true);
                return;
            }
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                let reason = e.to_string();
                state.update(|p| {
                    p.failure = Some(reason);
                    p.finished = true;
                });
                return;
            }
        };
        if let Err(e) = out.write_all(&chunk[..n]) {
            let reason = format!("spool write failed: {}", e);
            state.update(|p| {
                p.failure = Some(reason);
                p.finished = true;
            });
            return;
        }
        state.update(|p| p.written += n as u64);
    }
}

/// Reads spooled bytes, waiting for the writer when it gets ahead of it
pub struct SpoolReader {
    file: File,
    pos: u64,
    state: SpoolState,
}

impl Read for SpoolReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let readable = self.state.readable_from(self.pos)?;
        if readable == 0 {
            return Ok(0);
        }
        let len = readable.min(buf.len() as u64) as usize;
        let n = self.file.read(&mut buf[..len])?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for SpoolReader {
    fn seek(&mut self, target: SeekFrom) -> io::Result<u64> {
        let pos = match target {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
            SeekFrom::End(delta) => self.state.total_len()?.checked_add_signed(delta),
        }
        .ok_or_else(|| io::Error::new(ErrorKind::InvalidInput, "seek before start of spool"))?;

        self.pos = self.file.seek(SeekFrom::Start(pos))?;
        Ok(self.pos)
    }
}
