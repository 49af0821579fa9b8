//! `StreamingSource` backed by a local `yt-dlp` install.
//!
//! Lookups go through the `youtube_dl` crate and read its raw JSON; audio
//! bytes come straight from a `yt-dlp` child process writing to stdout.

use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, ChildStdout, Command, Stdio};

use serde_json::Value;
use youtube_dl::{SearchOptions, YoutubeDl};

use crate::config::BotConfig;
use crate::locator;
use crate::source::{AudioStream, PlaylistInfo, SearchHit, SourceError, SourceResult, StreamingSource};
use crate::track::Track;

#[derive(Debug, Clone)]
pub struct YtDlpSource {
    binary: PathBuf,
    audio_format: String,
    socket_timeout: String,
}

impl YtDlpSource {
    pub fn new(config: &BotConfig) -> Self {
        Self {
            binary: PathBuf::from(&config.ytdlp_path),
            audio_format: config.audio_format.clone(),
            socket_timeout: config.socket_timeout_secs.to_string(),
        }
    }

    fn command(&self, url: impl Into<String>) -> YoutubeDl {
        let mut cmd = YoutubeDl::new(url);
        self.configure(&mut cmd);
        cmd
    }

    fn configure(&self, cmd: &mut YoutubeDl) {
        cmd.youtube_dl_path(&self.binary)
            .socket_timeout(self.socket_timeout.clone());
    }

    fn run(cmd: &YoutubeDl) -> SourceResult<Value> {
        cmd.run_raw().map_err(|e| SourceError::Lookup(e.to_string()))
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Best locator for a (possibly flat) entry
fn entry_locator(entry: &Value) -> Option<String> {
    if let Some(url) = string_field(entry, "webpage_url") {
        return Some(url);
    }
    if let Some(url) = string_field(entry, "url").filter(|u| u.starts_with("http")) {
        return Some(url);
    }
    string_field(entry, "id").map(|id| locator::watch_url(&id))
}

fn entry_track(entry: &Value) -> Option<Track> {
    let locator = entry_locator(entry)?;
    Some(Track {
        locator,
        title: string_field(entry, "title"),
    })
}

fn entries(value: &Value) -> Vec<&Value> {
    value
        .get("entries")
        .and_then(Value::as_array)
        .map(|list| list.iter().filter(|e| !e.is_null()).collect())
        .unwrap_or_default()
}

impl StreamingSource for YtDlpSource {
    fn get_stream(&self, track: &Track) -> SourceResult<AudioStream> {
        log::debug!("Spawning {} for {}", self.binary.display(), track.locator);
        let mut child = Command::new(&self.binary)
            .args(["--quiet", "--no-playlist", "--socket-timeout"])
            .arg(&self.socket_timeout)
            .arg("-f")
            .arg(&self.audio_format)
            .args(["-o", "-"])
            .arg(&track.locator)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SourceError::Malformed("yt-dlp stdout not captured".to_string()))?;

        Ok(AudioStream::new(track.locator.clone(), ChildStream { child, stdout }))
    }

    fn resolve_metadata(&self, locator: &str) -> SourceResult<Track> {
        let mut cmd = self.command(locator);
        cmd.extra_arg("--no-playlist");
        let value = Self::run(&cmd)?;

        let title = string_field(&value, "title")
            .ok_or_else(|| SourceError::Malformed(format!("no title for {}", locator)))?;
        Ok(Track::with_title(locator, title))
    }

    fn search(&self, text: &str, limit: usize) -> SourceResult<Vec<SearchHit>> {
        let options = SearchOptions::youtube(text).with_count(limit);
        let mut cmd = YoutubeDl::search_for(&options);
        self.configure(&mut cmd);
        cmd.flat_playlist(true);
        let value = Self::run(&cmd)?;

        let hits = entries(&value)
            .into_iter()
            .filter_map(entry_track)
            .map(|track| SearchHit {
                title: track.title.clone().unwrap_or_else(|| track.locator.clone()),
                locator: track.locator,
            })
            .take(limit)
            .collect();
        Ok(hits)
    }

    fn expand_playlist(&self, locator: &str) -> SourceResult<PlaylistInfo> {
        let mut cmd = self.command(locator);
        cmd.flat_playlist(true).extra_arg("--yes-playlist");
        let value = Self::run(&cmd)?;

        let title = string_field(&value, "title").unwrap_or_else(|| locator.to_string());
        let entries = entries(&value).into_iter().filter_map(entry_track).collect();
        Ok(PlaylistInfo { title, entries })
    }
}

/// Audio bytes read from a running `yt-dlp`; the process is killed on drop.
struct ChildStream {
    child: Child,
    stdout: ChildStdout,
}

impl Read for ChildStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.stdout.read(buf)
    }
}

impl Drop for ChildStream {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
