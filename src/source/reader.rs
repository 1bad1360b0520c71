//! Asynchronous access-log tail reader with file rotation detection

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio::time::sleep;

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Read the existing file, then wait for appended lines
    Follow,
    /// Skip existing content, only read appended lines
    FollowFromEnd,
    /// Read the existing file once; end of file is end of input
    Replay,
}

impl ReadMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "follow" => Some(ReadMode::Follow),
            "tail" => Some(ReadMode::FollowFromEnd),
            "replay" => Some(ReadMode::Replay),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReadMode::Follow => "follow",
            ReadMode::FollowFromEnd => "tail",
            ReadMode::Replay => "replay",
        }
    }

    fn follows(&self) -> bool {
        !matches!(self, ReadMode::Replay)
    }
}

pub struct TailReader {
    path: PathBuf,
    mode: ReadMode,
    file: Option<BufReader<File>>,
    inode: Option<u64>,
    position: u64,
    pending: Vec<u8>,
    poll_interval: Duration,
}

impl TailReader {
    pub fn new(path: PathBuf, mode: ReadMode) -> Self {
        Self {
            path,
            mode,
            file: None,
            inode: None,
            position: 0,
            pending: Vec::new(),
            poll_interval: Duration::from_millis(100),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> ReadMode {
        self.mode
    }

    /// Open the file. Only `FollowFromEnd` seeks past existing content.
    pub async fn start(&mut self) -> std::io::Result<()> {
        self.open(self.mode == ReadMode::FollowFromEnd).await?;
        log::info!("📖 Started reading {} ({})", self.path.display(), self.mode.as_str());
        Ok(())
    }

    async fn open(&mut self, seek_end: bool) -> std::io::Result<()> {
        let file = File::open(&self.path).await?;
        let metadata = file.metadata().await?;

        #[cfg(unix)]
        {
            self.inode = Some(metadata.ino());
        }

        let mut reader = BufReader::new(file);
        self.position = if seek_end {
            reader.seek(SeekFrom::End(0)).await?
        } else {
            0
        };
        self.file = Some(reader);
        self.pending.clear();
        Ok(())
    }

    /// Next non-empty line, without its trailing newline.
    ///
    /// In follow modes this waits for more data and never returns `Ok(None)`.
    /// In replay mode `Ok(None)` marks the end of the file.
    ///
    /// Bytes that are not valid UTF-8 are replaced, not treated as a read
    /// error. After a rotation the old file is read to its end before the
    /// new one is opened.
    pub async fn read_line(&mut self) -> std::io::Result<Option<String>> {
        loop {
            let rotated = self.mode.follows() && self.detect_rotation().await?;

            let reader = match self.file.as_mut() {
                Some(reader) => reader,
                None => {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "File not opened",
                    ))
                }
            };

            let mut chunk = Vec::new();
            let read = reader.read_until(b'\n', &mut chunk).await?;
            self.position += read as u64;
            self.pending.extend_from_slice(&chunk);

            if read > 0 {
                if !self.pending.ends_with(b"\n") {
                    // Partial line; the writer hasn't finished it yet
                    continue;
                }
                if let Some(line) = self.take_pending() {
                    return Ok(Some(line));
                }
                continue;
            }

            if rotated {
                log::info!("🔄 File rotation detected, reopening: {}", self.path.display());
                // the old file's last line may lack a newline
                let rest = self.take_pending();
                self.open(false).await?;
                if let Some(line) = rest {
                    return Ok(Some(line));
                }
                continue;
            }

            if !self.mode.follows() {
                // last line may lack a newline
                return Ok(self.take_pending());
            }
            sleep(self.poll_interval).await;
        }
    }

    /// Decode and clear the pending bytes. Blank lines yield `None`.
    fn take_pending(&mut self) -> Option<String> {
        let bytes = std::mem::take(&mut self.pending);
        let text = String::from_utf8_lossy(&bytes);
        if matches!(text, std::borrow::Cow::Owned(_)) {
            log::debug!("Replaced invalid UTF-8 in line from {}", self.path.display());
        }
        let line = text.trim();
        if line.is_empty() {
            None
        } else {
            Some(line.to_string())
        }
    }

    /// Rotation means the path now points at a different inode. A missing
    /// path (mid-rotation) is not a rotation yet.
    async fn detect_rotation(&self) -> std::io::Result<bool> {
        let metadata = match tokio::fs::metadata(&self.path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e),
        };

        #[cfg(unix)]
        {
            let current_inode = metadata.ino();
            Ok(self.inode.map_or(false, |old| old != current_inode))
        }

        #[cfg(not(unix))]
        {
            // Truncation heuristic: the file shrank below our read position
            Ok(metadata.len() < self.position)
        }
    }
}
