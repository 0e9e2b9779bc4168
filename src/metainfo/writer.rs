//! Streaming construction of metainfo from file contents.
//!
//! A [`Writer`] receives file contents in order. Bytes are hashed into
//! fixed-size pieces that run across file boundaries, and each file's length
//! and MD5 are recorded. Once everything is written,
//! [`Writer::metainfo`] produces a skeleton [`Metainfo`] whose info
//! dictionary is complete.

use std::fmt;
use std::io;

use bytes::Bytes;
use md5::Md5;
use parking_lot::Mutex;
use sha1::{Digest, Sha1};
use tracing::{debug, info};

use super::error::MetainfoError;
use super::info_hash::hex_encode;
use super::torrent::{FileInfo, Info, Metainfo, PIECE_HASH_LEN};

/// Default piece length (512 KiB).
pub const DEFAULT_PIECE_LENGTH: i64 = 512 * 1024;

/// Hashes a byte stream into fixed-size SHA-1 pieces.
pub struct PieceHasher {
    piece_length: usize,
    offset: usize,
    total: u64,
    hasher: Sha1,
    pieces: Vec<u8>,
}

impl PieceHasher {
    /// Creates a hasher for pieces of `piece_length` bytes.
    pub fn new(piece_length: usize) -> Result<Self, MetainfoError> {
        if piece_length == 0 {
            return Err(MetainfoError::InvalidPieceLength(0));
        }
        Ok(Self {
            piece_length,
            offset: 0,
            total: 0,
            hasher: Sha1::new(),
            pieces: Vec::new(),
        })
    }

    pub fn update(&mut self, mut data: &[u8]) {
        self.total += data.len() as u64;
        while !data.is_empty() {
            let take = (self.piece_length - self.offset).min(data.len());
            self.hasher.update(&data[..take]);
            self.offset += take;
            data = &data[take..];
            if self.offset == self.piece_length {
                self.pieces.extend_from_slice(&self.hasher.finalize_reset());
                self.offset = 0;
            }
        }
    }

    /// Hashes the trailing partial piece, if any.
    pub fn finish(&mut self) {
        if self.offset > 0 {
            self.pieces.extend_from_slice(&self.hasher.finalize_reset());
            self.offset = 0;
        }
    }

    /// Concatenated hashes of all completed pieces.
    pub fn pieces(&self) -> &[u8] {
        &self.pieces
    }

    /// Number of bytes hashed so far.
    pub fn total(&self) -> u64 {
        self.total
    }
}

impl fmt::Debug for PieceHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PieceHasher")
            .field("piece_length", &self.piece_length)
            .field("offset", &self.offset)
            .field("total", &self.total)
            .field("pieces", &(self.pieces.len() / PIECE_HASH_LEN))
            .finish()
    }
}

struct OpenFile {
    path: Vec<String>,
    length: u64,
    md5: Md5,
}

impl OpenFile {
    fn finish(self) -> Result<FileInfo, MetainfoError> {
        Ok(FileInfo {
            length: i64::try_from(self.length).map_err(|_| MetainfoError::InvalidField("length"))?,
            md5sum: hex_encode(&self.md5.finalize()),
            path: self.path,
        })
    }
}

struct State {
    hasher: PieceHasher,
    files: Vec<FileInfo>,
    current: Option<OpenFile>,
    single: bool,
    closed: bool,
}

impl State {
    fn close_current(&mut self) -> Result<(), MetainfoError> {
        if let Some(file) = self.current.take() {
            debug!(path = ?file.path, length = file.length, "closed file");
            self.files.push(file.finish()?);
        }
        Ok(())
    }
}

/// Computes piece hashes and file checksums and builds a [`Metainfo`].
///
/// All methods take `&self`; the state sits behind a mutex so a writer can
/// be shared between threads. Writes still land in whichever file is open,
/// so callers must order them.
///
/// # Examples
///
/// ```
/// use std::io::Write;
/// use bencoding::metainfo::Writer;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut writer = Writer::new(4)?;
/// writer.open(["docs", "a.txt"])?;
/// writer.write_all(b"hello")?;
/// writer.open(["b.txt"])?;
/// writer.write_all(b"world")?;
///
/// let meta = writer.metainfo("bundle", "http://tracker.example.com/announce")?;
/// assert_eq!(meta.info.name, "bundle");
/// assert_eq!(meta.info.files.len(), 2);
/// assert_eq!(meta.info.piece_count(), 3);
/// # Ok(())
/// # }
/// ```
pub struct Writer {
    piece_length: i64,
    state: Mutex<State>,
}

impl Writer {
    /// Creates a multi-file writer.
    pub fn new(piece_length: i64) -> Result<Self, MetainfoError> {
        let piece_size = usize::try_from(piece_length)
            .ok()
            .filter(|&n| n > 0)
            .ok_or(MetainfoError::InvalidPieceLength(piece_length))?;
        Ok(Self {
            piece_length,
            state: Mutex::new(State {
                hasher: PieceHasher::new(piece_size)?,
                files: Vec::new(),
                current: None,
                single: false,
                closed: false,
            }),
        })
    }

    /// Creates a single-file writer with its only file already open.
    pub fn new_single(piece_length: i64, name: impl Into<String>) -> Result<Self, MetainfoError> {
        let writer = Self::new(piece_length)?;
        writer.open([name.into()])?;
        writer.state.lock().single = true;
        Ok(writer)
    }

    pub fn piece_length(&self) -> i64 {
        self.piece_length
    }

    /// Starts a new file entry. Later writes count towards this file.
    pub fn open<I, S>(&self, path: I) -> Result<(), MetainfoError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.state.lock();
        if state.closed {
            return Err(MetainfoError::Closed);
        }
        if state.single {
            return Err(MetainfoError::SingleFileMode);
        }
        state.close_current()?;
        let path: Vec<String> = path.into_iter().map(Into::into).collect();
        debug!(path = ?path, "opened file");
        state.current = Some(OpenFile {
            path,
            length: 0,
            md5: Md5::new(),
        });
        Ok(())
    }

    /// Appends `data` to the open file.
    pub fn write_bytes(&self, data: &[u8]) -> Result<usize, MetainfoError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.closed {
            return Err(MetainfoError::Closed);
        }
        let file = state.current.as_mut().ok_or(MetainfoError::NoOpenFile)?;
        file.md5.update(data);
        file.length += data.len() as u64;
        state.hasher.update(data);
        Ok(data.len())
    }

    /// Finishes the open file and the last piece. Further writes fail.
    pub fn close(&self) -> Result<(), MetainfoError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(MetainfoError::Closed);
        }
        state.close_current()?;
        state.hasher.finish();
        state.closed = true;
        Ok(())
    }

    /// Closes the writer if needed and builds the metainfo.
    ///
    /// In single-file mode the info is named after the file and `dir` is
    /// ignored; otherwise `dir` names the root directory.
    pub fn metainfo(&self, dir: &str, announce: &str) -> Result<Metainfo, MetainfoError> {
        match self.close() {
            Ok(()) | Err(MetainfoError::Closed) => {}
            Err(err) => return Err(err),
        }

        let state = self.state.lock();
        let pieces = Bytes::copy_from_slice(state.hasher.pieces());
        let mut info = Info {
            pieces,
            piece_length: self.piece_length,
            ..Info::default()
        };

        if state.single {
            let file = state.files.first().ok_or(MetainfoError::NoFiles)?;
            info.name = file.path.concat();
            info.length = file.length;
            info.md5sum = file.md5sum.clone();
        } else {
            if state.files.is_empty() {
                return Err(MetainfoError::NoFiles);
            }
            info.name = dir.to_owned();
            info.files = state.files.clone();
        }

        info!(
            name = %info.name,
            files = state.files.len(),
            bytes = state.hasher.total(),
            pieces = info.piece_count(),
            "built metainfo"
        );

        Ok(Metainfo {
            info,
            announce: announce.to_owned(),
            ..Metainfo::default()
        })
    }
}

impl fmt::Debug for Writer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Writer")
            .field("piece_length", &self.piece_length)
            .field("files", &state.files.len())
            .field("single", &state.single)
            .field("closed", &state.closed)
            .field("hasher", &state.hasher)
            .finish()
    }
}

impl io::Write for &Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf).map_err(io::Error::other)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Write for Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::Write::write(&mut &*self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
