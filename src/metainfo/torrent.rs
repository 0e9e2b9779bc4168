use std::io::Write;

use bytes::Bytes;

use super::error::MetainfoError;
use super::info_hash::InfoHash;
use crate::bencode::{decode_one, encode, encode_to_writer, RawValue};
use crate::bencode_record;

/// Length of one SHA-1 piece hash.
pub const PIECE_HASH_LEN: usize = 20;

/// One file in a multi-file torrent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileInfo {
    /// Path components relative to the torrent's root directory.
    pub path: Vec<String>,
    pub length: i64,
    /// Hex MD5 of the file contents, if known.
    pub md5sum: String,
}

bencode_record!(FileInfo {
    path,
    length,
    md5sum [omit_empty],
});

/// The info dictionary.
///
/// Its encoded form is what the info hash is computed over, so it must
/// re-encode byte for byte.
///
/// `length` and `private` are marked omit-if-empty but are integers, so they
/// are written even when zero: a multi-file info carries `6:lengthi0e` and
/// every info carries `7:private`. Existing torrents depend on that output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Info {
    /// Suggested file name (single-file) or root directory name (multi-file).
    pub name: String,
    /// Files in a multi-file torrent. Empty in single-file mode.
    pub files: Vec<FileInfo>,
    /// File length in single-file mode.
    pub length: i64,
    /// Hex MD5 of the file in single-file mode.
    pub md5sum: String,
    /// Concatenated SHA-1 hashes, one per piece.
    pub pieces: Bytes,
    pub piece_length: i64,
    /// If true, clients should only use trackers in the metainfo.
    pub private: bool,
}

bencode_record!(Info {
    name,
    files [omit_empty],
    length [omit_empty],
    md5sum [omit_empty],
    pieces,
    piece_length => "piece length",
    private [omit_empty],
});

impl Info {
    pub fn is_single_file(&self) -> bool {
        self.files.is_empty()
    }

    pub fn piece_count(&self) -> usize {
        self.pieces.len() / PIECE_HASH_LEN
    }

    /// Returns the SHA-1 hash of piece `index`.
    pub fn piece_hash(&self, index: usize) -> Option<[u8; PIECE_HASH_LEN]> {
        let start = index.checked_mul(PIECE_HASH_LEN)?;
        let chunk = self.pieces.get(start..start + PIECE_HASH_LEN)?;
        chunk.try_into().ok()
    }

    /// Total content length across all files.
    pub fn total_length(&self) -> i64 {
        if self.is_single_file() {
            self.length
        } else {
            self.files.iter().map(|f| f.length).sum()
        }
    }

    /// Checks the invariants a usable info dictionary must satisfy.
    ///
    /// Decoding never calls this; absent fields are not a decode error.
    pub fn validate(&self) -> Result<(), MetainfoError> {
        if self.piece_length <= 0 {
            return Err(MetainfoError::InvalidPieceLength(self.piece_length));
        }
        if self.pieces.len() % PIECE_HASH_LEN != 0 {
            return Err(MetainfoError::InvalidField("pieces"));
        }
        if self.name.is_empty() {
            return Err(MetainfoError::InvalidField("name"));
        }
        if self.files.iter().any(|f| f.path.is_empty() || f.length < 0) || self.length < 0 {
            return Err(MetainfoError::InvalidField("files"));
        }
        Ok(())
    }

    /// The info hash of this dictionary in canonical form.
    pub fn info_hash(&self) -> Result<InfoHash, MetainfoError> {
        Ok(InfoHash::of_encoded(&encode(self)?))
    }
}

/// The contents of a `.torrent` file.
///
/// # Examples
///
/// ```
/// use bencoding::metainfo::{Info, Metainfo};
///
/// let meta = Metainfo {
///     info: Info {
///         name: "hello.txt".into(),
///         length: 5,
///         pieces: vec![0u8; 20].into(),
///         piece_length: 16384,
///         ..Info::default()
///     },
///     announce: "http://tracker.example.com/announce".into(),
///     ..Metainfo::default()
/// };
///
/// let bytes = meta.to_bytes().unwrap();
/// assert_eq!(Metainfo::from_bytes(&bytes).unwrap(), meta);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metainfo {
    pub info: Info,
    /// Primary tracker URL.
    pub announce: String,
    /// Unix timestamp when the torrent was created.
    pub creation_date: i64,
    /// Character encoding of the string fields.
    pub encoding: String,
    /// Name and version of the program that created the torrent.
    pub created_by: String,
    pub comment: String,
}

bencode_record!(Metainfo {
    info,
    announce,
    creation_date => "creation date" [omit_empty],
    encoding [omit_empty],
    created_by => "created by" [omit_empty],
    comment [omit_empty],
});

#[derive(Default)]
struct InfoSpan {
    info: RawValue,
}

bencode_record!(InfoSpan { info });

impl Metainfo {
    /// Parses a torrent file.
    ///
    /// Unknown keys are ignored. Missing keys leave their fields at the
    /// default; call [`Info::validate`] to reject incomplete files.
    pub fn from_bytes(data: &[u8]) -> Result<Self, MetainfoError> {
        Ok(decode_one(data)?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, MetainfoError> {
        Ok(encode(self)?)
    }

    /// Encodes the metainfo into `writer`.
    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> Result<(), MetainfoError> {
        encode_to_writer(writer, self)?;
        Ok(())
    }

    /// The info hash of [`Metainfo::info`] in canonical form.
    pub fn info_hash(&self) -> Result<InfoHash, MetainfoError> {
        self.info.info_hash()
    }
}

/// Computes the info hash over the info dictionary exactly as it appears in
/// `data`.
///
/// This differs from [`Metainfo::info_hash`] when the file's info
/// dictionary carries keys this crate does not model or is not in canonical
/// order.
pub fn raw_info_hash(data: &[u8]) -> Result<InfoHash, MetainfoError> {
    let span: InfoSpan = decode_one(data)?;
    if span.info.is_empty() {
        return Err(MetainfoError::InvalidField("info"));
    }
    Ok(InfoHash::of_encoded(span.info.as_bytes()))
}
