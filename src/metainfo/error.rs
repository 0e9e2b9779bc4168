use thiserror::Error;

use crate::bencode::BencodeError;

/// Errors that can occur when reading, building, or writing torrent files.
#[derive(Debug, Error)]
pub enum MetainfoError {
    /// The torrent file contains invalid bencode, or the metainfo could not
    /// be encoded.
    #[error("bencode error: {0}")]
    Bencode(#[from] BencodeError),

    /// A field has an invalid value.
    #[error("invalid field: {0}")]
    InvalidField(&'static str),

    /// The info hash has an invalid length (must be 20 bytes).
    #[error("invalid info hash length")]
    InvalidInfoHashLength,

    /// Piece length must be positive.
    #[error("invalid piece length: {0}")]
    InvalidPieceLength(i64),

    /// The writer was used after being closed.
    #[error("writer is closed")]
    Closed,

    /// Data was written before any file was opened.
    #[error("no open file")]
    NoOpenFile,

    /// A single-file writer was asked to open a second file.
    #[error("single-file writer cannot open another file")]
    SingleFileMode,

    /// Metainfo was requested from a writer that never saw a file.
    #[error("no files were written")]
    NoFiles,

    /// A directory was given without recursion enabled.
    #[error("{0} is a directory (recursion disabled)")]
    IsDirectory(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
