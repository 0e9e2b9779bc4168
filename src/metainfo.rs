//! Torrent metainfo ([BEP-3]) built on the bencode record binding.
//!
//! The record types mirror the `.torrent` layout:
//!
//! - **info** - [`Info`], the dictionary the info hash is computed over
//!   - `name` - Suggested file or directory name
//!   - `piece length` - Size of each piece in bytes
//!   - `pieces` - Concatenated SHA-1 hashes of each piece
//!   - `length` (single-file) or `files` (multi-file)
//! - **announce** - Tracker URL
//! - **creation date**, **created by**, **comment**, **encoding**
//!
//! [`Writer`] builds the info dictionary from streamed file contents, and
//! [`build_from_paths`] does the same for files on disk.
//!
//! # Examples
//!
//! ```no_run
//! use bencoding::metainfo::Metainfo;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let data = std::fs::read("example.torrent")?;
//! let torrent = Metainfo::from_bytes(&data)?;
//!
//! println!("Name: {}", torrent.info.name);
//! println!("Pieces: {}", torrent.info.piece_count());
//! println!("Total size: {} bytes", torrent.info.total_length());
//! println!("Info hash: {}", bencoding::metainfo::raw_info_hash(&data)?);
//! # Ok(())
//! # }
//! ```
//!
//! [BEP-3]: http://bittorrent.org/beps/bep_0003.html

mod error;
mod info_hash;
mod torrent;
mod walk;
mod writer;

pub use error::MetainfoError;
pub use info_hash::InfoHash;
pub use torrent::{raw_info_hash, FileInfo, Info, Metainfo, PIECE_HASH_LEN};
pub use walk::{build_from_paths, collect_files, write_files, SourceFile};
pub use writer::{PieceHasher, Writer, DEFAULT_PIECE_LENGTH};

#[cfg(test)]
mod tests;
