//! bencoding - a strict bencode codec with typed binding
//!
//! # Modules
//!
//! - [`bencode`] - BEP-3 Bencode decoding and canonical encoding, including
//!   record binding via [`bencode_record!`]
//! - [`metainfo`] - Torrent metainfo records, info hashes, and the
//!   piece-hashing writer used to build `.torrent` files

pub mod bencode;
pub mod metainfo;

pub use bencode::{decode, decode_one, encode, BencodeError, Decode, Encode, Value};
pub use metainfo::{FileInfo, Info, InfoHash, Metainfo, MetainfoError, Writer};
