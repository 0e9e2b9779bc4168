//! Bencode encoding and decoding ([BEP-3]).
//!
//! Bencode is the serialization format of `.torrent` files and tracker
//! responses. It has four data types:
//!
//! | Type | Format | Example |
//! |------|--------|---------|
//! | Integer | `i<number>e` | `i42e` → 42 |
//! | Byte String | `<length>:<data>` | `4:spam` → "spam" |
//! | List | `l<items>e` | `l4:spami42ee` → ["spam", 42] |
//! | Dictionary | `d<key><value>...e` | `d3:foo3:bare` → {"foo": "bar"} |
//!
//! Decoding is type directed: the destination type decides how each token is
//! bound, so the same bytes can land in a generic [`Value`], in plain Rust
//! types, or in a struct declared with [`bencode_record!`](crate::bencode_record).
//! Encoding always produces the canonical form: dictionary keys in ascending
//! byte order and integers without leading zeros. That makes encoded output
//! stable enough to hash.
//!
//! # Examples
//!
//! ## Decoding
//!
//! ```
//! use bencoding::bencode::{decode, decode_one, Value};
//!
//! let value: Value = decode_one(b"l4:spami42ee").unwrap();
//! assert_eq!(value.as_list().map(|l| l.len()), Some(2));
//!
//! let number: i64 = decode_one(b"i42e").unwrap();
//! assert_eq!(number, 42);
//!
//! let names: Vec<String> = decode_one(b"l3:foo3:bare").unwrap();
//! assert_eq!(names, ["foo", "bar"]);
//!
//! // `decode` stops after the first value.
//! let first: i64 = decode(b"i1ei2e").unwrap();
//! assert_eq!(first, 1);
//! ```
//!
//! ## Records
//!
//! ```
//! use bencoding::bencode_record;
//! use bencoding::bencode::{decode_one, encode};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Peer {
//!     ip: String,
//!     port: u16,
//!     peer_id: String,
//! }
//!
//! bencode_record!(Peer {
//!     ip,
//!     port,
//!     peer_id => "peer id" [omit_empty],
//! });
//!
//! let peer: Peer = decode_one(b"d2:ip9:127.0.0.14:porti6881ee").unwrap();
//! assert_eq!(peer.port, 6881);
//! assert_eq!(encode(&peer).unwrap(), b"d2:ip9:127.0.0.14:porti6881ee");
//! ```
//!
//! # Leniency
//!
//! Dictionary keys are not required to arrive sorted, and a repeated key
//! overwrites the earlier one. Record decoding ignores keys it does not know
//! and leaves fields whose keys are missing untouched.
//!
//! # Errors
//!
//! - [`BencodeError::Syntax`] - Malformed token (bad digits, leading zeros,
//!   truncated byte string)
//! - [`BencodeError::Unterminated`] - Integer, list, or dictionary never closed
//! - [`BencodeError::StreamExhausted`] - Input ended where a value was expected
//! - [`BencodeError::TrailingData`] - Extra data after a single value
//! - [`BencodeError::TypeMismatch`] - Destination cannot hold the token
//! - [`BencodeError::NestingTooDeep`] - More than [`MAX_DEPTH`] levels
//! - [`BencodeError::UnsupportedType`], [`BencodeError::NilValue`],
//!   [`BencodeError::IntegerOverflow`] - Values with no encoding
//!
//! [BEP-3]: http://bittorrent.org/beps/bep_0003.html

mod decode;
mod encode;
mod error;
mod field;
mod value;

pub use decode::{
    decode, decode_into, decode_one, decode_record, Decode, Decoder, Frame, Token, MAX_DEPTH,
};
pub use encode::{encode, encode_record, encode_to_writer, Encode, Encoder};
pub use error::BencodeError;
pub use field::{FieldDescriptor, FieldTable, Record};
pub use value::{RawValue, Value};
