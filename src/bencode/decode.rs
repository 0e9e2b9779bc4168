use std::collections::{BTreeMap, HashMap};
use std::fmt;

use bytes::Bytes;

use super::error::BencodeError;
use super::field::Record;
use super::value::{RawValue, Value};

/// Default limit on how deeply lists and dictionaries may nest.
pub const MAX_DEPTH: usize = 64;

/// The kind of token at the decoder's cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    Integer,
    Bytes,
    List,
    Dict,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Token::Integer => "integer",
            Token::Bytes => "byte string",
            Token::List => "list",
            Token::Dict => "dictionary",
        };
        f.write_str(name)
    }
}

/// An open list or dictionary, returned by [`Decoder::begin_list`] and
/// [`Decoder::begin_dict`] and consumed by [`Decoder::has_next`].
#[derive(Debug)]
pub struct Frame {
    start: usize,
    construct: &'static str,
}

/// A cursor over a complete bencoded buffer.
///
/// The cursor only moves forward. Values are read one at a time, so a buffer
/// holding several concatenated values can be drained in a loop:
///
/// ```
/// use bencoding::bencode::{Decoder, Value};
///
/// let mut dec = Decoder::new(b"i23e4:testi123e");
/// let mut values = Vec::new();
/// while !dec.is_consumed() {
///     values.push(dec.decode::<Value>().unwrap());
/// }
/// assert_eq!(values.len(), 3);
/// ```
///
/// Everything returned by the decoder owns its bytes; nothing borrows from
/// the input once a call returns.
#[derive(Debug)]
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            depth: 0,
            max_depth: MAX_DEPTH,
        }
    }

    /// Sets the nesting limit for lists and dictionaries.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Byte offset of the cursor.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// The unread part of the input.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// True once the cursor has reached the end of the input.
    pub fn is_consumed(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Decodes the next value as `T`.
    pub fn decode<T: Decode>(&mut self) -> Result<T, BencodeError> {
        T::decode_from(self)
    }

    /// Decodes the next value into an existing destination.
    ///
    /// On error the destination may be partially populated.
    pub fn decode_into<T: Decode>(&mut self, dst: &mut T) -> Result<(), BencodeError> {
        dst.decode_into(self)
    }

    /// Fails with [`BencodeError::TrailingData`] unless the input is consumed.
    pub fn finish(&self) -> Result<(), BencodeError> {
        if self.is_consumed() {
            Ok(())
        } else {
            Err(BencodeError::TrailingData { offset: self.pos })
        }
    }

    /// Classifies the token at the cursor without consuming it.
    pub fn peek_token(&self) -> Result<Token, BencodeError> {
        match self.data.get(self.pos) {
            None => Err(BencodeError::StreamExhausted { offset: self.pos }),
            Some(b'i') => Ok(Token::Integer),
            Some(b'l') => Ok(Token::List),
            Some(b'd') => Ok(Token::Dict),
            Some(b'0'..=b'9') => Ok(Token::Bytes),
            Some(_) => Err(BencodeError::Syntax {
                offset: self.pos,
                reason: "unexpected byte at start of value",
            }),
        }
    }

    fn expect(&self, token: Token, expected: &'static str) -> Result<(), BencodeError> {
        let found = self.peek_token()?;
        if found != token {
            return Err(BencodeError::mismatch(expected, found));
        }
        Ok(())
    }

    /// Reads an integer token: `i` `-`? digits `e`.
    pub fn read_integer(&mut self) -> Result<i64, BencodeError> {
        self.expect(Token::Integer, "integer")?;
        let start = self.pos;
        self.pos += 1;

        let negative = self.data.get(self.pos) == Some(&b'-');
        if negative {
            self.pos += 1;
        }

        let digits_start = self.pos;
        self.skip_digits();
        match self.data.get(self.pos) {
            None => {
                return Err(BencodeError::Unterminated {
                    offset: start,
                    construct: "integer",
                })
            }
            Some(b'e') => {}
            Some(_) => {
                return Err(BencodeError::Syntax {
                    offset: self.pos,
                    reason: "non-digit in integer",
                })
            }
        }
        let digits = &self.data[digits_start..self.pos];
        self.pos += 1;

        let syntax = |reason: &'static str| BencodeError::Syntax {
            offset: start,
            reason,
        };
        match digits {
            [] => return Err(syntax("empty integer")),
            [b'0'] if negative => return Err(syntax("negative zero")),
            [b'0', _, ..] => return Err(syntax("leading zero in integer")),
            _ => {}
        }

        // Accumulate towards the sign so i64::MIN stays representable.
        let mut value: i64 = 0;
        for &digit in digits {
            let digit = i64::from(digit - b'0');
            value = value
                .checked_mul(10)
                .and_then(|v| {
                    if negative {
                        v.checked_sub(digit)
                    } else {
                        v.checked_add(digit)
                    }
                })
                .ok_or_else(|| syntax("integer out of range"))?;
        }
        Ok(value)
    }

    /// Reads a byte string token and returns a view of its payload.
    pub fn read_bytes(&mut self) -> Result<&'a [u8], BencodeError> {
        self.expect(Token::Bytes, "byte string")?;
        let start = self.pos;
        self.skip_digits();
        match self.data.get(self.pos) {
            None => {
                return Err(BencodeError::Syntax {
                    offset: start,
                    reason: "byte string length not followed by ':'",
                })
            }
            Some(b':') => {}
            Some(_) => {
                return Err(BencodeError::Syntax {
                    offset: self.pos,
                    reason: "expected ':' after byte string length",
                })
            }
        }

        let len = self.data[start..self.pos]
            .iter()
            .try_fold(0usize, |acc, &d| {
                acc.checked_mul(10)?.checked_add(usize::from(d - b'0'))
            })
            .ok_or(BencodeError::Syntax {
                offset: start,
                reason: "byte string length out of range",
            })?;
        self.pos += 1;

        if len > self.data.len() - self.pos {
            return Err(BencodeError::Syntax {
                offset: self.pos,
                reason: "byte string shorter than its declared length",
            });
        }

        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Reads a dictionary key. Keys must be byte strings.
    pub fn read_key(&mut self) -> Result<&'a [u8], BencodeError> {
        if self.peek_token()? != Token::Bytes {
            return Err(BencodeError::Syntax {
                offset: self.pos,
                reason: "dictionary key is not a byte string",
            });
        }
        self.read_bytes()
    }

    pub fn begin_list(&mut self) -> Result<Frame, BencodeError> {
        self.open(Token::List, "list")
    }

    pub fn begin_dict(&mut self) -> Result<Frame, BencodeError> {
        self.open(Token::Dict, "dictionary")
    }

    pub(crate) fn open(
        &mut self,
        token: Token,
        expected: &'static str,
    ) -> Result<Frame, BencodeError> {
        self.expect(token, expected)?;
        if self.depth >= self.max_depth {
            return Err(BencodeError::NestingTooDeep);
        }
        self.depth += 1;
        let start = self.pos;
        self.pos += 1;
        let construct = match token {
            Token::Dict => "dictionary",
            _ => "list",
        };
        Ok(Frame { start, construct })
    }

    /// Returns true if another item follows in `frame`, or consumes the
    /// closing `e` and returns false.
    pub fn has_next(&mut self, frame: &Frame) -> Result<bool, BencodeError> {
        match self.data.get(self.pos) {
            None => Err(BencodeError::Unterminated {
                offset: frame.start,
                construct: frame.construct,
            }),
            Some(b'e') => {
                self.pos += 1;
                self.depth = self.depth.saturating_sub(1);
                Ok(false)
            }
            Some(_) => Ok(true),
        }
    }

    /// Parses and discards the next value.
    pub fn skip_value(&mut self) -> Result<(), BencodeError> {
        Value::decode_from(self).map(drop)
    }

    fn skip_digits(&mut self) {
        self.pos += self.data[self.pos..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
    }
}

/// Decodes the first value in `data` as `T`, ignoring anything after it.
pub fn decode<T: Decode>(data: &[u8]) -> Result<T, BencodeError> {
    Decoder::new(data).decode()
}

/// Decodes `data` as exactly one value of type `T`.
///
/// ```
/// use bencoding::bencode::{decode_one, BencodeError};
///
/// assert_eq!(decode_one::<i64>(b"i-3e").unwrap(), -3);
/// assert!(matches!(
///     decode_one::<i64>(b"i1ei2e"),
///     Err(BencodeError::TrailingData { offset: 3 })
/// ));
/// ```
pub fn decode_one<T: Decode>(data: &[u8]) -> Result<T, BencodeError> {
    let mut dec = Decoder::new(data);
    let value = dec.decode()?;
    dec.finish()?;
    Ok(value)
}

/// Decodes `data` as exactly one value into an existing destination.
///
/// There is no rollback: on error `dst` keeps whatever was bound before the
/// failure. Decode into a fresh value and swap it in if that matters.
pub fn decode_into<T: Decode>(data: &[u8], dst: &mut T) -> Result<(), BencodeError> {
    let mut dec = Decoder::new(data);
    dec.decode_into(dst)?;
    dec.finish()
}

/// A destination that can be bound from bencode tokens.
pub trait Decode: Sized {
    fn decode_from(dec: &mut Decoder<'_>) -> Result<Self, BencodeError>;

    /// Binds the next value into `self`.
    ///
    /// The default replaces `self` only after a successful decode; records
    /// and containers override it to populate in place.
    fn decode_into(&mut self, dec: &mut Decoder<'_>) -> Result<(), BencodeError> {
        *self = Self::decode_from(dec)?;
        Ok(())
    }
}

impl Decode for Value {
    fn decode_from(dec: &mut Decoder<'_>) -> Result<Self, BencodeError> {
        match dec.peek_token()? {
            Token::Integer => dec.read_integer().map(Value::Integer),
            Token::Bytes => dec
                .read_bytes()
                .map(|b| Value::Bytes(Bytes::copy_from_slice(b))),
            Token::List => {
                let frame = dec.begin_list()?;
                let mut list = Vec::new();
                while dec.has_next(&frame)? {
                    list.push(Value::decode_from(dec)?);
                }
                Ok(Value::List(list))
            }
            Token::Dict => {
                let mut dict = BTreeMap::new();
                decode_entries(dec, |key, value| {
                    dict.insert(Bytes::copy_from_slice(key), value);
                    Ok(())
                })?;
                Ok(Value::Dict(dict))
            }
        }
    }
}

impl Decode for RawValue {
    fn decode_from(dec: &mut Decoder<'_>) -> Result<Self, BencodeError> {
        let start = dec.pos;
        dec.skip_value()?;
        Ok(RawValue(Bytes::copy_from_slice(&dec.data[start..dec.pos])))
    }
}

macro_rules! impl_decode_int {
    ($($ty:ty),*) => {$(
        impl Decode for $ty {
            fn decode_from(dec: &mut Decoder<'_>) -> Result<Self, BencodeError> {
                let value = dec.read_integer()?;
                <$ty>::try_from(value)
                    .map_err(|_| BencodeError::mismatch(stringify!($ty), Token::Integer))
            }
        }
    )*};
}

impl_decode_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl Decode for f64 {
    fn decode_from(dec: &mut Decoder<'_>) -> Result<Self, BencodeError> {
        dec.read_integer().map(|i| i as f64)
    }
}

impl Decode for f32 {
    fn decode_from(dec: &mut Decoder<'_>) -> Result<Self, BencodeError> {
        dec.read_integer().map(|i| i as f32)
    }
}

impl Decode for bool {
    fn decode_from(dec: &mut Decoder<'_>) -> Result<Self, BencodeError> {
        dec.read_integer().map(|i| i != 0)
    }
}

impl Decode for String {
    fn decode_from(dec: &mut Decoder<'_>) -> Result<Self, BencodeError> {
        let bytes = dec.read_bytes()?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| BencodeError::mismatch("UTF-8 string", Token::Bytes))
    }
}

impl Decode for Bytes {
    fn decode_from(dec: &mut Decoder<'_>) -> Result<Self, BencodeError> {
        dec.read_bytes().map(Bytes::copy_from_slice)
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode_from(dec: &mut Decoder<'_>) -> Result<Self, BencodeError> {
        let mut list: Vec<T> = Vec::new();
        list.decode_into(dec)?;
        Ok(list)
    }

    fn decode_into(&mut self, dec: &mut Decoder<'_>) -> Result<(), BencodeError> {
        let frame = dec.begin_list()?;
        self.clear();
        while dec.has_next(&frame)? {
            self.push(T::decode_from(dec)?);
        }
        Ok(())
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode_from(dec: &mut Decoder<'_>) -> Result<Self, BencodeError> {
        T::decode_from(dec).map(Some)
    }

    fn decode_into(&mut self, dec: &mut Decoder<'_>) -> Result<(), BencodeError> {
        match self {
            Some(inner) => inner.decode_into(dec),
            None => {
                *self = Some(T::decode_from(dec)?);
                Ok(())
            }
        }
    }
}

impl<T: Decode> Decode for Box<T> {
    fn decode_from(dec: &mut Decoder<'_>) -> Result<Self, BencodeError> {
        T::decode_from(dec).map(Box::new)
    }

    fn decode_into(&mut self, dec: &mut Decoder<'_>) -> Result<(), BencodeError> {
        (**self).decode_into(dec)
    }
}

impl Decode for BTreeMap<Bytes, Value> {
    fn decode_from(dec: &mut Decoder<'_>) -> Result<Self, BencodeError> {
        let mut map = BTreeMap::new();
        decode_entries(dec, |key, value| {
            map.insert(Bytes::copy_from_slice(key), value);
            Ok(())
        })?;
        Ok(map)
    }
}

impl Decode for BTreeMap<String, Value> {
    fn decode_from(dec: &mut Decoder<'_>) -> Result<Self, BencodeError> {
        let mut map = BTreeMap::new();
        decode_entries(dec, |key, value| {
            map.insert(utf8_key(key)?, value);
            Ok(())
        })?;
        Ok(map)
    }
}

impl Decode for HashMap<String, Value> {
    fn decode_from(dec: &mut Decoder<'_>) -> Result<Self, BencodeError> {
        let mut map = HashMap::new();
        decode_entries(dec, |key, value| {
            map.insert(utf8_key(key)?, value);
            Ok(())
        })?;
        Ok(map)
    }
}

fn utf8_key(key: &[u8]) -> Result<String, BencodeError> {
    std::str::from_utf8(key)
        .map(str::to_owned)
        .map_err(|_| BencodeError::mismatch("UTF-8 map key", Token::Bytes))
}

/// Walks a dictionary, handing each key and generic value to `insert`.
/// Later duplicates reach `insert` after earlier ones, so maps keep the last.
fn decode_entries<F>(dec: &mut Decoder<'_>, mut insert: F) -> Result<(), BencodeError>
where
    F: FnMut(&[u8], Value) -> Result<(), BencodeError>,
{
    let frame = dec.begin_dict()?;
    while dec.has_next(&frame)? {
        let key = dec.read_key()?;
        let value = Value::decode_from(dec)?;
        insert(key, value)?;
    }
    Ok(())
}

/// Binds a dictionary into a record, field by field.
///
/// Keys are matched against the record's name-sorted field table with a
/// forward-only cursor: a key is compared with the next unmatched field and
/// may skip past `omit_empty` fields, but never past a required one. Keys that
/// do not match are decoded and dropped. Fields whose keys never arrive keep
/// their current value.
pub fn decode_record<R: Record>(record: &mut R, dec: &mut Decoder<'_>) -> Result<(), BencodeError> {
    let table = R::field_table();
    let frame = dec.open(Token::Dict, std::any::type_name::<R>())?;
    let mut next = 0;
    while dec.has_next(&frame)? {
        let key = dec.read_key()?;
        match table.match_key(next, key) {
            Some(index) => {
                record.decode_field(table.fields()[index].ident, dec)?;
                next = index + 1;
            }
            None => dec.skip_value()?,
        }
    }
    Ok(())
}
