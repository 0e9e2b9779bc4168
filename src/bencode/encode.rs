use std::collections::{BTreeMap, HashMap};
use std::io::Write;

use bytes::Bytes;

use super::error::BencodeError;
use super::field::Record;
use super::value::{RawValue, Value};

/// A value that can be written as bencode.
///
/// The trait is object safe so records can hand out their fields as
/// `&dyn Encode`.
pub trait Encode {
    fn encode_to(&self, enc: &mut Encoder) -> Result<(), BencodeError>;

    /// Supplies the value's own encoding.
    ///
    /// When this returns `Some`, the encoder writes the bytes verbatim and
    /// never calls [`encode_to`](Encode::encode_to). The bytes are not
    /// validated.
    fn pre_encoded(&self) -> Option<Result<Vec<u8>, BencodeError>> {
        None
    }

    /// True for values with nothing to encode, such as `None`.
    ///
    /// Records skip absent `omit_empty` fields; anywhere else an absent
    /// value fails with [`BencodeError::NilValue`].
    fn is_absent(&self) -> bool {
        false
    }
}

/// Accumulates canonical bencode output.
#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes `value`, honouring its [`Encode::pre_encoded`] override.
    pub fn emit<T: Encode + ?Sized>(&mut self, value: &T) -> Result<(), BencodeError> {
        if let Some(raw) = value.pre_encoded() {
            self.buf.extend_from_slice(&raw?);
            return Ok(());
        }
        value.encode_to(self)
    }

    pub fn write_integer(&mut self, value: i64) -> Result<(), BencodeError> {
        write!(self.buf, "i{}e", value)?;
        Ok(())
    }

    /// Writes an unsigned integer, refusing values the decoder could not
    /// read back as `i64`.
    pub fn write_unsigned(&mut self, value: u64) -> Result<(), BencodeError> {
        let signed = i64::try_from(value).map_err(|_| BencodeError::IntegerOverflow(value))?;
        self.write_integer(signed)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), BencodeError> {
        write!(self.buf, "{}:", bytes.len())?;
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    /// Appends already-encoded bytes.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn begin_list(&mut self) {
        self.buf.push(b'l');
    }

    pub fn begin_dict(&mut self) {
        self.buf.push(b'd');
    }

    pub fn end(&mut self) {
        self.buf.push(b'e');
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// Encodes a value to canonical bencode.
///
/// - Integers: `i<number>e`, no leading zeros
/// - Byte strings: `<length>:<data>`
/// - Lists: `l<items>e`
/// - Dictionaries: `d<key><value>...e`, keys in ascending byte order
///
/// # Examples
///
/// ```
/// use bencoding::bencode::{encode, Value};
/// use std::collections::HashMap;
///
/// assert_eq!(encode(&Value::Integer(-13)).unwrap(), b"i-13e");
/// assert_eq!(encode("hello").unwrap(), b"5:hello");
/// assert_eq!(encode(&true).unwrap(), b"i1e");
///
/// let mut map = HashMap::new();
/// map.insert("hello", "world");
/// map.insert("charset", "utf-8");
/// assert_eq!(encode(&map).unwrap(), b"d7:charset5:utf-85:hello5:worlde");
/// ```
pub fn encode<T: Encode + ?Sized>(value: &T) -> Result<Vec<u8>, BencodeError> {
    let mut enc = Encoder::new();
    enc.emit(value)?;
    Ok(enc.into_inner())
}

/// Encodes a value and writes it to `writer`.
///
/// Nothing is written if encoding fails.
pub fn encode_to_writer<W, T>(writer: &mut W, value: &T) -> Result<(), BencodeError>
where
    W: Write + ?Sized,
    T: Encode + ?Sized,
{
    let bytes = encode(value)?;
    writer.write_all(&bytes)?;
    Ok(())
}

/// Writes a record as a dictionary in field-table order.
///
/// An `omit_empty` field is left out when it is absent or when its encoding
/// is exactly `0:`, `le` or `de`. Zero integers and `false` are still
/// written.
pub fn encode_record<R: Record>(record: &R, enc: &mut Encoder) -> Result<(), BencodeError> {
    enc.begin_dict();
    for field in R::field_table().iter() {
        let Some(value) = record.field(field.ident) else {
            continue;
        };
        if !field.omit_empty {
            enc.write_bytes(field.name.as_bytes())?;
            enc.emit(value)?;
            continue;
        }
        if value.is_absent() {
            continue;
        }
        let mut scratch = Encoder::new();
        scratch.emit(value)?;
        if is_empty_encoding(scratch.as_bytes()) {
            continue;
        }
        enc.write_bytes(field.name.as_bytes())?;
        enc.write_raw(scratch.as_bytes());
    }
    enc.end();
    Ok(())
}

fn is_empty_encoding(bytes: &[u8]) -> bool {
    matches!(bytes, b"0:" | b"le" | b"de")
}

fn encode_entries<'a, K, V, I>(enc: &mut Encoder, entries: I) -> Result<(), BencodeError>
where
    K: AsRef<[u8]> + ?Sized + 'a,
    V: Encode + ?Sized + 'a,
    I: IntoIterator<Item = (&'a K, &'a V)>,
{
    let mut entries: Vec<_> = entries.into_iter().collect();
    entries.sort_by(|(a, _), (b, _)| a.as_ref().cmp(b.as_ref()));
    enc.begin_dict();
    for (key, value) in entries {
        enc.write_bytes(key.as_ref())?;
        enc.emit(value)?;
    }
    enc.end();
    Ok(())
}

impl Encode for Value {
    fn encode_to(&self, enc: &mut Encoder) -> Result<(), BencodeError> {
        match self {
            Value::Integer(i) => enc.write_integer(*i),
            Value::Bytes(b) => enc.write_bytes(b),
            Value::List(l) => l.encode_to(enc),
            Value::Dict(d) => {
                enc.begin_dict();
                for (key, value) in d {
                    enc.write_bytes(key)?;
                    value.encode_to(enc)?;
                }
                enc.end();
                Ok(())
            }
        }
    }
}

impl Encode for RawValue {
    fn encode_to(&self, enc: &mut Encoder) -> Result<(), BencodeError> {
        if self.is_empty() {
            return Err(BencodeError::NilValue);
        }
        enc.write_raw(&self.0);
        Ok(())
    }

    // An empty raw value holds no token, so it is treated like `None`.
    fn pre_encoded(&self) -> Option<Result<Vec<u8>, BencodeError>> {
        if self.is_empty() {
            return Some(Err(BencodeError::NilValue));
        }
        Some(Ok(self.0.to_vec()))
    }

    fn is_absent(&self) -> bool {
        self.is_empty()
    }
}

macro_rules! impl_encode_signed {
    ($($ty:ty),*) => {$(
        impl Encode for $ty {
            fn encode_to(&self, enc: &mut Encoder) -> Result<(), BencodeError> {
                enc.write_integer(i64::from(*self))
            }
        }
    )*};
}

macro_rules! impl_encode_unsigned {
    ($($ty:ty),*) => {$(
        impl Encode for $ty {
            fn encode_to(&self, enc: &mut Encoder) -> Result<(), BencodeError> {
                enc.write_unsigned(u64::from(*self))
            }
        }
    )*};
}

impl_encode_signed!(i8, i16, i32, i64);
impl_encode_unsigned!(u8, u16, u32, u64);

impl Encode for isize {
    fn encode_to(&self, enc: &mut Encoder) -> Result<(), BencodeError> {
        enc.write_integer(*self as i64)
    }
}

impl Encode for usize {
    fn encode_to(&self, enc: &mut Encoder) -> Result<(), BencodeError> {
        enc.write_unsigned(*self as u64)
    }
}

impl Encode for bool {
    fn encode_to(&self, enc: &mut Encoder) -> Result<(), BencodeError> {
        enc.write_integer(i64::from(*self))
    }
}

impl Encode for f32 {
    fn encode_to(&self, _enc: &mut Encoder) -> Result<(), BencodeError> {
        Err(BencodeError::UnsupportedType("f32"))
    }
}

impl Encode for f64 {
    fn encode_to(&self, _enc: &mut Encoder) -> Result<(), BencodeError> {
        Err(BencodeError::UnsupportedType("f64"))
    }
}

impl Encode for str {
    fn encode_to(&self, enc: &mut Encoder) -> Result<(), BencodeError> {
        enc.write_bytes(self.as_bytes())
    }
}

impl Encode for String {
    fn encode_to(&self, enc: &mut Encoder) -> Result<(), BencodeError> {
        enc.write_bytes(self.as_bytes())
    }
}

impl Encode for Bytes {
    fn encode_to(&self, enc: &mut Encoder) -> Result<(), BencodeError> {
        enc.write_bytes(self)
    }
}

impl<T: Encode> Encode for [T] {
    fn encode_to(&self, enc: &mut Encoder) -> Result<(), BencodeError> {
        enc.begin_list();
        for item in self {
            enc.emit(item)?;
        }
        enc.end();
        Ok(())
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode_to(&self, enc: &mut Encoder) -> Result<(), BencodeError> {
        self.as_slice().encode_to(enc)
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode_to(&self, enc: &mut Encoder) -> Result<(), BencodeError> {
        match self {
            Some(value) => enc.emit(value),
            None => Err(BencodeError::NilValue),
        }
    }

    fn is_absent(&self) -> bool {
        self.is_none()
    }
}

impl<T: Encode + ?Sized> Encode for Box<T> {
    fn encode_to(&self, enc: &mut Encoder) -> Result<(), BencodeError> {
        (**self).encode_to(enc)
    }

    fn pre_encoded(&self) -> Option<Result<Vec<u8>, BencodeError>> {
        (**self).pre_encoded()
    }

    fn is_absent(&self) -> bool {
        (**self).is_absent()
    }
}

impl<T: Encode + ?Sized> Encode for &T {
    fn encode_to(&self, enc: &mut Encoder) -> Result<(), BencodeError> {
        (**self).encode_to(enc)
    }

    fn pre_encoded(&self) -> Option<Result<Vec<u8>, BencodeError>> {
        (**self).pre_encoded()
    }

    fn is_absent(&self) -> bool {
        (**self).is_absent()
    }
}

impl<K: AsRef<[u8]>, V: Encode> Encode for BTreeMap<K, V> {
    fn encode_to(&self, enc: &mut Encoder) -> Result<(), BencodeError> {
        encode_entries(enc, self.iter())
    }
}

impl<K: AsRef<[u8]>, V: Encode, S> Encode for HashMap<K, V, S> {
    fn encode_to(&self, enc: &mut Encoder) -> Result<(), BencodeError> {
        encode_entries(enc, self.iter())
    }
}
