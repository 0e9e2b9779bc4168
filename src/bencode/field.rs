use super::decode::Decoder;
use super::encode::Encode;
use super::error::BencodeError;

/// How one struct field maps onto a dictionary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// The Rust field identifier.
    pub ident: &'static str,
    /// The dictionary key the field is stored under.
    pub name: &'static str,
    /// Skip the field on encode when it encodes as `0:`, `le` or `de`, or
    /// when it is absent.
    pub omit_empty: bool,
}

impl FieldDescriptor {
    pub const fn new(ident: &'static str, name: &'static str, omit_empty: bool) -> Self {
        Self {
            ident,
            name,
            omit_empty,
        }
    }
}

/// The fields of a record type, sorted by serialized name.
///
/// The same order drives both directions: encoding walks it to emit keys in
/// canonical order, and decoding matches incoming keys against it with a
/// single forward cursor.
#[derive(Debug, Clone)]
pub struct FieldTable {
    fields: Vec<FieldDescriptor>,
}

impl FieldTable {
    pub fn new(mut fields: Vec<FieldDescriptor>) -> Self {
        fields.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Finds the field for `key`, looking forward from position `start`.
    ///
    /// The search may step over `omit_empty` fields (they can legitimately be
    /// missing from the input) but stops at the first field that is not, so
    /// a key that arrives out of order is treated as unknown.
    ///
    /// ```
    /// use bencoding::bencode::{FieldDescriptor, FieldTable};
    ///
    /// let table = FieldTable::new(vec![
    ///     FieldDescriptor::new("name", "name", false),
    ///     FieldDescriptor::new("comment", "comment", true),
    ///     FieldDescriptor::new("announce", "announce", false),
    /// ]);
    /// // Sorted: announce, comment, name.
    /// assert_eq!(table.match_key(0, b"announce"), Some(0));
    /// assert_eq!(table.match_key(1, b"name"), Some(2));
    /// assert_eq!(table.match_key(0, b"name"), None);
    /// ```
    pub fn match_key(&self, start: usize, key: &[u8]) -> Option<usize> {
        for (index, field) in self.fields.iter().enumerate().skip(start) {
            if field.name.as_bytes() == key {
                return Some(index);
            }
            if !field.omit_empty {
                break;
            }
        }
        None
    }
}

/// A struct that binds to and from a bencode dictionary.
///
/// Implemented by [`bencode_record!`](crate::bencode_record); writing it by
/// hand is possible but rarely needed.
pub trait Record: Default {
    /// The field table, built once per type.
    fn field_table() -> &'static FieldTable;

    /// Decodes the next value into the field named `ident`.
    fn decode_field(&mut self, ident: &str, dec: &mut Decoder<'_>) -> Result<(), BencodeError>;

    /// Returns the field named `ident` for encoding.
    fn field(&self, ident: &str) -> Option<&dyn Encode>;
}

/// Implements [`Record`], [`Decode`](crate::bencode::Decode) and
/// [`Encode`](crate::bencode::Encode) for a struct that implements
/// `Default`.
///
/// Each entry names a field, optionally followed by `=> "key"` to store it
/// under a different dictionary key, and optionally by `[omit_empty]`.
///
/// ```
/// use bencoding::bencode_record;
/// use bencoding::bencode::{decode_one, encode};
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Announce {
///     url: String,
///     interval: i64,
///     tracker_id: String,
/// }
///
/// bencode_record!(Announce {
///     url,
///     interval,
///     tracker_id => "tracker id" [omit_empty],
/// });
///
/// let announce = Announce { url: "http://t".into(), interval: 0, tracker_id: String::new() };
/// let bytes = encode(&announce).unwrap();
/// assert_eq!(bytes, b"d8:intervali0e3:url8:http://te");
/// assert_eq!(decode_one::<Announce>(&bytes).unwrap(), announce);
/// ```
#[macro_export]
macro_rules! bencode_record {
    (@name $field:ident) => {
        stringify!($field)
    };
    (@name $field:ident $name:literal) => {
        $name
    };
    (@omit) => {
        false
    };
    (@omit omit_empty) => {
        true
    };
    ($ty:ident { $($field:ident $(=> $name:literal)? $([$flag:ident])?),* $(,)? }) => {
        impl $crate::bencode::Record for $ty {
            fn field_table() -> &'static $crate::bencode::FieldTable {
                static TABLE: ::std::sync::OnceLock<$crate::bencode::FieldTable> =
                    ::std::sync::OnceLock::new();
                TABLE.get_or_init(|| {
                    $crate::bencode::FieldTable::new(vec![$(
                        $crate::bencode::FieldDescriptor::new(
                            stringify!($field),
                            $crate::bencode_record!(@name $field $($name)?),
                            $crate::bencode_record!(@omit $($flag)?),
                        ),
                    )*])
                })
            }

            fn decode_field(
                &mut self,
                ident: &str,
                dec: &mut $crate::bencode::Decoder<'_>,
            ) -> ::std::result::Result<(), $crate::bencode::BencodeError> {
                $(
                    if ident == stringify!($field) {
                        return $crate::bencode::Decode::decode_into(&mut self.$field, dec);
                    }
                )*
                dec.skip_value()
            }

            fn field(&self, ident: &str) -> ::std::option::Option<&dyn $crate::bencode::Encode> {
                $(
                    if ident == stringify!($field) {
                        let value: &dyn $crate::bencode::Encode = &self.$field;
                        return ::std::option::Option::Some(value);
                    }
                )*
                ::std::option::Option::None
            }
        }

        impl $crate::bencode::Decode for $ty {
            fn decode_from(
                dec: &mut $crate::bencode::Decoder<'_>,
            ) -> ::std::result::Result<Self, $crate::bencode::BencodeError> {
                let mut record = <$ty as ::std::default::Default>::default();
                $crate::bencode::decode_record(&mut record, dec)?;
                ::std::result::Result::Ok(record)
            }

            fn decode_into(
                &mut self,
                dec: &mut $crate::bencode::Decoder<'_>,
            ) -> ::std::result::Result<(), $crate::bencode::BencodeError> {
                $crate::bencode::decode_record(self, dec)
            }
        }

        impl $crate::bencode::Encode for $ty {
            fn encode_to(
                &self,
                enc: &mut $crate::bencode::Encoder,
            ) -> ::std::result::Result<(), $crate::bencode::BencodeError> {
                $crate::bencode::encode_record(self, enc)
            }
        }
    };
}
