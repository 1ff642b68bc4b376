use serde::ser::{self, Serialize};

use crate::firestore::error::{invalid_argument, FirestoreError, FirestoreResult};
use crate::firestore::value::{Blob, DocumentData, FirestoreValue, ValueKind};

use super::DOC_ID;

/// Encodes a typed record into a document field map.
///
/// The record must encode to a map at the top level; a field renamed to
/// [`DOC_ID`] is skipped, since the document id is derived from the path
/// rather than stored.
pub fn encode_document<T: Serialize>(value: &T) -> FirestoreResult<DocumentData> {
    match encode_value(value)?.into_kind() {
        ValueKind::Map(map) => Ok(map),
        other => Err(invalid_argument(format!(
            "Document data must encode to a map of fields, got {other:?}"
        ))),
    }
}

/// Encodes any serializable value into the structural value tree.
pub fn encode_value<T: Serialize>(value: &T) -> FirestoreResult<FirestoreValue> {
    Ok(value.serialize(FirebaseEncoder)?.into_value())
}

/// Output of one serializer step. `Skip` marks values that are omitted from
/// their containing map: `None` fields and the [`DOC_ID`] marker field.
pub(crate) enum Encoded {
    Value(FirestoreValue),
    Skip,
}

impl Encoded {
    fn into_value(self) -> FirestoreValue {
        match self {
            Encoded::Value(value) => value,
            Encoded::Skip => FirestoreValue::null(),
        }
    }
}

/// A reflection-free `serde::Serializer` producing [`FirestoreValue`] trees.
///
/// Numeric widths normalize to long/double, chars to one-character strings,
/// unit enum variants to their ordinal index, and byte buffers to blobs,
/// mirroring the shapes the native Firestore SDKs persist.
pub(crate) struct FirebaseEncoder;

impl ser::Serializer for FirebaseEncoder {
    type Ok = Encoded;
    type Error = FirestoreError;

    type SerializeSeq = SeqEncoder;
    type SerializeTuple = SeqEncoder;
    type SerializeTupleStruct = SeqEncoder;
    type SerializeTupleVariant = VariantSeqEncoder;
    type SerializeMap = MapEncoder;
    type SerializeStruct = MapEncoder;
    type SerializeStructVariant = VariantMapEncoder;

    fn serialize_bool(self, v: bool) -> FirestoreResult<Encoded> {
        Ok(Encoded::Value(FirestoreValue::from_bool(v)))
    }

    fn serialize_i8(self, v: i8) -> FirestoreResult<Encoded> {
        self.serialize_i64(v.into())
    }

    fn serialize_i16(self, v: i16) -> FirestoreResult<Encoded> {
        self.serialize_i64(v.into())
    }

    fn serialize_i32(self, v: i32) -> FirestoreResult<Encoded> {
        self.serialize_i64(v.into())
    }

    fn serialize_i64(self, v: i64) -> FirestoreResult<Encoded> {
        Ok(Encoded::Value(FirestoreValue::from_integer(v)))
    }

    fn serialize_u8(self, v: u8) -> FirestoreResult<Encoded> {
        self.serialize_i64(v.into())
    }

    fn serialize_u16(self, v: u16) -> FirestoreResult<Encoded> {
        self.serialize_i64(v.into())
    }

    fn serialize_u32(self, v: u32) -> FirestoreResult<Encoded> {
        self.serialize_i64(v.into())
    }

    fn serialize_u64(self, v: u64) -> FirestoreResult<Encoded> {
        let v = i64::try_from(v)
            .map_err(|_| invalid_argument(format!("Integer {v} overflows the long value range")))?;
        self.serialize_i64(v)
    }

    fn serialize_f32(self, v: f32) -> FirestoreResult<Encoded> {
        self.serialize_f64(v.into())
    }

    fn serialize_f64(self, v: f64) -> FirestoreResult<Encoded> {
        Ok(Encoded::Value(FirestoreValue::from_double(v)))
    }

    fn serialize_char(self, v: char) -> FirestoreResult<Encoded> {
        Ok(Encoded::Value(FirestoreValue::from_string(v.to_string())))
    }

    fn serialize_str(self, v: &str) -> FirestoreResult<Encoded> {
        Ok(Encoded::Value(FirestoreValue::from_string(v)))
    }

    fn serialize_bytes(self, v: &[u8]) -> FirestoreResult<Encoded> {
        Ok(Encoded::Value(FirestoreValue::from_blob(Blob::new(
            v.to_vec(),
        ))))
    }

    fn serialize_none(self) -> FirestoreResult<Encoded> {
        Ok(Encoded::Skip)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> FirestoreResult<Encoded> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> FirestoreResult<Encoded> {
        Ok(Encoded::Value(FirestoreValue::null()))
    }

    fn serialize_unit_struct(self, _name: &'static str) -> FirestoreResult<Encoded> {
        self.serialize_unit()
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        variant_index: u32,
        _variant: &'static str,
    ) -> FirestoreResult<Encoded> {
        // Enum constants persist as their ordinal index.
        self.serialize_i64(variant_index.into())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> FirestoreResult<Encoded> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> FirestoreResult<Encoded> {
        let mut map = DocumentData::new();
        map.insert(variant.to_string(), value.serialize(FirebaseEncoder)?.into_value());
        Ok(Encoded::Value(FirestoreValue::from_map(map)))
    }

    fn serialize_seq(self, len: Option<usize>) -> FirestoreResult<SeqEncoder> {
        Ok(SeqEncoder {
            values: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> FirestoreResult<SeqEncoder> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> FirestoreResult<SeqEncoder> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> FirestoreResult<VariantSeqEncoder> {
        Ok(VariantSeqEncoder {
            variant,
            values: Vec::with_capacity(len),
        })
    }

    fn serialize_map(self, _len: Option<usize>) -> FirestoreResult<MapEncoder> {
        Ok(MapEncoder {
            fields: DocumentData::new(),
            pending_key: None,
        })
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> FirestoreResult<MapEncoder> {
        self.serialize_map(None)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> FirestoreResult<VariantMapEncoder> {
        Ok(VariantMapEncoder {
            variant,
            fields: DocumentData::new(),
        })
    }
}

pub(crate) struct SeqEncoder {
    values: Vec<FirestoreValue>,
}

impl ser::SerializeSeq for SeqEncoder {
    type Ok = Encoded;
    type Error = FirestoreError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> FirestoreResult<()> {
        // A skipped value inside a sequence keeps its slot as null.
        self.values.push(value.serialize(FirebaseEncoder)?.into_value());
        Ok(())
    }

    fn end(self) -> FirestoreResult<Encoded> {
        Ok(Encoded::Value(FirestoreValue::from_array(self.values)))
    }
}

impl ser::SerializeTuple for SeqEncoder {
    type Ok = Encoded;
    type Error = FirestoreError;

    fn serialize_element<T: Serialize + ?Sized>(&mut self, value: &T) -> FirestoreResult<()> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> FirestoreResult<Encoded> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for SeqEncoder {
    type Ok = Encoded;
    type Error = FirestoreError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> FirestoreResult<()> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> FirestoreResult<Encoded> {
        ser::SerializeSeq::end(self)
    }
}

pub(crate) struct VariantSeqEncoder {
    variant: &'static str,
    values: Vec<FirestoreValue>,
}

impl ser::SerializeTupleVariant for VariantSeqEncoder {
    type Ok = Encoded;
    type Error = FirestoreError;

    fn serialize_field<T: Serialize + ?Sized>(&mut self, value: &T) -> FirestoreResult<()> {
        self.values.push(value.serialize(FirebaseEncoder)?.into_value());
        Ok(())
    }

    fn end(self) -> FirestoreResult<Encoded> {
        let mut map = DocumentData::new();
        map.insert(
            self.variant.to_string(),
            FirestoreValue::from_array(self.values),
        );
        Ok(Encoded::Value(FirestoreValue::from_map(map)))
    }
}

pub(crate) struct MapEncoder {
    fields: DocumentData,
    pending_key: Option<String>,
}

impl ser::SerializeMap for MapEncoder {
    type Ok = Encoded;
    type Error = FirestoreError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> FirestoreResult<()> {
        self.pending_key = Some(key.serialize(KeyEncoder)?);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> FirestoreResult<()> {
        let key = self
            .pending_key
            .take()
            .ok_or_else(|| invalid_argument("Map value serialized before its key"))?;
        if let Encoded::Value(value) = value.serialize(FirebaseEncoder)? {
            self.fields.insert(key, value);
        }
        Ok(())
    }

    fn end(self) -> FirestoreResult<Encoded> {
        Ok(Encoded::Value(FirestoreValue::from_map(self.fields)))
    }
}

impl ser::SerializeStruct for MapEncoder {
    type Ok = Encoded;
    type Error = FirestoreError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> FirestoreResult<()> {
        // The document id is contextual, never a stored field.
        if key == DOC_ID {
            return Ok(());
        }
        if let Encoded::Value(value) = value.serialize(FirebaseEncoder)? {
            self.fields.insert(key.to_string(), value);
        }
        Ok(())
    }

    fn end(self) -> FirestoreResult<Encoded> {
        Ok(Encoded::Value(FirestoreValue::from_map(self.fields)))
    }
}

pub(crate) struct VariantMapEncoder {
    variant: &'static str,
    fields: DocumentData,
}

impl ser::SerializeStructVariant for VariantMapEncoder {
    type Ok = Encoded;
    type Error = FirestoreError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> FirestoreResult<()> {
        if let Encoded::Value(value) = value.serialize(FirebaseEncoder)? {
            self.fields.insert(key.to_string(), value);
        }
        Ok(())
    }

    fn end(self) -> FirestoreResult<Encoded> {
        let mut map = DocumentData::new();
        map.insert(
            self.variant.to_string(),
            FirestoreValue::from_map(self.fields),
        );
        Ok(Encoded::Value(FirestoreValue::from_map(map)))
    }
}

/// Serializer for map keys: strings pass through, numeric-like keys render to
/// their display strings. The canonical replacement for per-platform
/// non-string-key conventions.
struct KeyEncoder;

macro_rules! key_to_string {
    ($method:ident, $ty:ty) => {
        fn $method(self, v: $ty) -> FirestoreResult<String> {
            Ok(v.to_string())
        }
    };
}

impl ser::Serializer for KeyEncoder {
    type Ok = String;
    type Error = FirestoreError;

    type SerializeSeq = ser::Impossible<String, FirestoreError>;
    type SerializeTuple = ser::Impossible<String, FirestoreError>;
    type SerializeTupleStruct = ser::Impossible<String, FirestoreError>;
    type SerializeTupleVariant = ser::Impossible<String, FirestoreError>;
    type SerializeMap = ser::Impossible<String, FirestoreError>;
    type SerializeStruct = ser::Impossible<String, FirestoreError>;
    type SerializeStructVariant = ser::Impossible<String, FirestoreError>;

    key_to_string!(serialize_bool, bool);
    key_to_string!(serialize_i8, i8);
    key_to_string!(serialize_i16, i16);
    key_to_string!(serialize_i32, i32);
    key_to_string!(serialize_i64, i64);
    key_to_string!(serialize_u8, u8);
    key_to_string!(serialize_u16, u16);
    key_to_string!(serialize_u32, u32);
    key_to_string!(serialize_u64, u64);
    key_to_string!(serialize_char, char);

    fn serialize_f32(self, _v: f32) -> FirestoreResult<String> {
        Err(invalid_argument("Floating point map keys are not supported"))
    }

    fn serialize_f64(self, _v: f64) -> FirestoreResult<String> {
        Err(invalid_argument("Floating point map keys are not supported"))
    }

    fn serialize_str(self, v: &str) -> FirestoreResult<String> {
        Ok(v.to_string())
    }

    fn serialize_bytes(self, _v: &[u8]) -> FirestoreResult<String> {
        Err(invalid_argument("Binary map keys are not supported"))
    }

    fn serialize_none(self) -> FirestoreResult<String> {
        Err(invalid_argument("Null map keys are not supported"))
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> FirestoreResult<String> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> FirestoreResult<String> {
        Err(invalid_argument("Null map keys are not supported"))
    }

    fn serialize_unit_struct(self, _name: &'static str) -> FirestoreResult<String> {
        Err(invalid_argument("Unit map keys are not supported"))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> FirestoreResult<String> {
        Ok(variant.to_string())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> FirestoreResult<String> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> FirestoreResult<String> {
        Err(invalid_argument("Structured map keys are not supported"))
    }

    fn serialize_seq(self, _len: Option<usize>) -> FirestoreResult<Self::SerializeSeq> {
        Err(invalid_argument("Structured map keys are not supported"))
    }

    fn serialize_tuple(self, _len: usize) -> FirestoreResult<Self::SerializeTuple> {
        Err(invalid_argument("Structured map keys are not supported"))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> FirestoreResult<Self::SerializeTupleStruct> {
        Err(invalid_argument("Structured map keys are not supported"))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> FirestoreResult<Self::SerializeTupleVariant> {
        Err(invalid_argument("Structured map keys are not supported"))
    }

    fn serialize_map(self, _len: Option<usize>) -> FirestoreResult<Self::SerializeMap> {
        Err(invalid_argument("Structured map keys are not supported"))
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> FirestoreResult<Self::SerializeStruct> {
        Err(invalid_argument("Structured map keys are not supported"))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> FirestoreResult<Self::SerializeStructVariant> {
        Err(invalid_argument("Structured map keys are not supported"))
    }
}
