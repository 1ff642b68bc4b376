use std::collections::btree_map;

use serde::de::{self, DeserializeOwned, Deserializer, IntoDeserializer, Visitor};

use crate::firestore::error::{invalid_argument, FirestoreError, FirestoreResult};
use crate::firestore::value::{DocumentData, FirestoreValue, ValueKind};

use super::DOC_ID;

/// Reconstructs a typed record from a document's field map, injecting the
/// supplied document id wherever a field renamed to [`DOC_ID`] is declared.
///
/// Absent optional fields decode as `None`; absent mandatory fields and any
/// kind mismatch fail with an invalid-argument error. There is no lenient
/// mode.
pub fn decode_document<T: DeserializeOwned>(id: &str, fields: &DocumentData) -> FirestoreResult<T> {
    let value = FirestoreValue::from_map(fields.clone());
    T::deserialize(FirebaseDecoder { value: &value, id })
}

/// Reconstructs a typed value from any structural value.
pub fn decode_value<T: DeserializeOwned>(value: &FirestoreValue) -> FirestoreResult<T> {
    T::deserialize(FirebaseDecoder { value, id: "" })
}

/// The structural inverse of the encoder: a `serde::Deserializer` reading
/// from a [`FirestoreValue`] tree.
#[derive(Clone, Copy)]
pub(crate) struct FirebaseDecoder<'de> {
    value: &'de FirestoreValue,
    id: &'de str,
}

impl<'de> FirebaseDecoder<'de> {
    fn mismatch(&self, expected: &str) -> FirestoreError {
        invalid_argument(format!(
            "Expected {expected}, found {:?}",
            self.value.kind()
        ))
    }
}

impl<'de> de::Deserializer<'de> for FirebaseDecoder<'de> {
    type Error = FirestoreError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> FirestoreResult<V::Value> {
        match self.value.kind() {
            ValueKind::Null => visitor.visit_unit(),
            ValueKind::Boolean(v) => visitor.visit_bool(*v),
            ValueKind::Integer(v) => visitor.visit_i64(*v),
            ValueKind::Double(v) => visitor.visit_f64(*v),
            ValueKind::Timestamp(v) => visitor.visit_string(v.to_rfc3339()),
            ValueKind::String(v) => visitor.visit_str(v),
            ValueKind::Blob(v) => visitor.visit_bytes(v.as_slice()),
            ValueKind::Array(values) => visitor.visit_seq(SeqDecoder {
                iter: values.iter(),
                id: self.id,
            }),
            ValueKind::Map(fields) => visitor.visit_map(MapDecoder::new(fields, self.id, false)),
            ValueKind::Sentinel(_) => Err(self.mismatch("a stored value, not a write sentinel")),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> FirestoreResult<V::Value> {
        match self.value.kind() {
            ValueKind::Boolean(v) => visitor.visit_bool(*v),
            _ => Err(self.mismatch("a boolean")),
        }
    }

    fn deserialize_i8<V: Visitor<'de>>(self, visitor: V) -> FirestoreResult<V::Value> {
        self.deserialize_i64(visitor)
    }

    fn deserialize_i16<V: Visitor<'de>>(self, visitor: V) -> FirestoreResult<V::Value> {
        self.deserialize_i64(visitor)
    }

    fn deserialize_i32<V: Visitor<'de>>(self, visitor: V) -> FirestoreResult<V::Value> {
        self.deserialize_i64(visitor)
    }

    fn deserialize_i64<V: Visitor<'de>>(self, visitor: V) -> FirestoreResult<V::Value> {
        match self.value.kind() {
            ValueKind::Integer(v) => visitor.visit_i64(*v),
            _ => Err(self.mismatch("an integer")),
        }
    }

    fn deserialize_u8<V: Visitor<'de>>(self, visitor: V) -> FirestoreResult<V::Value> {
        self.deserialize_i64(visitor)
    }

    fn deserialize_u16<V: Visitor<'de>>(self, visitor: V) -> FirestoreResult<V::Value> {
        self.deserialize_i64(visitor)
    }

    fn deserialize_u32<V: Visitor<'de>>(self, visitor: V) -> FirestoreResult<V::Value> {
        self.deserialize_i64(visitor)
    }

    fn deserialize_u64<V: Visitor<'de>>(self, visitor: V) -> FirestoreResult<V::Value> {
        self.deserialize_i64(visitor)
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> FirestoreResult<V::Value> {
        self.deserialize_f64(visitor)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> FirestoreResult<V::Value> {
        match self.value.kind() {
            ValueKind::Double(v) => visitor.visit_f64(*v),
            // Stored longs widen to the requested floating width.
            ValueKind::Integer(v) => visitor.visit_f64(*v as f64),
            _ => Err(self.mismatch("a double")),
        }
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> FirestoreResult<V::Value> {
        match self.value.kind() {
            ValueKind::String(v) => {
                let mut chars = v.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => visitor.visit_char(c),
                    _ => Err(invalid_argument(format!(
                        "Expected a single-character string, found {v:?}"
                    ))),
                }
            }
            _ => Err(self.mismatch("a single-character string")),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> FirestoreResult<V::Value> {
        match self.value.kind() {
            ValueKind::String(v) => visitor.visit_str(v),
            ValueKind::Timestamp(v) => visitor.visit_string(v.to_rfc3339()),
            _ => Err(self.mismatch("a string")),
        }
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> FirestoreResult<V::Value> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> FirestoreResult<V::Value> {
        match self.value.kind() {
            ValueKind::Blob(v) => visitor.visit_bytes(v.as_slice()),
            _ => Err(self.mismatch("a blob")),
        }
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> FirestoreResult<V::Value> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> FirestoreResult<V::Value> {
        match self.value.kind() {
            ValueKind::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> FirestoreResult<V::Value> {
        match self.value.kind() {
            ValueKind::Null => visitor.visit_unit(),
            _ => Err(self.mismatch("null")),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> FirestoreResult<V::Value> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> FirestoreResult<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> FirestoreResult<V::Value> {
        match self.value.kind() {
            ValueKind::Array(values) => visitor.visit_seq(SeqDecoder {
                iter: values.iter(),
                id: self.id,
            }),
            _ => Err(self.mismatch("an array")),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> FirestoreResult<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> FirestoreResult<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> FirestoreResult<V::Value> {
        match self.value.kind() {
            ValueKind::Map(fields) => visitor.visit_map(MapDecoder::new(fields, self.id, false)),
            _ => Err(self.mismatch("a map")),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> FirestoreResult<V::Value> {
        match self.value.kind() {
            ValueKind::Map(map) => {
                let inject_id = fields.contains(&DOC_ID) && !map.contains_key(DOC_ID);
                visitor.visit_map(MapDecoder::new(map, self.id, inject_id))
            }
            _ => Err(self.mismatch("a map")),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> FirestoreResult<V::Value> {
        match self.value.kind() {
            // Ordinal-encoded unit variant.
            ValueKind::Integer(index) => {
                let index = u32::try_from(*index)
                    .map_err(|_| invalid_argument(format!("Invalid enum ordinal {index}")))?;
                visitor.visit_enum(index.into_deserializer())
            }
            ValueKind::String(variant) => visitor.visit_enum(variant.as_str().into_deserializer()),
            ValueKind::Map(map) => {
                let (variant, value) = map
                    .iter()
                    .next()
                    .ok_or_else(|| invalid_argument("Cannot decode enum from an empty map"))?;
                if map.len() != 1 {
                    return Err(invalid_argument(
                        "Enum maps must contain exactly one variant entry",
                    ));
                }
                visitor.visit_enum(EnumDecoder {
                    variant,
                    value,
                    id: self.id,
                })
            }
            _ => Err(self.mismatch("an enum ordinal, name or variant map")),
        }
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> FirestoreResult<V::Value> {
        self.deserialize_str(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> FirestoreResult<V::Value> {
        visitor.visit_unit()
    }
}

struct SeqDecoder<'de> {
    iter: std::slice::Iter<'de, FirestoreValue>,
    id: &'de str,
}

impl<'de> de::SeqAccess<'de> for SeqDecoder<'de> {
    type Error = FirestoreError;

    fn next_element_seed<T: de::DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> FirestoreResult<Option<T::Value>> {
        match self.iter.next() {
            Some(value) => seed
                .deserialize(FirebaseDecoder { value, id: self.id })
                .map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct MapDecoder<'de> {
    iter: btree_map::Iter<'de, String, FirestoreValue>,
    pending: Option<&'de FirestoreValue>,
    id: &'de str,
    inject_id: bool,
    id_pending: bool,
}

impl<'de> MapDecoder<'de> {
    fn new(fields: &'de DocumentData, id: &'de str, inject_id: bool) -> Self {
        Self {
            iter: fields.iter(),
            pending: None,
            id,
            inject_id,
            id_pending: false,
        }
    }
}

impl<'de> de::MapAccess<'de> for MapDecoder<'de> {
    type Error = FirestoreError;

    fn next_key_seed<K: de::DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> FirestoreResult<Option<K::Value>> {
        if self.inject_id {
            self.inject_id = false;
            self.id_pending = true;
            return seed.deserialize(KeyDecoder { key: DOC_ID }).map(Some);
        }
        match self.iter.next() {
            Some((key, value)) => {
                self.pending = Some(value);
                seed.deserialize(KeyDecoder { key }).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: de::DeserializeSeed<'de>>(
        &mut self,
        seed: V,
    ) -> FirestoreResult<V::Value> {
        if self.id_pending {
            self.id_pending = false;
            return seed.deserialize(self.id.into_deserializer());
        }
        let value = self
            .pending
            .take()
            .ok_or_else(|| internal_decode_state("map value requested before its key"))?;
        seed.deserialize(FirebaseDecoder { value, id: self.id })
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

fn internal_decode_state(message: &str) -> FirestoreError {
    invalid_argument(format!("Decoder state error: {message}"))
}

/// Deserializer for map keys: struct field identifiers pass through as
/// strings, while numeric-like key types parse back from their stringified
/// form.
struct KeyDecoder<'de> {
    key: &'de str,
}

macro_rules! parse_key {
    ($method:ident, $visit:ident, $ty:ty) => {
        fn $method<V: Visitor<'de>>(self, visitor: V) -> FirestoreResult<V::Value> {
            let parsed: $ty = self.key.parse().map_err(|_| {
                invalid_argument(format!("Map key {:?} is not a valid number", self.key))
            })?;
            visitor.$visit(parsed)
        }
    };
}

impl<'de> de::Deserializer<'de> for KeyDecoder<'de> {
    type Error = FirestoreError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> FirestoreResult<V::Value> {
        visitor.visit_str(self.key)
    }

    parse_key!(deserialize_i8, visit_i8, i8);
    parse_key!(deserialize_i16, visit_i16, i16);
    parse_key!(deserialize_i32, visit_i32, i32);
    parse_key!(deserialize_i64, visit_i64, i64);
    parse_key!(deserialize_u8, visit_u8, u8);
    parse_key!(deserialize_u16, visit_u16, u16);
    parse_key!(deserialize_u32, visit_u32, u32);
    parse_key!(deserialize_u64, visit_u64, u64);

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> FirestoreResult<V::Value> {
        match self.key {
            "true" => visitor.visit_bool(true),
            "false" => visitor.visit_bool(false),
            other => Err(invalid_argument(format!(
                "Map key {other:?} is not a valid boolean"
            ))),
        }
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> FirestoreResult<V::Value> {
        let mut chars = self.key.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => visitor.visit_char(c),
            _ => Err(invalid_argument(format!(
                "Map key {:?} is not a single character",
                self.key
            ))),
        }
    }

    serde::forward_to_deserialize_any! {
        f32 f64 str string bytes byte_buf option unit unit_struct newtype_struct
        seq tuple tuple_struct map struct enum identifier ignored_any
    }
}

struct EnumDecoder<'de> {
    variant: &'de str,
    value: &'de FirestoreValue,
    id: &'de str,
}

impl<'de> de::EnumAccess<'de> for EnumDecoder<'de> {
    type Error = FirestoreError;
    type Variant = VariantDecoder<'de>;

    fn variant_seed<V: de::DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> FirestoreResult<(V::Value, VariantDecoder<'de>)> {
        let variant = seed.deserialize(self.variant.into_deserializer())?;
        Ok((
            variant,
            VariantDecoder {
                value: self.value,
                id: self.id,
            },
        ))
    }
}

struct VariantDecoder<'de> {
    value: &'de FirestoreValue,
    id: &'de str,
}

impl<'de> de::VariantAccess<'de> for VariantDecoder<'de> {
    type Error = FirestoreError;

    fn unit_variant(self) -> FirestoreResult<()> {
        match self.value.kind() {
            ValueKind::Null => Ok(()),
            other => Err(invalid_argument(format!(
                "Expected no payload for unit variant, found {other:?}"
            ))),
        }
    }

    fn newtype_variant_seed<T: de::DeserializeSeed<'de>>(self, seed: T) -> FirestoreResult<T::Value> {
        seed.deserialize(FirebaseDecoder {
            value: self.value,
            id: self.id,
        })
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> FirestoreResult<V::Value> {
        FirebaseDecoder {
            value: self.value,
            id: self.id,
        }
        .deserialize_seq(visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> FirestoreResult<V::Value> {
        FirebaseDecoder {
            value: self.value,
            id: self.id,
        }
        .deserialize_map(visitor)
    }
}
