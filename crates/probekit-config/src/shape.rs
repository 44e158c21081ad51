//! Layout of a destination value
//!
//! The YAML tree of a destination cannot tell a struct from a map: both are
//! mappings. [`Shape`] records which mappings came from struct fields, so
//! only those get their keys matched loosely. Map keys are user data and
//! are kept as written.

use serde::ser::{self, Serialize};
use serde_yaml::Value;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Shape {
    /// Scalars, sequences and anything replaced wholesale
    Opaque,
    /// Map keyed by user data
    Map(Vec<(Value, Shape)>),
    /// Struct fields, by serialized name
    Struct(Vec<(&'static str, Shape)>),
    /// Payload of an enum variant (a YAML tag)
    Variant(Box<Shape>),
}

static OPAQUE: Shape = Shape::Opaque;

impl Shape {
    pub(crate) fn of<T: Serialize + ?Sized>(value: &T) -> Result<Shape, serde_yaml::Error> {
        value.serialize(ShapeSerializer)
    }

    pub(crate) fn is_struct(&self) -> bool {
        matches!(self, Shape::Struct(_))
    }

    /// Shape of the entry stored under `key`
    pub(crate) fn child(&self, key: &Value) -> &Shape {
        let found = match self {
            Shape::Map(entries) => entries
                .iter()
                .find(|(existing, _)| existing == key)
                .map(|(_, shape)| shape),
            Shape::Struct(fields) => key.as_str().and_then(|key| {
                fields
                    .iter()
                    .find(|(field, _)| *field == key)
                    .map(|(_, shape)| shape)
            }),
            _ => None,
        };
        found.unwrap_or(&OPAQUE)
    }

    /// Shape of a tagged payload
    pub(crate) fn payload(&self) -> &Shape {
        match self {
            Shape::Variant(inner) => inner,
            _ => &OPAQUE,
        }
    }
}

struct ShapeSerializer;

type ShapeResult = Result<Shape, serde_yaml::Error>;

impl ser::Serializer for ShapeSerializer {
    type Ok = Shape;
    type Error = serde_yaml::Error;

    type SerializeSeq = Skipped;
    type SerializeTuple = Skipped;
    type SerializeTupleStruct = Skipped;
    type SerializeTupleVariant = Skipped;
    type SerializeMap = MapShape;
    type SerializeStruct = StructShape;
    type SerializeStructVariant = StructShape;

    fn serialize_bool(self, _: bool) -> ShapeResult {
        Ok(Shape::Opaque)
    }

    fn serialize_i8(self, _: i8) -> ShapeResult {
        Ok(Shape::Opaque)
    }

    fn serialize_i16(self, _: i16) -> ShapeResult {
        Ok(Shape::Opaque)
    }

    fn serialize_i32(self, _: i32) -> ShapeResult {
        Ok(Shape::Opaque)
    }

    fn serialize_i64(self, _: i64) -> ShapeResult {
        Ok(Shape::Opaque)
    }

    fn serialize_i128(self, _: i128) -> ShapeResult {
        Ok(Shape::Opaque)
    }

    fn serialize_u8(self, _: u8) -> ShapeResult {
        Ok(Shape::Opaque)
    }

    fn serialize_u16(self, _: u16) -> ShapeResult {
        Ok(Shape::Opaque)
    }

    fn serialize_u32(self, _: u32) -> ShapeResult {
        Ok(Shape::Opaque)
    }

    fn serialize_u64(self, _: u64) -> ShapeResult {
        Ok(Shape::Opaque)
    }

    fn serialize_u128(self, _: u128) -> ShapeResult {
        Ok(Shape::Opaque)
    }

    fn serialize_f32(self, _: f32) -> ShapeResult {
        Ok(Shape::Opaque)
    }

    fn serialize_f64(self, _: f64) -> ShapeResult {
        Ok(Shape::Opaque)
    }

    fn serialize_char(self, _: char) -> ShapeResult {
        Ok(Shape::Opaque)
    }

    fn serialize_str(self, _: &str) -> ShapeResult {
        Ok(Shape::Opaque)
    }

    fn serialize_bytes(self, _: &[u8]) -> ShapeResult {
        Ok(Shape::Opaque)
    }

    fn serialize_none(self) -> ShapeResult {
        Ok(Shape::Opaque)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> ShapeResult {
        value.serialize(self)
    }

    fn serialize_unit(self) -> ShapeResult {
        Ok(Shape::Opaque)
    }

    fn serialize_unit_struct(self, _: &'static str) -> ShapeResult {
        Ok(Shape::Opaque)
    }

    fn serialize_unit_variant(self, _: &'static str, _: u32, _: &'static str) -> ShapeResult {
        Ok(Shape::Opaque)
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _: &'static str,
        value: &T,
    ) -> ShapeResult {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        value: &T,
    ) -> ShapeResult {
        Ok(Shape::Variant(Box::new(value.serialize(self)?)))
    }

    fn serialize_seq(self, _: Option<usize>) -> Result<Skipped, serde_yaml::Error> {
        Ok(Skipped { variant: false })
    }

    fn serialize_tuple(self, _: usize) -> Result<Skipped, serde_yaml::Error> {
        Ok(Skipped { variant: false })
    }

    fn serialize_tuple_struct(
        self,
        _: &'static str,
        _: usize,
    ) -> Result<Skipped, serde_yaml::Error> {
        Ok(Skipped { variant: false })
    }

    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Skipped, serde_yaml::Error> {
        Ok(Skipped { variant: true })
    }

    fn serialize_map(self, len: Option<usize>) -> Result<MapShape, serde_yaml::Error> {
        Ok(MapShape {
            entries: Vec::with_capacity(len.unwrap_or(0)),
            pending_key: None,
        })
    }

    fn serialize_struct(
        self,
        _: &'static str,
        len: usize,
    ) -> Result<StructShape, serde_yaml::Error> {
        Ok(StructShape {
            fields: Vec::with_capacity(len),
            variant: false,
        })
    }

    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        len: usize,
    ) -> Result<StructShape, serde_yaml::Error> {
        Ok(StructShape {
            fields: Vec::with_capacity(len),
            variant: true,
        })
    }
}

/// Sequences and tuples; their items are never merged
struct Skipped {
    variant: bool,
}

impl Skipped {
    fn finish(self) -> ShapeResult {
        Ok(if self.variant {
            Shape::Variant(Box::new(Shape::Opaque))
        } else {
            Shape::Opaque
        })
    }
}

impl ser::SerializeSeq for Skipped {
    type Ok = Shape;
    type Error = serde_yaml::Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, _: &T) -> Result<(), Self::Error> {
        Ok(())
    }

    fn end(self) -> ShapeResult {
        self.finish()
    }
}

impl ser::SerializeTuple for Skipped {
    type Ok = Shape;
    type Error = serde_yaml::Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, _: &T) -> Result<(), Self::Error> {
        Ok(())
    }

    fn end(self) -> ShapeResult {
        self.finish()
    }
}

impl ser::SerializeTupleStruct for Skipped {
    type Ok = Shape;
    type Error = serde_yaml::Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, _: &T) -> Result<(), Self::Error> {
        Ok(())
    }

    fn end(self) -> ShapeResult {
        self.finish()
    }
}

impl ser::SerializeTupleVariant for Skipped {
    type Ok = Shape;
    type Error = serde_yaml::Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, _: &T) -> Result<(), Self::Error> {
        Ok(())
    }

    fn end(self) -> ShapeResult {
        self.finish()
    }
}

struct MapShape {
    entries: Vec<(Value, Shape)>,
    pending_key: Option<Value>,
}

impl ser::SerializeMap for MapShape {
    type Ok = Shape;
    type Error = serde_yaml::Error;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), Self::Error> {
        self.pending_key = Some(serde_yaml::to_value(key)?);
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Self::Error> {
        let key = self
            .pending_key
            .take()
            .ok_or_else(|| {
                <serde_yaml::Error as ser::Error>::custom("map value serialized before its key")
            })?;
        self.entries.push((key, value.serialize(ShapeSerializer)?));
        Ok(())
    }

    fn end(self) -> ShapeResult {
        Ok(Shape::Map(self.entries))
    }
}

struct StructShape {
    fields: Vec<(&'static str, Shape)>,
    variant: bool,
}

impl StructShape {
    fn push<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), serde_yaml::Error> {
        self.fields.push((key, value.serialize(ShapeSerializer)?));
        Ok(())
    }

    fn finish(self) -> ShapeResult {
        let shape = Shape::Struct(self.fields);
        Ok(if self.variant {
            Shape::Variant(Box::new(shape))
        } else {
            shape
        })
    }
}

impl ser::SerializeStruct for StructShape {
    type Ok = Shape;
    type Error = serde_yaml::Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), Self::Error> {
        self.push(key, value)
    }

    fn end(self) -> ShapeResult {
        self.finish()
    }
}

impl ser::SerializeStructVariant for StructShape {
    type Ok = Shape;
    type Error = serde_yaml::Error;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), Self::Error> {
        self.push(key, value)
    }

    fn end(self) -> ShapeResult {
        self.finish()
    }
}
