//! Serializer turning any `Serialize` value into a [`Node`] tree
//!
//! Formatters and field filtering are applied while the tree is built, so a
//! formatter always sees the complete value of its type.

use crate::error::DiffError;
use crate::node::Node;
use crate::options::DiffConfig;
use serde::ser::{self, Serialize};

pub(crate) fn to_node<T: Serialize + ?Sized>(
    value: &T,
    config: &DiffConfig,
) -> Result<Node, DiffError> {
    value.serialize(NodeSerializer { config })
}

#[derive(Clone, Copy)]
struct NodeSerializer<'a> {
    config: &'a DiffConfig,
}

impl<'a> NodeSerializer<'a> {
    fn finish_struct(self, name: &'static str, fields: Vec<(String, Node)>) -> Node {
        match self.config.formatter(name) {
            Some(format) => {
                let node = Node::Struct { name, fields };
                Node::Formatted {
                    name,
                    text: format(&node),
                    zero: node.is_zero(),
                }
            }
            None => self.filter_fields(name, fields),
        }
    }

    fn finish_variant(self, name: &'static str, variant: &'static str, value: Node) -> Node {
        let node = Node::Variant {
            name,
            variant,
            value: Box::new(value),
        };
        match self.config.formatter(name) {
            Some(format) => Node::Formatted {
                name,
                text: format(&node),
                zero: node.is_zero(),
            },
            None => node,
        }
    }

    fn filter_fields(self, name: &'static str, fields: Vec<(String, Node)>) -> Node {
        let fields = fields
            .into_iter()
            .filter(|(field, node)| self.config.keeps_field(field, node))
            .collect();
        Node::Struct { name, fields }
    }
}

impl<'a> ser::Serializer for NodeSerializer<'a> {
    type Ok = Node;
    type Error = DiffError;

    type SerializeSeq = SeqBuilder<'a>;
    type SerializeTuple = SeqBuilder<'a>;
    type SerializeTupleStruct = TupleStructBuilder<'a>;
    type SerializeTupleVariant = TupleVariantBuilder<'a>;
    type SerializeMap = MapBuilder<'a>;
    type SerializeStruct = StructBuilder<'a>;
    type SerializeStructVariant = StructVariantBuilder<'a>;

    fn serialize_bool(self, v: bool) -> Result<Node, DiffError> {
        Ok(Node::Bool(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Node, DiffError> {
        Ok(Node::Int(v.into()))
    }

    fn serialize_i16(self, v: i16) -> Result<Node, DiffError> {
        Ok(Node::Int(v.into()))
    }

    fn serialize_i32(self, v: i32) -> Result<Node, DiffError> {
        Ok(Node::Int(v.into()))
    }

    fn serialize_i64(self, v: i64) -> Result<Node, DiffError> {
        Ok(Node::Int(v.into()))
    }

    fn serialize_i128(self, v: i128) -> Result<Node, DiffError> {
        Ok(Node::Int(v))
    }

    fn serialize_u8(self, v: u8) -> Result<Node, DiffError> {
        Ok(Node::Int(v.into()))
    }

    fn serialize_u16(self, v: u16) -> Result<Node, DiffError> {
        Ok(Node::Int(v.into()))
    }

    fn serialize_u32(self, v: u32) -> Result<Node, DiffError> {
        Ok(Node::Int(v.into()))
    }

    fn serialize_u64(self, v: u64) -> Result<Node, DiffError> {
        Ok(Node::Int(v.into()))
    }

    fn serialize_u128(self, v: u128) -> Result<Node, DiffError> {
        // Beyond i128 only the decimal text is kept
        Ok(i128::try_from(v)
            .map(Node::Int)
            .unwrap_or_else(|_| Node::Str(v.to_string())))
    }

    fn serialize_f32(self, v: f32) -> Result<Node, DiffError> {
        Ok(Node::Float(v.into()))
    }

    fn serialize_f64(self, v: f64) -> Result<Node, DiffError> {
        Ok(Node::Float(v))
    }

    fn serialize_char(self, v: char) -> Result<Node, DiffError> {
        Ok(Node::Str(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Node, DiffError> {
        Ok(Node::Str(v.to_string()))
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Node, DiffError> {
        Ok(Node::Bytes(v.to_vec()))
    }

    fn serialize_none(self) -> Result<Node, DiffError> {
        Ok(Node::Null)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<Node, DiffError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Node, DiffError> {
        Ok(Node::Null)
    }

    fn serialize_unit_struct(self, name: &'static str) -> Result<Node, DiffError> {
        Ok(self.finish_struct(name, Vec::new()))
    }

    fn serialize_unit_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Node, DiffError> {
        Ok(self.finish_variant(name, variant, Node::Null))
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<Node, DiffError> {
        let inner = value.serialize(self)?;
        Ok(match self.config.formatter(name) {
            Some(format) => Node::Formatted {
                name,
                text: format(&inner),
                zero: inner.is_zero(),
            },
            None => inner,
        })
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Node, DiffError> {
        let value = value.serialize(self)?;
        Ok(self.finish_variant(name, variant, value))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqBuilder<'a>, DiffError> {
        Ok(SeqBuilder {
            serializer: self,
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqBuilder<'a>, DiffError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        name: &'static str,
        len: usize,
    ) -> Result<TupleStructBuilder<'a>, DiffError> {
        Ok(TupleStructBuilder {
            serializer: self,
            name,
            fields: Vec::with_capacity(len),
        })
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<TupleVariantBuilder<'a>, DiffError> {
        Ok(TupleVariantBuilder {
            serializer: self,
            name,
            variant,
            items: SeqBuilder {
                serializer: self,
                items: Vec::with_capacity(len),
            },
        })
    }

    fn serialize_map(self, len: Option<usize>) -> Result<MapBuilder<'a>, DiffError> {
        Ok(MapBuilder {
            serializer: self,
            entries: Vec::with_capacity(len.unwrap_or(0)),
            pending_key: None,
        })
    }

    fn serialize_struct(
        self,
        name: &'static str,
        len: usize,
    ) -> Result<StructBuilder<'a>, DiffError> {
        Ok(StructBuilder {
            serializer: self,
            name,
            fields: Vec::with_capacity(len),
        })
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<StructVariantBuilder<'a>, DiffError> {
        Ok(StructVariantBuilder {
            name,
            variant,
            fields: StructBuilder {
                serializer: self,
                name: variant,
                fields: Vec::with_capacity(len),
            },
        })
    }
}

pub(crate) struct SeqBuilder<'a> {
    serializer: NodeSerializer<'a>,
    items: Vec<Node>,
}

impl<'a> ser::SerializeSeq for SeqBuilder<'a> {
    type Ok = Node;
    type Error = DiffError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), DiffError> {
        self.items.push(value.serialize(self.serializer)?);
        Ok(())
    }

    fn end(self) -> Result<Node, DiffError> {
        Ok(Node::Seq(self.items))
    }
}

impl<'a> ser::SerializeTuple for SeqBuilder<'a> {
    type Ok = Node;
    type Error = DiffError;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), DiffError> {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Node, DiffError> {
        ser::SerializeSeq::end(self)
    }
}

pub(crate) struct TupleStructBuilder<'a> {
    serializer: NodeSerializer<'a>,
    name: &'static str,
    fields: Vec<(String, Node)>,
}

impl<'a> ser::SerializeTupleStruct for TupleStructBuilder<'a> {
    type Ok = Node;
    type Error = DiffError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), DiffError> {
        let index = self.fields.len().to_string();
        self.fields.push((index, value.serialize(self.serializer)?));
        Ok(())
    }

    fn end(self) -> Result<Node, DiffError> {
        Ok(self.serializer.finish_struct(self.name, self.fields))
    }
}

pub(crate) struct TupleVariantBuilder<'a> {
    serializer: NodeSerializer<'a>,
    name: &'static str,
    variant: &'static str,
    items: SeqBuilder<'a>,
}

impl<'a> ser::SerializeTupleVariant for TupleVariantBuilder<'a> {
    type Ok = Node;
    type Error = DiffError;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), DiffError> {
        ser::SerializeSeq::serialize_element(&mut self.items, value)
    }

    fn end(self) -> Result<Node, DiffError> {
        let value = Node::Seq(self.items.items);
        Ok(self.serializer.finish_variant(self.name, self.variant, value))
    }
}

pub(crate) struct MapBuilder<'a> {
    serializer: NodeSerializer<'a>,
    entries: Vec<(String, Node)>,
    pending_key: Option<String>,
}

impl<'a> ser::SerializeMap for MapBuilder<'a> {
    type Ok = Node;
    type Error = DiffError;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), DiffError> {
        let key = key.serialize(self.serializer)?;
        self.pending_key = Some(key.render_inline());
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), DiffError> {
        let key = self
            .pending_key
            .take()
            .ok_or_else(|| DiffError::new("map value serialized before its key"))?;
        self.entries.push((key, value.serialize(self.serializer)?));
        Ok(())
    }

    fn end(mut self) -> Result<Node, DiffError> {
        self.entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(Node::Map(self.entries))
    }
}

pub(crate) struct StructBuilder<'a> {
    serializer: NodeSerializer<'a>,
    name: &'static str,
    fields: Vec<(String, Node)>,
}

impl<'a> ser::SerializeStruct for StructBuilder<'a> {
    type Ok = Node;
    type Error = DiffError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), DiffError> {
        self.fields
            .push((key.to_string(), value.serialize(self.serializer)?));
        Ok(())
    }

    fn end(self) -> Result<Node, DiffError> {
        Ok(self.serializer.finish_struct(self.name, self.fields))
    }
}

pub(crate) struct StructVariantBuilder<'a> {
    name: &'static str,
    variant: &'static str,
    fields: StructBuilder<'a>,
}

impl<'a> ser::SerializeStructVariant for StructVariantBuilder<'a> {
    type Ok = Node;
    type Error = DiffError;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), DiffError> {
        ser::SerializeStruct::serialize_field(&mut self.fields, key, value)
    }

    fn end(self) -> Result<Node, DiffError> {
        let StructBuilder {
            serializer,
            name,
            fields,
        } = self.fields;
        let value = serializer.filter_fields(name, fields);
        Ok(serializer.finish_variant(self.name, self.variant, value))
    }
}
