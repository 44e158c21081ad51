//! Comparable value tree
//!
//! Every operand handed to the diff engine is first serialized into a
//! [`Node`]. Struct fields keep their declaration order, map entries are
//! sorted by their rendered key.

/// A serialized value, as seen by the diff engine
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Null,
    Bool(bool),
    Int(i128),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Seq(Vec<Node>),
    /// Entries keyed by their rendered key, sorted
    Map(Vec<(String, Node)>),
    /// Named struct (tuple structs use `"0"`, `"1"`, ... as field names)
    Struct {
        name: &'static str,
        fields: Vec<(String, Node)>,
    },
    /// Enum variant; unit variants carry [`Node::Null`]
    Variant {
        name: &'static str,
        variant: &'static str,
        value: Box<Node>,
    },
    /// Output of a registered formatter, compared as text; `zero` tells
    /// whether the formatted value was itself zero valued
    Formatted {
        name: &'static str,
        text: String,
        zero: bool,
    },
}

impl Node {
    /// Whether this value is the zero value of its kind
    pub fn is_zero(&self) -> bool {
        match self {
            Node::Null => true,
            Node::Bool(b) => !b,
            Node::Int(i) => *i == 0,
            Node::Float(f) => *f == 0.0,
            Node::Str(s) => s.is_empty(),
            Node::Bytes(b) => b.is_empty(),
            Node::Seq(items) => items.is_empty(),
            Node::Map(entries) => entries.is_empty(),
            Node::Struct { fields, .. } => fields.iter().all(|(_, node)| node.is_zero()),
            Node::Variant { .. } => false,
            Node::Formatted { zero, .. } => *zero,
        }
    }

    /// Look up a struct field by name
    pub fn field(&self, name: &str) -> Option<&Node> {
        match self {
            Node::Struct { fields, .. } => fields
                .iter()
                .find(|(field, _)| field == name)
                .map(|(_, node)| node),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i128> {
        match self {
            Node::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Structural equality, treating an integer and a float holding the same
    /// value as equal
    pub fn equivalent(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::Int(a), Node::Float(b)) | (Node::Float(b), Node::Int(a)) => {
                float_as_int(*b) == Some(*a)
            }
            (Node::Float(a), Node::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Node::Seq(a), Node::Seq(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.equivalent(y))
            }
            (Node::Map(a), Node::Map(b)) => entries_equivalent(a, b),
            (
                Node::Struct {
                    name: name_a,
                    fields: a,
                },
                Node::Struct {
                    name: name_b,
                    fields: b,
                },
            ) => name_a == name_b && entries_equivalent(a, b),
            (
                Node::Variant {
                    name: name_a,
                    variant: variant_a,
                    value: a,
                },
                Node::Variant {
                    name: name_b,
                    variant: variant_b,
                    value: b,
                },
            ) => name_a == name_b && variant_a == variant_b && a.equivalent(b),
            (Node::Formatted { text: a, .. }, Node::Formatted { text: b, .. }) => a == b,
            (a, b) => a == b,
        }
    }

    /// Single-line rendering
    pub fn render_inline(&self) -> String {
        match self {
            Node::Null => "null".to_string(),
            Node::Bool(b) => b.to_string(),
            Node::Int(i) => i.to_string(),
            Node::Float(f) => format!("{:?}", f),
            Node::Str(s) => format!("{:?}", s),
            Node::Bytes(b) => format!("b{:?}", String::from_utf8_lossy(b)),
            Node::Seq(items) => {
                let items: Vec<String> = items.iter().map(Node::render_inline).collect();
                format!("[{}]", items.join(", "))
            }
            Node::Map(entries) => format!("{{{}}}", render_entries_inline(entries)),
            Node::Struct { name, fields } => {
                format!("{}{{{}}}", name, render_entries_inline(fields))
            }
            Node::Variant { variant, value, .. } => match value.as_ref() {
                Node::Null => variant.to_string(),
                Node::Struct { fields, .. } => {
                    format!("{}{{{}}}", variant, render_entries_inline(fields))
                }
                other => format!("{}({})", variant, other.render_inline()),
            },
            Node::Formatted { text, .. } => text.clone(),
        }
    }

    /// Multi-line rendering, nested values indented by two spaces
    pub fn render_lines(&self) -> Vec<String> {
        match self {
            Node::Seq(items) if !items.is_empty() => {
                let mut out = vec!["[".to_string()];
                for item in items {
                    push_nested(&mut out, "", item.render_lines());
                }
                out.push("]".to_string());
                out
            }
            Node::Map(entries) if !entries.is_empty() => {
                let mut out = vec!["{".to_string()];
                for (key, node) in entries {
                    push_nested(&mut out, &format!("{}: ", key), node.render_lines());
                }
                out.push("}".to_string());
                out
            }
            Node::Struct { name, fields } if !fields.is_empty() => {
                let mut out = vec![format!("{}{{", name)];
                for (field, node) in fields {
                    push_nested(&mut out, &format!("{}: ", field), node.render_lines());
                }
                out.push("}".to_string());
                out
            }
            Node::Variant { variant, value, .. } => match value.as_ref() {
                Node::Null => vec![variant.to_string()],
                Node::Struct { .. } => value.render_lines(),
                other => {
                    let mut lines = other.render_lines();
                    if let Some(first) = lines.first_mut() {
                        *first = format!("{}({}", variant, first);
                    }
                    if let Some(last) = lines.last_mut() {
                        last.push(')');
                    }
                    lines
                }
            },
            _ => vec![self.render_inline()],
        }
    }
}

/// Exact integer value of `f`, if it has one within `i128`
fn float_as_int(f: f64) -> Option<i128> {
    // 2^127, exact in f64; `as` would saturate beyond it
    const BOUND: f64 = 170_141_183_460_469_231_731_687_303_715_884_105_728.0;
    (f.fract() == 0.0 && (-BOUND..BOUND).contains(&f)).then_some(f as i128)
}

fn entries_equivalent(a: &[(String, Node)], b: &[(String, Node)]) -> bool {
    a.len() == b.len()
        && a.iter().all(|(key, node)| {
            b.iter()
                .find(|(other, _)| other == key)
                .is_some_and(|(_, other)| node.equivalent(other))
        })
}

fn render_entries_inline(entries: &[(String, Node)]) -> String {
    entries
        .iter()
        .map(|(key, node)| format!("{}: {}", key, node.render_inline()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn push_nested(out: &mut Vec<String>, label: &str, lines: Vec<String>) {
    let count = lines.len();
    for (i, line) in lines.into_iter().enumerate() {
        let mut rendered = String::from("  ");
        if i == 0 {
            rendered.push_str(label);
        }
        rendered.push_str(&line);
        if i + 1 == count {
            rendered.push(',');
        }
        out.push(rendered);
    }
}
