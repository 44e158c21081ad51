//! Merging a source value tree over a destination tree

use crate::decoder::DecoderOptions;
use crate::shape::Shape;
use serde_yaml::{Mapping, Number, Value};
use tracing::trace;

/// Merge `source` over `destination` in place
///
/// Mappings merge key by key, `null` keeps what the destination holds and
/// anything else replaces it (coerced to the destination's kind when
/// `weakly_typed` is set). `shape` is the layout of `destination`: only
/// struct keys are matched loosely.
pub(crate) fn merge(
    destination: &mut Value,
    source: Value,
    shape: &Shape,
    options: &DecoderOptions,
) {
    match (destination, source) {
        (_, Value::Null) => {}
        (Value::Mapping(dest), Value::Mapping(src)) => merge_mappings(dest, src, shape, options),
        (Value::Tagged(dest), Value::Tagged(src)) if dest.tag == src.tag => {
            merge(&mut dest.value, src.value, shape.payload(), options)
        }
        (dest, src) => {
            let replacement = if options.weakly_typed {
                coerce(dest, src)
            } else {
                src
            };
            *dest = replacement;
        }
    }
}

fn merge_mappings(dest: &mut Mapping, src: Mapping, shape: &Shape, options: &DecoderOptions) {
    let normalize = options.normalize_keys && shape.is_struct();
    for (key, value) in src {
        let target = find_key(dest, &key, normalize).unwrap_or(key);
        match dest.get_mut(&target) {
            Some(existing) => merge(existing, value, shape.child(&target), options),
            None => {
                trace!("Adding key {:?}", target);
                dest.insert(target, value);
            }
        }
    }
}

/// Destination key matching `key`, exactly or after normalization
fn find_key(dest: &Mapping, key: &Value, normalize: bool) -> Option<Value> {
    if dest.contains_key(key) {
        return Some(key.clone());
    }
    if !normalize {
        return None;
    }
    let wanted = normalize_key(key.as_str()?);
    dest.iter()
        .map(|(existing, _)| existing)
        .find(|existing| {
            existing
                .as_str()
                .is_some_and(|name| normalize_key(name) == wanted)
        })
        .cloned()
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '-' && *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Convert `src` to the kind of `dest` when a lossless reading exists
fn coerce(dest: &Value, src: Value) -> Value {
    match (dest, src) {
        (Value::Number(_), Value::String(s)) => match parse_number(&s) {
            Some(n) => Value::Number(n),
            None => Value::String(s),
        },
        (Value::String(_), Value::Number(n)) => Value::String(n.to_string()),
        (Value::String(_), Value::Bool(b)) => Value::String(b.to_string()),
        (Value::Bool(_), Value::String(s)) => match parse_bool(&s) {
            Some(b) => Value::Bool(b),
            None => Value::String(s),
        },
        (Value::Bool(_), Value::Number(n)) => Value::Bool(n.as_f64().is_some_and(|f| f != 0.0)),
        (Value::Sequence(items), Value::Sequence(src)) => match items.first() {
            Some(model) => Value::Sequence(src.into_iter().map(|v| coerce(model, v)).collect()),
            None => Value::Sequence(src),
        },
        (Value::Sequence(items), src @ (Value::String(_) | Value::Number(_) | Value::Bool(_))) => {
            let item = match items.first() {
                Some(model) => coerce(model, src),
                None => src,
            };
            Value::Sequence(vec![item])
        }
        (_, src) => src,
    }
}

fn parse_number(s: &str) -> Option<Number> {
    let s = s.trim();
    if let Ok(i) = s.parse::<i64>() {
        return Some(i.into());
    }
    if let Ok(u) = s.parse::<u64>() {
        return Some(u.into());
    }
    s.parse::<f64>().ok().map(Number::from)
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use std::collections::BTreeMap;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    fn merged(dest: &str, src: &str, options: DecoderOptions) -> Value {
        let mut dest = yaml(dest);
        merge(&mut dest, yaml(src), &Shape::Opaque, &options);
        dest
    }

    fn merged_onto<T: Serialize>(dest: &T, src: &str, options: DecoderOptions) -> Value {
        let shape = Shape::of(dest).unwrap();
        let mut tree = serde_yaml::to_value(dest).unwrap();
        merge(&mut tree, yaml(src), &shape, &options);
        tree
    }

    #[derive(Serialize)]
    struct Listener {
        listen_addr: String,
        max_size: u32,
        interfaces: BTreeMap<String, u32>,
    }

    fn listener() -> Listener {
        Listener {
            listen_addr: "a".to_string(),
            max_size: 1,
            interfaces: [("eth_0".to_string(), 1)].into_iter().collect(),
        }
    }

    #[test]
    fn test_absent_keys_keep_defaults() {
        let result = merged(
            "level: info\nport: 8080",
            "level: debug",
            DecoderOptions::default(),
        );
        assert_eq!(result, yaml("level: debug\nport: 8080"));
    }

    #[test]
    fn test_null_keeps_destination() {
        let result = merged("port: 8080", "port: ~", DecoderOptions::default());
        assert_eq!(result, yaml("port: 8080"));
        assert_eq!(
            merged("port: 8080", "~", DecoderOptions::default()),
            yaml("port: 8080")
        );
    }

    #[test]
    fn test_nested_mappings_merge() {
        let result = merged(
            "http:\n  listen: 0.0.0.0:8080\n  profiler: false",
            "http:\n  profiler: true",
            DecoderOptions::default(),
        );
        assert_eq!(result, yaml("http:\n  listen: 0.0.0.0:8080\n  profiler: true"));
    }

    #[test]
    fn test_sequences_replace() {
        let result = merged("brokers: [a, b]", "brokers: [c]", DecoderOptions::default());
        assert_eq!(result, yaml("brokers: [c]"));
    }

    #[test]
    fn test_key_normalization() {
        let result = merged_onto(
            &listener(),
            "Listen-Addr: b\nmaxsize: 2",
            DecoderOptions::default(),
        );
        assert_eq!(result, yaml("listen_addr: b\nmax_size: 2\ninterfaces: {eth_0: 1}"));

        let strict = DecoderOptions {
            normalize_keys: false,
            ..DecoderOptions::default()
        };
        let result = merged_onto(&listener(), "listen-addr: b", strict);
        assert_eq!(
            result,
            yaml("listen_addr: a\nmax_size: 1\ninterfaces: {eth_0: 1}\nlisten-addr: b")
        );
    }

    #[test]
    fn test_map_keys_are_kept_as_written() {
        let result = merged_onto(
            &listener(),
            "interfaces: {eth-0: 2, ETH0: 3, eth_0: 4}",
            DecoderOptions::default(),
        );
        assert_eq!(result["interfaces"], yaml("{eth_0: 4, eth-0: 2, ETH0: 3}"));
    }

    #[test]
    fn test_untyped_mappings_match_keys_exactly() {
        let result = merged("listen_addr: a", "Listen-Addr: b", DecoderOptions::default());
        assert_eq!(result, yaml("listen_addr: a\nListen-Addr: b"));
    }

    #[test]
    fn test_weak_typing() {
        let options = DecoderOptions::default;
        assert_eq!(merged("port: 1", "port: '8080'", options()), yaml("port: 8080"));
        assert_eq!(merged("name: x", "name: 12", options()), yaml("name: '12'"));
        assert_eq!(merged("on: false", "on: 'yes'", options()), yaml("on: true"));
        assert_eq!(merged("on: true", "on: 0", options()), yaml("on: false"));
        assert_eq!(merged("tags: [a]", "tags: b", options()), yaml("tags: [b]"));
        assert_eq!(
            merged("ports: [1]", "ports: ['2', '3']", options()),
            yaml("ports: [2, 3]")
        );
    }

    #[test]
    fn test_strict_typing_keeps_source_kind() {
        let strict = DecoderOptions {
            weakly_typed: false,
            ..DecoderOptions::default()
        };
        assert_eq!(merged("port: 1", "port: '8080'", strict), yaml("port: '8080'"));
    }

    #[test]
    fn test_same_tag_merges_payload() {
        let result = merged(
            "!Kafka {topic: flows, brokers: [a]}",
            "!Kafka {topic: other}",
            DecoderOptions::default(),
        );
        assert_eq!(result, yaml("!Kafka {topic: other, brokers: [a]}"));

        let result = merged(
            "!Kafka {topic: flows}",
            "!File {path: /tmp/x}",
            DecoderOptions::default(),
        );
        assert_eq!(result, yaml("!File {path: /tmp/x}"));
    }
}
