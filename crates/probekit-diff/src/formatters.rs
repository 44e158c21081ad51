//! Formatters registered by default
//!
//! These types serialize an internal representation that is not
//! meaningful to compare field by field. Network addresses and `chrono`
//! timestamps already serialize to their canonical string and need none.

use crate::node::Node;
use crate::options::Formatter;
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashMap;
use std::net::Ipv6Addr;
use std::sync::Arc;
use std::time::Duration;

pub(crate) fn defaults() -> HashMap<&'static str, Formatter> {
    let mut formatters: HashMap<&'static str, Formatter> = HashMap::new();
    formatters.insert("SystemTime", Arc::new(system_time));
    formatters.insert("Duration", Arc::new(duration));
    formatters.insert("SubnetMap", Arc::new(subnet_map));
    formatters
}

/// `std::time::SystemTime` as RFC 3339
fn system_time(node: &Node) -> String {
    let secs = node
        .field("secs_since_epoch")
        .and_then(Node::as_int)
        .and_then(|s| i64::try_from(s).ok());
    let nanos = node
        .field("nanos_since_epoch")
        .and_then(Node::as_int)
        .and_then(|n| u32::try_from(n).ok());
    secs.zip(nanos)
        .and_then(|(secs, nanos)| DateTime::<Utc>::from_timestamp(secs, nanos))
        .map(|time| time.to_rfc3339_opts(SecondsFormat::AutoSi, true))
        .unwrap_or_else(|| node.render_inline())
}

/// `std::time::Duration` as `1.5s`
fn duration(node: &Node) -> String {
    let secs = node
        .field("secs")
        .and_then(Node::as_int)
        .and_then(|s| u64::try_from(s).ok());
    let nanos = node
        .field("nanos")
        .and_then(Node::as_int)
        .and_then(|n| u32::try_from(n).ok());
    match secs.zip(nanos) {
        Some((secs, nanos)) => format!("{:?}", Duration::new(secs, nanos)),
        None => node.render_inline(),
    }
}

/// Subnet table keyed by IPv4-mapped prefixes, shown with IPv4 prefixes
/// in their usual notation
fn subnet_map(node: &Node) -> String {
    let Node::Map(entries) = node else {
        return node.render_inline();
    };
    let entries: Vec<String> = entries
        .iter()
        .map(|(key, value)| format!("{}: {}", canonical_prefix(key), value.render_inline()))
        .collect();
    format!("SubnetMap{{{}}}", entries.join(", "))
}

fn canonical_prefix(key: &str) -> String {
    let prefix = key.trim_matches('"');
    let Some((addr, len)) = prefix.split_once('/') else {
        return prefix.to_string();
    };
    match (addr.parse::<Ipv6Addr>(), len.parse::<u8>()) {
        (Ok(addr), Ok(len)) if len >= 96 => match addr.to_ipv4_mapped() {
            Some(v4) => format!("{}/{}", v4, len - 96),
            None => prefix.to_string(),
        },
        _ => prefix.to_string(),
    }
}
