//! IP prefix to value tables
//!
//! IPv4 prefixes are stored IPv4-mapped (`192.0.2.0/24` is kept as
//! `::ffff:192.0.2.0/120`) so a single table answers lookups for both
//! address families.

use crate::error::ConfigError;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::net::{IpAddr, Ipv6Addr};
use std::str::FromStr;

/// A masked IPv6 (or IPv4-mapped) prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Prefix {
    addr: Ipv6Addr,
    len: u8,
}

impl Prefix {
    pub fn new(addr: IpAddr, len: u8) -> Result<Self, ConfigError> {
        let (addr, len, max) = match addr {
            IpAddr::V4(v4) => (v4.to_ipv6_mapped(), len.saturating_add(96), 32),
            IpAddr::V6(v6) => (v6, len, 128),
        };
        if len > 128 {
            return Err(ConfigError::InvalidPrefix {
                prefix: format!("{}/{}", addr, len),
                reason: format!("length must be at most {}", max),
            });
        }
        Ok(Self {
            addr: mask(addr, len),
            len,
        })
    }

    /// Prefix covering every address
    pub fn any() -> Self {
        Self {
            addr: Ipv6Addr::UNSPECIFIED,
            len: 0,
        }
    }

    pub fn length(&self) -> u8 {
        self.len
    }

    pub fn contains(&self, addr: IpAddr) -> bool {
        let addr = match addr {
            IpAddr::V4(v4) => v4.to_ipv6_mapped(),
            IpAddr::V6(v6) => v6,
        };
        mask(addr, self.len) == self.addr
    }

    /// Stored form, IPv4 prefixes included (`::ffff:192.0.2.0/120`)
    pub fn mapped_string(&self) -> String {
        format!("{}/{}", self.addr, self.len)
    }
}

fn mask(addr: Ipv6Addr, len: u8) -> Ipv6Addr {
    let bits = u128::from(addr);
    let masked = match len {
        0 => 0,
        len if len >= 128 => bits,
        len => bits & (u128::MAX << (128 - u32::from(len))),
    };
    Ipv6Addr::from(masked)
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.addr.to_ipv4_mapped() {
            Some(v4) if self.len >= 96 => write!(f, "{}/{}", v4, self.len - 96),
            _ => write!(f, "{}/{}", self.addr, self.len),
        }
    }
}

impl FromStr for Prefix {
    type Err = ConfigError;

    /// Parse `addr/len`, or a bare address as a full-length prefix
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ConfigError::InvalidPrefix {
            prefix: s.to_string(),
            reason: reason.to_string(),
        };
        let (addr, len) = match s.trim().split_once('/') {
            Some((addr, len)) => (addr, Some(len)),
            None => (s.trim(), None),
        };
        let addr: IpAddr = addr.parse().map_err(|_| invalid("not an IP address"))?;
        let len = match (len, addr) {
            (Some(len), _) => len.parse::<u8>().map_err(|_| invalid("bad prefix length"))?,
            (None, IpAddr::V4(_)) => 32,
            (None, IpAddr::V6(_)) => 128,
        };
        // An IPv6 spelling of an IPv4-mapped prefix is accepted as is
        Prefix::new(addr, len).map_err(|_| invalid("prefix length out of range"))
    }
}

/// Table mapping IP prefixes to values, answering longest-prefix lookups
#[derive(Debug, Clone, PartialEq)]
pub struct SubnetMap<V> {
    entries: BTreeMap<Prefix, V>,
}

impl<V> Default for SubnetMap<V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<V> SubnetMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with a single value applying to every address
    pub fn with_default(value: V) -> Self {
        let mut map = Self::new();
        map.insert(Prefix::any(), value);
        map
    }

    pub fn insert(&mut self, prefix: Prefix, value: V) -> Option<V> {
        self.entries.insert(prefix, value)
    }

    /// Value of the most specific prefix containing `addr`
    pub fn lookup(&self, addr: IpAddr) -> Option<&V> {
        self.entries
            .iter()
            .filter(|(prefix, _)| prefix.contains(addr))
            .max_by_key(|(prefix, _)| prefix.length())
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Prefix, &V)> {
        self.entries.iter()
    }
}

impl<V: Serialize> Serialize for SubnetMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let table: BTreeMap<String, &V> = self
            .entries
            .iter()
            .map(|(prefix, value)| (prefix.mapped_string(), value))
            .collect();
        serializer.serialize_newtype_struct("SubnetMap", &table)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Repr<V> {
    Table(IndexMap<String, V>),
    Single(V),
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for SubnetMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Table(table) => {
                let mut map = SubnetMap::new();
                for (prefix, value) in table {
                    let prefix = prefix.parse().map_err(serde::de::Error::custom)?;
                    map.insert(prefix, value);
                }
                Ok(map)
            }
            Repr::Single(value) => Ok(SubnetMap::with_default(value)),
        }
    }
}
