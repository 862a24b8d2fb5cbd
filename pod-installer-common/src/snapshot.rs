// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Read-only input documents captured once at the start of a run.
//!
//! Three sources feed the engine: the removable installation media
//! (CIDATA), the instantiated infrastructure (hostname and netplan), and the
//! instantiated metadata (pod `config.json` and docker `.env`). The pod
//! configuration is parsed into typed [`Field`]s here, once, so that checks
//! only ever see a value that is absent, invalid, or valid.

use ipnetwork::Ipv4Network;
use ipnetwork::Ipv6Network;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv4Addr;
use std::net::Ipv6Addr;
use std::str::FromStr;

/// One typed field of a configuration document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Field<T> {
    /// The key is not present.
    Absent,
    /// The key is present but its value does not parse; holds the raw
    /// value as text.
    Invalid(String),
    Valid(T),
}

impl<T> Field<T> {
    pub fn valid(&self) -> Option<&T> {
        match self {
            Field::Valid(value) => Some(value),
            Field::Absent | Field::Invalid(_) => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Field::Valid(_))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Field::Absent)
    }

    fn parse_with<F>(value: Option<&Value>, parse: F) -> Field<T>
    where
        F: FnOnce(&Value) -> Option<T>,
    {
        match value {
            None | Some(Value::Null) => Field::Absent,
            Some(value) => match parse(value) {
                Some(parsed) => Field::Valid(parsed),
                None => Field::Invalid(raw_text(value)),
            },
        }
    }
}

impl<T: fmt::Display> fmt::Display for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Absent => f.write_str("Not Found"),
            Field::Invalid(raw) => f.write_str(raw),
            Field::Valid(value) => value.fmt(f),
        }
    }
}

fn raw_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_string(value: &Value) -> Option<String> {
    value.as_str().map(str::to_owned)
}

fn parse_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A JSON integer; numeric strings are not accepted.
fn parse_number(value: &Value) -> Option<i64> {
    value.as_i64()
}

fn parse_bool(value: &Value) -> Option<bool> {
    value.as_bool()
}

fn parse_from_str<T: FromStr>(value: &Value) -> Option<T> {
    value.as_str().and_then(|s| s.trim().parse().ok())
}

// Networks must be written in canonical form: an explicit prefix and no host
// bits set.
fn parse_ipv4_network(value: &Value) -> Option<Ipv4Network> {
    let text = value.as_str()?.trim();
    if !text.contains('/') {
        return None;
    }
    let net: Ipv4Network = text.parse().ok()?;
    (net.ip() == net.network()).then_some(net)
}

fn parse_ipv6_network(value: &Value) -> Option<Ipv6Network> {
    let text = value.as_str()?.trim();
    if !text.contains('/') {
        return None;
    }
    let net: Ipv6Network = text.parse().ok()?;
    (net.ip() == net.network()).then_some(net)
}

/// A pod `config.json` document.
///
/// The raw object is retained for whole-document comparison and
/// persistence; the fields the checks read are parsed once on construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct PodConfig {
    raw: Map<String, Value>,
    pub pod_number: Field<i64>,
    pub pod_name: Field<String>,
    pub blend: Field<i64>,
    pub podnet_a_enabled: Field<bool>,
    pub podnet_b_enabled: Field<bool>,
    pub ipv4_link_subnet: Field<Ipv4Network>,
    pub ipv4_link_pe: Field<Ipv4Addr>,
    pub ipv4_link_cpe: Field<Ipv4Addr>,
    pub ipv6_link_subnet: Field<Ipv6Network>,
    pub ipv6_link_pe: Field<Ipv6Addr>,
    pub ipv6_link_cpe: Field<Ipv6Addr>,
    pub primary_ipv4_subnet: Field<Ipv4Network>,
    pub ipv6_subnet: Field<Ipv6Network>,
}

impl PodConfig {
    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.raw.get(key)
    }

    /// The interface name configured for `interface` on the node named
    /// `hostname`, from the `<hostname>_<interface>_ifname` key.
    pub fn ifname(&self, hostname: &str, interface: &str) -> Field<String> {
        let key = format!("{}_{}_ifname", hostname.replace('-', "_"), interface);
        Field::parse_with(self.raw.get(&key), parse_string)
    }
}

impl Default for PodConfig {
    fn default() -> Self {
        PodConfig::from(Map::new())
    }
}

impl From<Map<String, Value>> for PodConfig {
    fn from(raw: Map<String, Value>) -> Self {
        let get = |key: &str| raw.get(key);
        PodConfig {
            pod_number: Field::parse_with(get("pod_number"), parse_integer),
            pod_name: Field::parse_with(get("pod_name"), parse_string),
            blend: Field::parse_with(get("blend"), parse_number),
            podnet_a_enabled: Field::parse_with(
                get("podnet_a_enabled"),
                parse_bool,
            ),
            podnet_b_enabled: Field::parse_with(
                get("podnet_b_enabled"),
                parse_bool,
            ),
            ipv4_link_subnet: Field::parse_with(
                get("ipv4_link_subnet"),
                parse_ipv4_network,
            ),
            ipv4_link_pe: Field::parse_with(get("ipv4_link_pe"), parse_from_str),
            ipv4_link_cpe: Field::parse_with(
                get("ipv4_link_cpe"),
                parse_from_str,
            ),
            ipv6_link_subnet: Field::parse_with(
                get("ipv6_link_subnet"),
                parse_ipv6_network,
            ),
            ipv6_link_pe: Field::parse_with(get("ipv6_link_pe"), parse_from_str),
            ipv6_link_cpe: Field::parse_with(
                get("ipv6_link_cpe"),
                parse_from_str,
            ),
            primary_ipv4_subnet: Field::parse_with(
                get("primary_ipv4_subnet"),
                parse_ipv4_network,
            ),
            ipv6_subnet: Field::parse_with(
                get("ipv6_subnet"),
                parse_ipv6_network,
            ),
            raw,
        }
    }
}

impl From<PodConfig> for Map<String, Value> {
    fn from(config: PodConfig) -> Self {
        config.raw
    }
}

/// A dotenv-style file of `KEY=value` lines.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvFile(BTreeMap<String, String>);

impl EnvFile {
    /// Parses `KEY=value` lines. Blank lines and `#` comments are skipped,
    /// as are lines without an `=`; double quotes around the value are
    /// removed.
    pub fn parse(contents: &str) -> EnvFile {
        let vars = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| {
                (key.trim().to_string(), value.trim().replace('"', ""))
            })
            .collect();
        EnvFile(vars)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvFile {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        EnvFile(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// The installer netplan document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Netplan {
    #[serde(default)]
    pub network: NetplanNetwork,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NetplanNetwork {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(default)]
    pub ethernets: BTreeMap<String, NetplanEthernet>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NetplanEthernet {
    #[serde(
        rename = "match",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub match_rule: Option<NetplanMatch>,
    #[serde(
        rename = "set-name",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub set_name: Option<String>,
    #[serde(default)]
    pub addresses: Vec<String>,
    #[serde(default)]
    pub routes: Vec<NetplanRoute>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NetplanMatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub macaddress: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetplanRoute {
    pub to: String,
    pub via: String,
}

impl Netplan {
    pub fn from_yaml(contents: &str) -> Result<Netplan, serde_yaml::Error> {
        // An empty document deserializes as unit, not as an empty map.
        if contents.trim().is_empty() {
            return Ok(Netplan::default());
        }
        serde_yaml::from_str(contents)
    }

    /// Finds the physical interface that netplan renames to `set_name`.
    pub fn ethernet_renamed_to(&self, set_name: &str) -> Option<&str> {
        self.network
            .ethernets
            .iter()
            .find(|(_, eth)| eth.set_name.as_deref() == Some(set_name))
            .map(|(name, _)| name.as_str())
    }
}

/// Data supplied on the removable installation media.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CidataSnapshot {
    /// Whether the media could be mounted at all.
    pub available: bool,
    pub config: PodConfig,
    pub user_data: Value,
    pub env: EnvFile,
}

impl CidataSnapshot {
    pub fn unavailable() -> CidataSnapshot {
        CidataSnapshot::default()
    }
}

/// The instantiated infrastructure of this host.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InfraSnapshot {
    pub hostname: String,
    pub netplan: Netplan,
}

/// The instantiated pod metadata on this host.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataSnapshot {
    pub config: PodConfig,
    pub env: EnvFile,
}

/// All three input snapshots of one run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshots {
    pub cidata: CidataSnapshot,
    pub infra: InfraSnapshot,
    pub metadata: MetadataSnapshot,
}
