// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Input fixtures shared by the integration tests.

#![allow(dead_code)]

use pod_installer::Validator;
use pod_installer::config::Thresholds;
use pod_installer_common::snapshot::{EnvFile, Netplan, Snapshots};
use serde_json::{json, Value};
use slog::{o, Logger};

pub fn test_log() -> Logger {
    Logger::root(slog::Discard, o!())
}

pub fn validator() -> Validator {
    Validator::standard(&test_log(), &Thresholds::default()).unwrap()
}

/// An instantiated `config.json` that satisfies every config check for a
/// `podnet-a` host of the given blend.
pub fn pod_config(blend: i64) -> Value {
    json!({
        "pod_number": 12,
        "pod_name": "cork",
        "blend": blend,
        "podnet_a_enabled": false,
        "podnet_b_enabled": false,
        "ipv4_link_subnet": "91.103.0.0/29",
        "ipv4_link_pe": "91.103.0.1",
        "ipv4_link_cpe": "91.103.0.2",
        "ipv6_link_subnet": "2a02:2078:9::/126",
        "ipv6_link_pe": "2a02:2078:9::1",
        "ipv6_link_cpe": "2a02:2078:9::2",
        "primary_ipv4_subnet": "91.103.1.0/24",
        "ipv6_subnet": "2a02:2078:10::/48",
        "podnet_a_public_ifname": "eno1",
        "podnet_a_mgmt_ifname": "eno2",
        "podnet_a_oob_ifname": "eno3",
        "podnet_a_private_ifname": "eno4",
        "podnet_a_inter_ifname": "eno5",
    })
}

/// A `.env` in which every variable is present and valid.
pub fn env() -> EnvFile {
    EnvFile::parse(
        r#"
# pod
POD_NUMBER=12
POD_NAME="cork"
POD_URL=https://cork.cloudcix.net
CLOUDCIX_VERSION=5.1.0
IPV6_SUBNET=2a02:2078:10::/48
PMS3=pms3.cork.cloudcix.net
PMS4=pms4.cork.cloudcix.net
PMS5=pms5.cork.cloudcix.net
PMS6=pms6.cork.cloudcix.net
DB_HOST=db
DB_USER=cloudcix
DB_PASSWORD="s3cret"
DB_PORT=5432
REQUEST_TIMEOUT=30
PAT_NAME=pat
PAT_URL=https://pat.cloudcix.net
PROJECT_NAME=cork
PGADMIN_EMAIL=admin@cloudcix.com
PGADMIN_PASSWORD=pgadmin
API_URL=https://api.cloudcix.net/
API_PASSWORD=api
API_KEY=0123456789abcdef
POD_KEY=fedcba9876543210
SQL_USER=sql
SQL_PASSWORD=sql
OTP_URL=https://otp.cloudcix.net
OTP_PASSWORD=otp
MAIL_DOMAIN=cloudcix.com
MAIL_PASSWORD=mail
ROBOT_URL=https://robot.cloudcix.net
ROBOT_PASSWORD=robot
ROBOT_KEY=robot-key
COP_NAME=cop
COP_URL=https://cop.cloudcix.net
LOKI_URL=https://loki.cloudcix.net:3100
LOKI_PASSWORD=loki
"#,
    )
}

pub fn netplan() -> Netplan {
    Netplan::from_yaml(
        "network:
  version: 2
  ethernets:
    eno1:
      set-name: public0
    eno2:
      set-name: mgmt0
    eno3:
      set-name: oob0
    eno4:
      set-name: private0
    eno5:
      set-name: inter0
",
    )
    .unwrap()
}

/// Snapshots of a fully configured host with no installation media.
pub fn snapshots(hostname: &str, blend: i64) -> Snapshots {
    let mut snapshots = Snapshots::default();
    snapshots.infra.hostname = hostname.to_string();
    snapshots.infra.netplan = netplan();
    snapshots.metadata.config = serde_json::from_value(pod_config(blend)).unwrap();
    snapshots.metadata.env = env();
    snapshots
}

/// The same host with the installation media inserted, carrying a copy of
/// the instantiated `config.json` with `podnet_b_enabled` set as given.
pub fn with_media(mut snapshots: Snapshots, podnet_b_enabled: bool) -> Snapshots {
    let mut config = Value::Object(snapshots.metadata.config.raw().clone());
    config["podnet_b_enabled"] = json!(podnet_b_enabled);
    snapshots.cidata.available = true;
    snapshots.cidata.config = serde_json::from_value(config).unwrap();
    snapshots.cidata.env = snapshots.metadata.env.clone();
    snapshots
}
