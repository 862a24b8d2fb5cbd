// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Checks on the instantiated pod `config.json`.
//!
//! Malformed values never abort a check: a missing or unparsable field takes
//! a default that fails validation. Link subnets used for containment fall
//! back to `0.0.0.0/29` and `::/126`.

use crate::registry::{CheckContext, CheckDefinition, Evaluation};
use ipnetwork::{Ipv4Network, Ipv6Network};
use pod_installer_common::host_status::Blend;
use pod_installer_common::snapshot::{Field, PodConfig};
use serde_json::Value;
use std::fmt::Display;
use std::net::{Ipv4Addr, Ipv6Addr};

const IPV4_LINK_MAX_PREFIX: u8 = 29;
const IPV6_LINK_MAX_PREFIX: u8 = 126;
const PRIMARY_IPV4_MAX_PREFIX: u8 = 29;
const IPV6_SUBNET_MAX_PREFIX: u8 = 48;

fn ipv4_link_fallback() -> Ipv4Network {
    Ipv4Network::new(Ipv4Addr::UNSPECIFIED, IPV4_LINK_MAX_PREFIX)
        .expect("constant prefix is valid")
}

fn ipv6_link_fallback() -> Ipv6Network {
    Ipv6Network::new(Ipv6Addr::UNSPECIFIED, IPV6_LINK_MAX_PREFIX)
        .expect("constant prefix is valid")
}

fn config<'a>(cx: &'a CheckContext<'_>) -> &'a PodConfig {
    &cx.snapshots.metadata.config
}

fn title(field: &str) -> String {
    format!("Instantiated config.json `{field}`")
}

fn validity<T: Display>(field: &Field<T>) -> Evaluation {
    match field {
        Field::Valid(value) => Evaluation::met(format!("{value} is valid")),
        Field::Invalid(raw) => Evaluation::unmet(format!("{raw} is invalid")),
        Field::Absent => Evaluation::unmet("Not Found"),
    }
}

fn max_prefix<T: Display>(
    field: &Field<T>,
    prefix: impl Fn(&T) -> u8,
    max: u8,
) -> Evaluation {
    match field {
        Field::Valid(net) => {
            let len = prefix(net);
            Evaluation::new(
                len <= max,
                format!("{net} is /{len}, at most /{max} required"),
            )
        }
        Field::Invalid(_) | Field::Absent => validity(field),
    }
}

fn within<A, N>(addr: &Field<A>, subnet: &Field<N>, fallback: N) -> Evaluation
where
    A: Display,
    N: Display + Contains<A>,
{
    let subnet = subnet.valid().unwrap_or(&fallback);
    match addr {
        Field::Valid(addr) if subnet.contains_addr(addr) => {
            Evaluation::met(format!("{addr} is within {subnet}"))
        }
        Field::Valid(addr) => {
            Evaluation::unmet(format!("{addr} is not within {subnet}"))
        }
        Field::Invalid(_) | Field::Absent => validity(addr),
    }
}

fn distinct<A: Display + PartialEq>(pe: &Field<A>, cpe: &Field<A>) -> Evaluation {
    match (pe, cpe) {
        (Field::Valid(pe), Field::Valid(cpe)) if pe != cpe => {
            Evaluation::met(format!("PE {pe} and CPE {cpe} differ"))
        }
        (Field::Valid(pe), Field::Valid(_)) => {
            Evaluation::unmet(format!("PE and CPE are both {pe}"))
        }
        _ => Evaluation::unmet("PE or CPE is not a valid address"),
    }
}

trait Contains<A> {
    fn contains_addr(&self, addr: &A) -> bool;
}

impl Contains<Ipv4Addr> for Ipv4Network {
    fn contains_addr(&self, addr: &Ipv4Addr) -> bool {
        self.contains(*addr)
    }
}

impl Contains<Ipv6Addr> for Ipv6Network {
    fn contains_addr(&self, addr: &Ipv6Addr) -> bool {
        self.contains(*addr)
    }
}

fn enabled_flag(field: &Field<bool>) -> bool {
    // A flag that is missing or not a boolean counts as enabled.
    !matches!(field, Field::Valid(false))
}

/// Whether `key` is literally `true`; a missing key counts as `true`.
fn declared_true(config: &PodConfig, key: &str) -> bool {
    match config.get(key) {
        None => true,
        Some(value) => *value == Value::Bool(true),
    }
}

fn general_checks() -> Vec<CheckDefinition> {
    vec![
        CheckDefinition::new(
            20,
            "3.1.1",
            "Instantiated and CIDATA config.json",
            |cx| {
                let cidata = &cx.snapshots.cidata;
                if !cidata.available {
                    Evaluation::unmet("CIDATA not available")
                } else if cidata.config.raw() == config(cx).raw() {
                    Evaluation::met("match")
                } else {
                    Evaluation::unmet("not a match")
                }
            },
        ),
        CheckDefinition::new(21, "3.2.1", title("pod_number"), |cx| {
            let number = config(cx).pod_number.valid().copied().unwrap_or(-1);
            if (0..255).contains(&number) {
                Evaluation::met(format!("{number} in range"))
            } else {
                Evaluation::unmet(format!("{number} not in range"))
            }
        }),
        CheckDefinition::new(22, "3.2.2", title("pod_name"), |cx| {
            let name = config(cx).pod_name.valid().cloned().unwrap_or_default();
            Evaluation::new(!name.trim().is_empty(), format!("Pod Name = {name:?}"))
        }),
        CheckDefinition::new(23, "3.2.3", title("blend"), |cx| {
            let blend = config(cx).blend.valid().copied().unwrap_or(0);
            match Blend::from_code(blend) {
                Some(b) => Evaluation::met(format!("Valid ({b})")),
                None => Evaluation::unmet(format!("Invalid ({blend})")),
            }
        }),
        CheckDefinition::new(24, "3.2.4", title("podnet_a_enabled"), |cx| {
            if enabled_flag(&config(cx).podnet_a_enabled) {
                Evaluation::unmet("is True")
            } else {
                Evaluation::met("is False")
            }
        }),
        CheckDefinition::new(25, "3.2.5", title("podnet_a_enabled"), |cx| {
            boolean(&config(cx).podnet_a_enabled)
        }),
        CheckDefinition::new(26, "3.2.6", title("podnet_b_enabled"), |cx| {
            if enabled_flag(&config(cx).podnet_b_enabled) {
                Evaluation::unmet("is True")
            } else {
                Evaluation::met("is False")
            }
        }),
        CheckDefinition::new(27, "3.2.7", title("podnet_b_enabled"), |cx| {
            boolean(&config(cx).podnet_b_enabled)
        }),
        CheckDefinition::new(
            28,
            "3.2.8",
            "Instantiated config.json `podnet_a_enabled` and `podnet_b_enabled`",
            |cx| {
                let config = config(cx);
                if declared_true(config, "podnet_a_enabled")
                    && declared_true(config, "podnet_b_enabled")
                {
                    Evaluation::unmet("both are True")
                } else {
                    Evaluation::met("both are not True")
                }
            },
        ),
    ]
}

fn boolean(field: &Field<bool>) -> Evaluation {
    match field {
        Field::Valid(_) => Evaluation::met("Boolean"),
        Field::Invalid(raw) => Evaluation::unmet(format!("{raw} is not Boolean")),
        Field::Absent => Evaluation::unmet("Not Found"),
    }
}

fn ipv4_link_checks() -> Vec<CheckDefinition> {
    vec![
        CheckDefinition::new(29, "3.3.1", title("ipv4_link_subnet"), |cx| {
            validity(&config(cx).ipv4_link_subnet)
        }),
        CheckDefinition::new(30, "3.3.2", title("ipv4_link_subnet"), |cx| {
            max_prefix(
                &config(cx).ipv4_link_subnet,
                |net| net.prefix(),
                IPV4_LINK_MAX_PREFIX,
            )
        }),
        CheckDefinition::new(31, "3.3.3", title("ipv4_link_cpe"), |cx| {
            validity(&config(cx).ipv4_link_cpe)
        }),
        CheckDefinition::new(32, "3.3.4", title("ipv4_link_cpe"), |cx| {
            let config = config(cx);
            within(
                &config.ipv4_link_cpe,
                &config.ipv4_link_subnet,
                ipv4_link_fallback(),
            )
        }),
        CheckDefinition::new(33, "3.3.5", title("ipv4_link_pe"), |cx| {
            validity(&config(cx).ipv4_link_pe)
        }),
        CheckDefinition::new(34, "3.3.6", title("ipv4_link_pe"), |cx| {
            let config = config(cx);
            within(
                &config.ipv4_link_pe,
                &config.ipv4_link_subnet,
                ipv4_link_fallback(),
            )
        }),
        CheckDefinition::new(
            35,
            "3.3.7",
            "Instantiated config.json `ipv4_link_pe` and `ipv4_link_cpe`",
            |cx| {
                let config = config(cx);
                distinct(&config.ipv4_link_pe, &config.ipv4_link_cpe)
            },
        ),
    ]
}

fn ipv6_link_checks() -> Vec<CheckDefinition> {
    vec![
        CheckDefinition::new(36, "3.4.1", title("ipv6_link_subnet"), |cx| {
            validity(&config(cx).ipv6_link_subnet)
        }),
        CheckDefinition::new(37, "3.4.2", title("ipv6_link_subnet"), |cx| {
            max_prefix(
                &config(cx).ipv6_link_subnet,
                |net| net.prefix(),
                IPV6_LINK_MAX_PREFIX,
            )
        }),
        CheckDefinition::new(38, "3.4.3", title("ipv6_link_cpe"), |cx| {
            validity(&config(cx).ipv6_link_cpe)
        }),
        CheckDefinition::new(39, "3.4.4", title("ipv6_link_cpe"), |cx| {
            let config = config(cx);
            within(
                &config.ipv6_link_cpe,
                &config.ipv6_link_subnet,
                ipv6_link_fallback(),
            )
        }),
        CheckDefinition::new(40, "3.4.5", title("ipv6_link_pe"), |cx| {
            validity(&config(cx).ipv6_link_pe)
        }),
        CheckDefinition::new(41, "3.4.6", title("ipv6_link_pe"), |cx| {
            let config = config(cx);
            within(
                &config.ipv6_link_pe,
                &config.ipv6_link_subnet,
                ipv6_link_fallback(),
            )
        }),
        CheckDefinition::new(
            42,
            "3.4.7",
            "Instantiated config.json `ipv6_link_pe` and `ipv6_link_cpe`",
            |cx| {
                let config = config(cx);
                distinct(&config.ipv6_link_pe, &config.ipv6_link_cpe)
            },
        ),
    ]
}

fn subnet_checks() -> Vec<CheckDefinition> {
    vec![
        CheckDefinition::new(43, "3.5.1", title("primary_ipv4_subnet"), |cx| {
            validity(&config(cx).primary_ipv4_subnet)
        }),
        CheckDefinition::new(44, "3.5.2", title("primary_ipv4_subnet"), |cx| {
            max_prefix(
                &config(cx).primary_ipv4_subnet,
                |net| net.prefix(),
                PRIMARY_IPV4_MAX_PREFIX,
            )
        }),
        CheckDefinition::new(45, "3.5.3", title("ipv6_subnet"), |cx| {
            validity(&config(cx).ipv6_subnet)
        }),
        CheckDefinition::new(46, "3.5.4", title("ipv6_subnet"), |cx| {
            max_prefix(
                &config(cx).ipv6_subnet,
                |net| net.prefix(),
                IPV6_SUBNET_MAX_PREFIX,
            )
        }),
    ]
}

pub(super) fn checks() -> Vec<CheckDefinition> {
    let mut checks = general_checks();
    checks.extend(ipv4_link_checks());
    checks.extend(ipv6_link_checks());
    checks.extend(subnet_checks());
    checks
}
