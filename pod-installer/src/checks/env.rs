// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Checks on the instantiated docker `.env`.
//!
//! Values are never echoed into verdicts since many of them are secrets.

use crate::registry::{CheckContext, CheckDefinition, Evaluation};
use ipnetwork::Ipv6Network;
use url::Url;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Rule {
    /// Present and non-empty.
    NonEmpty,
    Url,
    Email,
    Port,
    PositiveInteger,
    /// Equals `pod_number` in `config.json`.
    PodNumber,
    /// Equals `pod_name` in `config.json`.
    PodName,
    /// The same network as `ipv6_subnet` in `config.json`.
    Ipv6Subnet,
}

/// Variables in check order, starting at id 47.
const VARIABLES: [(&str, &str, Rule); 36] = [
    ("4.1.1", "POD_NUMBER", Rule::PodNumber),
    ("4.1.2", "POD_NAME", Rule::PodName),
    ("4.1.3", "POD_URL", Rule::Url),
    ("4.1.4", "CLOUDCIX_VERSION", Rule::NonEmpty),
    ("4.1.5", "IPV6_SUBNET", Rule::Ipv6Subnet),
    ("4.1.6", "PMS3", Rule::NonEmpty),
    ("4.1.7", "PMS4", Rule::NonEmpty),
    ("4.1.8", "PMS5", Rule::NonEmpty),
    ("4.1.9", "PMS6", Rule::NonEmpty),
    ("4.1.10", "DB_HOST", Rule::NonEmpty),
    ("4.1.11", "DB_USER", Rule::NonEmpty),
    ("4.1.12", "DB_PASSWORD", Rule::NonEmpty),
    ("4.1.13", "DB_PORT", Rule::Port),
    ("4.1.14", "REQUEST_TIMEOUT", Rule::PositiveInteger),
    ("4.1.15", "PAT_NAME", Rule::NonEmpty),
    ("4.1.16", "PAT_URL", Rule::Url),
    ("4.1.17", "PROJECT_NAME", Rule::NonEmpty),
    ("4.1.18", "PGADMIN_EMAIL", Rule::Email),
    ("4.1.19", "PGADMIN_PASSWORD", Rule::NonEmpty),
    ("4.1.20", "API_URL", Rule::Url),
    ("4.1.21", "API_PASSWORD", Rule::NonEmpty),
    ("4.1.22", "API_KEY", Rule::NonEmpty),
    ("4.1.23", "POD_KEY", Rule::NonEmpty),
    ("4.1.24", "SQL_USER", Rule::NonEmpty),
    ("4.1.25", "SQL_PASSWORD", Rule::NonEmpty),
    ("4.1.26", "OTP_URL", Rule::Url),
    ("4.1.27", "OTP_PASSWORD", Rule::NonEmpty),
    ("4.1.28", "MAIL_DOMAIN", Rule::NonEmpty),
    ("4.1.29", "MAIL_PASSWORD", Rule::NonEmpty),
    ("4.1.30", "ROBOT_URL", Rule::Url),
    ("4.1.31", "ROBOT_PASSWORD", Rule::NonEmpty),
    ("4.1.32", "ROBOT_KEY", Rule::NonEmpty),
    ("4.1.33", "COP_NAME", Rule::NonEmpty),
    ("4.1.34", "COP_URL", Rule::Url),
    ("4.1.35", "LOKI_URL", Rule::Url),
    ("4.1.36", "LOKI_PASSWORD", Rule::NonEmpty),
];

const FIRST_ID: u16 = 47;

/// An `http` or `https` URL with a non-empty host.
fn is_url(value: &str) -> bool {
    let Ok(url) = Url::parse(value) else {
        return false;
    };
    matches!(url.scheme(), "http" | "https")
        && url.host_str().is_some_and(|host| !host.is_empty())
}

fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.split('.').count() >= 2
        && domain.split('.').all(|part| !part.is_empty())
        && !value.chars().any(char::is_whitespace)
}

fn evaluate(cx: &CheckContext<'_>, key: &str, rule: Rule) -> Evaluation {
    let Some(value) = cx.snapshots.metadata.env.get(key) else {
        return Evaluation::unmet("Not Found");
    };
    if value.is_empty() {
        return Evaluation::unmet("Empty");
    }
    let config = &cx.snapshots.metadata.config;
    let (met, reason) = match rule {
        Rule::NonEmpty => (true, ""),
        Rule::Url => (is_url(value), "not a valid URL"),
        Rule::Email => (is_email(value), "not a valid email address"),
        Rule::Port => (
            value.parse::<u16>().is_ok_and(|port| port != 0),
            "not a valid port",
        ),
        Rule::PositiveInteger => (
            value.parse::<u64>().is_ok_and(|n| n > 0),
            "not a positive integer",
        ),
        Rule::PodNumber => (
            config
                .pod_number
                .valid()
                .is_some_and(|n| value.parse::<i64>().ok() == Some(*n)),
            "does not match config.json `pod_number`",
        ),
        Rule::PodName => (
            config.pod_name.valid().is_some_and(|name| name == value),
            "does not match config.json `pod_name`",
        ),
        Rule::Ipv6Subnet => (
            config.ipv6_subnet.valid().is_some_and(|subnet| {
                value.parse::<Ipv6Network>().ok().as_ref() == Some(subnet)
            }),
            "does not match config.json `ipv6_subnet`",
        ),
    };
    if met {
        Evaluation::met("Valid")
    } else {
        Evaluation::unmet(reason)
    }
}

pub(super) fn checks() -> Vec<CheckDefinition> {
    VARIABLES
        .iter()
        .zip(FIRST_ID..)
        .map(|(&(code, key, rule), id)| {
            CheckDefinition::new(
                id,
                code,
                format!("Instantiated .env `{key}`"),
                move |cx| evaluate(cx, key, rule),
            )
        })
        .collect()
}
