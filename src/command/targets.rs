//! Allow-list of device addresses commands may be sent to.

use std::net::{IpAddr, Ipv4Addr};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetAllowList {
    targets: Vec<String>,
}

impl TargetAllowList {
    pub fn new<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = Vec::new();
        for target in targets {
            let target = target.into().trim().to_string();
            if !target.is_empty() && !seen.contains(&target) {
                seen.push(target);
            }
        }
        Self { targets: seen }
    }

    pub fn contains(&self, target: &str) -> bool {
        self.targets.iter().any(|t| t == target)
    }

    /// Whether a token is shaped like a device address, allowed or not.
    pub fn looks_like_target(&self, token: &str) -> bool {
        self.contains(token) || token.parse::<IpAddr>().is_ok()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(String::as_str)
    }

    /// Human-readable range, e.g. `10.0.15.61 to 10.0.15.65`.
    ///
    /// Collapses to `first to last` only when the list is a gapless ascending
    /// run of IPv4 addresses inside one /24; otherwise lists every entry.
    pub fn describe(&self) -> String {
        match self.targets.as_slice() {
            [] => "(none configured)".to_string(),
            [only] => only.clone(),
            [first, .., last] if self.is_contiguous_v4_run() => format!("{first} to {last}"),
            all => all.join(", "),
        }
    }

    fn is_contiguous_v4_run(&self) -> bool {
        let parsed: Option<Vec<Ipv4Addr>> = self.targets.iter().map(|t| t.parse().ok()).collect();
        let Some(addrs) = parsed else {
            return false;
        };
        addrs.windows(2).all(|pair| {
            let (a, b) = (pair[0].octets(), pair[1].octets());
            a[..3] == b[..3] && a[3].checked_add(1) == Some(b[3])
        })
    }
}

impl Default for TargetAllowList {
    fn default() -> Self {
        Self::new((61..=65).map(|host| format!("10.0.15.{host}")))
    }
}
