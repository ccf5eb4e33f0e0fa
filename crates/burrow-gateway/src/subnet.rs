use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use thiserror::Error;

/// A CIDR block, e.g. `192.168.0.0/16` or `fd00::/8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrustedSubnet {
    network: IpAddr,
    prefix_len: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid CIDR notation")]
pub struct InvalidSubnet;

impl FromStr for TrustedSubnet {
    type Err = InvalidSubnet;

    fn from_str(cidr: &str) -> Result<Self, Self::Err> {
        let (network, prefix_len) = cidr.trim().split_once('/').ok_or(InvalidSubnet)?;
        let network: IpAddr = network.parse().map_err(|_| InvalidSubnet)?;
        let prefix_len: u8 = prefix_len.parse().map_err(|_| InvalidSubnet)?;

        let max = match network {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        if prefix_len > max {
            return Err(InvalidSubnet);
        }

        Ok(Self {
            network,
            prefix_len,
        })
    }
}

impl TrustedSubnet {
    pub fn contains(&self, ip: &IpAddr) -> bool {
        let prefix_len = u32::from(self.prefix_len);

        match (ip, self.network) {
            (IpAddr::V4(ip), IpAddr::V4(net)) => {
                let mask = u32::MAX.checked_shl(32 - prefix_len).unwrap_or(0);
                let ip_bits = u32::from_be_bytes(ip.octets());
                let net_bits = u32::from_be_bytes(net.octets());
                (ip_bits & mask) == (net_bits & mask)
            }
            (IpAddr::V6(ip), IpAddr::V6(net)) => {
                let mask = u128::MAX.checked_shl(128 - prefix_len).unwrap_or(0);
                let ip_bits = u128::from_be_bytes(ip.octets());
                let net_bits = u128::from_be_bytes(net.octets());
                (ip_bits & mask) == (net_bits & mask)
            }
            _ => false,
        }
    }

    /// Parses `ip` and checks membership. Unparsable input is never trusted.
    pub fn contains_str(&self, ip: &str) -> bool {
        ip.trim()
            .parse::<IpAddr>()
            .is_ok_and(|ip| self.contains(&ip))
    }
}

impl fmt::Display for TrustedSubnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subnet(cidr: &str) -> TrustedSubnet {
        cidr.parse().unwrap()
    }

    #[test]
    fn ipv4_membership() {
        let net = subnet("192.168.1.0/24");
        assert!(net.contains_str("192.168.1.1"));
        assert!(net.contains_str("192.168.1.255"));
        assert!(!net.contains_str("192.168.2.1"));
        assert!(!net.contains_str("::1"));
    }

    #[test]
    fn ipv6_membership() {
        let net = subnet("fd00::/8");
        assert!(net.contains_str("fd12:3456::1"));
        assert!(!net.contains_str("fe80::1"));
    }

    #[test]
    fn zero_prefix_matches_everything_of_its_family() {
        let net = subnet("0.0.0.0/0");
        assert!(net.contains_str("8.8.8.8"));
        assert!(!net.contains_str("2001:db8::1"));
    }

    #[test]
    fn rejects_malformed_cidr() {
        for cidr in ["10.0.0.0", "10.0.0.0/33", "nope/8", "10.0.0.0/x", "::/129"] {
            assert_eq!(cidr.parse::<TrustedSubnet>(), Err(InvalidSubnet), "{cidr}");
        }
    }

    #[test]
    fn garbage_ip_is_not_trusted() {
        assert!(!subnet("10.0.0.0/8").contains_str("10.0.0"));
        assert!(!subnet("10.0.0.0/8").contains_str(""));
    }

    #[test]
    fn display_round_trips() {
        assert_eq!(subnet("10.1.0.0/16").to_string(), "10.1.0.0/16");
    }
}
