use std::net::IpAddr;
use std::str::FromStr;

use ipnetwork::IpNetwork;

use super::{Error, Result};
use crate::collector::{AddressFamily, RouteTable};

/// Longest-prefix-match index over the subnets seen in the routing table.
///
/// Each family's subnets are kept sorted by prefix length, longest first, so
/// the first containing entry found by a linear scan is the most specific one.
/// Host routes, `default` and other zero-length prefixes never enter the index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubnetIndex {
    v4: Vec<IpNetwork>,
    v6: Vec<IpNetwork>,
}

impl SubnetIndex {
    /// Builds the index from both families of `routes`.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidRouteDestination`] if a destination is not a valid CIDR.
    /// * [`Error::RouteFamilyMismatch`] if a destination is listed under the wrong family.
    pub fn from_routes(routes: &RouteTable) -> Result<Self> {
        let mut networks = Vec::new();
        for family in [AddressFamily::V4, AddressFamily::V6] {
            for dst in routes.routes(family).keys() {
                if dst == "default" || !dst.contains('/') {
                    continue;
                }
                let net = IpNetwork::from_str(dst).map_err(|source| {
                    Error::InvalidRouteDestination {
                        family,
                        dst: dst.clone(),
                        source,
                    }
                })?;
                if AddressFamily::of(&net.ip()) != family {
                    return Err(Error::RouteFamilyMismatch {
                        family,
                        dst: dst.clone(),
                    });
                }
                networks.push(net);
            }
        }
        Ok(Self::from_networks(networks))
    }

    /// Builds the index from arbitrary networks, dropping host-exact and zero-length ones.
    pub fn from_networks(networks: impl IntoIterator<Item = IpNetwork>) -> Self {
        let mut index = Self::default();
        for net in networks {
            let family = AddressFamily::of(&net.ip());
            if net.prefix() == 0 || net.prefix() == family.host_prefix() {
                continue;
            }
            let Ok(net) = IpNetwork::new(net.network(), net.prefix()) else {
                continue;
            };
            index.subnets_mut(family).push(net);
        }
        for subnets in [&mut index.v4, &mut index.v6] {
            subnets.sort_by(|a, b| b.prefix().cmp(&a.prefix()).then(a.ip().cmp(&b.ip())));
            subnets.dedup();
        }
        index
    }

    fn subnets_mut(&mut self, family: AddressFamily) -> &mut Vec<IpNetwork> {
        match family {
            AddressFamily::V4 => &mut self.v4,
            AddressFamily::V6 => &mut self.v6,
        }
    }

    /// Subnets of one family, most specific first.
    pub fn subnets(&self, family: AddressFamily) -> &[IpNetwork] {
        match family {
            AddressFamily::V4 => &self.v4,
            AddressFamily::V6 => &self.v6,
        }
    }

    /// Returns the most specific subnet containing `ip`.
    pub fn lookup(&self, ip: IpAddr) -> Option<&IpNetwork> {
        self.subnets(AddressFamily::of(&ip))
            .iter()
            .find(|net| net.contains(ip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::Route;

    fn net(s: &str) -> IpNetwork {
        s.parse().unwrap()
    }

    fn route(dst: &str) -> Route {
        Route {
            dst: dst.to_owned(),
            gateway: None,
            dev: Some("eth0".to_owned()),
            protocol: Some("kernel".to_owned()),
            metric: None,
            flags: Vec::new(),
        }
    }

    #[test]
    fn test_longest_prefix_wins() {
        let index = SubnetIndex::from_networks([net("10.0.0.0/16"), net("10.0.0.0/24")]);
        let found = index.lookup("10.0.0.5".parse().unwrap()).unwrap();
        assert_eq!(*found, net("10.0.0.0/24"));

        let found = index.lookup("10.0.7.5".parse().unwrap()).unwrap();
        assert_eq!(*found, net("10.0.0.0/16"));
    }

    #[test]
    fn test_order_does_not_depend_on_input_order() {
        let a = SubnetIndex::from_networks([net("10.0.0.0/24"), net("10.0.0.0/16")]);
        let b = SubnetIndex::from_networks([net("10.0.0.0/16"), net("10.0.0.0/24")]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_host_routes_are_not_indexed() {
        let index = SubnetIndex::from_networks([net("10.0.0.5/32"), net("2001:db8::1/128")]);
        assert!(index.subnets(AddressFamily::V4).is_empty());
        assert!(index.subnets(AddressFamily::V6).is_empty());
    }

    #[test]
    fn test_zero_length_routes_are_not_indexed() {
        let index = SubnetIndex::from_networks([net("0.0.0.0/0"), net("::/0")]);
        assert_eq!(index.lookup("10.0.0.5".parse().unwrap()), None);
        assert_eq!(index.lookup("2001:db8::5".parse().unwrap()), None);
    }

    #[test]
    fn test_families_are_separate() {
        let index = SubnetIndex::from_networks([net("2001:db8::/64"), net("10.0.0.0/8")]);
        assert_eq!(
            index.lookup("2001:db8::5".parse().unwrap()),
            Some(&net("2001:db8::/64"))
        );
        assert_eq!(index.lookup("192.168.0.1".parse().unwrap()), None);
    }

    #[test]
    fn test_from_routes() {
        let routes = RouteTable::new(
            vec![route("default"), route("10.0.0.0/24"), route("10.0.0.9")],
            vec![route("2001:db8::/64"), route("default")],
        );
        let index = SubnetIndex::from_routes(&routes).unwrap();
        assert_eq!(index.subnets(AddressFamily::V4), &[net("10.0.0.0/24")]);
        assert_eq!(index.subnets(AddressFamily::V6), &[net("2001:db8::/64")]);
    }

    #[test]
    fn test_from_routes_rejects_garbage() {
        let routes = RouteTable::new(vec![route("10.0.0.0/99")], Vec::new());
        assert!(matches!(
            SubnetIndex::from_routes(&routes),
            Err(Error::InvalidRouteDestination { .. })
        ));

        let routes = RouteTable::new(vec![route("2001:db8::/64")], Vec::new());
        assert!(matches!(
            SubnetIndex::from_routes(&routes),
            Err(Error::RouteFamilyMismatch { .. })
        ));
    }
}
