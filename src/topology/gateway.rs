use std::net::IpAddr;

use super::Result;
use super::model::IpLink;
use crate::collector::RouteTable;

/// Attaches gateways to links using the routing table.
///
/// A route whose destination is exactly the link's subnet supplies its
/// gateway first. Failing that, the default route of the link's family is
/// used when its gateway lies inside the link's subnet. No other source is
/// consulted.
#[derive(Debug, Clone, Copy)]
pub struct GatewayResolver<'a> {
    routes: &'a RouteTable,
}

impl<'a> GatewayResolver<'a> {
    pub fn new(routes: &'a RouteTable) -> Self {
        Self { routes }
    }

    /// Returns the gateway for `link`, if the routing table yields one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNetwork`](super::Error::InvalidNetwork) if the
    /// link's subnet cannot be formed.
    pub fn resolve(&self, link: &IpLink) -> Result<Option<IpAddr>> {
        let family = link.family();
        let subnet = link.network()?;

        let key = subnet.to_string();
        let exact = self.routes.get(family, &key).or_else(|| {
            // `ip route` prints host routes without their `/32` or `/128`.
            (subnet.prefix() == family.host_prefix())
                .then(|| self.routes.get(family, &subnet.ip().to_string()))
                .flatten()
        });
        if let Some(gateway) = exact.and_then(|route| route.gateway) {
            log::trace!("{}: gateway {gateway} from route to {key}", link.address());
            return Ok(Some(gateway));
        }

        Ok(self
            .routes
            .default_route(family)
            .and_then(|route| route.gateway)
            .filter(|gateway| subnet.contains(*gateway)))
    }

    /// Resolves and stores the gateway of every link.
    ///
    /// # Errors
    ///
    /// Fails on the first link whose subnet cannot be formed.
    pub fn apply(&self, links: &mut [IpLink]) -> Result<()> {
        for link in links {
            link.gateway = self.resolve(link)?;
        }
        Ok(())
    }
}
