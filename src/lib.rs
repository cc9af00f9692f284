//! Rack Netinfo: reports the network topology of the machine a MAAS rack
//! agent runs on.
//!
//! Each cycle probes the interfaces, routing table, DHCP leases and container
//! context of the local machine, reconciles them into a [`Topology`], and
//! publishes it as an interface update for the region controller.
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use collector::ResourceCollector;
use config::Config;
use environment::RuntimeContext;
use error::{Error, Result, ResultOkLogExt};
use identity::IdentityStore;
use lease::LeaseStore;
use rpc::{Publisher, RpcAdapter, StdoutPublisher};
use topology::Topology;

pub mod collector;
pub mod command;
pub mod config;
pub mod environment;
pub mod error;
pub mod fsutil;
pub mod identity;
pub mod lease;
pub mod rpc;
pub mod topology;

/// Collects every fact of one cycle concurrently and reconciles them.
///
/// # Errors
///
/// * [`Error::Cancelled`] if `token` fires before all facts are in.
/// * The first collection or reconciliation error otherwise.
pub async fn collect_topology(
    token: &CancellationToken,
    collector: &ResourceCollector,
    runtime: &RuntimeContext,
    leases: &LeaseStore,
) -> Result<Topology> {
    let gathered = async {
        tokio::try_join!(
            async { collector.collect(token).await.map_err(Error::from) },
            async { runtime.detect(token).await.map_err(Error::from) },
            async { leases.leases(token).await.map_err(Error::from) },
        )
    };

    let (facts, environment, leases) = tokio::select! {
        biased;
        _ = token.cancelled() => return Err(Error::Cancelled),
        res = gathered => res?,
    };
    log::debug!(
        "Collected {} interfaces, {} leases, running on {environment:?}",
        facts.interfaces.len(),
        leases.len()
    );

    Ok(topology::build_topology(&facts, &leases, environment)?)
}

/// Periodically collects the topology and publishes it when it changed.
pub struct Agent<P> {
    collector: ResourceCollector,
    runtime: RuntimeContext,
    leases: LeaseStore,
    identity: IdentityStore,
    publisher: P,
    last_published: Option<Vec<u8>>,
}

impl<P: Publisher> Agent<P> {
    pub fn new(
        collector: ResourceCollector,
        runtime: RuntimeContext,
        leases: LeaseStore,
        identity: IdentityStore,
        publisher: P,
    ) -> Self {
        Self {
            collector,
            runtime,
            leases,
            identity,
            publisher,
            last_published: None,
        }
    }

    pub fn from_config(config: &Config, publisher: P) -> Self {
        Self::new(
            ResourceCollector::from_config(config),
            RuntimeContext::new(config.command_timeout),
            LeaseStore::new(&config.proc_root),
            IdentityStore::new(config.paths.identity_file()),
            publisher,
        )
    }

    pub fn identity(&self) -> &IdentityStore {
        &self.identity
    }

    /// Runs one cycle. Returns whether an update was published.
    ///
    /// Nothing is published when the cycle fails or when the update is
    /// byte-identical to the last one published.
    ///
    /// # Errors
    ///
    /// Returns the error that failed the cycle.
    pub async fn cycle(&mut self, token: &CancellationToken) -> Result<bool> {
        let topology =
            collect_topology(token, &self.collector, &self.runtime, &self.leases).await?;
        let system_id = self.identity.get().ok_log().flatten();
        let message = RpcAdapter::to_message(topology, system_id.as_deref());

        let encoded = RpcAdapter::encode(&message);
        if self.last_published.as_deref() == Some(encoded.as_slice()) {
            log::trace!("Topology unchanged, not publishing");
            return Ok(false);
        }

        self.publisher.publish(&message).await?;
        log::info!("Published {} interfaces", message.interfaces.len());
        self.last_published = Some(encoded);
        Ok(true)
    }

    /// Runs cycles every `interval` until `token` is cancelled.
    ///
    /// A failed cycle is logged and the loop carries on with the next tick.
    pub async fn run(&mut self, token: &CancellationToken, interval: Duration) {
        let mut interval = tokio::time::interval(interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = interval.tick() => {}
            }
            match self.cycle(token).await {
                Ok(_) => {}
                Err(Error::Cancelled) => break,
                Err(err) => log::error!("Collection cycle failed: {err}"),
            }
        }
        log::debug!("Agent stopped");
    }
}

/// Runs the agent until interrupted.
///
/// # Errors
///
/// Returns an error if the configuration cannot be read from the environment.
pub async fn run() -> Result<()> {
    let config = Config::from_env()?;
    log::debug!("Configuration: {config:?}");

    let token = CancellationToken::new();
    {
        let token = token.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => log::info!("Interrupted, shutting down"),
                Err(err) => log::error!("failed to listen for interrupt: {err}"),
            }
            token.cancel();
        });
    }

    let mut agent = Agent::from_config(&config, StdoutPublisher::stdout());
    agent.run(&token, config.interval).await;
    Ok(())
}
