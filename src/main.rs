/// Entry point for the rack network reporter.
///
/// Collects the local machine's interfaces, routes and DHCP leases every
/// `MAAS_NETINFO_INTERVAL` seconds and writes each changed topology to stdout
/// as one JSON line.
///
/// # Examples
///
/// ```bash
/// RUST_LOG=debug MAAS_NETINFO_INTERVAL=10 cargo run
/// ```
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    rack_netinfo::run().await?;
    Ok(())
}
