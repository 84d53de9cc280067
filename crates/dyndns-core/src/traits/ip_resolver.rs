// # IP Resolver Trait
//
// Defines the interface for determining the current public IP address in
// dynamic mode.
//
// ## Implementations
//
// - IP-echo over HTTP: `dyndns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use dyndns_core::IpResolver;
//
// let ip = resolver.resolve().await?;
// println!("public address: {}", ip);
// ```

use async_trait::async_trait;
use std::net::IpAddr;

/// Trait for IP resolver implementations
///
/// # Trust Level: Semi-Trusted
///
/// ## Allowed Capabilities
/// - ✅ One outbound request per `resolve()` call
/// - ✅ Parse and validate the returned address
///
/// ## Forbidden Capabilities
/// - ❌ Retry or sleep (the dispatcher owns retry timing)
/// - ❌ Cache addresses between calls (every cycle must see a fresh value)
/// - ❌ Access the record store or perform DNS updates
#[async_trait]
pub trait IpResolver: Send + Sync {
    /// Determine the current public IP address
    ///
    /// # Returns
    ///
    /// - `Ok(IpAddr)`: A valid IPv4 or IPv6 address
    /// - `Err(Error::IpResolution)`: Service unreachable or body not an IP
    async fn resolve(&self) -> Result<IpAddr, crate::Error>;

    /// Name of the resolver (for logging)
    fn resolver_name(&self) -> &'static str;
}
