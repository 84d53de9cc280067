// # DNS Updater Trait
//
// Defines the interface for pushing an address to the DNS provider.
//
// ## Implementations
//
// - Strato dyndns2 endpoint: `dyndns-provider-strato` crate
//
// ## Usage
//
// ```rust,ignore
// use dyndns_core::traits::UpdateRequest;
//
// let request = UpdateRequest::new("home.example.com", "secret", ip);
// let outcome = updater.update(&request).await?;
// ```

use async_trait::async_trait;
use std::fmt;
use std::net::IpAddr;

/// Parameters of one update call
///
/// By convention the username equals the hostname.
#[derive(Clone, PartialEq, Eq)]
pub struct UpdateRequest<'a> {
    pub hostname: &'a str,
    pub username: &'a str,
    pub password: &'a str,
    pub ip: IpAddr,
}

impl<'a> UpdateRequest<'a> {
    pub fn new(hostname: &'a str, password: &'a str, ip: IpAddr) -> Self {
        Self {
            hostname,
            username: hostname,
            password,
            ip,
        }
    }
}

// Custom Debug implementation that hides the password
impl fmt::Debug for UpdateRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateRequest")
            .field("hostname", &self.hostname)
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .field("ip", &self.ip)
            .finish()
    }
}

/// Successful provider response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The provider accepted the new address (`good`)
    Good,
    /// The provider already had this address (`nochg`)
    NoChange,
}

/// Trait for DNS updater implementations
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Exactly one HTTP request per `update()` call
/// - ✅ Interpret the provider response
///
/// ## Forbidden Capabilities
/// - ❌ Retry logic or backoff (owned by the dispatcher)
/// - ❌ Deciding whether an update is needed (owned by the engine)
/// - ❌ Logging the password
#[async_trait]
pub trait DnsUpdater: Send + Sync {
    /// Push `request.ip` for `request.hostname`
    ///
    /// # Returns
    ///
    /// - `Ok(UpdateOutcome)`: The response body carried `good` or `nochg`
    /// - `Err(Error::Update)`: Any other body, carrying the raw response
    /// - `Err(Error::Http)`: Transport failure
    async fn update(&self, request: &UpdateRequest<'_>) -> Result<UpdateOutcome, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_defaults_to_hostname() {
        let ip: IpAddr = "1.2.3.4".parse().unwrap();
        let request = UpdateRequest::new("home.example.com", "pw", ip);
        assert_eq!(request.username, "home.example.com");
    }

    #[test]
    fn test_password_not_exposed_in_debug() {
        let ip: IpAddr = "1.2.3.4".parse().unwrap();
        let request = UpdateRequest::new("home.example.com", "secret_pw_123", ip);
        let debug = format!("{:?}", request);
        assert!(!debug.contains("secret_pw_123"));
        assert!(debug.contains("home.example.com"));
    }
}
