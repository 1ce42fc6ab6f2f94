//! Constraint checking
//!
//! Decides whether the environment currently satisfies the constraints of a
//! schedule request. The scheduler asks before admitting a run and simply
//! asks again on its next tick when the answer is no.

use async_trait::async_trait;
use siphon_core::domain::schedule::Constraints;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

/// Service trait for evaluating schedule constraints
#[async_trait]
pub trait ConstraintChecker: Send + Sync {
    /// Returns true when every constraint in `constraints` holds
    async fn satisfied(&self, constraints: &Constraints) -> bool;
}

/// Treats the network as available when a TCP connection to a probe address
/// succeeds within the timeout
pub struct NetworkProbe {
    addr: String,
    timeout: Duration,
}

impl NetworkProbe {
    /// Creates a new network probe
    ///
    /// # Arguments
    /// * `addr` - Probe target as `host:port`
    /// * `timeout` - How long a connection attempt may take
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
        }
    }

    async fn network_available(&self) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.addr)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!("Network probe to {} failed: {}", self.addr, e);
                false
            }
            Err(_) => {
                debug!(
                    "Network probe to {} timed out after {:?}",
                    self.addr, self.timeout
                );
                false
            }
        }
    }
}

#[async_trait]
impl ConstraintChecker for NetworkProbe {
    async fn satisfied(&self, constraints: &Constraints) -> bool {
        if !constraints.requires_network {
            return true;
        }
        self.network_available().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_probe_succeeds_against_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let probe = NetworkProbe::new(addr.to_string(), Duration::from_secs(2));
        assert!(probe.satisfied(&Constraints::network()).await);
    }

    #[tokio::test]
    async fn test_probe_fails_when_nothing_listens() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let probe = NetworkProbe::new(addr.to_string(), Duration::from_secs(2));
        assert!(!probe.satisfied(&Constraints::network()).await);
    }

    #[tokio::test]
    async fn test_no_constraints_skip_probe() {
        // Unresolvable target: would fail if the probe ran
        let probe = NetworkProbe::new("invalid.invalid:1", Duration::from_millis(10));
        assert!(probe.satisfied(&Constraints::default()).await);
    }
}
