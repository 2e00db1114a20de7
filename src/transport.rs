// src/transport.rs - Command transport seam towards the remote-control bridge
use async_trait::async_trait;
use std::time::Duration;

use crate::config::CoverConfig;
use crate::error::TransportError;

pub const DEFAULT_DISPATCH_LATENCY: Duration = Duration::from_millis(500);

/// Delivers a physical command code to the hardware, typically through an
/// IR/RF bridge.
#[async_trait]
pub trait CommandTransport: Send + Sync {
    async fn send_command(&self, code: &str) -> Result<(), TransportError>;
}

/// Transport used when no bridge is reachable: logs the code and waits a
/// simulated dispatch latency.
#[derive(Debug, Clone)]
pub struct SimulatedTransport {
    bridge_device: Option<String>,
    latency: Duration,
}

impl SimulatedTransport {
    pub fn new(bridge_device: Option<String>, latency: Duration) -> Self {
        Self { bridge_device, latency }
    }

    /// Dedicated transport for a cover that names a bridge or a non-default
    /// latency. `None` means the shared default transport fits.
    pub fn for_cover(config: &CoverConfig) -> Option<Self> {
        if config.bridge_device.is_none() && config.dispatch_latency() == DEFAULT_DISPATCH_LATENCY {
            return None;
        }
        Some(Self::new(config.bridge_device.clone(), config.dispatch_latency()))
    }
}

impl Default for SimulatedTransport {
    fn default() -> Self {
        Self::new(None, DEFAULT_DISPATCH_LATENCY)
    }
}

#[async_trait]
impl CommandTransport for SimulatedTransport {
    async fn send_command(&self, code: &str) -> Result<(), TransportError> {
        match &self.bridge_device {
            Some(device) => tracing::info!("Simulating IR code via bridge {}: {}", device, code),
            None => tracing::warn!("No bridge device configured, simulating IR code: {}", code),
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_simulated_transport_waits_latency() {
        let transport = SimulatedTransport::default();
        let start = Instant::now();
        assert!(transport.send_command("send_open").await.is_ok());
        assert_eq!(start.elapsed(), Duration::from_millis(500));
    }

    #[test]
    fn test_for_cover_only_when_shared_default_differs() {
        assert!(SimulatedTransport::for_cover(&CoverConfig::default()).is_none());

        let bridged = CoverConfig { bridge_device: Some("rm_mini3".to_string()), ..Default::default() };
        let transport = SimulatedTransport::for_cover(&bridged).unwrap();
        assert_eq!(transport.bridge_device.as_deref(), Some("rm_mini3"));
        assert_eq!(transport.latency, DEFAULT_DISPATCH_LATENCY);

        let slow = CoverConfig { dispatch_latency_ms: 250, ..Default::default() };
        assert_eq!(SimulatedTransport::for_cover(&slow).unwrap().latency, Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_latency_returns_immediately() {
        let transport = SimulatedTransport::new(Some("rm_mini3".to_string()), Duration::ZERO);
        let start = Instant::now();
        assert!(transport.send_command("send_stop").await.is_ok());
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
