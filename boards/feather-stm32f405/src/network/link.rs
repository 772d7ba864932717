#![deny(unsafe_code)]
#![deny(warnings)]
//! Ethernet link: DHCP lease on the W5500

use defmt::{info, warn};
use embassy_net::{ConfigV4, Stack};
use hal_abstractions::NetworkJoin;

use super::error::NetworkError;

/// [`NetworkJoin`] over an embassy-net stack configured for DHCPv4
///
/// Without a stack (W5500 missing or unresponsive) every join fails, so the
/// wake cycle still backs off and arms its fallback alarm.
pub struct EthernetLink {
    stack: Option<Stack<'static>>,
}

impl EthernetLink {
    pub fn new(stack: Option<Stack<'static>>) -> Self {
        Self { stack }
    }
}

impl NetworkJoin for EthernetLink {
    type Error = NetworkError;

    async fn connect(&mut self) -> Result<(), NetworkError> {
        let Some(stack) = &self.stack else {
            warn!("No Ethernet interface to join");
            return Err(NetworkError::Unavailable);
        };
        wait_for_config(stack).await;
        Ok(())
    }

    async fn disconnect(&mut self) {
        if let Some(stack) = &self.stack {
            stack.set_config_v4(ConfigV4::None);
            info!("Network address released");
        }
    }
}

/// Wait for network configuration (DHCP) and log IP address
async fn wait_for_config(stack: &Stack<'_>) {
    info!("Waiting for DHCP...");
    stack.wait_config_up().await;
    info!("Network is UP!");

    if let Some(config) = stack.config_v4() {
        let octets = config.address.address().octets();
        info!(
            "IP: {}.{}.{}.{}",
            octets[0], octets[1], octets[2], octets[3]
        );

        if let Some(gateway) = config.gateway {
            let gw = gateway.octets();
            info!("Gateway: {}.{}.{}.{}", gw[0], gw[1], gw[2], gw[3]);
        }
    }
}
