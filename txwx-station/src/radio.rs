//! Radio transport.
//!
//! The modem bridge exchanges raw radio frames with this process over
//! UDP, one datagram per frame in each direction.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

/// Capacity of the inbound frame channel.
pub const INBOUND_CAPACITY: usize = 1024;

const MAX_DATAGRAM: usize = 2048;

/// One frame as delivered by the radio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadioMessage {
    pub data: Vec<u8>,
}

#[async_trait]
pub trait Radio: Send + Sync {
    /// Hand one framed packet to the radio.
    async fn transmit(&self, frame: &[u8]) -> Result<()>;

    /// Deliver every inbound frame to `sender`.
    ///
    /// Delivery waits for channel space, so a slow consumer stalls the
    /// reader instead of losing frames inside the process.
    fn subscribe(&self, sender: mpsc::Sender<RadioMessage>);
}

/// Radio reached through a UDP modem bridge.
pub struct UdpRadio {
    socket: Arc<UdpSocket>,
    peer: SocketAddr,
}

impl UdpRadio {
    /// Bind `bind` and resolve the bridge address `peer`.
    pub async fn open(bind: &str, peer: &str) -> Result<Self> {
        let socket = UdpSocket::bind(bind)
            .await
            .with_context(|| format!("binding radio socket {bind}"))?;
        let peer = tokio::net::lookup_host(peer)
            .await
            .with_context(|| format!("resolving radio peer {peer}"))?
            .next()
            .ok_or_else(|| anyhow!("no address for radio peer {peer}"))?;

        log::info!("radio bound to {}, bridge at {}", socket.local_addr()?, peer);
        Ok(UdpRadio {
            socket: Arc::new(socket),
            peer,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

#[async_trait]
impl Radio for UdpRadio {
    async fn transmit(&self, frame: &[u8]) -> Result<()> {
        let sent = self
            .socket
            .send_to(frame, self.peer)
            .await
            .with_context(|| format!("sending to radio bridge {}", self.peer))?;
        if sent != frame.len() {
            bail!("short radio send: {sent} of {} bytes", frame.len());
        }
        Ok(())
    }

    fn subscribe(&self, sender: mpsc::Sender<RadioMessage>) {
        let socket = self.socket.clone();
        tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_DATAGRAM];
            loop {
                match socket.recv_from(&mut buf).await {
                    Ok((n, _)) => {
                        let msg = RadioMessage {
                            data: buf[..n].to_vec(),
                        };
                        if sender.send(msg).await.is_err() {
                            log::debug!("radio subscriber went away, reader stopping");
                            return;
                        }
                    }
                    Err(e) => {
                        log::warn!("radio receive error: {e}");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                }
            }
        });
    }
}
