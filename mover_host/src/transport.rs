//! Pose transport.
//!
//! Real deployments plug a network transport in behind `Transport`. The
//! host ships an in-process loopback so several peers can run in one
//! process: every message a peer sends is broadcast to all other peers.
//!
//! The loopback keeps send order per sender and can drop messages at a
//! configurable rate. It never reorders, deduplicates or sequences.

use async_trait::async_trait;
use bytes::Bytes;
use mover_shared::net::{decode_from_bytes, encode_to_bytes, NetMsg};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio::sync::mpsc;
use tracing::{trace, warn};

/// Capacity of each loopback inbox.
pub const INBOX_CAPACITY: usize = 1024;

/// Message transport between peers.
#[async_trait]
pub trait Transport: Send {
    /// Sends to every other peer.
    async fn send(&mut self, msg: &NetMsg) -> anyhow::Result<()>;
    /// Returns the next received message without waiting.
    fn try_recv(&mut self) -> anyhow::Result<Option<NetMsg>>;
}

/// Counters kept by a loopback endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub sent: u64,
    pub dropped: u64,
    pub received: u64,
}

/// One peer's end of the loopback.
pub struct LoopbackTransport {
    peer: usize,
    outboxes: Vec<(usize, mpsc::Sender<Bytes>)>,
    inbox: mpsc::Receiver<Bytes>,
    drop_rate: f64,
    rng: StdRng,
    stats: LinkStats,
}

impl LoopbackTransport {
    /// Creates `peers` fully connected endpoints.
    pub fn mesh(peers: usize, drop_rate: f64, seed: u64) -> Vec<LoopbackTransport> {
        let (senders, receivers): (Vec<_>, Vec<_>) =
            (0..peers).map(|_| mpsc::channel(INBOX_CAPACITY)).unzip();

        receivers
            .into_iter()
            .enumerate()
            .map(|(peer, inbox)| LoopbackTransport {
                peer,
                outboxes: senders
                    .iter()
                    .enumerate()
                    .filter(|(other, _)| *other != peer)
                    .map(|(other, tx)| (other, tx.clone()))
                    .collect(),
                inbox,
                drop_rate: drop_rate.clamp(0.0, 1.0),
                rng: StdRng::seed_from_u64(seed.wrapping_add(peer as u64)),
                stats: LinkStats::default(),
            })
            .collect()
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send(&mut self, msg: &NetMsg) -> anyhow::Result<()> {
        let payload = encode_to_bytes(msg)?;
        for (other, tx) in &self.outboxes {
            if self.drop_rate > 0.0 && self.rng.gen::<f64>() < self.drop_rate {
                self.stats.dropped += 1;
                trace!(from = self.peer, to = *other, "Dropped message");
                continue;
            }
            match tx.try_send(payload.clone()) {
                Ok(()) => self.stats.sent += 1,
                // The receiver polls on the same task, so waiting here
                // would never finish. A full inbox loses the message.
                Err(mpsc::error::TrySendError::Full(_)) => {
                    self.stats.dropped += 1;
                    warn!(from = self.peer, to = *other, "Inbox full, message dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    anyhow::bail!("loopback send to peer {other}: inbox closed");
                }
            }
        }
        Ok(())
    }

    fn try_recv(&mut self) -> anyhow::Result<Option<NetMsg>> {
        match self.inbox.try_recv() {
            Ok(bytes) => {
                self.stats.received += 1;
                decode_from_bytes(&bytes).map(Some)
            }
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            // Every peer holds a sender to every other; disconnect means
            // the mesh is being torn down.
            Err(mpsc::error::TryRecvError::Disconnected) => Ok(None),
        }
    }
}
