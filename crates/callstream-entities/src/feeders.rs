//! Media server feeders
//!
//! Feeders are preconfigured UDP sinks towards the external media server.
//! They form a static arena indexed by `FeederId`; the arena is
//! authoritative for the free flag and a live call only holds an index
//! into it. Holding is exclusive: a feeder is not free iff exactly one
//! call references it.

use std::io;
use std::net::{SocketAddr, UdpSocket};

use callstream_config::CfgFeeder;
use callstream_core::{CallKind, FeederId, FeederKind};

pub struct Feeder {
    pub stream_name: String,
    pub kind: FeederKind,
    pub addr: SocketAddr,
    socket: UdpSocket,
    pub free: bool,
}

impl Feeder {
    fn from_config(cfg: &CfgFeeder) -> io::Result<Self> {
        let addr: SocketAddr = format!("{}:{}", cfg.ip, cfg.port)
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, format!("feeder address: {}", e)))?;
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        Ok(Self {
            stream_name: cfg.stream.clone(),
            kind: cfg.kind,
            addr,
            socket,
            free: true,
        })
    }

    /// Send one frame to the media server. UDP is best-effort by design:
    /// the caller logs failures and keeps the subscription alive.
    pub fn send(&self, frame: &[u8]) -> io::Result<usize> {
        self.socket.send_to(frame, self.addr)
    }
}

pub struct FeederPool {
    feeders: Vec<Feeder>,
}

impl FeederPool {
    /// Build the arena from configuration. Never grows or shrinks at
    /// runtime; a socket failure here is a startup error.
    pub fn from_config(cfgs: &[CfgFeeder]) -> io::Result<Self> {
        let feeders = cfgs.iter().map(Feeder::from_config).collect::<io::Result<Vec<_>>>()?;
        for feeder in &feeders {
            tracing::info!(
                "feeder '{}' ({}) -> udp://{}",
                feeder.stream_name,
                feeder.kind,
                feeder.addr
            );
        }
        Ok(Self { feeders })
    }

    /// First free feeder matching the call kind, in configuration order.
    /// Marks it taken.
    pub fn allocate(&mut self, call_kind: CallKind) -> Option<FeederId> {
        let id = self
            .feeders
            .iter()
            .position(|feeder| feeder.free && feeder.kind.matches(call_kind))?;
        self.feeders[id].free = false;
        tracing::debug!("feeder '{}' allocated", self.feeders[id].stream_name);
        Some(id)
    }

    /// Return a feeder to the free pool
    pub fn release(&mut self, id: FeederId) {
        match self.feeders.get_mut(id) {
            Some(feeder) => {
                feeder.free = true;
                tracing::debug!("feeder '{}' released", feeder.stream_name);
            }
            None => tracing::error!("release of unknown feeder index {}", id),
        }
    }

    pub fn get(&self, id: FeederId) -> Option<&Feeder> {
        self.feeders.get(id)
    }

    pub fn len(&self) -> usize {
        self.feeders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeders.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feeder> {
        self.feeders.iter()
    }

    /// Symmetric-reference check: a feeder is taken iff exactly one live
    /// call references it. Used by tests and the startup sanity log.
    pub fn linkage_consistent(&self, registry: &crate::registry::Registry) -> bool {
        self.feeders.iter().enumerate().all(|(id, feeder)| {
            let references = registry.iter().filter(|call| call.feeder == Some(id)).count();
            if feeder.free { references == 0 } else { references == 1 }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(kinds: &[FeederKind]) -> FeederPool {
        let cfgs: Vec<CfgFeeder> = kinds
            .iter()
            .enumerate()
            .map(|(i, &kind)| CfgFeeder {
                stream: format!("live{}", i + 1),
                ip: "127.0.0.1".to_string(),
                port: 19000 + i as u16,
                kind,
            })
            .collect();
        FeederPool::from_config(&cfgs).unwrap()
    }

    #[test]
    fn test_allocate_matches_kind_in_config_order() {
        let mut pool = pool(&[FeederKind::Stereo, FeederKind::Mono, FeederKind::Mono]);

        // Group call skips the stereo feeder
        let id = pool.allocate(CallKind::Group).unwrap();
        assert_eq!(pool.get(id).unwrap().stream_name, "live2");

        let id2 = pool.allocate(CallKind::Simplex).unwrap();
        assert_eq!(pool.get(id2).unwrap().stream_name, "live3");

        // Mono feeders exhausted
        assert!(pool.allocate(CallKind::Group).is_none());

        // The stereo feeder is still available for a duplex call
        let id3 = pool.allocate(CallKind::Duplex).unwrap();
        assert_eq!(pool.get(id3).unwrap().stream_name, "live1");
    }

    #[test]
    fn test_release_makes_feeder_reusable() {
        let mut pool = pool(&[FeederKind::Mono]);
        let id = pool.allocate(CallKind::Simplex).unwrap();
        assert!(pool.allocate(CallKind::Simplex).is_none());
        pool.release(id);
        assert_eq!(pool.allocate(CallKind::Simplex), Some(id));
    }

    #[test]
    fn test_send_reaches_destination() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(std::time::Duration::from_secs(2)))
            .unwrap();
        let addr = receiver.local_addr().unwrap();

        let cfg = CfgFeeder {
            stream: "live1".to_string(),
            ip: addr.ip().to_string(),
            port: addr.port(),
            kind: FeederKind::Mono,
        };
        let pool = FeederPool::from_config(&[cfg]).unwrap();
        pool.get(0).unwrap().send(&[0x55u8; 480]).unwrap();

        let mut buf = [0u8; 1024];
        let n = receiver.recv(&mut buf).unwrap();
        assert_eq!(n, 480);
        assert_eq!(buf[..480], [0x55u8; 480]);
    }
}
