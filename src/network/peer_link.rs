//! Bandwidth accounting for the "block" payload path (§4.3).
//!
//! Small control messages (`Inv`, `GetHeaders`, `Headers`, `GetData`) are
//! delivered at the simulator level without modeled delay — only bandwidth
//! counters are touched for them. Only `Block` bodies go through the FIFO
//! serialization modeled here, because they're the only payload large
//! enough for transfer time to matter.

use super::PeerAddress;
use std::collections::VecDeque;

/// This node's link characteristics toward one peer. Asymmetric and
/// per-peer: a topology generator may give every link its own regional
/// up/download speed (§4.10), so two peers of the same node can have
/// different bandwidth.
#[derive(Clone, Debug)]
pub struct PeerLink {
    pub peer: PeerAddress,
    /// Bytes/sec this node can push toward `peer`.
    pub upload_speed: f64,
    /// Bytes/sec this node can pull from `peer`.
    pub download_speed: f64,
}

impl PeerLink {
    pub fn new(peer: PeerAddress, upload_speed: f64, download_speed: f64) -> Self {
        PeerLink {
            peer,
            upload_speed,
            download_speed,
        }
    }
}

/// The FIFO of projected completion timestamps backing `sendBlockTimes` /
/// `receiveBlockTimes` in §3. One ledger serializes all of a node's
/// outgoing block sends; a second, separate instance serializes all of its
/// incoming block receives.
#[derive(Clone, Debug, Default)]
pub struct BandwidthLedger {
    completion_times: VecDeque<f64>,
}

impl BandwidthLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule one more transfer of `size` bytes at `speed` bytes/sec,
    /// serialized behind whatever this ledger already has queued: the
    /// transfer starts at `max(now, back(queue))` and completes
    /// `size / speed` seconds later. Returns the completion time.
    pub fn schedule(&mut self, now: f64, size: u32, speed: f64) -> f64 {
        let transfer_time = size as f64 / speed;
        let start = self
            .completion_times
            .back()
            .copied()
            .map(|t| t.max(now))
            .unwrap_or(now);
        let completion = start + transfer_time;
        self.completion_times.push_back(completion);
        completion
    }

    /// Drop completion timestamps that have already elapsed, mirroring the
    /// source's `RemoveSendTime`/`RemoveReceiveTime` cleanup callbacks.
    pub fn retire_before(&mut self, now: f64) {
        while matches!(self.completion_times.front(), Some(t) if *t <= now) {
            self.completion_times.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.completion_times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.completion_times.is_empty()
    }
}

/// `eventTime = size / min(uploadSpeed, peerUploadSpeed)` — the bottleneck
/// rate of a transfer is whichever side of the link is slower.
pub fn bottleneck_speed(sender_upload_speed: f64, receiver_download_speed: f64) -> f64 {
    sender_upload_speed.min(receiver_download_speed)
}
