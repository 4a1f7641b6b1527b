//! Contracts the monitor consumes from its surroundings.

use crate::types::{Beacon, MdsId, Message};
use reef_buffer::BufferList;
use std::net::SocketAddr;
use std::time::SystemTime;

/// The continuation registered for a beacon-driven map update.
///
/// Captures the minimum state required to resume after the round commits:
/// the assigned id and the beacon that drove the transition. The surrounding
/// monitor hands it back through
/// [`MdsMonitor::commit_update`](crate::monitor::MdsMonitor::commit_update).
/// Re-running it after a leader change is safe: it only reads the committed
/// map.
#[derive(Clone, Debug)]
pub struct PostCommit {
    pub from: MdsId,
    pub beacon: Beacon,
}

/// The replicated-log façade.
pub trait Paxos {
    /// Whether the log is accepting proposals.
    fn is_active(&self) -> bool;

    /// Whether committed state can be read.
    fn is_readable(&self) -> bool;

    /// Latest committed version.
    fn version(&self) -> u64;

    /// Reads the committed bytes for `version`.
    fn read(&self, version: u64, out: &mut BufferList) -> bool;

    /// Registers a continuation to run after the in-flight round commits.
    fn wait_for_commit(&mut self, waiter: PostCommit);

    /// Requests that the pending value be proposed.
    fn propose(&mut self);
}

/// The message transport. Sends never block.
pub trait Transport {
    fn send(&mut self, message: Message, dest: SocketAddr);
}

/// A monotonic wall clock.
pub trait Clock {
    fn now(&self) -> SystemTime;
}

/// The wider monitor hosting this service.
pub trait Host {
    /// Whether this replica currently leads.
    fn is_leader(&self) -> bool;

    /// Address of the current leader, for forwarding.
    fn leader_addr(&self) -> SocketAddr;

    /// Asks the sibling OSD monitor to push its latest map to `dest`.
    fn send_latest_osdmap(&mut self, dest: SocketAddr);

    /// Shuts the whole monitor down.
    fn shutdown(&mut self);
}
