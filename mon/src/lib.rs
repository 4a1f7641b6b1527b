//! MDS cluster membership monitor.
//!
//! Maintains cluster-wide agreement on which metadata servers exist and what
//! state each is in, by replicating an [`MdsMap`](mdsmap::MdsMap) through a
//! Paxos log:
//!
//! - [`mdsmap`]: the map value type, one snapshot per epoch
//! - [`monitor`]: the deterministic state machine driven by beacons, ticks,
//!   admin commands, and commit callbacks
//! - [`traits`]: contracts consumed from the surrounding monitor (Paxos
//!   façade, transport, clock, host)
//! - [`types`]: identities, states, beacons, and the message surfaces
//! - [`mocks`]: in-memory collaborators for tests
//!
//! The monitor is single-threaded and cooperative: every entry point is
//! serialized by the surrounding monitor, and nothing suspends internally.
//! Asynchronous continuation is a [`PostCommit`](traits::PostCommit) value
//! registered with the Paxos façade and handed back after the round commits.

pub mod config;
pub mod mdsmap;
pub mod mocks;
pub mod monitor;
pub mod traits;
pub mod types;

pub use config::Config;
pub use mdsmap::MdsMap;
pub use monitor::MdsMonitor;
pub use traits::{Clock, Host, Paxos, PostCommit, Transport};
pub use types::{Beacon, Error, MdsId, MdsInstance, MdsName, MdsState, Message};
