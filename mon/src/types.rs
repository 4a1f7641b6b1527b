//! Identities, states, beacons, and message surfaces.

use reef_buffer::BufferList;
use reef_codec::{Decode, Encode, Error as CodecError, Reader};
use std::fmt;
use std::net::SocketAddr;

use crate::mdsmap::MdsMap;

/// Identity of a metadata server. `-1` means "not yet assigned".
pub type MdsId = i32;

/// Numeric errno for "invalid argument" (admin command ack `rc = -EINVAL`).
pub const EINVAL: i32 = 22;

/// Numeric errno for "exists" (admin `stop` on a non-active id).
pub const EEXIST: i32 = 17;

/// Error that may be encountered when handling monitor input.
///
/// None of these abort the monitor: stale and unknown beacons are dropped
/// with a log line, command errors are turned into negative ack codes.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    /// The beacon's sequence number is not newer than the last observed.
    #[error("stale beacon from mds{from}: seq {seq} <= {have}")]
    StaleBeacon { from: MdsId, seq: u64, have: u64 },
    /// A non-boot beacon from an id the committed map does not contain.
    #[error("beacon from unknown mds{0}")]
    UnknownSender(MdsId),
    /// An admin command the monitor does not recognize.
    #[error("unrecognized command: {0}")]
    UnknownCommand(String),
    /// Admin `stop` on an id that is not active.
    #[error("mds{0} not active")]
    NotActive(MdsId),
}

/// State of a metadata server, as agreed in the committed map.
///
/// `Boot` only ever appears in beacons: a booting daemon has no map state
/// until the monitor assigns it one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MdsState {
    /// Does not exist.
    Dne = 0,
    /// Requesting admission (beacon-only).
    Boot = 1,
    /// Existed once, cleanly shut down.
    Stopped = 2,
    /// Existed, stopped beaconing; journal must be replayed.
    Failed = 3,
    /// Up, held in reserve while the cluster is degraded or full.
    Standby = 4,
    /// Creating a fresh journal.
    Creating = 5,
    /// Starting from a stopped journal.
    Starting = 6,
    /// Replaying the journal of a failed instance.
    Replay = 7,
    /// Resolving distributed state with peers.
    Resolve = 8,
    /// Waiting for clients to reconnect.
    Reconnect = 9,
    /// Rejoining the cluster cache.
    Rejoin = 10,
    /// Serving metadata.
    Active = 11,
    /// Draining out of the cluster.
    Stopping = 12,
}

impl MdsState {
    /// Whether a server in this state is up (beaconing and monitored).
    pub fn is_up(&self) -> bool {
        matches!(
            self,
            Self::Standby
                | Self::Creating
                | Self::Starting
                | Self::Replay
                | Self::Resolve
                | Self::Reconnect
                | Self::Rejoin
                | Self::Active
                | Self::Stopping
        )
    }

    /// Whether a server in this state degrades the cluster.
    pub fn is_degraded(&self) -> bool {
        matches!(
            self,
            Self::Replay | Self::Resolve | Self::Reconnect | Self::Rejoin | Self::Failed
        )
    }

    /// Human-readable state name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Dne => "dne",
            Self::Boot => "boot",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
            Self::Standby => "standby",
            Self::Creating => "creating",
            Self::Starting => "starting",
            Self::Replay => "replay",
            Self::Resolve => "resolve",
            Self::Reconnect => "reconnect",
            Self::Rejoin => "rejoin",
            Self::Active => "active",
            Self::Stopping => "stopping",
        }
    }
}

impl fmt::Display for MdsState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Encode for MdsState {
    fn write(&self, buf: &mut BufferList) {
        (*self as i32).write(buf);
    }
}

impl Decode for MdsState {
    fn read(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        match i32::read(reader)? {
            0 => Ok(Self::Dne),
            1 => Ok(Self::Boot),
            2 => Ok(Self::Stopped),
            3 => Ok(Self::Failed),
            4 => Ok(Self::Standby),
            5 => Ok(Self::Creating),
            6 => Ok(Self::Starting),
            7 => Ok(Self::Replay),
            8 => Ok(Self::Resolve),
            9 => Ok(Self::Reconnect),
            10 => Ok(Self::Rejoin),
            11 => Ok(Self::Active),
            12 => Ok(Self::Stopping),
            _ => Err(CodecError::Invalid("MdsState", "unknown state")),
        }
    }
}

/// Name of a metadata server: its id, or `mds.?` before one is assigned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MdsName(pub MdsId);

impl MdsName {
    /// The unnamed daemon, before the monitor assigns an id.
    pub const UNKNOWN: Self = Self(-1);

    /// Numeric id, `-1` if unassigned.
    pub fn num(&self) -> MdsId {
        self.0
    }
}

impl fmt::Display for MdsName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 < 0 {
            write!(f, "mds.?")
        } else {
            write!(f, "mds.{}", self.0)
        }
    }
}

impl Encode for MdsName {
    fn write(&self, buf: &mut BufferList) {
        self.0.write(buf);
    }
}

impl Decode for MdsName {
    fn read(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Self(i32::read(reader)?))
    }
}

/// A live metadata server: name plus network address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MdsInstance {
    pub name: MdsName,
    pub addr: SocketAddr,
}

impl MdsInstance {
    pub fn new(name: MdsName, addr: SocketAddr) -> Self {
        Self { name, addr }
    }
}

impl fmt::Display for MdsInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.addr)
    }
}

impl Encode for MdsInstance {
    fn write(&self, buf: &mut BufferList) {
        self.name.write(buf);
        self.addr.write(buf);
    }
}

impl Decode for MdsInstance {
    fn read(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let name = MdsName::read(reader)?;
        let addr = SocketAddr::read(reader)?;
        Ok(Self { name, addr })
    }
}

/// Periodic liveness and state message from a metadata server.
#[derive(Clone, Debug, PartialEq)]
pub struct Beacon {
    /// Who is beaconing (name may be `mds.?` when booting).
    pub inst: MdsInstance,
    /// Map epoch known to the sender (echoed by replies).
    pub epoch: u64,
    /// State the sender is in (or requests, for `Boot`).
    pub state: MdsState,
    /// Monotonic per-sender sequence number.
    pub seq: u64,
    /// Latest map epoch the sender has seen.
    pub last_epoch_seen: u64,
}

impl Encode for Beacon {
    fn write(&self, buf: &mut BufferList) {
        self.inst.write(buf);
        self.epoch.write(buf);
        self.state.write(buf);
        self.seq.write(buf);
        self.last_epoch_seen.write(buf);
    }
}

impl Decode for Beacon {
    fn read(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let inst = MdsInstance::read(reader)?;
        let epoch = u64::read(reader)?;
        let state = MdsState::read(reader)?;
        let seq = u64::read(reader)?;
        let last_epoch_seen = u64::read(reader)?;
        Ok(Self {
            inst,
            epoch,
            state,
            seq,
            last_epoch_seen,
        })
    }
}

/// Message surfaces produced and consumed by the monitor.
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    /// Liveness and state report from a metadata server.
    Beacon(Beacon),
    /// Full map push to a metadata server or waiter.
    MapFull(MdsMap),
    /// Request for the latest map.
    GetMap,
    /// Administrative command.
    Command { cmd: Vec<String> },
    /// Administrative command acknowledgment.
    CommandAck { rc: i32, msg: String },
    /// Generic shutdown signal.
    Shutdown,
}

impl Encode for Message {
    fn write(&self, buf: &mut BufferList) {
        match self {
            Self::Beacon(beacon) => {
                0u32.write(buf);
                beacon.write(buf);
            }
            Self::MapFull(map) => {
                1u32.write(buf);
                map.write(buf);
            }
            Self::GetMap => 2u32.write(buf),
            Self::Command { cmd } => {
                3u32.write(buf);
                cmd.write(buf);
            }
            Self::CommandAck { rc, msg } => {
                4u32.write(buf);
                rc.write(buf);
                msg.write(buf);
            }
            Self::Shutdown => 5u32.write(buf),
        }
    }
}

impl Decode for Message {
    fn read(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        match u32::read(reader)? {
            0 => Ok(Self::Beacon(Beacon::read(reader)?)),
            1 => Ok(Self::MapFull(MdsMap::read(reader)?)),
            2 => Ok(Self::GetMap),
            3 => Ok(Self::Command {
                cmd: Vec::<String>::read(reader)?,
            }),
            4 => Ok(Self::CommandAck {
                rc: i32::read(reader)?,
                msg: String::read(reader)?,
            }),
            5 => Ok(Self::Shutdown),
            _ => Err(CodecError::Invalid("Message", "unknown type")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inst(id: MdsId) -> MdsInstance {
        MdsInstance::new(MdsName(id), "127.0.0.1:6800".parse().unwrap())
    }

    #[test]
    fn test_state_names() {
        assert_eq!(MdsState::Active.name(), "active");
        assert_eq!(MdsState::Dne.to_string(), "dne");
    }

    #[test]
    fn test_state_round_trip() {
        for state in [
            MdsState::Dne,
            MdsState::Boot,
            MdsState::Stopped,
            MdsState::Failed,
            MdsState::Standby,
            MdsState::Creating,
            MdsState::Starting,
            MdsState::Replay,
            MdsState::Resolve,
            MdsState::Reconnect,
            MdsState::Rejoin,
            MdsState::Active,
            MdsState::Stopping,
        ] {
            let encoded = state.encode();
            assert_eq!(encoded.length(), 4);
            assert_eq!(MdsState::decode(&encoded).unwrap(), state);
        }
    }

    #[test]
    fn test_name_display() {
        assert_eq!(MdsName(3).to_string(), "mds.3");
        assert_eq!(MdsName::UNKNOWN.to_string(), "mds.?");
    }

    #[test]
    fn test_beacon_round_trip() {
        let beacon = Beacon {
            inst: inst(-1),
            epoch: 4,
            state: MdsState::Boot,
            seq: 17,
            last_epoch_seen: 3,
        };
        assert_eq!(Beacon::decode(&beacon.encode()).unwrap(), beacon);
    }

    #[test]
    fn test_message_round_trips() {
        let messages = [
            Message::Beacon(Beacon {
                inst: inst(0),
                epoch: 1,
                state: MdsState::Active,
                seq: 2,
                last_epoch_seen: 1,
            }),
            Message::MapFull(crate::mdsmap::MdsMap::new()),
            Message::GetMap,
            Message::Command {
                cmd: vec!["stop".into(), "2".into()],
            },
            Message::CommandAck {
                rc: -EEXIST,
                msg: "mds2 not active".into(),
            },
            Message::Shutdown,
        ];
        for message in messages {
            assert_eq!(Message::decode(&message.encode()).unwrap(), message);
        }
    }

    #[test]
    fn test_unknown_message_type() {
        let encoded = 99u32.encode();
        assert!(matches!(
            Message::decode(&encoded),
            Err(CodecError::Invalid("Message", _))
        ));
    }
}
