//! The MDS map: one immutable snapshot of cluster membership per epoch.

use crate::types::{MdsId, MdsInstance, MdsState};
use reef_buffer::BufferList;
use reef_codec::{Decode, Encode, Error as CodecError, Reader};
use std::collections::{BTreeMap, BTreeSet};
use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Cluster-wide agreement on which metadata servers exist and what state
/// each is in.
///
/// A pure value type: the monitor constructs the next epoch's map as a fresh
/// value and replicates it through Paxos as a single blob.
#[derive(Clone, Debug, PartialEq)]
pub struct MdsMap {
    /// Version of the map; increases by one per Paxos round.
    pub epoch: u64,
    /// Wall-clock of initial creation.
    pub created: SystemTime,
    /// Operator-chosen desired active count.
    pub target_num: u32,
    /// State of every known id.
    pub mds_state: BTreeMap<MdsId, MdsState>,
    /// Per-id incarnation counter, incremented on every boot.
    pub mds_inc: BTreeMap<MdsId, u32>,
    /// Name and network address of every live id.
    pub mds_inst: BTreeMap<MdsId, MdsInstance>,
    /// Last beacon sequence number observed for each up id.
    pub mds_state_seq: BTreeMap<MdsId, u64>,
    /// Ids that ever reached active.
    pub mds_created: BTreeSet<MdsId>,
    /// Epoch at which the set of replay/active/stopped ids last changed.
    pub same_in_set_since: u64,
}

impl Default for MdsMap {
    fn default() -> Self {
        Self {
            epoch: 0,
            created: UNIX_EPOCH,
            target_num: 0,
            mds_state: BTreeMap::new(),
            mds_inc: BTreeMap::new(),
            mds_inst: BTreeMap::new(),
            mds_state_seq: BTreeMap::new(),
            mds_created: BTreeSet::new(),
            same_in_set_since: 0,
        }
    }
}

impl MdsMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// State of `id`, `Dne` if the map has never heard of it.
    pub fn get_state(&self, id: MdsId) -> MdsState {
        self.mds_state.get(&id).copied().unwrap_or(MdsState::Dne)
    }

    /// Last observed beacon sequence for `id`, 0 if none.
    pub fn state_seq(&self, id: MdsId) -> u64 {
        self.mds_state_seq.get(&id).copied().unwrap_or(0)
    }

    /// Whether an instance is recorded for `id`.
    pub fn have_inst(&self, id: MdsId) -> bool {
        self.mds_inst.contains_key(&id)
    }

    /// The recorded instance for `id`.
    pub fn get_inst(&self, id: MdsId) -> Option<&MdsInstance> {
        self.mds_inst.get(&id)
    }

    /// The id whose recorded instance has this address, `-1` if none.
    pub fn get_addr_rank(&self, addr: &SocketAddr) -> MdsId {
        for (id, inst) in &self.mds_inst {
            if inst.addr == *addr {
                return *id;
            }
        }
        -1
    }

    pub fn is_up(&self, id: MdsId) -> bool {
        self.get_state(id).is_up()
    }

    pub fn is_dne(&self, id: MdsId) -> bool {
        self.get_state(id) == MdsState::Dne
    }

    pub fn is_stopped_state(&self, id: MdsId) -> bool {
        self.get_state(id) == MdsState::Stopped
    }

    pub fn is_creating(&self, id: MdsId) -> bool {
        self.get_state(id) == MdsState::Creating
    }

    pub fn is_starting(&self, id: MdsId) -> bool {
        self.get_state(id) == MdsState::Starting
    }

    pub fn is_active(&self, id: MdsId) -> bool {
        self.get_state(id) == MdsState::Active
    }

    /// Whether `id` ever reached active.
    pub fn has_created(&self, id: MdsId) -> bool {
        self.mds_created.contains(&id)
    }

    /// Whether some id is replaying, resolving, reconnecting, rejoining, or
    /// failed.
    pub fn is_degraded(&self) -> bool {
        self.mds_state.values().any(MdsState::is_degraded)
    }

    /// Whether the active count has reached the target.
    pub fn is_full(&self) -> bool {
        self.num_in_state(MdsState::Active) >= self.target_num as usize
    }

    /// Whether no id at all is up.
    pub fn is_stopped(&self) -> bool {
        !self.mds_state.values().any(MdsState::is_up)
    }

    /// Number of ids in `state`.
    pub fn num_in_state(&self, state: MdsState) -> usize {
        self.mds_state.values().filter(|s| **s == state).count()
    }

    /// Every up id, in order.
    pub fn up_set(&self) -> Vec<MdsId> {
        self.mds_state
            .iter()
            .filter(|(_, s)| s.is_up())
            .map(|(id, _)| *id)
            .collect()
    }

    /// Every failed id, in order.
    pub fn failed_set(&self) -> Vec<MdsId> {
        self.mds_state
            .iter()
            .filter(|(_, s)| **s == MdsState::Failed)
            .map(|(id, _)| *id)
            .collect()
    }
}

impl Encode for MdsMap {
    fn write(&self, buf: &mut BufferList) {
        self.epoch.write(buf);
        self.created.write(buf);
        self.target_num.write(buf);
        self.mds_state.write(buf);
        self.mds_inc.write(buf);
        self.mds_inst.write(buf);
        self.mds_state_seq.write(buf);
        self.mds_created.write(buf);
        self.same_in_set_since.write(buf);
    }
}

impl Decode for MdsMap {
    fn read(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let epoch = u64::read(reader)?;
        let created = SystemTime::read(reader)?;
        let target_num = u32::read(reader)?;
        let mds_state = BTreeMap::read(reader)?;
        let mds_inc = BTreeMap::read(reader)?;
        let mds_inst = BTreeMap::read(reader)?;
        let mds_state_seq = BTreeMap::read(reader)?;
        let mds_created = BTreeSet::read(reader)?;
        let same_in_set_since = u64::read(reader)?;
        Ok(Self {
            epoch,
            created,
            target_num,
            mds_state,
            mds_inc,
            mds_inst,
            mds_state_seq,
            mds_created,
            same_in_set_since,
        })
    }
}
