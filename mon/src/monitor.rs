//! The membership monitor: a deterministic state machine driven by beacons,
//! ticks, admin commands, and Paxos commit callbacks.
//!
//! The monitor keeps two maps: the authoritative committed `mdsmap` and a
//! `pending` map under construction for the next round. Every mutation lands
//! in `pending`; the surrounding monitor encodes it, replicates it, and
//! refreshes `mdsmap` from the committed bytes. Pending-but-uncommitted
//! transitions are discarded on leader loss; the new leader rebuilds its
//! pending map from the committed one.

use crate::config::Config;
use crate::mdsmap::MdsMap;
use crate::traits::{Clock, Host, Paxos, PostCommit, Transport};
use crate::types::{Beacon, Error, MdsId, MdsInstance, MdsName, MdsState, Message, EEXIST, EINVAL};
use reef_buffer::BufferList;
use reef_codec::{Decode, Encode};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use tracing::{debug, info, warn};

/// Monitors metadata-server membership through a replicated map.
pub struct MdsMonitor<P: Paxos, T: Transport, C: Clock, H: Host> {
    pub(crate) config: Config,
    pub(crate) paxos: P,
    pub(crate) transport: T,
    pub(crate) clock: C,
    pub(crate) host: H,

    /// The authoritative committed map.
    pub(crate) mdsmap: MdsMap,
    /// The next-epoch map under construction.
    pub(crate) pending: MdsMap,
    /// Most recent beacon arrival per up id.
    pub(crate) last_beacon: BTreeMap<MdsId, std::time::SystemTime>,
    /// Destinations awaiting the next readable commit.
    pub(crate) waiting_for_map: Vec<SocketAddr>,
}

impl<P: Paxos, T: Transport, C: Clock, H: Host> MdsMonitor<P, T, C, H> {
    pub fn new(config: Config, paxos: P, transport: T, clock: C, host: H) -> Self {
        config.assert();
        Self {
            config,
            paxos,
            transport,
            clock,
            host,
            mdsmap: MdsMap::new(),
            pending: MdsMap::new(),
            last_beacon: BTreeMap::new(),
            waiting_for_map: Vec::new(),
        }
    }

    /// The authoritative committed map.
    pub fn mdsmap(&self) -> &MdsMap {
        &self.mdsmap
    }

    /// The map under construction for the next round.
    pub fn pending(&self) -> &MdsMap {
        &self.pending
    }

    // -------- lifecycle, invoked around Paxos rounds --------

    /// Populates the first pending map from configuration.
    pub fn create_initial(&mut self) {
        debug!("create_initial");
        self.pending = MdsMap::new();
        self.pending.epoch = self.mdsmap.epoch + 1;
        self.pending.target_num = self.config.num_mds;
        self.pending.created = self.clock.now();
        self.log_map(&self.pending);
    }

    /// Starts the next round: pending is the committed map, one epoch ahead.
    pub fn create_pending(&mut self) {
        self.pending = self.mdsmap.clone();
        self.pending.epoch += 1;
        debug!(epoch = self.pending.epoch, "create_pending");
    }

    /// Writes the pending map as the next proposal value.
    pub fn encode_pending(&self, out: &mut BufferList) {
        debug!(epoch = self.pending.epoch, "encode_pending");
        assert_eq!(
            self.paxos.version() + 1,
            self.pending.epoch,
            "pending epoch must follow the committed version"
        );
        self.pending.write(out);
    }

    /// Refreshes the committed map from the latest Paxos version.
    ///
    /// The leader broadcasts the new map to every up server; waiters queued
    /// while the log was unreadable are drained on every replica.
    pub fn update_from_paxos(&mut self) -> bool {
        assert!(self.paxos.is_active());
        let paxosv = self.paxos.version();
        if paxosv == self.mdsmap.epoch {
            return true;
        }
        assert!(paxosv >= self.mdsmap.epoch);
        debug!(paxosv, have = self.mdsmap.epoch, "update_from_paxos");

        let mut bl = BufferList::new();
        let success = self.paxos.read(paxosv, &mut bl);
        assert!(success, "committed version must be readable");
        self.mdsmap = MdsMap::decode(&bl).expect("corrupt committed map");
        self.log_map(&self.mdsmap);

        if self.host.is_leader() {
            self.bcast_latest();
        }
        self.send_to_waiting();
        true
    }

    /// This monitor proposes eagerly.
    pub fn should_propose_now(&self) -> bool {
        true
    }

    // -------- message handling --------

    /// Routes a message through preprocess and, if needed, update; signals
    /// the façade when the resulting pending map should be proposed.
    ///
    /// Returns whether a proposal was requested.
    pub fn dispatch(&mut self, message: Message, src: SocketAddr) -> bool {
        if self.preprocess_query(&message, src) {
            return false;
        }
        let propose = self.prepare_update(message, src);
        if propose && self.should_propose_now() {
            self.paxos.propose();
        }
        propose
    }

    /// Answers reads and short-circuits beacons that need no state change.
    ///
    /// Returns true when the message is fully handled.
    pub fn preprocess_query(&mut self, message: &Message, src: SocketAddr) -> bool {
        debug!(%src, "preprocess_query");
        match message {
            Message::Beacon(beacon) => match self.preprocess_beacon(beacon) {
                Ok(done) => done,
                Err(err) => {
                    debug!(%err, "dropping beacon");
                    true
                }
            },
            Message::GetMap => {
                self.send_full(src);
                true
            }
            Message::Command { .. } => false,
            _ => {
                warn!("unexpected message, dropping");
                true
            }
        }
    }

    /// Constructs a pending mutation for a message that needs one.
    ///
    /// Returns whether the pending map should be proposed.
    pub fn prepare_update(&mut self, message: Message, src: SocketAddr) -> bool {
        debug!(%src, "prepare_update");
        match message {
            Message::Beacon(beacon) => self.handle_beacon(beacon),
            Message::Command { cmd } => self.handle_command(&cmd, src),
            _ => {
                warn!("unexpected message, dropping");
                false
            }
        }
    }

    fn preprocess_beacon(&mut self, beacon: &Beacon) -> Result<bool, Error> {
        if !self.host.is_leader() {
            debug!("fw to leader");
            let dest = self.host.leader_addr();
            self.transport.send(Message::Beacon(beacon.clone()), dest);
            return Ok(true);
        }

        let mut from = beacon.inst.name.num();
        let state = beacon.state;
        let seq = beacon.seq;
        debug!(inst = %beacon.inst, %state, seq, "preprocess_beacon");

        // A boot from an address we already admitted continues as a normal
        // beacon; an unknown address needs a map update.
        if state == MdsState::Boot {
            let already = self.mdsmap.get_addr_rank(&beacon.inst.addr);
            if already < 0 {
                return Ok(false);
            }
            from = already;
        }

        let have = self.mdsmap.state_seq(from);
        if have >= seq {
            return Err(Error::StaleBeacon { from, seq, have });
        }

        // Note the arrival and echo the beacon.
        if state != MdsState::Stopped {
            self.last_beacon.insert(from, self.clock.now());
            let reply = Beacon {
                inst: beacon.inst.clone(),
                epoch: self.mdsmap.epoch,
                state,
                seq,
                last_epoch_seen: self.mdsmap.epoch,
            };
            let dest = beacon.inst.addr;
            self.transport.send(Message::Beacon(reply), dest);
        }

        // Is there a state change here?
        if !self.mdsmap.mds_state.contains_key(&from) {
            if state == MdsState::Boot {
                return Ok(false); // needs to be added to the map
            }
            return Err(Error::UnknownSender(from));
        }
        if self.mdsmap.get_state(from) != state {
            if self.mdsmap.epoch == beacon.last_epoch_seen {
                return Ok(false); // needs a map update
            }
            debug!(
                inst = %beacon.inst,
                requested = %state,
                "sender has not seen the latest map, ignoring requested state"
            );
        }
        Ok(true)
    }

    /// Applies a beacon to the pending map (leader only).
    pub fn handle_beacon(&mut self, beacon: Beacon) -> bool {
        let mut from = beacon.inst.name.num();
        let mut state = beacon.state;
        let seq = beacon.seq;
        debug!(inst = %beacon.inst, %state, seq, "handle_beacon");

        if state == MdsState::Boot {
            // Assign an id.
            if from >= 0 {
                // Wants to be (or already is) a specific id.
                let same_inst = self.mdsmap.get_inst(from) == Some(&beacon.inst);
                if !self.config.allow_mds_bully && !same_inst {
                    debug!(from, "boot: id is someone else");
                    from = -1;
                } else {
                    let was = self.mdsmap.get_state(from);
                    state = match was {
                        MdsState::Stopped | MdsState::Starting | MdsState::Standby => {
                            MdsState::Starting
                        }
                        MdsState::Dne | MdsState::Creating => MdsState::Creating,
                        _ => MdsState::Replay,
                    };
                    debug!(from, %was, now = %state, "boot");
                }
            }
            if from < 0 {
                // A reassignment for this address may already be pending.
                let pending_rank = self.pending.get_addr_rank(&beacon.inst.addr);
                if pending_rank >= 0 {
                    debug!(
                        from = pending_rank,
                        state = %self.pending.get_state(pending_rank),
                        "boot: already pending"
                    );
                    return false;
                }
            }
            if from < 0 {
                // Take over a failed id?
                if let Some(&failed) = self.pending.failed_set().first() {
                    from = failed;
                    state = MdsState::Replay;
                    debug!(from, "boot: assigned failed id");
                }
            }
            if from < 0 {
                // Pick any unused id.
                let mut id = 0;
                loop {
                    if self.pending.is_dne(id) {
                        from = id;
                        state = MdsState::Creating;
                        debug!(from, "boot: assigned new id");
                        break;
                    }
                    if self.pending.is_stopped_state(id) {
                        from = id;
                        state = MdsState::Starting;
                        debug!(from, "boot: assigned stopped id");
                        break;
                    }
                    id += 1;
                }
            }
            assert!(matches!(
                state,
                MdsState::Creating | MdsState::Starting | MdsState::Replay
            ));

            // Put it in the map.
            self.pending
                .mds_inst
                .insert(from, MdsInstance::new(MdsName(from), beacon.inst.addr));
            *self.pending.mds_inc.entry(from).or_insert(0) += 1;

            // Reset the beacon timer.
            self.last_beacon.insert(from, self.clock.now());
        }

        // Finished creating?
        if state == MdsState::Active && self.mdsmap.is_creating(from) {
            self.pending.mds_created.insert(from);
            debug!(from, "created");
        }

        // If starting or creating while degraded or full, hold in standby.
        if (state == MdsState::Starting
            || state == MdsState::Creating
            || self.mdsmap.is_starting(from)
            || self.mdsmap.is_creating(from))
            && (self.pending.is_degraded() || self.pending.is_full())
        {
            debug!(from, "cluster degraded or full, will be standby");
            state = MdsState::Standby;
        }

        debug!(from, old = %self.mdsmap.get_state(from), new = %state, "state change");

        // Did someone join or leave the serving set?
        if matches!(
            state,
            MdsState::Replay | MdsState::Active | MdsState::Stopped
        ) {
            self.pending.same_in_set_since = self.pending.epoch;
        }

        self.pending.mds_state.insert(from, state);
        if self.pending.is_up(from) {
            self.pending.mds_state_seq.insert(from, seq);
        } else {
            self.pending.mds_state_seq.remove(&from);
        }

        self.paxos.wait_for_commit(PostCommit { from, beacon });
        true
    }

    /// Continuation run after a beacon-driven round commits.
    pub fn commit_update(&mut self, waiter: PostCommit) {
        let PostCommit { from, beacon } = waiter;
        if beacon.state == MdsState::Boot {
            debug!(from, "updated (booted)");
            // A booted server needs the latest OSD map to start doing I/O.
            let dest = self.mdsmap.get_inst(from).map(|inst| inst.addr);
            if let Some(dest) = dest {
                self.host.send_latest_osdmap(dest);
            }
        } else {
            debug!(from, state = %beacon.state, "updated");
        }
        if beacon.state == MdsState::Stopped {
            // Out of the map now, so it will miss the broadcast.
            self.send_latest(beacon.inst.addr);
        }

        if self.host.is_leader()
            && self.config.stop_with_last_mds
            && self.mdsmap.epoch > 1
            && self.mdsmap.is_stopped()
        {
            info!("last mds stopped, shutting down");
            self.host.shutdown();
        }
    }

    /// Applies an admin command and acks it.
    pub fn handle_command(&mut self, cmd: &[String], src: SocketAddr) -> bool {
        let (rc, msg) = match self.apply_command(cmd) {
            Ok(msg) => (0, msg),
            Err(Error::NotActive(id)) => (
                -EEXIST,
                format!("mds{} not active ({})", id, self.mdsmap.get_state(id)),
            ),
            Err(err) => (-EINVAL, err.to_string()),
        };
        debug!(rc, %msg, "command result");
        self.transport.send(Message::CommandAck { rc, msg }, src);
        rc >= 0
    }

    fn apply_command(&mut self, cmd: &[String]) -> Result<String, Error> {
        match cmd {
            [op, who] if op == "stop" => {
                let who: MdsId = who
                    .parse()
                    .map_err(|_| Error::UnknownCommand(cmd.join(" ")))?;
                if !self.mdsmap.is_active(who) {
                    return Err(Error::NotActive(who));
                }
                self.pending.mds_state.insert(who, MdsState::Stopping);
                Ok(format!("telling mds{} to stop", who))
            }
            [op, n] if op == "set_target_num" => {
                let n: u32 = n
                    .parse()
                    .map_err(|_| Error::UnknownCommand(cmd.join(" ")))?;
                self.pending.target_num = n;
                Ok(format!("target_num = {}", n))
            }
            _ => Err(Error::UnknownCommand(cmd.join(" "))),
        }
    }

    // -------- failure detection --------

    /// Marks down every up server whose last beacon is older than the grace.
    ///
    /// Runs only on a leader with an active log.
    pub fn tick(&mut self) {
        if !self.host.is_leader() {
            return;
        }
        if !self.paxos.is_active() {
            return;
        }
        let now = self.clock.now();
        let Some(cutoff) = now.checked_sub(self.config.beacon_grace) else {
            return;
        };

        let mut changed = false;
        for id in self.mdsmap.up_set() {
            match self.last_beacon.get(&id).copied() {
                None => {
                    // Never heard from it; grant a full grace period.
                    debug!(id, "no beacons yet, assuming one");
                    self.last_beacon.insert(id, now);
                }
                Some(last) if last < cutoff => {
                    let newstate = match self.mdsmap.get_state(id) {
                        MdsState::Standby => {
                            if self.mdsmap.has_created(id) {
                                MdsState::Stopped
                            } else {
                                MdsState::Dne
                            }
                        }
                        // Never finished creating.
                        MdsState::Creating => MdsState::Dne,
                        MdsState::Starting => MdsState::Stopped,
                        MdsState::Replay
                        | MdsState::Resolve
                        | MdsState::Reconnect
                        | MdsState::Rejoin
                        | MdsState::Active
                        | MdsState::Stopping => MdsState::Failed,
                        MdsState::Dne | MdsState::Boot | MdsState::Stopped | MdsState::Failed => {
                            unreachable!("not an up state")
                        }
                    };
                    info!(id, marking = %newstate, "no beacon within grace");
                    self.pending.mds_state.insert(id, newstate);
                    self.pending.mds_state_seq.remove(&id);
                    changed = true;
                }
                Some(_) => {}
            }
        }
        if changed {
            self.paxos.propose();
        }
    }

    // -------- operator full stop --------

    /// Writes a stop transition for every known server and proposes.
    pub fn do_stop(&mut self) {
        if !self.host.is_leader() || !self.paxos.is_active() {
            warn!("cannot stop right now, map not writeable");
            return;
        }
        info!("stopping all mds nodes");
        self.log_map(&self.mdsmap);

        let committed: Vec<(MdsId, MdsState)> = self
            .mdsmap
            .mds_state
            .iter()
            .map(|(id, state)| (*id, *state))
            .collect();
        for (id, state) in committed {
            let next = match state {
                MdsState::Active | MdsState::Stopping => Some(MdsState::Stopping),
                MdsState::Creating | MdsState::Standby => Some(MdsState::Dne),
                MdsState::Starting => Some(MdsState::Stopped),
                // These cannot finish recovery once their peers go down, so
                // the stopping set may stall until they are reassigned.
                MdsState::Replay
                | MdsState::Resolve
                | MdsState::Reconnect
                | MdsState::Rejoin => Some(MdsState::Failed),
                _ => None,
            };
            if let Some(next) = next {
                self.pending.mds_state.insert(id, next);
            }
        }

        self.paxos.propose();
    }

    // -------- map distribution --------

    fn bcast_latest(&mut self) {
        debug!(epoch = self.mdsmap.epoch, "bcast_latest");
        for id in self.mdsmap.up_set() {
            let dest = self.mdsmap.get_inst(id).map(|inst| inst.addr);
            if let Some(dest) = dest {
                self.send_full(dest);
            }
        }
    }

    fn send_full(&mut self, dest: SocketAddr) {
        debug!(%dest, "send_full");
        self.transport
            .send(Message::MapFull(self.mdsmap.clone()), dest);
    }

    /// Sends the committed map, or queues the destination until one is
    /// readable.
    pub fn send_latest(&mut self, dest: SocketAddr) {
        if self.paxos.is_readable() {
            self.send_full(dest);
        } else {
            self.waiting_for_map.push(dest);
        }
    }

    fn send_to_waiting(&mut self) {
        debug!(epoch = self.mdsmap.epoch, "send_to_waiting");
        for dest in std::mem::take(&mut self.waiting_for_map) {
            self.send_full(dest);
        }
    }

    fn log_map(&self, map: &MdsMap) {
        debug!(epoch = map.epoch, target_num = map.target_num, "map");
        for (id, state) in &map.mds_state {
            debug!(
                id = *id,
                inc = map.mds_inc.get(id).copied().unwrap_or(0),
                %state,
                inst = ?map.get_inst(*id),
                "member"
            );
        }
    }
}
