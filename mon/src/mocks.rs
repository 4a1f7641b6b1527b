//! In-memory collaborators for driving the monitor in tests.

use crate::monitor::MdsMonitor;
use crate::traits::{Clock, Host, Paxos, PostCommit, Transport};
use crate::types::Message;
use reef_buffer::BufferList;
use std::cell::{Cell, RefCell};
use std::net::SocketAddr;
use std::rc::Rc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A monitor wired to the mock collaborators.
pub type MockMonitor = MdsMonitor<MockPaxos, MockTransport, MockClock, MockHost>;

#[derive(Default)]
struct PaxosState {
    version: u64,
    log: Vec<BufferList>,
    waiters: Vec<PostCommit>,
    proposals: usize,
    active: bool,
    readable: bool,
}

/// A single-replica Paxos log: commits are immediate and always readable.
#[derive(Clone)]
pub struct MockPaxos {
    state: Rc<RefCell<PaxosState>>,
}

impl MockPaxos {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(PaxosState {
                active: true,
                readable: true,
                ..PaxosState::default()
            })),
        }
    }

    /// Commits `blob` as the next version.
    pub fn commit(&self, blob: BufferList) {
        let mut state = self.state.borrow_mut();
        state.log.push(blob);
        state.version += 1;
    }

    /// Takes the continuations registered since the last call.
    pub fn take_waiters(&self) -> Vec<PostCommit> {
        std::mem::take(&mut self.state.borrow_mut().waiters)
    }

    /// Number of proposal requests seen so far.
    pub fn proposals(&self) -> usize {
        self.state.borrow().proposals
    }

    pub fn set_active(&self, active: bool) {
        self.state.borrow_mut().active = active;
    }

    pub fn set_readable(&self, readable: bool) {
        self.state.borrow_mut().readable = readable;
    }
}

impl Default for MockPaxos {
    fn default() -> Self {
        Self::new()
    }
}

impl Paxos for MockPaxos {
    fn is_active(&self) -> bool {
        self.state.borrow().active
    }

    fn is_readable(&self) -> bool {
        self.state.borrow().readable
    }

    fn version(&self) -> u64 {
        self.state.borrow().version
    }

    fn read(&self, version: u64, out: &mut BufferList) -> bool {
        let state = self.state.borrow();
        match state.log.get(version as usize - 1) {
            Some(blob) => {
                out.append_list(blob);
                true
            }
            None => false,
        }
    }

    fn wait_for_commit(&mut self, waiter: PostCommit) {
        self.state.borrow_mut().waiters.push(waiter);
    }

    fn propose(&mut self) {
        self.state.borrow_mut().proposals += 1;
    }
}

/// Records every sent message.
#[derive(Clone, Default)]
pub struct MockTransport {
    sent: Rc<RefCell<Vec<(Message, SocketAddr)>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(Message, SocketAddr)> {
        self.sent.borrow().clone()
    }

    pub fn clear(&self) {
        self.sent.borrow_mut().clear();
    }
}

impl Transport for MockTransport {
    fn send(&mut self, message: Message, dest: SocketAddr) {
        self.sent.borrow_mut().push((message, dest));
    }
}

/// A settable clock.
#[derive(Clone)]
pub struct MockClock {
    now: Rc<Cell<SystemTime>>,
}

impl MockClock {
    pub fn new() -> Self {
        Self {
            now: Rc::new(Cell::new(UNIX_EPOCH + Duration::from_secs(1_000_000))),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> SystemTime {
        self.now.get()
    }
}

struct HostState {
    leader: bool,
    leader_addr: SocketAddr,
    osd_pushes: Vec<SocketAddr>,
    shutdown: bool,
}

/// The wider monitor: leadership, the sibling OSD monitor, and shutdown.
#[derive(Clone)]
pub struct MockHost {
    state: Rc<RefCell<HostState>>,
}

impl MockHost {
    /// A host that currently leads.
    pub fn leader() -> Self {
        Self {
            state: Rc::new(RefCell::new(HostState {
                leader: true,
                leader_addr: "127.0.0.1:6789".parse().unwrap(),
                osd_pushes: Vec::new(),
                shutdown: false,
            })),
        }
    }

    pub fn set_leader(&self, leader: bool) {
        self.state.borrow_mut().leader = leader;
    }

    pub fn osd_pushes(&self) -> Vec<SocketAddr> {
        self.state.borrow().osd_pushes.clone()
    }

    pub fn is_shutdown(&self) -> bool {
        self.state.borrow().shutdown
    }
}

impl Host for MockHost {
    fn is_leader(&self) -> bool {
        self.state.borrow().leader
    }

    fn leader_addr(&self) -> SocketAddr {
        self.state.borrow().leader_addr
    }

    fn send_latest_osdmap(&mut self, dest: SocketAddr) {
        self.state.borrow_mut().osd_pushes.push(dest);
    }

    fn shutdown(&mut self) {
        self.state.borrow_mut().shutdown = true;
    }
}

/// Runs one full Paxos round: encode the pending map, commit it, refresh the
/// monitor, open the next pending round, then deliver the post-commit
/// continuations.
pub fn commit_round(mon: &mut MockMonitor, paxos: &MockPaxos) {
    let mut blob = BufferList::new();
    mon.encode_pending(&mut blob);
    paxos.commit(blob);
    mon.update_from_paxos();
    mon.create_pending();
    for waiter in paxos.take_waiters() {
        mon.commit_update(waiter);
    }
}
