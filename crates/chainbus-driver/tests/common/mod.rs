//! Shared test fakes: a scripted byte-exact back-end and a simulated
//! slave bus.

// Each test binary uses its own subset of these helpers.
#![allow(dead_code)]

use chainbus_driver::{Backend, Reception};
use chainbus_protocol::{frame, DeviceInfo, PacketStatistics, SearchAddress};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

// ============================================================================
// Scripted back-end
// ============================================================================

/// What a scripted step answers with.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Raw bytes placed in the receive buffer.
    Raw(Vec<u8>),
    /// A well-formed frame from the given address.
    Frame(u8, Vec<u8>),
    /// No bytes at all.
    Silence,
    /// The write itself fails.
    WriteFail,
}

/// One expected exchange.
#[derive(Debug, Clone)]
pub struct Step {
    /// Exact bytes the host must put on the wire.
    pub expect: Vec<u8>,
    /// The scripted answer.
    pub reply: Reply,
}

impl Step {
    pub fn new(expect: Vec<u8>, reply: Reply) -> Self {
        Step { expect, reply }
    }
}

#[derive(Debug, Default)]
struct ScriptState {
    steps: VecDeque<Step>,
    pending: Vec<u8>,
    clear_count: usize,
}

/// A back-end that checks every write against a script and plays back
/// canned replies.
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedBackend {
    pub fn new(steps: Vec<Step>) -> Self {
        ScriptedBackend {
            state: Arc::new(Mutex::new(ScriptState {
                steps: steps.into(),
                ..Default::default()
            })),
        }
    }

    /// How often the input buffer was discarded.
    pub fn clear_count(&self) -> usize {
        self.state.lock().unwrap().clear_count
    }

    /// Whether every scripted step was consumed.
    pub fn is_exhausted(&self) -> bool {
        self.state.lock().unwrap().steps.is_empty()
    }
}

impl Backend for ScriptedBackend {
    async fn clear_input(&mut self) -> bool {
        let mut state = self.state.lock().unwrap();
        state.pending.clear();
        state.clear_count += 1;
        true
    }

    async fn transmit(&mut self, bytes: &[u8]) -> bool {
        let mut state = self.state.lock().unwrap();
        let step = state.steps.pop_front().expect("unexpected extra write");
        assert_eq!(bytes, step.expect.as_slice(), "unexpected bytes on the wire");
        match step.reply {
            Reply::WriteFail => false,
            Reply::Silence => true,
            Reply::Raw(bytes) => {
                state.pending = bytes;
                true
            }
            Reply::Frame(address, payload) => {
                state.pending = frame::encode(address, &payload);
                true
            }
        }
    }

    async fn receive(&mut self, expected_len: usize) -> Reception {
        let mut state = self.state.lock().unwrap();
        let take = expected_len.min(state.pending.len());
        let data: Vec<u8> = state.pending.drain(..take).collect();
        Reception {
            complete: data.len() == expected_len,
            data,
        }
    }
}

// ============================================================================
// Simulated slave bus
// ============================================================================

/// Per-slave protocol data used by the device-level tests.
#[derive(Debug, Clone)]
pub struct SlaveProfile {
    pub info: DeviceInfo,
    pub name: String,
    pub version: String,
    pub uptime_ticks: u32,
    pub packet_stats: PacketStatistics,
    pub storage: Vec<u8>,
    pub page_size: u16,
    /// Whether the legacy UUID request is implemented.
    pub legacy_uuid: bool,
}

/// One simulated slave on the chain. Order in the bus vector is physical
/// chain order.
#[derive(Debug, Clone)]
pub struct SimSlave {
    pub uuid: u32,
    pub address: Option<u8>,
    /// Whether this device can gate its downstream neighbor.
    pub neighbor_control: bool,
    /// Whether the downstream link currently passes.
    pub link_enabled: bool,
    /// Refuse any SetBusAddress with an ack of 0.
    pub reject_address: bool,
    pub profile: Option<SlaveProfile>,
}

impl SimSlave {
    pub fn new(uuid: u32) -> Self {
        SimSlave {
            uuid,
            address: None,
            neighbor_control: true,
            link_enabled: true,
            reject_address: false,
            profile: None,
        }
    }

    pub fn with_address(mut self, address: u8) -> Self {
        self.address = Some(address);
        self
    }

    pub fn without_neighbor_control(mut self) -> Self {
        self.neighbor_control = false;
        self
    }

    pub fn with_profile(mut self, profile: SlaveProfile) -> Self {
        self.profile = Some(profile);
        self
    }
}

#[derive(Debug, Default)]
struct SimState {
    slaves: Vec<SimSlave>,
    pending: Vec<u8>,
    /// Every write with its timestamp, for pacing assertions.
    writes: Vec<(Instant, Vec<u8>)>,
}

impl SimState {
    fn reachable(&self, index: usize) -> bool {
        self.slaves[..index]
            .iter()
            .all(|gate| !gate.neighbor_control || gate.link_enabled)
    }

    fn reachable_indices(&self) -> Vec<usize> {
        (0..self.slaves.len()).filter(|&i| self.reachable(i)).collect()
    }

    fn handle_broadcast(&mut self, payload: &[u8]) {
        if payload.len() < 2 || payload[0] != 0x00 {
            return;
        }
        let reachable = self.reachable_indices();
        match payload[1] {
            // Address family.
            0x00 => self.handle_address_op(&payload[2..], &reachable),
            // Enable neighbor links: addressed devices open their gate.
            0x01 => {
                for &i in &reachable {
                    if self.slaves[i].address.is_some() {
                        self.slaves[i].link_enabled = true;
                    }
                }
            }
            // Disable neighbor links.
            0x02 => {
                for &i in &reachable {
                    if self.slaves[i].neighbor_control {
                        self.slaves[i].link_enabled = false;
                    }
                }
            }
            // Reset all addresses.
            0x03 => {
                for &i in &reachable {
                    self.slaves[i].address = None;
                }
            }
            // Assertion selectors.
            0x04 | 0x05 => {
                let target = SearchAddress::decode(&payload[2..]).expect("search address");
                let only_unaddressed = payload[1] == 0x05;
                let any = reachable.iter().any(|&i| {
                    let slave = &self.slaves[i];
                    (!only_unaddressed || slave.address.is_none()) && target.matches(slave.uuid)
                });
                if any {
                    // A collision pulse: not a decodable frame.
                    self.pending = vec![0x55];
                }
            }
            // Sleep: no reply.
            0x06 => {}
            _ => {}
        }
    }

    fn handle_address_op(&mut self, tail: &[u8], reachable: &[usize]) {
        match tail.len() {
            // Who-is-there: the unique unaddressed device replies.
            0 => {
                let unaddressed: Vec<usize> = reachable
                    .iter()
                    .copied()
                    .filter(|&i| self.slaves[i].address.is_none())
                    .collect();
                match unaddressed.as_slice() {
                    [] => {}
                    [only] => {
                        let uuid = self.slaves[*only].uuid;
                        self.pending = frame::encode(0, &uuid.to_le_bytes());
                    }
                    // Several talkers at once: the line carries garbage.
                    _ => self.pending = vec![0xFF],
                }
            }
            // Ping by UUID: no reply.
            4 => {}
            // Read address (tail 0x00) or reset (tail 0x01).
            5 => {
                let uuid = u32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]);
                let Some(&i) = reachable.iter().find(|&&i| self.slaves[i].uuid == uuid) else {
                    return;
                };
                match tail[4] {
                    0x00 => {
                        let address = self.slaves[i].address.unwrap_or(0);
                        self.pending = frame::encode(0, &[address]);
                    }
                    0x01 => self.slaves[i].address = None,
                    _ => {}
                }
            }
            // Set address.
            6 if tail[4] == 0x00 => {
                let uuid = u32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]);
                let Some(&i) = reachable.iter().find(|&&i| self.slaves[i].uuid == uuid) else {
                    return;
                };
                if self.slaves[i].reject_address {
                    self.pending = frame::encode(0, &[0]);
                } else {
                    self.slaves[i].address = Some(tail[5]);
                    self.pending = frame::encode(0, &[1]);
                }
            }
            _ => {}
        }
    }

    fn handle_unicast(&mut self, address: u8, payload: &[u8]) {
        let Some(i) = (0..self.slaves.len())
            .find(|&i| self.reachable(i) && self.slaves[i].address == Some(address))
        else {
            return;
        };

        // Ping: echo an empty frame.
        if payload.is_empty() {
            self.pending = frame::encode(address, &[]);
            return;
        }
        if payload[0] != 0x00 {
            return;
        }

        let uuid = self.slaves[i].uuid;
        let Some(profile) = self.slaves[i].profile.clone() else {
            return;
        };

        // Basic info is the bare family byte.
        if payload.len() == 1 {
            self.pending = frame::encode(address, &profile.info.encode());
            return;
        }

        let reply: Option<Vec<u8>> = match payload[1] {
            0x00 => Some(profile.name.as_bytes().to_vec()),
            0x01 => Some(profile.uptime_ticks.to_le_bytes().to_vec()),
            0x02 => Some(profile.version.as_bytes().to_vec()),
            0x07 => Some(profile.packet_stats.encode()),
            0x09 => profile.legacy_uuid.then(|| uuid.to_le_bytes().to_vec()),
            0x0A => {
                let ext = chainbus_protocol::ExtendedInfo {
                    device_name: profile.name.clone(),
                    version: profile.version.clone(),
                    buffer_size: self.buffer_size(&profile),
                };
                Some(ext.encode())
            }
            0x0B => {
                let mut buf = (profile.storage.len() as u32).to_le_bytes().to_vec();
                buf.extend_from_slice(&profile.page_size.to_le_bytes());
                Some(buf)
            }
            0x0C => Some(self.storage_read(i, &payload[2..])),
            0x0D => Some(self.storage_write(i, &payload[2..])),
            _ => None,
        };

        if let Some(reply) = reply {
            self.pending = frame::encode(address, &reply);
        }
    }

    fn buffer_size(&self, profile: &SlaveProfile) -> u16 {
        use chainbus_protocol::InfoLayout;
        match profile.info.layout {
            InfoLayout::Legacy { buffer_size, .. } => buffer_size,
            // Extended devices report it only through the extended block;
            // the sim keeps it alongside the storage geometry.
            InfoLayout::Extended { .. } => 64,
        }
    }

    fn storage_read(&mut self, i: usize, args: &[u8]) -> Vec<u8> {
        let offset = u32::from_le_bytes([args[0], args[1], args[2], args[3]]) as usize;
        let len = u16::from_le_bytes([args[4], args[5]]) as usize;
        let storage = &self.slaves[i].profile.as_ref().unwrap().storage;

        if offset + len > storage.len() {
            let mut reply = vec![1];
            reply.resize(1 + len, 0);
            return reply;
        }
        let mut reply = vec![0];
        reply.extend_from_slice(&storage[offset..offset + len]);
        reply
    }

    fn storage_write(&mut self, i: usize, args: &[u8]) -> Vec<u8> {
        let offset = u32::from_le_bytes([args[0], args[1], args[2], args[3]]) as usize;
        let data = &args[4..];
        let profile = self.slaves[i].profile.as_mut().unwrap();
        let page = profile.page_size as usize;

        if offset % page != 0 || offset + data.len() > profile.storage.len() {
            return vec![1];
        }

        // A write shorter than a page erases the remainder of that page.
        let end = offset + data.len();
        let erased_end = (end.div_ceil(page) * page).min(profile.storage.len());
        profile.storage[end..erased_end].fill(0);
        profile.storage[offset..end].copy_from_slice(data);
        vec![0]
    }
}

/// An in-memory bus with simulated slaves. Clones share state so tests
/// can inspect the bus after handing a clone to the driver.
#[derive(Clone, Default)]
pub struct SimBus {
    state: Arc<Mutex<SimState>>,
}

impl SimBus {
    pub fn new(slaves: Vec<SimSlave>) -> Self {
        SimBus {
            state: Arc::new(Mutex::new(SimState {
                slaves,
                ..Default::default()
            })),
        }
    }

    /// The assigned address of the slave with the given UUID.
    pub fn address_of(&self, uuid: u32) -> Option<u8> {
        let state = self.state.lock().unwrap();
        state.slaves.iter().find(|s| s.uuid == uuid).and_then(|s| s.address)
    }

    /// Timestamped raw writes, in order.
    pub fn writes(&self) -> Vec<(Instant, Vec<u8>)> {
        self.state.lock().unwrap().writes.clone()
    }

    /// Storage content of the slave with the given UUID.
    pub fn storage_of(&self, uuid: u32) -> Vec<u8> {
        let state = self.state.lock().unwrap();
        state
            .slaves
            .iter()
            .find(|s| s.uuid == uuid)
            .and_then(|s| s.profile.as_ref())
            .map(|p| p.storage.clone())
            .unwrap_or_default()
    }
}

impl Backend for SimBus {
    async fn clear_input(&mut self) -> bool {
        self.state.lock().unwrap().pending.clear();
        true
    }

    async fn transmit(&mut self, bytes: &[u8]) -> bool {
        let mut state = self.state.lock().unwrap();
        state.writes.push((Instant::now(), bytes.to_vec()));

        let Ok((address, payload)) = frame::decode(bytes) else {
            return true;
        };
        let payload = payload.to_vec();
        if address == 0 {
            state.handle_broadcast(&payload);
        } else {
            state.handle_unicast(address, &payload);
        }
        true
    }

    async fn receive(&mut self, expected_len: usize) -> Reception {
        let mut state = self.state.lock().unwrap();
        let take = expected_len.min(state.pending.len());
        let data: Vec<u8> = state.pending.drain(..take).collect();
        Reception {
            complete: data.len() == expected_len,
            data,
        }
    }
}
