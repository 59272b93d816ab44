//! Polling synchronization engine.
//!
//! One tick: silently re-attach if needed, resolve and read every roster
//! field (writing locked values first), publish a snapshot, and refresh the
//! player name buffers. Per-field failures are soft; only "a field failed
//! and the process is gone" detaches the session.

use std::collections::HashMap;
use std::time::Duration;

use strum::Display;
use tracing::{debug, info};

use crate::config::{AppConfig, clamp_poll_interval};
use crate::error::{Error, Result};
use crate::offset::{AddressResolver, FieldKey, MatchKind, OffsetTable, PLAYER_COUNT};
use crate::process::{ProcessMemory, ProcessProvider};
use crate::session::ProcessSession;
use crate::text::decode_name;

/// Connection status surfaced to the front-end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Status {
    #[default]
    Detached,
    Waiting,
    Detected,
}

/// One field's published state after a tick.
#[derive(Debug, Clone)]
pub struct FieldReading {
    pub key: FieldKey,
    /// `None` when the field could not be resolved or read this tick.
    pub value: Option<i32>,
    pub configured: bool,
}

/// Everything a front-end needs to render after one tick.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub status: Status,
    pub fields: Vec<FieldReading>,
    /// Last successfully read round counter.
    pub round: Option<i32>,
    /// Decoded player names by seat index; empty string when unavailable.
    pub names: Vec<(u8, String)>,
}

/// Drives address resolution and memory I/O on a polling cadence.
pub struct SyncEngine<P: ProcessProvider> {
    table: OffsetTable,
    session: ProcessSession<P>,
    locks: HashMap<FieldKey, i32>,
    poll_interval_ms: u64,
    status: Status,
    round: Option<i32>,
}

impl<P: ProcessProvider> SyncEngine<P> {
    pub fn new(provider: P, config: &AppConfig) -> Self {
        Self {
            session: ProcessSession::new(provider, &config.process_name, &config.module_name),
            table: config.table.clone(),
            locks: HashMap::new(),
            poll_interval_ms: clamp_poll_interval(config.poll_interval_ms),
            status: Status::Detached,
            round: None,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn attached(&self) -> bool {
        self.session.attached()
    }

    pub fn round(&self) -> Option<i32> {
        self.round
    }

    pub fn table(&self) -> &OffsetTable {
        &self.table
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Set the polling cadence, clamped to the supported bounds. Returns the
    /// effective value.
    pub fn set_poll_interval_ms(&mut self, ms: u64) -> u64 {
        self.poll_interval_ms = clamp_poll_interval(ms);
        self.poll_interval_ms
    }

    pub fn is_configured(&self, key: &FieldKey) -> bool {
        AddressResolver::new(&self.table).is_configured(key)
    }

    /// Explicit user-triggered attach; failures surface to the caller.
    pub fn attach(&mut self) -> Result<()> {
        match self.session.attach() {
            Ok(()) => {
                self.status = Status::Detected;
                Ok(())
            }
            Err(e) => {
                self.status = Status::Waiting;
                Err(e)
            }
        }
    }

    /// Detach without touching the target process.
    pub fn detach(&mut self) {
        self.session.detach();
        self.status = Status::Waiting;
    }

    /// Terminate the target process. The session ends up detached whether or
    /// not the OS call succeeds.
    pub fn terminate(&mut self) -> Result<()> {
        let result = self.session.terminate();
        if !self.session.attached() && self.status == Status::Detected {
            self.status = Status::Waiting;
        }
        result
    }

    /// Freeze a field at a value; every tick rewrites it before reading back.
    pub fn set_lock(&mut self, key: FieldKey, value: i32) -> Result<()> {
        if !self.is_configured(&key) {
            return Err(Error::NotConfigured(key.to_string()));
        }
        self.locks.insert(key, value);
        Ok(())
    }

    pub fn clear_lock(&mut self, key: &FieldKey) {
        self.locks.remove(key);
    }

    pub fn locked_value(&self, key: &FieldKey) -> Option<i32> {
        self.locks.get(key).copied()
    }

    /// Run one synchronization tick.
    ///
    /// When detached, attempts a silent re-attach first; a failed attempt
    /// publishes status only, with no error. Fields are processed in roster
    /// order and fail independently: a field that cannot be resolved or read
    /// publishes `None` and the tick moves on. The session detaches only
    /// when at least one field failed *and* the liveness probe says the
    /// process is gone; transient unreadability with a live process (e.g.
    /// not yet in a match) keeps the attachment.
    pub fn refresh_tick(&mut self) -> Snapshot {
        if !self.session.attached() {
            match self.session.attach() {
                Ok(()) => self.status = Status::Detected,
                Err(e) => {
                    debug!("Background attach failed: {}", e);
                    self.status = Status::Waiting;
                    return self.partial_snapshot(Vec::new());
                }
            }
        }

        let roster = FieldKey::roster();
        let mut fields = Vec::with_capacity(roster.len());
        let mut had_error = false;

        for key in roster {
            let configured = self.is_configured(&key);
            let value = match self.tick_field(&key) {
                Ok(value) => Some(value),
                Err(e) => {
                    had_error = true;
                    debug!("Field {} unreadable this tick: {}", key, e);
                    None
                }
            };
            if key == FieldKey::Match(MatchKind::RoundCount)
                && let Some(round) = value
            {
                self.round = Some(round);
            }
            fields.push(FieldReading {
                key,
                value,
                configured,
            });
        }

        if had_error && !self.session.is_alive() {
            info!("Process exited, detaching");
            self.session.detach();
            self.status = Status::Waiting;
            return self.partial_snapshot(fields);
        }

        let names = self.refresh_names();
        Snapshot {
            status: self.status,
            fields,
            round: self.round,
            names,
        }
    }

    /// Write a value to a field's primary address and its mirror location.
    ///
    /// At most one mirror source applies per key: the listed double-write
    /// field offsets, the star secondary chain, or the generic double-write
    /// chain, in that order. A mirror that resolves to the primary address
    /// is skipped rather than written twice.
    pub fn write_field(&self, key: &FieldKey, value: i32) -> Result<()> {
        let resolver = AddressResolver::new(&self.table);
        if !resolver.is_configured(key) {
            return Err(Error::NotConfigured(key.to_string()));
        }
        let memory = self.session.memory()?;
        let canonical = resolver.canonical_key(key);
        let primary = resolver.resolve(memory, key)?;
        memory.write_i32(primary, value)?;

        if let Some(offsets) = self.table.double_write_fields.get(&canonical) {
            for &offset in offsets {
                let mirror = resolver.direct_field_address(memory, offset)?;
                if mirror != primary {
                    memory.write_i32(mirror, value)?;
                }
            }
        } else if canonical.ends_with("_star") {
            if let Some(chain) = resolver.star_mirror_chain(&canonical) {
                let mirror = resolver.walk_chain(memory, &canonical, &chain)?;
                if mirror != primary {
                    memory.write_i32(mirror, value)?;
                }
            }
        } else if let Some(chain) = self.table.double_write.get(&canonical) {
            let mirror = resolver.walk_chain(memory, &canonical, chain)?;
            if mirror != primary {
                memory.write_i32(mirror, value)?;
            }
        }
        Ok(())
    }

    fn tick_field(&self, key: &FieldKey) -> Result<i32> {
        if let Some(locked) = self.locks.get(key).copied() {
            self.write_field(key, locked)?;
        }
        let memory = self.session.memory()?;
        let address = AddressResolver::new(&self.table).resolve(memory, key)?;
        memory.read_i32(address)
    }

    fn refresh_names(&self) -> Vec<(u8, String)> {
        let Ok(memory) = self.session.memory() else {
            return Vec::new();
        };
        let resolver = AddressResolver::new(&self.table);
        let mut names = Vec::with_capacity(PLAYER_COUNT as usize);
        for index in 1..=PLAYER_COUNT {
            let text = match resolver.resolve_name_span(memory, index) {
                Ok(Some((start, len))) if len > 0 => match memory.read_bytes(start, len) {
                    Ok(raw) => decode_name(&raw),
                    Err(e) => {
                        debug!("Name buffer for player {} unreadable: {}", index, e);
                        String::new()
                    }
                },
                Ok(_) => String::new(),
                Err(e) => {
                    debug!("Name chain for player {} unresolvable: {}", index, e);
                    String::new()
                }
            };
            names.push((index, text));
        }
        names
    }

    fn partial_snapshot(&self, fields: Vec<FieldReading>) -> Snapshot {
        Snapshot {
            status: self.status,
            fields,
            round: self.round,
            names: Vec::new(),
        }
    }
}
