//! Field-key to address resolution.
//!
//! Resolution precedence, in order: player-1 alias canonicalization,
//! stride-derived player instances, module-relative fields, pointer-chain
//! walk, direct-field fallback. Addresses are never cached; every call walks
//! the configured chains against live process memory.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::offset::key::{FieldKey, PlayerStat};
use crate::offset::{NameRange, OffsetTable};
use crate::process::ProcessMemory;

/// Maps logical field keys to absolute addresses inside an attached process.
pub struct AddressResolver<'a> {
    table: &'a OffsetTable,
}

impl<'a> AddressResolver<'a> {
    pub fn new(table: &'a OffsetTable) -> Self {
        Self { table }
    }

    /// Canonical table key for a field.
    ///
    /// `player1_*` aliases to the bare `player_*` entry when that entry
    /// exists in the pointer-chain table and the raw key itself is not
    /// configured as a chain or direct field. Every other key canonicalizes
    /// to itself.
    pub fn canonical_key(&self, key: &FieldKey) -> String {
        let raw = key.to_string();
        if self.table.pointer_chains.contains_key(&raw) || self.table.fields.contains_key(&raw) {
            return raw;
        }
        if let FieldKey::Player { index: 1, stat } = key {
            let base = format!("player_{stat}");
            if self.table.pointer_chains.contains_key(&base) {
                return base;
            }
        }
        raw
    }

    /// Resolves a field key to an absolute address.
    ///
    /// Keys with no configuration entry anywhere fall through to the
    /// direct-field path with offset 0; callers distinguish that case via
    /// [`AddressResolver::is_configured`].
    pub fn resolve(&self, memory: &impl ProcessMemory, key: &FieldKey) -> Result<u64> {
        let canonical = self.canonical_key(key);
        if let Some(chain) = self.derived_chain(&canonical) {
            return self.walk_chain(memory, &canonical, &chain);
        }
        if let Some(&offset) = self.table.module_fields.get(&canonical) {
            return Ok(memory.module_base() + offset);
        }
        if let Some(chain) = self.table.pointer_chains.get(&canonical) {
            return self.walk_chain(memory, &canonical, chain);
        }
        let offset = self.table.fields.get(&canonical).copied().unwrap_or(0);
        self.direct_field_address(memory, offset)
    }

    /// Whether the active table covers this key through any source:
    /// module fields, pointer chains, direct fields, either double-write
    /// table, or a resolvable stride derivation.
    pub fn is_configured(&self, key: &FieldKey) -> bool {
        if let FieldKey::PlayerName { index } = key {
            return self.name_range(*index).is_some();
        }
        let canonical = self.canonical_key(key);
        self.table.module_fields.contains_key(&canonical)
            || self.table.pointer_chains.contains_key(&canonical)
            || self.table.fields.contains_key(&canonical)
            || self.table.double_write.contains_key(&canonical)
            || self.table.double_write_fields.contains_key(&canonical)
            || self.derived_chain(&canonical).is_some()
    }

    /// Address of a direct field: one dereference of the session base
    /// pointer, then the field offset.
    pub(crate) fn direct_field_address(
        &self,
        memory: &impl ProcessMemory,
        offset: u64,
    ) -> Result<u64> {
        let base_ptr = memory.read_pointer(memory.module_base() + self.table.base_offset)?;
        Ok(base_ptr + offset)
    }

    /// Walks a pointer chain to its final address.
    ///
    /// The first element is dereferenced at the module base, every middle
    /// element is dereferenced after being added, and the last element is
    /// added without a dereference. A single-element chain resolves to the
    /// dereferenced root itself.
    pub(crate) fn walk_chain(
        &self,
        memory: &impl ProcessMemory,
        key: &str,
        chain: &[u64],
    ) -> Result<u64> {
        let Some((&root, rest)) = chain.split_first() else {
            return Err(Error::EmptyChain(key.to_string()));
        };
        let mut ptr = memory.read_pointer(memory.module_base() + root)?;
        let Some((&last, hops)) = rest.split_last() else {
            return Ok(ptr);
        };
        for &offset in hops {
            ptr = memory.read_pointer(ptr + offset)?;
        }
        Ok(ptr + last)
    }

    /// Stride-derived pointer chain for replicated player stats.
    ///
    /// hp and win derive seats 2-4 from the `player_hp` / `player_win`
    /// chain with `(index - 1) * stride`; star keeps `player2_star` as its
    /// own base entry and derives seats 3-4 from it with
    /// `(index - 2) * stride`. The stride lands on the last chain element
    /// only. Returns `None` when the base chain or stride is missing, which
    /// sends resolution on to the generic lookups.
    fn derived_chain(&self, canonical: &str) -> Option<Vec<u64>> {
        let key: FieldKey = canonical.parse().ok()?;
        let FieldKey::Player { index, stat } = key else {
            return None;
        };
        match stat {
            PlayerStat::Hp => replicated_chain(
                &self.table.pointer_chains,
                "player_hp",
                index,
                1,
                self.table.strides.hp,
            ),
            PlayerStat::Win => replicated_chain(
                &self.table.pointer_chains,
                "player_win",
                index,
                1,
                self.table.strides.win,
            ),
            PlayerStat::Star => star_chain(&self.table.pointer_chains, index, self.table.strides.star),
        }
    }

    /// Secondary chain for star writes, sourced from the double-write table
    /// with the same seat derivation as primary star resolution. Accepts
    /// both the raw and alias spellings of the player-1 key.
    pub(crate) fn star_mirror_chain(&self, canonical: &str) -> Option<Vec<u64>> {
        if canonical == "player_star" {
            return self.table.double_write.get("player_star").cloned();
        }
        let key: FieldKey = canonical.parse().ok()?;
        let FieldKey::Player {
            index,
            stat: PlayerStat::Star,
        } = key
        else {
            return None;
        };
        star_chain(&self.table.double_write, index, self.table.strides.star)
    }

    /// Name-buffer descriptor for a player seat, honoring the player-1
    /// alias (`player_name`).
    pub fn name_range(&self, index: u8) -> Option<&NameRange> {
        let raw = format!("player{index}_name");
        if let Some(range) = self.table.name_ranges.get(&raw) {
            return Some(range);
        }
        if index == 1 {
            return self.table.name_ranges.get("player_name");
        }
        None
    }

    /// Resolves a player's name buffer to `(start address, byte length)`.
    ///
    /// Start and end are resolved as two independent walks of the same
    /// chain prefix, not one walk with two tails. Returns `Ok(None)` when
    /// no range is configured for the seat; a zero length means the bounds
    /// are inverted or empty and the caller should publish an empty name.
    pub fn resolve_name_span(
        &self,
        memory: &impl ProcessMemory,
        index: u8,
    ) -> Result<Option<(u64, usize)>> {
        let Some(range) = self.name_range(index) else {
            return Ok(None);
        };
        let key = format!("player{index}_name");

        let mut chain = range.chain.clone();
        chain.push(range.start);
        let start = self.walk_chain(memory, &key, &chain)?;

        if let Some(last) = chain.last_mut() {
            *last = range.end;
        }
        let end = self.walk_chain(memory, &key, &chain)?;

        let len = (end + 1).saturating_sub(start) as usize;
        Ok(Some((start, len)))
    }
}

/// Copies a base chain and advances its last element by
/// `(index - base_index) * stride`. The base seat gets the chain verbatim;
/// other seats require a non-empty chain and a non-zero stride.
fn replicated_chain(
    source: &HashMap<String, Vec<u64>>,
    base_key: &str,
    index: u8,
    base_index: u8,
    stride: u64,
) -> Option<Vec<u64>> {
    let chain = source.get(base_key)?;
    if index == base_index {
        return Some(chain.clone());
    }
    if chain.is_empty() || stride == 0 {
        return None;
    }
    let mut derived = chain.clone();
    if let Some(last) = derived.last_mut() {
        *last += u64::from(index - base_index) * stride;
    }
    Some(derived)
}

/// Star chains: seat 1 resolves through `player_star`, seats 2-4 through
/// `player2_star` with the stride applied from seat 2.
fn star_chain(source: &HashMap<String, Vec<u64>>, index: u8, stride: u64) -> Option<Vec<u64>> {
    if index == 1 {
        return source.get("player_star").cloned();
    }
    replicated_chain(source, "player2_star", index, 2, stride)
}
