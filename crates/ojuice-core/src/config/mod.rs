//! Configuration loading and saving.
//!
//! The on-disk format is JSON with every offset, chain element, and stride
//! written as a hex string (`"0x1A"`, prefix optional), matching the
//! config.json files already in circulation. Loading converts everything to
//! integers up front; the rest of the crate never sees a hex string.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::offset::{NameRange, OffsetTable, Strides};

/// Lower bound for the polling cadence in milliseconds.
pub const MIN_POLL_INTERVAL_MS: u64 = 50;
/// Upper bound for the polling cadence in milliseconds.
pub const MAX_POLL_INTERVAL_MS: u64 = 5000;
/// Default polling cadence in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 300;

pub const DEFAULT_PROCESS_NAME: &str = "100orange.exe";

/// Clamp a poll interval into the supported range.
pub fn clamp_poll_interval(ms: u64) -> u64 {
    ms.clamp(MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS)
}

/// Fully parsed application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub process_name: String,
    pub module_name: String,
    pub poll_interval_ms: u64,
    pub table: OffsetTable,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            process_name: DEFAULT_PROCESS_NAME.to_string(),
            module_name: DEFAULT_PROCESS_NAME.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            table: OffsetTable::default(),
        }
    }
}

impl AppConfig {
    /// Load and parse a config file, validating chain shape.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse config JSON, validating chain shape.
    pub fn parse(content: &str) -> Result<Self> {
        let raw: RawConfig = serde_json::from_str(content)?;
        let config = Self::from_raw(raw)?;
        config.table.validate()?;
        Ok(config)
    }

    /// Save the configuration back in the hex-string on-disk form.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let raw = RawConfig::from(self);
        fs::write(path, serde_json::to_string_pretty(&raw)?)?;
        Ok(())
    }

    fn from_raw(raw: RawConfig) -> Result<Self> {
        let table = OffsetTable {
            base_offset: parse_hex(&raw.base_offset)?,
            fields: parse_hex_map(raw.fields)?,
            module_fields: parse_hex_map(raw.module_fields)?,
            pointer_chains: parse_hex_chains(raw.pointer_chains)?,
            double_write: parse_hex_chains(raw.double_write)?,
            double_write_fields: parse_hex_chains(raw.double_write_fields)?,
            name_ranges: raw
                .name_ranges
                .into_iter()
                .map(|(key, range)| {
                    Ok((
                        key,
                        NameRange {
                            chain: parse_hex_list(range.chain)?,
                            start: parse_hex(&range.start)?,
                            end: parse_hex(&range.end)?,
                        },
                    ))
                })
                .collect::<Result<HashMap<_, _>>>()?,
            strides: Strides {
                hp: parse_hex(&raw.hp_stride)?,
                win: parse_hex(&raw.win_stride)?,
                star: parse_hex(&raw.star_stride)?,
            },
        };
        Ok(Self {
            process_name: raw.process_name,
            module_name: raw.module_name,
            poll_interval_ms: clamp_poll_interval(raw.poll_interval_ms),
            table,
        })
    }
}

/// On-disk shape: everything stays a string until parsed.
#[derive(Debug, Serialize, Deserialize)]
struct RawConfig {
    #[serde(default = "default_process_name")]
    process_name: String,
    #[serde(default = "default_process_name")]
    module_name: String,
    #[serde(default = "default_hex_zero")]
    base_offset: String,
    #[serde(default)]
    fields: BTreeMap<String, String>,
    #[serde(default)]
    module_fields: BTreeMap<String, String>,
    #[serde(default)]
    pointer_chains: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    name_ranges: BTreeMap<String, RawNameRange>,
    #[serde(default)]
    double_write: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    double_write_fields: BTreeMap<String, Vec<String>>,
    #[serde(default = "default_hex_zero")]
    hp_stride: String,
    #[serde(default = "default_hex_zero")]
    win_stride: String,
    #[serde(default = "default_hex_zero")]
    star_stride: String,
    #[serde(default = "default_poll_interval")]
    poll_interval_ms: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawNameRange {
    #[serde(default)]
    chain: Vec<String>,
    #[serde(default = "default_hex_zero")]
    start: String,
    #[serde(default = "default_hex_zero")]
    end: String,
}

fn default_process_name() -> String {
    DEFAULT_PROCESS_NAME.to_string()
}

fn default_hex_zero() -> String {
    "0x0".to_string()
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl From<&AppConfig> for RawConfig {
    fn from(config: &AppConfig) -> Self {
        let table = &config.table;
        Self {
            process_name: config.process_name.clone(),
            module_name: config.module_name.clone(),
            base_offset: format_hex(table.base_offset),
            fields: format_hex_map(&table.fields),
            module_fields: format_hex_map(&table.module_fields),
            pointer_chains: format_hex_chains(&table.pointer_chains),
            name_ranges: table
                .name_ranges
                .iter()
                .map(|(key, range)| {
                    (
                        key.clone(),
                        RawNameRange {
                            chain: range.chain.iter().copied().map(format_hex).collect(),
                            start: format_hex(range.start),
                            end: format_hex(range.end),
                        },
                    )
                })
                .collect(),
            double_write: format_hex_chains(&table.double_write),
            double_write_fields: format_hex_chains(&table.double_write_fields),
            hp_stride: format_hex(table.strides.hp),
            win_stride: format_hex(table.strides.win),
            star_stride: format_hex(table.strides.star),
            poll_interval_ms: config.poll_interval_ms,
        }
    }
}

fn parse_hex(value: &str) -> Result<u64> {
    let value = value.trim();
    // Strip hex prefix (case-insensitive), only once
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);

    u64::from_str_radix(digits, 16)
        .map_err(|e| Error::InvalidOffset(format!("Failed to parse '{}': {}", value, e)))
}

fn parse_hex_list(values: Vec<String>) -> Result<Vec<u64>> {
    values.iter().map(|v| parse_hex(v)).collect()
}

fn parse_hex_map(map: BTreeMap<String, String>) -> Result<HashMap<String, u64>> {
    map.into_iter()
        .map(|(key, value)| Ok((key, parse_hex(&value)?)))
        .collect()
}

fn parse_hex_chains(map: BTreeMap<String, Vec<String>>) -> Result<HashMap<String, Vec<u64>>> {
    map.into_iter()
        .map(|(key, values)| Ok((key, parse_hex_list(values)?)))
        .collect()
}

fn format_hex(value: u64) -> String {
    format!("{value:#x}")
}

fn format_hex_map(map: &HashMap<String, u64>) -> BTreeMap<String, String> {
    map.iter()
        .map(|(key, &value)| (key.clone(), format_hex(value)))
        .collect()
}

fn format_hex_chains(map: &HashMap<String, Vec<u64>>) -> BTreeMap<String, Vec<String>> {
    map.iter()
        .map(|(key, values)| (key.clone(), values.iter().copied().map(format_hex).collect()))
        .collect()
}
