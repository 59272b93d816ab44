//! Core engine for the ojuice live memory table.
//!
//! Turns a declarative offset/pointer-chain configuration into concrete
//! addresses inside a running 100% Orange Juice process, reads and writes
//! typed values there on a polling cadence, and keeps double-write mirror
//! locations consistent with every primary write.

pub mod config;
pub mod engine;
pub mod error;
pub mod offset;
pub mod process;
pub mod session;
pub mod text;

pub use config::AppConfig;
pub use engine::{FieldReading, Snapshot, Status, SyncEngine};
pub use error::{Error, Result};
pub use offset::{
    AddressResolver, CommonKind, FieldKey, MatchKind, NameRange, OffsetTable, PLAYER_COUNT,
    PlayerStat, Strides,
};
pub use process::{NativeProvider, PointerWidth, ProcessHandle, ProcessMemory, ProcessProvider};
pub use session::ProcessSession;
pub use text::decode_name;

// Re-exported for tests and downstream harnesses
#[doc(hidden)]
pub use process::{MockProcess, MockProcessBuilder, MockProvider};
