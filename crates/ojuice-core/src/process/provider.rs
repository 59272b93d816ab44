//! Process attachment abstraction for testability.
//!
//! The provider trait separates "how to open a process" from everything the
//! session and engine do with it, enabling mock implementations for testing
//! without a running game process.

use crate::error::Result;
use crate::process::ProcessMemory;

/// Trait for opening a target process by name.
pub trait ProcessProvider {
    /// The memory access type returned by a successful attach.
    type Memory: ProcessMemory;

    /// Open the named process and locate the named module, returning memory
    /// access rooted at that module's base address.
    fn attach(&self, process_name: &str, module_name: &str) -> Result<Self::Memory>;
}
