//! Process attachment and memory access.

mod handle;
mod memory;
mod provider;

// Mock process for testing (always available for unit and integration tests)
#[doc(hidden)]
pub mod mock;

pub use handle::{NativeProvider, ProcessHandle};
pub use memory::{PointerWidth, ProcessMemory};
pub use provider::ProcessProvider;

// Re-export mocks for convenient access in tests
#[doc(hidden)]
pub use mock::{MockProcess, MockProcessBuilder, MockProvider};
