//! Mock process for testing.
//!
//! Provides a writable in-memory implementation of the `ProcessMemory`
//! trait plus a builder for laying out pointer structures, so resolver and
//! engine logic can be verified without access to a real process.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::process::{PointerWidth, ProcessMemory, ProcessProvider};

/// In-memory stand-in for an attached process.
///
/// Clones share the same backing buffer and liveness flag, letting a test
/// keep a handle to memory it has handed to a session and inspect it after
/// engine writes, or flip liveness mid-test.
#[derive(Debug, Clone)]
pub struct MockProcess {
    data: Rc<RefCell<Vec<u8>>>,
    base: u64,
    width: PointerWidth,
    alive: Rc<Cell<bool>>,
    writes: Rc<Cell<usize>>,
}

impl MockProcess {
    /// Number of `write_bytes` calls that have hit this process.
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }

    /// Flip the liveness flag; an exited mock also refuses re-attachment
    /// through [`MockProvider`].
    pub fn set_alive(&self, alive: bool) {
        self.alive.set(alive);
    }

    fn check_range(&self, address: u64, size: usize) -> Result<usize> {
        if address < self.base {
            return Err(Error::MemoryReadFailed {
                address,
                message: format!("Address below base (base={:#x})", self.base),
            });
        }
        let offset = (address - self.base) as usize;
        if offset + size > self.data.borrow().len() {
            return Err(Error::MemoryReadFailed {
                address,
                message: format!(
                    "Out of bounds: offset={}, size={}, len={}",
                    offset,
                    size,
                    self.data.borrow().len()
                ),
            });
        }
        Ok(offset)
    }
}

impl ProcessMemory for MockProcess {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        let offset = self.check_range(address, size)?;
        Ok(self.data.borrow()[offset..offset + size].to_vec())
    }

    fn write_bytes(&self, address: u64, bytes: &[u8]) -> Result<()> {
        let offset = self.check_range(address, bytes.len()).map_err(|e| {
            let Error::MemoryReadFailed { address, message } = e else {
                return e;
            };
            Error::MemoryWriteFailed { address, message }
        })?;
        self.data.borrow_mut()[offset..offset + bytes.len()].copy_from_slice(bytes);
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn module_base(&self) -> u64 {
        self.base
    }

    fn pointer_width(&self) -> PointerWidth {
        self.width
    }

    fn is_alive(&self) -> bool {
        self.alive.get()
    }

    fn terminate(&self) -> Result<()> {
        if !self.alive.get() {
            return Err(Error::TerminateFailed(
                "Mock process already exited".to_string(),
            ));
        }
        self.alive.set(false);
        Ok(())
    }
}

/// Builder for laying out mock process memory.
#[derive(Debug, Clone)]
pub struct MockProcessBuilder {
    data: Vec<u8>,
    base: u64,
    width: PointerWidth,
}

impl Default for MockProcessBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProcessBuilder {
    /// New builder with base address 0x1000 and 64-bit pointers.
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            base: 0x1000,
            width: PointerWidth::Bits64,
        }
    }

    /// Set the module base address.
    pub fn base(mut self, base: u64) -> Self {
        self.base = base;
        self
    }

    /// Set the pointer width reads will assume.
    pub fn width(mut self, width: PointerWidth) -> Self {
        self.width = width;
        self
    }

    /// Pre-allocate the buffer with zeros up to the specified size.
    pub fn with_size(mut self, size: usize) -> Self {
        if self.data.len() < size {
            self.data.resize(size, 0);
        }
        self
    }

    /// Write a native-width pointer value at the given offset from base.
    pub fn write_ptr(mut self, offset: usize, value: u64) -> Self {
        match self.width {
            PointerWidth::Bits32 => {
                self.ensure_size(offset + 4);
                self.data[offset..offset + 4].copy_from_slice(&(value as u32).to_le_bytes());
            }
            PointerWidth::Bits64 => {
                self.ensure_size(offset + 8);
                self.data[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
            }
        }
        self
    }

    /// Write a signed 32-bit integer at the given offset from base.
    pub fn write_i32(mut self, offset: usize, value: i32) -> Self {
        self.ensure_size(offset + 4);
        self.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        self
    }

    /// Write raw bytes at the given offset from base.
    pub fn write_bytes_at(mut self, offset: usize, bytes: &[u8]) -> Self {
        self.ensure_size(offset + bytes.len());
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        self
    }

    /// Write a null-terminated UTF-8 string at the given offset from base.
    pub fn write_utf8(mut self, offset: usize, text: &str) -> Self {
        let bytes = text.as_bytes();
        self.ensure_size(offset + bytes.len() + 1);
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        self.data[offset + bytes.len()] = 0;
        self
    }

    /// Write a null-terminated Shift-JIS string at the given offset from base.
    pub fn write_shift_jis(mut self, offset: usize, text: &str) -> Self {
        use encoding_rs::SHIFT_JIS;
        let (encoded, _, _) = SHIFT_JIS.encode(text);
        let bytes = encoded.into_owned();
        self.ensure_size(offset + bytes.len() + 1);
        self.data[offset..offset + bytes.len()].copy_from_slice(&bytes);
        self.data[offset + bytes.len()] = 0;
        self
    }

    /// Build the mock process, alive by default.
    pub fn build(self) -> MockProcess {
        MockProcess {
            data: Rc::new(RefCell::new(self.data)),
            base: self.base,
            width: self.width,
            alive: Rc::new(Cell::new(true)),
            writes: Rc::new(Cell::new(0)),
        }
    }

    fn ensure_size(&mut self, required: usize) {
        if self.data.len() < required {
            self.data.resize(required, 0);
        }
    }
}

/// Provider handing out a preconfigured mock process.
#[derive(Debug, Clone, Default)]
pub struct MockProvider {
    pub process: Option<MockProcess>,
}

impl MockProvider {
    pub fn new(process: MockProcess) -> Self {
        Self {
            process: Some(process),
        }
    }

    /// Provider with no process, so every attach fails.
    pub fn absent() -> Self {
        Self { process: None }
    }
}

impl ProcessProvider for MockProvider {
    type Memory = MockProcess;

    fn attach(&self, process_name: &str, _module_name: &str) -> Result<MockProcess> {
        match &self.process {
            Some(process) if process.is_alive() => Ok(process.clone()),
            _ => Err(Error::ProcessNotFound(format!(
                "Mock process '{process_name}' not running"
            ))),
        }
    }
}
