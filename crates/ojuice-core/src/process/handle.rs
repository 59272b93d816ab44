#![cfg_attr(not(target_os = "windows"), allow(dead_code, unused_variables))]

use crate::error::{Error, Result};
use crate::process::{PointerWidth, ProcessMemory, ProcessProvider};

#[cfg(target_os = "windows")]
use tracing::warn;

#[cfg(target_os = "windows")]
use std::ffi::OsString;
#[cfg(target_os = "windows")]
use std::os::windows::ffi::OsStringExt;
#[cfg(target_os = "windows")]
use windows::Win32::Foundation::{BOOL, CloseHandle, HANDLE, HMODULE};
#[cfg(target_os = "windows")]
use windows::Win32::System::Diagnostics::Debug::{ReadProcessMemory, WriteProcessMemory};
#[cfg(target_os = "windows")]
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, PROCESSENTRY32W, Process32FirstW, Process32NextW, TH32CS_SNAPPROCESS,
};
#[cfg(target_os = "windows")]
use windows::Win32::System::ProcessStatus::{
    EnumProcessModulesEx, GetModuleBaseNameW, GetModuleInformation, LIST_MODULES_ALL, MODULEINFO,
};
#[cfg(target_os = "windows")]
use windows::Win32::System::Threading::{
    GetExitCodeProcess, IsWow64Process, OpenProcess, PROCESS_QUERY_INFORMATION, PROCESS_TERMINATE,
    PROCESS_VM_OPERATION, PROCESS_VM_READ, PROCESS_VM_WRITE, TerminateProcess,
};

/// Handle to an attached process, rooted at a named module's base address.
#[cfg(target_os = "windows")]
pub struct ProcessHandle {
    handle: HANDLE,
    pid: u32,
    module_base: u64,
    module_size: u32,
    pointer_width: PointerWidth,
}

#[cfg(not(target_os = "windows"))]
pub struct ProcessHandle {
    pid: u32,
    module_base: u64,
    module_size: u32,
    pointer_width: PointerWidth,
}

impl ProcessHandle {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn module_size(&self) -> u32 {
        self.module_size
    }
}

#[cfg(target_os = "windows")]
impl ProcessHandle {
    /// Open the named process and locate the named module.
    pub fn open_by_name(process_name: &str, module_name: &str) -> Result<Self> {
        let pid = find_process_id(process_name).map_err(|e| {
            tracing::debug!("Process detection failed: {}", e);
            e
        })?;
        tracing::debug!("Found {} with PID {}", process_name, pid);

        // SAFETY: OpenProcess is called with valid access flags and a process
        // ID obtained from CreateToolhelp32Snapshot. The returned handle is
        // managed by this struct and closed in Drop.
        let handle = unsafe {
            OpenProcess(
                PROCESS_QUERY_INFORMATION
                    | PROCESS_VM_READ
                    | PROCESS_VM_WRITE
                    | PROCESS_VM_OPERATION
                    | PROCESS_TERMINATE,
                false,
                pid,
            )
            .map_err(|e| {
                tracing::debug!("OpenProcess failed for PID {}: {}", pid, e);
                Error::ProcessOpenFailed(e.to_string())
            })?
        };

        let (module_base, module_size) = match find_module(handle, module_name) {
            Ok(info) => info,
            Err(e) => {
                // SAFETY: handle is a valid handle from OpenProcess that this
                // struct has not taken ownership of yet.
                let _ = unsafe { CloseHandle(handle) };
                return Err(e);
            }
        };

        Ok(Self {
            handle,
            pid,
            module_base,
            module_size,
            pointer_width: detect_pointer_width(handle),
        })
    }

    pub fn handle(&self) -> HANDLE {
        self.handle
    }
}

impl ProcessHandle {
    /// Check if the process is still running.
    #[cfg(target_os = "windows")]
    pub fn is_alive(&self) -> bool {
        const STILL_ACTIVE: u32 = 259;

        let mut exit_code: u32 = 0;
        // SAFETY: GetExitCodeProcess is called with a valid process handle
        // obtained from OpenProcess; exit_code is passed by mutable reference.
        unsafe {
            if GetExitCodeProcess(self.handle, &mut exit_code).is_ok() {
                exit_code == STILL_ACTIVE
            } else {
                false
            }
        }
    }

    /// Check if the process is still running (stub for non-Windows).
    #[cfg(not(target_os = "windows"))]
    pub fn is_alive(&self) -> bool {
        false
    }
}

#[cfg(not(target_os = "windows"))]
impl ProcessHandle {
    pub fn open_by_name(process_name: &str, _module_name: &str) -> Result<Self> {
        Err(Error::ProcessNotFound(
            "Windows only: process access not supported on this platform".to_string(),
        ))
    }
}

#[cfg(target_os = "windows")]
impl ProcessMemory for ProcessHandle {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; size];
        let mut bytes_read = 0;

        // SAFETY: ReadProcessMemory is called with a valid process handle
        // opened with PROCESS_VM_READ, a properly allocated buffer of the
        // requested size, and a pointer to receive the actual byte count.
        // Invalid target addresses fail cleanly through the Result.
        unsafe {
            ReadProcessMemory(
                self.handle,
                address as *const _,
                buffer.as_mut_ptr() as *mut _,
                size,
                Some(&mut bytes_read),
            )
            .map_err(|e| Error::MemoryReadFailed {
                address,
                message: e.to_string(),
            })?;
        }

        // All-or-nothing: a partial read of a scalar or name buffer is not
        // interpretable, so it is reported as a failed read.
        if bytes_read != size {
            return Err(Error::MemoryReadFailed {
                address,
                message: format!("Expected {} bytes, read {}", size, bytes_read),
            });
        }

        Ok(buffer)
    }

    fn write_bytes(&self, address: u64, bytes: &[u8]) -> Result<()> {
        let mut bytes_written = 0;

        // SAFETY: WriteProcessMemory is called with a valid process handle
        // opened with PROCESS_VM_WRITE | PROCESS_VM_OPERATION and a source
        // buffer of the stated length. Invalid target addresses fail cleanly
        // through the Result.
        unsafe {
            WriteProcessMemory(
                self.handle,
                address as *const _,
                bytes.as_ptr() as *const _,
                bytes.len(),
                Some(&mut bytes_written),
            )
            .map_err(|e| Error::MemoryWriteFailed {
                address,
                message: e.to_string(),
            })?;
        }

        if bytes_written != bytes.len() {
            return Err(Error::MemoryWriteFailed {
                address,
                message: format!("Expected {} bytes, wrote {}", bytes.len(), bytes_written),
            });
        }

        Ok(())
    }

    fn module_base(&self) -> u64 {
        self.module_base
    }

    fn pointer_width(&self) -> PointerWidth {
        self.pointer_width
    }

    fn is_alive(&self) -> bool {
        ProcessHandle::is_alive(self)
    }

    fn terminate(&self) -> Result<()> {
        // SAFETY: TerminateProcess is called with a valid process handle
        // opened with PROCESS_TERMINATE.
        unsafe {
            TerminateProcess(self.handle, 1).map_err(|e| Error::TerminateFailed(e.to_string()))
        }
    }
}

#[cfg(not(target_os = "windows"))]
impl ProcessMemory for ProcessHandle {
    fn read_bytes(&self, address: u64, _size: usize) -> Result<Vec<u8>> {
        Err(Error::MemoryReadFailed {
            address,
            message: "Windows only: memory reading not supported on this platform".to_string(),
        })
    }

    fn write_bytes(&self, address: u64, _bytes: &[u8]) -> Result<()> {
        Err(Error::MemoryWriteFailed {
            address,
            message: "Windows only: memory writing not supported on this platform".to_string(),
        })
    }

    fn module_base(&self) -> u64 {
        self.module_base
    }

    fn pointer_width(&self) -> PointerWidth {
        self.pointer_width
    }

    fn is_alive(&self) -> bool {
        ProcessHandle::is_alive(self)
    }

    fn terminate(&self) -> Result<()> {
        Err(Error::TerminateFailed(
            "Windows only: process termination not supported on this platform".to_string(),
        ))
    }
}

#[cfg(target_os = "windows")]
impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if !self.handle.is_invalid() {
            // SAFETY: self.handle is a valid handle obtained from OpenProcess
            // and has not been closed yet.
            if let Err(e) = unsafe { CloseHandle(self.handle) } {
                warn!("Failed to close process handle: {}", e);
            }
        }
    }
}

/// Provider backed by the live OS process table.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeProvider;

impl ProcessProvider for NativeProvider {
    type Memory = ProcessHandle;

    fn attach(&self, process_name: &str, module_name: &str) -> Result<ProcessHandle> {
        ProcessHandle::open_by_name(process_name, module_name)
    }
}

#[cfg(target_os = "windows")]
fn find_process_id(name: &str) -> Result<u32> {
    // SAFETY: CreateToolhelp32Snapshot with TH32CS_SNAPPROCESS is safe to
    // call. The returned handle is closed at the end of this function.
    let snapshot = unsafe {
        CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0)
            .map_err(|e| Error::ProcessNotFound(e.to_string()))?
    };

    let mut entry = PROCESSENTRY32W {
        dwSize: std::mem::size_of::<PROCESSENTRY32W>() as u32,
        ..Default::default()
    };

    // SAFETY: Process32FirstW and Process32NextW are safe to call with a
    // valid snapshot handle and a properly initialized PROCESSENTRY32W.
    // szExeFile is guaranteed null-terminated by the API; the unwrap_or
    // fallback covers the full buffer if that invariant were ever violated.
    let result = unsafe {
        if Process32FirstW(snapshot, &mut entry).is_ok() {
            loop {
                let exe_name = OsString::from_wide(
                    &entry.szExeFile[..entry
                        .szExeFile
                        .iter()
                        .position(|&c| c == 0)
                        .unwrap_or(entry.szExeFile.len())],
                );

                if exe_name.to_string_lossy().eq_ignore_ascii_case(name) {
                    let _ = CloseHandle(snapshot);
                    return Ok(entry.th32ProcessID);
                }

                if Process32NextW(snapshot, &mut entry).is_err() {
                    break;
                }
            }
        }
        Err(Error::ProcessNotFound(format!(
            "Process '{}' not found",
            name
        )))
    };

    // SAFETY: snapshot is a valid handle from CreateToolhelp32Snapshot
    let _ = unsafe { CloseHandle(snapshot) };
    result
}

/// Locate a loaded module by base name and return its base address and size.
#[cfg(target_os = "windows")]
fn find_module(handle: HANDLE, module_name: &str) -> Result<(u64, u32)> {
    let mut modules = [HMODULE::default(); 1024];
    let mut needed: u32 = 0;

    // SAFETY: EnumProcessModulesEx is called with a valid process handle and
    // a modules array large enough for typical module counts; needed receives
    // the byte count actually required.
    unsafe {
        EnumProcessModulesEx(
            handle,
            modules.as_mut_ptr(),
            (modules.len() * std::mem::size_of::<HMODULE>()) as u32,
            &mut needed,
            LIST_MODULES_ALL,
        )
        .map_err(|e| Error::ProcessOpenFailed(format!("Failed to enumerate modules: {}", e)))?;
    }

    let count = (needed as usize / std::mem::size_of::<HMODULE>()).min(modules.len());
    for module in &modules[..count] {
        let mut name_buf = [0u16; 260];
        // SAFETY: GetModuleBaseNameW is called with a valid process handle, a
        // module handle from the enumeration above, and a bounded buffer.
        let len = unsafe { GetModuleBaseNameW(handle, *module, &mut name_buf) } as usize;
        if len == 0 {
            continue;
        }
        let name = OsString::from_wide(&name_buf[..len]);
        if !name.to_string_lossy().eq_ignore_ascii_case(module_name) {
            continue;
        }

        let mut info = MODULEINFO::default();
        // SAFETY: GetModuleInformation is called with a valid process handle,
        // a module handle from the enumeration, and a properly sized struct.
        unsafe {
            GetModuleInformation(
                handle,
                *module,
                &mut info,
                std::mem::size_of::<MODULEINFO>() as u32,
            )
            .map_err(|e| Error::ProcessOpenFailed(format!("Failed to get module info: {}", e)))?;
        }
        return Ok((info.lpBaseOfDll as u64, info.SizeOfImage));
    }

    Err(Error::ModuleNotFound(format!(
        "Module '{}' not found in target process",
        module_name
    )))
}

/// Detect the target's pointer width. A WOW64 process is a 32-bit image on a
/// 64-bit host; anything else on a modern install is native width.
#[cfg(target_os = "windows")]
fn detect_pointer_width(handle: HANDLE) -> PointerWidth {
    let mut wow64 = BOOL::default();
    // SAFETY: IsWow64Process is called with a valid process handle and a
    // properly initialized output flag.
    let is_wow64 = unsafe { IsWow64Process(handle, &mut wow64).is_ok() } && wow64.as_bool();
    if is_wow64 {
        PointerWidth::Bits32
    } else {
        PointerWidth::Bits64
    }
}
