//! Offload executor boundary
//!
//! The core algorithms are defined independent of where they execute. A GPU
//! (or any accelerator) backend plugs in behind this one capability
//! interface (buffer lifecycle plus program dispatch), implemented once per
//! target, never duplicated per operator. The crate ships [`CpuExecutor`],
//! a trivial host-memory implementation the core runs against end-to-end;
//! device backends live behind their own feature gates.

use crate::{GravwellError, GravwellResult};
use std::collections::HashMap;

/// Opaque handle to a buffer owned by an executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(u64);

/// Pluggable execution backend for elementwise/attention math over buffers
/// already resident on a device.
pub trait OffloadExecutor {
    /// Reserve a zero-initialized buffer of `byte_size` bytes.
    fn allocate(&mut self, byte_size: usize) -> GravwellResult<BufferHandle>;

    /// Copy host bytes into a buffer. The length must match the allocation.
    fn upload(&mut self, handle: BufferHandle, bytes: &[u8]) -> GravwellResult<()>;

    /// Copy a buffer back to host memory.
    fn download(&self, handle: BufferHandle) -> GravwellResult<Vec<u8>>;

    /// Run a named program over the given buffers.
    fn dispatch(
        &mut self,
        program_id: &str,
        buffers: &[BufferHandle],
        workgroup_counts: [u32; 3],
    ) -> GravwellResult<()>;

    /// Free a buffer. Using the handle afterwards is an error.
    fn release(&mut self, handle: BufferHandle) -> GravwellResult<()>;
}

/// Host program signature for the CPU executor: a closure over the dispatch
/// buffers, in the order they were passed.
pub type HostProgram = Box<dyn Fn(&mut [Vec<u8>]) + Send + Sync>;

/// Trivial CPU-only executor. Buffers are plain host vectors and programs
/// are registered closures; workgroup counts are accepted for interface
/// parity and ignored.
#[derive(Default)]
pub struct CpuExecutor {
    buffers: HashMap<u64, Vec<u8>>,
    programs: HashMap<String, HostProgram>,
    next_handle: u64,
}

impl CpuExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a host program under an id that `dispatch` can name.
    pub fn register_program(
        &mut self,
        program_id: impl Into<String>,
        program: HostProgram,
    ) {
        self.programs.insert(program_id.into(), program);
    }

    fn buffer(&self, handle: BufferHandle) -> GravwellResult<&Vec<u8>> {
        self.buffers
            .get(&handle.0)
            .ok_or_else(|| GravwellError::Backend(format!("unknown buffer handle {:?}", handle)))
    }
}

impl OffloadExecutor for CpuExecutor {
    fn allocate(&mut self, byte_size: usize) -> GravwellResult<BufferHandle> {
        let handle = BufferHandle(self.next_handle);
        self.next_handle += 1;
        self.buffers.insert(handle.0, vec![0u8; byte_size]);
        Ok(handle)
    }

    fn upload(&mut self, handle: BufferHandle, bytes: &[u8]) -> GravwellResult<()> {
        let buffer = self.buffers.get_mut(&handle.0).ok_or_else(|| {
            GravwellError::Backend(format!("unknown buffer handle {:?}", handle))
        })?;
        if buffer.len() != bytes.len() {
            return Err(GravwellError::Backend(format!(
                "upload of {} bytes into a {}-byte buffer",
                bytes.len(),
                buffer.len()
            )));
        }
        buffer.copy_from_slice(bytes);
        Ok(())
    }

    fn download(&self, handle: BufferHandle) -> GravwellResult<Vec<u8>> {
        Ok(self.buffer(handle)?.clone())
    }

    fn dispatch(
        &mut self,
        program_id: &str,
        buffers: &[BufferHandle],
        _workgroup_counts: [u32; 3],
    ) -> GravwellResult<()> {
        let program = self.programs.get(program_id).ok_or_else(|| {
            GravwellError::Backend(format!("unknown program '{program_id}'"))
        })?;

        // Move the buffers out so the program can borrow them all mutably.
        let mut staged = Vec::with_capacity(buffers.len());
        for handle in buffers {
            match self.buffers.remove(&handle.0) {
                Some(buffer) => staged.push(buffer),
                None => {
                    // Restore anything already staged before bailing.
                    for (handle, buffer) in buffers.iter().zip(staged.drain(..)) {
                        self.buffers.insert(handle.0, buffer);
                    }
                    return Err(GravwellError::Backend(format!(
                        "unknown buffer handle {:?}",
                        handle
                    )));
                }
            }
        }

        program(&mut staged);

        for (handle, buffer) in buffers.iter().zip(staged) {
            self.buffers.insert(handle.0, buffer);
        }
        Ok(())
    }

    fn release(&mut self, handle: BufferHandle) -> GravwellResult<()> {
        self.buffers.remove(&handle.0).map(|_| ()).ok_or_else(|| {
            GravwellError::Backend(format!("unknown buffer handle {:?}", handle))
        })
    }
}
