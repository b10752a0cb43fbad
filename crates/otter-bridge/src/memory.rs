//! Guest memory
//!
//! The bridge never owns guest buffers. It asks the guest allocator for
//! exactly as many bytes as a result needs, writes them, and hands the
//! pointer back; releasing the buffer is the guest's business.

use std::fmt;
use thiserror::Error;

/// Offset into guest linear memory (`0` is the null pointer)
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct GuestPtr(pub u32);

impl GuestPtr {
    /// The null pointer, also used to report "no result"
    pub const NULL: GuestPtr = GuestPtr(0);

    /// Check for null
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Byte offset as an index
    #[inline]
    pub const fn offset(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for GuestPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GuestPtr({:#x})", self.0)
    }
}

/// Guest memory access errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemoryError {
    /// Access past the end of memory
    #[error("out of bounds access at {ptr:#x} (+{len}) in {size} bytes of guest memory")]
    OutOfBounds {
        /// Start offset
        ptr: u32,
        /// Access length
        len: usize,
        /// Current memory size
        size: usize,
    },

    /// The guest allocator returned null
    #[error("guest allocator failed to provide {size} bytes")]
    AllocationFailed {
        /// Requested size
        size: usize,
    },

    /// Null pointer dereference
    #[error("null guest pointer")]
    NullPointer,
}

/// The guest's allocator and linear memory, as seen by the bridge
pub trait GuestMemory {
    /// Allocate `size` bytes owned by the guest; null on failure
    fn malloc(&mut self, size: usize) -> GuestPtr;

    /// Copy `bytes` into guest memory at `ptr`
    fn write(&mut self, ptr: GuestPtr, bytes: &[u8]) -> Result<(), MemoryError>;

    /// Borrow `len` bytes of guest memory at `ptr`
    fn read(&self, ptr: GuestPtr, len: usize) -> Result<&[u8], MemoryError>;

    /// Current memory size in bytes
    fn size(&self) -> usize;
}

/// Allocate a buffer holding `bytes` and return its address
pub fn alloc_bytes(memory: &mut dyn GuestMemory, bytes: &[u8]) -> Result<GuestPtr, MemoryError> {
    let ptr = memory.malloc(bytes.len());
    if ptr.is_null() {
        return Err(MemoryError::AllocationFailed { size: bytes.len() });
    }
    memory.write(ptr, bytes)?;
    Ok(ptr)
}

/// Read a NUL-terminated UTF-8 string
pub fn read_c_string(memory: &dyn GuestMemory, ptr: GuestPtr) -> Result<String, MemoryError> {
    if ptr.is_null() {
        return Err(MemoryError::NullPointer);
    }
    let available = memory.size().saturating_sub(ptr.offset());
    let bytes = memory.read(ptr, available)?;
    let end = bytes.iter().position(|&b| b == 0).ok_or(MemoryError::OutOfBounds {
        ptr: ptr.0,
        len: available,
        size: memory.size(),
    })?;
    Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
}

/// Read a NUL-terminated little-endian UTF-16 string
pub fn read_c_string_utf16(memory: &dyn GuestMemory, ptr: GuestPtr) -> Result<String, MemoryError> {
    if ptr.is_null() {
        return Err(MemoryError::NullPointer);
    }
    let available = memory.size().saturating_sub(ptr.offset()) & !1;
    let bytes = memory.read(ptr, available)?;
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|&unit| unit != 0)
        .collect();
    if units.len() * 2 == available {
        return Err(MemoryError::OutOfBounds {
            ptr: ptr.0,
            len: available,
            size: memory.size(),
        });
    }
    Ok(String::from_utf16_lossy(&units))
}

/// Growable byte-vector memory with a bump allocator
///
/// Allocations are 8-byte aligned and never freed. The first 8 bytes are
/// kept unused so that no allocation lands on the null pointer.
pub struct LinearMemory {
    bytes: Vec<u8>,
    free: usize,
    limit: usize,
}

impl LinearMemory {
    /// Default upper bound (16MB)
    pub const DEFAULT_LIMIT: usize = 16 * 1024 * 1024;

    const BASE: usize = 8;

    /// Create a memory that may grow up to `limit` bytes
    pub fn new(limit: usize) -> Self {
        Self {
            bytes: vec![0u8; Self::BASE],
            free: Self::BASE,
            limit: limit.min(u32::MAX as usize),
        }
    }

    /// Bytes handed out so far, including alignment padding
    pub fn used(&self) -> usize {
        self.free - Self::BASE
    }

    fn check(&self, ptr: GuestPtr, len: usize) -> Result<std::ops::Range<usize>, MemoryError> {
        if ptr.is_null() {
            return Err(MemoryError::NullPointer);
        }
        let start = ptr.offset();
        match start.checked_add(len) {
            Some(end) if end <= self.bytes.len() => Ok(start..end),
            _ => Err(MemoryError::OutOfBounds {
                ptr: ptr.0,
                len,
                size: self.bytes.len(),
            }),
        }
    }
}

impl Default for LinearMemory {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LIMIT)
    }
}

impl GuestMemory for LinearMemory {
    fn malloc(&mut self, size: usize) -> GuestPtr {
        // Align to 8 bytes; zero-sized requests still get a distinct address
        let aligned_size = (size.max(1) + 7) & !7;
        let Some(end) = self.free.checked_add(aligned_size) else {
            return GuestPtr::NULL;
        };
        if end > self.limit {
            return GuestPtr::NULL;
        }
        let ptr = GuestPtr(self.free as u32);
        self.bytes.resize(end, 0);
        self.free = end;
        ptr
    }

    fn write(&mut self, ptr: GuestPtr, bytes: &[u8]) -> Result<(), MemoryError> {
        let range = self.check(ptr, bytes.len())?;
        self.bytes[range].copy_from_slice(bytes);
        Ok(())
    }

    fn read(&self, ptr: GuestPtr, len: usize) -> Result<&[u8], MemoryError> {
        let range = self.check(ptr, len)?;
        Ok(&self.bytes[range])
    }

    fn size(&self) -> usize {
        self.bytes.len()
    }
}
