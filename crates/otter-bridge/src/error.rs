//! Bridge error types

use otter_bridge_host::HostError;
use thiserror::Error;

use crate::handle::Handle;
use crate::memory::MemoryError;

/// Faults that cross the guest boundary
///
/// Host exceptions raised by bridge operations are normally delivered as
/// error-object handles; these variants cover what cannot be expressed
/// that way.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A value deliberately thrown with `throw(handle)`
    #[error("thrown value (handle {0})")]
    Thrown(Handle),

    /// The guest trapped while running a callback
    #[error("guest trap: {0}")]
    GuestTrap(String),

    /// Callback index outside the guest function table
    #[error("function index {index} out of range (table has {len} entries)")]
    InvalidFunctionIndex {
        /// Requested slot
        index: u32,
        /// Table length
        len: u32,
    },

    /// Guest memory access failure
    #[error(transparent)]
    Memory(#[from] MemoryError),

    /// Host-native fault
    #[error(transparent)]
    Host(#[from] HostError),
}

impl BridgeError {
    /// Create a guest trap
    pub fn trap(msg: impl Into<String>) -> Self {
        Self::GuestTrap(msg.into())
    }
}

/// Result type for bridge operations
pub type BridgeResult<T> = std::result::Result<T, BridgeError>;
