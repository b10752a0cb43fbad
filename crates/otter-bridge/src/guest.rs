//! Guest function table
//!
//! The single re-entry capability the callback bridge needs: "run guest
//! function `index` with `(args, data)` and give back a handle".

use crate::bridge::Bridge;
use crate::error::{BridgeError, BridgeResult};
use crate::handle::Handle;

/// The guest's exported function table
pub trait GuestFunctionTable {
    /// Number of slots
    fn len(&self) -> u32;

    /// Whether the table has no slots
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Re-enter the guest at `index`
    ///
    /// `args` is the handle of an array holding the host call's arguments,
    /// `data` the closure-data handle given to `make_callback`. The bridge
    /// checks `index` against [`len`](Self::len) before calling this.
    fn invoke(&self, bridge: &Bridge, index: u32, args: Handle, data: Handle) -> BridgeResult<Handle>;
}

type GuestFn = Box<dyn Fn(&Bridge, Handle, Handle) -> BridgeResult<Handle>>;

/// Closure-backed function table
#[derive(Default)]
pub struct FunctionTable {
    slots: Vec<GuestFn>,
}

impl FunctionTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a function, returning its slot index
    pub fn register(
        &mut self,
        f: impl Fn(&Bridge, Handle, Handle) -> BridgeResult<Handle> + 'static,
    ) -> u32 {
        self.slots.push(Box::new(f));
        (self.slots.len() - 1) as u32
    }
}

impl GuestFunctionTable for FunctionTable {
    fn len(&self) -> u32 {
        self.slots.len() as u32
    }

    fn invoke(&self, bridge: &Bridge, index: u32, args: Handle, data: Handle) -> BridgeResult<Handle> {
        let slot = self
            .slots
            .get(index as usize)
            .ok_or(BridgeError::InvalidFunctionIndex {
                index,
                len: self.len(),
            })?;
        slot(bridge, args, data)
    }
}

impl std::fmt::Debug for FunctionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTable")
            .field("slots", &self.slots.len())
            .finish()
    }
}
