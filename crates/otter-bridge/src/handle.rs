//! Guest-visible handles

use serde::Serialize;
use std::fmt;

/// Opaque integer naming a host value from the guest side
///
/// A handle is valid while its table entry has a nonzero reference count.
/// Handles `0..=6` are reserved for the primordial values and never
/// reclaimed.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Handle(pub u32);

impl Handle {
    /// `null`
    pub const NULL: Handle = Handle(0);
    /// `undefined`
    pub const UNDEFINED: Handle = Handle(1);
    /// `false`
    pub const FALSE: Handle = Handle(2);
    /// `true`
    pub const TRUE: Handle = Handle(3);
    /// The global root object
    pub const GLOBAL: Handle = Handle(4);
    /// The console object
    pub const CONSOLE: Handle = Handle(5);
    /// Sentinel symbol
    pub const RESERVED: Handle = Handle(6);

    /// Highest reserved handle
    pub const LAST_RESERVED: Handle = Self::RESERVED;

    /// Raw integer
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Whether this handle belongs to the reserved set
    #[inline]
    pub const fn is_reserved(self) -> bool {
        self.0 <= Self::LAST_RESERVED.0
    }

    /// Handle for a boolean constant
    #[inline]
    pub const fn from_bool(b: bool) -> Handle {
        if b { Self::TRUE } else { Self::FALSE }
    }
}

impl From<u32> for Handle {
    fn from(raw: u32) -> Self {
        Handle(raw)
    }
}

impl From<Handle> for u32 {
    fn from(h: Handle) -> Self {
        h.0
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.0)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
