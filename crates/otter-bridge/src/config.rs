//! Bridge configuration

/// Bridge configuration
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Maximum nesting of host → guest callback re-entries (default: 512)
    pub max_callback_depth: usize,
    /// Emit `trace` events for every intern/release (default: false)
    pub log_table_operations: bool,
    /// Description of the sentinel symbol stored at handle 6
    pub reserved_symbol_description: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_callback_depth: 512,
            log_table_operations: false,
            reserved_symbol_description: "_OTTER_RESERVED_".to_string(),
        }
    }
}

impl BridgeConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the callback re-entry limit
    pub fn max_callback_depth(mut self, depth: usize) -> Self {
        self.max_callback_depth = depth;
        self
    }

    /// Enable per-handle trace events
    pub fn log_table_operations(mut self, enabled: bool) -> Self {
        self.log_table_operations = enabled;
        self
    }

    /// Set the sentinel symbol description
    pub fn reserved_symbol_description(mut self, description: impl Into<String>) -> Self {
        self.reserved_symbol_description = description.into();
        self
    }
}
