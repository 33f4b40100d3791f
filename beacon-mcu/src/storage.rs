//! Persistent Storage Abstraction Traits
//!
//! Traits for non-volatile storage of the device parameters.

/// Trait for persistent key-value storage scoped to one namespace
///
/// MCU-specific crates implement this trait using their storage backend
/// (NVS for ESP32, flash for Pico, etc.)
pub trait Storage {
    /// Error type for storage operations
    type Error: core::fmt::Debug;

    /// Get a string value, `None` if the key has never been written
    fn get_str(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// Save a string value
    fn set_str(&mut self, key: &str, value: &str) -> Result<(), Self::Error>;

    /// Erase every key in the namespace (factory reset)
    fn clear_all(&mut self) -> Result<(), Self::Error>;
}
