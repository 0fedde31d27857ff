//! Interface (`.int`) file serialization.
//!
//! The interface file is the only artifact that crosses compilation-unit
//! boundaries: pretty-printed JSON of the class's externally visible shape.

use jay_cfg::ClassInterface;

/// Error reading a serialized class interface.
#[derive(Debug, thiserror::Error)]
pub enum InterfaceReadError {
    #[error("failed to read interface file: {0}")]
    Io(#[from] std::io::Error),
    #[error("interface file is not a valid class interface: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Serializes a class interface to its `.int` JSON text.
pub fn write_class_interface(interface: &ClassInterface) -> String {
    let mut text =
        serde_json::to_string_pretty(interface).expect("class interfaces always serialize");
    text.push('\n');
    text
}

/// Deserializes a class interface from `.int` JSON text. Rejects input
/// with anything but whitespace after the JSON value.
pub fn read_class_interface(text: &str) -> Result<ClassInterface, InterfaceReadError> {
    Ok(serde_json::from_str(text)?)
}
