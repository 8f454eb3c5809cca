//! Builder settings.
//!
//! [`ContainerSettings`] deserializes with serde so a host application can
//! keep it in its own configuration file, e.g. under a `[container]` table.

use serde::Deserialize;

/// Options controlling how a container is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ContainerSettings {
    /// Let a later registration replace an earlier one for the same type.
    pub allow_override: bool,
    /// Walk the whole service graph during `build()`.
    pub validate_on_build: bool,
}

impl Default for ContainerSettings {
    fn default() -> Self {
        Self {
            allow_override: false,
            validate_on_build: true,
        }
    }
}
