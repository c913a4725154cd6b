// Licensed under the Apache-2.0 license

//! Boot-firmware version export.
//!
//! The version string lives in platform metadata (device tree or
//! equivalent); this only reads it through an accessor and publishes it for
//! later boot stages. In strict mode a missing version aborts, so
//! deployments that key update decisions off the running firmware version
//! never boot blind.

use core::fmt;

use crate::environment::Environment;

pub const FIRMWARE_VERSION_KEY: &str = "dt_bootfirmware_version";

/// Read-only accessor over the platform's firmware version metadata.
pub trait FirmwareInfoSource {
    fn bootfirmware_version(&self) -> Option<&str>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirmwareInfoError {
    VersionNotFound,
}

impl fmt::Display for FirmwareInfoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FirmwareInfoError::VersionNotFound => {
                f.write_str("boot firmware version not found in platform metadata")
            }
        }
    }
}

impl core::error::Error for FirmwareInfoError {}

/// Publishes the boot-firmware version into the environment. A missing
/// version is an error only in strict mode.
pub fn export_firmware_info(
    source: &dyn FirmwareInfoSource,
    env: &mut dyn Environment,
    strict: bool,
) -> Result<(), FirmwareInfoError> {
    match source.bootfirmware_version() {
        Some(version) => {
            log::info!("boot firmware version: {}", version);
            env.set(FIRMWARE_VERSION_KEY, version);
            Ok(())
        }
        None if strict => Err(FirmwareInfoError::VersionNotFound),
        None => {
            log::warn!("boot firmware version not found, continuing");
            Ok(())
        }
    }
}
