// Licensed under the Apache-2.0 license

//! Per-SoC configuration tables for boot-slot storage and secure-boot
//! closing. Everything hardware-variant-specific lives here as data; the
//! core logic is selected-table driven and carries no `#[cfg]` branching.

#![cfg_attr(target_arch = "arm", no_std)]

pub mod boot_device;

pub use boot_device::{BootDevice, BootSource};

/// SPI probe parameters for the flash device holding the boot-slot record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiBusConfig {
    pub bus: u32,
    pub chip_select: u32,
    pub speed_hz: u32,
    pub mode: u32,
}

/// Location and geometry of the persistent boot-slot record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotStoreConfig {
    pub spi: SpiBusConfig,
    /// Byte offset of the record within the flash device.
    pub record_offset: u32,
    /// Erase granularity of the sector containing the record.
    pub sector_size: u32,
    /// Namespace prefix for exported environment keys.
    pub env_prefix: &'static str,
}

/// One SRK fuse word to compare during the close pre-flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuseLocation {
    pub bank: u32,
    pub word: u32,
}

/// How the final, irreversible closing step is performed on this SoC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseMechanism {
    /// Program a single security-configuration fuse word.
    ProgramFuse { bank: u32, word: u32, value: u32 },
    /// Invoke the platform's close primitive.
    PlatformCall,
}

/// Secure-boot closing tables for one SoC.
#[derive(Debug, Clone, Copy)]
pub struct SecureCloseConfig {
    /// Ordered SRK fuse locators; `srk_<i>` environment keys are indexed by
    /// position in this list.
    pub srk_fuses: &'static [FuseLocation],
    pub mechanism: CloseMechanism,
    /// Authentication-event signatures tolerated on this SoC. These cover
    /// specific, hardware-validated self-test defects only; do not widen
    /// without hardware validation.
    pub known_benign_events: &'static [&'static [u8]],
}

/// Complete configuration for one hardware variant, selected once at
/// startup.
#[derive(Debug, Clone, Copy)]
pub struct PlatformConfig {
    pub name: &'static str,
    pub slot_store: SlotStoreConfig,
    pub secure_close: Option<SecureCloseConfig>,
    pub boot_devices: &'static [(BootSource, BootDevice)],
}

impl PlatformConfig {
    /// Maps a ROM-reported boot source to the loader device to use.
    pub fn boot_device(&self, source: BootSource) -> BootDevice {
        self.boot_devices
            .iter()
            .find(|(src, _)| *src == source)
            .map(|(_, dev)| *dev)
            .unwrap_or(BootDevice::None)
    }
}

const SPI_DEFAULT: SpiBusConfig = SpiBusConfig {
    bus: 0,
    chip_select: 0,
    speed_hz: 1_000_000,
    mode: 0,
};

const fn slot_store(env_prefix: &'static str) -> SlotStoreConfig {
    SlotStoreConfig {
        spi: SPI_DEFAULT,
        record_offset: 0x0002_0000,
        sector_size: 0x1_0000,
        env_prefix,
    }
}

/// Known authentication event reported when the boot ROM's RNG self-test
/// fails spuriously on some i.MX6 parts. Tolerated on that family only.
pub const RNG_SELF_TEST_FAIL_EVENT: [u8; 36] = [
    0xdb, 0x00, 0x24, 0x42, 0x69, 0x30, 0xe1, 0x1d, 0x00, 0x04, 0x00, 0x02, 0x40, 0x00, 0x36,
    0x06, 0x55, 0x55, 0x00, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x01,
];

const IMX6_SRK_FUSES: [FuseLocation; 8] = [
    FuseLocation { bank: 3, word: 0 },
    FuseLocation { bank: 3, word: 1 },
    FuseLocation { bank: 3, word: 2 },
    FuseLocation { bank: 3, word: 3 },
    FuseLocation { bank: 3, word: 4 },
    FuseLocation { bank: 3, word: 5 },
    FuseLocation { bank: 3, word: 6 },
    FuseLocation { bank: 3, word: 7 },
];

const IMX7ULP_SRK_FUSES: [FuseLocation; 16] = [
    FuseLocation { bank: 5, word: 0 },
    FuseLocation { bank: 5, word: 1 },
    FuseLocation { bank: 5, word: 2 },
    FuseLocation { bank: 5, word: 3 },
    FuseLocation { bank: 5, word: 4 },
    FuseLocation { bank: 5, word: 5 },
    FuseLocation { bank: 5, word: 6 },
    FuseLocation { bank: 5, word: 7 },
    FuseLocation { bank: 6, word: 0 },
    FuseLocation { bank: 6, word: 1 },
    FuseLocation { bank: 6, word: 2 },
    FuseLocation { bank: 6, word: 3 },
    FuseLocation { bank: 6, word: 4 },
    FuseLocation { bank: 6, word: 5 },
    FuseLocation { bank: 6, word: 6 },
    FuseLocation { bank: 6, word: 7 },
];

const IMX8M_SRK_FUSES: [FuseLocation; 8] = [
    FuseLocation { bank: 6, word: 0 },
    FuseLocation { bank: 6, word: 1 },
    FuseLocation { bank: 6, word: 2 },
    FuseLocation { bank: 6, word: 3 },
    FuseLocation { bank: 7, word: 0 },
    FuseLocation { bank: 7, word: 1 },
    FuseLocation { bank: 7, word: 2 },
    FuseLocation { bank: 7, word: 3 },
];

const IMX8QM_SRK_FUSES: [FuseLocation; 16] = [
    FuseLocation { bank: 0, word: 722 },
    FuseLocation { bank: 0, word: 723 },
    FuseLocation { bank: 0, word: 724 },
    FuseLocation { bank: 0, word: 725 },
    FuseLocation { bank: 0, word: 726 },
    FuseLocation { bank: 0, word: 727 },
    FuseLocation { bank: 0, word: 728 },
    FuseLocation { bank: 0, word: 729 },
    FuseLocation { bank: 0, word: 730 },
    FuseLocation { bank: 0, word: 731 },
    FuseLocation { bank: 0, word: 732 },
    FuseLocation { bank: 0, word: 733 },
    FuseLocation { bank: 0, word: 734 },
    FuseLocation { bank: 0, word: 735 },
    FuseLocation { bank: 0, word: 736 },
    FuseLocation { bank: 0, word: 737 },
];

const IMX6_BENIGN_EVENTS: [&[u8]; 1] = [&RNG_SELF_TEST_FAIL_EVENT];

pub static IMX6: PlatformConfig = PlatformConfig {
    name: "imx6",
    slot_store: slot_store("imx6."),
    secure_close: Some(SecureCloseConfig {
        srk_fuses: &IMX6_SRK_FUSES,
        mechanism: CloseMechanism::ProgramFuse {
            bank: 0,
            word: 6,
            value: 0x0000_0002,
        },
        known_benign_events: &IMX6_BENIGN_EVENTS,
    }),
    boot_devices: boot_device::COMMON_BOOT_DEVICES,
};

pub static IMX7ULP: PlatformConfig = PlatformConfig {
    name: "imx7ulp",
    slot_store: slot_store("imx7ulp."),
    secure_close: Some(SecureCloseConfig {
        srk_fuses: &IMX7ULP_SRK_FUSES,
        mechanism: CloseMechanism::ProgramFuse {
            bank: 29,
            word: 6,
            value: 0x8000_0000,
        },
        known_benign_events: &[],
    }),
    boot_devices: boot_device::IMX7ULP_BOOT_DEVICES,
};

pub static IMX8M: PlatformConfig = PlatformConfig {
    name: "imx8m",
    slot_store: slot_store("imx8m."),
    secure_close: Some(SecureCloseConfig {
        srk_fuses: &IMX8M_SRK_FUSES,
        mechanism: CloseMechanism::ProgramFuse {
            bank: 1,
            word: 3,
            value: 0x0200_0000,
        },
        known_benign_events: &[],
    }),
    boot_devices: boot_device::IMX8M_BOOT_DEVICES,
};

pub static IMX8QM: PlatformConfig = PlatformConfig {
    name: "imx8qm",
    slot_store: slot_store("imx8qm."),
    secure_close: Some(SecureCloseConfig {
        srk_fuses: &IMX8QM_SRK_FUSES,
        mechanism: CloseMechanism::PlatformCall,
        known_benign_events: &[],
    }),
    boot_devices: boot_device::IMX8QM_BOOT_DEVICES,
};

pub static ZYNQMP: PlatformConfig = PlatformConfig {
    name: "zynqmp",
    slot_store: slot_store("zynqmp."),
    // Closing on this SoC is owned by the platform management firmware.
    secure_close: None,
    boot_devices: &[],
};

pub static PLATFORMS: [&PlatformConfig; 5] = [&IMX6, &IMX7ULP, &IMX8M, &IMX8QM, &ZYNQMP];

/// Looks up a platform by name.
pub fn platform(name: &str) -> Option<&'static PlatformConfig> {
    PLATFORMS.iter().find(|p| p.name == name).copied()
}
