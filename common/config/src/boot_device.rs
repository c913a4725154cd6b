// Licensed under the Apache-2.0 license

//! ROM boot-source to loader-device mapping tables.

/// Boot source as reported by the boot ROM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootSource {
    Sd1,
    Sd2,
    Sd3,
    Mmc1,
    Mmc2,
    Mmc3,
    Nand,
    SpiNor,
    Qspi,
    FlexSpi,
    Usb,
}

/// Device the loader continues from for a given boot source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootDevice {
    Mmc1,
    Mmc2,
    /// Second partition of the second MMC device.
    Mmc2Second,
    Nand,
    Spi,
    Nor,
    /// Board-specific recovery path (serial download).
    Board,
    None,
}

/// Sources every supported variant maps the same way.
pub static COMMON_BOOT_DEVICES: &[(BootSource, BootDevice)] = &[
    (BootSource::Nand, BootDevice::Nand),
    (BootSource::SpiNor, BootDevice::Spi),
    (BootSource::Qspi, BootDevice::Nor),
    (BootSource::Usb, BootDevice::Board),
];

pub static IMX7ULP_BOOT_DEVICES: &[(BootSource, BootDevice)] = &[
    (BootSource::Sd1, BootDevice::Mmc1),
    (BootSource::Mmc1, BootDevice::Mmc1),
    (BootSource::Nand, BootDevice::Nand),
    (BootSource::SpiNor, BootDevice::Spi),
    (BootSource::Qspi, BootDevice::Nor),
    (BootSource::Usb, BootDevice::Board),
];

pub static IMX8M_BOOT_DEVICES: &[(BootSource, BootDevice)] = &[
    (BootSource::Sd1, BootDevice::Mmc1),
    (BootSource::Mmc1, BootDevice::Mmc1),
    (BootSource::Sd2, BootDevice::Mmc2),
    (BootSource::Mmc2, BootDevice::Mmc2),
    (BootSource::Nand, BootDevice::Nand),
    (BootSource::SpiNor, BootDevice::Spi),
    (BootSource::Qspi, BootDevice::Nor),
    (BootSource::Usb, BootDevice::Board),
];

pub static IMX8QM_BOOT_DEVICES: &[(BootSource, BootDevice)] = &[
    (BootSource::Mmc1, BootDevice::Mmc1),
    (BootSource::Sd2, BootDevice::Mmc2Second),
    (BootSource::Sd3, BootDevice::Mmc1),
    (BootSource::FlexSpi, BootDevice::Spi),
    (BootSource::Nand, BootDevice::Nand),
    (BootSource::SpiNor, BootDevice::Spi),
    (BootSource::Qspi, BootDevice::Nor),
    (BootSource::Usb, BootDevice::Board),
];
