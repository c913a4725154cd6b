// Licensed under the Apache-2.0 license

//! Layout of the persistent A/B boot-slot record kept in raw flash.

#![cfg_attr(target_arch = "arm", no_std)]

use core::fmt;
use core::mem::size_of;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

pub const BOOT_IMG_MAGIC: [u8; 4] = *b"ABUM";
pub const RECORD_VERSION: u32 = 0x0001;

/// Word index of the checksum field inside the record.
const CHECKSUM_WORD_INDEX: usize = 3;

/// Identity of one of the two redundant boot images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BootImage {
    A = 0,
    B = 1,
}

impl BootImage {
    /// Decodes a stored selector byte. Zero selects image A, anything else
    /// image B.
    pub fn from_stored(byte: u8) -> Self {
        if byte == BootImage::A as u8 {
            BootImage::A
        } else {
            BootImage::B
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BootImage::A => "A",
            BootImage::B => "B",
        }
    }
}

impl core::convert::TryFrom<u8> for BootImage {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(BootImage::A),
            1 => Ok(BootImage::B),
            _ => Err(()),
        }
    }
}

impl fmt::Display for BootImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which record check failed. Both kinds invalidate the record the same way;
/// the distinction only feeds diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordCorruption {
    Magic,
    Checksum,
}

impl fmt::Display for RecordCorruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordCorruption::Magic => f.write_str("magic mismatch"),
            RecordCorruption::Checksum => f.write_str("checksum mismatch"),
        }
    }
}

/// A/B selection state. Field order is the wire order.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct PersistentState {
    pub last_booted_img: u8,
    pub requested_boot_img: u8,
    pub img_b_bootable: u8,
    pub img_a_bootable: u8,
}

impl PersistentState {
    pub fn image_a_bootable(&self) -> bool {
        self.img_a_bootable != 0
    }

    pub fn image_b_bootable(&self) -> bool {
        self.img_b_bootable != 0
    }

    pub fn requested_boot(&self) -> BootImage {
        BootImage::from_stored(self.requested_boot_img)
    }

    pub fn last_booted(&self) -> BootImage {
        BootImage::from_stored(self.last_booted_img)
    }
}

/// The persistent boot-image record, byte-for-byte as kept in flash.
///
/// The checksum is the complement of the wrapping sum of every other 32-bit
/// word of the record. It catches accidental corruption (interrupted
/// programming, bit rot) of a fixed-shape record; it is no defense against
/// deliberate tampering. The three image offsets are covered by the checksum
/// but never interpreted here.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct BootImgInfo {
    pub magic: [u8; 4],
    pub version: u32,
    pub length: u32,
    pub checksum: u32,
    pub persistent_state: PersistentState,
    pub boot_img_a_offset: u32,
    pub boot_img_b_offset: u32,
    pub recovery_img_offset: u32,
}

impl BootImgInfo {
    pub const SIZE: usize = size_of::<BootImgInfo>();

    /// Builds a sealed record, as device provisioning would lay it down.
    pub fn new(
        persistent_state: PersistentState,
        boot_img_a_offset: u32,
        boot_img_b_offset: u32,
        recovery_img_offset: u32,
    ) -> Self {
        let mut info = BootImgInfo {
            magic: BOOT_IMG_MAGIC,
            version: RECORD_VERSION,
            length: Self::SIZE as u32,
            checksum: 0,
            persistent_state,
            boot_img_a_offset,
            boot_img_b_offset,
            recovery_img_offset,
        };
        info.seal();
        info
    }

    /// Complement of the wrapping sum of every record word except the
    /// checksum word itself, so the same computation serves both validation
    /// and preparing a record for write.
    pub fn compute_checksum(&self) -> u32 {
        let sum = self
            .as_bytes()
            .chunks_exact(size_of::<u32>())
            .enumerate()
            .filter(|(idx, _)| *idx != CHECKSUM_WORD_INDEX)
            .fold(0u32, |acc, (_, word)| {
                acc.wrapping_add(u32::from_ne_bytes(word.try_into().unwrap()))
            });
        0xffff_ffffu32.wrapping_sub(sum)
    }

    /// Stamps the checksum over the current contents.
    pub fn seal(&mut self) {
        self.checksum = self.compute_checksum();
    }

    /// Validates magic, then checksum. A record failing either check is
    /// invalid; no partial recovery is attempted.
    pub fn verify(&self) -> Result<(), RecordCorruption> {
        if self.magic != BOOT_IMG_MAGIC {
            return Err(RecordCorruption::Magic);
        }
        if self.checksum != self.compute_checksum() {
            return Err(RecordCorruption::Checksum);
        }
        Ok(())
    }
}
