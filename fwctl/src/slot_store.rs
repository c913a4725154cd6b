// Licensed under the Apache-2.0 license

//! Crash-tolerant, integrity-checked access to the persistent A/B boot-slot
//! record.
//!
//! The record occupies one erase sector of raw flash; every update is a full
//! replacement (compose in memory, re-checksum, erase the sector, rewrite).
//! The medium offers no atomic erase-plus-program, so power loss between the
//! two steps leaves an erased or partially-programmed sector; either form is
//! caught by validation on the next read and is never silently repaired.

use core::fmt::Write;

use arrayvec::ArrayString;
use boot_record::{BootImage, BootImgInfo};
use imgsel_config::SlotStoreConfig;
use zerocopy::IntoBytes;

use crate::environment::Environment;
use crate::error::SlotStoreError;
use crate::flash::{FlashPartition, FlashStorage};

/// Decoded `persistent_state`, as surfaced to the boot-decision step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportedState {
    pub image_a_bootable: bool,
    pub image_b_bootable: bool,
    pub requested_boot: BootImage,
    pub last_booted: BootImage,
}

impl ExportedState {
    pub fn from_record(record: &BootImgInfo) -> Self {
        let state = &record.persistent_state;
        ExportedState {
            image_a_bootable: state.image_a_bootable(),
            image_b_bootable: state.image_b_bootable(),
            requested_boot: state.requested_boot(),
            last_booted: state.last_booted(),
        }
    }

    /// Publishes the decoded state under `prefix`-namespaced keys. Bootable
    /// flags publish as "0"/"1", image selectors as "A"/"B". Idempotent.
    pub fn publish(&self, prefix: &str, env: &mut dyn Environment) {
        fn flag(value: bool) -> &'static str {
            if value {
                "1"
            } else {
                "0"
            }
        }

        env.set(&env_key(prefix, "image_a_bootable"), flag(self.image_a_bootable));
        env.set(&env_key(prefix, "image_b_bootable"), flag(self.image_b_bootable));
        env.set(&env_key(prefix, "requested_boot"), self.requested_boot.as_str());
        env.set(&env_key(prefix, "last_booted"), self.last_booted.as_str());
    }
}

fn env_key(prefix: &str, name: &str) -> ArrayString<48> {
    let mut key = ArrayString::new();
    let _ = write!(key, "{}{}", prefix, name);
    key
}

/// Handle on the flash region holding the boot-slot record.
pub struct BootSlotStore<'a> {
    partition: FlashPartition<'a>,
    env_prefix: &'static str,
}

impl<'a> BootSlotStore<'a> {
    /// Opens the record region on a probed flash device. Fails if the
    /// configured region does not fit the device or is not sector-aligned.
    pub fn new(
        driver: &'a dyn FlashStorage,
        config: &SlotStoreConfig,
    ) -> Result<Self, SlotStoreError> {
        let partition = FlashPartition::new(
            driver,
            "boot-slot",
            config.record_offset as usize,
            config.sector_size as usize,
        )?;
        Ok(BootSlotStore {
            partition,
            env_prefix: config.env_prefix,
        })
    }

    /// Reads the record from the medium and validates magic and checksum.
    /// A record failing either check is surfaced as corrupt, never patched.
    pub fn read_record(&self) -> Result<BootImgInfo, SlotStoreError> {
        let mut buf = [0u8; BootImgInfo::SIZE];
        self.partition.read(0, &mut buf)?;
        let record: BootImgInfo = zerocopy::transmute!(buf);
        record.verify().map_err(|kind| {
            log::warn!("persistent boot record failed validation: {}", kind);
            SlotStoreError::CorruptRecord(kind)
        })?;
        Ok(record)
    }

    /// Projects a validated record into the environment surface and returns
    /// the decoded state.
    pub fn export_state(&self, record: &BootImgInfo, env: &mut dyn Environment) -> ExportedState {
        let state = ExportedState::from_record(record);
        state.publish(self.env_prefix, env);
        state
    }

    /// Replaces the persistent selection state. Arguments must each be 0 or
    /// 1 and are checked before any flash access. The current record must
    /// validate before it is replaced.
    pub fn update_record(
        &self,
        slot_a_bootable: u32,
        slot_b_bootable: u32,
        requested_slot: u32,
    ) -> Result<BootImgInfo, SlotStoreError> {
        if slot_a_bootable > 1 || slot_b_bootable > 1 || requested_slot > 1 {
            return Err(SlotStoreError::InvalidArgument);
        }

        let mut record = self.read_record()?;
        record.persistent_state.img_a_bootable = slot_a_bootable as u8;
        record.persistent_state.img_b_bootable = slot_b_bootable as u8;
        record.persistent_state.requested_boot_img = requested_slot as u8;
        record.seal();

        // Erase-then-write window: no rollback exists past this point.
        self.partition.erase(0, self.partition.len())?;
        self.partition.write(0, record.as_bytes())?;
        log::info!(
            "boot-slot record updated: a_bootable={} b_bootable={} requested={}",
            slot_a_bootable,
            slot_b_bootable,
            BootImage::from_stored(requested_slot as u8)
        );
        Ok(record)
    }

    pub fn env_prefix(&self) -> &'static str {
        self.env_prefix
    }
}
