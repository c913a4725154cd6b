// Licensed under the Apache-2.0 license

//! End-to-end boot-slot store scenarios over the emulated flash devices.

use boot_record::{BootImage, BootImgInfo, PersistentState, BOOT_IMG_MAGIC};
use emulator_periph::{FileFlash, RamFlash};
use imgsel_common::{BootSlotStore, Environment, SlotStoreError};
use zerocopy::IntoBytes;

use crate::support::MapEnv;

const CAPACITY: usize = 0x4_0000;

fn slot_config() -> &'static imgsel_config::SlotStoreConfig {
    &imgsel_config::ZYNQMP.slot_store
}

fn record_offset() -> usize {
    slot_config().record_offset as usize
}

fn provisioned_record() -> BootImgInfo {
    BootImgInfo::new(
        PersistentState {
            last_booted_img: 0,
            requested_boot_img: 0,
            img_b_bootable: 0,
            img_a_bootable: 1,
        },
        0x0010_0000,
        0x0090_0000,
        0x0110_0000,
    )
}

fn provisioned_flash() -> RamFlash {
    let flash = RamFlash::new(CAPACITY, slot_config().sector_size as usize);
    flash.load(record_offset(), provisioned_record().as_bytes());
    flash
}

#[test]
fn test_query_exports_provisioned_state() {
    let flash = provisioned_flash();
    let store = BootSlotStore::new(&flash, slot_config()).unwrap();
    let mut env = MapEnv::default();

    let record = store.read_record().unwrap();
    assert_eq!(record.magic, BOOT_IMG_MAGIC);

    let state = store.export_state(&record, &mut env);
    assert!(state.image_a_bootable);
    assert!(!state.image_b_bootable);
    assert_eq!(state.requested_boot, BootImage::A);

    assert_eq!(env.get("zynqmp.image_a_bootable"), Some("1"));
    assert_eq!(env.get("zynqmp.image_b_bootable"), Some("0"));
    assert_eq!(env.get("zynqmp.requested_boot"), Some("A"));
}

#[test]
fn test_update_all_ones_round_trips() {
    let flash = provisioned_flash();
    let store = BootSlotStore::new(&flash, slot_config()).unwrap();

    store.update_record(1, 1, 1).unwrap();

    let record = store.read_record().unwrap();
    assert_eq!(record.persistent_state.img_a_bootable, 1);
    assert_eq!(record.persistent_state.img_b_bootable, 1);
    assert_eq!(record.persistent_state.requested_boot_img, 1);
    assert_eq!(record.persistent_state.requested_boot(), BootImage::B);
    assert!(record.verify().is_ok());
}

#[test]
fn test_update_goes_through_erase_cycle() {
    let flash = provisioned_flash();
    let store = BootSlotStore::new(&flash, slot_config()).unwrap();

    store.update_record(0, 1, 1).unwrap();
    let stats = flash.stats();
    assert_eq!(stats.erases, 1);
    assert_eq!(stats.writes, 1);

    // The rest of the record sector is left erased.
    let tail = flash.snapshot(record_offset() + BootImgInfo::SIZE, 16);
    assert!(tail.iter().all(|&b| b == 0xff));
}

#[test]
fn test_single_byte_corruption_is_detected() {
    let flash = provisioned_flash();
    let store = BootSlotStore::new(&flash, slot_config()).unwrap();

    // Flip one bit of an image offset the logic never interprets; the
    // checksum still covers it.
    let addr = record_offset() + 24;
    let original = flash.snapshot(addr, 1)[0];
    flash.poke(addr, original ^ 0x10);

    assert!(matches!(
        store.read_record(),
        Err(SlotStoreError::CorruptRecord(_))
    ));
}

#[test]
fn test_wrong_magic_is_detected_even_with_consistent_checksum() {
    let flash = RamFlash::new(CAPACITY, slot_config().sector_size as usize);
    let mut record = provisioned_record();
    record.magic = *b"MUBA";
    record.seal();
    flash.load(record_offset(), record.as_bytes());

    let store = BootSlotStore::new(&flash, slot_config()).unwrap();
    assert!(matches!(
        store.read_record(),
        Err(SlotStoreError::CorruptRecord(_))
    ));
}

#[test]
fn test_file_backed_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flash.bin");
    let sector = slot_config().sector_size as usize;

    {
        let flash = FileFlash::open(&path, CAPACITY, sector).unwrap();
        flash
            .load(record_offset(), provisioned_record().as_bytes())
            .unwrap();
        let store = BootSlotStore::new(&flash, slot_config()).unwrap();
        store.update_record(1, 1, 0).unwrap();
    }

    // A fresh probe of the same image observes the committed update.
    let flash = FileFlash::open(&path, CAPACITY, sector).unwrap();
    let store = BootSlotStore::new(&flash, slot_config()).unwrap();
    let record = store.read_record().unwrap();
    assert_eq!(record.persistent_state.img_a_bootable, 1);
    assert_eq!(record.persistent_state.img_b_bootable, 1);
    assert_eq!(record.persistent_state.requested_boot(), BootImage::A);
}

#[test]
fn test_power_loss_after_erase_leaves_detectable_state() {
    let flash = provisioned_flash();
    let store = BootSlotStore::new(&flash, slot_config()).unwrap();

    // Model losing power between the erase and the write: the erase lands,
    // the write never does.
    flash.fail_writes(true);
    assert!(matches!(
        store.update_record(1, 1, 1),
        Err(SlotStoreError::Media(_))
    ));
    flash.fail_writes(false);

    // The region is erased, which the next read reports as corruption
    // rather than fabricating a record.
    assert!(matches!(
        store.read_record(),
        Err(SlotStoreError::CorruptRecord(_))
    ));

    // Recovery is an explicit re-provision, after which reads are clean.
    flash.load(record_offset(), provisioned_record().as_bytes());
    assert!(store.read_record().is_ok());
}
