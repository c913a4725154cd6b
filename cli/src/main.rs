// Licensed under the Apache-2.0 license

//! Command surface over the boot-slot store and the secure-boot closer,
//! driving the emulated flash and trust-root peripherals.
//!
//! Exit status: usage errors exit through clap (status 2); operational
//! failures exit 1 carrying the core error text.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use zerocopy::IntoBytes;

use boot_record::{BootImage, BootImgInfo, PersistentState};
use emulator_periph::{EmulatedTrustRoot, FileFlash};
use imgsel_common::{BootSlotStore, CloseOutcome, ExportedState, SecureBootCloser};
use imgsel_config::{CloseMechanism, PlatformConfig, SecureCloseConfig};

mod session;
use session::SessionEnv;

/// Size of the emulated flash device backing the record region.
const FLASH_CAPACITY: usize = 16 << 20;

// Factory-default image layout used by `provision`.
const BOOT_IMG_A_OFFSET: u32 = 0x0010_0000;
const BOOT_IMG_B_OFFSET: u32 = 0x0090_0000;
const RECOVERY_IMG_OFFSET: u32 = 0x0110_0000;

#[derive(Parser)]
#[command(version, about = "A/B boot-slot and secure-boot provisioning tool", long_about = None)]
struct Imgsel {
    /// Hardware platform to operate on
    #[arg(long, default_value = "zynqmp")]
    platform: String,

    /// Flash image holding the persistent boot-slot record
    #[arg(long, default_value = "flash.bin")]
    flash_image: PathBuf,

    /// Persisted fuse state for the emulated trust root
    #[arg(long, default_value = "fuses.json")]
    fuse_state: PathBuf,

    /// KEY=VALUE pair merged into the session environment (repeatable)
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = session::parse_key_value)]
    env: Vec<(String, String)>,

    /// File of KEY=VALUE lines merged into the session environment
    #[arg(long)]
    env_file: Option<PathBuf>,

    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read and report the boot-slot record without mutating it
    Query,
    /// Update the boot-slot record
    Update {
        /// Image A bootable, 0 or 1
        slot_a: u32,
        /// Image B bootable, 0 or 1
        slot_b: u32,
        /// Requested boot image, 0 (A) or 1 (B)
        requested_slot: u32,
    },
    /// Write a factory-default record (image A bootable and requested)
    Provision,
    /// Report secure-boot state and pending authentication events
    Status,
    /// Close the device for secure boot
    Close,
}

fn main() -> Result<()> {
    let args = Imgsel::parse();

    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let _ = simple_logger::SimpleLogger::new().with_level(level).init();

    let Some(platform) = imgsel_config::platform(&args.platform) else {
        bail!(
            "unknown platform '{}'; supported: {}",
            args.platform,
            imgsel_config::PLATFORMS
                .iter()
                .map(|p| p.name)
                .collect::<Vec<_>>()
                .join(", ")
        );
    };

    let mut env = SessionEnv::default();
    if let Some(path) = &args.env_file {
        env.merge_file(path)
            .with_context(|| format!("reading environment file {}", path.display()))?;
    }
    for (key, value) in &args.env {
        env.insert(key, value);
    }

    match args.command {
        Commands::Query => query(platform, &args.flash_image, &mut env),
        Commands::Update {
            slot_a,
            slot_b,
            requested_slot,
        } => update(
            platform,
            &args.flash_image,
            &mut env,
            slot_a,
            slot_b,
            requested_slot,
        ),
        Commands::Provision => provision(platform, &args.flash_image),
        Commands::Status => status(platform, &args.fuse_state),
        Commands::Close => close(platform, &args.fuse_state, &env),
    }
}

fn open_flash(platform: &PlatformConfig, path: &Path) -> Result<FileFlash> {
    FileFlash::open(
        path,
        FLASH_CAPACITY,
        platform.slot_store.sector_size as usize,
    )
    .with_context(|| format!("opening flash image {}", path.display()))
}

fn close_config(platform: &'static PlatformConfig) -> Result<&'static SecureCloseConfig> {
    platform.secure_close.as_ref().with_context(|| {
        format!(
            "platform '{}' has no secure-boot close support",
            platform.name
        )
    })
}

fn load_trust_root(config: &SecureCloseConfig, fuse_state: &Path) -> Result<EmulatedTrustRoot> {
    let trust_root = EmulatedTrustRoot::load(fuse_state)
        .with_context(|| format!("loading fuse state {}", fuse_state.display()))?;
    Ok(match config.mechanism {
        CloseMechanism::ProgramFuse { bank, word, value } => {
            trust_root.with_secure_bit(bank, word, value)
        }
        CloseMechanism::PlatformCall => trust_root,
    })
}

fn report(state: &ExportedState) {
    let bootable = |b: bool| if b { "Bootable" } else { "Non Bootable" };
    println!("Image A: {}", bootable(state.image_a_bootable));
    println!("Image B: {}", bootable(state.image_b_bootable));
    println!("Requested Boot Image: Image {}", state.requested_boot);
    println!("Last Booted Image: Image {}", state.last_booted);
}

fn query(platform: &PlatformConfig, flash_image: &Path, env: &mut SessionEnv) -> Result<()> {
    let flash = open_flash(platform, flash_image)?;
    let store = BootSlotStore::new(&flash, &platform.slot_store)?;

    let record = store.read_record().context("reading boot-slot record")?;
    let state = store.export_state(&record, env);
    report(&state);
    for (key, value) in env.entries() {
        log::debug!("env: {}={}", key, value);
    }
    Ok(())
}

fn update(
    platform: &PlatformConfig,
    flash_image: &Path,
    env: &mut SessionEnv,
    slot_a: u32,
    slot_b: u32,
    requested_slot: u32,
) -> Result<()> {
    let flash = open_flash(platform, flash_image)?;
    let store = BootSlotStore::new(&flash, &platform.slot_store)?;

    let record = store
        .update_record(slot_a, slot_b, requested_slot)
        .context("updating boot-slot record")?;
    let state = store.export_state(&record, env);
    report(&state);
    Ok(())
}

fn provision(platform: &PlatformConfig, flash_image: &Path) -> Result<()> {
    let flash = open_flash(platform, flash_image)?;
    let record = BootImgInfo::new(
        PersistentState {
            last_booted_img: BootImage::A as u8,
            requested_boot_img: BootImage::A as u8,
            img_b_bootable: 0,
            img_a_bootable: 1,
        },
        BOOT_IMG_A_OFFSET,
        BOOT_IMG_B_OFFSET,
        RECOVERY_IMG_OFFSET,
    );
    flash
        .load(platform.slot_store.record_offset as usize, record.as_bytes())
        .context("writing factory-default record")?;
    println!(
        "Provisioned factory-default boot-slot record at {:#x}",
        platform.slot_store.record_offset
    );
    Ok(())
}

fn status(platform: &'static PlatformConfig, fuse_state: &Path) -> Result<()> {
    let config = close_config(platform)?;
    let mut trust_root = load_trust_root(config, fuse_state)?;
    let closer = SecureBootCloser::new(&mut trust_root, config);

    println!(
        "Secure boot: {}",
        if closer.is_closed() { "closed" } else { "open" }
    );
    let events = closer.blocking_events();
    if events.is_empty() {
        println!("Pending authentication events: none");
    } else {
        println!("Pending authentication events: {}", events.len());
        for event in &events {
            println!("  {}", hex::encode(event.bytes()));
        }
    }
    Ok(())
}

fn close(platform: &'static PlatformConfig, fuse_state: &Path, env: &SessionEnv) -> Result<()> {
    let config = close_config(platform)?;
    let mut trust_root = load_trust_root(config, fuse_state)?;
    let mut closer = SecureBootCloser::new(&mut trust_root, config);

    let outcome = closer.close(env).context("closing device")?;
    trust_root
        .save()
        .with_context(|| format!("saving fuse state {}", fuse_state.display()))?;
    match outcome {
        CloseOutcome::AlreadyClosed => println!("Secure boot already enabled"),
        CloseOutcome::Closed => println!("Device closed for secure boot"),
    }
    Ok(())
}
