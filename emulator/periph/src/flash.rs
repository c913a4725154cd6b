// Licensed under the Apache-2.0 license

//! NOR flash emulation.
//!
//! Both devices model the physical programming rules the store's
//! erase-before-write discipline exists for: erase fills whole sectors with
//! 0xFF, and a program operation can only clear bits (new byte = old AND
//! new). Skipping the erase therefore corrupts data instead of silently
//! working, exactly as it would on the part.

use std::cell::{Cell, RefCell};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use imgsel_common::{FlashDrvError, FlashStorage};

/// Operation counters, for tests that assert on side effects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlashStats {
    pub reads: u32,
    pub writes: u32,
    pub erases: u32,
}

/// Vector-backed NOR flash device.
pub struct RamFlash {
    sector_size: usize,
    data: RefCell<Vec<u8>>,
    stats: Cell<FlashStats>,
    fail_reads: Cell<bool>,
    fail_writes: Cell<bool>,
    fail_erases: Cell<bool>,
}

impl RamFlash {
    /// A blank (fully erased) device.
    pub fn new(capacity: usize, sector_size: usize) -> Self {
        RamFlash {
            sector_size,
            data: RefCell::new(vec![0xff; capacity]),
            stats: Cell::new(FlashStats::default()),
            fail_reads: Cell::new(false),
            fail_writes: Cell::new(false),
            fail_erases: Cell::new(false),
        }
    }

    /// Places raw bytes without program-rule enforcement, as external
    /// provisioning tooling would.
    pub fn load(&self, address: usize, data: &[u8]) {
        self.data.borrow_mut()[address..address + data.len()].copy_from_slice(data);
    }

    /// Overwrites a single byte, bypassing program rules. For corruption
    /// tests.
    pub fn poke(&self, address: usize, value: u8) {
        self.data.borrow_mut()[address] = value;
    }

    pub fn snapshot(&self, address: usize, length: usize) -> Vec<u8> {
        self.data.borrow()[address..address + length].to_vec()
    }

    pub fn stats(&self) -> FlashStats {
        self.stats.get()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.set(fail);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    pub fn fail_erases(&self, fail: bool) {
        self.fail_erases.set(fail);
    }

    fn bump(&self, f: impl FnOnce(&mut FlashStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }
}

impl FlashStorage for RamFlash {
    fn read(&self, buffer: &mut [u8], address: usize) -> Result<(), FlashDrvError> {
        if self.fail_reads.get() {
            return Err(FlashDrvError::FAIL);
        }
        let data = self.data.borrow();
        if address + buffer.len() > data.len() {
            return Err(FlashDrvError::SIZE);
        }
        self.bump(|s| s.reads += 1);
        buffer.copy_from_slice(&data[address..address + buffer.len()]);
        Ok(())
    }

    fn write(&self, buffer: &[u8], address: usize) -> Result<(), FlashDrvError> {
        if self.fail_writes.get() {
            return Err(FlashDrvError::FAIL);
        }
        let mut data = self.data.borrow_mut();
        if address + buffer.len() > data.len() {
            return Err(FlashDrvError::SIZE);
        }
        self.bump(|s| s.writes += 1);
        for (dst, src) in data[address..address + buffer.len()].iter_mut().zip(buffer) {
            *dst &= *src;
        }
        Ok(())
    }

    fn erase(&self, address: usize, length: usize) -> Result<(), FlashDrvError> {
        if self.fail_erases.get() {
            return Err(FlashDrvError::FAIL);
        }
        if address % self.sector_size != 0 || length % self.sector_size != 0 {
            return Err(FlashDrvError::INVAL);
        }
        let mut data = self.data.borrow_mut();
        if address + length > data.len() {
            return Err(FlashDrvError::SIZE);
        }
        self.bump(|s| s.erases += 1);
        data[address..address + length].fill(0xff);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.data.borrow().len()
    }

    fn sector_size(&self) -> usize {
        self.sector_size
    }
}

/// File-backed NOR flash device: `RamFlash` semantics with every mutation
/// written through to the backing image, so state survives across runs.
pub struct FileFlash {
    ram: RamFlash,
    file: RefCell<File>,
    path: PathBuf,
}

impl FileFlash {
    /// Opens (or creates blank) a flash image of exactly `capacity` bytes.
    /// A shorter existing image is padded with erased bytes; a longer one is
    /// read truncated.
    pub fn open(path: &Path, capacity: usize, sector_size: usize) -> std::io::Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;
        contents.resize(capacity, 0xff);

        let ram = RamFlash::new(capacity, sector_size);
        ram.load(0, &contents);

        file.set_len(capacity as u64)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&contents)?;

        Ok(FileFlash {
            ram,
            file: RefCell::new(file),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn stats(&self) -> FlashStats {
        self.ram.stats()
    }

    /// Provisioning helper; bypasses program rules, like `RamFlash::load`.
    pub fn load(&self, address: usize, data: &[u8]) -> std::io::Result<()> {
        self.ram.load(address, data);
        self.flush_range(address, data.len())
    }

    fn flush_range(&self, address: usize, length: usize) -> std::io::Result<()> {
        let snapshot = self.ram.snapshot(address, length);
        let mut file = self.file.borrow_mut();
        file.seek(SeekFrom::Start(address as u64))?;
        file.write_all(&snapshot)
    }

    fn flush_or_fail(&self, address: usize, length: usize) -> Result<(), FlashDrvError> {
        self.flush_range(address, length).map_err(|err| {
            log::error!("flash image write-through failed: {}", err);
            FlashDrvError::FAIL
        })
    }
}

impl FlashStorage for FileFlash {
    fn read(&self, buffer: &mut [u8], address: usize) -> Result<(), FlashDrvError> {
        self.ram.read(buffer, address)
    }

    fn write(&self, buffer: &[u8], address: usize) -> Result<(), FlashDrvError> {
        self.ram.write(buffer, address)?;
        self.flush_or_fail(address, buffer.len())
    }

    fn erase(&self, address: usize, length: usize) -> Result<(), FlashDrvError> {
        self.ram.erase(address, length)?;
        self.flush_or_fail(address, length)
    }

    fn capacity(&self) -> usize {
        self.ram.capacity()
    }

    fn sector_size(&self) -> usize {
        self.ram.sector_size()
    }
}
