// Licensed under the Apache-2.0 license

//! Generic interface for raw flash access.

use core::result::Result;

/// Interface a flash driver implements for the boot-slot store. Every
/// operation blocks until the hardware completes or the driver times out;
/// reads go to the medium, never to a cache.
pub trait FlashStorage {
    /// Read from the flash storage, filling the provided buffer with data.
    fn read(&self, buffer: &mut [u8], address: usize) -> Result<(), FlashDrvError>;

    /// Write the full contents of the buffer, starting at the specified
    /// address. The target range must have been erased.
    fn write(&self, buffer: &[u8], address: usize) -> Result<(), FlashDrvError>;

    /// Erase `length` bytes starting at `address`. Both must be aligned to
    /// the erase sector size.
    fn erase(&self, address: usize, length: usize) -> Result<(), FlashDrvError>;

    /// Size of the flash storage in bytes.
    fn capacity(&self) -> usize;

    /// Erase granularity in bytes.
    fn sector_size(&self) -> usize;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum FlashDrvError {
    /// Generic failure condition
    FAIL = 1,
    /// Underlying system is busy; retry
    BUSY = 2,
    /// An invalid parameter was passed
    INVAL = 6,
    /// Parameter passed was too large
    SIZE = 7,
    /// Device is not available
    NODEVICE = 11,
}
