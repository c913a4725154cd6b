// Licensed under the Apache-2.0 license

use crate::flash::hil::{FlashDrvError, FlashStorage};

/// A bounds-checked view into a contiguous region of the underlying flash.
///
/// All offsets are relative to the partition base; operations that would
/// cross the partition end fail with `FlashDrvError::SIZE` before touching
/// the driver.
pub struct FlashPartition<'a> {
    driver: &'a dyn FlashStorage,
    name: &'static str,
    base_offset: usize,
    length: usize,
}

impl<'a> FlashPartition<'a> {
    /// Creates a partition over `[base_offset, base_offset + length)`.
    /// Fails with `FlashDrvError::SIZE` if the region exceeds the device, or
    /// `FlashDrvError::INVAL` if it is not sector-aligned.
    pub fn new(
        driver: &'a dyn FlashStorage,
        name: &'static str,
        base_offset: usize,
        length: usize,
    ) -> Result<Self, FlashDrvError> {
        if base_offset + length > driver.capacity() {
            return Err(FlashDrvError::SIZE);
        }
        let sector_size = driver.sector_size();
        if base_offset % sector_size != 0 || length % sector_size != 0 {
            return Err(FlashDrvError::INVAL);
        }
        Ok(FlashPartition {
            driver,
            name,
            base_offset,
            length,
        })
    }

    pub fn read(&self, partition_offset: usize, buf: &mut [u8]) -> Result<(), FlashDrvError> {
        if partition_offset + buf.len() > self.length {
            return Err(FlashDrvError::SIZE);
        }
        self.driver.read(buf, self.base_offset + partition_offset)
    }

    pub fn write(&self, partition_offset: usize, buf: &[u8]) -> Result<(), FlashDrvError> {
        if partition_offset + buf.len() > self.length {
            return Err(FlashDrvError::SIZE);
        }
        self.driver.write(buf, self.base_offset + partition_offset)
    }

    pub fn erase(&self, partition_offset: usize, len: usize) -> Result<(), FlashDrvError> {
        if partition_offset + len > self.length {
            return Err(FlashDrvError::SIZE);
        }
        self.driver.erase(self.base_offset + partition_offset, len)
    }

    pub fn sector_size(&self) -> usize {
        self.driver.sector_size()
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}
