// Licensed under the Apache-2.0 license

//! Emulated trust root: a sparse one-time-programmable fuse array, the
//! secure-boot lifecycle state, and a queue of authentication events.
//! State is saved between runs as JSON, like the other emulated
//! provisioning-relevant peripherals.

use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use imgsel_common::{TrustRoot, TrustRootError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading or saving the persisted fuse state.
#[derive(Error, Debug)]
pub enum StateError {
    #[error("fuse state file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("fuse state file is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
struct FuseWord {
    bank: u32,
    word: u32,
    value: u32,
}

/// State saved between emulator runs.
#[derive(Serialize, Deserialize, Default)]
struct TrustRootState {
    fuses: Vec<FuseWord>,
    closed: bool,
    events: Vec<Vec<u8>>,
}

pub struct EmulatedTrustRoot {
    state: TrustRootState,
    /// Fuse bits whose presence means "closed", when closing is fuse-based
    /// on the emulated variant.
    secure_bit: Option<(u32, u32, u32)>,
    path: Option<PathBuf>,
}

impl EmulatedTrustRoot {
    /// A blank, open device with no programmed fuses.
    pub fn new() -> Self {
        EmulatedTrustRoot {
            state: TrustRootState::default(),
            secure_bit: None,
            path: None,
        }
    }

    /// Loads persisted state; a missing file yields a blank device that will
    /// be created on the first `save`.
    pub fn load(path: &Path) -> Result<Self, StateError> {
        let state = match File::open(path) {
            Ok(file) => serde_json::from_reader(file)?,
            Err(err) if err.kind() == ErrorKind::NotFound => TrustRootState::default(),
            Err(err) => return Err(err.into()),
        };
        Ok(EmulatedTrustRoot {
            state,
            secure_bit: None,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn save(&self) -> Result<(), StateError> {
        if let Some(path) = &self.path {
            let file = File::create(path)?;
            serde_json::to_writer_pretty(file, &self.state)?;
        }
        Ok(())
    }

    /// Declares which fuse bits indicate "closed" on this variant.
    pub fn with_secure_bit(mut self, bank: u32, word: u32, mask: u32) -> Self {
        self.secure_bit = Some((bank, word, mask));
        self
    }

    /// Provisioning helper: sets a fuse word outright, as the fusing tool
    /// used during manufacturing would.
    pub fn set_fuse(&mut self, bank: u32, word: u32, value: u32) {
        match self.find_mut(bank, word) {
            Some(fuse) => fuse.value = value,
            None => self.state.fuses.push(FuseWord { bank, word, value }),
        }
    }

    /// Queues an authentication event for the report interface.
    pub fn push_event(&mut self, event: &[u8]) {
        self.state.events.push(event.to_vec());
    }

    fn find(&self, bank: u32, word: u32) -> Option<&FuseWord> {
        self.state
            .fuses
            .iter()
            .find(|f| f.bank == bank && f.word == word)
    }

    fn find_mut(&mut self, bank: u32, word: u32) -> Option<&mut FuseWord> {
        self.state
            .fuses
            .iter_mut()
            .find(|f| f.bank == bank && f.word == word)
    }
}

impl Default for EmulatedTrustRoot {
    fn default() -> Self {
        Self::new()
    }
}

impl TrustRoot for EmulatedTrustRoot {
    fn fuse_read(&self, bank: u32, word: u32) -> Result<u32, TrustRootError> {
        // An unprogrammed fuse word reads as zero.
        Ok(self.find(bank, word).map(|f| f.value).unwrap_or(0))
    }

    fn fuse_program(&mut self, bank: u32, word: u32, value: u32) -> Result<(), TrustRootError> {
        match self.find_mut(bank, word) {
            // One-time programmable: programming can only set bits.
            Some(fuse) => fuse.value |= value,
            None => self.state.fuses.push(FuseWord { bank, word, value }),
        }
        Ok(())
    }

    fn report_event(&self, index: u32, buffer: &mut [u8]) -> Option<usize> {
        let event = self.state.events.get(index as usize)?;
        let len = event.len().min(buffer.len());
        buffer[..len].copy_from_slice(&event[..len]);
        Some(len)
    }

    fn secure_boot_closed(&self) -> bool {
        if self.state.closed {
            return true;
        }
        match self.secure_bit {
            Some((bank, word, mask)) => {
                self.find(bank, word).map(|f| f.value).unwrap_or(0) & mask == mask
            }
            None => false,
        }
    }

    fn platform_close(&mut self) -> Result<(), TrustRootError> {
        self.state.closed = true;
        Ok(())
    }
}
