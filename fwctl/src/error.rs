// Licensed under the Apache-2.0 license

//! Error taxonomy for the two subsystems. Every failure stays inspectable so
//! the command layer can tell observed hardware state, a bad request, and a
//! media fault apart; nothing is collapsed into a generic failure.

use core::fmt;

use boot_record::RecordCorruption;

use crate::flash::hil::FlashDrvError;
use crate::trust_root::TrustRootError;

/// Failures of the boot-slot store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStoreError {
    /// The underlying flash operation failed. Not retried here; after a
    /// failed erase-then-write sequence the record region is indeterminate
    /// until the next successful update.
    Media(FlashDrvError),
    /// Magic or checksum mismatch. Never auto-repaired; a fabricated default
    /// record would mask tampering or a failing part.
    CorruptRecord(RecordCorruption),
    /// Caller-supplied slot value outside {0, 1}.
    InvalidArgument,
}

impl From<FlashDrvError> for SlotStoreError {
    fn from(err: FlashDrvError) -> Self {
        SlotStoreError::Media(err)
    }
}

impl fmt::Display for SlotStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotStoreError::Media(err) => write!(f, "flash access failed: {:?}", err),
            SlotStoreError::CorruptRecord(kind) => {
                write!(f, "persistent boot record is corrupted ({})", kind)
            }
            SlotStoreError::InvalidArgument => {
                f.write_str("slot values must be 0 or 1")
            }
        }
    }
}

impl core::error::Error for SlotStoreError {}

/// Failures of the secure-boot close flow. All leave the device open except
/// `Media` on the final closing step, after which the device state is
/// ambiguous and must be treated as potentially half-closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecureCloseError {
    Media(TrustRootError),
    /// No usable expected value configured for SRK slot `index`.
    MissingExpectedValue { index: usize },
    /// Programmed fuse disagrees with the configured expectation.
    FuseMismatch {
        index: usize,
        programmed: u32,
        expected: u32,
    },
    /// Authentication events remain after allow-list subtraction.
    UnresolvedAuthentication { events: usize },
}

impl From<TrustRootError> for SecureCloseError {
    fn from(err: TrustRootError) -> Self {
        SecureCloseError::Media(err)
    }
}

impl fmt::Display for SecureCloseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecureCloseError::Media(err) => write!(f, "fuse access failed: {:?}", err),
            SecureCloseError::MissingExpectedValue { index } => {
                write!(f, "srk_{} not in environment", index)
            }
            SecureCloseError::FuseMismatch {
                index,
                programmed,
                expected,
            } => write!(
                f,
                "srk_{} - programmed: {:#010x} != expected: {:#010x}",
                index, programmed, expected
            ),
            SecureCloseError::UnresolvedAuthentication { events } => write!(
                f,
                "{} unresolved authentication event(s); verify image signing and fusing",
                events
            ),
        }
    }
}

impl core::error::Error for SecureCloseError {}
