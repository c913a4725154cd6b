// Licensed under the Apache-2.0 license

//! One-way transition from open to closed secure-boot state.
//!
//! Closing is gated on two pre-flight checks: the authentication event
//! report must be clean (after subtracting the platform's allow-list of
//! known-benign self-test signatures), and every SRK fuse must match the
//! expected value configured in the environment. Only when every check
//! passes is the irreversible closing mechanism invoked. Any precondition
//! failure leaves the device open with no side effect; retry after
//! correcting the environment or fuses.

use core::fmt::Write;

use arrayvec::{ArrayString, ArrayVec};
use imgsel_config::{CloseMechanism, SecureCloseConfig};

use crate::environment::Environment;
use crate::error::SecureCloseError;
use crate::trust_root::{TrustRoot, AUTH_EVENT_MAX_LEN};

/// Blocking events kept per query. The close decision only needs "at least
/// one"; a report longer than this is truncated, not overrun.
pub const MAX_BLOCKING_EVENTS: usize = 8;

/// One authentication event as returned by the trust root.
#[derive(Debug, Clone)]
pub struct AuthEvent {
    len: usize,
    data: [u8; AUTH_EVENT_MAX_LEN],
}

impl AuthEvent {
    pub fn bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The device was already closed; nothing was touched.
    AlreadyClosed,
    Closed,
}

/// Driver of the close transition for one hardware variant.
pub struct SecureBootCloser<'a> {
    trust_root: &'a mut dyn TrustRoot,
    config: &'a SecureCloseConfig,
}

impl<'a> SecureBootCloser<'a> {
    pub fn new(trust_root: &'a mut dyn TrustRoot, config: &'a SecureCloseConfig) -> Self {
        SecureBootCloser { trust_root, config }
    }

    /// Reads the lifecycle state from the hardware.
    pub fn is_closed(&self) -> bool {
        self.trust_root.secure_boot_closed()
    }

    /// Drains the authentication event report and returns the events that
    /// are not on this platform's allow-list. Any returned event blocks
    /// closing.
    pub fn blocking_events(&self) -> ArrayVec<AuthEvent, MAX_BLOCKING_EVENTS> {
        let mut blocking = ArrayVec::new();
        let mut index = 0u32;
        let mut data = [0u8; AUTH_EVENT_MAX_LEN];
        while let Some(len) = self.trust_root.report_event(index, &mut data) {
            index += 1;
            let len = len.min(AUTH_EVENT_MAX_LEN);
            if self.is_known_benign(&data[..len]) {
                log::info!("ignoring known benign authentication event {}", index - 1);
                continue;
            }
            if blocking.try_push(AuthEvent { len, data }).is_err() {
                break;
            }
        }
        blocking
    }

    /// An event is benign when it matches an allow-listed signature over the
    /// shorter of the two lengths. The allow-list covers specific,
    /// hardware-validated self-test defects, nothing more.
    fn is_known_benign(&self, event: &[u8]) -> bool {
        self.config
            .known_benign_events
            .iter()
            .any(|known| {
                let n = event.len().min(known.len());
                event[..n] == known[..n]
            })
    }

    /// Performs the close transition.
    ///
    /// Expected SRK values come from the environment as `srk_<i>` hex keys,
    /// indexed by position in the platform's fuse locator list. Every
    /// locator must pass before any fuse is programmed. A failure of the
    /// final mechanism itself leaves the device in an ambiguous,
    /// potentially half-closed state that must be re-examined on the next
    /// boot.
    pub fn close(&mut self, env: &dyn Environment) -> Result<CloseOutcome, SecureCloseError> {
        // Already enforcing: success without reading configuration or fuses.
        if self.is_closed() {
            log::info!("secure boot already enabled");
            return Ok(CloseOutcome::AlreadyClosed);
        }

        let events = self.blocking_events();
        if !events.is_empty() {
            return Err(SecureCloseError::UnresolvedAuthentication {
                events: events.len(),
            });
        }

        for (index, fuse) in self.config.srk_fuses.iter().enumerate() {
            let programmed = self.trust_root.fuse_read(fuse.bank, fuse.word)?;

            let mut key = ArrayString::<16>::new();
            let _ = write!(key, "srk_{}", index);
            // An absent, unparsable, or zero expectation is unusable; SRK
            // hash words are never legitimately zero.
            let expected = match env.get_hex(&key) {
                None | Some(0) => {
                    return Err(SecureCloseError::MissingExpectedValue { index })
                }
                Some(value) => value,
            };

            if programmed != expected {
                return Err(SecureCloseError::FuseMismatch {
                    index,
                    programmed,
                    expected,
                });
            }
        }

        match self.config.mechanism {
            CloseMechanism::ProgramFuse { bank, word, value } => {
                self.trust_root.fuse_program(bank, word, value)?
            }
            CloseMechanism::PlatformCall => self.trust_root.platform_close()?,
        }
        log::info!("secure boot closed");
        Ok(CloseOutcome::Closed)
    }
}
