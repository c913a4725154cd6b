// Licensed under the Apache-2.0 license

//! Emulated peripherals backing the command surface and the integration
//! tests: NOR flash devices (RAM- and file-backed) and a trust root with
//! persistable fuse state.

mod flash;
pub use flash::{FileFlash, FlashStats, RamFlash};
mod trust_root;
pub use trust_root::{EmulatedTrustRoot, StateError};
