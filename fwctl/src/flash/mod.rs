// Licensed under the Apache-2.0 license

pub mod hil;
pub use hil::{FlashDrvError, FlashStorage};
mod flash_partition;
pub use flash_partition::FlashPartition;
