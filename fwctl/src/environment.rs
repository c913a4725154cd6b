// Licensed under the Apache-2.0 license

//! Session environment surface: a plain key/value mapping shared between the
//! boot-slot store (exported state), the secure-boot closer (expected fuse
//! values), and whatever command layer drives them. Always passed explicitly;
//! the core keeps no global.

/// Key/value store for the current boot session. Persistence beyond the
/// session, if any, belongs to the surrounding tooling.
pub trait Environment {
    fn get(&self, key: &str) -> Option<&str>;
    fn set(&mut self, key: &str, value: &str);

    /// Reads `key` as a 32-bit hexadecimal value, `0x` prefix optional.
    /// `None` when the key is absent or does not parse.
    fn get_hex(&self, key: &str) -> Option<u32> {
        let raw = self.get(key)?;
        let digits = raw
            .strip_prefix("0x")
            .or_else(|| raw.strip_prefix("0X"))
            .unwrap_or(raw);
        u32::from_str_radix(digits, 16).ok()
    }
}
