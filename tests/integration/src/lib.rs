// Licensed under the Apache-2.0 license

#[cfg(test)]
mod support;
#[cfg(test)]
mod test_boot_slot;
#[cfg(test)]
mod test_secure_close;
