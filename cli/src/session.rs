// Licensed under the Apache-2.0 license

//! Session-scoped environment: lives for one invocation unless the caller
//! re-supplies it; expected fuse values flow in, exported boot-slot state
//! flows out.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{anyhow, Result};
use imgsel_common::Environment;

/// Map-backed environment for one tool invocation.
#[derive(Default)]
pub struct SessionEnv {
    values: BTreeMap<String, String>,
}

impl SessionEnv {
    pub fn insert(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    /// Merges KEY=VALUE lines; blank lines and `#` comments are skipped.
    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        for (number, line) in fs::read_to_string(path)?.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| anyhow!("line {}: expected KEY=VALUE, got '{}'", number + 1, line))?;
            self.insert(key.trim(), value.trim());
        }
        Ok(())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Environment for SessionEnv {
    fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|v| v.as_str())
    }

    fn set(&mut self, key: &str, value: &str) {
        self.insert(key, value);
    }
}

/// clap value parser for repeated `--env KEY=VALUE` arguments.
pub fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("srk_0=0x1234"),
            Ok(("srk_0".to_string(), "0x1234".to_string()))
        );
        assert!(parse_key_value("no-equals").is_err());
    }

    #[test]
    fn test_merge_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("env.txt");
        fs::write(&path, "# fuse expectations\nsrk_0 = 0xdeadbeef\n\nsrk_1=0x1\n").unwrap();

        let mut env = SessionEnv::default();
        env.merge_file(&path).unwrap();
        assert_eq!(env.get("srk_0"), Some("0xdeadbeef"));
        assert_eq!(env.get_hex("srk_1"), Some(1));

        fs::write(&path, "garbage line\n").unwrap();
        assert!(env.merge_file(&path).is_err());
    }
}
