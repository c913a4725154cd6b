// Licensed under the Apache-2.0 license

use std::collections::HashMap;

use imgsel_common::Environment;

/// Minimal session environment for scenario tests.
#[derive(Default)]
pub struct MapEnv(pub HashMap<String, String>);

impl MapEnv {
    /// Environment holding `srk_0..count` expectations, all set to `value`.
    pub fn with_srk(value: u32, count: usize) -> Self {
        let mut env = MapEnv::default();
        for i in 0..count {
            env.set(&format!("srk_{}", i), &format!("{:#x}", value));
        }
        env
    }
}

impl Environment for MapEnv {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|v| v.as_str())
    }

    fn set(&mut self, key: &str, value: &str) {
        self.0.insert(key.to_string(), value.to_string());
    }
}
