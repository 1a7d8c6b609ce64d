//! Cvar-style engine configuration: named, typed tunables with a "modified"
//! flag, directly modeled on the teacher's `myq2_common::cvar::CvarContext`
//! (HashMap-indexed `Vec<Cvar>` for O(1) lookup by name, same flag bits for
//! archive / read-only).

use std::collections::HashMap;

/// A cvar is read-only and cannot be changed after initial creation.
pub const CVAR_NOSET: u32 = 1 << 0;
/// A cvar should be persisted across runs (not enforced here, just carried).
pub const CVAR_ARCHIVE: u32 = 1 << 1;

/// A single named engine tunable.
#[derive(Debug, Clone)]
pub struct Cvar {
    pub name: String,
    pub string: String,
    pub value: f32,
    pub flags: u32,
    pub modified: bool,
}

/// The full set of engine tunables, keyed by name.
#[derive(Debug, Default)]
pub struct CvarRegistry {
    vars: Vec<Cvar>,
    index: HashMap<String, usize>,
}

impl CvarRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a cvar by name, creating it with `default_value`/`flags` if
    /// it doesn't already exist. Mirrors `Cvar_Get`.
    pub fn get(&mut self, name: &str, default_value: &str, flags: u32) -> &Cvar {
        if let Some(&idx) = self.index.get(name) {
            return &self.vars[idx];
        }

        let value = default_value.parse().unwrap_or(0.0);
        let idx = self.vars.len();
        self.vars.push(Cvar {
            name: name.to_string(),
            string: default_value.to_string(),
            value,
            flags,
            modified: false,
        });
        self.index.insert(name.to_string(), idx);
        &self.vars[idx]
    }

    /// Set a cvar's value from a string, refusing if `CVAR_NOSET` is set.
    /// Mirrors `Cvar_Set`.
    pub fn set(&mut self, name: &str, value: &str) {
        let Some(&idx) = self.index.get(name) else {
            log::warn!(target: "config", "set of unknown cvar '{name}' ignored");
            return;
        };

        let var = &mut self.vars[idx];
        if var.flags & CVAR_NOSET != 0 {
            log::warn!(target: "config", "'{name}' is read-only, ignoring set to '{value}'");
            return;
        }

        var.string = value.to_string();
        var.value = value.parse().unwrap_or(0.0);
        var.modified = true;
    }

    pub fn value(&self, name: &str) -> f32 {
        self.index
            .get(name)
            .map(|&idx| self.vars[idx].value)
            .unwrap_or(0.0)
    }

    pub fn string(&self, name: &str) -> &str {
        self.index
            .get(name)
            .map(|&idx| self.vars[idx].string.as_str())
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_is_idempotent() {
        let mut registry = CvarRegistry::new();
        registry.get("r_vsync", "1", 0);
        registry.get("r_vsync", "0", 0); // second call shouldn't reset it
        assert_eq!(registry.value("r_vsync"), 1.0);
    }

    #[test]
    fn set_respects_noset_flag() {
        let mut registry = CvarRegistry::new();
        registry.get("r_max_frames_in_flight", "2", CVAR_NOSET);
        registry.set("r_max_frames_in_flight", "4");
        assert_eq!(registry.value("r_max_frames_in_flight"), 2.0);
    }

    #[test]
    fn set_updates_value_and_modified_flag() {
        let mut registry = CvarRegistry::new();
        registry.get("r_validation", "0", 0);
        registry.set("r_validation", "1");
        assert_eq!(registry.value("r_validation"), 1.0);
        assert!(registry.index.contains_key("r_validation"));
    }
}
