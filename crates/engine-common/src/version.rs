//! A monotone counter used as a "latest seen" marker so collectors can skip
//! re-uploading GPU data when the source component hasn't actually changed.

/// Wraps a `u64` that only ever increases. `update_to` is the single
/// operation collectors need: "did the source move past what I've already
/// consumed, and if so, remember where I am now."
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionId(u64);

impl VersionId {
    pub const fn zero() -> Self {
        VersionId(0)
    }

    /// Bump this version forward. Called by mutating setters on resources.
    pub fn bump(&mut self) -> Self {
        self.0 += 1;
        *self
    }

    /// Returns true iff `source` is strictly newer than `self`, and if so
    /// assigns `self = source`. Used by collectors to detect "this changed
    /// since I last looked" without diffing the payload itself.
    pub fn update_to(&mut self, source: VersionId) -> bool {
        if source > *self {
            *self = source;
            true
        } else {
            false
        }
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_to_only_advances_forward() {
        let mut current = VersionId::zero();
        let mut source = VersionId::zero();
        source.bump();

        assert!(current.update_to(source));
        assert_eq!(current, source);

        // same version again: no-op
        assert!(!current.update_to(source));
    }

    #[test]
    fn update_to_rejects_stale_source() {
        let mut current = VersionId::zero();
        current.bump();
        current.bump();

        let stale = VersionId::zero();
        assert!(!current.update_to(stale));
        assert_eq!(current.raw(), 2);
    }
}
