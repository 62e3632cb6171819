//! Set of background children that have been spawned but not yet reaped.
//!
//! [`BackgroundRegistry`] itself is not synchronized. It is shared between the
//! main loop and the signal listener thread only through the `Mutex` held by
//! [`crate::jobs::JobTable`], and every mutation happens under that lock.

use crate::error::ShellError;
use nix::unistd::Pid;

/// Bucket count used when none is configured.
pub const DEFAULT_BUCKETS: usize = 64;

/// Hash set of pids with a fixed number of buckets and per-bucket chaining.
///
/// A pid lives in bucket `pid mod bucket_count`.
#[derive(Debug, Clone)]
pub struct BackgroundRegistry {
    buckets: Vec<Vec<Pid>>,
    len: usize,
}

impl Default for BackgroundRegistry {
    fn default() -> Self {
        Self::with_buckets(DEFAULT_BUCKETS)
    }
}

impl BackgroundRegistry {
    /// Creates an empty registry. A bucket count of zero is treated as one.
    pub fn with_buckets(count: usize) -> Self {
        Self {
            buckets: vec![Vec::new(); count.max(1)],
            len: 0,
        }
    }

    fn bucket_index(&self, pid: Pid) -> usize {
        pid.as_raw().rem_euclid(self.buckets.len() as i32) as usize
    }

    /// Starts tracking `pid`. Inserting a pid that is already tracked does nothing.
    ///
    /// # Errors
    /// [`ShellError::ResourceExhausted`] when the bucket cannot grow.
    pub fn insert(&mut self, pid: Pid) -> Result<(), ShellError> {
        let index = self.bucket_index(pid);
        let chain = &mut self.buckets[index];
        if chain.contains(&pid) {
            return Ok(());
        }
        chain
            .try_reserve(1)
            .map_err(|_| ShellError::ResourceExhausted(pid.as_raw()))?;
        chain.push(pid);
        self.len += 1;
        Ok(())
    }

    /// Stops tracking `pid` and reports whether it was tracked.
    pub fn remove(&mut self, pid: Pid) -> bool {
        let index = self.bucket_index(pid);
        let chain = &mut self.buckets[index];
        match chain.iter().position(|&p| p == pid) {
            Some(pos) => {
                chain.swap_remove(pos);
                self.len -= 1;
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.buckets[self.bucket_index(pid)].contains(&pid)
    }

    /// Calls `f` for every tracked pid, in no particular order.
    pub fn for_each(&self, mut f: impl FnMut(Pid)) {
        for chain in &self.buckets {
            for &pid in chain {
                f(pid);
            }
        }
    }

    /// Snapshot of the tracked pids.
    pub fn pids(&self) -> Vec<Pid> {
        let mut out = Vec::with_capacity(self.len);
        self.for_each(|pid| out.push(pid));
        out
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn pid(raw: i32) -> Pid {
        Pid::from_raw(raw)
    }

    #[test]
    fn test_insert_and_remove() {
        let mut registry = BackgroundRegistry::default();
        assert!(registry.is_empty());

        registry.insert(pid(100)).unwrap();
        registry.insert(pid(200)).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.contains(pid(100)));

        assert!(registry.remove(pid(100)));
        assert!(!registry.remove(pid(100)), "second remove must report absence");
        assert!(!registry.contains(pid(100)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_insert_is_noop() {
        let mut registry = BackgroundRegistry::default();
        registry.insert(pid(42)).unwrap();
        registry.insert(pid(42)).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.remove(pid(42)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_colliding_pids_share_a_bucket() {
        // 5, 69 and 133 all land in bucket 5 of 64
        let mut registry = BackgroundRegistry::with_buckets(64);
        for raw in [5, 69, 133] {
            registry.insert(pid(raw)).unwrap();
        }
        assert!(registry.remove(pid(69)));
        assert!(registry.contains(pid(5)));
        assert!(registry.contains(pid(133)));
        assert!(!registry.contains(pid(69)));
    }

    #[test]
    fn test_zero_buckets_is_clamped() {
        let mut registry = BackgroundRegistry::with_buckets(0);
        registry.insert(pid(7)).unwrap();
        registry.insert(pid(8)).unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_matches_set_semantics() {
        let mut registry = BackgroundRegistry::with_buckets(8);
        let mut model = HashSet::new();

        // deterministic mix of inserts and removes over a small pid range
        let mut state: u32 = 12345;
        for _ in 0..2000 {
            state = state.wrapping_mul(1103515245).wrapping_add(12345);
            let raw = ((state >> 16) % 50) as i32 + 1;
            if (state >> 8) & 1 == 0 {
                registry.insert(pid(raw)).unwrap();
                model.insert(raw);
            } else {
                assert_eq!(registry.remove(pid(raw)), model.remove(&raw));
            }
            assert_eq!(registry.len(), model.len());
        }

        let mut tracked: Vec<i32> = registry.pids().iter().map(|p| p.as_raw()).collect();
        let mut expected: Vec<i32> = model.into_iter().collect();
        tracked.sort();
        expected.sort();
        assert_eq!(tracked, expected);
    }
}
