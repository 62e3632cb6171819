//! Process state shared with the signal listener: a mutex guards the background
//! registry, and the foreground pid lives in an atomic that needs no lock.

use crate::registry::BackgroundRegistry;
use nix::unistd::Pid;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Mutex, MutexGuard};

/// The pid of the child the shell is currently blocked on, if any.
///
/// Written only by the main loop; read by the interrupt handler.
#[derive(Debug, Default)]
pub struct ForegroundSlot(AtomicI32);

impl ForegroundSlot {
    pub fn set(&self, pid: Pid) {
        self.0.store(pid.as_raw(), Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.0.store(0, Ordering::SeqCst);
    }

    pub fn get(&self) -> Option<Pid> {
        match self.0.load(Ordering::SeqCst) {
            0 => None,
            raw => Some(Pid::from_raw(raw)),
        }
    }
}

/// Process state shared between the main loop and the signal listener thread.
#[derive(Debug, Default)]
pub struct JobTable {
    background: Mutex<BackgroundRegistry>,
    foreground: ForegroundSlot,
}

impl JobTable {
    pub fn with_buckets(count: usize) -> Self {
        Self {
            background: Mutex::new(BackgroundRegistry::with_buckets(count)),
            foreground: ForegroundSlot::default(),
        }
    }

    /// Locks the background registry.
    ///
    /// The registry holds plain pids, so a panic in another holder cannot leave it
    /// half-updated and a poisoned lock is simply taken over.
    pub fn background(&self) -> MutexGuard<'_, BackgroundRegistry> {
        self.background
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn foreground(&self) -> &ForegroundSlot {
        &self.foreground
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_foreground_slot_roundtrip() {
        let slot = ForegroundSlot::default();
        assert_eq!(slot.get(), None);
        slot.set(Pid::from_raw(4321));
        assert_eq!(slot.get(), Some(Pid::from_raw(4321)));
        slot.clear();
        assert_eq!(slot.get(), None);
    }

    #[test]
    fn test_registry_shared_across_threads() {
        let table = Arc::new(JobTable::with_buckets(4));
        let workers: Vec<_> = (0..4)
            .map(|t| {
                let table = Arc::clone(&table);
                thread::spawn(move || {
                    for i in 0..100 {
                        let pid = Pid::from_raw(t * 1000 + i + 1);
                        table.background().insert(pid).unwrap();
                        if i % 2 == 0 {
                            assert!(table.background().remove(pid));
                        }
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }
        assert_eq!(table.background().len(), 200);
    }
}
