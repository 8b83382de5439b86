//! Observer registration boundary.
//!
//! The grid exposes a registry of interested observers but implements no
//! notification fan-out itself; the surrounding system decides what to do
//! with the registrations. The registry stores each observer's declared
//! interest volume, refreshed on `update`.

use std::collections::HashMap;

use crate::gridview_space::Volume;
use crate::types::Handle;

/// Implemented by components that want to watch a region of the grid.
///
/// The surrounding system passes observers in by reference; the grid never
/// performs runtime capability discovery on them.
pub trait GridObserver {
    /// Stable identity of this observer.
    fn observer_handle(&self) -> Handle;

    /// World region this observer is interested in.
    fn interest_volume(&self) -> Volume;
}

/// Bookkeeping for registered observers.
#[derive(Debug, Default)]
pub struct ObserverRegistry {
    observers: HashMap<Handle, Volume>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer. Returns `false` if the same observer handle is
    /// already registered; the existing registration is left untouched.
    pub fn register(&mut self, observer: &dyn GridObserver) -> bool {
        let handle = observer.observer_handle();
        if self.observers.contains_key(&handle) {
            return false;
        }
        self.observers.insert(handle, observer.interest_volume());
        true
    }

    /// Refreshes a registered observer's interest volume. Returns `false`
    /// if the observer was never registered.
    pub fn update(&mut self, observer: &dyn GridObserver) -> bool {
        match self.observers.get_mut(&observer.observer_handle()) {
            Some(volume) => {
                *volume = observer.interest_volume();
                true
            }
            None => false,
        }
    }

    /// Drops a registration. Returns `false` if the observer was not
    /// registered.
    pub fn release(&mut self, observer: &dyn GridObserver) -> bool {
        self.observers.remove(&observer.observer_handle()).is_some()
    }

    /// Whether the handle is currently registered.
    pub fn is_registered(&self, handle: Handle) -> bool {
        self.observers.contains_key(&handle)
    }

    /// The stored interest volume for a registered observer.
    pub fn interest_of(&self, handle: Handle) -> Option<Volume> {
        self.observers.get(&handle).copied()
    }

    /// Number of registered observers.
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    struct FixedObserver {
        handle: Handle,
        volume: Volume,
    }

    impl GridObserver for FixedObserver {
        fn observer_handle(&self) -> Handle {
            self.handle
        }

        fn interest_volume(&self) -> Volume {
            self.volume
        }
    }

    fn observer(handle: u64, extent: f64) -> FixedObserver {
        FixedObserver {
            handle: Handle(handle),
            volume: Volume::from_corners(
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(extent, extent, extent),
            ),
        }
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = ObserverRegistry::new();
        let obs = observer(7, 10.0);
        assert!(registry.register(&obs));
        assert!(!registry.register(&obs));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_update_refreshes_interest_volume() {
        let mut registry = ObserverRegistry::new();
        assert!(registry.register(&observer(7, 10.0)));

        let moved = observer(7, 50.0);
        assert!(registry.update(&moved));
        assert_eq!(
            registry.interest_of(Handle(7)),
            Some(moved.interest_volume())
        );
    }

    #[test]
    fn test_update_unregistered_fails() {
        let mut registry = ObserverRegistry::new();
        assert!(!registry.update(&observer(7, 10.0)));
    }

    #[test]
    fn test_release_then_release_again_fails() {
        let mut registry = ObserverRegistry::new();
        let obs = observer(7, 10.0);
        registry.register(&obs);
        assert!(registry.release(&obs));
        assert!(!registry.release(&obs));
        assert!(registry.is_empty());
    }
}
