use std::sync::{Arc, RwLock};

use serde::Serialize;

use super::{AutosaveStatus, Autosaver, Reconcile};

/// Asked before the user navigates away from an editor.
pub trait NavigationGuard: Send + Sync {
    fn can_leave(&self) -> bool;
}

impl<D> NavigationGuard for Autosaver<D>
where
    D: Reconcile + Serialize + Clone + Send + Sync + 'static,
{
    fn can_leave(&self) -> bool {
        let state = self.state.borrow();
        !state.is_dirty && state.status != AutosaveStatus::Saving
    }
}

impl<G: NavigationGuard + ?Sized> NavigationGuard for Arc<G> {
    fn can_leave(&self) -> bool {
        (**self).can_leave()
    }
}

/// Application-level registry the router consults; every open editor adds
/// its guard here instead of flipping a global flag.
#[derive(Clone, Default)]
pub struct NavigationGuards {
    guards: Arc<RwLock<Vec<Arc<dyn NavigationGuard>>>>,
}

impl NavigationGuards {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, guard: Arc<dyn NavigationGuard>) {
        if let Ok(mut guards) = self.guards.write() {
            guards.push(guard);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut guards) = self.guards.write() {
            guards.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.guards.read().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NavigationGuard for NavigationGuards {
    fn can_leave(&self) -> bool {
        match self.guards.read() {
            Ok(guards) => guards.iter().all(|g| g.can_leave()),
            Err(_) => false,
        }
    }
}
