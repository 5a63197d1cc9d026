//! Observable controller state: a `watch` snapshot for renderers and a
//! `broadcast` stream of discrete events for anything that reacts to changes.

use std::sync::atomic::{AtomicU64, Ordering};

use shared::domain::{Product, User};
use tokio::sync::{broadcast, watch};

use crate::lane::{LaneKind, LaneState};

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuccessBanner {
    pub lane: LaneKind,
    pub message: String,
    /// Bumped on every new banner; a pending expiry only clears its own banner.
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ControllerSnapshot {
    pub users: LaneState<User>,
    pub products: LaneState<Product>,
    pub banner: Option<SuccessBanner>,
    pub mounted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    Mounted,
    Unmounted,
    LaneLoading { lane: LaneKind },
    LaneLoaded { lane: LaneKind, count: usize },
    LaneFailed { lane: LaneKind, message: String },
    Created { lane: LaneKind, message: String },
    CreateFailed { lane: LaneKind, message: String },
    BannerShown { message: String },
    BannerCleared,
}

pub struct StateStore {
    state: watch::Sender<ControllerSnapshot>,
    events: broadcast::Sender<ControllerEvent>,
    /// Bumped by `reset`, only while the snapshot write lock is held.
    epoch: AtomicU64,
}

impl StateStore {
    pub fn new() -> Self {
        let (state, _) = watch::channel(ControllerSnapshot::default());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state,
            events,
            epoch: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        self.state.borrow().clone()
    }

    pub fn read<T>(&self, f: impl FnOnce(&ControllerSnapshot) -> T) -> T {
        f(&self.state.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<ControllerSnapshot> {
        self.state.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    /// Applies one atomic change; subscribers see either the old or the new
    /// snapshot, never a half-applied one.
    pub(crate) fn update(&self, f: impl FnOnce(&mut ControllerSnapshot)) {
        self.state.send_modify(f);
    }

    /// Current teardown epoch. Work started in one epoch must go through
    /// `update_in` so it cannot write into a later one.
    pub(crate) fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Like `update`, but drops the change when a `reset` happened since
    /// `epoch` was read. Returns whether the change was applied.
    pub(crate) fn update_in(&self, epoch: u64, f: impl FnOnce(&mut ControllerSnapshot)) -> bool {
        self.state.send_if_modified(|snapshot| {
            if self.epoch.load(Ordering::Acquire) != epoch {
                return false;
            }
            f(snapshot);
            true
        })
    }

    /// Discards all state and starts a new epoch.
    pub(crate) fn reset(&self) {
        self.state.send_modify(|snapshot| {
            self.epoch.fetch_add(1, Ordering::AcqRel);
            *snapshot = ControllerSnapshot::default();
        });
    }

    pub(crate) fn emit(&self, event: ControllerEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    pub(crate) fn clear_banner(&self, generation: u64) -> bool {
        let mut cleared = false;
        self.state.send_if_modified(|snapshot| {
            if snapshot
                .banner
                .as_ref()
                .is_some_and(|banner| banner.generation == generation)
            {
                snapshot.banner = None;
                cleared = true;
            }
            cleared
        });
        if cleared {
            self.emit(ControllerEvent::BannerCleared);
        }
        cleared
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_generation_does_not_clear_newer_banner() {
        let store = StateStore::new();
        store.update(|s| {
            s.banner = Some(SuccessBanner {
                lane: LaneKind::Users,
                message: "User created successfully".into(),
                generation: 2,
            })
        });

        assert!(!store.clear_banner(1));
        assert!(store.snapshot().banner.is_some());

        assert!(store.clear_banner(2));
        assert!(store.snapshot().banner.is_none());
    }

    #[test]
    fn reset_drops_writes_from_an_earlier_epoch() {
        let store = StateStore::new();
        let before = store.epoch();
        assert!(store.update_in(before, |s| s.users.loading = true));

        store.reset();
        assert_ne!(store.epoch(), before);
        assert_eq!(store.snapshot(), ControllerSnapshot::default());

        assert!(!store.update_in(before, |s| s.users.loading = true));
        assert!(!store.snapshot().users.loading);
        assert!(store.update_in(store.epoch(), |s| s.users.loading = true));
        assert!(store.snapshot().users.loading);
    }

    #[tokio::test]
    async fn subscribers_see_updates() {
        let store = StateStore::new();
        let mut rx = store.subscribe();
        let mut events = store.subscribe_events();

        store.update(|s| s.mounted = true);
        store.emit(ControllerEvent::Mounted);

        rx.changed().await.expect("changed");
        assert!(rx.borrow().mounted);
        assert_eq!(events.recv().await.expect("event"), ControllerEvent::Mounted);
    }
}
