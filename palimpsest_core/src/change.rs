// Copyright 2026 the Palimpsest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene change notification.
//!
//! The scene side owns a [`ChangeFeed`] and calls [`ChangeFeed::notify`]
//! whenever its content changes. Each cache holds a [`ChangeSubscription`]
//! and drains it before it next touches its pixels. Dropping the
//! subscription unsubscribes.
//!
//! The feed is single-threaded (`Rc` + `RefCell`); neither handle is `Send`.

use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::RefCell;

use kurbo::Rect;

/// What part of the scene changed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SceneChange {
    /// Anything may have changed.
    Everything,
    /// Only the given world-space area changed.
    Region(Rect),
}

impl From<Rect> for SceneChange {
    fn from(rect: Rect) -> Self {
        Self::Region(rect)
    }
}

impl From<Option<Rect>> for SceneChange {
    /// `None` means the whole scene changed.
    fn from(region: Option<Rect>) -> Self {
        region.map_or(Self::Everything, Self::Region)
    }
}

#[derive(Debug, Default)]
struct FeedInner {
    next_id: u64,
    queues: Vec<(u64, Vec<SceneChange>)>,
}

/// The publishing side of a scene change channel.
///
/// Cloning a feed yields another handle to the same channel.
#[derive(Clone, Debug, Default)]
pub struct ChangeFeed {
    inner: Rc<RefCell<FeedInner>>,
}

impl ChangeFeed {
    /// Creates a feed with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber. It sees only changes notified after this
    /// call.
    #[must_use]
    pub fn subscribe(&self) -> ChangeSubscription {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.queues.push((id, Vec::new()));
        ChangeSubscription {
            feed: Rc::downgrade(&self.inner),
            id,
        }
    }

    /// Queues `change` for every live subscriber.
    ///
    /// `Everything` supersedes whatever is already queued, and regions queued
    /// after an `Everything` are dropped since they cannot add to it.
    pub fn notify(&self, change: impl Into<SceneChange>) {
        let change = change.into();
        let mut inner = self.inner.borrow_mut();
        for (_, queue) in &mut inner.queues {
            match change {
                SceneChange::Everything => {
                    queue.clear();
                    queue.push(SceneChange::Everything);
                }
                SceneChange::Region(_) => {
                    if queue.last() != Some(&SceneChange::Everything) {
                        queue.push(change);
                    }
                }
            }
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().queues.len()
    }
}

/// The receiving side of a scene change channel.
#[derive(Debug)]
pub struct ChangeSubscription {
    feed: Weak<RefCell<FeedInner>>,
    id: u64,
}

impl ChangeSubscription {
    /// Takes every change queued since the last drain, oldest first.
    ///
    /// Returns an empty list once the feed has been dropped.
    #[must_use]
    pub fn drain(&mut self) -> Vec<SceneChange> {
        let Some(feed) = self.feed.upgrade() else {
            return Vec::new();
        };
        let mut inner = feed.borrow_mut();
        inner
            .queues
            .iter_mut()
            .find(|(id, _)| *id == self.id)
            .map(|(_, queue)| core::mem::take(queue))
            .unwrap_or_default()
    }

    /// Returns `true` if changes are waiting.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.feed.upgrade().is_some_and(|feed| {
            feed.borrow()
                .queues
                .iter()
                .any(|(id, queue)| *id == self.id && !queue.is_empty())
        })
    }
}

impl Drop for ChangeSubscription {
    fn drop(&mut self) {
        if let Some(feed) = self.feed.upgrade() {
            feed.borrow_mut().queues.retain(|(id, _)| *id != self.id);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
