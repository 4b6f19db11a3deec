// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

use std::ops::Deref;
use std::ops::DerefMut;

use log::debug;

/// The trace list view and the store it displays.
///
/// Bulk updates go through [`TraceView::detach`]: the view stops reporting
/// a model until the returned guard is dropped, so nothing reading the view
/// can observe a half-applied update.
#[derive(Debug)]
pub struct TraceView<S> {
    store: S,
    attached: bool,
    reattach_count: u64,
}

impl<S> TraceView<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            attached: true,
            reattach_count: 0,
        }
    }

    /// The store currently shown, `None` while detached.
    pub fn model(&self) -> Option<&S> {
        self.attached.then_some(&self.store)
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// How many times the store has been reattached after a bulk update.
    pub fn reattach_count(&self) -> u64 {
        self.reattach_count
    }

    /// Detach the store for mutation. It is reattached when the guard drops,
    /// on success and error paths alike.
    pub fn detach(&mut self) -> DetachedStore<'_, S> {
        debug!("trace view: detaching model");
        self.attached = false;
        DetachedStore { view: self }
    }

    pub fn into_inner(self) -> S {
        self.store
    }
}

pub struct DetachedStore<'a, S> {
    view: &'a mut TraceView<S>,
}

impl<S> Deref for DetachedStore<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.view.store
    }
}

impl<S> DerefMut for DetachedStore<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.view.store
    }
}

impl<S> Drop for DetachedStore<'_, S> {
    fn drop(&mut self) {
        self.view.attached = true;
        self.view.reattach_count += 1;
        debug!("trace view: model reattached");
    }
}
