// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! # Trace filter selection
//!
//! The non-graphical half of a trace viewer's filter dialogs.
//!
//! The CPU filter dialog snapshots the trace store's per-CPU enablement into
//! a [`CpuSelection`] (an "all CPUs" flag and a [`Cpumask`]), lets the UI
//! toggle it, and on accept reconciles it back into the store while the store
//! is detached from its [`TraceView`]. Rejecting drops the selection and the
//! store never notices.
//!
//! The event filter dialog builds the system/event tree shown to the user.

pub mod config;

mod cpumask;
pub use cpumask::read_cpulist;
pub use cpumask::Cpumask;
pub use cpumask::CPUMASK_WORD_BITS;

mod error;
pub use error::FilterError;
pub use error::ReconcileStep;
pub use error::StoreError;

mod store;
pub use store::TraceRecord;
pub use store::TraceStore;
pub use store::TraceViewStore;

mod view;
pub use view::DetachedStore;
pub use view::TraceView;

mod selection;
pub use selection::CpuSelection;

pub mod reconcile;
pub use reconcile::Reconciled;

mod dialog;
pub use dialog::CpuControl;
pub use dialog::CpuFilterDialog;
pub use dialog::CpuFilterEvent;
pub use dialog::DialogResponse;
pub use dialog::DialogStep;
pub use dialog::ALL_CPUS_LABEL;

mod event_filter;
pub use event_filter::build_event_tree;
pub use event_filter::EventFilterDialog;
pub use event_filter::EventFormat;
pub use event_filter::EventNode;
pub use event_filter::ALL_EVENTS_LABEL;
