// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! # CPU filter dialog
//!
//! The dialog owns a [`CpuSelection`] from the moment it opens until it is
//! answered. The UI layer feeds it typed [`CpuFilterEvent`]s. `accept` and
//! `reject` take the dialog by value, so once it has been answered there is
//! nothing left to send events to and the selection is gone with it.
//!
//!```
//!     use trace_filter::{CpuFilterDialog, Cpumask, TraceView, TraceViewStore};
//!
//!     let store = TraceViewStore::from_mask(Cpumask::from_cpulist(4, "0,2").unwrap(), false);
//!     let mut view = TraceView::new(store);
//!
//!     let mut dialog = CpuFilterDialog::open(view.model().unwrap()).unwrap();
//!     dialog.on_cpu_toggled(1, true).unwrap();
//!     dialog.on_cpu_toggled(0, false).unwrap();
//!     dialog.accept(&mut view).unwrap();
//!
//!     assert_eq!(view.model().unwrap().cpu_mask().to_cpulist(), "1-2");
//!```

use std::fmt;

use log::info;
use log::warn;

use crate::reconcile;
use crate::CpuSelection;
use crate::FilterError;
use crate::Reconciled;
use crate::TraceStore;
use crate::TraceView;

pub const ALL_CPUS_LABEL: &str = "All CPUs";

/// Input delivered by the UI while the dialog is open.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CpuFilterEvent {
    AllCpusToggled(bool),
    CpuToggled { cpu: usize, active: bool },
    Accept,
    Reject,
}

impl CpuFilterEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CpuFilterEvent::Accept | CpuFilterEvent::Reject)
    }
}

/// How the dialog was answered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DialogResponse {
    Accepted(Reconciled),
    Rejected,
}

/// A check button in the dialog, in display order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CpuControl {
    AllCpus { active: bool },
    Cpu { cpu: usize, active: bool },
}

impl CpuControl {
    pub fn active(&self) -> bool {
        match self {
            CpuControl::AllCpus { active } | CpuControl::Cpu { active, .. } => *active,
        }
    }
}

impl fmt::Display for CpuControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CpuControl::AllCpus { .. } => f.write_str(ALL_CPUS_LABEL),
            CpuControl::Cpu { cpu, .. } => write!(f, "CPU {cpu}"),
        }
    }
}

/// Result of feeding one event to an open dialog.
#[derive(Debug)]
pub enum DialogStep {
    Open(CpuFilterDialog),
    Closed(DialogResponse),
}

#[derive(Debug)]
pub struct CpuFilterDialog {
    selection: CpuSelection,
}

impl CpuFilterDialog {
    pub const TITLE: &'static str = "Filter CPUS";

    /// Open the dialog seeded from the store's current CPU state. On error no
    /// dialog exists.
    pub fn open<S: TraceStore + ?Sized>(store: &S) -> Result<Self, FilterError> {
        let selection = CpuSelection::seed(store)?;
        Ok(Self { selection })
    }

    pub fn selection(&self) -> &CpuSelection {
        &self.selection
    }

    /// The "All CPUs" control followed by one control per CPU.
    pub fn controls(&self) -> Vec<CpuControl> {
        let mut controls = Vec::with_capacity(self.selection.nr_cpus() + 1);
        controls.push(CpuControl::AllCpus {
            active: self.selection.all_cpus(),
        });
        controls.extend((0..self.selection.nr_cpus()).map(|cpu| CpuControl::Cpu {
            cpu,
            active: self.selection.cpu_active(cpu),
        }));
        controls
    }

    pub fn on_all_cpus_toggled(&mut self, active: bool) {
        self.selection.on_all_cpus_toggled(active);
    }

    pub fn on_cpu_toggled(&mut self, cpu: usize, active: bool) -> Result<(), FilterError> {
        self.selection.on_cpu_toggled(cpu, active)
    }

    /// Commit the selection into the store behind `view`. The dialog is
    /// consumed whether or not the commit succeeds.
    pub fn accept<S: TraceStore>(self, view: &mut TraceView<S>) -> Result<Reconciled, FilterError> {
        info!("{}: accept", Self::TITLE);
        reconcile::commit(view, &self.selection)
    }

    /// Drop the selection without touching the store.
    pub fn reject(self) {
        info!("{}: reject", Self::TITLE);
    }

    /// Feed one event. Toggles keep the dialog open, `Accept` and `Reject`
    /// close it. A toggle for a CPU the dialog does not have is logged and
    /// ignored.
    pub fn handle<S: TraceStore>(
        mut self,
        event: CpuFilterEvent,
        view: &mut TraceView<S>,
    ) -> Result<DialogStep, FilterError> {
        match event {
            CpuFilterEvent::AllCpusToggled(active) => self.on_all_cpus_toggled(active),
            CpuFilterEvent::CpuToggled { cpu, active } => {
                if let Err(e) = self.on_cpu_toggled(cpu, active) {
                    warn!("ignoring CPU toggle: {}", e);
                }
            }
            CpuFilterEvent::Accept => {
                let res = self.accept(view)?;
                return Ok(DialogStep::Closed(DialogResponse::Accepted(res)));
            }
            CpuFilterEvent::Reject => {
                self.reject();
                return Ok(DialogStep::Closed(DialogResponse::Rejected));
            }
        }
        Ok(DialogStep::Open(self))
    }

    /// Feed events until the dialog is answered. Events after the answer are
    /// dropped. Running out of events while open counts as a dismissal.
    pub fn run<S, I>(self, events: I, view: &mut TraceView<S>) -> Result<DialogResponse, FilterError>
    where
        S: TraceStore,
        I: IntoIterator<Item = CpuFilterEvent>,
    {
        let mut events = events.into_iter();
        let mut dialog = self;
        let mut answer = None;
        for event in events.by_ref() {
            match dialog.handle(event, view)? {
                DialogStep::Open(d) => dialog = d,
                DialogStep::Closed(response) => {
                    answer = Some(response);
                    break;
                }
            }
        }

        let Some(response) = answer else {
            info!("{}: dismissed", Self::TITLE);
            return Ok(DialogResponse::Rejected);
        };
        let dropped = events.count();
        if dropped > 0 {
            warn!("dialog closed, dropping {} further events", dropped);
        }
        Ok(response)
    }
}
