// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! Pushing a confirmed [`CpuSelection`] into a trace store.

use log::info;

use crate::CpuSelection;
use crate::FilterError;
use crate::ReconcileStep;
use crate::TraceStore;
use crate::TraceView;

/// What a successful reconciliation did to the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reconciled {
    /// A single "set all CPUs" call.
    AllCpus,
    /// One call per CPU.
    PerCpu { enabled: usize, disabled: usize },
}

/// Apply `selection` to `store`.
///
/// With `all_cpus` set this is one `set_all_cpus()` call. Otherwise every CPU
/// is set or cleared in ascending order. The first store error aborts the
/// loop and is returned; CPUs before it have already been applied.
pub fn apply<S: TraceStore + ?Sized>(
    store: &mut S,
    selection: &CpuSelection,
) -> Result<Reconciled, FilterError> {
    if selection.all_cpus() {
        store
            .set_all_cpus()
            .map_err(|source| FilterError::Reconciliation {
                step: ReconcileStep::AllCpus,
                source,
            })?;
        return Ok(Reconciled::AllCpus);
    }

    let found = store.nr_cpus();
    if found != selection.nr_cpus() {
        return Err(FilterError::StaleCpuCount {
            expected: selection.nr_cpus(),
            found,
        });
    }

    let (mut enabled, mut disabled) = (0, 0);
    for cpu in 0..selection.nr_cpus() {
        let (step, res) = if selection.mask().test_cpu(cpu) {
            enabled += 1;
            (ReconcileStep::SetCpu(cpu), store.set_cpu(cpu))
        } else {
            disabled += 1;
            (ReconcileStep::ClearCpu(cpu), store.clear_cpu(cpu))
        };
        res.map_err(|source| FilterError::Reconciliation { step, source })?;
    }

    Ok(Reconciled::PerCpu { enabled, disabled })
}

/// Apply `selection` to the store behind `view`, keeping the store detached
/// from the view for the whole update.
pub fn commit<S: TraceStore>(
    view: &mut TraceView<S>,
    selection: &CpuSelection,
) -> Result<Reconciled, FilterError> {
    let mut store = view.detach();
    let res = apply(&mut *store, selection)?;
    match res {
        Reconciled::AllCpus => info!("CPU filter: all CPUs enabled"),
        Reconciled::PerCpu { enabled, disabled } => info!(
            "CPU filter: {} CPUs enabled ({}), {} disabled",
            enabled,
            selection.mask().to_cpulist(),
            disabled
        ),
    }
    Ok(res)
}
