// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

use std::collections::TryReserveError;
use std::fmt;

use thiserror::Error;

/// Errors reported by a [`TraceStore`](crate::TraceStore) mutator.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("CPU {cpu} out of range, store has {nr_cpus} CPUs")]
    InvalidCpu { cpu: usize, nr_cpus: usize },

    #[error("trace store unavailable: {0}")]
    Unavailable(String),
}

/// The store call a reconciliation was executing when it failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileStep {
    AllCpus,
    SetCpu(usize),
    ClearCpu(usize),
}

impl fmt::Display for ReconcileStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileStep::AllCpus => write!(f, "set all CPUs"),
            ReconcileStep::SetCpu(cpu) => write!(f, "set CPU {cpu}"),
            ReconcileStep::ClearCpu(cpu) => write!(f, "clear CPU {cpu}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("failed to allocate cpumask for {nr_cpus} CPUs")]
    Allocation {
        nr_cpus: usize,
        #[source]
        source: TryReserveError,
    },

    #[error("invalid CPU {cpu}, mask covers {nr_cpus} CPUs")]
    InvalidCpu { cpu: usize, nr_cpus: usize },

    #[error("failed to parse cpumask {input:?}: {reason}")]
    Parse { input: String, reason: String },

    #[error("selection covers {expected} CPUs but the trace store has {found}")]
    StaleCpuCount { expected: usize, found: usize },

    #[error("reconciliation aborted at {step}")]
    Reconciliation {
        step: ReconcileStep,
        #[source]
        source: StoreError,
    },
}

impl FilterError {
    /// True for the errors that abort a commit into the trace store.
    pub fn is_reconciliation(&self) -> bool {
        matches!(
            self,
            FilterError::Reconciliation { .. } | FilterError::StaleCpuCount { .. }
        )
    }
}
