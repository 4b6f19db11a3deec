// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! Trace store interface and the in-memory store backing the trace list.

use log::debug;
use serde::Deserialize;
use serde::Serialize;

use crate::Cpumask;
use crate::StoreError;

/// Per-CPU enablement owned by a trace store.
///
/// The filter dialogs only ever talk to a store through this trait. Mutators
/// report failures instead of silently ignoring them so a reconciliation can
/// stop at the first one.
pub trait TraceStore {
    /// Number of CPUs recorded in the trace.
    fn nr_cpus(&self) -> usize;

    /// Whether the store is in "every CPU enabled" mode.
    fn all_cpus(&self) -> bool;

    /// Enable every CPU in one call.
    fn set_all_cpus(&mut self) -> Result<(), StoreError>;

    fn cpu_isset(&self, cpu: usize) -> bool;

    fn set_cpu(&mut self, cpu: usize) -> Result<(), StoreError>;

    fn clear_cpu(&mut self, cpu: usize) -> Result<(), StoreError>;
}

/// One row of the trace list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceRecord {
    pub ts: u64,
    pub cpu: usize,
    pub event: String,
}

/// In-memory trace store. Rows of disabled CPUs are hidden from the list.
#[derive(Clone, Debug)]
pub struct TraceViewStore {
    all_cpus: bool,
    cpu_mask: Cpumask,
    records: Vec<TraceRecord>,
}

impl TraceViewStore {
    /// A store over `nr_cpus` CPUs with every CPU enabled.
    pub fn new(nr_cpus: usize) -> Self {
        let mut cpu_mask = Cpumask::new(nr_cpus);
        cpu_mask.set_all();
        Self {
            all_cpus: true,
            cpu_mask,
            records: vec![],
        }
    }

    /// A store with exactly the CPUs in `mask` enabled. `all_cpus` forces
    /// every CPU on.
    pub fn from_mask(mut cpu_mask: Cpumask, all_cpus: bool) -> Self {
        let all_cpus = all_cpus || (cpu_mask.len() > 0 && cpu_mask.is_full());
        if all_cpus {
            cpu_mask.set_all();
        }
        Self {
            all_cpus,
            cpu_mask,
            records: vec![],
        }
    }

    /// Attach trace rows, kept in timestamp order.
    pub fn with_records(mut self, mut records: Vec<TraceRecord>) -> Self {
        records.sort_by_key(|r| r.ts);
        self.records = records;
        self
    }

    pub fn cpu_mask(&self) -> &Cpumask {
        &self.cpu_mask
    }

    pub fn records(&self) -> &[TraceRecord] {
        &self.records
    }

    /// Rows whose CPU is currently enabled, in timestamp order.
    pub fn visible_rows(&self) -> impl Iterator<Item = &TraceRecord> + '_ {
        self.records.iter().filter(|r| self.cpu_isset(r.cpu))
    }

    fn check_cpu(&self, cpu: usize) -> Result<(), StoreError> {
        if cpu >= self.nr_cpus() {
            return Err(StoreError::InvalidCpu {
                cpu,
                nr_cpus: self.nr_cpus(),
            });
        }
        Ok(())
    }
}

impl TraceStore for TraceViewStore {
    fn nr_cpus(&self) -> usize {
        self.cpu_mask.len()
    }

    fn all_cpus(&self) -> bool {
        self.all_cpus
    }

    fn set_all_cpus(&mut self) -> Result<(), StoreError> {
        if self.all_cpus {
            return Ok(());
        }
        self.cpu_mask.set_all();
        self.all_cpus = true;
        debug!("trace store: all {} CPUs enabled", self.nr_cpus());
        Ok(())
    }

    fn cpu_isset(&self, cpu: usize) -> bool {
        // all_cpus keeps the mask full, so the mask alone answers.
        self.cpu_mask.test_cpu(cpu)
    }

    fn set_cpu(&mut self, cpu: usize) -> Result<(), StoreError> {
        self.check_cpu(cpu)?;
        if self.cpu_mask.test_cpu(cpu) {
            return Ok(());
        }
        self.cpu_mask.set_cpu(cpu).map_err(|_| StoreError::InvalidCpu {
            cpu,
            nr_cpus: self.nr_cpus(),
        })?;
        if self.cpu_mask.is_full() {
            self.all_cpus = true;
        }
        Ok(())
    }

    fn clear_cpu(&mut self, cpu: usize) -> Result<(), StoreError> {
        self.check_cpu(cpu)?;
        if !self.cpu_mask.test_cpu(cpu) {
            return Ok(());
        }
        self.cpu_mask.clear_cpu(cpu).map_err(|_| StoreError::InvalidCpu {
            cpu,
            nr_cpus: self.nr_cpus(),
        })?;
        self.all_cpus = false;
        Ok(())
    }
}
