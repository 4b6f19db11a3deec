// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

use log::debug;

use crate::Cpumask;
use crate::FilterError;
use crate::TraceStore;

/// CPUs picked in an open CPU filter dialog.
///
/// `all_cpus` is lazy: turning it on or off never rewrites mask bits. While it
/// is set every CPU counts as selected, whatever the mask holds; once it is
/// cleared the mask is authoritative again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CpuSelection {
    all_cpus: bool,
    mask: Cpumask,
}

impl CpuSelection {
    /// Snapshot the store's current CPU state.
    pub fn seed<S: TraceStore + ?Sized>(store: &S) -> Result<Self, FilterError> {
        let all_cpus = store.all_cpus();
        let mut mask = Cpumask::try_new(store.nr_cpus())?;
        for cpu in 0..mask.len() {
            if all_cpus || store.cpu_isset(cpu) {
                mask.set_cpu(cpu)?;
            }
        }

        debug!(
            "seeded CPU selection: all_cpus={} mask={}",
            all_cpus,
            mask.to_cpulist()
        );
        Ok(Self { all_cpus, mask })
    }

    pub fn from_parts(all_cpus: bool, mask: Cpumask) -> Self {
        Self { all_cpus, mask }
    }

    pub fn nr_cpus(&self) -> usize {
        self.mask.len()
    }

    pub fn all_cpus(&self) -> bool {
        self.all_cpus
    }

    pub fn mask(&self) -> &Cpumask {
        &self.mask
    }

    /// "All CPUs" control changed. Individual bits are left as they are.
    pub fn on_all_cpus_toggled(&mut self, active: bool) {
        debug!("all CPUs toggled: {}", active);
        self.all_cpus = active;
    }

    /// A single CPU control changed. `all_cpus` is left as it is.
    pub fn on_cpu_toggled(&mut self, cpu: usize, active: bool) -> Result<(), FilterError> {
        debug!("CPU {} toggled: {}", cpu, active);
        match active {
            true => self.mask.set_cpu(cpu),
            false => self.mask.clear_cpu(cpu),
        }
    }

    /// State of an individual CPU control.
    pub fn cpu_active(&self, cpu: usize) -> bool {
        self.mask.test_cpu(cpu)
    }

    /// The CPUs a commit would leave enabled.
    pub fn enabled_cpus(&self) -> Cpumask {
        let mut enabled = self.mask.clone();
        if self.all_cpus {
            enabled.set_all();
        }
        enabled
    }
}
