// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

use trace_filter::reconcile;
use trace_filter::CpuFilterDialog;
use trace_filter::CpuFilterEvent;
use trace_filter::CpuSelection;
use trace_filter::Cpumask;
use trace_filter::DialogResponse;
use trace_filter::FilterError;
use trace_filter::Reconciled;
use trace_filter::StoreError;
use trace_filter::TraceRecord;
use trace_filter::TraceStore;
use trace_filter::TraceView;
use trace_filter::TraceViewStore;

fn store_with(nr_cpus: usize, cpus: &[usize]) -> TraceViewStore {
    let mut mask = Cpumask::new(nr_cpus);
    for &cpu in cpus {
        mask.set_cpu(cpu).unwrap();
    }
    TraceViewStore::from_mask(mask, false)
}

fn enabled(store: &TraceViewStore) -> Vec<usize> {
    (0..store.nr_cpus()).filter(|&c| store.cpu_isset(c)).collect()
}

/// A store that reports its CPUs as given and never enters all-CPUs mode on
/// its own, unlike `TraceViewStore`.
struct RawStore {
    nr_cpus: usize,
    cpus: Vec<usize>,
}

impl TraceStore for RawStore {
    fn nr_cpus(&self) -> usize {
        self.nr_cpus
    }

    fn all_cpus(&self) -> bool {
        false
    }

    fn set_all_cpus(&mut self) -> Result<(), StoreError> {
        self.cpus = (0..self.nr_cpus).collect();
        Ok(())
    }

    fn cpu_isset(&self, cpu: usize) -> bool {
        self.cpus.contains(&cpu)
    }

    fn set_cpu(&mut self, cpu: usize) -> Result<(), StoreError> {
        if !self.cpus.contains(&cpu) {
            self.cpus.push(cpu);
        }
        Ok(())
    }

    fn clear_cpu(&mut self, cpu: usize) -> Result<(), StoreError> {
        self.cpus.retain(|&c| c != cpu);
        Ok(())
    }
}

#[test]
fn seeding_reproduces_every_subset() {
    for nr_cpus in 0..=6usize {
        for bits in 0..(1u32 << nr_cpus) {
            let cpus: Vec<usize> = (0..nr_cpus).filter(|c| bits & (1 << c) != 0).collect();
            let store = RawStore {
                nr_cpus,
                cpus: cpus.clone(),
            };
            let dialog = CpuFilterDialog::open(&store).unwrap();

            let sel = dialog.selection();
            assert!(!sel.all_cpus(), "N={nr_cpus} S={cpus:?}");
            assert_eq!(sel.nr_cpus(), nr_cpus);
            assert_eq!(sel.mask().iter().collect::<Vec<_>>(), cpus);
        }
    }
}

#[test]
fn seeding_full_subset_keeps_all_cpus_off() {
    let store = RawStore {
        nr_cpus: 4,
        cpus: vec![0, 1, 2, 3],
    };
    let dialog = CpuFilterDialog::open(&store).unwrap();

    assert!(!dialog.selection().all_cpus());
    assert!(dialog.selection().mask().is_full());
    assert_eq!(dialog.selection().mask().to_cpulist(), "0-3");
}

#[test]
fn open_reports_allocation_failure() {
    let store = RawStore {
        nr_cpus: usize::MAX,
        cpus: vec![],
    };

    assert!(matches!(
        CpuFilterDialog::open(&store),
        Err(FilterError::Allocation {
            nr_cpus: usize::MAX,
            ..
        })
    ));
}

#[test]
fn all_cpus_on_then_accept_sets_store_all() {
    let mut view = TraceView::new(store_with(8, &[3]));
    let mut dialog = CpuFilterDialog::open(view.model().unwrap()).unwrap();
    dialog.on_cpu_toggled(3, false).unwrap();
    dialog.on_all_cpus_toggled(true);

    assert_eq!(dialog.accept(&mut view).unwrap(), Reconciled::AllCpus);
    let store = view.model().unwrap();
    assert!(store.all_cpus());
    assert_eq!(enabled(store), (0..8).collect::<Vec<_>>());
}

#[test]
fn all_cpus_on_then_off_applies_mask_only() {
    let mut view = TraceView::new(store_with(6, &[0, 5]));
    let events = [
        CpuFilterEvent::AllCpusToggled(true),
        CpuFilterEvent::CpuToggled { cpu: 0, active: false },
        CpuFilterEvent::CpuToggled { cpu: 2, active: true },
        CpuFilterEvent::AllCpusToggled(false),
        CpuFilterEvent::Accept,
    ];
    let dialog = CpuFilterDialog::open(view.model().unwrap()).unwrap();
    let response = dialog.run(events, &mut view).unwrap();

    assert_eq!(
        response,
        DialogResponse::Accepted(Reconciled::PerCpu {
            enabled: 2,
            disabled: 4
        })
    );
    let store = view.model().unwrap();
    assert!(!store.all_cpus());
    assert_eq!(enabled(store), vec![2, 5]);
}

#[test]
fn reject_leaves_store_untouched() {
    let mut view = TraceView::new(store_with(4, &[1]));
    let dialog = CpuFilterDialog::open(view.model().unwrap()).unwrap();
    let events = [
        CpuFilterEvent::AllCpusToggled(true),
        CpuFilterEvent::CpuToggled { cpu: 1, active: false },
        CpuFilterEvent::CpuToggled { cpu: 3, active: true },
        CpuFilterEvent::Reject,
    ];

    assert_eq!(
        dialog.run(events, &mut view).unwrap(),
        DialogResponse::Rejected
    );
    let store = view.model().unwrap();
    assert!(!store.all_cpus());
    assert_eq!(enabled(store), vec![1]);
    assert_eq!(view.reattach_count(), 0);
}

#[test]
fn reapplying_a_selection_is_idempotent() {
    let sel = CpuSelection::from_parts(false, Cpumask::from_cpulist(5, "1,3-4").unwrap());

    let mut once = store_with(5, &[0, 1]);
    reconcile::apply(&mut once, &sel).unwrap();

    let mut twice = store_with(5, &[0, 1]);
    reconcile::apply(&mut twice, &sel).unwrap();
    reconcile::apply(&mut twice, &sel).unwrap();

    assert_eq!(enabled(&once), enabled(&twice));
    assert_eq!(once.all_cpus(), twice.all_cpus());
    assert_eq!(enabled(&once), vec![1, 3, 4]);
}

#[test]
fn four_cpu_scenario() {
    let mut view = TraceView::new(store_with(4, &[0, 2]));
    let mut dialog = CpuFilterDialog::open(view.model().unwrap()).unwrap();
    assert_eq!(dialog.selection().mask().to_cpulist(), "0,2");

    dialog.on_cpu_toggled(1, true).unwrap();
    assert_eq!(dialog.selection().mask().to_cpulist(), "0-2");
    dialog.on_cpu_toggled(0, false).unwrap();
    assert_eq!(dialog.selection().mask().to_cpulist(), "1-2");

    dialog.accept(&mut view).unwrap();
    let store = view.model().unwrap();
    assert_eq!(enabled(store), vec![1, 2]);
    assert!(!store.cpu_isset(0));
    assert!(!store.cpu_isset(3));
    assert!(!store.all_cpus());
    assert_eq!(view.reattach_count(), 1);
}

#[test]
fn word_boundary_at_64_cpus() {
    let mut view = TraceView::new(store_with(65, &[]));
    let mut dialog = CpuFilterDialog::open(view.model().unwrap()).unwrap();
    dialog.on_cpu_toggled(63, true).unwrap();
    assert_eq!(dialog.selection().mask().as_raw_slice(), &[1u64 << 63, 0]);
    dialog.on_cpu_toggled(64, true).unwrap();
    assert_eq!(dialog.selection().mask().as_raw_slice(), &[1u64 << 63, 1]);

    dialog.accept(&mut view).unwrap();
    assert_eq!(enabled(view.model().unwrap()), vec![63, 64]);
}

#[test]
fn visible_rows_follow_committed_selection() {
    let records = (0..8u64)
        .map(|ts| TraceRecord {
            ts,
            cpu: (ts % 4) as usize,
            event: "sched_switch".to_string(),
        })
        .collect();
    let mut view = TraceView::new(TraceViewStore::new(4).with_records(records));

    let dialog = CpuFilterDialog::open(view.model().unwrap()).unwrap();
    let events = [
        CpuFilterEvent::AllCpusToggled(false),
        CpuFilterEvent::CpuToggled { cpu: 0, active: false },
        CpuFilterEvent::CpuToggled { cpu: 2, active: false },
        CpuFilterEvent::Accept,
    ];
    dialog.run(events, &mut view).unwrap();

    let ts: Vec<u64> = view.model().unwrap().visible_rows().map(|r| r.ts).collect();
    assert_eq!(ts, vec![1, 3, 5, 7]);
}

#[test]
fn stale_cpu_count_aborts_commit() {
    let sel = CpuSelection::seed(&store_with(4, &[0])).unwrap();
    let mut view = TraceView::new(store_with(2, &[0]));

    let err = reconcile::commit(&mut view, &sel).unwrap_err();
    assert!(err.is_reconciliation());
    assert!(view.is_attached());
    assert_eq!(enabled(view.model().unwrap()), vec![0]);
}
