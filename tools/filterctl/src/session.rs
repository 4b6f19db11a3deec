// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

use std::fs;
use std::path::Path;

use anyhow::Context;
use anyhow::Result;
use serde::Deserialize;
use trace_filter::CpuFilterEvent;
use trace_filter::Cpumask;
use trace_filter::TraceRecord;
use trace_filter::TraceViewStore;

/// A recorded CPU filter dialog: the store it was opened on and what the
/// user did.
#[derive(Debug, Deserialize)]
pub struct Session {
    pub nr_cpus: usize,
    #[serde(default)]
    pub all_cpus: bool,
    /// Enabled CPUs as a cpulist ("0-2,5") or a hex mask ("0x27").
    pub cpus: Option<String>,
    #[serde(default)]
    pub records: Vec<TraceRecord>,
    #[serde(default)]
    pub events: Vec<SessionEvent>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionEvent {
    AllCpus { active: bool },
    Cpu { cpu: usize, active: bool },
    Accept,
    Reject,
}

impl From<SessionEvent> for CpuFilterEvent {
    fn from(ev: SessionEvent) -> Self {
        match ev {
            SessionEvent::AllCpus { active } => CpuFilterEvent::AllCpusToggled(active),
            SessionEvent::Cpu { cpu, active } => CpuFilterEvent::CpuToggled { cpu, active },
            SessionEvent::Accept => CpuFilterEvent::Accept,
            SessionEvent::Reject => CpuFilterEvent::Reject,
        }
    }
}

fn parse_cpus(nr_cpus: usize, cpus: &str) -> Result<Cpumask> {
    let cpus = cpus.trim();
    let is_hex = cpus.get(..2).is_some_and(|p| p.eq_ignore_ascii_case("0x"));
    let mask = if is_hex || cpus == "all" || cpus == "none" {
        Cpumask::from_str(nr_cpus, cpus)?
    } else {
        Cpumask::from_cpulist(nr_cpus, cpus)?
    };
    Ok(mask)
}

impl Session {
    pub fn load(path: &Path) -> Result<Session> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read session {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("Bad session {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Session> {
        Ok(toml::from_str(contents)?)
    }

    /// Build the trace store the dialog is opened on. Without `cpus` every
    /// CPU starts enabled.
    pub fn store(&self) -> Result<TraceViewStore> {
        let store = match &self.cpus {
            Some(cpus) => {
                TraceViewStore::from_mask(parse_cpus(self.nr_cpus, cpus)?, self.all_cpus)
            }
            None => TraceViewStore::new(self.nr_cpus),
        };
        Ok(store.with_records(self.records.clone()))
    }

    pub fn events(&self) -> impl Iterator<Item = CpuFilterEvent> + '_ {
        self.events.iter().map(|ev| CpuFilterEvent::from(*ev))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trace_filter::TraceStore;

    const SESSION: &str = r#"
nr_cpus = 4
cpus = "0,2"

[[records]]
ts = 10
cpu = 2
event = "sched_switch"

[[events]]
kind = "cpu"
cpu = 1
active = true

[[events]]
kind = "all_cpus"
active = false

[[events]]
kind = "accept"
"#;

    #[test]
    fn test_parse_session() {
        let session = Session::parse(SESSION).unwrap();
        assert_eq!(session.nr_cpus, 4);
        assert!(!session.all_cpus);
        assert_eq!(session.records.len(), 1);
        assert_eq!(
            session.events().collect::<Vec<_>>(),
            vec![
                CpuFilterEvent::CpuToggled {
                    cpu: 1,
                    active: true
                },
                CpuFilterEvent::AllCpusToggled(false),
                CpuFilterEvent::Accept,
            ]
        );

        let store = session.store().unwrap();
        assert!(!store.all_cpus());
        assert_eq!(store.cpu_mask().to_cpulist(), "0,2");
    }

    #[test]
    fn test_hex_and_default_cpus() {
        let session = Session::parse("nr_cpus = 8\ncpus = \"0x81\"\n").unwrap();
        assert_eq!(session.store().unwrap().cpu_mask().to_cpulist(), "0,7");

        let session = Session::parse("nr_cpus = 8\ncpus = \"0X81\"\n").unwrap();
        assert_eq!(session.store().unwrap().cpu_mask().to_cpulist(), "0,7");

        let session = Session::parse("nr_cpus = 2\n").unwrap();
        assert!(session.store().unwrap().all_cpus());
    }

    #[test]
    fn test_bad_sessions() {
        assert!(Session::parse("cpus = \"0\"\n").is_err());
        assert!(Session::parse("nr_cpus = 2\n[[events]]\nkind = \"maybe\"\n").is_err());

        let session = Session::parse("nr_cpus = 2\ncpus = \"0-3\"\n").unwrap();
        assert!(session.store().is_err());

        let huge = "nr_cpus = 2\ncpus = \"0-18446744073709551615\"\n";
        let session = Session::parse(huge).unwrap();
        assert!(session.store().is_err());
    }
}
