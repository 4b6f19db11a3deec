// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! # Cpumask
//!
//! A fixed-size set of CPUs backed by a `BitVec` of u64 words. CPU `i` lives
//! in word `i / 64` at bit `i % 64`. The size is taken from the trace store
//! when the mask is created and never changes afterwards.
//!
//!```
//!     use trace_filter::Cpumask;
//!     let mut mask = Cpumask::new(4);
//!     assert!(!mask.test_cpu(0));
//!     mask.set_cpu(0).unwrap();
//!     mask.set_cpu(2).unwrap();
//!     assert_eq!(mask.to_cpulist(), "0,2");
//!     assert_eq!(format!("{mask}"), "5");
//!
//!     mask.set_all();
//!     assert!(mask.is_full());
//!```
//!
//! Masks can also be parsed from a hexadecimal string (with the special
//! values "none" and "all") or from a cpulist such as "0-3,8".

use std::fmt;
use std::ops::RangeInclusive;

use bitvec::prelude::*;
use sscanf::sscanf;

use crate::FilterError;

pub const CPUMASK_WORD_BITS: usize = u64::BITS as usize;

#[derive(Debug, Eq, Clone, Hash, PartialEq)]
pub struct Cpumask {
    mask: BitVec<u64, Lsb0>,
}

impl Cpumask {
    fn check_cpu(&self, cpu: usize) -> Result<(), FilterError> {
        if cpu >= self.len() {
            return Err(FilterError::InvalidCpu {
                cpu,
                nr_cpus: self.len(),
            });
        }

        Ok(())
    }

    /// Build an empty Cpumask covering `nr_cpus` CPUs, reporting an error
    /// instead of aborting when the backing words cannot be allocated.
    pub fn try_new(nr_cpus: usize) -> Result<Cpumask, FilterError> {
        let nr_words = nr_cpus.div_ceil(CPUMASK_WORD_BITS);
        let mut words: Vec<u64> = Vec::new();
        words
            .try_reserve_exact(nr_words)
            .map_err(|source| FilterError::Allocation { nr_cpus, source })?;
        words.resize(nr_words, 0);

        let mut mask: BitVec<u64, Lsb0> = BitVec::from_vec(words);
        mask.truncate(nr_cpus);
        Ok(Self { mask })
    }

    /// Build an empty Cpumask covering `nr_cpus` CPUs.
    pub fn new(nr_cpus: usize) -> Cpumask {
        Cpumask {
            mask: bitvec![u64, Lsb0; 0; nr_cpus],
        }
    }

    /// Build a Cpumask from a hexadecimal string, or one of "none" and "all".
    pub fn from_str(nr_cpus: usize, cpumask: &str) -> Result<Cpumask, FilterError> {
        match cpumask {
            "none" => return Ok(Self::new(nr_cpus)),
            "all" => {
                let mut mask = Self::new(nr_cpus);
                mask.set_all();
                return Ok(mask);
            }
            _ => {}
        }

        let mut hex_str = cpumask
            .strip_prefix("0x")
            .or_else(|| cpumask.strip_prefix("0X"))
            .unwrap_or(cpumask)
            .replace(['_', ','], "");
        if hex_str.len() % 2 != 0 {
            hex_str.insert(0, '0');
        }
        let bytes = hex::decode(&hex_str).map_err(|e| FilterError::Parse {
            input: cpumask.to_string(),
            reason: e.to_string(),
        })?;

        let mut mask = Self::new(nr_cpus);
        for (index, &val) in bytes.iter().rev().enumerate() {
            let mut v = val;
            while v != 0 {
                let lsb = v.trailing_zeros() as usize;
                v &= !(1 << lsb);
                let cpu = index * 8 + lsb;
                if cpu >= nr_cpus {
                    return Err(FilterError::Parse {
                        input: cpumask.to_string(),
                        reason: format!("CPU {cpu} exceeds the {nr_cpus} CPUs of the trace"),
                    });
                }
                mask.mask.set(cpu, true);
            }
        }

        Ok(mask)
    }

    /// Build a Cpumask from a cpulist such as "0-3,8".
    pub fn from_cpulist(nr_cpus: usize, cpulist: &str) -> Result<Cpumask, FilterError> {
        let ranges = read_cpulist(cpulist)?;
        if let Some(range) = ranges.iter().find(|r| *r.end() >= nr_cpus) {
            return Err(FilterError::Parse {
                input: cpulist.to_string(),
                reason: format!(
                    "CPU {} exceeds the {nr_cpus} CPUs of the trace",
                    range.end()
                ),
            });
        }

        let mut mask = Self::new(nr_cpus);
        for range in ranges {
            mask.mask[range].fill(true);
        }
        Ok(mask)
    }

    /// Return the u64 words backing the Cpumask. Bits past `len()` in the
    /// last word carry no meaning.
    pub fn as_raw_slice(&self) -> &[u64] {
        self.mask.as_raw_slice()
    }

    pub fn set_all(&mut self) {
        self.mask.fill(true);
    }

    pub fn clear_all(&mut self) {
        self.mask.fill(false);
    }

    /// Set a CPU. Returns an error and leaves the mask untouched if the CPU
    /// is outside the mask.
    pub fn set_cpu(&mut self, cpu: usize) -> Result<(), FilterError> {
        self.check_cpu(cpu)?;
        self.mask.set(cpu, true);
        Ok(())
    }

    /// Clear a CPU. Returns an error and leaves the mask untouched if the CPU
    /// is outside the mask.
    pub fn clear_cpu(&mut self, cpu: usize) -> Result<(), FilterError> {
        self.check_cpu(cpu)?;
        self.mask.set(cpu, false);
        Ok(())
    }

    /// Test whether a CPU is set. CPUs outside the mask read as clear.
    pub fn test_cpu(&self, cpu: usize) -> bool {
        self.mask.get(cpu).map(|bit| *bit).unwrap_or(false)
    }

    /// Count the number of CPUs set.
    pub fn weight(&self) -> usize {
        self.mask.count_ones()
    }

    pub fn is_empty(&self) -> bool {
        self.mask.not_any()
    }

    pub fn is_full(&self) -> bool {
        self.mask.all()
    }

    /// Number of CPUs the mask covers.
    pub fn len(&self) -> usize {
        self.mask.len()
    }

    /// Iterate over the set CPUs in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.mask.iter_ones()
    }

    /// Render the set CPUs as a compact cpulist, e.g. "0-2,5".
    pub fn to_cpulist(&self) -> String {
        let mut groups = vec![];
        let mut run: Option<(usize, usize)> = None;
        for cpu in self.iter() {
            run = match run {
                Some((first, last)) if last + 1 == cpu => Some((first, cpu)),
                Some(prev) => {
                    groups.push(prev);
                    Some((cpu, cpu))
                }
                None => Some((cpu, cpu)),
            };
        }
        groups.extend(run);

        groups
            .iter()
            .map(|&(first, last)| match first == last {
                true => format!("{first}"),
                false => format!("{first}-{last}"),
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    fn fmt_with(&self, f: &mut fmt::Formatter<'_>, upper: bool) -> fmt::Result {
        let mut words: Vec<u32> = self
            .as_raw_slice()
            .iter()
            .flat_map(|x| [*x as u32, (x >> 32) as u32])
            .collect();
        words.truncate(self.len().div_ceil(32));

        let Some(top) = words.pop() else {
            return write!(f, "0");
        };

        // Only print as many digits of the top word as the CPU count needs.
        let width = match self.len().div_ceil(4) % 8 {
            0 => 8,
            v => v,
        };
        match upper {
            true => write!(f, "{top:0width$X}")?,
            false => write!(f, "{top:0width$x}")?,
        }

        for word in words.iter().rev() {
            match upper {
                true => write!(f, ",{word:08X}")?,
                false => write!(f, ",{word:08x}")?,
            }
        }
        Ok(())
    }
}

/// Split a cpulist such as "0-3,8" into inclusive CPU ranges, without
/// expanding them. An empty string is an empty list.
pub fn read_cpulist(cpulist: &str) -> Result<Vec<RangeInclusive<usize>>, FilterError> {
    let cpulist = cpulist.trim_end_matches('\0').trim();
    let mut ranges = vec![];
    if cpulist.is_empty() {
        return Ok(ranges);
    }

    for group in cpulist.split(',').map(str::trim) {
        let (min, max) = match sscanf!(group, "{usize}-{usize}") {
            Ok((x, y)) => (x, y),
            Err(_) => match sscanf!(group, "{usize}") {
                Ok(x) => (x, x),
                Err(_) => {
                    return Err(FilterError::Parse {
                        input: cpulist.to_string(),
                        reason: format!("bad cpulist group {group:?}"),
                    });
                }
            },
        };
        if min > max {
            return Err(FilterError::Parse {
                input: cpulist.to_string(),
                reason: format!("reversed range {group:?}"),
            });
        }
        ranges.push(min..=max);
    }

    Ok(ranges)
}

impl fmt::Display for Cpumask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_with(f, false)
    }
}

impl fmt::LowerHex for Cpumask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_with(f, false)
    }
}

impl fmt::UpperHex for Cpumask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_with(f, true)
    }
}
