// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

mod session;

use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use log::info;
use trace_filter::config::init_config;
use trace_filter::config::Config;
use trace_filter::config::OutputFormat;
use trace_filter::CpuFilterDialog;
use trace_filter::DialogResponse;
use trace_filter::TraceStore;
use trace_filter::TraceView;
use trace_filter::TraceViewStore;

use crate::session::Session;

/// filterctl: replay a CPU filter dialog session.
///
/// The session file describes the trace store the dialog was opened on and
/// the toggles, accept and reject responses the user gave. filterctl opens
/// the dialog on an in-memory store, replays the events and prints the
/// resulting CPU filter.
#[derive(Debug, Parser)]
#[clap(version, about)]
struct Opts {
    /// Session file (TOML).
    session: PathBuf,

    /// Config file. Defaults to /etc/trace_filter/config.toml or
    /// /etc/trace_filter.toml when present.
    #[clap(short = 'c', long, env = "TRACE_FILTER_CONFIG")]
    config: Option<PathBuf>,

    /// How to print the enabled CPUs: cpulist or hex.
    #[clap(short = 'f', long)]
    format: Option<OutputFormat>,

    /// Don't print the visible trace rows.
    #[clap(long, action = clap::ArgAction::SetTrue)]
    no_rows: bool,

    /// Enable verbose output.
    #[clap(short = 'v', long, action = clap::ArgAction::SetTrue)]
    verbose: bool,
}

impl Opts {
    fn config_overrides(&self) -> Config {
        let mut config = Config::default();
        if self.verbose {
            config.set_debug(true);
        }
        if let Some(format) = self.format {
            config.set_format(format);
        }
        if self.no_rows {
            config.set_show_rows(false);
        }
        config
    }
}

fn print_store(store: &TraceViewStore, config: &Config) {
    let mask = store.cpu_mask();
    let cpus = match config.format() {
        OutputFormat::Cpulist => mask.to_cpulist(),
        OutputFormat::Hex => format!("0x{mask}"),
    };
    println!("all_cpus: {}", store.all_cpus());
    println!("cpus: {cpus}");
    println!(
        "visible rows: {}/{}",
        store.visible_rows().count(),
        store.records().len()
    );

    if config.show_rows() {
        for row in store.visible_rows() {
            println!("{:>16} [{:03}] {}", row.ts, row.cpu, row.event);
        }
    }
}

fn main() -> Result<()> {
    let opts = Opts::parse();

    let file_config = match &opts.config {
        Some(path) => Config::load(path)?,
        None => init_config()?,
    };
    let config = file_config.merge(&opts.config_overrides());

    let loglevel = match config.debug() {
        true => simplelog::LevelFilter::Debug,
        false => simplelog::LevelFilter::Info,
    };
    let mut lcfg = simplelog::ConfigBuilder::new();
    lcfg.set_time_level(simplelog::LevelFilter::Error)
        .set_location_level(simplelog::LevelFilter::Off)
        .set_target_level(simplelog::LevelFilter::Off)
        .set_thread_level(simplelog::LevelFilter::Off);
    simplelog::TermLogger::init(
        loglevel,
        lcfg.build(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;

    let session = Session::load(&opts.session)?;
    let mut view = TraceView::new(session.store()?);

    let model = view
        .model()
        .context("trace store is not attached to the view")?;
    info!(
        "{}: {} CPUs, all_cpus={}",
        CpuFilterDialog::TITLE,
        model.nr_cpus(),
        model.all_cpus()
    );
    let dialog = CpuFilterDialog::open(model)?;

    match dialog.run(session.events(), &mut view)? {
        DialogResponse::Accepted(res) => info!("accepted: {:?}", res),
        DialogResponse::Rejected => info!("rejected, trace store unchanged"),
    }

    let store = view
        .model()
        .context("trace store was not reattached to the view")?;
    print_store(store, &config);
    Ok(())
}
