pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod due;
pub mod format;
pub mod jalaali;
pub mod manager;
pub mod persist;
pub mod picker;
pub mod render;
pub mod store;
pub mod task;

use std::ffi::OsString;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting karha"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.karharc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let storage =
    persist::FileStore::open(&data_dir)
      .with_context(|| {
        format!(
          "failed to open storage at {}",
          data_dir.display()
        )
      })?;

  let tz = datetime::timezone_or_default(
    cfg.timezone()
  );
  let now = Utc::now();
  debug!(%tz, %now, "resolved clock");

  let mut manager =
    manager::TaskManager::load(
      storage,
      cli::TerminalPrompter::new(cli.yes),
      tz,
      datetime::local_today(now, tz)
    );

  let renderer =
    render::Renderer::new(&cfg)?;
  let inv = cli::Invocation::parse(
    &cfg, cli.rest
  )?;

  commands::dispatch(
    &mut manager,
    &cfg,
    &renderer,
    inv,
    now
  )?;

  info!("done");
  Ok(())
}
