//! The `karharc` settings file.
//!
//! One `key = value` pair per line, `#` starts a comment. Only the keys in
//! [`KNOWN_KEYS`] mean anything; others are reported and skipped.

use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use tracing::{
  debug,
  info,
  warn
};

use crate::task::FilterKind;

const RC_ENV_VAR: &str = "KARHARC";
const RC_FILE: &str = ".karharc";

pub const KNOWN_KEYS: [&str; 5] = [
  "data.location",
  "default.command",
  "default.filter",
  "color",
  "timezone"
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
  data_location:   String,
  default_command: String,
  default_filter:  String,
  color:           String,
  timezone:        Option<String>,
  pub loaded_from: Option<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    Self {
      data_location:   "~/.karha"
        .to_string(),
      default_command: "list".to_string(),
      default_filter:  "all".to_string(),
      color:           "on".to_string(),
      timezone:        None,
      loaded_from:     None
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    karharc_override
  ))]
  pub fn load(
    karharc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    match locate_karharc(karharc_override)
    {
      | Some(path) => {
        info!(karharc = %path.display(), "loading karharc");
        let text =
          fs::read_to_string(&path)
            .with_context(|| {
              format!(
                "failed to read {}",
                path.display()
              )
            })?;
        cfg.read_lines(&path, &text)?;
        cfg.loaded_from = Some(path);
      }
      | None => {
        debug!("no karharc; defaults only");
      }
    }

    Ok(cfg)
  }

  /// `--rc key=value` and positional `rc.key=value` settings, applied after
  /// the file.
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (key, value) in overrides {
      let key = key
        .strip_prefix("rc.")
        .unwrap_or(&key);
      if !self.set(key, value.trim()) {
        warn!(key, "ignoring unknown rc override");
      }
    }
  }

  pub fn data_location(&self) -> &str {
    &self.data_location
  }

  pub fn default_command(&self) -> &str {
    &self.default_command
  }

  pub fn default_filter(
    &self
  ) -> anyhow::Result<FilterKind> {
    self
      .default_filter
      .parse()
      .context("invalid default.filter")
  }

  pub fn color(
    &self
  ) -> anyhow::Result<bool> {
    match self
      .color
      .to_ascii_lowercase()
      .as_str()
    {
      | "on" | "yes" | "true" | "1" => {
        Ok(true)
      }
      | "off" | "no" | "false" | "0" => {
        Ok(false)
      }
      | other => Err(anyhow!(
        "invalid color setting: {other}"
      ))
    }
  }

  pub fn timezone(&self) -> Option<&str> {
    self.timezone.as_deref()
  }

  fn set(
    &mut self,
    key: &str,
    value: &str
  ) -> bool {
    let value = value.to_string();
    match key {
      | "data.location" => {
        self.data_location = value;
      }
      | "default.command" => {
        self.default_command = value;
      }
      | "default.filter" => {
        self.default_filter = value;
      }
      | "color" => self.color = value,
      | "timezone" => {
        self.timezone = (!value.is_empty())
          .then_some(value);
      }
      | _ => return false
    }
    debug!(key, "setting applied");
    true
  }

  fn read_lines(
    &mut self,
    path: &Path,
    text: &str
  ) -> anyhow::Result<()> {
    for (idx, raw_line) in
      text.lines().enumerate()
    {
      let line = raw_line
        .split_once('#')
        .map_or(raw_line, |(before, _)| {
          before
        })
        .trim();
      if line.is_empty() {
        continue;
      }

      let (key, value) =
        line.split_once('=').ok_or_else(
          || {
            anyhow!(
              "{}:{}: expected key = value, \
               got: {}",
              path.display(),
              idx + 1,
              raw_line.trim()
            )
          }
        )?;
      let key = key.trim();
      if !self.set(key, value.trim()) {
        warn!(
          file = %path.display(),
          line = idx + 1,
          key,
          "unknown karharc key"
        );
      }
    }
    Ok(())
  }
}

/// `--data`, else `data.location`; the directory is created when missing.
#[tracing::instrument(skip(
  cfg,
  override_dir
))]
pub fn resolve_data_dir(
  cfg: &Config,
  override_dir: Option<&Path>
) -> anyhow::Result<PathBuf> {
  let dir = match override_dir {
    | Some(path) => path.to_path_buf(),
    | None => {
      expand_home(cfg.data_location())?
    }
  };

  if !dir.is_dir() {
    info!(dir = %dir.display(), "creating data directory");
    fs::create_dir_all(&dir)
      .with_context(|| {
        format!(
          "failed to create {}",
          dir.display()
        )
      })?;
  }

  Ok(dir)
}

/// `--karharc`, then `$KARHARC` (`/dev/null` turns the file off), then
/// `~/.karharc` if it exists.
fn locate_karharc(
  override_path: Option<&Path>
) -> Option<PathBuf> {
  if let Some(path) = override_path {
    return Some(path.to_path_buf());
  }

  if let Ok(from_env) =
    std::env::var(RC_ENV_VAR)
  {
    return (from_env != "/dev/null")
      .then(|| PathBuf::from(from_env));
  }

  dirs::home_dir()
    .map(|home| home.join(RC_FILE))
    .filter(|path| path.is_file())
}

fn expand_home(
  raw: &str
) -> anyhow::Result<PathBuf> {
  let Some(rest) = raw.strip_prefix("~/")
  else {
    return Ok(PathBuf::from(raw));
  };
  dirs::home_dir()
    .map(|home| home.join(rest))
    .ok_or_else(|| {
      anyhow!(
        "cannot expand {raw}: no home \
         directory"
      )
    })
}
