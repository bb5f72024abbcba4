use std::sync::{
  LazyLock,
  OnceLock
};

use anyhow::anyhow;
use chrono::{
  DateTime,
  Duration,
  LocalResult,
  NaiveDate,
  NaiveDateTime,
  TimeZone,
  Utc
};
use chrono_tz::Tz;
use regex::Regex;

use crate::format::{
  from_persian_digits,
  parse_local
};
use crate::jalaali::JalaaliDate;

const TIMEZONE_ENV_VAR: &str =
  "KARHA_TIMEZONE";
const DEFAULT_PROJECT_TIMEZONE: &str =
  "Asia/Tehran";

/// Years below this are read as Jalaali in `YYYY-MM-DD` expressions.
const JALAALI_YEAR_CEILING: i32 = 1700;

static NUMERIC_DATE: LazyLock<
  Option<Regex>
> = LazyLock::new(|| {
  Regex::new(
    r"^(\d{3,4})[-/](\d{1,2})[-/](\d{1,2})$"
  )
  .ok()
});

/// A date typed by the user: either a Jalaali day, which goes through the
/// date picker, or a local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateExpr {
  Jalaali(JalaaliDate),
  Local(NaiveDateTime)
}

pub fn project_timezone() -> Tz {
  static PROJECT_TZ: OnceLock<Tz> =
    OnceLock::new();
  *PROJECT_TZ.get_or_init(
    resolve_project_timezone
  )
}

/// Timezone named by the rc file when present, else the project default.
pub fn timezone_or_default(
  configured: Option<&str>
) -> Tz {
  configured
    .and_then(|raw| {
      parse_timezone(raw, "rc:timezone")
    })
    .unwrap_or_else(project_timezone)
}

#[must_use]
pub fn local_today(
  now: DateTime<Utc>,
  tz: Tz
) -> NaiveDate {
  now.with_timezone(&tz).date_naive()
}

fn resolve_project_timezone() -> Tz {
  std::env::var(TIMEZONE_ENV_VAR)
    .ok()
    .and_then(|raw| {
      parse_timezone(&raw, TIMEZONE_ENV_VAR)
    })
    .or_else(|| {
      parse_timezone(
        DEFAULT_PROJECT_TIMEZONE,
        "default"
      )
    })
    .unwrap_or(chrono_tz::UTC)
}

/// IANA id to `Tz`; a blank or unknown id is logged against `source`.
fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let id = raw.trim();
  let parsed = (!id.is_empty())
    .then(|| id.parse::<Tz>().ok())
    .flatten();
  match parsed {
    | Some(tz) => {
      tracing::debug!(source, timezone = %tz, "timezone selected");
    }
    | None => {
      tracing::warn!(source, timezone = %id, "ignoring unknown timezone");
    }
  }
  parsed
}

/// Resolves a wall-clock time in `tz`. Ambiguous times take the earliest
/// instant; times inside a DST gap move forward by the gap.
pub fn local_to_utc(
  local: NaiveDateTime,
  tz: Tz
) -> DateTime<Utc> {
  match tz.from_local_datetime(&local) {
    | LocalResult::Single(dt) => {
      dt.with_timezone(&Utc)
    }
    | LocalResult::Ambiguous(
      first,
      second
    ) => {
      let chosen = if first <= second {
        first
      } else {
        second
      };
      chosen.with_timezone(&Utc)
    }
    | LocalResult::None => {
      let shifted =
        local + Duration::hours(1);
      tz.from_local_datetime(&shifted)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| {
          local.and_utc()
        })
    }
  }
}

#[tracing::instrument(skip(now, tz))]
pub fn parse_date_expr(
  input: &str,
  now: DateTime<Utc>,
  tz: Tz
) -> anyhow::Result<DateExpr> {
  let token =
    from_persian_digits(input.trim());
  let lower =
    token.to_lowercase();
  let today = local_today(now, tz);

  match lower.as_str() {
    | "today" | "امروز" => {
      return Ok(DateExpr::Local(
        today.and_time(
          chrono::NaiveTime::MIN
        )
      ));
    }
    | "tomorrow" | "فردا" => {
      let tomorrow = today
        .succ_opt()
        .ok_or_else(|| {
          anyhow!(
            "no day after {today}"
          )
        })?;
      return Ok(DateExpr::Local(
        tomorrow.and_time(
          chrono::NaiveTime::MIN
        )
      ));
    }
    | _ => {}
  }

  if let Some(re) = NUMERIC_DATE.as_ref()
    && let Some(caps) =
      re.captures(&token)
  {
    let year: i32 = caps[1].parse()?;
    let month: u32 = caps[2].parse()?;
    let day: u32 = caps[3].parse()?;

    if year < JALAALI_YEAR_CEILING {
      let jalaali =
        JalaaliDate::new(year, month, day)
          .ok_or_else(|| {
            anyhow!(
              "not a Jalaali date: \
               {token}"
            )
          })?;
      return Ok(DateExpr::Jalaali(
        jalaali
      ));
    }

    let date = NaiveDate::from_ymd_opt(
      year, month, day
    )
    .ok_or_else(|| {
      anyhow!(
        "not a Gregorian date: {token}"
      )
    })?;
    return Ok(DateExpr::Local(
      date.and_time(
        chrono::NaiveTime::MIN
      )
    ));
  }

  parse_local(&token)
    .map(DateExpr::Local)
    .ok_or_else(|| {
      anyhow!(
        "unrecognized date \
         expression: {input}"
      )
    })
}
