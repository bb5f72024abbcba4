use chrono::{
  DateTime,
  NaiveDateTime,
  Utc
};
use chrono_tz::Tz;

use crate::datetime::local_to_utc;
use crate::format::to_persian_digits;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum Severity {
  Muted,
  Error,
  Warning,
  Success
}

impl Severity {
  pub fn css_var(self) -> &'static str {
    match self {
      | Self::Muted => "var(--text-muted)",
      | Self::Error => "var(--error-color)",
      | Self::Warning => {
        "var(--warning-color)"
      }
      | Self::Success => {
        "var(--success-color)"
      }
    }
  }

  pub fn ansi(self) -> &'static str {
    match self {
      | Self::Muted => "90",
      | Self::Error => "31",
      | Self::Warning => "33",
      | Self::Success => "32"
    }
  }
}

/// Whole days until `due`, rounded up. `due` is local to `tz`.
pub fn days_remaining(
  due: Option<NaiveDateTime>,
  now: DateTime<Utc>,
  tz: Tz
) -> Option<i64> {
  let due = local_to_utc(due?, tz);
  let diff_ms =
    (due - now).num_milliseconds();
  let days = diff_ms / DAY_MS;
  if diff_ms % DAY_MS > 0 {
    Some(days + 1)
  } else {
    Some(days)
  }
}

pub fn remaining_text(
  days: Option<i64>
) -> String {
  match days {
    | None => String::new(),
    | Some(d) if d < 0 => {
      format!(
        "{} روز گذشته",
        to_persian_digits(d.unsigned_abs())
      )
    }
    | Some(0) => "امروز".to_string(),
    | Some(1) => "فردا".to_string(),
    | Some(d) => {
      format!(
        "{} روز باقی مانده",
        to_persian_digits(d)
      )
    }
  }
}

pub fn remaining_severity(
  days: Option<i64>
) -> Severity {
  match days {
    | None => Severity::Muted,
    | Some(d) if d < 0 => Severity::Error,
    | Some(0..=3) => Severity::Warning,
    | Some(_) => Severity::Success
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    Duration,
    TimeZone,
    Utc
  };

  use super::{
    Severity,
    days_remaining,
    remaining_severity,
    remaining_text
  };

  fn now() -> chrono::DateTime<Utc> {
    Utc
      .with_ymd_and_hms(
        2024, 5, 1, 9, 30, 0
      )
      .single()
      .expect("valid now")
  }

  fn due_in(
    offset: Duration
  ) -> Option<i64> {
    let due = (now() + offset).naive_utc();
    days_remaining(
      Some(due),
      now(),
      chrono_tz::UTC
    )
  }

  #[test]
  fn rounds_up_partial_days() {
    assert_eq!(
      due_in(Duration::zero()),
      Some(0)
    );
    assert_eq!(
      due_in(Duration::hours(1)),
      Some(1)
    );
    assert_eq!(
      due_in(Duration::days(1)),
      Some(1)
    );
    assert_eq!(
      due_in(Duration::hours(-1)),
      Some(0)
    );
    assert_eq!(
      due_in(Duration::days(-5)),
      Some(-5)
    );
    assert_eq!(
      days_remaining(
        None,
        now(),
        chrono_tz::UTC
      ),
      None
    );
  }

  #[test]
  fn text_policy() {
    assert_eq!(
      remaining_text(due_in(
        Duration::zero()
      )),
      "امروز"
    );
    assert_eq!(
      remaining_text(due_in(
        Duration::days(1)
      )),
      "فردا"
    );
    assert_eq!(
      remaining_text(due_in(
        Duration::days(-5)
      )),
      "۵ روز گذشته"
    );
    assert_eq!(
      remaining_text(Some(12)),
      "۱۲ روز باقی مانده"
    );
    assert_eq!(remaining_text(None), "");
  }

  #[test]
  fn severity_policy() {
    assert_eq!(
      remaining_severity(None),
      Severity::Muted
    );
    assert_eq!(
      remaining_severity(Some(-1)),
      Severity::Error
    );
    assert_eq!(
      remaining_severity(Some(0)),
      Severity::Warning
    );
    assert_eq!(
      remaining_severity(Some(3)),
      Severity::Warning
    );
    assert_eq!(
      remaining_severity(Some(4)),
      Severity::Success
    );
  }
}
