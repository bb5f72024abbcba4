//! Persian display strings for dates and counts.

use std::fmt::Display;

use chrono::{
  DateTime,
  NaiveDate,
  NaiveDateTime,
  SecondsFormat,
  Timelike,
  Utc
};
use chrono_tz::Tz;
use serde::{
  Deserialize,
  Deserializer,
  Serialize,
  Serializer
};

use crate::datetime::local_to_utc;
use crate::jalaali::{
  JalaaliDate,
  MONTH_NAMES
};

const PERSIAN_DIGITS: [char; 10] = [
  '۰', '۱', '۲', '۳', '۴', '۵', '۶', '۷',
  '۸', '۹'
];

const ARABIC_INDIC_DIGITS: [char; 10] = [
  '٠', '١', '٢', '٣', '٤', '٥', '٦', '٧',
  '٨', '٩'
];

const LOCAL_FORMATS: [&str; 4] = [
  "%Y-%m-%dT%H:%M",
  "%Y-%m-%dT%H:%M:%S",
  "%Y-%m-%d %H:%M",
  "%Y-%m-%d %H:%M:%S"
];

/// Wire format of due dates, the picker's ISO string truncated to minutes.
pub const DUE_FORMAT: &str =
  "%Y-%m-%dT%H:%M";

pub fn to_persian_digits(
  value: impl Display
) -> String {
  value
    .to_string()
    .chars()
    .map(|c| {
      if c.is_ascii_digit() {
        PERSIAN_DIGITS
          [usize::from(c as u8 - b'0')]
      } else {
        c
      }
    })
    .collect()
}

pub fn from_persian_digits(
  value: &str
) -> String {
  value
    .chars()
    .map(|c| {
      let idx = PERSIAN_DIGITS
        .iter()
        .position(|&p| p == c)
        .or_else(|| {
          ARABIC_INDIC_DIGITS
            .iter()
            .position(|&p| p == c)
        });
      match idx {
        | Some(d) => {
          char::from(b'0' + d as u8)
        }
        | None => c
      }
    })
    .collect()
}

/// `"<day> <month> <year> - <HH>:<MM>"` in Persian digits.
pub fn format_local(
  local: NaiveDateTime
) -> String {
  let ascii = match JalaaliDate::from_gregorian(
    local.date()
  ) {
    | Some(j) => {
      format!(
        "{} {} {} - {:02}:{:02}",
        j.day,
        j.month_name(),
        j.year,
        local.hour(),
        local.minute()
      )
    }
    | None => {
      local
        .format("%Y-%m-%d - %H:%M")
        .to_string()
    }
  };
  to_persian_digits(ascii)
}

pub fn format_instant(
  at: DateTime<Utc>,
  tz: Tz
) -> String {
  format_local(
    at.with_timezone(&tz).naive_local()
  )
}

/// Parses the machine forms used for due dates, all local wall-clock times.
pub fn parse_local(
  raw: &str
) -> Option<NaiveDateTime> {
  let trimmed = raw.trim();
  LOCAL_FORMATS
    .iter()
    .find_map(|fmt| {
      NaiveDateTime::parse_from_str(
        trimmed, fmt
      )
      .ok()
    })
    .or_else(|| {
      NaiveDate::parse_from_str(
        trimmed, "%Y-%m-%d"
      )
      .ok()
      .map(|date| {
        date.and_time(
          chrono::NaiveTime::MIN
        )
      })
    })
}

fn parse_instant(
  raw: &str,
  tz: Tz
) -> Option<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(raw)
    .ok()
    .map(|dt| dt.with_timezone(&Utc))
    .or_else(|| {
      parse_local(raw)
        .map(|local| local_to_utc(local, tz))
    })
}

fn carries_month_name(raw: &str) -> bool {
  MONTH_NAMES
    .iter()
    .any(|name| raw.contains(name))
}

/// Formats anything timestamp-like. Strings already carrying a Persian
/// month name come back unchanged; unparseable input formats `now`.
pub fn format_input(
  raw: &str,
  now: DateTime<Utc>,
  tz: Tz
) -> String {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return String::new();
  }
  if carries_month_name(trimmed) {
    return trimmed.to_string();
  }

  match parse_instant(trimmed, tz) {
    | Some(at) => format_instant(at, tz),
    | None => {
      tracing::warn!(
        input = %trimmed,
        "unparseable timestamp; formatting current time"
      );
      format_instant(now, tz)
    }
  }
}

/// A stored timestamp. `Formatted` already carries a Persian month name and
/// displays as itself; `Unparsed` goes back through [`format_input`] on
/// every display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stamp {
  At(DateTime<Utc>),
  Formatted(String),
  Unparsed(String)
}

impl Stamp {
  pub fn formatted_now(
    now: DateTime<Utc>,
    tz: Tz
  ) -> Self {
    Self::Formatted(format_instant(
      now, tz
    ))
  }

  pub fn from_stored(raw: String) -> Self {
    if let Ok(at) =
      DateTime::parse_from_rfc3339(&raw)
    {
      return Self::At(
        at.with_timezone(&Utc)
      );
    }
    if carries_month_name(&raw) {
      Self::Formatted(raw)
    } else {
      Self::Unparsed(raw)
    }
  }

  pub fn display(
    &self,
    now: DateTime<Utc>,
    tz: Tz
  ) -> String {
    match self {
      | Self::At(at) => {
        format_instant(*at, tz)
      }
      | Self::Formatted(text) => {
        text.clone()
      }
      | Self::Unparsed(raw) => {
        format_input(raw, now, tz)
      }
    }
  }
}

impl Serialize for Stamp {
  fn serialize<S>(
    &self,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    match self {
      | Self::At(at) => {
        serializer.serialize_str(
          &at.to_rfc3339_opts(
            SecondsFormat::Secs,
            true
          )
        )
      }
      | Self::Formatted(text)
      | Self::Unparsed(text) => {
        serializer.serialize_str(text)
      }
    }
  }
}

impl<'de> Deserialize<'de> for Stamp {
  fn deserialize<D>(
    deserializer: D
  ) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>
  {
    String::deserialize(deserializer)
      .map(Self::from_stored)
  }
}

/// A task's due date. A stored value that no longer parses is kept verbatim
/// and reads as the current instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DueDate {
  Local(NaiveDateTime),
  Unparsed(String)
}

impl DueDate {
  pub fn resolve(
    &self,
    now: DateTime<Utc>,
    tz: Tz
  ) -> NaiveDateTime {
    match self {
      | Self::Local(at) => *at,
      | Self::Unparsed(raw) => {
        tracing::warn!(
          due = %raw,
          "unreadable due date; using current time"
        );
        now.with_timezone(&tz).naive_local()
      }
    }
  }
}

/// Optional due dates as `YYYY-MM-DDTHH:MM`. Empty strings and null load as
/// `None`.
pub mod due_serde {
  use serde::{
    Deserialize,
    Deserializer,
    Serializer
  };

  use super::{
    DUE_FORMAT,
    DueDate,
    parse_local
  };

  pub fn serialize<S>(
    due: &Option<DueDate>,
    serializer: S
  ) -> Result<S::Ok, S::Error>
  where
    S: Serializer
  {
    match due {
      | Some(DueDate::Local(value)) => {
        serializer.serialize_str(
          &value
            .format(DUE_FORMAT)
            .to_string()
        )
      }
      | Some(DueDate::Unparsed(raw)) => {
        serializer.serialize_str(raw)
      }
      | None => serializer.serialize_none()
    }
  }

  pub fn deserialize<'de, D>(
    deserializer: D
  ) -> Result<Option<DueDate>, D::Error>
  where
    D: Deserializer<'de>
  {
    let raw =
      Option::<String>::deserialize(
        deserializer
      )?;
    let Some(raw) = raw else {
      return Ok(None);
    };
    if raw.trim().is_empty() {
      return Ok(None);
    }

    Ok(Some(match parse_local(&raw) {
      | Some(at) => DueDate::Local(at),
      | None => DueDate::Unparsed(raw)
    }))
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    TimeZone,
    Utc
  };

  use super::{
    DueDate,
    Stamp,
    due_serde,
    format_input,
    format_instant,
    from_persian_digits,
    parse_local,
    to_persian_digits
  };

  fn now() -> chrono::DateTime<Utc> {
    Utc
      .with_ymd_and_hms(
        2024, 3, 20, 5, 7, 0
      )
      .single()
      .expect("valid now")
  }

  #[test]
  fn transliterates_digits() {
    assert_eq!(
      to_persian_digits(1403),
      "۱۴۰۳"
    );
    assert_eq!(
      to_persian_digits("3 of 10"),
      "۳ of ۱۰"
    );
    assert_eq!(
      from_persian_digits("۱۴۰۳/٠١"),
      "1403/01"
    );
  }

  #[test]
  fn formats_in_project_timezone() {
    // 05:07 UTC is 08:37 in Tehran on 1 Farvardin 1403.
    assert_eq!(
      format_instant(
        now(),
        chrono_tz::Asia::Tehran
      ),
      "۱ فروردین ۱۴۰۳ - ۰۸:۳۷"
    );
  }

  #[test]
  fn formatting_is_idempotent() {
    let tz = chrono_tz::Asia::Tehran;
    let once = format_input(
      "2024-03-20T08:37",
      now(),
      tz
    );
    assert_eq!(
      once,
      "۱ فروردین ۱۴۰۳ - ۰۸:۳۷"
    );
    assert_eq!(
      format_input(&once, now(), tz),
      once
    );

    let stamp = Stamp::Formatted(
      once.clone()
    );
    assert_eq!(
      stamp.display(now(), tz),
      once
    );
  }

  #[test]
  fn malformed_input_formats_now() {
    let tz = chrono_tz::Asia::Tehran;
    assert_eq!(
      format_input("not a date", now(), tz),
      format_instant(now(), tz)
    );
    assert_eq!(
      format_input("  ", now(), tz),
      ""
    );
  }

  #[test]
  fn rfc3339_input_is_converted_to_local()
  {
    assert_eq!(
      format_input(
        "2024-03-19T20:30:00.000Z",
        now(),
        chrono_tz::Asia::Tehran
      ),
      "۱ فروردین ۱۴۰۳ - ۰۰:۰۰"
    );
  }

  #[test]
  fn stamp_survives_serialization() {
    let at = Stamp::At(now());
    let json = serde_json::to_string(&at)
      .expect("serialize");
    assert_eq!(
      json,
      "\"2024-03-20T05:07:00Z\""
    );
    let back: Stamp =
      serde_json::from_str(&json)
        .expect("deserialize");
    assert_eq!(back, at);

    let legacy: Stamp =
      serde_json::from_str(
        "\"۱ فروردین ۱۴۰۳ - ۰۸:۳۷\""
      )
      .expect("deserialize legacy");
    assert!(matches!(
      legacy,
      Stamp::Formatted(_)
    ));
  }

  #[test]
  fn unreadable_stamps_display_through_the_formatter()
  {
    let tz = chrono_tz::Asia::Tehran;
    let iso: Stamp = serde_json::from_str(
      "\"2024-03-19T23:00\""
    )
    .expect("deserialize iso");
    assert_eq!(
      iso,
      Stamp::Unparsed(
        "2024-03-19T23:00".to_string()
      )
    );
    assert_eq!(
      iso.display(now(), tz),
      "۲۹ اسفند ۱۴۰۲ - ۲۳:۰۰"
    );

    let junk: Stamp =
      serde_json::from_str("\"not a date\"")
        .expect("deserialize junk");
    assert_eq!(
      junk.display(now(), tz),
      "۱ فروردین ۱۴۰۳ - ۰۸:۳۷"
    );
    assert_eq!(
      serde_json::to_string(&junk)
        .expect("serialize"),
      "\"not a date\""
    );
  }

  #[test]
  fn unreadable_due_date_is_kept_and_reads_as_now()
  {
    #[derive(
      Debug,
      serde::Serialize,
      serde::Deserialize
    )]
    struct Row {
      #[serde(default, with = "due_serde")]
      due: Option<DueDate>
    }

    let tz = chrono_tz::Asia::Tehran;
    let row: Row = serde_json::from_str(
      r#"{"due":"garbage"}"#
    )
    .expect("deserialize");
    let due = row.due.clone().expect("kept");
    assert_eq!(
      due.resolve(now(), tz),
      now().with_timezone(&tz).naive_local()
    );
    assert_eq!(
      serde_json::to_string(&row)
        .expect("serialize"),
      r#"{"due":"garbage"}"#
    );

    let empty: Row =
      serde_json::from_str(r#"{"due":""}"#)
        .expect("deserialize empty");
    assert!(empty.due.is_none());
  }

  #[test]
  fn parses_local_forms() {
    let expected =
      NaiveDate::from_ymd_opt(2024, 4, 3)
        .expect("date")
        .and_hms_opt(9, 15, 0)
        .expect("time");
    assert_eq!(
      parse_local("2024-04-03T09:15"),
      Some(expected)
    );
    assert_eq!(
      parse_local("2024-04-03 09:15:00"),
      Some(expected)
    );
    assert!(parse_local("04/03/2024").is_none());
  }
}
