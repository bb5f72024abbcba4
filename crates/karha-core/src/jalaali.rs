//! Gregorian <-> Jalaali (Persian solar hijri) conversion.
//!
//! Leap years follow the 33-year cycle break table. Day arithmetic runs on
//! chrono's day count from the common era, so the Gregorian side is always
//! proleptic.

use chrono::{
  Datelike,
  Days,
  NaiveDate
};

const BREAKS: [i64; 20] = [
  -61, 9, 38, 199, 426, 686, 756, 818,
  1111, 1181, 1210, 1635, 2060, 2097,
  2192, 2262, 2324, 2394, 2456, 3178
];

pub const MONTH_NAMES: [&str; 12] = [
  "فروردین",
  "اردیبهشت",
  "خرداد",
  "تیر",
  "مرداد",
  "شهریور",
  "مهر",
  "آبان",
  "آذر",
  "دی",
  "بهمن",
  "اسفند"
];

/// Saturday-first week.
pub const WEEKDAY_INITIALS: [&str; 7] =
  ["ش", "ی", "د", "س", "چ", "پ", "ج"];

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
)]
pub struct JalaaliDate {
  pub year:  i32,
  pub month: u32,
  pub day:   u32
}

struct Cycle {
  leap:           i64,
  gregorian_year: i64,
  march:          i64
}

impl JalaaliDate {
  pub fn new(
    year: i32,
    month: u32,
    day: u32
  ) -> Option<Self> {
    if !(1..=12).contains(&month)
      || day == 0
      || day > month_length(year, month)
      || !in_range(i64::from(year))
    {
      return None;
    }
    Some(Self {
      year,
      month,
      day
    })
  }

  #[must_use]
  pub fn from_gregorian(
    date: NaiveDate
  ) -> Option<Self> {
    let gy = i64::from(date.year());
    let mut jy = gy - 621;
    let cycle = jal_cal(jy)?;
    let farvardin_first =
      march_day(gy, cycle.march)?;

    let mut k = i64::from(
      date.num_days_from_ce()
    ) - i64::from(
      farvardin_first.num_days_from_ce()
    );

    if k >= 0 {
      if k <= 185 {
        return Some(Self {
          year:  i32::try_from(jy).ok()?,
          month: u32::try_from(
            1 + k / 31
          )
          .ok()?,
          day:   u32::try_from(
            k % 31 + 1
          )
          .ok()?
        });
      }
      k -= 186;
    } else {
      jy -= 1;
      k += 179;
      if cycle.leap == 1 {
        k += 1;
      }
    }

    Some(Self {
      year:  i32::try_from(jy).ok()?,
      month: u32::try_from(7 + k / 30)
        .ok()?,
      day:   u32::try_from(k % 30 + 1)
        .ok()?
    })
  }

  #[must_use]
  pub fn to_gregorian(
    &self
  ) -> Option<NaiveDate> {
    let valid = Self::new(
      self.year, self.month, self.day
    )?;
    let cycle =
      jal_cal(i64::from(valid.year))?;
    let start = march_day(
      cycle.gregorian_year,
      cycle.march
    )?;

    let month = i64::from(valid.month);
    let offset = (month - 1) * 31
      - (month / 7) * (month - 7)
      + i64::from(valid.day)
      - 1;

    start.checked_add_days(Days::new(
      u64::try_from(offset).ok()?
    ))
  }

  pub fn month_name(
    &self
  ) -> &'static str {
    month_name(self.month)
  }

  pub fn days_in_month(&self) -> u32 {
    month_length(self.year, self.month)
  }
}

/// Day count of a Jalaali month. `month` must be in `1..=12`.
pub fn month_length(
  year: i32,
  month: u32
) -> u32 {
  match month {
    | 1..=6 => 31,
    | 7..=11 => 30,
    | _ if is_leap_year(year) => 30,
    | _ => 29
  }
}

pub fn is_leap_year(year: i32) -> bool {
  jal_cal(i64::from(year))
    .is_some_and(|cycle| cycle.leap == 0)
}

pub fn month_name(
  month: u32
) -> &'static str {
  let idx = month
    .saturating_sub(1)
    .min(11) as usize;
  MONTH_NAMES[idx]
}

/// Column of `date` in a Saturday-first week (Saturday = 0).
pub fn weekday_offset(
  date: NaiveDate
) -> u32 {
  (date.weekday().num_days_from_sunday()
    + 1)
    % 7
}

fn in_range(jy: i64) -> bool {
  jy >= BREAKS[0]
    && jy < BREAKS[BREAKS.len() - 1]
}

fn march_day(
  gregorian_year: i64,
  march: i64
) -> Option<NaiveDate> {
  NaiveDate::from_ymd_opt(
    i32::try_from(gregorian_year).ok()?,
    3,
    u32::try_from(march).ok()?
  )
}

/// Leap position within the 33-year cycle plus the Gregorian day of March
/// on which Farvardin 1 falls.
fn jal_cal(jy: i64) -> Option<Cycle> {
  if !in_range(jy) {
    return None;
  }

  let gregorian_year = jy + 621;
  let mut leap_j = -14;
  let mut jp = BREAKS[0];
  let mut jump = 0;

  for &jm in &BREAKS[1..] {
    jump = jm - jp;
    if jy < jm {
      break;
    }
    leap_j +=
      (jump / 33) * 8 + (jump % 33) / 4;
    jp = jm;
  }

  let mut n = jy - jp;
  leap_j += (n / 33) * 8 + (n % 33 + 3) / 4;
  if jump % 33 == 4 && jump - n == 4 {
    leap_j += 1;
  }

  let leap_g = gregorian_year / 4
    - ((gregorian_year / 100 + 1) * 3) / 4
    - 150;
  let march = 20 + leap_j - leap_g;

  if jump - n < 6 {
    n = n - jump + ((jump + 4) / 33) * 33;
  }
  let mut leap = ((n + 1) % 33 - 1) % 4;
  if leap == -1 {
    leap = 4;
  }

  Some(Cycle {
    leap,
    gregorian_year,
    march
  })
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::{
    JalaaliDate,
    is_leap_year,
    month_length,
    weekday_offset
  };

  fn ymd(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid gregorian date")
  }

  #[test]
  fn converts_known_dates() {
    let cases = [
      (ymd(2024, 3, 20), (1403, 1, 1)),
      (ymd(2024, 1, 1), (1402, 10, 11)),
      (ymd(2025, 3, 20), (1403, 12, 30)),
      (ymd(2025, 3, 21), (1404, 1, 1)),
      (ymd(2026, 10, 19), (1405, 7, 27)),
      (ymd(1990, 1, 1), (1368, 10, 11))
    ];

    for (gregorian, (y, m, d)) in cases {
      let jalaali =
        JalaaliDate::from_gregorian(
          gregorian
        )
        .expect("in range");
      assert_eq!(
        (
          jalaali.year,
          jalaali.month,
          jalaali.day
        ),
        (y, m, d),
        "{gregorian}"
      );
      assert_eq!(
        jalaali.to_gregorian(),
        Some(gregorian)
      );
    }
  }

  #[test]
  fn round_trips_every_day_for_a_century()
  {
    let mut date = ymd(1950, 1, 1);
    let end = ymd(2050, 1, 1);
    while date < end {
      let jalaali =
        JalaaliDate::from_gregorian(date)
          .expect("in range");
      assert!(
        jalaali.day
          <= jalaali.days_in_month()
      );
      assert_eq!(
        jalaali.to_gregorian(),
        Some(date)
      );
      date = date
        .succ_opt()
        .expect("next day");
    }
  }

  #[test]
  fn month_lengths_follow_leap_rule() {
    assert_eq!(month_length(1403, 1), 31);
    assert_eq!(month_length(1403, 6), 31);
    assert_eq!(month_length(1403, 7), 30);
    assert_eq!(month_length(1403, 11), 30);
    assert_eq!(month_length(1403, 12), 30);
    assert_eq!(month_length(1402, 12), 29);
    assert_eq!(month_length(1404, 12), 29);
    assert!(is_leap_year(1399));
    assert!(!is_leap_year(1400));
  }

  #[test]
  fn rejects_invalid_triples() {
    assert!(
      JalaaliDate::new(1402, 12, 30)
        .is_none()
    );
    assert!(
      JalaaliDate::new(1403, 13, 1)
        .is_none()
    );
    assert!(
      JalaaliDate::new(1403, 7, 31)
        .is_none()
    );
    assert!(
      JalaaliDate::new(4000, 1, 1)
        .is_none()
    );
    let bogus = JalaaliDate {
      year:  1403,
      month: 0,
      day:   1
    };
    assert!(bogus.to_gregorian().is_none());
  }

  #[test]
  fn saturday_starts_the_week() {
    // 2024-03-16 was a Saturday, 2024-03-20 a Wednesday.
    assert_eq!(
      weekday_offset(ymd(2024, 3, 16)),
      0
    );
    assert_eq!(
      weekday_offset(ymd(2024, 3, 20)),
      4
    );
    assert_eq!(
      weekday_offset(ymd(2024, 3, 22)),
      6
    );
  }
}
