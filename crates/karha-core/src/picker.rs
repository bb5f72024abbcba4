//! Jalaali month-grid date picker.
//!
//! The picker keeps a month cursor and an open flag. Selecting a day hands
//! a local-midnight value back to the owner as a [`PickerEvent`].

use chrono::{
  NaiveDate,
  NaiveDateTime,
  NaiveTime
};

use crate::format::{
  DUE_FORMAT,
  format_local,
  to_persian_digits
};
use crate::jalaali::{
  JalaaliDate,
  WEEKDAY_INITIALS,
  month_length,
  month_name,
  weekday_offset
};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
)]
pub struct MonthCursor {
  pub year:  i32,
  pub month: u32
}

impl MonthCursor {
  const FALLBACK: Self = Self {
    year:  1403,
    month: 1
  };

  pub fn containing(
    date: NaiveDate
  ) -> Option<Self> {
    JalaaliDate::from_gregorian(date).map(
      |j| {
        Self {
          year:  j.year,
          month: j.month
        }
      }
    )
  }

  #[must_use]
  pub fn next(self) -> Self {
    if self.month >= 12 {
      Self {
        year:  self.year + 1,
        month: 1
      }
    } else {
      Self {
        year:  self.year,
        month: self.month + 1
      }
    }
  }

  #[must_use]
  pub fn prev(self) -> Self {
    if self.month <= 1 {
      Self {
        year:  self.year - 1,
        month: 12
      }
    } else {
      Self {
        year:  self.year,
        month: self.month - 1
      }
    }
  }

  /// Cursor `months` away, or `None` past the convertible year range.
  pub fn shifted(
    self,
    months: i32
  ) -> Option<Self> {
    let index = i64::from(self.year) * 12
      + i64::from(self.month)
      - 1
      + i64::from(months);
    let year =
      i32::try_from(index.div_euclid(12))
        .ok()?;
    let month =
      u32::try_from(index.rem_euclid(12) + 1)
        .ok()?;
    JalaaliDate::new(year, month, 1)
      .map(|_| Self { year, month })
  }

  pub fn days(self) -> u32 {
    month_length(self.year, self.month)
  }

  pub fn first_day(
    self
  ) -> Option<NaiveDate> {
    JalaaliDate::new(
      self.year, self.month, 1
    )?
    .to_gregorian()
  }

  pub fn title(self) -> String {
    format!(
      "{} {}",
      month_name(self.month),
      to_persian_digits(self.year)
    )
  }

  fn holds(
    self,
    date: NaiveDate
  ) -> Option<u32> {
    let j =
      JalaaliDate::from_gregorian(date)?;
    (j.year == self.year
      && j.month == self.month)
      .then_some(j.day)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerEvent {
  Selected(NaiveDateTime),
  Cleared
}

impl PickerEvent {
  pub fn value(
    &self
  ) -> Option<NaiveDateTime> {
    match self {
      | Self::Selected(at) => Some(*at),
      | Self::Cleared => None
    }
  }

  /// ISO string truncated to minutes, empty when cleared.
  pub fn as_value(&self) -> String {
    self
      .value()
      .map(|at| {
        at.format(DUE_FORMAT).to_string()
      })
      .unwrap_or_default()
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCell {
  pub day:         u32,
  pub label:       String,
  pub is_today:    bool,
  pub is_selected: bool
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGrid {
  pub title:          String,
  pub weekdays:       [&'static str; 7],
  pub leading_blanks: u32,
  pub days:           Vec<DayCell>
}

impl MonthGrid {
  /// Rows of seven, blanks as `None`.
  pub fn weeks(
    &self
  ) -> Vec<Vec<Option<&DayCell>>> {
    let mut cells: Vec<Option<&DayCell>> =
      (0..self.leading_blanks)
        .map(|_| None)
        .collect();
    cells.extend(self.days.iter().map(Some));
    while cells.len() % 7 != 0 {
      cells.push(None);
    }
    cells
      .chunks(7)
      .map(<[Option<&DayCell>]>::to_vec)
      .collect()
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatePicker {
  cursor: MonthCursor,
  open:   bool
}

impl DatePicker {
  pub fn new(today: NaiveDate) -> Self {
    Self {
      cursor: MonthCursor::containing(
        today
      )
      .unwrap_or(MonthCursor::FALLBACK),
      open:   false
    }
  }

  pub fn cursor(&self) -> MonthCursor {
    self.cursor
  }

  pub fn is_open(&self) -> bool {
    self.open
  }

  pub fn open(&mut self) {
    self.open = true;
  }

  pub fn close(&mut self) {
    self.open = false;
  }

  pub fn toggle(&mut self) {
    self.open = !self.open;
  }

  pub fn next_month(&mut self) {
    self.cursor = self.cursor.next();
  }

  pub fn prev_month(&mut self) {
    self.cursor = self.cursor.prev();
  }

  /// Moves `months` at once; `false` leaves the cursor where it was.
  pub fn shift_months(
    &mut self,
    months: i32
  ) -> bool {
    match self.cursor.shifted(months) {
      | Some(cursor) => {
        self.cursor = cursor;
        true
      }
      | None => false
    }
  }

  /// Jumps to the month holding `date`.
  pub fn show(&mut self, date: NaiveDate) {
    if let Some(cursor) =
      MonthCursor::containing(date)
    {
      self.cursor = cursor;
    }
  }

  /// Emits nothing for a day outside the viewed month.
  pub fn select_day(
    &mut self,
    day: u32
  ) -> Option<PickerEvent> {
    let date = JalaaliDate::new(
      self.cursor.year,
      self.cursor.month,
      day
    )?
    .to_gregorian()?;
    self.open = false;
    Some(PickerEvent::Selected(
      date.and_time(NaiveTime::MIN)
    ))
  }

  pub fn select_today(
    &mut self,
    today: NaiveDate
  ) -> PickerEvent {
    self.open = false;
    PickerEvent::Selected(
      today.and_time(NaiveTime::MIN)
    )
  }

  pub fn clear(&mut self) -> PickerEvent {
    self.open = false;
    PickerEvent::Cleared
  }

  pub fn grid(
    &self,
    today: NaiveDate,
    selected: Option<NaiveDateTime>
  ) -> MonthGrid {
    let today_day = self.cursor.holds(today);
    let selected_day = selected.and_then(
      |at| self.cursor.holds(at.date())
    );
    let leading_blanks = self
      .cursor
      .first_day()
      .map_or(0, weekday_offset);

    let days = (1..=self.cursor.days())
      .map(|day| {
        DayCell {
          day,
          label: to_persian_digits(day),
          is_today: today_day == Some(day),
          is_selected: selected_day
            == Some(day)
        }
      })
      .collect();

    MonthGrid {
      title: self.cursor.title(),
      weekdays: WEEKDAY_INITIALS,
      leading_blanks,
      days
    }
  }
}

/// Text shown on the closed picker.
pub fn display_label(
  value: Option<NaiveDateTime>,
  placeholder: &str
) -> String {
  value.map_or_else(
    || placeholder.to_string(),
    format_local
  )
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::{
    DatePicker,
    MonthCursor,
    PickerEvent,
    display_label
  };

  fn ymd(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn starts_on_the_current_jalaali_month()
  {
    let picker =
      DatePicker::new(ymd(2024, 3, 25));
    assert_eq!(
      picker.cursor(),
      MonthCursor {
        year:  1403,
        month: 1
      }
    );
    assert!(!picker.is_open());
  }

  #[test]
  fn steps_jalaali_months_across_new_year()
  {
    let mut picker =
      DatePicker::new(ymd(2025, 3, 20));
    assert_eq!(
      picker.cursor(),
      MonthCursor {
        year:  1403,
        month: 12
      }
    );
    picker.next_month();
    assert_eq!(
      picker.cursor(),
      MonthCursor {
        year:  1404,
        month: 1
      }
    );
    picker.prev_month();
    picker.prev_month();
    assert_eq!(
      picker.cursor(),
      MonthCursor {
        year:  1403,
        month: 11
      }
    );
  }

  #[test]
  fn shifting_many_months_is_one_step() {
    let mut picker =
      DatePicker::new(ymd(2024, 3, 25));
    assert!(picker.shift_months(-13));
    assert_eq!(
      picker.cursor(),
      MonthCursor {
        year:  1401,
        month: 12
      }
    );
    assert!(picker.shift_months(25));
    assert_eq!(
      picker.cursor(),
      MonthCursor {
        year:  1404,
        month: 1
      }
    );

    assert!(!picker.shift_months(2_000_000_000));
    assert!(!picker.shift_months(i32::MIN));
    assert_eq!(
      picker.cursor(),
      MonthCursor {
        year:  1404,
        month: 1
      }
    );
  }

  #[test]
  fn grid_marks_today_and_selection() {
    let today = ymd(2024, 3, 25);
    let picker = DatePicker::new(today);
    let selected = ymd(2024, 4, 3)
      .and_hms_opt(0, 0, 0)
      .expect("time");

    let grid =
      picker.grid(today, Some(selected));
    assert_eq!(grid.title, "فروردین ۱۴۰۳");
    assert_eq!(grid.days.len(), 31);
    // 1 Farvardin 1403 fell on a Wednesday.
    assert_eq!(grid.leading_blanks, 4);

    let today_cells: Vec<u32> = grid
      .days
      .iter()
      .filter(|c| c.is_today)
      .map(|c| c.day)
      .collect();
    assert_eq!(today_cells, vec![6]);

    let selected_cells: Vec<u32> = grid
      .days
      .iter()
      .filter(|c| c.is_selected)
      .map(|c| c.day)
      .collect();
    assert_eq!(selected_cells, vec![15]);

    let weeks = grid.weeks();
    assert_eq!(weeks.len(), 5);
    assert!(weeks[0][3].is_none());
    assert_eq!(
      weeks[0][4].map(|c| c.day),
      Some(1)
    );
  }

  #[test]
  fn selection_marker_needs_matching_month()
  {
    let today = ymd(2024, 3, 25);
    let mut picker = DatePicker::new(today);
    picker.next_month();
    let grid = picker.grid(
      today,
      ymd(2024, 3, 25).and_hms_opt(0, 0, 0)
    );
    assert!(
      grid
        .days
        .iter()
        .all(|c| !c.is_today
          && !c.is_selected)
    );
  }

  #[test]
  fn selecting_a_day_emits_local_midnight()
  {
    let mut picker =
      DatePicker::new(ymd(2024, 3, 25));
    picker.open();
    let event = picker
      .select_day(15)
      .expect("valid day");
    assert_eq!(
      event.as_value(),
      "2024-04-03T00:00"
    );
    assert!(!picker.is_open());

    assert!(picker.select_day(32).is_none());
  }

  #[test]
  fn today_and_clear_shortcuts() {
    let today = ymd(2024, 3, 25);
    let mut picker = DatePicker::new(today);
    picker.toggle();
    assert_eq!(
      picker.select_today(today).as_value(),
      "2024-03-25T00:00"
    );
    picker.toggle();
    assert_eq!(
      picker.clear(),
      PickerEvent::Cleared
    );
    assert_eq!(
      PickerEvent::Cleared.as_value(),
      ""
    );
    assert!(!picker.is_open());
  }

  #[test]
  fn label_falls_back_to_placeholder() {
    assert_eq!(
      display_label(None, "مهلت"),
      "مهلت"
    );
    assert_eq!(
      display_label(
        ymd(2024, 4, 3).and_hms_opt(0, 0, 0),
        "مهلت"
      ),
      "۱۵ فروردین ۱۴۰۳ - ۰۰:۰۰"
    );
  }
}
