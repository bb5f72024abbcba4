//! Application state and the single entry point for every user action.
//!
//! Each successful mutation writes the persisted snapshot back through the
//! injected [`KeyValueStore`]. Confirmations and notices go through the
//! injected [`Prompter`].

use std::collections::VecDeque;

use chrono::{
  DateTime,
  NaiveDate,
  Utc
};
use chrono_tz::Tz;
use tracing::{
  debug,
  info
};
use uuid::Uuid;

use crate::due::{
  Severity,
  days_remaining,
  remaining_severity,
  remaining_text
};
use crate::format::format_local;
use crate::persist::{
  KeyValueStore,
  Snapshot,
  erase_tasks,
  load_snapshot,
  save_snapshot
};
use crate::picker::{
  DatePicker,
  MonthGrid,
  PickerEvent
};
use crate::store::{
  IdMatch,
  TaskDraft,
  TaskStats,
  TaskStore
};
use crate::task::{
  FilterKind,
  Meta,
  Task,
  Theme,
  TrashedTask
};

pub const CLEAR_CONFIRM: &str = "آیا مطمئن هستید که می‌خواهید تمام داده‌ها را پاک کنید؟";
pub const CLEARED_NOTICE: &str =
  "تمام داده‌ها پاک شدند.";

/// Blocking yes/no questions and acknowledgements.
pub trait Prompter {
  fn confirm(
    &mut self,
    message: &str
  ) -> bool;

  fn notify(&mut self, message: &str);
}

/// Answers from a queue and records every message; unanswered questions
/// are declined.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPrompter {
  answers:       VecDeque<bool>,
  pub questions: Vec<String>,
  pub notices:   Vec<String>
}

impl ScriptedPrompter {
  pub fn answering(
    answers: impl IntoIterator<Item = bool>
  ) -> Self {
    Self {
      answers: answers
        .into_iter()
        .collect(),
      ..Self::default()
    }
  }
}

impl Prompter for ScriptedPrompter {
  fn confirm(
    &mut self,
    message: &str
  ) -> bool {
    self
      .questions
      .push(message.to_string());
    self
      .answers
      .pop_front()
      .unwrap_or(false)
  }

  fn notify(&mut self, message: &str) {
    self
      .notices
      .push(message.to_string());
  }
}

/// One row of the task list, ready for any renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskView {
  pub id:        Uuid,
  pub short_id:  String,
  pub text:      String,
  pub completed: bool,
  pub category:  Meta,
  pub priority:  Meta,
  pub tags:      Vec<String>,
  pub due:       Option<String>,
  pub remaining: String,
  pub severity:  Severity,
  pub created:   String
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrashView {
  pub id:       Uuid,
  pub short_id: String,
  pub text:     String,
  pub category: Meta,
  pub removed:  String
}

#[derive(Debug)]
pub struct TaskManager<S, P> {
  tasks:      TaskStore,
  draft:      TaskDraft,
  search:     String,
  filter:     FilterKind,
  theme:      Theme,
  trash_open: bool,
  picker:     DatePicker,
  storage:    S,
  prompter:   P,
  tz:         Tz
}

impl<S, P> TaskManager<S, P>
where
  S: KeyValueStore,
  P: Prompter
{
  #[tracing::instrument(skip(
    storage, prompter
  ))]
  pub fn load(
    storage: S,
    prompter: P,
    tz: Tz,
    today: NaiveDate
  ) -> Self {
    let Snapshot {
      tasks,
      trashed,
      theme
    } = load_snapshot(&storage);
    info!(
      active = tasks.len(),
      trashed = trashed.len(),
      dark = theme.is_dark(),
      "loaded task state"
    );

    Self {
      tasks: TaskStore::from_parts(
        tasks, trashed
      ),
      draft: TaskDraft::default(),
      search: String::new(),
      filter: FilterKind::default(),
      theme,
      trash_open: false,
      picker: DatePicker::new(today),
      storage,
      prompter,
      tz
    }
  }

  fn persist(
    &mut self
  ) -> anyhow::Result<()> {
    let snapshot = Snapshot {
      tasks:   self.tasks.active().to_vec(),
      trashed: self
        .tasks
        .trashed()
        .to_vec(),
      theme:   self.theme
    };
    save_snapshot(
      &mut self.storage,
      &snapshot
    )
  }

  /// Creates a task from the draft. Blank text raises the validation
  /// notice and returns `None`.
  #[tracing::instrument(skip(self, now))]
  pub fn add_task(
    &mut self,
    now: DateTime<Utc>
  ) -> anyhow::Result<Option<Uuid>> {
    match self.tasks.create(
      &self.draft,
      now,
      self.tz
    ) {
      | Ok(id) => {
        self.draft = TaskDraft::default();
        self.persist()?;
        Ok(Some(id))
      }
      | Err(rejected) => {
        self
          .prompter
          .notify(rejected.notice());
        Ok(None)
      }
    }
  }

  #[tracing::instrument(skip(self))]
  pub fn toggle_task(
    &mut self,
    id: Uuid
  ) -> anyhow::Result<bool> {
    if !self.tasks.toggle(id) {
      return Ok(false);
    }
    self.persist()?;
    Ok(true)
  }

  #[tracing::instrument(skip(self, now))]
  pub fn remove_task(
    &mut self,
    id: Uuid,
    now: DateTime<Utc>
  ) -> anyhow::Result<bool> {
    if !self.tasks.remove(id, now, self.tz)
    {
      return Ok(false);
    }
    self.persist()?;
    Ok(true)
  }

  #[tracing::instrument(skip(self))]
  pub fn recover_task(
    &mut self,
    id: Uuid
  ) -> anyhow::Result<bool> {
    if !self.tasks.recover(id) {
      return Ok(false);
    }
    self.persist()?;
    Ok(true)
  }

  /// Irreversibly drops every task after the user confirms.
  #[tracing::instrument(skip(self))]
  pub fn clear_all(
    &mut self
  ) -> anyhow::Result<bool> {
    if !self.prompter.confirm(CLEAR_CONFIRM)
    {
      debug!("clear-all declined");
      return Ok(false);
    }

    erase_tasks(&mut self.storage)?;
    self.tasks.clear();
    self.prompter.notify(CLEARED_NOTICE);
    Ok(true)
  }

  #[tracing::instrument(skip(self))]
  pub fn toggle_theme(
    &mut self
  ) -> anyhow::Result<Theme> {
    self.theme = self.theme.toggled();
    self.persist()?;
    Ok(self.theme)
  }

  pub fn draft(&self) -> &TaskDraft {
    &self.draft
  }

  pub fn draft_mut(
    &mut self
  ) -> &mut TaskDraft {
    &mut self.draft
  }

  pub fn picker(&self) -> &DatePicker {
    &self.picker
  }

  pub fn picker_mut(
    &mut self
  ) -> &mut DatePicker {
    &mut self.picker
  }

  /// Routes a picker emission into the draft's due date.
  pub fn apply_picker_event(
    &mut self,
    event: PickerEvent
  ) {
    self.draft.due = event.value();
  }

  pub fn due_grid(
    &self,
    today: NaiveDate
  ) -> MonthGrid {
    self.picker.grid(today, self.draft.due)
  }

  pub fn set_search(
    &mut self,
    query: impl Into<String>
  ) {
    self.search = query.into();
  }

  pub fn search(&self) -> &str {
    &self.search
  }

  pub fn set_filter(
    &mut self,
    filter: FilterKind
  ) {
    self.filter = filter;
  }

  pub fn filter(&self) -> FilterKind {
    self.filter
  }

  pub fn theme(&self) -> Theme {
    self.theme
  }

  pub fn toggle_trash_view(&mut self) {
    self.trash_open = !self.trash_open;
  }

  pub fn is_trash_open(&self) -> bool {
    self.trash_open
  }

  pub fn tz(&self) -> Tz {
    self.tz
  }

  pub fn tasks(&self) -> &TaskStore {
    &self.tasks
  }

  pub fn storage(&self) -> &S {
    &self.storage
  }

  pub fn prompter(&self) -> &P {
    &self.prompter
  }

  pub fn resolve_id(
    &self,
    prefix: &str
  ) -> anyhow::Result<IdMatch> {
    self.tasks.resolve_id(prefix)
  }

  pub fn visible_tasks(&self) -> Vec<&Task> {
    self
      .tasks
      .filtered(self.filter, &self.search)
  }

  pub fn stats(&self) -> TaskStats {
    self.tasks.stats()
  }

  pub fn trash(&self) -> &[TrashedTask] {
    self.tasks.trashed()
  }

  pub fn task_views(
    &self,
    now: DateTime<Utc>
  ) -> Vec<TaskView> {
    self
      .visible_tasks()
      .into_iter()
      .map(|task| {
        let due = task
          .due_date
          .as_ref()
          .map(|due| due.resolve(now, self.tz));
        let days =
          days_remaining(due, now, self.tz);
        TaskView {
          id:        task.id,
          short_id:  task.short_id(),
          text:      task.text.clone(),
          completed: task.completed,
          category:  task.category.meta(),
          priority:  task.priority.meta(),
          tags:      task.tags.clone(),
          due:       due.map(format_local),
          remaining: remaining_text(days),
          severity:  remaining_severity(days),
          created:   task
            .created_at
            .display(now, self.tz)
        }
      })
      .collect()
  }

  pub fn trash_views(
    &self,
    now: DateTime<Utc>
  ) -> Vec<TrashView> {
    self
      .tasks
      .trashed()
      .iter()
      .map(|trashed| {
        TrashView {
          id:       trashed.task.id,
          short_id: trashed.task.short_id(),
          text:     trashed.task.text.clone(),
          category: trashed
            .task
            .category
            .meta(),
          removed:  trashed
            .removed_at
            .display(now, self.tz)
        }
      })
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    Duration,
    NaiveDate,
    TimeZone,
    Utc
  };

  use super::{
    CLEAR_CONFIRM,
    CLEARED_NOTICE,
    ScriptedPrompter,
    TaskManager
  };
  use crate::due::Severity;
  use crate::persist::{
    KeyValueStore,
    MemoryStore,
    TASKS_KEY,
    THEME_KEY,
    TRASH_KEY
  };
  use crate::task::{
    Category,
    FilterKind,
    Priority,
    Theme
  };

  type Manager =
    TaskManager<MemoryStore, ScriptedPrompter>;

  fn now() -> chrono::DateTime<Utc> {
    Utc
      .with_ymd_and_hms(
        2024, 3, 20, 5, 7, 0
      )
      .single()
      .expect("valid now")
  }

  fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 20)
      .expect("date")
  }

  fn manager(answers: &[bool]) -> Manager {
    TaskManager::load(
      MemoryStore::new(),
      ScriptedPrompter::answering(
        answers.iter().copied()
      ),
      chrono_tz::Asia::Tehran,
      today()
    )
  }

  fn add(
    m: &mut Manager,
    text: &str
  ) -> uuid::Uuid {
    m.draft_mut().text = text.to_string();
    m.add_task(now())
      .expect("add")
      .expect("created")
  }

  #[test]
  fn add_resets_draft_and_persists() {
    let mut m = manager(&[]);
    {
      let draft = m.draft_mut();
      draft.text = "گزارش".to_string();
      draft.category = Category::Work;
      draft.priority = Priority::Urgent;
      draft.tags = "کار, فوری".to_string();
    }
    let id = m
      .add_task(now())
      .expect("add")
      .expect("created");

    assert_eq!(m.draft().text, "");
    assert_eq!(
      m.draft().category,
      Category::Personal
    );
    assert_eq!(
      m.draft().priority,
      Priority::Medium
    );
    assert!(
      m.storage()
        .raw(TASKS_KEY)
        .is_some_and(|raw| raw
          .contains(&id.to_string()))
    );
    assert_eq!(
      m.tasks().active()[0].tags,
      vec!["کار", "فوری"]
    );
  }

  #[test]
  fn blank_add_raises_notice_only() {
    let mut m = manager(&[]);
    m.draft_mut().text = "   ".to_string();
    assert_eq!(
      m.add_task(now()).expect("add"),
      None
    );
    assert!(m.tasks().active().is_empty());
    assert_eq!(
      m.prompter().notices,
      vec!["لطفا متن کار را وارد کنید!"]
    );
    assert_eq!(
      m.storage().raw(TASKS_KEY),
      None
    );
  }

  #[test]
  fn picker_selection_flows_into_draft() {
    let mut m = manager(&[]);
    m.picker_mut().open();
    let event = m
      .picker_mut()
      .select_day(15)
      .expect("valid day");
    m.apply_picker_event(event);
    assert_eq!(
      m.draft()
        .due
        .map(|d| d.to_string()),
      Some(
        "2024-04-03 00:00:00".to_string()
      )
    );
    let grid = m.due_grid(today());
    assert!(
      grid
        .days
        .iter()
        .any(|c| c.day == 15
          && c.is_selected)
    );

    let id = add(&mut m, "سفر");
    let views = m.task_views(now());
    assert_eq!(views[0].id, id);
    assert_eq!(
      views[0].due.as_deref(),
      Some("۱۵ فروردین ۱۴۰۳ - ۰۰:۰۰")
    );
    assert_eq!(
      views[0].remaining,
      "۱۴ روز باقی مانده"
    );
    assert_eq!(
      views[0].severity,
      Severity::Success
    );
  }

  #[test]
  fn views_follow_search_and_filter() {
    let mut m = manager(&[]);
    add(&mut m, "buy milk");
    let bill = add(&mut m, "pay bill");
    m.toggle_task(bill).expect("toggle");

    m.set_filter(FilterKind::Completed);
    let views = m.task_views(now());
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].text, "pay bill");
    assert_eq!(views[0].remaining, "");
    assert_eq!(
      views[0].severity,
      Severity::Muted
    );

    m.set_filter(FilterKind::All);
    m.set_search("MILK");
    assert_eq!(m.visible_tasks().len(), 1);
    assert_eq!(m.stats().total, 2);
  }

  #[test]
  fn due_today_reads_as_today() {
    let mut m = manager(&[]);
    m.draft_mut().due = Some(
      (now() + Duration::hours(2))
        .with_timezone(
          &chrono_tz::Asia::Tehran
        )
        .naive_local()
    );
    add(&mut m, "call");
    let views = m.task_views(now());
    assert_eq!(views[0].remaining, "فردا");

    let mut m = manager(&[]);
    m.draft_mut().due = Some(
      now()
        .with_timezone(
          &chrono_tz::Asia::Tehran
        )
        .naive_local()
    );
    add(&mut m, "call");
    let views = m.task_views(now());
    assert_eq!(views[0].remaining, "امروز");
    assert_eq!(
      views[0].severity,
      Severity::Warning
    );
  }

  #[test]
  fn remove_and_recover_through_manager() {
    let mut m = manager(&[]);
    let id = add(&mut m, "water plants");
    assert!(
      m.remove_task(id, now())
        .expect("remove")
    );
    assert_eq!(m.trash_views(now()).len(), 1);
    assert_eq!(
      m.trash_views(now())[0].removed,
      "۱ فروردین ۱۴۰۳ - ۰۸:۳۷"
    );
    assert!(
      !m.remove_task(id, now())
        .expect("second remove")
    );
    assert!(
      m.recover_task(id).expect("recover")
    );
    assert_eq!(m.tasks().active()[0].id, id);
  }

  #[test]
  fn clear_all_requires_confirmation() {
    let mut m = manager(&[false, true]);
    add(&mut m, "one");

    assert!(!m.clear_all().expect("declined"));
    assert_eq!(m.tasks().active().len(), 1);

    assert!(m.clear_all().expect("confirmed"));
    assert!(m.tasks().active().is_empty());
    assert_eq!(
      m.prompter().questions,
      vec![CLEAR_CONFIRM, CLEAR_CONFIRM]
    );
    assert_eq!(
      m.prompter().notices,
      vec![CLEARED_NOTICE]
    );
    assert_eq!(
      m.storage().raw(TASKS_KEY),
      None
    );
  }

  #[test]
  fn theme_toggle_persists() {
    let mut m = manager(&[]);
    assert_eq!(m.theme(), Theme::Dark);
    assert_eq!(
      m.toggle_theme().expect("toggle"),
      Theme::Light
    );
    assert_eq!(
      m.storage().raw(THEME_KEY),
      Some("false")
    );
    m.toggle_trash_view();
    assert!(m.is_trash_open());
  }

  #[test]
  fn unreadable_stored_dates_fall_back_to_now()
  {
    let mut storage = MemoryStore::new();
    storage
      .set(
        TASKS_KEY,
        r#"[{
          "id": "67e55044-10b1-426f-9247-bb680e5fe0c8",
          "text": "legacy",
          "createdAt": "2024-03-20T08:37",
          "dueDate": "garbage"
        }]"#
      )
      .expect("seed tasks");
    storage
      .set(
        TRASH_KEY,
        r#"[{
          "id": "9f1c2d3e-4b5a-4c6d-8e7f-001122334455",
          "text": "old",
          "createdAt": "not a date",
          "removedAt": "not a date"
        }]"#
      )
      .expect("seed trash");

    let mut m = TaskManager::load(
      storage,
      ScriptedPrompter::default(),
      chrono_tz::Asia::Tehran,
      today()
    );
    let formatted_now =
      "۱ فروردین ۱۴۰۳ - ۰۸:۳۷";

    let views = m.task_views(now());
    assert_eq!(views[0].created, formatted_now);
    assert_eq!(
      views[0].due.as_deref(),
      Some(formatted_now)
    );
    assert_eq!(views[0].remaining, "امروز");
    assert_eq!(
      views[0].severity,
      Severity::Warning
    );
    assert_eq!(
      m.trash_views(now())[0].removed,
      formatted_now
    );

    let id = views[0].id;
    m.toggle_task(id).expect("toggle");
    assert!(
      m.storage()
        .raw(TASKS_KEY)
        .is_some_and(|raw| raw
          .contains(r#""dueDate":"garbage""#))
    );
  }
}
