use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, info};
use uuid::Uuid;

use crate::format::{DueDate, Stamp};
use crate::task::{Category, FilterKind, Priority, Task, TrashedTask, parse_tags};

/// Input fields of a task that has not been created yet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskDraft {
    pub text: String,
    pub category: Category,
    pub priority: Priority,
    pub due: Option<NaiveDateTime>,
    pub tags: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    BlankText,
}

impl ValidationError {
    pub fn notice(self) -> &'static str {
        match self {
            ValidationError::BlankText => "لطفا متن کار را وارد کنید!",
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.notice())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub urgent: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdMatch {
    Active(Uuid),
    Trashed(Uuid),
}

/// Active tasks, most recent first, and the trash in removal order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskStore {
    active: Vec<Task>,
    trashed: Vec<TrashedTask>,
}

impl TaskStore {
    pub fn from_parts(active: Vec<Task>, trashed: Vec<TrashedTask>) -> Self {
        Self { active, trashed }
    }

    pub fn active(&self) -> &[Task] {
        &self.active
    }

    pub fn trashed(&self) -> &[TrashedTask] {
        &self.trashed
    }

    pub fn find_active(&self, id: Uuid) -> Option<&Task> {
        self.active.iter().find(|t| t.id == id)
    }

    pub fn find_trashed(&self, id: Uuid) -> Option<&TrashedTask> {
        self.trashed.iter().find(|t| t.task.id == id)
    }

    #[tracing::instrument(skip(self, draft, now, tz))]
    pub fn create(
        &mut self,
        draft: &TaskDraft,
        now: DateTime<Utc>,
        tz: Tz,
    ) -> Result<Uuid, ValidationError> {
        if draft.text.trim().is_empty() {
            debug!("rejected blank task text");
            return Err(ValidationError::BlankText);
        }

        let task = Task {
            id: Uuid::new_v4(),
            text: draft.text.clone(),
            category: draft.category,
            priority: draft.priority,
            completed: false,
            created_at: Stamp::formatted_now(now, tz),
            due_date: draft.due.map(DueDate::Local),
            tags: parse_tags(&draft.tags),
        };
        let id = task.id;

        self.active.insert(0, task);
        info!(%id, active = self.active.len(), "task created");
        Ok(id)
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    pub fn toggle(&mut self, id: Uuid) -> bool {
        let Some(task) = self.active.iter_mut().find(|t| t.id == id) else {
            debug!("toggle target not active");
            return false;
        };
        task.completed = !task.completed;
        debug!(completed = task.completed, "toggled completion");
        true
    }

    #[tracing::instrument(skip(self, now, tz), fields(id = %id))]
    pub fn remove(&mut self, id: Uuid, now: DateTime<Utc>, tz: Tz) -> bool {
        let Some(idx) = self.active.iter().position(|t| t.id == id) else {
            debug!("remove target not active");
            return false;
        };

        let task = self.active.remove(idx);
        self.trashed.push(TrashedTask {
            task,
            removed_at: Stamp::formatted_now(now, tz),
        });
        info!(trashed = self.trashed.len(), "task moved to trash");
        true
    }

    #[tracing::instrument(skip(self), fields(id = %id))]
    pub fn recover(&mut self, id: Uuid) -> bool {
        let Some(idx) = self.trashed.iter().position(|t| t.task.id == id) else {
            debug!("recover target not in trash");
            return false;
        };

        let TrashedTask { task, .. } = self.trashed.remove(idx);
        self.active.insert(0, task);
        info!(active = self.active.len(), "task recovered");
        true
    }

    #[tracing::instrument(skip(self))]
    pub fn clear(&mut self) {
        info!(
            active = self.active.len(),
            trashed = self.trashed.len(),
            "clearing all tasks"
        );
        self.active.clear();
        self.trashed.clear();
    }

    /// Case-insensitive text search combined with the filter selector.
    pub fn filtered(&self, filter: FilterKind, query: &str) -> Vec<&Task> {
        let needle = query.to_lowercase();
        self.active
            .iter()
            .filter(|t| t.text.to_lowercase().contains(&needle) && filter.matches(t))
            .collect()
    }

    pub fn stats(&self) -> TaskStats {
        let total = self.active.len();
        let completed = self.active.iter().filter(|t| t.completed).count();
        let urgent = self
            .active
            .iter()
            .filter(|t| t.priority == Priority::Urgent)
            .count();
        TaskStats {
            total,
            completed,
            pending: total - completed,
            urgent,
        }
    }

    /// Looks a task up by a unique prefix of its id, in either set.
    pub fn resolve_id(&self, prefix: &str) -> anyhow::Result<IdMatch> {
        let needle = prefix.trim().to_ascii_lowercase().replace('-', "");
        if needle.is_empty() {
            anyhow::bail!("task id is required");
        }

        let mut hits = self
            .active
            .iter()
            .map(|t| IdMatch::Active(t.id))
            .chain(self.trashed.iter().map(|t| IdMatch::Trashed(t.task.id)))
            .filter(|hit| {
                let id = match hit {
                    IdMatch::Active(id) | IdMatch::Trashed(id) => id,
                };
                id.simple().to_string().starts_with(&needle)
            });

        let first = hits
            .next()
            .ok_or_else(|| anyhow::anyhow!("no task matches id {prefix}"))?;
        if hits.next().is_some() {
            anyhow::bail!("id {prefix} is ambiguous");
        }
        Ok(first)
    }
}
