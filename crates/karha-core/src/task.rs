use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::format::{DueDate, Stamp, due_serde};

/// Label, colour and icon shared by every view of an enumerated field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Meta {
    pub key: &'static str,
    pub label: &'static str,
    pub color: &'static str,
    pub icon: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Personal,
    Work,
    Study,
    Shopping,
    Health,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Personal,
        Category::Work,
        Category::Study,
        Category::Shopping,
        Category::Health,
    ];

    pub fn meta(self) -> Meta {
        match self {
            Category::Personal => Meta {
                key: "personal",
                label: "شخصی",
                color: "#8b5cf6",
                icon: "user",
            },
            Category::Work => Meta {
                key: "work",
                label: "کاری",
                color: "#06b6d4",
                icon: "briefcase",
            },
            Category::Study => Meta {
                key: "study",
                label: "تحصیلی",
                color: "#10b981",
                icon: "graduation-cap",
            },
            Category::Shopping => Meta {
                key: "shopping",
                label: "خرید",
                color: "#f59e0b",
                icon: "shopping-cart",
            },
            Category::Health => Meta {
                key: "health",
                label: "سلامتی",
                color: "#ec4899",
                icon: "heart",
            },
        }
    }

    pub fn label(self) -> &'static str {
        self.meta().label
    }

    pub fn color(self) -> &'static str {
        self.meta().color
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Urgent,
    ];

    pub fn meta(self) -> Meta {
        match self {
            Priority::Low => Meta {
                key: "low",
                label: "کم",
                color: "#10b981",
                icon: "flag",
            },
            Priority::Medium => Meta {
                key: "medium",
                label: "متوسط",
                color: "#f59e0b",
                icon: "star",
            },
            Priority::High => Meta {
                key: "high",
                label: "بالا",
                color: "#ef4444",
                icon: "exclamation-triangle",
            },
            Priority::Urgent => Meta {
                key: "urgent",
                label: "فوری",
                color: "#dc2626",
                icon: "times",
            },
        }
    }

    pub fn label(self) -> &'static str {
        self.meta().label
    }

    pub fn color(self) -> &'static str {
        self.meta().color
    }
}

/// Which active tasks the list shows.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    #[default]
    All,
    Completed,
    Pending,
    Urgent,
}

impl FilterKind {
    pub const ALL: [FilterKind; 4] = [
        FilterKind::All,
        FilterKind::Completed,
        FilterKind::Pending,
        FilterKind::Urgent,
    ];

    pub fn key(self) -> &'static str {
        match self {
            FilterKind::All => "all",
            FilterKind::Completed => "completed",
            FilterKind::Pending => "pending",
            FilterKind::Urgent => "urgent",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FilterKind::All => "همه",
            FilterKind::Completed => "انجام شده",
            FilterKind::Pending => "در انتظار",
            FilterKind::Urgent => "فوری",
        }
    }

    pub fn matches(self, task: &Task) -> bool {
        match self {
            FilterKind::All => true,
            FilterKind::Completed => task.completed,
            FilterKind::Pending => !task.completed,
            FilterKind::Urgent => task.priority == Priority::Urgent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn from_is_dark(is_dark: bool) -> Self {
        if is_dark { Theme::Dark } else { Theme::Light }
    }

    pub fn is_dark(self) -> bool {
        self == Theme::Dark
    }

    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

macro_rules! keyed_enum_text {
    ($ty:ident, $what:literal) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $ty {
            type Err = anyhow::Error;

            /// Accepts the machine key (any case) or the Persian label.
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let needle = s.trim();
                $ty::ALL
                    .into_iter()
                    .find(|v| {
                        v.key().eq_ignore_ascii_case(needle) || v.label() == needle
                    })
                    .ok_or_else(|| anyhow!(concat!("unknown ", $what, ": {}"), needle))
            }
        }
    };
}

impl Category {
    pub fn key(self) -> &'static str {
        self.meta().key
    }
}

impl Priority {
    pub fn key(self) -> &'static str {
        self.meta().key
    }
}

keyed_enum_text!(Category, "category");
keyed_enum_text!(Priority, "priority");
keyed_enum_text!(FilterKind, "filter");

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,

    pub text: String,

    #[serde(default)]
    pub category: Category,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub completed: bool,

    pub created_at: Stamp,

    #[serde(default, with = "due_serde")]
    pub due_date: Option<DueDate>,

    #[serde(default)]
    pub tags: Vec<String>,
}

impl Task {
    pub fn short_id(&self) -> String {
        self.id.simple().to_string()[..8].to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrashedTask {
    #[serde(flatten)]
    pub task: Task,

    pub removed_at: Stamp,
}

/// Comma-separated tags, trimmed, empties dropped, order kept.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}
