use std::io::{self, IsTerminal, Write};

use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::format::to_persian_digits;
use crate::manager::{TaskView, TrashView};
use crate::picker::MonthGrid;
use crate::store::TaskStats;
use crate::task::{FilterKind, Priority, Theme};

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            color: cfg.color()? && io::stdout().is_terminal(),
        })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip(self, out, views))]
    pub fn print_tasks<W: Write>(
        &self,
        out: &mut W,
        filter: FilterKind,
        views: &[TaskView],
    ) -> anyhow::Result<()> {
        writeln!(
            out,
            "کارهای شما ({}) · {}",
            to_persian_digits(views.len()),
            filter.label()
        )?;

        if views.is_empty() {
            writeln!(out, "هیچ کاری یافت نشد")?;
            writeln!(out, "کار جدیدی اضافه کنید")?;
            return Ok(());
        }

        let headers = vec![
            "ID".to_string(),
            String::new(),
            "کار".to_string(),
            "دسته‌بندی".to_string(),
            "اولویت".to_string(),
            "برچسب‌ها".to_string(),
            "مهلت".to_string(),
            "باقی‌مانده".to_string(),
            "ایجاد".to_string(),
        ];

        let mut rows = Vec::with_capacity(views.len());
        for view in views {
            let check = if view.completed { "[x]" } else { "[ ]" };
            let text = if view.completed {
                self.paint(&view.text, "9")
            } else {
                view.text.clone()
            };
            let priority = if view.priority.key == Priority::Urgent.key() {
                self.paint(view.priority.label, "31")
            } else {
                view.priority.label.to_string()
            };
            let tags = view
                .tags
                .iter()
                .map(|tag| format!("#{tag}"))
                .collect::<Vec<_>>()
                .join(" ");

            rows.push(vec![
                self.paint(&view.short_id, "33"),
                check.to_string(),
                text,
                view.category.label.to_string(),
                priority,
                tags,
                view.due.clone().unwrap_or_default(),
                self.paint(&view.remaining, view.severity.ansi()),
                view.created.clone(),
            ]);
        }

        write_table(out, headers, rows)
    }

    #[tracing::instrument(skip(self, out, views))]
    pub fn print_trash<W: Write>(&self, out: &mut W, views: &[TrashView]) -> anyhow::Result<()> {
        writeln!(out, "سطل بازیافت ({})", to_persian_digits(views.len()))?;
        if views.is_empty() {
            writeln!(out, "سطل بازیافت خالی است")?;
            return Ok(());
        }

        let headers = vec![
            "ID".to_string(),
            "کار".to_string(),
            "دسته‌بندی".to_string(),
            "حذف شده".to_string(),
        ];
        let rows = views
            .iter()
            .map(|view| {
                vec![
                    self.paint(&view.short_id, "33"),
                    view.text.clone(),
                    view.category.label.to_string(),
                    view.removed.clone(),
                ]
            })
            .collect();

        write_table(out, headers, rows)
    }

    pub fn print_stats<W: Write>(&self, out: &mut W, stats: &TaskStats) -> anyhow::Result<()> {
        let rows = [
            ("کل کارها", stats.total),
            ("انجام شده", stats.completed),
            ("در انتظار", stats.pending),
            ("فوری", stats.urgent),
        ];
        for (label, count) in rows {
            writeln!(out, "{:>4}  {label}", to_persian_digits(count))?;
        }
        Ok(())
    }

    pub fn print_grid<W: Write>(&self, out: &mut W, grid: &MonthGrid) -> anyhow::Result<()> {
        writeln!(out, "{}", grid.title)?;
        let header = grid
            .weekdays
            .iter()
            .map(|day| pad_left(day, 4))
            .collect::<String>();
        writeln!(out, "{header}")?;

        for week in grid.weeks() {
            let mut line = String::new();
            for cell in week {
                let Some(cell) = cell else {
                    line.push_str(&pad_left("", 4));
                    continue;
                };
                let (text, code) = if cell.is_selected {
                    (format!("<{}>", cell.label), "7")
                } else if cell.is_today {
                    (format!("[{}]", cell.label), "1;33")
                } else {
                    (cell.label.clone(), "")
                };
                let padded = pad_left(&text, 4);
                if code.is_empty() {
                    line.push_str(&padded);
                } else {
                    line.push_str(&self.paint(&padded, code));
                }
            }
            writeln!(out, "{}", line.trim_end())?;
        }
        Ok(())
    }

    pub fn print_theme<W: Write>(&self, out: &mut W, theme: Theme) -> anyhow::Result<()> {
        let label = match theme {
            Theme::Dark => "تیره",
            Theme::Light => "روشن",
        };
        writeln!(out, "پوسته: {label}")?;
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || text.is_empty() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn pad_left(text: &str, width: usize) -> String {
    let visible = UnicodeWidthStr::width(text);
    format!("{}{}", " ".repeat(width.saturating_sub(visible)), text)
}

fn write_table<W: Write>(
    writer: &mut W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    let mut line = String::new();
    for (idx, header) in headers.iter().enumerate() {
        let padding = widths[idx].saturating_sub(UnicodeWidthStr::width(header.as_str()));
        line.push_str(&format!("{}{} ", header, " ".repeat(padding)));
    }
    writeln!(writer, "{}", line.trim_end())?;

    let rule = widths
        .iter()
        .map(|width| "-".repeat(*width))
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(writer, "{rule}")?;

    for row in rows {
        let mut line = String::new();
        for (idx, cell) in row.iter().enumerate() {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            line.push_str(&format!("{}{} ", cell, " ".repeat(padding)));
        }
        writeln!(writer, "{}", line.trim_end())?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
