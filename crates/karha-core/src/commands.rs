use std::io::{self, Write};

use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::cli::Invocation;
use crate::config::Config;
use crate::datetime::{DateExpr, local_today, parse_date_expr};
use crate::manager::{Prompter, TaskManager};
use crate::persist::KeyValueStore;
use crate::picker::{DatePicker, PickerEvent, display_label};
use crate::render::Renderer;
use crate::store::IdMatch;
use crate::task::{Category, FilterKind, Priority};

const NO_DUE_LABEL: &str = "بدون مهلت";

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "add", "list", "done", "delete", "recover", "trash", "stats", "clear", "theme", "calendar",
        "help", "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(manager, cfg, renderer, inv, now))]
pub fn dispatch<S, P>(
    manager: &mut TaskManager<S, P>,
    cfg: &Config,
    renderer: &Renderer,
    inv: Invocation,
    now: DateTime<Utc>,
) -> anyhow::Result<()>
where
    S: KeyValueStore,
    P: Prompter,
{
    let command = inv.command.as_str();
    let args = inv.command_args.as_slice();
    let mut out = io::stdout().lock();

    debug!(command, args = ?args, "dispatching command");

    match command {
        "add" => cmd_add(manager, &mut out, args, now),
        "list" => cmd_list(manager, cfg, renderer, &mut out, args, now),
        "done" => cmd_done(manager, &mut out, args),
        "delete" => cmd_delete(manager, &mut out, args, now),
        "recover" => cmd_recover(manager, &mut out, args),
        "trash" => renderer.print_trash(&mut out, &manager.trash_views(now)),
        "stats" => renderer.print_stats(&mut out, &manager.stats()),
        "clear" => cmd_clear(manager),
        "theme" => cmd_theme(manager, renderer, &mut out, args),
        "calendar" => cmd_calendar(manager, renderer, &mut out, args, now),
        "help" => cmd_help(&mut out),
        "version" => {
            writeln!(out, "{}", env!("CARGO_PKG_VERSION"))?;
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mod {
    Category(Category),
    Priority(Priority),
    Due(DateExpr),
    Tags(String),
}

fn parse_one_mod(tok: &str, now: DateTime<Utc>, tz: chrono_tz::Tz) -> anyhow::Result<Option<Mod>> {
    if let Some(tag) = tok.strip_prefix('+')
        && !tag.is_empty()
    {
        return Ok(Some(Mod::Tags(tag.to_string())));
    }

    let Some((key, value)) = tok.split_once(':') else {
        return Ok(None);
    };

    match key.to_ascii_lowercase().as_str() {
        "cat" | "category" => Ok(Some(Mod::Category(value.parse()?))),
        "pri" | "priority" => Ok(Some(Mod::Priority(value.parse()?))),
        "due" => Ok(Some(Mod::Due(parse_date_expr(value, now, tz)?))),
        "tag" | "tags" => Ok(Some(Mod::Tags(value.to_string()))),
        _ => Ok(None),
    }
}

/// Splits `add` arguments into task text and modifiers. Everything after a
/// bare `--` is text.
fn parse_text_and_mods(
    args: &[String],
    now: DateTime<Utc>,
    tz: chrono_tz::Tz,
) -> anyhow::Result<(String, Vec<Mod>)> {
    let mut text_parts = Vec::new();
    let mut mods = Vec::new();

    let mut literal = false;
    for arg in args {
        if arg == "--" && !literal {
            literal = true;
            continue;
        }

        if !literal && let Some(one_mod) = parse_one_mod(arg, now, tz)? {
            mods.push(one_mod);
            continue;
        }

        text_parts.push(arg.clone());
    }

    Ok((text_parts.join(" "), mods))
}

#[instrument(skip(manager, out, args, now))]
fn cmd_add<S, P, W>(
    manager: &mut TaskManager<S, P>,
    out: &mut W,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()>
where
    S: KeyValueStore,
    P: Prompter,
    W: Write,
{
    info!("command add");

    let (text, mods) = parse_text_and_mods(args, now, manager.tz())?;
    let mut tags = Vec::new();
    manager.draft_mut().text = text;

    for one_mod in mods {
        match one_mod {
            Mod::Category(category) => manager.draft_mut().category = category,
            Mod::Priority(priority) => manager.draft_mut().priority = priority,
            Mod::Tags(raw) => tags.push(raw),
            Mod::Due(DateExpr::Jalaali(day)) => {
                let gregorian = day
                    .to_gregorian()
                    .ok_or_else(|| anyhow!("due date out of range"))?;
                let picker = manager.picker_mut();
                picker.show(gregorian);
                picker.open();
                let event = picker
                    .select_day(day.day)
                    .ok_or_else(|| anyhow!("day {} not in month", day.day))?;
                manager.apply_picker_event(event);
            }
            Mod::Due(DateExpr::Local(at)) => {
                manager.apply_picker_event(PickerEvent::Selected(at));
            }
        }
    }
    manager.draft_mut().tags = tags.join(",");
    let due_label = display_label(manager.draft().due, NO_DUE_LABEL);

    if let Some(id) = manager.add_task(now)? {
        let short = manager
            .tasks()
            .find_active(id)
            .map(|task| task.short_id())
            .unwrap_or_default();
        writeln!(out, "کار {short} اضافه شد. مهلت: {due_label}")?;
    }
    Ok(())
}

#[instrument(skip(manager, cfg, renderer, out, args, now))]
fn cmd_list<S, P, W>(
    manager: &mut TaskManager<S, P>,
    cfg: &Config,
    renderer: &Renderer,
    out: &mut W,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()>
where
    S: KeyValueStore,
    P: Prompter,
    W: Write,
{
    let mut filter = cfg.default_filter()?;
    let mut search = Vec::new();

    for arg in args {
        if let Some(value) = arg.strip_prefix("filter:") {
            filter = value.parse()?;
        } else if let Some(value) = arg.strip_prefix("search:") {
            search.push(value.to_string());
        } else if let Ok(bare) = arg.parse::<FilterKind>() {
            filter = bare;
        } else {
            search.push(arg.clone());
        }
    }

    manager.set_filter(filter);
    manager.set_search(search.join(" "));
    debug!(filter = filter.key(), search = %manager.search(), "listing tasks");

    renderer.print_tasks(out, filter, &manager.task_views(now))
}

fn single_id(args: &[String], command: &str) -> anyhow::Result<String> {
    match args {
        [id] => Ok(id.clone()),
        [] => Err(anyhow!("{command}: task id is required")),
        _ => Err(anyhow!("{command}: expected exactly one task id")),
    }
}

fn active_id<S, P>(manager: &TaskManager<S, P>, args: &[String], command: &str) -> anyhow::Result<Uuid>
where
    S: KeyValueStore,
    P: Prompter,
{
    let prefix = single_id(args, command)?;
    match manager.resolve_id(&prefix)? {
        IdMatch::Active(id) => Ok(id),
        IdMatch::Trashed(_) => Err(anyhow!("{command}: task {prefix} is in the trash")),
    }
}

#[instrument(skip(manager, out, args))]
fn cmd_done<S, P, W>(manager: &mut TaskManager<S, P>, out: &mut W, args: &[String]) -> anyhow::Result<()>
where
    S: KeyValueStore,
    P: Prompter,
    W: Write,
{
    let id = active_id(manager, args, "done")?;
    manager.toggle_task(id)?;

    let completed = manager
        .tasks()
        .find_active(id)
        .is_some_and(|task| task.completed);
    if completed {
        writeln!(out, "انجام شد.")?;
    } else {
        writeln!(out, "به در انتظار برگشت.")?;
    }
    Ok(())
}

#[instrument(skip(manager, out, args, now))]
fn cmd_delete<S, P, W>(
    manager: &mut TaskManager<S, P>,
    out: &mut W,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()>
where
    S: KeyValueStore,
    P: Prompter,
    W: Write,
{
    let id = active_id(manager, args, "delete")?;
    if manager.remove_task(id, now)? {
        writeln!(out, "به سطل بازیافت منتقل شد.")?;
    }
    Ok(())
}

#[instrument(skip(manager, out, args))]
fn cmd_recover<S, P, W>(manager: &mut TaskManager<S, P>, out: &mut W, args: &[String]) -> anyhow::Result<()>
where
    S: KeyValueStore,
    P: Prompter,
    W: Write,
{
    let prefix = single_id(args, "recover")?;
    let id = match manager.resolve_id(&prefix)? {
        IdMatch::Trashed(id) => id,
        IdMatch::Active(_) => return Err(anyhow!("recover: task {prefix} is not in the trash")),
    };
    let text = manager
        .tasks()
        .find_trashed(id)
        .map(|trashed| trashed.task.text.clone())
        .unwrap_or_default();

    if manager.recover_task(id)? {
        writeln!(out, "«{text}» بازیابی شد.")?;
    }
    Ok(())
}

#[instrument(skip(manager))]
fn cmd_clear<S, P>(manager: &mut TaskManager<S, P>) -> anyhow::Result<()>
where
    S: KeyValueStore,
    P: Prompter,
{
    if !manager.clear_all()? {
        info!("clear cancelled");
    }
    Ok(())
}

fn cmd_theme<S, P, W>(
    manager: &mut TaskManager<S, P>,
    renderer: &Renderer,
    out: &mut W,
    args: &[String],
) -> anyhow::Result<()>
where
    S: KeyValueStore,
    P: Prompter,
    W: Write,
{
    match args {
        [] => renderer.print_theme(out, manager.theme()),
        [arg] if arg == "toggle" => {
            let theme = manager.toggle_theme()?;
            renderer.print_theme(out, theme)
        }
        _ => Err(anyhow!("theme: expected no argument or `toggle`")),
    }
}

/// Renders the picker grid; `next`/`prev` (or `+N`/`-N`) move the month.
/// The picker is open while the grid is on screen.
fn cmd_calendar<S, P, W>(
    manager: &mut TaskManager<S, P>,
    renderer: &Renderer,
    out: &mut W,
    args: &[String],
    now: DateTime<Utc>,
) -> anyhow::Result<()>
where
    S: KeyValueStore,
    P: Prompter,
    W: Write,
{
    let picker = manager.picker_mut();
    picker.open();
    let stepped = step_calendar(picker, args);
    if stepped.is_err() {
        picker.close();
    }
    stepped?;

    let today = local_today(now, manager.tz());
    let grid = manager.due_grid(today);
    if grid.days.is_empty() {
        warn!("calendar grid is empty");
    }
    renderer.print_grid(out, &grid)?;

    manager.picker_mut().close();
    Ok(())
}

fn step_calendar(picker: &mut DatePicker, args: &[String]) -> anyhow::Result<()> {
    for arg in args {
        match arg.as_str() {
            "next" | "n" => picker.next_month(),
            "prev" | "p" => picker.prev_month(),
            other => {
                let steps: i32 = other
                    .parse()
                    .with_context(|| format!("calendar: expected next, prev or a number, got {other}"))?;
                if !picker.shift_months(steps) {
                    return Err(anyhow!("calendar: {steps} months is outside the calendar range"));
                }
            }
        }
    }
    Ok(())
}

fn cmd_help<W: Write>(out: &mut W) -> anyhow::Result<()> {
    let lines = [
        "karha add <text> [category:<c>] [priority:<p>] [due:<date>] [tags:<a,b>] [+tag]",
        "karha list [filter:<all|completed|pending|urgent>] [search:<text>]",
        "karha done <id>        toggle completion",
        "karha delete <id>      move to the trash",
        "karha recover <id>     restore from the trash",
        "karha trash            show the trash",
        "karha stats            task counts",
        "karha clear            erase every task (asks first, --yes skips)",
        "karha theme [toggle]",
        "karha calendar [next|prev|<n>]...",
        "",
        "dates: 1403-01-15 (Jalaali), 2024-04-03[T09:00], today, tomorrow",
    ];
    for line in lines {
        writeln!(out, "{line}")?;
    }
    Ok(())
}
