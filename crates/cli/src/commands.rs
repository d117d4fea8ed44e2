use std::fmt;
use std::io::Write;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate};

use crate::cli::{AddArgs, CliCommand, EditArgs, ListArgs, TaskRef};
use crate::config::AppConfig;
use crate::core::error::TaskError;
use crate::core::form::TaskForm;
use crate::core::notify::LogNotifier;
use crate::core::store::open_store;
use crate::core::TaskListController;
use crate::model::{Task, TaskPatch, TaskStats};

pub fn execute<W: Write>(config: &AppConfig, command: CliCommand, writer: W) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    runtime.block_on(run(config, command, writer))
}

async fn run<W: Write>(config: &AppConfig, command: CliCommand, mut writer: W) -> Result<()> {
    tracing::debug!(?command, data_dir = %config.data_dir().display(), "running command");
    let store = open_store(config)?;
    let mut controller = TaskListController::new(store, Arc::new(LogNotifier));
    controller
        .load()
        .await
        .context("failed to load tasks")?;

    match command {
        CliCommand::List(args) => handle_list(&mut controller, &args, &mut writer),
        CliCommand::Add(args) => handle_add(&mut controller, &args, &mut writer).await,
        CliCommand::Edit(args) => handle_edit(&mut controller, &args, &mut writer).await,
        CliCommand::Done(task) => handle_completion(&mut controller, task, true, &mut writer).await,
        CliCommand::Reopen(task) => {
            handle_completion(&mut controller, task, false, &mut writer).await
        }
        CliCommand::Delete(task) => handle_delete(&mut controller, task, &mut writer).await,
        CliCommand::Show(task) => handle_show(&controller, task, &mut writer),
        CliCommand::Stats => {
            StatsReport(controller.stats()).write_to(&mut writer)?;
            Ok(())
        }
    }
}

fn handle_list<W: Write>(
    controller: &mut TaskListController,
    args: &ListArgs,
    mut writer: W,
) -> Result<()> {
    controller.set_query(args.search.clone().unwrap_or_default());
    controller.set_status(args.status.unwrap_or_default());
    controller.set_sort(args.sort.unwrap_or_default());

    writeln!(writer, "{}", StatsLine(controller.stats()))?;
    if controller.is_empty() {
        writeln!(writer, "No tasks yet. Add one with `taskflow add <TITLE>`.")?;
        return Ok(());
    }
    if !controller.has_filtered_results() {
        writeln!(writer, "No tasks found")?;
        return Ok(());
    }

    let today = Local::now().date_naive();
    for task in controller.visible() {
        writeln!(writer, "{}", TaskRow { task: &task, today })?;
    }
    Ok(())
}

async fn handle_add<W: Write>(
    controller: &mut TaskListController,
    args: &AddArgs,
    mut writer: W,
) -> Result<()> {
    controller.open_create();
    let task = submit(controller, TaskForm::from(args), &mut writer).await?;
    writeln!(writer, "Created task #{}: {}", task.id, task.title)?;
    Ok(())
}

async fn handle_edit<W: Write>(
    controller: &mut TaskListController,
    args: &EditArgs,
    mut writer: W,
) -> Result<()> {
    if args.is_empty() {
        return Err(anyhow!("nothing to change: pass at least one field flag"));
    }
    let mut form = controller.open_edit(args.id)?.form.clone();
    args.apply_to(&mut form);
    let task = submit(controller, form, &mut writer).await?;
    writeln!(writer, "Updated task #{}: {}", task.id, task.title)?;
    Ok(())
}

async fn submit<W: Write>(
    controller: &mut TaskListController,
    form: TaskForm,
    mut writer: W,
) -> Result<Task> {
    match controller.submit(form).await {
        Ok(task) => Ok(task),
        Err(TaskError::Validation(errors)) => {
            for error in errors.errors() {
                writeln!(writer, "  {}: {}", error.field, error.message)?;
            }
            Err(anyhow!("task was not saved"))
        }
        Err(err) => Err(err.into()),
    }
}

async fn handle_completion<W: Write>(
    controller: &mut TaskListController,
    target: TaskRef,
    completed: bool,
    mut writer: W,
) -> Result<()> {
    let task = controller
        .update(target.id, TaskPatch::completion(completed))
        .await?;
    let verb = if completed { "Completed" } else { "Reopened" };
    writeln!(writer, "{} task #{}: {}", verb, task.id, task.title)?;
    Ok(())
}

async fn handle_delete<W: Write>(
    controller: &mut TaskListController,
    target: TaskRef,
    mut writer: W,
) -> Result<()> {
    let removed = controller.delete(target.id).await?;
    writeln!(writer, "Deleted task #{}: {}", removed.id, removed.title)?;
    Ok(())
}

fn handle_show<W: Write>(
    controller: &TaskListController,
    target: TaskRef,
    mut writer: W,
) -> Result<()> {
    let task = controller
        .tasks()
        .iter()
        .find(|task| task.id == target.id)
        .ok_or(TaskError::NotFound(target.id))?;

    writeln!(writer, "#{} {}", task.id, task.title)?;
    if !task.description.is_empty() {
        writeln!(writer, "  {}", task.description)?;
    }
    writeln!(writer, "  priority:  {}", task.priority)?;
    match task.due_date {
        Some(due) => writeln!(writer, "  due:       {}", due)?,
        None => writeln!(writer, "  due:       -")?,
    }
    writeln!(writer, "  created:   {}", task.created_at.format("%Y-%m-%d %H:%M"))?;
    match task.completed_at {
        Some(at) => writeln!(writer, "  completed: {}", at.format("%Y-%m-%d %H:%M"))?,
        None => writeln!(writer, "  completed: no")?,
    }
    Ok(())
}

struct StatsLine(TaskStats);

impl fmt::Display for StatsLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = &self.0;
        write!(
            f,
            "{} task{}, {} completed, {} active ({:.0}% done)",
            stats.total,
            if stats.total == 1 { "" } else { "s" },
            stats.completed,
            stats.active,
            stats.progress()
        )
    }
}

struct StatsReport(TaskStats);

impl StatsReport {
    fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writeln!(writer, "Total:     {}", self.0.total)?;
        writeln!(writer, "Completed: {}", self.0.completed)?;
        writeln!(writer, "Active:    {}", self.0.active)?;
        writeln!(writer, "Progress:  {:.0}%", self.0.progress())?;
        Ok(())
    }
}

struct TaskRow<'a> {
    task: &'a Task,
    today: NaiveDate,
}

impl fmt::Display for TaskRow<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let task = self.task;
        let mark = if task.completed { "x" } else { " " };
        write!(f, "[{}] #{:<4} {} ({})", mark, task.id, task.title, task.priority)?;
        if let Some(due) = task.due_date {
            write!(f, " due {}", due)?;
            if task.is_overdue(self.today) {
                write!(f, " OVERDUE")?;
            }
        }
        Ok(())
    }
}
