//! Task list commands for CLI.

use clap::Subcommand;
use pomotask_core::{Database, Task, TaskFilter};

use crate::render::format_duration;

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a new task
    Add {
        /// Task title
        title: String,
    },
    /// List tasks
    List {
        /// Only tasks that are not done
        #[arg(long, conflicts_with = "completed")]
        pending: bool,
        /// Only tasks that are done
        #[arg(long)]
        completed: bool,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show one task as JSON
    Show {
        /// Task ID
        id: i64,
    },
    /// Mark a task as done without running a session
    Done {
        /// Task ID
        id: i64,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: i64,
    },
}

fn print_table(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("No tasks.");
        return;
    }
    println!("{:>4}  {:<9}  {:>4}  {:>9}  TITLE", "ID", "STATUS", "POMS", "TIME");
    for task in tasks {
        println!(
            "{:>4}  {:<9}  {:>4}  {:>9}  {}",
            task.id(),
            task.status(),
            task.pomodoros_completed(),
            format_duration(task.tracked_time()),
            task.title()
        );
    }
}

pub fn run(action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        TaskAction::Add { title } => {
            let task = db.add_task(&title)?;
            println!("Task created: {}", task.id());
        }
        TaskAction::List {
            pending,
            completed,
            json,
        } => {
            let filter = if pending {
                TaskFilter::Pending
            } else if completed {
                TaskFilter::Completed
            } else {
                TaskFilter::All
            };
            let tasks = db.list_tasks(filter)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&tasks)?);
            } else {
                print_table(&tasks);
            }
        }
        TaskAction::Show { id } => {
            let task = db.require_task(id)?;
            println!("{}", serde_json::to_string_pretty(&task)?);
        }
        TaskAction::Done { id } => {
            let mut task = db.require_task(id)?;
            task.mark_complete();
            db.save_task(&task)?;
            println!("Task completed: {id}");
        }
        TaskAction::Delete { id } => {
            db.delete_task(id)?;
            println!("Task deleted: {id}");
        }
    }
    Ok(())
}
