//! Terminal output for the demo job: colored per-step lines and a JSON summary.

use console::Style;
use seqtask::{Job, JobExecutionError, JobHook, JobSnapshot, TaskSnapshot};

/// Prints one line per step as the job runs: green for success, red for
/// failure, yellow for errors reported by the job.
pub struct JobProgress {
    green: Style,
    red: Style,
    yellow: Style,
    dim: Style,
}

impl JobProgress {
    pub fn new() -> Self {
        Self {
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            dim: Style::new().dim(),
        }
    }

    /// Register the printing hooks on `job`.
    pub fn attach(&self, job: &mut Job<u64>) {
        let dim = self.dim.clone();
        job.add_hook(JobHook::before_each(move |task: TaskSnapshot| {
            println!("  {} {}", dim.apply_to("→"), step_name(&task));
            async {}
        }));

        let (green, red) = (self.green.clone(), self.red.clone());
        job.add_hook(JobHook::after_each(move |task: TaskSnapshot| {
            if task.has_result {
                println!("  {} {}", green.apply_to("✓"), step_name(&task));
            } else {
                println!("  {} {}", red.apply_to("✗"), step_name(&task));
            }
            async {}
        }));

        let yellow = self.yellow.clone();
        job.add_hook(JobHook::on_error(move |err: JobExecutionError| {
            println!("    {} {err}", yellow.apply_to("!"));
            async {}
        }));
    }

    /// Print the job snapshot, results and errors as pretty JSON.
    pub fn print_summary(&self, snapshot: &JobSnapshot, results: &[u64], errors: &[JobExecutionError]) {
        let style = if errors.is_empty() { &self.green } else { &self.red };
        let summary = serde_json::json!({
            "job": snapshot,
            "results": results,
            "errors": errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
        });
        println!();
        println!("{}", style.apply_to("─── Job Summary ───"));
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).unwrap_or_default()
        );
    }
}

fn step_name(task: &TaskSnapshot) -> &str {
    task.name.as_deref().unwrap_or("anonymous")
}
