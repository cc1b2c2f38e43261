mod cli;
mod ui;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use seqtask::{Job, JobExecutionError, Logger, RunnerConfig, Task};
use ui::JobProgress;

struct DemoOptions {
    tasks: u32,
    fail_at: Option<u32>,
    stop_after: Option<u32>,
    silent: bool,
    name: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => RunnerConfig::load_from(path)?,
        None => RunnerConfig::load()?,
    };
    if cli.verbose {
        config.log_filter = "debug".to_string();
    }
    init_tracing(&config.log_filter);

    match cli.command {
        Command::Demo {
            tasks,
            fail_at,
            stop_after,
            silent,
            name,
        } => {
            let options = DemoOptions {
                tasks,
                fail_at,
                stop_after,
                silent,
                name,
            };
            run_demo(config, options).await?;
        }
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_demo(config: RunnerConfig, options: DemoOptions) -> Result<()> {
    let mut params = config.job;
    if options.name.is_some() {
        params.name = options.name;
    }
    params.name.get_or_insert_with(|| "demo".to_string());
    params.logger = Logger::styled();

    let mut job: Job<u64> = Job::new(params);
    let progress = JobProgress::new();
    progress.attach(&mut job);

    let stop = job.stop_handle();
    for index in 1..=options.tasks {
        let fails = options.fail_at == Some(index);
        let stop_here = (options.stop_after == Some(index)).then(|| stop.clone());
        let task = Task::new(move |(step,): (u64,)| {
            let stop_here = stop_here.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(40 * step)).await;
                if let Some(stop) = stop_here {
                    stop.stop();
                }
                if fails {
                    return Err(JobExecutionError::new(format!("step {step} failed")));
                }
                Ok(step * step)
            }
        })
        .named(format!("step-{index}"))
        .silent(options.silent);
        job.add_task(task, (u64::from(index),));
    }

    job.run().await?;
    progress.print_summary(&job.snapshot(), job.results(), &job.errors());
    Ok(())
}
