use std::path::Path;

use tablevault_scheduler::Scheduler;

use super::{load_config, load_tables};
use crate::commands::render::wire_json;

pub fn plan(tables_path: &Path, config_path: Option<&Path>, wire: bool) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let tables = load_tables(tables_path)?;

    let scheduler = Scheduler::new(tables, &config);
    let jobs = scheduler.build_job_definitions()?;

    if jobs.is_empty() {
        println!("Nothing to back up.");
        return Ok(());
    }

    for (index, job) in jobs.iter().enumerate() {
        println!(
            "Job {index}: {} tables, ~{:.0} min, {:.1} MB",
            job.tables.len(),
            job.estimated_duration_secs / 60.0,
            job.total_size_bytes as f64 / 1_048_576.0,
        );
        for table in &job.tables {
            println!("  {table}");
        }
        if wire {
            println!("{}", serde_json::to_string_pretty(&wire_json(job)?)?);
        }
    }
    Ok(())
}
