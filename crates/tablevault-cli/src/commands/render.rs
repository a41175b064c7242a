use std::path::Path;

use anyhow::bail;
use serde_json::{Value, json};

use tablevault_scheduler::{JobDefinition, Scheduler};
use tablevault_wire::{to_wire_objects, to_wire_parameters, to_wire_values};

use super::{load_config, load_tables};

pub fn render(tables_path: &Path, config_path: Option<&Path>, job: usize) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let tables = load_tables(tables_path)?;

    let scheduler = Scheduler::new(tables, &config);
    let jobs = scheduler.build_job_definitions()?;

    let Some(definition) = jobs.get(job) else {
        bail!("job index {job} out of range, the plan has {} job(s)", jobs.len());
    };

    println!("{}", serde_json::to_string_pretty(&wire_json(definition)?)?);
    Ok(())
}

/// One job's definition in the flat wire format the execution service takes.
pub fn wire_json(job: &JobDefinition) -> anyhow::Result<Value> {
    Ok(json!({
        "objects": to_wire_objects(&job.definition)?,
        "parameters": to_wire_parameters(&job.definition)?,
        "values": to_wire_values(&job.definition)?,
    }))
}
