use anyhow::{bail, Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use common::log_setup::setup_logging;
use rect_partition::prelude::*;

/// Input file of the `rect-partition` binary.
#[derive(Debug, Deserialize)]
struct PartitionJob {
    #[serde(default)]
    config: PartitionConfig,
    rects: Vec<Rect>,
}

#[derive(Debug, Serialize)]
struct PartitionReport {
    labels: Vec<u32>,
    groups: Vec<Vec<usize>>,
    passes: u32,
}

fn main() -> Result<()> {
    let _logger = setup_logging("info");

    let Some(path) = std::env::args().nth(1) else {
        bail!("usage: rect-partition <job.yaml>");
    };

    let yaml = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read job file {path}"))?;
    let job: PartitionJob =
        serde_yml::from_str(&yaml).with_context(|| format!("Failed to parse job file {path}"))?;

    job.config
        .check()
        .with_context(|| format!("Invalid config in job file {path}"))?;
    if job.rects.len() > job.config.lanes {
        bail!(
            "{} rectangles exceed the group size of {} lanes",
            job.rects.len(),
            job.config.lanes
        );
    }

    info!(
        "partitioning {} rectangles from {path} (eps {}, {} lanes)",
        job.rects.len(),
        job.config.eps,
        job.config.lanes
    );

    let partitioner = Partitioner::new(job.config);
    let partition = partitioner.partition(&job.rects);

    let report = PartitionReport {
        labels: partition.labels().to_vec(),
        groups: partition.groups(),
        passes: partition.passes(),
    };
    info!("found {} groups", partition.num_groups());

    print!("{}", serde_yml::to_string(&report)?);

    Ok(())
}
