// status.rs — `tp status`: the readiness report.

use tp_readiness::render_text;

use super::Planner;
use crate::config::PlannerConfig;

pub fn execute(config: &PlannerConfig, destination: Option<&str>, json: bool) -> anyhow::Result<()> {
    let planner = Planner::open(config)?;
    let reporter = planner.reporter()?;
    let (doc, _) = planner.load()?;

    let mut report = reporter.evaluate(&doc, destination)?;
    if let Some(project) = &config.report.project {
        report.project = project.clone();
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_text(&report));
        if let Some(last) = doc.last_cascade_run {
            println!("Last cascade: {}", last.format("%Y-%m-%d %H:%M:%S UTC"));
        }
    }
    Ok(())
}
