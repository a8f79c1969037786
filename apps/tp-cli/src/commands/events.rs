// events.rs — `tp events`: tail the event log.

use tp_plan::EventLog;

use crate::config::PlannerConfig;

pub fn execute(config: &PlannerConfig, tail: usize) -> anyhow::Result<()> {
    let log = EventLog::new(&config.events_log);
    let recent = log.tail(tail)?;
    if recent.is_empty() {
        println!("No plan events.");
        return Ok(());
    }

    println!("{:<20} {:<20} {:<14} PROCESS", "TIMESTAMP", "EVENT", "DESTINATION");
    println!("{}", "-".repeat(80));
    for event in recent {
        let kind = serde_json::to_value(event.event)?;
        println!(
            "{:<20} {:<20} {:<14} {}",
            event.at.format("%Y-%m-%d %H:%M:%S"),
            kind.as_str().unwrap_or("-"),
            event.destination.as_deref().unwrap_or("-"),
            event.process.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}
