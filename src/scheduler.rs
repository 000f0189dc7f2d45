use crate::alerts::Severity;
use crate::config::Config;
use crate::engine::{ContentEngine, ValidationRun};
use anyhow::Result;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

/// Initialize and start the validation scheduler
pub async fn start_scheduler(config: &Config, engine: Arc<ContentEngine>) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    // One daily job per configured time
    for time in &config.validation_schedule {
        let cron_expr = time_to_cron(time)?;
        info!("Scheduling validation for {} UTC (cron: {})", time, cron_expr);

        let engine_clone = Arc::clone(&engine);

        let job = Job::new_async(cron_expr.as_str(), move |_uuid, _l| {
            let engine = Arc::clone(&engine_clone);

            Box::pin(async move {
                info!("⏰ Scheduled validation triggered");
                if let Err(e) = run_validation_job(&engine).await {
                    error!("Scheduled validation failed: {}", e);
                }
            })
        })?;

        scheduler.add(job).await?;
    }

    scheduler.start().await?;
    info!("✓ Scheduler started");

    Ok(scheduler)
}

/// Convert time string (HH:MM, UTC) to a daily cron expression
fn time_to_cron(time: &str) -> Result<String> {
    let parts: Vec<&str> = time.split(':').collect();
    if parts.len() != 2 {
        anyhow::bail!("Invalid time format: {}. Expected HH:MM", time);
    }

    let hour: u8 = parts[0].parse()?;
    let minute: u8 = parts[1].parse()?;

    if hour > 23 || minute > 59 {
        anyhow::bail!("Invalid time: {}. Hour must be 0-23 and minute 0-59", time);
    }

    // Cron format: "second minute hour day month day_of_week"
    Ok(format!("0 {} {} * * *", minute, hour))
}

/// Rescan the corpus from disk and log the alert summary
pub async fn run_validation_job(engine: &ContentEngine) -> Result<ValidationRun> {
    info!("Starting validation job");

    // Scheduled runs always see the current corpus
    engine.invalidate(None, None).await;

    let run = engine.validate().await?;
    log_summary(&run);

    info!("✓ Validation job completed");

    Ok(run)
}

fn log_summary(run: &ValidationRun) {
    let errors = run.count(Severity::Error);
    let warnings = run.count(Severity::Warning);
    let infos = run.count(Severity::Info);

    info!(
        "Validated {} items ({} valid), translation completeness {}%",
        run.report.total_items, run.report.valid_items, run.stats.translation_completeness
    );

    if errors > 0 {
        warn!(
            "{} errors, {} warnings, {} info alerts",
            errors, warnings, infos
        );
        for alert in run.alerts.iter().filter(|a| a.severity == Severity::Error) {
            warn!("[{}] {}: {}", alert.rule_id, alert.title, alert.message);
        }
    } else {
        info!(
            "{} errors, {} warnings, {} info alerts",
            errors, warnings, infos
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_to_cron() {
        assert_eq!(time_to_cron("08:00").unwrap(), "0 0 8 * * *");
        assert_eq!(time_to_cron("23:45").unwrap(), "0 45 23 * * *");
        assert_eq!(time_to_cron("0:5").unwrap(), "0 5 0 * * *");
    }

    #[test]
    fn test_time_to_cron_invalid() {
        assert!(time_to_cron("0800").is_err());
        assert!(time_to_cron("8:00:00").is_err());
        assert!(time_to_cron("aa:bb").is_err());
        assert!(time_to_cron("24:00").is_err());
        assert!(time_to_cron("12:60").is_err());
    }

    #[tokio::test]
    async fn test_start_scheduler_rejects_bad_schedule() {
        let config = Config {
            validation_schedule: vec!["25:00".to_string()],
            ..Config::default()
        };
        let engine = Arc::new(ContentEngine::from_config(&config).unwrap());

        assert!(start_scheduler(&config, engine).await.is_err());
    }

    #[tokio::test]
    async fn test_run_validation_job_on_empty_corpus() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config {
            content_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        let engine = ContentEngine::from_config(&config).unwrap();

        let run = run_validation_job(&engine).await.unwrap();
        assert_eq!(run.report.total_items, 0);
        assert_eq!(run.stats.translation_completeness, 100);
        assert!(run.alerts.is_empty());
    }
}
