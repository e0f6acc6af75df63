use chrono::Days;
use domain::attendance::{self, ProcessingResult};
use domain::gateway::google_auth::{TokenProvider, CALENDAR_SCOPES, REPORTS_SCOPES};
use log::*;
use service::{config::Config, logging::Logger};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config);

    let reporting_tz = config.reporting_timezone;
    let sync_date = config.sync_date.resolve(reporting_tz);

    info!("Starting attendance sync for {sync_date} (reporting timezone {reporting_tz})");

    let db = match service::init_database(&config).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to establish database connection: {e}");
            std::process::exit(1);
        }
    };

    let reports_tokens = match TokenProvider::from_config(&config, REPORTS_SCOPES) {
        Ok(provider) => provider,
        Err(e) => {
            error!("Google credentials are not usable: {e}");
            std::process::exit(1);
        }
    };

    let calendar_tokens = match TokenProvider::from_config(&config, CALENDAR_SCOPES) {
        Ok(provider) => provider,
        Err(e) => {
            error!("Google credentials are not usable: {e}");
            std::process::exit(1);
        }
    };

    let state = service::AppState::new(config, &db);
    let config = &state.config;
    let db = state.db_conn_ref();

    if config.dry_run {
        match attendance::discover(db, config, &calendar_tokens, sync_date).await {
            Ok(report) => {
                let with_link = report.iter().filter(|m| m.meet_code.is_some()).count();
                info!(
                    "Dry run: {with_link} of {} meetings on {sync_date} have a discoverable Meet link",
                    report.len()
                );
                for row in &report {
                    match &row.meet_code {
                        Some(code) => info!("  {} \"{}\" -> {code}", row.scheduled_at, row.title),
                        None => info!("  {} \"{}\" -> no link found", row.scheduled_at, row.title),
                    }
                }
            }
            Err(e) => {
                error!("Dry run failed: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received; finishing the session in flight, starting no new ones");
                cancel.store(true, Ordering::SeqCst);
            }
        });
    }

    let outcome = if let Some(days) = config.backfill_days {
        let start = sync_date
            .checked_sub_days(Days::new(days as u64))
            .unwrap_or(sync_date);
        info!("Backfilling {start} through {sync_date}");
        attendance::process_date_range(
            db,
            config,
            &reports_tokens,
            &calendar_tokens,
            start,
            sync_date,
            &cancel,
        )
        .await
    } else {
        attendance::process_date(db, config, &reports_tokens, &calendar_tokens, sync_date, &cancel)
            .await
    };

    match outcome {
        Ok(result) => report_summary(&result),
        // Partial per-session failures are inside the summary; reaching here
        // means the run itself could not continue.
        Err(e) => {
            error!("Attendance sync aborted: {e}");
            std::process::exit(1);
        }
    }
}

fn report_summary(result: &ProcessingResult) {
    info!(
        "Attendance sync finished: {} meetings processed, {} with data, {} participants, \
         {} records created, {} updated, {} skipped without a link",
        result.meetings_processed,
        result.meetings_with_data,
        result.participants_found,
        result.records_created,
        result.records_updated,
        result.skipped_no_link,
    );

    if !result.errors.is_empty() {
        warn!(
            "{} session(s) failed and stay eligible for the next run:",
            result.errors.len()
        );
        for message in &result.errors {
            warn!("  {message}");
        }
    }
}
