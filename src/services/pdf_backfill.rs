//! Background retry of report PDF export.
//!
//! Submissions whose PDF export failed keep a null `pdf_url`. This task
//! periodically picks up public updates older than a grace period that still
//! have no report and exports them again.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::config::PdfBackfillSettings;
use crate::db::RecordStore;
use crate::error::AppResult;
use crate::models::WsEvent;
use crate::services::event_broadcaster::EventBroadcaster;
use crate::services::pdf_export::PdfExporter;

/// Updates retried per cycle.
const BATCH_SIZE: u64 = 20;

/// Start the backfill task. Does nothing when the interval is zero.
pub fn start_pdf_backfill_task(
    records: Arc<dyn RecordStore>,
    exporter: PdfExporter,
    broadcaster: EventBroadcaster,
    settings: PdfBackfillSettings,
) {
    if !settings.is_enabled() {
        info!("PDF backfill disabled");
        return;
    }

    tokio::spawn(async move {
        info!(
            "Starting PDF backfill (interval: {} seconds, grace: {} seconds)",
            settings.interval_secs, settings.grace_secs
        );

        let mut ticker = interval(Duration::from_secs(settings.interval_secs));

        loop {
            ticker.tick().await;

            if let Err(e) =
                run_backfill(records.as_ref(), &exporter, &broadcaster, &settings).await
            {
                error!("PDF backfill error: {}", e);
            }
        }
    });
}

/// Run a single backfill cycle. Returns how many reports were exported.
pub async fn run_backfill(
    records: &dyn RecordStore,
    exporter: &PdfExporter,
    broadcaster: &EventBroadcaster,
    settings: &PdfBackfillSettings,
) -> AppResult<usize> {
    let Some(cutoff) = i64::try_from(settings.grace_secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .and_then(|grace| Utc::now().checked_sub_signed(grace))
    else {
        warn!(grace_secs = settings.grace_secs, "PDF backfill grace period out of range");
        return Ok(0);
    };
    let pending = records.list_updates_missing_pdf(cutoff, BATCH_SIZE).await?;

    if pending.is_empty() {
        return Ok(0);
    }

    info!("Found {} updates without a report PDF", pending.len());

    let mut exported = 0;
    for update in &pending {
        match exporter.export(update).await {
            Ok(updated) => {
                exported += 1;
                if let Some(url) = updated.pdf_url {
                    broadcaster.publish(WsEvent::update_pdf_ready(updated.id, url));
                }
            }
            Err(e) => {
                warn!(
                    update_code = %update.update_code,
                    error = %e,
                    "PDF backfill export failed"
                );
            }
        }
    }

    info!(
        "PDF backfill complete: {} of {} exported",
        exported,
        pending.len()
    );

    Ok(exported)
}
