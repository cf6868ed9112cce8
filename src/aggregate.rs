//! Race several sources and keep the first complete report.
//!
//! Every source runs in its own task. The first one to finish successfully
//! puts its report into a single-slot channel; later successes find the
//! slot taken and are dropped. Failed sources never publish. Reports from
//! different sources are never merged.
//!
//! Unlike a bare race, [`aggregate`] always terminates: it gives up with
//! [`AggregateError::Exhausted`] as soon as every source has failed, and
//! with [`AggregateError::Timeout`] once the caller's deadline passes.

use crate::error::AggregateError;
use crate::models::Report;
use crate::sources::Source;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{Instrument, debug, error, info, info_span, instrument, warn};

/// Run all `sources` concurrently and return the first report produced.
///
/// Losing sources are cancelled once a winner is chosen or the deadline
/// passes.
///
/// # Errors
///
/// - [`AggregateError::NoSources`] if `sources` is empty
/// - [`AggregateError::Exhausted`] if every source failed
/// - [`AggregateError::Timeout`] if no source succeeded within `deadline`
#[instrument(level = "info", skip_all, fields(sources = sources.len(), ?deadline))]
pub async fn aggregate(
    sources: &[Arc<dyn Source>],
    deadline: Duration,
) -> Result<Report, AggregateError> {
    if sources.is_empty() {
        return Err(AggregateError::NoSources);
    }

    let t0 = Instant::now();
    let (tx, mut rx) = mpsc::channel::<(String, Report)>(1);
    let mut handles = Vec::with_capacity(sources.len());

    for source in sources {
        let tx = tx.clone();
        let source = Arc::clone(source);
        let span = info_span!("source", name = %source.name());
        let handle = tokio::spawn(
            async move {
                let name = source.name().to_string();
                match source.fetch().await {
                    Ok(report) => {
                        let count = report.items.len();
                        if tx.try_send((name, report)).is_err() {
                            debug!(count, "Another source already won; discarding report");
                        }
                    }
                    Err(e) => warn!(error = %e, "Source failed"),
                }
            }
            .instrument(span),
        );
        handles.push(handle);
    }
    drop(tx);

    let outcome = tokio::time::timeout(deadline, rx.recv()).await;
    for handle in &handles {
        handle.abort();
    }

    match outcome {
        Ok(Some((winner, report))) => {
            info!(
                %winner,
                items = report.items.len(),
                elapsed_ms = t0.elapsed().as_millis() as u64,
                "Source won the race"
            );
            Ok(report)
        }
        Ok(None) => {
            error!(attempted = sources.len(), "Every source failed");
            Err(AggregateError::Exhausted {
                attempted: sources.len(),
            })
        }
        Err(_) => {
            error!("No source produced a report before the deadline");
            Err(AggregateError::Timeout { deadline })
        }
    }
}
