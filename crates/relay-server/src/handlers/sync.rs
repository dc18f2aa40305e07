use axum::Json;
use axum::extract::State;
use relay_sync::RunReport;
use tracing::{error, info, instrument};

use crate::error::AppError;
use crate::state::AppState;

/// Triggers a sync run. Runs are serialized: a second request while one is
/// in flight gets 409 instead of queueing behind the lock.
#[instrument(skip_all)]
pub async fn trigger_sync(State(state): State<AppState>) -> Result<Json<RunReport>, AppError> {
    let _guard = state.run_lock().try_lock().map_err(|_| AppError::Busy)?;

    info!("Sync run triggered");

    match state.sync_service().run().await {
        Ok(report) => {
            info!(message = %report.message, targets = report.targets.len(), "Sync run finished");
            Ok(Json(report))
        }
        Err(e) => {
            error!("Sync run failed: {}", e);
            Err(AppError::Internal(e.to_string()))
        }
    }
}
