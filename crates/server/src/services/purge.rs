//! Scheduled purge of soft-deleted accounts.
//!
//! Runs daily. Accounts soft-deleted more than the retention window ago are
//! hard-deleted; this is the only writer that removes user rows outright.
//! Affected ids cannot be enumerated cheaply, so both user cache namespaces
//! are dropped wholesale afterwards.

use std::time::Duration;

use chrono::{Days, Utc};
use tokio::time::MissedTickBehavior;

use crate::cache::Mutation;
use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::state::AppState;

/// How long a soft-deleted account is retained before the sweep removes it.
const RETENTION_DAYS: u64 = 30;

/// How often the sweep runs.
const PURGE_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Spawn the daily purge task. The first sweep runs immediately.
pub fn spawn(state: AppState) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PURGE_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match purge_expired_accounts(&state).await {
                Ok(removed) => {
                    tracing::info!(removed, "purged accounts deleted more than 30 days ago");
                }
                Err(err) => {
                    tracing::error!(error = %err, "scheduled account purge failed");
                }
            }
        }
    })
}

/// Hard-delete accounts whose soft-deletion passed the retention window,
/// then drop the `users` and `user` cache namespaces.
async fn purge_expired_accounts(state: &AppState) -> Result<u64, RepositoryError> {
    let Some(cutoff) = Utc::now().date_naive().checked_sub_days(Days::new(RETENTION_DAYS)) else {
        return Ok(0);
    };

    let removed = UserRepository::new(state.pool())
        .purge_deleted_before(cutoff)
        .await?;

    state.cache().apply(Mutation::DeletedAccountsPurged).await;
    Ok(removed)
}
