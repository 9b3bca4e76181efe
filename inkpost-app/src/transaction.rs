//! The transaction behavior.

use crate::dispatch::{Behavior, Next, RequestContext, RequestInfo};
use crate::error::AppResult;
use async_trait::async_trait;
use std::any::Any;
use tracing::{debug, warn};

/// Brackets transactional requests in begin/commit, rolling back on error.
///
/// Per request the session sees exactly one `begin` and exactly one of
/// `commit`/`rollback`:
/// - handler returned `Ok` (success *or* business failure) → commit;
/// - handler returned `Err`, or the commit itself failed → rollback, and
///   the original error propagates. A rollback failure is logged but never
///   masks the error that caused it.
///
/// Non-transactional requests pass through untouched.
pub struct TransactionBehavior;

#[async_trait]
impl Behavior for TransactionBehavior {
    async fn handle(
        &self,
        info: &RequestInfo,
        ctx: &RequestContext,
        next: Next<'_>,
    ) -> AppResult<Box<dyn Any + Send>> {
        if !info.transactional {
            return next.run().await;
        }

        debug!(request = info.name, "begin transaction");
        ctx.uow.begin_transaction(&ctx.cancel).await?;

        match next.run().await {
            Ok(response) => match ctx.uow.commit_transaction(&ctx.cancel).await {
                Ok(()) => {
                    debug!(request = info.name, "transaction committed");
                    Ok(response)
                }
                Err(commit_err) => {
                    warn!(request = info.name, error = %commit_err, "commit failed, rolling back");
                    if let Err(rollback_err) = ctx.uow.rollback_transaction().await {
                        warn!(request = info.name, error = %rollback_err, "rollback failed");
                    }
                    Err(commit_err.into())
                }
            },
            Err(handler_err) => {
                warn!(request = info.name, error = %handler_err, "handler failed, rolling back");
                if let Err(rollback_err) = ctx.uow.rollback_transaction().await {
                    warn!(request = info.name, error = %rollback_err, "rollback failed");
                }
                Err(handler_err)
            }
        }
    }
}
