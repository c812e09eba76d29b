//! Access attempt logging and log queries.

use lift_core::error::{LiftError, LiftResult};
use lift_core::models::access_log::{AccessLog, CreateAccessLog};
use lift_core::repository::{AccessLogFilter, AccessLogRepository, PaginatedResult, Pagination};
use tracing::error;

use crate::config::AccessConfig;

const MAX_REASON_LEN: usize = 500;
const MAX_IP_LEN: usize = 45;

/// Appends access attempts and serves filtered, paginated reads.
pub struct AccessLogService<L: AccessLogRepository> {
    log_repo: L,
    config: AccessConfig,
}

impl<L: AccessLogRepository> AccessLogService<L> {
    pub fn new(log_repo: L, config: AccessConfig) -> Self {
        Self { log_repo, config }
    }

    /// Append one attempt. A storage failure is returned, never
    /// swallowed, so callers cannot act as if the attempt was logged.
    pub async fn record(&self, input: CreateAccessLog) -> LiftResult<AccessLog> {
        if input
            .reason
            .as_ref()
            .is_some_and(|r| r.chars().count() > MAX_REASON_LEN)
        {
            return Err(LiftError::validation(format!(
                "reason must be at most {MAX_REASON_LEN} characters"
            )));
        }
        if input
            .ip_address
            .as_ref()
            .is_some_and(|ip| ip.len() > MAX_IP_LEN)
        {
            return Err(LiftError::validation(format!(
                "ip address must be at most {MAX_IP_LEN} characters"
            )));
        }

        let floor_id = input.floor_id;
        self.log_repo.append(input).await.inspect_err(|e| {
            error!(error = %e, floor_id = %floor_id, "Failed to append access log");
        })
    }

    /// Conjunctive filter, newest first. `page` is 1-indexed and
    /// `page_size` is clamped to `[1, max_page_size]`; `None` uses the
    /// configured default.
    pub async fn query(
        &self,
        filter: AccessLogFilter,
        page: u64,
        page_size: Option<u64>,
    ) -> LiftResult<PaginatedResult<AccessLog>> {
        let page_size = self.clamp_page_size(page_size);
        self.log_repo
            .list(filter, Pagination::from_page(page, page_size))
            .await
    }

    fn clamp_page_size(&self, requested: Option<u64>) -> u64 {
        let max = self.config.max_page_size.max(1);
        requested
            .unwrap_or(self.config.default_page_size)
            .clamp(1, max)
    }
}
