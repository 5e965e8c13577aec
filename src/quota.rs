use chrono::{DateTime, Duration, SubsecRound, Utc};

use crate::db::{BotStore, StoreError};
use crate::domain::{InteractionRecord, UserId};

/// Sliding-window usage limit. The window always ends at the instant of the
/// check, so a user regains capacity gradually as old records age out.
#[derive(Debug, Clone)]
pub struct UsageQuota {
    limit: usize,
    window: Duration,
}

impl UsageQuota {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self { limit, window }
    }

    pub fn daily(limit: usize) -> Self {
        Self::new(limit, Duration::hours(24))
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        window_start(now, self.window)
    }

    /// Recounted from the store on every call; nothing is cached.
    pub async fn is_over_limit(
        &self,
        store: &dyn BotStore,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let records = store
            .query_interactions_since(user_id, self.window_start(now))
            .await?;
        let used = count_in_window(&records, user_id, now, self.window);
        tracing::debug!(user = %user_id, used, limit = self.limit, "usage checked");
        Ok(used >= self.limit)
    }
}

/// Truncated to whole milliseconds, the precision timestamps are stored at,
/// so the SQL filter and `count_in_window` agree on the edge.
fn window_start(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    (now - window).trunc_subsecs(3)
}

/// Records belonging to `user_id` whose timestamp lies in `[now - window, now]`.
pub fn count_in_window(
    records: &[InteractionRecord],
    user_id: &UserId,
    now: DateTime<Utc>,
    window: Duration,
) -> usize {
    let start = window_start(now, window);
    records
        .iter()
        .filter(|r| &r.user_id == user_id && r.created_at >= start && r.created_at <= now)
        .count()
}
