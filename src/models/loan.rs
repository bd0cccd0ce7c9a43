//! Loan (active borrowing) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Loan model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub copy_id: i32,
    pub user_id: i32,
    pub structure_id: i32,
    pub started_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub renewal_count: i16,
    pub returned_at: Option<DateTime<Utc>>,
}

impl Loan {
    pub fn is_active(&self) -> bool {
        self.returned_at.is_none()
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && self.due_date < now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn loan(due_offset_days: i64, returned: bool) -> Loan {
        let now = Utc::now();
        Loan {
            id: 1,
            copy_id: 1,
            user_id: 1,
            structure_id: 1,
            started_at: now - Duration::days(10),
            due_date: now + Duration::days(due_offset_days),
            renewal_count: 0,
            returned_at: returned.then_some(now),
        }
    }

    #[test]
    fn overdue_only_while_active() {
        let now = Utc::now();
        assert!(loan(-1, false).is_overdue(now));
        assert!(!loan(1, false).is_overdue(now));
        assert!(!loan(-1, true).is_overdue(now));
    }
}
