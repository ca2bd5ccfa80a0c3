// 📅 Activity Entity - something the account owner did, dated by happened_at

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub account_id: String,
    pub summary: String,
    pub happened_at: DateTime<Utc>,
}

impl Activity {
    pub fn new(account_id: &str, summary: String, happened_at: DateTime<Utc>) -> Self {
        Activity {
            id: uuid::Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            summary,
            happened_at,
        }
    }
}
