// 👤 Contact Entity - people tracked by an account, and the calls logged with them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A contact belongs to exactly one account
///
/// Partial contacts are placeholders (e.g. a relative mentioned on another
/// contact's page) and are not "real" contacts for plan limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub account_id: String,
    pub first_name: String,
    pub is_active: bool,
    pub is_partial: bool,
}

impl Contact {
    /// Create a real, active contact
    pub fn new(account_id: &str, first_name: String) -> Self {
        Contact {
            id: uuid::Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            first_name,
            is_active: true,
            is_partial: false,
        }
    }

    /// Create a partial (placeholder) contact
    pub fn partial(account_id: &str, first_name: String) -> Self {
        Contact {
            is_partial: true,
            ..Contact::new(account_id, first_name)
        }
    }

    pub fn is_real(&self) -> bool {
        !self.is_partial
    }
}

/// Phone call logged with a contact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub id: String,
    pub account_id: String,
    pub contact_id: String,
    pub called_at: DateTime<Utc>,
}

impl Call {
    pub fn new(contact: &Contact, called_at: DateTime<Utc>) -> Self {
        Call {
            id: uuid::Uuid::new_v4().to_string(),
            account_id: contact.account_id.clone(),
            contact_id: contact.id.clone(),
            called_at,
        }
    }
}
