// 🏷️ Account Rules - plan limits and downgrade eligibility
//
// Pure reads over an account whose relations are already loaded.
// Nothing here mutates the account or touches storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SubscriptionConfig;
use crate::entities::Account;
use crate::statistics::{yearly_statistics, YearlyStatistics};

// ============================================================================
// ACCOUNT REPORT
// ============================================================================

/// Every rule evaluated for one account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountReport {
    pub account_id: String,
    pub has_limitations: bool,
    pub has_reached_contact_limit: bool,
    pub can_downgrade: bool,
    pub contact_limit: usize,
    pub real_active_contacts: usize,
    pub activities_per_year: YearlyStatistics,
    pub calls_per_year: YearlyStatistics,
}

// ============================================================================
// RULES
// ============================================================================

/// Stateless rule set parameterized by the deployment's plan limits
#[derive(Debug, Clone, Default)]
pub struct AccountRules {
    config: SubscriptionConfig,
}

impl AccountRules {
    pub fn new(config: SubscriptionConfig) -> Self {
        AccountRules { config }
    }

    /// Maximum number of contacts on the free plan
    pub fn contact_limit(&self) -> usize {
        self.config.number_of_allowed_contacts_free_account
    }

    /// Whether the account is restricted by its current plan
    pub fn has_limitations(&self, account: &Account) -> bool {
        self.has_limitations_at(account, Utc::now())
    }

    /// Same as [`has_limitations`](Self::has_limitations) with an explicit clock
    pub fn has_limitations_at(&self, account: &Account, now: DateTime<Utc>) -> bool {
        if account.has_access_to_paid_version_for_free {
            return false;
        }

        if !self.config.requires_subscription {
            return false;
        }

        if account.is_subscribed_at(now) {
            return false;
        }

        true
    }

    /// Whether the free-plan contact limit is reached
    ///
    /// Only real (non-partial), active contacts count. Being exactly at the
    /// limit counts as reached.
    pub fn has_reached_contact_limit(&self, account: &Account) -> bool {
        let count = account.real_active_contacts().count();
        debug!(
            account_id = %account.id,
            count,
            limit = self.contact_limit(),
            "checking contact limit"
        );

        count >= self.contact_limit()
    }

    /// Whether the account may move back to the free plan
    ///
    /// Requires a single user, no pending invitations, and no more contacts
    /// (of any status) than the free plan allows.
    pub fn can_downgrade(&self, account: &Account) -> bool {
        let mut can_downgrade = true;

        if account.users.len() != 1 {
            debug!(account_id = %account.id, users = account.users.len(), "downgrade blocked by users");
            can_downgrade = false;
        }

        if !account.invitations.is_empty() {
            debug!(
                account_id = %account.id,
                invitations = account.invitations.len(),
                "downgrade blocked by pending invitations"
            );
            can_downgrade = false;
        }

        if account.contacts.len() > self.contact_limit() {
            debug!(
                account_id = %account.id,
                contacts = account.contacts.len(),
                "downgrade blocked by contact count"
            );
            can_downgrade = false;
        }

        can_downgrade
    }

    /// Number of activities per year of `happened_at`
    pub fn yearly_activities_statistics(&self, account: &Account) -> YearlyStatistics {
        yearly_statistics(&account.activities, |activity| activity.happened_at)
    }

    /// Number of calls per year of `called_at`
    pub fn yearly_call_statistics(&self, account: &Account) -> YearlyStatistics {
        yearly_statistics(&account.calls, |call| call.called_at)
    }

    /// Evaluate every rule for the account
    pub fn report(&self, account: &Account) -> AccountReport {
        self.report_at(account, Utc::now())
    }

    pub fn report_at(&self, account: &Account, now: DateTime<Utc>) -> AccountReport {
        AccountReport {
            account_id: account.id.clone(),
            has_limitations: self.has_limitations_at(account, now),
            has_reached_contact_limit: self.has_reached_contact_limit(account),
            can_downgrade: self.can_downgrade(account),
            contact_limit: self.contact_limit(),
            real_active_contacts: account.real_active_contacts().count(),
            activities_per_year: self.yearly_activities_statistics(account),
            calls_per_year: self.yearly_call_statistics(account),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
