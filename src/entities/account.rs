// 💳 Account Entity - the tenant whose plan gates feature access
//
// An account owns users, pending invitations, contacts, activities and calls.
// The persistence layer materializes those relations; the rule layer only reads them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::activity::Activity;
use super::contact::{Call, Contact};

// ============================================================================
// SUBSCRIPTION
// ============================================================================

/// Paid plan attached to an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,

    /// Plan identifier as known by the billing provider
    pub plan: String,

    /// End of the free trial, if the subscription started with one
    pub trial_ends_at: Option<DateTime<Utc>>,

    /// Cancellation date. None = recurring, future = grace period
    pub ends_at: Option<DateTime<Utc>>,
}

impl Subscription {
    pub fn new(plan: String) -> Self {
        Subscription {
            id: uuid::Uuid::new_v4().to_string(),
            plan,
            trial_ends_at: None,
            ends_at: None,
        }
    }

    pub fn is_recurring(&self) -> bool {
        self.ends_at.is_none()
    }

    pub fn on_trial_at(&self, now: DateTime<Utc>) -> bool {
        self.trial_ends_at.map_or(false, |ends| ends > now)
    }

    pub fn on_grace_period_at(&self, now: DateTime<Utc>) -> bool {
        self.ends_at.map_or(false, |ends| ends > now)
    }

    /// A subscription is valid while recurring, on trial, or on grace period
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.is_recurring() || self.on_trial_at(now) || self.on_grace_period_at(now)
    }
}

// ============================================================================
// USER & INVITATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub account_id: String,
    pub email: String,
}

impl User {
    pub fn new(account_id: &str, email: String) -> Self {
        User {
            id: uuid::Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            email,
        }
    }
}

/// Pending invitation for someone to join the account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: String,
    pub account_id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl Invitation {
    pub fn new(account_id: &str, email: String) -> Self {
        Invitation {
            id: uuid::Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            email,
            created_at: Utc::now(),
        }
    }
}

// ============================================================================
// ACCOUNT ENTITY
// ============================================================================

/// Account with its related records loaded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Stable identity (UUID)
    pub id: String,

    /// Exempt from the subscription requirement
    pub has_access_to_paid_version_for_free: bool,

    pub subscription: Option<Subscription>,

    pub created_at: DateTime<Utc>,

    // ========================================================================
    // RELATIONS
    // ========================================================================
    #[serde(default)]
    pub users: Vec<User>,

    #[serde(default)]
    pub invitations: Vec<Invitation>,

    #[serde(default)]
    pub contacts: Vec<Contact>,

    /// Latest first
    #[serde(default)]
    pub activities: Vec<Activity>,

    /// Latest first
    #[serde(default)]
    pub calls: Vec<Call>,
}

impl Account {
    /// Create a new, empty account with a fresh UUID
    pub fn new() -> Self {
        Account {
            id: uuid::Uuid::new_v4().to_string(),
            has_access_to_paid_version_for_free: false,
            subscription: None,
            created_at: Utc::now(),
            users: Vec::new(),
            invitations: Vec::new(),
            contacts: Vec::new(),
            activities: Vec::new(),
            calls: Vec::new(),
        }
    }

    /// Whether the account can use the paid version at `now`
    pub fn is_subscribed_at(&self, now: DateTime<Utc>) -> bool {
        if self.has_access_to_paid_version_for_free {
            return true;
        }

        self.subscription
            .as_ref()
            .map_or(false, |subscription| subscription.is_valid_at(now))
    }

    pub fn is_subscribed(&self) -> bool {
        self.is_subscribed_at(Utc::now())
    }

    /// Contacts that count toward the free plan: real (not partial) and active
    pub fn real_active_contacts(&self) -> impl Iterator<Item = &Contact> {
        self.contacts.iter().filter(|c| c.is_real() && c.is_active)
    }
}

impl Default for Account {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
