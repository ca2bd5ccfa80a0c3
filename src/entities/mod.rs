// Entity Models
//
// Records owned by the persistence layer and consumed read-only by the rules:
// - Account (with subscription, users, invitations)
// - Contact and the calls logged with it
// - Activity

pub mod account;
pub mod activity;
pub mod contact;

pub use account::{Account, Invitation, Subscription, User};
pub use activity::Activity;
pub use contact::{Call, Contact};
