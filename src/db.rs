use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use tracing::debug;

use crate::entities::{Account, Activity, Call, Contact, Invitation, Subscription, User};

/// Open a database with foreign key enforcement turned on
///
/// The pragma is per connection, so every connection goes through here.
pub fn open_connection<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let path = path.as_ref();
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database {:?}", path))?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    // ==========================================================================
    // Accounts & subscriptions
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS accounts (
            id TEXT PRIMARY KEY,
            has_access_to_paid_version_for_free INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS subscriptions (
            id TEXT PRIMARY KEY,
            account_id TEXT NOT NULL REFERENCES accounts(id),
            plan TEXT NOT NULL,
            trial_ends_at TEXT,
            ends_at TEXT
        )",
        [],
    )?;

    // ==========================================================================
    // Users & pending invitations
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            account_id TEXT NOT NULL REFERENCES accounts(id),
            email TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS invitations (
            id TEXT PRIMARY KEY,
            account_id TEXT NOT NULL REFERENCES accounts(id),
            email TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Contacts, activities, calls
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS contacts (
            id TEXT PRIMARY KEY,
            account_id TEXT NOT NULL REFERENCES accounts(id),
            first_name TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            is_partial INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS activities (
            id TEXT PRIMARY KEY,
            account_id TEXT NOT NULL REFERENCES accounts(id),
            summary TEXT NOT NULL,
            happened_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS calls (
            id TEXT PRIMARY KEY,
            account_id TEXT NOT NULL REFERENCES accounts(id),
            contact_id TEXT NOT NULL REFERENCES contacts(id),
            called_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    for (name, table) in [
        ("idx_subscriptions_account", "subscriptions"),
        ("idx_users_account", "users"),
        ("idx_invitations_account", "invitations"),
        ("idx_contacts_account", "contacts"),
        ("idx_activities_account", "activities"),
        ("idx_calls_account", "calls"),
    ] {
        conn.execute(
            &format!("CREATE INDEX IF NOT EXISTS {} ON {}(account_id)", name, table),
            [],
        )?;
    }

    Ok(())
}

// ============================================================================
// INSERTS
// ============================================================================

/// Insert the account row only; relations are inserted separately
pub fn insert_account(conn: &Connection, account: &Account) -> Result<()> {
    conn.execute(
        "INSERT INTO accounts (id, has_access_to_paid_version_for_free, created_at)
         VALUES (?1, ?2, ?3)",
        params![
            account.id,
            account.has_access_to_paid_version_for_free,
            account.created_at.to_rfc3339(),
        ],
    )
    .with_context(|| format!("Failed to insert account {}", account.id))?;

    Ok(())
}

pub fn insert_subscription(
    conn: &Connection,
    account_id: &str,
    subscription: &Subscription,
) -> Result<()> {
    conn.execute(
        "INSERT INTO subscriptions (id, account_id, plan, trial_ends_at, ends_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            subscription.id,
            account_id,
            subscription.plan,
            subscription.trial_ends_at.map(|dt| dt.to_rfc3339()),
            subscription.ends_at.map(|dt| dt.to_rfc3339()),
        ],
    )?;

    Ok(())
}

pub fn insert_user(conn: &Connection, user: &User) -> Result<()> {
    conn.execute(
        "INSERT INTO users (id, account_id, email) VALUES (?1, ?2, ?3)",
        params![user.id, user.account_id, user.email],
    )?;

    Ok(())
}

pub fn insert_invitation(conn: &Connection, invitation: &Invitation) -> Result<()> {
    conn.execute(
        "INSERT INTO invitations (id, account_id, email, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            invitation.id,
            invitation.account_id,
            invitation.email,
            invitation.created_at.to_rfc3339(),
        ],
    )?;

    Ok(())
}

pub fn insert_contact(conn: &Connection, contact: &Contact) -> Result<()> {
    conn.execute(
        "INSERT INTO contacts (id, account_id, first_name, is_active, is_partial)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            contact.id,
            contact.account_id,
            contact.first_name,
            contact.is_active,
            contact.is_partial,
        ],
    )?;

    Ok(())
}

pub fn insert_activity(conn: &Connection, activity: &Activity) -> Result<()> {
    conn.execute(
        "INSERT INTO activities (id, account_id, summary, happened_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            activity.id,
            activity.account_id,
            activity.summary,
            activity.happened_at.to_rfc3339(),
        ],
    )?;

    Ok(())
}

pub fn insert_call(conn: &Connection, call: &Call) -> Result<()> {
    conn.execute(
        "INSERT INTO calls (id, account_id, contact_id, called_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            call.id,
            call.account_id,
            call.contact_id,
            call.called_at.to_rfc3339(),
        ],
    )?;

    Ok(())
}

// ============================================================================
// QUERIES
// ============================================================================

fn parse_timestamp(value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))
}

fn parse_optional_timestamp(value: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    value.as_deref().map(parse_timestamp).transpose()
}

/// Run `sql` with the account id bound to ?1 and map every row
fn query_for_account<T, F>(conn: &Connection, sql: &str, account_id: &str, map: F) -> Result<Vec<T>>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([account_id], map)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Load an account with every relation materialized
///
/// Activities and calls come latest first.
pub fn load_account(conn: &Connection, account_id: &str) -> Result<Account> {
    let header = conn
        .query_row(
            "SELECT id, has_access_to_paid_version_for_free, created_at
             FROM accounts
             WHERE id = ?1",
            [account_id],
            |row| {
                let created_at: String = row.get(2)?;
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, bool>(1)?,
                    parse_timestamp(&created_at)?,
                ))
            },
        )
        .optional()?;

    let (id, has_access_to_paid_version_for_free, created_at) =
        header.ok_or_else(|| anyhow!("Account not found: {}", account_id))?;

    // Latest subscription wins if several were recorded
    let subscription = query_for_account(
        conn,
        "SELECT id, plan, trial_ends_at, ends_at
         FROM subscriptions
         WHERE account_id = ?1
         ORDER BY rowid DESC
         LIMIT 1",
        account_id,
        |row| {
            Ok(Subscription {
                id: row.get(0)?,
                plan: row.get(1)?,
                trial_ends_at: parse_optional_timestamp(row.get(2)?)?,
                ends_at: parse_optional_timestamp(row.get(3)?)?,
            })
        },
    )?
    .into_iter()
    .next();

    let users = query_for_account(
        conn,
        "SELECT id, account_id, email FROM users WHERE account_id = ?1",
        account_id,
        |row| {
            Ok(User {
                id: row.get(0)?,
                account_id: row.get(1)?,
                email: row.get(2)?,
            })
        },
    )?;

    let invitations = query_for_account(
        conn,
        "SELECT id, account_id, email, created_at FROM invitations WHERE account_id = ?1",
        account_id,
        |row| {
            let created_at: String = row.get(3)?;
            Ok(Invitation {
                id: row.get(0)?,
                account_id: row.get(1)?,
                email: row.get(2)?,
                created_at: parse_timestamp(&created_at)?,
            })
        },
    )?;

    let contacts = query_for_account(
        conn,
        "SELECT id, account_id, first_name, is_active, is_partial
         FROM contacts
         WHERE account_id = ?1",
        account_id,
        |row| {
            Ok(Contact {
                id: row.get(0)?,
                account_id: row.get(1)?,
                first_name: row.get(2)?,
                is_active: row.get(3)?,
                is_partial: row.get(4)?,
            })
        },
    )?;

    let activities = query_for_account(
        conn,
        "SELECT id, account_id, summary, happened_at
         FROM activities
         WHERE account_id = ?1
         ORDER BY happened_at DESC",
        account_id,
        |row| {
            let happened_at: String = row.get(3)?;
            Ok(Activity {
                id: row.get(0)?,
                account_id: row.get(1)?,
                summary: row.get(2)?,
                happened_at: parse_timestamp(&happened_at)?,
            })
        },
    )?;

    let calls = query_for_account(
        conn,
        "SELECT id, account_id, contact_id, called_at
         FROM calls
         WHERE account_id = ?1
         ORDER BY called_at DESC",
        account_id,
        |row| {
            let called_at: String = row.get(3)?;
            Ok(Call {
                id: row.get(0)?,
                account_id: row.get(1)?,
                contact_id: row.get(2)?,
                called_at: parse_timestamp(&called_at)?,
            })
        },
    )?;

    debug!(
        account_id,
        users = users.len(),
        invitations = invitations.len(),
        contacts = contacts.len(),
        activities = activities.len(),
        calls = calls.len(),
        "loaded account"
    );

    Ok(Account {
        id,
        has_access_to_paid_version_for_free,
        subscription,
        created_at,
        users,
        invitations,
        contacts,
        activities,
        calls,
    })
}

pub fn account_exists(conn: &Connection, account_id: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM accounts WHERE id = ?1", [account_id], |row| row.get(0))
        .optional()?;

    Ok(found.is_some())
}

/// Ids of every account, oldest first
pub fn list_account_ids(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT id FROM accounts ORDER BY created_at, id")?;

    let ids = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn open() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    #[test]
    fn test_open_connection_enforces_foreign_keys() {
        let conn = open_connection(":memory:").unwrap();
        let enabled: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);

        setup_database(&conn).unwrap();
        let orphan = Contact::new("no-such-account", "Orphan".to_string());
        assert!(insert_contact(&conn, &orphan).is_err());
    }

    #[test]
    fn test_setup_is_idempotent() {
        let conn = open();
        setup_database(&conn).unwrap();

        assert!(list_account_ids(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_load_unknown_account_fails() {
        let conn = open();

        let err = load_account(&conn, "missing").unwrap_err();
        assert!(err.to_string().contains("Account not found: missing"));
        assert!(!account_exists(&conn, "missing").unwrap());
    }

    #[test]
    fn test_account_round_trip_with_relations() {
        let conn = open();

        let mut account = Account::new();
        account.has_access_to_paid_version_for_free = true;
        insert_account(&conn, &account).unwrap();

        let mut subscription = Subscription::new("annual".to_string());
        subscription.ends_at = Some(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap());
        insert_subscription(&conn, &account.id, &subscription).unwrap();

        insert_user(&conn, &User::new(&account.id, "owner@example.com".to_string())).unwrap();
        insert_invitation(&conn, &Invitation::new(&account.id, "friend@example.com".to_string()))
            .unwrap();

        let contact = Contact::new(&account.id, "Regis".to_string());
        insert_contact(&conn, &contact).unwrap();
        insert_contact(&conn, &Contact::partial(&account.id, "Ghost".to_string())).unwrap();

        let loaded = load_account(&conn, &account.id).unwrap();

        assert!(account_exists(&conn, &account.id).unwrap());
        assert_eq!(loaded.id, account.id);
        assert!(loaded.has_access_to_paid_version_for_free);
        assert_eq!(loaded.subscription, Some(subscription));
        assert_eq!(loaded.users.len(), 1);
        assert_eq!(loaded.invitations.len(), 1);
        assert_eq!(loaded.contacts.len(), 2);
        assert_eq!(loaded.real_active_contacts().count(), 1);
    }

    #[test]
    fn test_activities_and_calls_load_latest_first() {
        let conn = open();
        let account = Account::new();
        insert_account(&conn, &account).unwrap();

        let contact = Contact::new(&account.id, "Regis".to_string());
        insert_contact(&conn, &contact).unwrap();

        for year in [1992, 2018, 2005] {
            let when = Utc.with_ymd_and_hms(year, 3, 2, 0, 0, 0).unwrap();
            insert_activity(&conn, &Activity::new(&account.id, "Walk".to_string(), when)).unwrap();
            insert_call(&conn, &Call::new(&contact, when)).unwrap();
        }

        let loaded = load_account(&conn, &account.id).unwrap();

        let activity_years: Vec<String> = loaded
            .activities
            .iter()
            .map(|a| a.happened_at.format("%Y").to_string())
            .collect();
        assert_eq!(activity_years, vec!["2018", "2005", "1992"]);

        let call_years: Vec<String> = loaded
            .calls
            .iter()
            .map(|c| c.called_at.format("%Y").to_string())
            .collect();
        assert_eq!(call_years, vec!["2018", "2005", "1992"]);
    }

    #[test]
    fn test_relations_are_scoped_to_account() {
        let conn = open();
        let first = Account::new();
        let second = Account::new();
        insert_account(&conn, &first).unwrap();
        insert_account(&conn, &second).unwrap();

        insert_contact(&conn, &Contact::new(&first.id, "Mine".to_string())).unwrap();
        insert_contact(&conn, &Contact::new(&second.id, "Theirs".to_string())).unwrap();
        insert_contact(&conn, &Contact::new(&second.id, "Also theirs".to_string())).unwrap();

        assert_eq!(load_account(&conn, &first.id).unwrap().contacts.len(), 1);
        assert_eq!(load_account(&conn, &second.id).unwrap().contacts.len(), 2);
        assert_eq!(list_account_ids(&conn).unwrap().len(), 2);
    }
}
