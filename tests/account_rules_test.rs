// End-to-end: accounts persisted in SQLite, loaded, then evaluated by the rules

use account_rules::{
    insert_account, insert_activity, insert_call, insert_contact, insert_invitation,
    insert_subscription, insert_user, load_account, setup_database, Account, AccountRules,
    Activity, Call, Contact, Invitation, Subscription, SubscriptionConfig, User,
    YearlyStatistics,
};
use chrono::{TimeZone, Utc};
use rusqlite::Connection;

fn open() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    setup_database(&conn).unwrap();
    conn
}

fn create_account(conn: &Connection) -> Account {
    let account = Account::new();
    insert_account(conn, &account).unwrap();
    account
}

fn paid_deployment(limit: usize) -> AccountRules {
    AccountRules::new(SubscriptionConfig {
        requires_subscription: true,
        number_of_allowed_contacts_free_account: limit,
    })
}

#[test]
fn free_account_over_limit_is_limited_and_cannot_downgrade() {
    let conn = open();
    let account = create_account(&conn);

    insert_user(&conn, &User::new(&account.id, "owner@example.com".to_string())).unwrap();
    for i in 0..3 {
        insert_contact(&conn, &Contact::new(&account.id, format!("Friend {}", i))).unwrap();
    }

    let loaded = load_account(&conn, &account.id).unwrap();
    let rules = paid_deployment(2);

    assert!(rules.has_limitations(&loaded));
    assert!(rules.has_reached_contact_limit(&loaded));
    assert!(!rules.can_downgrade(&loaded));
}

#[test]
fn subscribed_account_loaded_from_storage_has_no_limitations() {
    let conn = open();
    let account = create_account(&conn);
    insert_subscription(&conn, &account.id, &Subscription::new("annual".to_string())).unwrap();

    let loaded = load_account(&conn, &account.id).unwrap();

    assert!(loaded.is_subscribed());
    assert!(!paid_deployment(10).has_limitations(&loaded));
}

#[test]
fn pending_invitation_blocks_downgrade() {
    let conn = open();
    let account = create_account(&conn);
    insert_user(&conn, &User::new(&account.id, "owner@example.com".to_string())).unwrap();

    let rules = paid_deployment(10);
    assert!(rules.can_downgrade(&load_account(&conn, &account.id).unwrap()));

    insert_invitation(&conn, &Invitation::new(&account.id, "friend@example.com".to_string()))
        .unwrap();
    assert!(!rules.can_downgrade(&load_account(&conn, &account.id).unwrap()));
}

#[test]
fn inactive_and_partial_contacts_do_not_reach_limit() {
    let conn = open();
    let account = create_account(&conn);

    for i in 0..2 {
        let mut contact = Contact::new(&account.id, format!("Archived {}", i));
        contact.is_active = false;
        insert_contact(&conn, &contact).unwrap();
    }
    insert_contact(&conn, &Contact::partial(&account.id, "Partial".to_string())).unwrap();
    insert_contact(&conn, &Contact::new(&account.id, "Real".to_string())).unwrap();

    let loaded = load_account(&conn, &account.id).unwrap();

    assert!(paid_deployment(1).has_reached_contact_limit(&loaded));
    assert!(!paid_deployment(2).has_reached_contact_limit(&loaded));
}

#[test]
fn yearly_statistics_from_storage() {
    let conn = open();
    let account = create_account(&conn);
    let contact = Contact::new(&account.id, "Regis".to_string());
    insert_contact(&conn, &contact).unwrap();

    let recent = Utc.with_ymd_and_hms(2018, 3, 2, 0, 0, 0).unwrap();
    let old = Utc.with_ymd_and_hms(1992, 3, 2, 0, 0, 0).unwrap();

    for when in [recent, recent, recent, recent, old, old] {
        insert_activity(&conn, &Activity::new(&account.id, "Hike".to_string(), when)).unwrap();
        insert_call(&conn, &Call::new(&contact, when)).unwrap();
    }

    let loaded = load_account(&conn, &account.id).unwrap();
    let rules = AccountRules::default();
    let expected = YearlyStatistics::from([(1992, 2), (2018, 4)]);

    assert_eq!(rules.yearly_activities_statistics(&loaded), expected);
    assert_eq!(rules.yearly_call_statistics(&loaded), expected);

    let report = rules.report(&loaded);
    assert_eq!(report.activities_per_year, expected);
    assert_eq!(report.calls_per_year, expected);
}

#[test]
fn report_serializes_years_as_json_keys() {
    let conn = open();
    let account = create_account(&conn);
    let when = Utc.with_ymd_and_hms(2021, 7, 14, 12, 0, 0).unwrap();
    insert_activity(&conn, &Activity::new(&account.id, "Picnic".to_string(), when)).unwrap();

    let loaded = load_account(&conn, &account.id).unwrap();
    let report = AccountRules::default().report(&loaded);
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["activities_per_year"]["2021"], 1);
    assert_eq!(json["contact_limit"], 10);
    assert_eq!(json["has_limitations"], false);
}
