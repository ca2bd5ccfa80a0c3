use account_rules::{
    list_account_ids, load_account, open_connection, setup_database, AccountRules, AppConfig,
};
use anyhow::{bail, Context, Result};
use rusqlite::Connection;
use std::env;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("account_rules={}", log_level)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();
}

fn usage() -> &'static str {
    "usage: account-rules <init | report <account-id> | report-all>"
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let config = AppConfig::load().context("Failed to load configuration")?;
    let rules = AccountRules::new(config.subscription.clone());

    match args.get(1).map(String::as_str) {
        Some("init") => run_init(&config),
        Some("report") => {
            let account_id = args.get(2).context(usage())?;
            run_report(&config, &rules, account_id)
        }
        Some("report-all") => run_report_all(&config, &rules),
        _ => bail!(usage()),
    }
}

fn open_database(config: &AppConfig) -> Result<Connection> {
    let db_path = Path::new(&config.database.path);

    if !db_path.exists() {
        bail!(
            "Database not found at {:?}. Run `account-rules init` first.",
            db_path
        );
    }

    open_connection(db_path)
}

fn run_init(config: &AppConfig) -> Result<()> {
    let conn = open_connection(&config.database.path)?;
    setup_database(&conn)?;

    info!(path = %config.database.path, "database initialized with WAL mode");
    Ok(())
}

fn run_report(config: &AppConfig, rules: &AccountRules, account_id: &str) -> Result<()> {
    let conn = open_database(config)?;
    let account = load_account(&conn, account_id)?;

    let report = rules.report(&account);
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

fn run_report_all(config: &AppConfig, rules: &AccountRules) -> Result<()> {
    let conn = open_database(config)?;
    let ids = list_account_ids(&conn)?;
    info!(accounts = ids.len(), "evaluating accounts");

    for id in ids {
        let account = load_account(&conn, &id)?;
        let report = rules.report(&account);

        println!(
            "{}  limited={:<5}  contact_limit_reached={:<5}  can_downgrade={:<5}  contacts={}/{}",
            report.account_id,
            report.has_limitations,
            report.has_reached_contact_limit,
            report.can_downgrade,
            report.real_active_contacts,
            report.contact_limit,
        );
    }

    Ok(())
}
