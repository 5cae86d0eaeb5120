//! Database migrations

use rusqlite::Connection;

pub const SCHEMA_VERSION: i32 = 1;

pub fn run_migrations(conn: &Connection) -> Result<(), rusqlite::Error> {
    let current_version: i32 =
        conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    tracing::info!(
        "Database schema version: {} (target: {})",
        current_version,
        SCHEMA_VERSION
    );

    if current_version < 1 {
        tracing::info!("Running migration v1: initial schema");
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS sites (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                site_id TEXT NOT NULL REFERENCES sites(id),
                username TEXT NOT NULL,
                full_name TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE (site_id, username)
            );

            CREATE TABLE IF NOT EXISTS preferences (
                user_id TEXT NOT NULL REFERENCES users(id),
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (user_id, key)
            );

            CREATE TABLE IF NOT EXISTS accounts (
                id TEXT PRIMARY KEY,
                site_id TEXT NOT NULL REFERENCES sites(id),
                user_id TEXT NOT NULL REFERENCES users(id),
                name TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (site_id, name)
            );

            CREATE TABLE IF NOT EXISTS campaigns (
                id TEXT PRIMARY KEY,
                site_id TEXT NOT NULL REFERENCES sites(id),
                user_id TEXT NOT NULL REFERENCES users(id),
                name TEXT NOT NULL,
                opportunities_count INTEGER NOT NULL DEFAULT 0,
                revenue REAL NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS contacts (
                id TEXT PRIMARY KEY,
                site_id TEXT NOT NULL REFERENCES sites(id),
                user_id TEXT NOT NULL REFERENCES users(id),
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS opportunities (
                id TEXT PRIMARY KEY,
                site_id TEXT NOT NULL REFERENCES sites(id),
                user_id TEXT NOT NULL REFERENCES users(id),
                account_id TEXT NOT NULL REFERENCES accounts(id),
                campaign_id TEXT REFERENCES campaigns(id),
                contact_id TEXT REFERENCES contacts(id),
                name TEXT NOT NULL,
                stage TEXT NOT NULL DEFAULT 'prospecting',
                access TEXT NOT NULL DEFAULT 'public',
                source TEXT,
                probability INTEGER NOT NULL DEFAULT 0,
                amount REAL NOT NULL DEFAULT 0,
                discount REAL NOT NULL DEFAULT 0,
                closes_on TEXT,
                background_info TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS permissions (
                opportunity_id TEXT NOT NULL REFERENCES opportunities(id) ON DELETE CASCADE,
                user_id TEXT NOT NULL REFERENCES users(id),
                PRIMARY KEY (opportunity_id, user_id)
            );

            CREATE INDEX IF NOT EXISTS idx_opportunities_site ON opportunities(site_id);
            CREATE INDEX IF NOT EXISTS idx_opportunities_stage ON opportunities(site_id, stage);
            CREATE INDEX IF NOT EXISTS idx_opportunities_campaign ON opportunities(campaign_id);
            CREATE INDEX IF NOT EXISTS idx_accounts_site_name ON accounts(site_id, name);
            "#,
        )?;
        conn.pragma_update(None, "user_version", 1)?;
    }

    Ok(())
}
