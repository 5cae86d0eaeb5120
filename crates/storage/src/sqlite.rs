//! SQLite storage implementation

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Transaction};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use pipeline_core::{
    Access, Account, AccountRef, Campaign, Contact, Opportunity, OpportunityForm, Scope,
    Site, Stage, User,
};

use crate::error::StorageError;
use crate::migrations;
use crate::types::{ListQuery, Page, StageTotals};

/// Visibility predicate applied to every opportunity read: on the scope's
/// site, and public, owned, or explicitly shared with the scope's user.
/// `?1` = site id, `?2` = user id.
const VISIBLE: &str = "site_id = ?1 AND (access = 'public' OR user_id = ?2 \
     OR id IN (SELECT opportunity_id FROM permissions WHERE user_id = ?2))";

const OPPORTUNITY_COLUMNS: &str = "id, site_id, user_id, account_id, campaign_id, contact_id, \
     name, stage, access, source, probability, amount, discount, closes_on, \
     background_info, created_at, updated_at";

pub struct Storage {
    conn: Arc<Mutex<Connection>>,
}

fn lock_conn(mutex: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, StorageError> {
    mutex.lock().map_err(|_| StorageError::LockPoisoned)
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn parse_date(raw: &str) -> Result<NaiveDate, rusqlite::Error> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

/// Escapes LIKE wildcards in user-supplied search text.
fn escape_like(query: &str) -> String {
    query.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn row_to_opportunity(row: &rusqlite::Row<'_>) -> rusqlite::Result<Opportunity> {
    let stage: String = row.get(7)?;
    let access: String = row.get(8)?;
    let created_at: String = row.get(15)?;
    let updated_at: String = row.get(16)?;
    let closes_on: Option<String> = row.get(13)?;
    Ok(Opportunity {
        id: row.get(0)?,
        site_id: row.get(1)?,
        user_id: row.get(2)?,
        account_id: row.get(3)?,
        campaign_id: row.get(4)?,
        contact_id: row.get(5)?,
        name: row.get(6)?,
        stage: stage
            .parse::<Stage>()
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(e.into()))?,
        access: access
            .parse::<Access>()
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(e.into()))?,
        source: row.get(9)?,
        probability: row.get(10)?,
        amount: row.get(11)?,
        discount: row.get(12)?,
        closes_on: closes_on.as_deref().map(parse_date).transpose()?,
        background_info: row.get(14)?,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

fn row_to_account(row: &rusqlite::Row<'_>) -> rusqlite::Result<Account> {
    let created_at: String = row.get(4)?;
    let updated_at: String = row.get(5)?;
    Ok(Account {
        id: row.get(0)?,
        site_id: row.get(1)?,
        user_id: row.get(2)?,
        name: row.get(3)?,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

fn row_to_campaign(row: &rusqlite::Row<'_>) -> rusqlite::Result<Campaign> {
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;
    Ok(Campaign {
        id: row.get(0)?,
        site_id: row.get(1)?,
        user_id: row.get(2)?,
        name: row.get(3)?,
        opportunities_count: row.get(4)?,
        revenue: row.get(5)?,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let created_at: String = row.get(4)?;
    Ok(User {
        id: row.get(0)?,
        site_id: row.get(1)?,
        username: row.get(2)?,
        full_name: row.get(3)?,
        created_at: parse_ts(&created_at)?,
    })
}

impl Storage {
    pub fn new(db_path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(db_path).map_err(StorageError::from)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        migrations::run_migrations(&conn)
            .map_err(|e| StorageError::Migration(e.to_string()))?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    // -- sites and users ------------------------------------------------

    pub fn create_site(&self, name: &str) -> Result<Site, StorageError> {
        let conn = lock_conn(&self.conn)?;
        let site = Site { id: new_id(), name: name.to_string(), created_at: Utc::now() };
        conn.execute(
            "INSERT INTO sites (id, name, created_at) VALUES (?1, ?2, ?3)",
            params![site.id, site.name, site.created_at.to_rfc3339()],
        )?;
        Ok(site)
    }

    pub fn create_user(
        &self,
        site_id: &str,
        username: &str,
        full_name: &str,
    ) -> Result<User, StorageError> {
        let conn = lock_conn(&self.conn)?;
        let user = User {
            id: new_id(),
            site_id: site_id.to_string(),
            username: username.to_string(),
            full_name: full_name.to_string(),
            created_at: Utc::now(),
        };
        conn.execute(
            "INSERT INTO users (id, site_id, username, full_name, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![user.id, user.site_id, user.username, user.full_name,
                user.created_at.to_rfc3339()],
        )?;
        Ok(user)
    }

    /// Resolves an authenticated identity. `None` (not `NotFound`) when the
    /// id is unknown, so callers can answer 401 rather than 404.
    pub fn get_user(&self, id: &str) -> Result<Option<User>, StorageError> {
        let conn = lock_conn(&self.conn)?;
        conn.query_row(
            "SELECT id, site_id, username, full_name, created_at FROM users WHERE id = ?1",
            params![id],
            row_to_user,
        )
        .optional()
        .map_err(StorageError::from)
    }

    /// Candidate assignees for an opportunity: everyone on the scope's site
    /// except the current user, ordered by name.
    pub fn site_users_except(&self, scope: &Scope) -> Result<Vec<User>, StorageError> {
        let conn = lock_conn(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT id, site_id, username, full_name, created_at FROM users \
             WHERE site_id = ?1 AND id != ?2 ORDER BY full_name COLLATE NOCASE",
        )?;
        let users = stmt
            .query_map(params![scope.site_id, scope.user_id], row_to_user)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    // -- preferences ----------------------------------------------------

    pub fn get_preference(
        &self,
        user_id: &str,
        key: &str,
    ) -> Result<Option<String>, StorageError> {
        let conn = lock_conn(&self.conn)?;
        conn.query_row(
            "SELECT value FROM preferences WHERE user_id = ?1 AND key = ?2",
            params![user_id, key],
            |row| row.get(0),
        )
        .optional()
        .map_err(StorageError::from)
    }

    pub fn set_preference(
        &self,
        user_id: &str,
        key: &str,
        value: &str,
    ) -> Result<(), StorageError> {
        let conn = lock_conn(&self.conn)?;
        conn.execute(
            "INSERT INTO preferences (user_id, key, value) VALUES (?1, ?2, ?3) \
             ON CONFLICT (user_id, key) DO UPDATE SET value = excluded.value",
            params![user_id, key, value],
        )?;
        Ok(())
    }

    // -- accounts -------------------------------------------------------

    pub fn create_account(&self, scope: &Scope, name: &str) -> Result<Account, StorageError> {
        let conn = lock_conn(&self.conn)?;
        insert_account(&conn, scope, name)
    }

    pub fn get_account(&self, scope: &Scope, id: &str) -> Result<Account, StorageError> {
        let conn = lock_conn(&self.conn)?;
        conn.query_row(
            "SELECT id, site_id, user_id, name, created_at, updated_at FROM accounts \
             WHERE id = ?1 AND site_id = ?2",
            params![id, scope.site_id],
            row_to_account,
        )
        .optional()?
        .ok_or_else(|| StorageError::not_found("account", id))
    }

    /// All accounts on the scope's site, alphabetically. Feeds the account
    /// picker on the opportunity form.
    pub fn accounts_ordered(&self, scope: &Scope) -> Result<Vec<Account>, StorageError> {
        let conn = lock_conn(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT id, site_id, user_id, name, created_at, updated_at FROM accounts \
             WHERE site_id = ?1 ORDER BY name COLLATE NOCASE",
        )?;
        let accounts = stmt
            .query_map(params![scope.site_id], row_to_account)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(accounts)
    }

    // -- campaigns and contacts -----------------------------------------

    pub fn create_campaign(&self, scope: &Scope, name: &str) -> Result<Campaign, StorageError> {
        let conn = lock_conn(&self.conn)?;
        let now = Utc::now();
        let campaign = Campaign {
            id: new_id(),
            site_id: scope.site_id.clone(),
            user_id: scope.user_id.clone(),
            name: name.to_string(),
            opportunities_count: 0,
            revenue: 0.0,
            created_at: now,
            updated_at: now,
        };
        conn.execute(
            "INSERT INTO campaigns (id, site_id, user_id, name, opportunities_count, revenue, \
             created_at, updated_at) VALUES (?1, ?2, ?3, ?4, 0, 0, ?5, ?5)",
            params![campaign.id, campaign.site_id, campaign.user_id, campaign.name,
                now.to_rfc3339()],
        )?;
        Ok(campaign)
    }

    pub fn get_campaign(&self, scope: &Scope, id: &str) -> Result<Campaign, StorageError> {
        let conn = lock_conn(&self.conn)?;
        get_campaign_in(&conn, scope, id)
    }

    /// Recomputes the campaign's cached opportunity summary from current
    /// rows and returns the refreshed record.
    pub fn refresh_campaign_summary(
        &self,
        scope: &Scope,
        id: &str,
    ) -> Result<Campaign, StorageError> {
        let conn = lock_conn(&self.conn)?;
        let updated = conn.execute(
            "UPDATE campaigns SET \
                 opportunities_count = (SELECT COUNT(*) FROM opportunities WHERE campaign_id = ?1), \
                 revenue = (SELECT COALESCE(SUM(amount - discount), 0) FROM opportunities \
                            WHERE campaign_id = ?1 AND stage = 'won'), \
                 updated_at = ?2 \
             WHERE id = ?1 AND site_id = ?3",
            params![id, Utc::now().to_rfc3339(), scope.site_id],
        )?;
        if updated == 0 {
            return Err(StorageError::not_found("campaign", id));
        }
        get_campaign_in(&conn, scope, id)
    }

    pub fn create_contact(
        &self,
        scope: &Scope,
        first_name: &str,
        last_name: &str,
    ) -> Result<Contact, StorageError> {
        let conn = lock_conn(&self.conn)?;
        let contact = Contact {
            id: new_id(),
            site_id: scope.site_id.clone(),
            user_id: scope.user_id.clone(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            created_at: Utc::now(),
        };
        conn.execute(
            "INSERT INTO contacts (id, site_id, user_id, first_name, last_name, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![contact.id, contact.site_id, contact.user_id, contact.first_name,
                contact.last_name, contact.created_at.to_rfc3339()],
        )?;
        Ok(contact)
    }

    pub fn get_contact(&self, scope: &Scope, id: &str) -> Result<Contact, StorageError> {
        let conn = lock_conn(&self.conn)?;
        conn.query_row(
            "SELECT id, site_id, user_id, first_name, last_name, created_at FROM contacts \
             WHERE id = ?1 AND site_id = ?2",
            params![id, scope.site_id],
            |row| {
                let created_at: String = row.get(5)?;
                Ok(Contact {
                    id: row.get(0)?,
                    site_id: row.get(1)?,
                    user_id: row.get(2)?,
                    first_name: row.get(3)?,
                    last_name: row.get(4)?,
                    created_at: parse_ts(&created_at)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| StorageError::not_found("contact", id))
    }

    // -- opportunities --------------------------------------------------

    /// Persists a new opportunity, its account link (or brand-new account),
    /// and its permission grants as one transaction. The form must already
    /// be validated; invalid input never reaches this method.
    pub fn create_opportunity(
        &self,
        scope: &Scope,
        form: &OpportunityForm,
        account: &AccountRef,
    ) -> Result<Opportunity, StorageError> {
        let mut conn = lock_conn(&self.conn)?;
        let tx = conn.transaction()?;

        let account_id = resolve_account(&tx, scope, account)?;
        check_link(&tx, scope, "campaigns", "campaign", form.campaign_id.as_deref())?;
        check_link(&tx, scope, "contacts", "contact", form.contact_id.as_deref())?;

        let now = Utc::now();
        let opp = Opportunity {
            id: new_id(),
            site_id: scope.site_id.clone(),
            user_id: scope.user_id.clone(),
            account_id,
            campaign_id: form.campaign_id.clone(),
            contact_id: form.contact_id.clone(),
            name: form.name.trim().to_string(),
            stage: form.stage.unwrap_or(Stage::Prospecting),
            access: form.access.unwrap_or_default(),
            source: form.source.clone(),
            probability: form.probability.unwrap_or(0),
            amount: form.amount.unwrap_or(0.0),
            discount: form.discount.unwrap_or(0.0),
            closes_on: form.closes_on,
            background_info: form.background_info.clone(),
            created_at: now,
            updated_at: now,
        };
        tx.execute(
            &format!(
                "INSERT INTO opportunities ({OPPORTUNITY_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
            ),
            params![
                opp.id, opp.site_id, opp.user_id, opp.account_id, opp.campaign_id,
                opp.contact_id, opp.name, opp.stage.as_str(), opp.access.as_str(),
                opp.source, opp.probability, opp.amount, opp.discount,
                opp.closes_on.map(|d| d.to_string()), opp.background_info,
                now.to_rfc3339(), now.to_rfc3339(),
            ],
        )?;
        write_permissions(&tx, &opp.id, opp.access, &form.shared_with)?;
        tx.commit()?;
        Ok(opp)
    }

    /// Applies a form to an existing opportunity, synchronizing the account
    /// link and replacing permission grants wholesale, in one transaction.
    pub fn update_opportunity(
        &self,
        scope: &Scope,
        id: &str,
        form: &OpportunityForm,
        account: &AccountRef,
    ) -> Result<Opportunity, StorageError> {
        let mut conn = lock_conn(&self.conn)?;
        let tx = conn.transaction()?;

        let existing = get_opportunity_in(&tx, scope, id)?;
        let account_id = resolve_account(&tx, scope, account)?;
        check_link(&tx, scope, "campaigns", "campaign", form.campaign_id.as_deref())?;
        check_link(&tx, scope, "contacts", "contact", form.contact_id.as_deref())?;

        let now = Utc::now();
        // Omitted scalar fields keep their stored value; the reference
        // fields (campaign, contact, source, closes_on, background) are
        // replaced by the form as submitted.
        let updated = Opportunity {
            account_id,
            campaign_id: form.campaign_id.clone(),
            contact_id: form.contact_id.clone(),
            name: form.name.trim().to_string(),
            stage: form.stage.unwrap_or(existing.stage),
            access: form.access.unwrap_or(existing.access),
            source: form.source.clone(),
            probability: form.probability.unwrap_or(existing.probability),
            amount: form.amount.unwrap_or(existing.amount),
            discount: form.discount.unwrap_or(existing.discount),
            closes_on: form.closes_on,
            background_info: form.background_info.clone(),
            updated_at: now,
            ..existing
        };
        tx.execute(
            "UPDATE opportunities SET account_id = ?1, campaign_id = ?2, contact_id = ?3, \
                 name = ?4, stage = ?5, access = ?6, source = ?7, probability = ?8, \
                 amount = ?9, discount = ?10, closes_on = ?11, background_info = ?12, \
                 updated_at = ?13 \
             WHERE id = ?14",
            params![
                updated.account_id, updated.campaign_id, updated.contact_id, updated.name,
                updated.stage.as_str(), updated.access.as_str(), updated.source,
                updated.probability, updated.amount, updated.discount,
                updated.closes_on.map(|d| d.to_string()), updated.background_info,
                now.to_rfc3339(), updated.id,
            ],
        )?;
        tx.execute("DELETE FROM permissions WHERE opportunity_id = ?1", params![updated.id])?;
        write_permissions(&tx, &updated.id, updated.access, &form.shared_with)?;
        tx.commit()?;
        Ok(updated)
    }

    pub fn get_opportunity(&self, scope: &Scope, id: &str) -> Result<Opportunity, StorageError> {
        let conn = lock_conn(&self.conn)?;
        get_opportunity_in(&conn, scope, id)
    }

    /// Deletes the opportunity and returns the deleted record (the caller
    /// needs its name and campaign for the response).
    pub fn delete_opportunity(
        &self,
        scope: &Scope,
        id: &str,
    ) -> Result<Opportunity, StorageError> {
        let mut conn = lock_conn(&self.conn)?;
        let tx = conn.transaction()?;
        let opp = get_opportunity_in(&tx, scope, id)?;
        tx.execute("DELETE FROM permissions WHERE opportunity_id = ?1", params![opp.id])?;
        tx.execute("DELETE FROM opportunities WHERE id = ?1", params![opp.id])?;
        tx.commit()?;
        Ok(opp)
    }

    /// One page of opportunities visible to the scope, sorted, optionally
    /// stage-filtered and name-searched.
    pub fn list_opportunities(
        &self,
        scope: &Scope,
        query: &ListQuery,
    ) -> Result<Page<Opportunity>, StorageError> {
        let conn = lock_conn(&self.conn)?;
        let (filter_sql, mut values) = list_filter(scope, query);

        let total: u64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM opportunities WHERE {filter_sql}"),
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?;

        let limit_idx = values.len() + 1;
        let offset_idx = values.len() + 2;
        values.push(Value::Integer(i64::from(query.per_page)));
        values.push(Value::Integer(i64::from(query.offset())));

        let mut stmt = conn.prepare(&format!(
            "SELECT {OPPORTUNITY_COLUMNS} FROM opportunities WHERE {filter_sql} \
             ORDER BY {order} LIMIT ?{limit_idx} OFFSET ?{offset_idx}",
            order = query.sort.order_clause(),
        ))?;
        let items = stmt
            .query_map(params_from_iter(values.iter()), row_to_opportunity)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Page { items, total, page: query.page, per_page: query.per_page })
    }

    /// Per-stage counts for the sidebar, from a single grouped read so the
    /// totals are mutually consistent.
    pub fn stage_totals(&self, scope: &Scope) -> Result<StageTotals, StorageError> {
        let conn = lock_conn(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT stage, COUNT(*) FROM opportunities WHERE {VISIBLE} GROUP BY stage"
        ))?;
        let rows = stmt
            .query_map(params![scope.site_id, scope.user_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stages: BTreeMap<Stage, u64> = Stage::ALL.iter().map(|&s| (s, 0)).collect();
        let mut other = 0;
        let mut all = 0;
        for (raw, count) in rows {
            all += count;
            match raw.parse::<Stage>() {
                Ok(stage) => *stages.entry(stage).or_insert(0) += count,
                Err(_) => other += count,
            }
        }
        Ok(StageTotals { all, other, stages })
    }

    /// Whole-database row counts, for operational tooling. Deliberately
    /// unscoped.
    pub fn get_stats(&self) -> Result<crate::types::StorageStats, StorageError> {
        let conn = lock_conn(&self.conn)?;
        let count = |table: &str| -> Result<u64, StorageError> {
            Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?)
        };
        Ok(crate::types::StorageStats {
            site_count: count("sites")?,
            user_count: count("users")?,
            account_count: count("accounts")?,
            campaign_count: count("campaigns")?,
            opportunity_count: count("opportunities")?,
        })
    }

    /// User ids an opportunity is explicitly shared with.
    pub fn permitted_user_ids(&self, opportunity_id: &str) -> Result<Vec<String>, StorageError> {
        let conn = lock_conn(&self.conn)?;
        let mut stmt = conn
            .prepare("SELECT user_id FROM permissions WHERE opportunity_id = ?1 ORDER BY user_id")?;
        let ids = stmt
            .query_map(params![opportunity_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }
}

fn insert_account(
    conn: &Connection,
    scope: &Scope,
    name: &str,
) -> Result<Account, StorageError> {
    let now = Utc::now();
    let account = Account {
        id: new_id(),
        site_id: scope.site_id.clone(),
        user_id: scope.user_id.clone(),
        name: name.trim().to_string(),
        created_at: now,
        updated_at: now,
    };
    conn.execute(
        "INSERT INTO accounts (id, site_id, user_id, name, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![account.id, account.site_id, account.user_id, account.name, now.to_rfc3339()],
    )?;
    Ok(account)
}

fn get_campaign_in(conn: &Connection, scope: &Scope, id: &str) -> Result<Campaign, StorageError> {
    conn.query_row(
        "SELECT id, site_id, user_id, name, opportunities_count, revenue, created_at, updated_at \
         FROM campaigns WHERE id = ?1 AND site_id = ?2",
        params![id, scope.site_id],
        row_to_campaign,
    )
    .optional()?
    .ok_or_else(|| StorageError::not_found("campaign", id))
}

fn get_opportunity_in(
    conn: &Connection,
    scope: &Scope,
    id: &str,
) -> Result<Opportunity, StorageError> {
    conn.query_row(
        &format!("SELECT {OPPORTUNITY_COLUMNS} FROM opportunities WHERE id = ?3 AND {VISIBLE}"),
        params![scope.site_id, scope.user_id, id],
        row_to_opportunity,
    )
    .optional()?
    .ok_or_else(|| StorageError::not_found("opportunity", id))
}

/// Resolves the account side of a save: link an existing scoped account or
/// create a new one inside the caller's transaction, so an aborted save
/// never leaves an orphaned account behind.
fn resolve_account(
    tx: &Transaction<'_>,
    scope: &Scope,
    account: &AccountRef,
) -> Result<String, StorageError> {
    match account {
        AccountRef::Existing(id) => {
            let found: Option<String> = tx
                .query_row(
                    "SELECT id FROM accounts WHERE id = ?1 AND site_id = ?2",
                    params![id, scope.site_id],
                    |row| row.get(0),
                )
                .optional()?;
            found.ok_or_else(|| StorageError::not_found("account", id))
        },
        AccountRef::New(name) => Ok(insert_account(tx, scope, name)?.id),
    }
}

/// Verifies an optional campaign/contact link points at a row on the
/// scope's site.
fn check_link(
    tx: &Transaction<'_>,
    scope: &Scope,
    table: &str,
    entity: &'static str,
    id: Option<&str>,
) -> Result<(), StorageError> {
    let Some(id) = id else { return Ok(()) };
    let found: Option<String> = tx
        .query_row(
            &format!("SELECT id FROM {table} WHERE id = ?1 AND site_id = ?2"),
            params![id, scope.site_id],
            |row| row.get(0),
        )
        .optional()?;
    if found.is_none() {
        return Err(StorageError::not_found(entity, id));
    }
    Ok(())
}

fn write_permissions(
    tx: &Transaction<'_>,
    opportunity_id: &str,
    access: Access,
    shared_with: &[String],
) -> Result<(), StorageError> {
    if access != Access::Shared {
        return Ok(());
    }
    for user_id in shared_with {
        tx.execute(
            "INSERT OR IGNORE INTO permissions (opportunity_id, user_id) VALUES (?1, ?2)",
            params![opportunity_id, user_id],
        )?;
    }
    Ok(())
}

fn list_filter(scope: &Scope, query: &ListQuery) -> (String, Vec<Value>) {
    let mut sql = VISIBLE.to_string();
    let mut values = vec![
        Value::Text(scope.site_id.clone()),
        Value::Text(scope.user_id.clone()),
    ];

    if let Some(stages) = query.stages.as_deref() {
        if !stages.is_empty() {
            let placeholders: Vec<String> = stages
                .iter()
                .enumerate()
                .map(|(i, _)| format!("?{}", values.len() + 1 + i))
                .collect();
            sql.push_str(&format!(" AND stage IN ({})", placeholders.join(", ")));
            values.extend(stages.iter().map(|s| Value::Text(s.as_str().to_string())));
        }
    }

    if let Some(text) = query.query.as_deref() {
        if !text.trim().is_empty() {
            sql.push_str(&format!(" AND name LIKE ?{} ESCAPE '\\'", values.len() + 1));
            values.push(Value::Text(format!("%{}%", escape_like(text.trim()))));
        }
    }

    (sql, values)
}
