use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{
    AssetType, AssetTypeId, AuditAction, AuditEntry, Base, BaseId, MovementDetail, MovementKind,
    MovementRecord, RecordId,
};

use super::MIGRATION_001_INITIAL;

const MOVEMENT_COLUMNS: &str = "id, sequence, kind, asset_type_id, quantity, date, base_id, from_base_id, to_base_id, personnel_name, reason, created_by, recorded_at";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Filters for reading movement records. Unset fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
    pub kind: Option<MovementKind>,
    /// Matches the base of a purchase, assignment or expenditure, and either leg of a transfer
    pub base: Option<BaseId>,
    pub from_base: Option<BaseId>,
    pub to_base: Option<BaseId>,
    pub asset_type: Option<AssetTypeId>,
    /// Inclusive lower bound
    pub date_from: Option<NaiveDate>,
    /// Inclusive upper bound
    pub date_to: Option<NaiveDate>,
    pub limit: Option<usize>,
}

/// Repository for reference data, movement records and the audit log.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations. Safe to run more than once.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Reference data
    // ========================

    /// Insert a base. Returns `None` when the name is already taken.
    pub async fn save_base(&self, name: &str) -> Result<Option<Base>> {
        let id = self.insert_reference("bases", name).await?;
        Ok(id.map(|id| Base {
            id,
            name: name.to_string(),
        }))
    }

    pub async fn get_base(&self, id: BaseId) -> Result<Option<Base>> {
        let row = self.fetch_reference_by_id("bases", id).await?;
        Ok(row.map(|(id, name)| Base { id, name }))
    }

    pub async fn get_base_by_name(&self, name: &str) -> Result<Option<Base>> {
        let row = self.fetch_reference_by_name("bases", name).await?;
        Ok(row.map(|(id, name)| Base { id, name }))
    }

    pub async fn list_bases(&self) -> Result<Vec<Base>> {
        let rows = self.list_reference("bases").await?;
        Ok(rows.into_iter().map(|(id, name)| Base { id, name }).collect())
    }

    /// Insert an asset type. Returns `None` when the name is already taken.
    pub async fn save_asset_type(&self, name: &str) -> Result<Option<AssetType>> {
        let id = self.insert_reference("asset_types", name).await?;
        Ok(id.map(|id| AssetType {
            id,
            name: name.to_string(),
        }))
    }

    pub async fn get_asset_type(&self, id: AssetTypeId) -> Result<Option<AssetType>> {
        let row = self.fetch_reference_by_id("asset_types", id).await?;
        Ok(row.map(|(id, name)| AssetType { id, name }))
    }

    pub async fn get_asset_type_by_name(&self, name: &str) -> Result<Option<AssetType>> {
        let row = self.fetch_reference_by_name("asset_types", name).await?;
        Ok(row.map(|(id, name)| AssetType { id, name }))
    }

    pub async fn list_asset_types(&self) -> Result<Vec<AssetType>> {
        let rows = self.list_reference("asset_types").await?;
        Ok(rows
            .into_iter()
            .map(|(id, name)| AssetType { id, name })
            .collect())
    }

    async fn insert_reference(&self, table: &str, name: &str) -> Result<Option<i64>> {
        let sql = format!("INSERT INTO {} (name) VALUES (?)", table);
        let result = sqlx::query(&sql).bind(name).execute(&self.pool).await;

        match result {
            Ok(done) => Ok(Some(done.last_insert_rowid())),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to save {} entry", table)),
        }
    }

    async fn fetch_reference_by_id(&self, table: &str, id: i64) -> Result<Option<(i64, String)>> {
        let sql = format!("SELECT id, name FROM {} WHERE id = ?", table);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to fetch {} entry", table))?;
        Ok(row.map(|row| (row.get("id"), row.get("name"))))
    }

    async fn fetch_reference_by_name(
        &self,
        table: &str,
        name: &str,
    ) -> Result<Option<(i64, String)>> {
        let sql = format!("SELECT id, name FROM {} WHERE name = ?", table);
        let row = sqlx::query(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to fetch {} entry by name", table))?;
        Ok(row.map(|row| (row.get("id"), row.get("name"))))
    }

    async fn list_reference(&self, table: &str) -> Result<Vec<(i64, String)>> {
        let sql = format!("SELECT id, name FROM {} ORDER BY name", table);
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to list {}", table))?;
        Ok(rows
            .iter()
            .map(|row| (row.get("id"), row.get("name")))
            .collect())
    }

    // ========================
    // Movement records
    // ========================

    /// Append a movement and its audit entry in one transaction.
    /// Assigns the next sequence number to the record.
    pub async fn save_movement(&self, record: &mut MovementRecord) -> Result<AuditEntry> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let row = sqlx::query(
            r#"
            UPDATE sequence_counter
            SET value = value + 1
            WHERE name = 'movement_sequence'
            RETURNING value
            "#,
        )
        .fetch_one(&mut *tx)
        .await
        .context("Failed to get next sequence number")?;
        record.sequence = row.get("value");

        let (base_id, from_base_id, to_base_id, personnel_name, reason) = match &record.detail {
            MovementDetail::Purchase { base } => (Some(*base), None, None, None, None),
            MovementDetail::Transfer { from_base, to_base } => {
                (None, Some(*from_base), Some(*to_base), None, None)
            }
            MovementDetail::Assignment {
                base,
                personnel_name,
            } => (Some(*base), None, None, Some(personnel_name.as_str()), None),
            MovementDetail::Expenditure { base, reason } => {
                (Some(*base), None, None, None, reason.as_deref())
            }
        };

        let sql = format!(
            "INSERT INTO movements ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            MOVEMENT_COLUMNS
        );
        sqlx::query(&sql)
            .bind(record.id.to_string())
            .bind(record.sequence)
            .bind(record.kind().as_str())
            .bind(record.asset_type)
            .bind(record.quantity)
            .bind(record.date.format(DATE_FORMAT).to_string())
            .bind(base_id)
            .bind(from_base_id)
            .bind(to_base_id)
            .bind(personnel_name)
            .bind(reason)
            .bind(&record.created_by)
            .bind(record.recorded_at.to_rfc3339())
            .execute(&mut *tx)
            .await
            .context("Failed to save movement")?;

        let entry = AuditEntry::for_record(record).context("Failed to serialize audit details")?;
        sqlx::query(
            r#"
            INSERT INTO audit_log (id, action, details, username, timestamp)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(entry.action.as_str())
        .bind(entry.details.to_string())
        .bind(&entry.user)
        .bind(entry.timestamp.to_rfc3339())
        .execute(&mut *tx)
        .await
        .context("Failed to save audit entry")?;

        tx.commit().await.context("Failed to commit movement")?;
        Ok(entry)
    }

    /// Get a movement by ID.
    pub async fn get_movement(&self, id: RecordId) -> Result<Option<MovementRecord>> {
        let sql = format!("SELECT {} FROM movements WHERE id = ?", MOVEMENT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch movement")?;

        row.as_ref().map(Self::row_to_movement).transpose()
    }

    /// List movements matching the query, ordered by sequence number.
    pub async fn query_movements(&self, filter: &RecordQuery) -> Result<Vec<MovementRecord>> {
        let mut query = format!("SELECT {} FROM movements WHERE 1=1", MOVEMENT_COLUMNS);

        // Collect string bindings first so they live long enough
        let date_from_str = filter.date_from.map(|d| d.format(DATE_FORMAT).to_string());
        let date_to_str = filter.date_to.map(|d| d.format(DATE_FORMAT).to_string());

        if filter.kind.is_some() {
            query.push_str(" AND kind = ?");
        }
        if filter.base.is_some() {
            query.push_str(" AND (base_id = ? OR from_base_id = ? OR to_base_id = ?)");
        }
        if filter.from_base.is_some() {
            query.push_str(" AND from_base_id = ?");
        }
        if filter.to_base.is_some() {
            query.push_str(" AND to_base_id = ?");
        }
        if filter.asset_type.is_some() {
            query.push_str(" AND asset_type_id = ?");
        }
        if date_from_str.is_some() {
            query.push_str(" AND date >= ?");
        }
        if date_to_str.is_some() {
            query.push_str(" AND date <= ?");
        }

        query.push_str(" ORDER BY sequence");

        if let Some(lim) = filter.limit {
            query.push_str(&format!(" LIMIT {}", lim));
        }

        let mut sql_query = sqlx::query(&query);

        if let Some(kind) = filter.kind {
            sql_query = sql_query.bind(kind.as_str());
        }
        if let Some(base) = filter.base {
            sql_query = sql_query.bind(base).bind(base).bind(base);
        }
        if let Some(from_base) = filter.from_base {
            sql_query = sql_query.bind(from_base);
        }
        if let Some(to_base) = filter.to_base {
            sql_query = sql_query.bind(to_base);
        }
        if let Some(asset_type) = filter.asset_type {
            sql_query = sql_query.bind(asset_type);
        }
        if let Some(ref from) = date_from_str {
            sql_query = sql_query.bind(from);
        }
        if let Some(ref to) = date_to_str {
            sql_query = sql_query.bind(to);
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to query movements")?;

        rows.iter().map(Self::row_to_movement).collect()
    }

    fn row_to_movement(row: &sqlx::sqlite::SqliteRow) -> Result<MovementRecord> {
        let id_str: String = row.get("id");
        let kind_str: String = row.get("kind");
        let date_str: String = row.get("date");
        let recorded_at_str: String = row.get("recorded_at");
        let base_id: Option<i64> = row.get("base_id");

        let kind = MovementKind::from_str(&kind_str)
            .ok_or_else(|| anyhow::anyhow!("Invalid movement kind: {}", kind_str))?;

        let detail = match kind {
            MovementKind::Purchase => MovementDetail::Purchase {
                base: required(base_id, "base_id")?,
            },
            MovementKind::Transfer => MovementDetail::Transfer {
                from_base: required(row.get("from_base_id"), "from_base_id")?,
                to_base: required(row.get("to_base_id"), "to_base_id")?,
            },
            MovementKind::Assignment => MovementDetail::Assignment {
                base: required(base_id, "base_id")?,
                personnel_name: required(row.get("personnel_name"), "personnel_name")?,
            },
            MovementKind::Expenditure => MovementDetail::Expenditure {
                base: required(base_id, "base_id")?,
                reason: row.get("reason"),
            },
        };

        Ok(MovementRecord {
            id: Uuid::parse_str(&id_str).context("Invalid movement ID")?,
            sequence: row.get("sequence"),
            asset_type: row.get("asset_type_id"),
            quantity: row.get("quantity"),
            date: NaiveDate::parse_from_str(&date_str, DATE_FORMAT)
                .context("Invalid movement date")?,
            recorded_at: DateTime::parse_from_rfc3339(&recorded_at_str)
                .context("Invalid recorded_at")?
                .with_timezone(&Utc),
            created_by: row.get("created_by"),
            detail,
        })
    }

    // ========================
    // Audit log
    // ========================

    /// List audit entries, newest first.
    pub async fn list_audit_entries(&self, limit: Option<usize>) -> Result<Vec<AuditEntry>> {
        let mut query = String::from(
            "SELECT id, action, details, username, timestamp FROM audit_log ORDER BY rowid DESC",
        );
        if let Some(lim) = limit {
            query.push_str(&format!(" LIMIT {}", lim));
        }

        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list audit entries")?;

        rows.iter().map(Self::row_to_audit_entry).collect()
    }

    fn row_to_audit_entry(row: &sqlx::sqlite::SqliteRow) -> Result<AuditEntry> {
        let id_str: String = row.get("id");
        let action_str: String = row.get("action");
        let details_json: String = row.get("details");
        let timestamp_str: String = row.get("timestamp");

        Ok(AuditEntry {
            id: Uuid::parse_str(&id_str).context("Invalid audit entry ID")?,
            action: AuditAction::from_str(&action_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid audit action: {}", action_str))?,
            details: serde_json::from_str(&details_json).context("Invalid audit details")?,
            user: row.get("username"),
            timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                .context("Invalid audit timestamp")?
                .with_timezone(&Utc),
        })
    }
}

fn required<T>(value: Option<T>, column: &str) -> Result<T> {
    value.ok_or_else(|| anyhow::anyhow!("Movement row is missing {}", column))
}
