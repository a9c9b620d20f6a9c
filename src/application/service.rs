use chrono::NaiveDate;
use tracing::{debug, info};

use crate::domain::{
    AssetType, AssetTypeId, AuditEntry, Base, BaseId, BalancePolicy, CustodyPolicy,
    DashboardMetrics, DateWindow, MetricsScope, MovementDetail, MovementKind, MovementRecord,
    Quantity, RecordId, ReferenceKind, compute_metrics, normalize_reference_name,
};
use crate::storage::{RecordQuery, Repository};

use super::{AppError, RecordView, ReferenceNames};

/// Application service providing high-level operations for the ledger.
/// This is the primary interface for any client (CLI, HTTP API).
pub struct LedgerService {
    repo: Repository,
    policy: Box<dyn BalancePolicy>,
}

/// Filter for the dashboard metrics
#[derive(Debug, Clone, Default)]
pub struct MetricsFilter {
    pub base: Option<BaseId>,
    pub asset_type: Option<AssetTypeId>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

/// Filter for listing records of one kind
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    /// Any leg for transfers
    pub base: Option<BaseId>,
    pub from_base: Option<BaseId>,
    pub to_base: Option<BaseId>,
    pub asset_type: Option<AssetTypeId>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub limit: Option<usize>,
}

impl LedgerService {
    /// Create a new ledger service with the given repository and the default custody policy.
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            policy: Box::new(CustodyPolicy),
        }
    }

    /// Replace the policy used for closing balances.
    pub fn with_policy(mut self, policy: impl BalancePolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    // ========================
    // Reference data
    // ========================

    /// Register a new base.
    pub async fn create_base(&self, name: &str) -> Result<Base, AppError> {
        let name = normalize_reference_name(ReferenceKind::Base, name)?;
        if self.repo.get_base_by_name(&name).await?.is_some() {
            return Err(AppError::BaseAlreadyExists(name));
        }

        // The pre-check above can race with another writer
        let base = self
            .repo
            .save_base(&name)
            .await?
            .ok_or_else(|| AppError::BaseAlreadyExists(name.clone()))?;
        info!(id = base.id, name = %base.name, "Created base");
        Ok(base)
    }

    /// Get a base by name.
    pub async fn get_base(&self, name: &str) -> Result<Base, AppError> {
        self.repo
            .get_base_by_name(name.trim())
            .await?
            .ok_or_else(|| AppError::BaseNotFound(name.to_string()))
    }

    pub async fn list_bases(&self) -> Result<Vec<Base>, AppError> {
        Ok(self.repo.list_bases().await?)
    }

    /// Register a new asset type.
    pub async fn create_asset_type(&self, name: &str) -> Result<AssetType, AppError> {
        let name = normalize_reference_name(ReferenceKind::AssetType, name)?;
        if self.repo.get_asset_type_by_name(&name).await?.is_some() {
            return Err(AppError::AssetTypeAlreadyExists(name));
        }

        let asset_type = self
            .repo
            .save_asset_type(&name)
            .await?
            .ok_or_else(|| AppError::AssetTypeAlreadyExists(name.clone()))?;
        info!(id = asset_type.id, name = %asset_type.name, "Created asset type");
        Ok(asset_type)
    }

    /// Get an asset type by name.
    pub async fn get_asset_type(&self, name: &str) -> Result<AssetType, AppError> {
        self.repo
            .get_asset_type_by_name(name.trim())
            .await?
            .ok_or_else(|| AppError::AssetTypeNotFound(name.to_string()))
    }

    pub async fn list_asset_types(&self) -> Result<Vec<AssetType>, AppError> {
        Ok(self.repo.list_asset_types().await?)
    }

    /// Id -> name lookups for every base and asset type.
    pub async fn reference_names(&self) -> Result<ReferenceNames, AppError> {
        let bases = self.repo.list_bases().await?;
        let asset_types = self.repo.list_asset_types().await?;
        Ok(ReferenceNames::new(bases, asset_types))
    }

    async fn ensure_base(&self, id: BaseId) -> Result<(), AppError> {
        match self.repo.get_base(id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::UnknownReference {
                kind: ReferenceKind::Base,
                id,
            }),
        }
    }

    async fn ensure_asset_type(&self, id: AssetTypeId) -> Result<(), AppError> {
        match self.repo.get_asset_type(id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::UnknownReference {
                kind: ReferenceKind::AssetType,
                id,
            }),
        }
    }

    async fn ensure_references(
        &self,
        bases: &[Option<BaseId>],
        asset_type: Option<AssetTypeId>,
    ) -> Result<(), AppError> {
        for base in bases.iter().flatten() {
            self.ensure_base(*base).await?;
        }
        if let Some(asset_type) = asset_type {
            self.ensure_asset_type(asset_type).await?;
        }
        Ok(())
    }

    // ========================
    // Movement records
    // ========================

    /// Validate and append a movement record.
    /// Field validation runs before reference checks; nothing is written on failure.
    pub async fn record_movement(
        &self,
        detail: MovementDetail,
        asset_type: AssetTypeId,
        quantity: Quantity,
        date: NaiveDate,
        created_by: Option<String>,
    ) -> Result<MovementRecord, AppError> {
        let mut record =
            MovementRecord::new(asset_type, quantity, date, detail)?.with_created_by(created_by);

        let bases: Vec<Option<BaseId>> = record.detail.bases().into_iter().map(Some).collect();
        self.ensure_references(&bases, Some(record.asset_type))
            .await?;

        self.repo.save_movement(&mut record).await?;
        info!(
            kind = %record.kind(),
            id = %record.id,
            sequence = record.sequence,
            quantity = record.quantity,
            "Recorded movement"
        );
        Ok(record)
    }

    pub async fn create_purchase(
        &self,
        base: BaseId,
        asset_type: AssetTypeId,
        quantity: Quantity,
        date: NaiveDate,
        created_by: Option<String>,
    ) -> Result<MovementRecord, AppError> {
        self.record_movement(
            MovementDetail::Purchase { base },
            asset_type,
            quantity,
            date,
            created_by,
        )
        .await
    }

    pub async fn create_transfer(
        &self,
        from_base: BaseId,
        to_base: BaseId,
        asset_type: AssetTypeId,
        quantity: Quantity,
        date: NaiveDate,
        created_by: Option<String>,
    ) -> Result<MovementRecord, AppError> {
        self.record_movement(
            MovementDetail::Transfer { from_base, to_base },
            asset_type,
            quantity,
            date,
            created_by,
        )
        .await
    }

    pub async fn create_assignment(
        &self,
        personnel_name: String,
        base: BaseId,
        asset_type: AssetTypeId,
        quantity: Quantity,
        date: NaiveDate,
        created_by: Option<String>,
    ) -> Result<MovementRecord, AppError> {
        self.record_movement(
            MovementDetail::Assignment {
                base,
                personnel_name,
            },
            asset_type,
            quantity,
            date,
            created_by,
        )
        .await
    }

    pub async fn create_expenditure(
        &self,
        base: BaseId,
        asset_type: AssetTypeId,
        quantity: Quantity,
        date: NaiveDate,
        reason: Option<String>,
        created_by: Option<String>,
    ) -> Result<MovementRecord, AppError> {
        self.record_movement(
            MovementDetail::Expenditure { base, reason },
            asset_type,
            quantity,
            date,
            created_by,
        )
        .await
    }

    /// Get a single record.
    pub async fn get_record(&self, id: RecordId) -> Result<MovementRecord, AppError> {
        self.repo
            .get_movement(id)
            .await?
            .ok_or(AppError::RecordNotFound(id))
    }

    /// Denormalize a single record.
    pub async fn describe(&self, record: &MovementRecord) -> Result<RecordView, AppError> {
        let names = self.reference_names().await?;
        Ok(RecordView::new(record, &names))
    }

    /// Raw read access to the record store.
    pub async fn query_records(&self, query: &RecordQuery) -> Result<Vec<MovementRecord>, AppError> {
        Ok(self.repo.query_movements(query).await?)
    }

    /// List records of one kind with base and asset-type names filled in.
    pub async fn list_records(
        &self,
        kind: MovementKind,
        filter: RecordFilter,
    ) -> Result<Vec<RecordView>, AppError> {
        DateWindow::new(filter.date_from, filter.date_to)
            .map_err(|e| AppError::InvalidFilter(e.to_string()))?;
        self.ensure_references(
            &[filter.base, filter.from_base, filter.to_base],
            filter.asset_type,
        )
        .await?;

        let records = self
            .repo
            .query_movements(&RecordQuery {
                kind: Some(kind),
                base: filter.base,
                from_base: filter.from_base,
                to_base: filter.to_base,
                asset_type: filter.asset_type,
                date_from: filter.date_from,
                date_to: filter.date_to,
                limit: filter.limit,
            })
            .await?;

        let names = self.reference_names().await?;
        Ok(records
            .iter()
            .map(|record| RecordView::new(record, &names))
            .collect())
    }

    // ========================
    // Dashboard
    // ========================

    /// Compute the dashboard metrics for a base/asset-type slice and date window.
    pub async fn compute_metrics(&self, filter: MetricsFilter) -> Result<DashboardMetrics, AppError> {
        let window = DateWindow::new(filter.date_from, filter.date_to)
            .map_err(|e| AppError::InvalidFilter(e.to_string()))?;
        self.ensure_references(&[filter.base], filter.asset_type)
            .await?;

        // Everything up to the window's end: earlier records feed the opening balance
        let records = self
            .repo
            .query_movements(&RecordQuery {
                base: filter.base,
                asset_type: filter.asset_type,
                date_to: window.to(),
                ..Default::default()
            })
            .await?;

        let scope = MetricsScope {
            base: filter.base,
            asset_type: filter.asset_type,
            window,
        };
        let metrics = compute_metrics(&records, &scope, self.policy.as_ref());

        debug!(
            base = ?filter.base,
            asset_type = ?filter.asset_type,
            records = records.len(),
            ?metrics,
            "Computed dashboard metrics"
        );
        Ok(metrics)
    }

    // ========================
    // Audit log
    // ========================

    /// Newest entries first.
    pub async fn list_audit_log(&self, limit: Option<usize>) -> Result<Vec<AuditEntry>, AppError> {
        Ok(self.repo.list_audit_entries(limit).await?)
    }
}
