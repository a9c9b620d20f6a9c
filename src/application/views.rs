use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{
    AssetType, AssetTypeId, Base, BaseId, MovementDetail, MovementKind, MovementRecord, Quantity,
    RecordId,
};

/// Id -> name lookups used to denormalize records for display.
#[derive(Debug, Clone, Default)]
pub struct ReferenceNames {
    bases: HashMap<BaseId, String>,
    asset_types: HashMap<AssetTypeId, String>,
}

impl ReferenceNames {
    pub fn new(bases: Vec<Base>, asset_types: Vec<AssetType>) -> Self {
        Self {
            bases: bases.into_iter().map(|b| (b.id, b.name)).collect(),
            asset_types: asset_types.into_iter().map(|t| (t.id, t.name)).collect(),
        }
    }

    pub fn base(&self, id: BaseId) -> String {
        self.bases.get(&id).cloned().unwrap_or_else(|| "?".into())
    }

    pub fn asset_type(&self, id: AssetTypeId) -> String {
        self.asset_types
            .get(&id)
            .cloned()
            .unwrap_or_else(|| "?".into())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseView {
    pub id: RecordId,
    pub sequence: i64,
    pub base: BaseId,
    pub base_name: String,
    pub asset_type: AssetTypeId,
    pub asset_type_name: String,
    pub quantity: Quantity,
    pub date: NaiveDate,
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferView {
    pub id: RecordId,
    pub sequence: i64,
    pub from_base: BaseId,
    pub from_base_name: String,
    pub to_base: BaseId,
    pub to_base_name: String,
    pub asset_type: AssetTypeId,
    pub asset_type_name: String,
    pub quantity: Quantity,
    pub date: NaiveDate,
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentView {
    pub id: RecordId,
    pub sequence: i64,
    pub personnel_name: String,
    pub base: BaseId,
    pub base_name: String,
    pub asset_type: AssetTypeId,
    pub asset_type_name: String,
    pub quantity: Quantity,
    pub date: NaiveDate,
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenditureView {
    pub id: RecordId,
    pub sequence: i64,
    pub base: BaseId,
    pub base_name: String,
    pub asset_type: AssetTypeId,
    pub asset_type_name: String,
    pub quantity: Quantity,
    pub date: NaiveDate,
    /// Empty when no reason was given
    pub reason: String,
    pub created_by: Option<String>,
}

/// A movement record with base and asset-type names filled in.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RecordView {
    Purchase(PurchaseView),
    Transfer(TransferView),
    Assignment(AssignmentView),
    Expenditure(ExpenditureView),
}

impl RecordView {
    pub fn new(record: &MovementRecord, names: &ReferenceNames) -> Self {
        let asset_type_name = names.asset_type(record.asset_type);

        match &record.detail {
            MovementDetail::Purchase { base } => RecordView::Purchase(PurchaseView {
                id: record.id,
                sequence: record.sequence,
                base: *base,
                base_name: names.base(*base),
                asset_type: record.asset_type,
                asset_type_name,
                quantity: record.quantity,
                date: record.date,
                created_by: record.created_by.clone(),
            }),
            MovementDetail::Transfer { from_base, to_base } => RecordView::Transfer(TransferView {
                id: record.id,
                sequence: record.sequence,
                from_base: *from_base,
                from_base_name: names.base(*from_base),
                to_base: *to_base,
                to_base_name: names.base(*to_base),
                asset_type: record.asset_type,
                asset_type_name,
                quantity: record.quantity,
                date: record.date,
                created_by: record.created_by.clone(),
            }),
            MovementDetail::Assignment {
                base,
                personnel_name,
            } => RecordView::Assignment(AssignmentView {
                id: record.id,
                sequence: record.sequence,
                personnel_name: personnel_name.clone(),
                base: *base,
                base_name: names.base(*base),
                asset_type: record.asset_type,
                asset_type_name,
                quantity: record.quantity,
                date: record.date,
                created_by: record.created_by.clone(),
            }),
            MovementDetail::Expenditure { base, reason } => {
                RecordView::Expenditure(ExpenditureView {
                    id: record.id,
                    sequence: record.sequence,
                    base: *base,
                    base_name: names.base(*base),
                    asset_type: record.asset_type,
                    asset_type_name,
                    quantity: record.quantity,
                    date: record.date,
                    reason: reason.clone().unwrap_or_default(),
                    created_by: record.created_by.clone(),
                })
            }
        }
    }

    pub fn kind(&self) -> MovementKind {
        match self {
            RecordView::Purchase(_) => MovementKind::Purchase,
            RecordView::Transfer(_) => MovementKind::Transfer,
            RecordView::Assignment(_) => MovementKind::Assignment,
            RecordView::Expenditure(_) => MovementKind::Expenditure,
        }
    }

    pub fn quantity(&self) -> Quantity {
        match self {
            RecordView::Purchase(v) => v.quantity,
            RecordView::Transfer(v) => v.quantity,
            RecordView::Assignment(v) => v.quantity,
            RecordView::Expenditure(v) => v.quantity,
        }
    }
}
