use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AssetTypeId, BaseId, ValidationError};

pub type RecordId = Uuid;

/// Stock is counted in whole units. Signed so that bad input can be
/// rejected with a validation error instead of a parse failure.
pub type Quantity = i64;

/// Largest quantity a single record may carry. Keeps ledger-wide sums far
/// from `i64` overflow.
pub const MAX_QUANTITY: Quantity = 1_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    Purchase,
    Transfer,
    Assignment,
    Expenditure,
}

impl MovementKind {
    pub const ALL: [MovementKind; 4] = [
        MovementKind::Purchase,
        MovementKind::Transfer,
        MovementKind::Assignment,
        MovementKind::Expenditure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Purchase => "purchase",
            MovementKind::Transfer => "transfer",
            MovementKind::Assignment => "assignment",
            MovementKind::Expenditure => "expenditure",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "purchase" => Some(MovementKind::Purchase),
            "transfer" => Some(MovementKind::Transfer),
            "assignment" => Some(MovementKind::Assignment),
            "expenditure" => Some(MovementKind::Expenditure),
            _ => None,
        }
    }
}

impl std::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The kind-specific part of a movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MovementDetail {
    /// New stock acquired at a base.
    Purchase { base: BaseId },
    /// Stock moved between two distinct bases.
    Transfer { from_base: BaseId, to_base: BaseId },
    /// Stock handed to personnel; it stays in the base's custody.
    Assignment { base: BaseId, personnel_name: String },
    /// Stock consumed or lost.
    Expenditure {
        base: BaseId,
        reason: Option<String>,
    },
}

impl MovementDetail {
    pub fn kind(&self) -> MovementKind {
        match self {
            MovementDetail::Purchase { .. } => MovementKind::Purchase,
            MovementDetail::Transfer { .. } => MovementKind::Transfer,
            MovementDetail::Assignment { .. } => MovementKind::Assignment,
            MovementDetail::Expenditure { .. } => MovementKind::Expenditure,
        }
    }

    /// Every base this movement references.
    pub fn bases(&self) -> Vec<BaseId> {
        match self {
            MovementDetail::Transfer { from_base, to_base } => vec![*from_base, *to_base],
            MovementDetail::Purchase { base }
            | MovementDetail::Assignment { base, .. }
            | MovementDetail::Expenditure { base, .. } => vec![*base],
        }
    }

    fn validate(self) -> Result<Self, ValidationError> {
        match self {
            MovementDetail::Purchase { .. } => Ok(self),
            MovementDetail::Transfer { from_base, to_base } => {
                if from_base == to_base {
                    return Err(ValidationError::SameBaseTransfer(from_base));
                }
                Ok(self)
            }
            MovementDetail::Assignment {
                base,
                personnel_name,
            } => {
                let personnel_name = personnel_name.trim().to_string();
                if personnel_name.is_empty() {
                    return Err(ValidationError::EmptyPersonnelName);
                }
                Ok(MovementDetail::Assignment {
                    base,
                    personnel_name,
                })
            }
            MovementDetail::Expenditure { base, reason } => Ok(MovementDetail::Expenditure {
                base,
                reason: reason
                    .map(|r| r.trim().to_string())
                    .filter(|r| !r.is_empty()),
            }),
        }
    }
}

/// An immutable entry in the movement ledger.
/// Records are append-only: they are never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRecord {
    pub id: RecordId,
    /// Insertion order, assigned by the repository
    pub sequence: i64,
    pub asset_type: AssetTypeId,
    pub quantity: Quantity,
    /// When the movement happened
    pub date: NaiveDate,
    /// When the movement was written to the ledger
    pub recorded_at: DateTime<Utc>,
    /// Operator that recorded the movement
    pub created_by: Option<String>,
    #[serde(flatten)]
    pub detail: MovementDetail,
}

impl MovementRecord {
    /// Validate and build a new record. Sequence number must be assigned by the repository.
    pub fn new(
        asset_type: AssetTypeId,
        quantity: Quantity,
        date: NaiveDate,
        detail: MovementDetail,
    ) -> Result<Self, ValidationError> {
        if quantity <= 0 {
            return Err(ValidationError::NonPositiveQuantity(quantity));
        }
        if quantity > MAX_QUANTITY {
            return Err(ValidationError::QuantityTooLarge {
                quantity,
                max: MAX_QUANTITY,
            });
        }
        let detail = detail.validate()?;

        Ok(Self {
            id: Uuid::new_v4(),
            sequence: 0,
            asset_type,
            quantity,
            date,
            recorded_at: Utc::now(),
            created_by: None,
            detail,
        })
    }

    pub fn with_created_by(mut self, created_by: Option<String>) -> Self {
        self.created_by = created_by.filter(|u| !u.trim().is_empty());
        self
    }

    pub fn kind(&self) -> MovementKind {
        self.detail.kind()
    }
}
