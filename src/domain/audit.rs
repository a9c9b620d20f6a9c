use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{MovementKind, MovementRecord};

pub type AuditEntryId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditAction {
    Purchase,
    Transfer,
    Assign,
    Expend,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Purchase => "PURCHASE",
            AuditAction::Transfer => "TRANSFER",
            AuditAction::Assign => "ASSIGN",
            AuditAction::Expend => "EXPEND",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PURCHASE" => Some(AuditAction::Purchase),
            "TRANSFER" => Some(AuditAction::Transfer),
            "ASSIGN" => Some(AuditAction::Assign),
            "EXPEND" => Some(AuditAction::Expend),
            _ => None,
        }
    }
}

impl From<MovementKind> for AuditAction {
    fn from(kind: MovementKind) -> Self {
        match kind {
            MovementKind::Purchase => AuditAction::Purchase,
            MovementKind::Transfer => AuditAction::Transfer,
            MovementKind::Assignment => AuditAction::Assign,
            MovementKind::Expenditure => AuditAction::Expend,
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One line of the transaction log. Written in the same transaction as the
/// record it describes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditEntryId,
    pub action: AuditAction,
    /// Snapshot of the created record
    pub details: serde_json::Value,
    pub user: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    pub fn for_record(record: &MovementRecord) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: Uuid::new_v4(),
            action: record.kind().into(),
            details: serde_json::to_value(record)?,
            user: record.created_by.clone(),
            timestamp: record.recorded_at,
        })
    }
}
