use chrono::NaiveDate;
use thiserror::Error;

use super::{BaseId, Quantity, ReferenceKind};

/// Field-level problems detected before anything is written or aggregated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Quantity must be a positive integer, got {0}")]
    NonPositiveQuantity(Quantity),

    #[error("Quantity {quantity} exceeds the maximum of {max}")]
    QuantityTooLarge { quantity: Quantity, max: Quantity },

    #[error("Transfer source and destination must be different bases (both are {0})")]
    SameBaseTransfer(BaseId),

    #[error("Personnel name must not be empty")]
    EmptyPersonnelName,

    #[error("The {0} name must not be empty")]
    EmptyName(ReferenceKind),

    #[error("date_from ({from}) must not be after date_to ({to})")]
    InvertedDateRange { from: NaiveDate, to: NaiveDate },
}
