use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{
    AssetTypeId, BaseId, MovementDetail, MovementKind, MovementRecord, Quantity, ValidationError,
};

/// An inclusive date range. Either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateWindow {
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

impl DateWindow {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Self, ValidationError> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(ValidationError::InvertedDateRange { from, to });
            }
        }
        Ok(Self { from, to })
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn from(&self) -> Option<NaiveDate> {
        self.from
    }

    pub fn to(&self) -> Option<NaiveDate> {
        self.to
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
    }

    /// True when `date` falls strictly before an explicit lower bound.
    pub fn precedes(&self, date: NaiveDate) -> bool {
        self.from.is_some_and(|from| date < from)
    }
}

/// Which slice of the ledger a metrics computation looks at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsScope {
    pub base: Option<BaseId>,
    pub asset_type: Option<AssetTypeId>,
    pub window: DateWindow,
}

/// Raw quantity sums for one slice of the ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementTotals {
    pub purchased: Quantity,
    pub transferred_in: Quantity,
    pub transferred_out: Quantity,
    pub assigned: Quantity,
    pub expended: Quantity,
}

impl MovementTotals {
    /// Purchases plus incoming transfers minus outgoing transfers.
    pub fn net_movement(&self) -> Quantity {
        self.purchased + self.transferred_in - self.transferred_out
    }

    /// Add one record, counting transfer legs against the base filter.
    /// Without a base filter a transfer counts both in and out.
    fn add(&mut self, record: &MovementRecord, base: Option<BaseId>) {
        let matches = |b: BaseId| base.is_none_or(|filter| filter == b);
        let quantity = record.quantity;

        match &record.detail {
            MovementDetail::Purchase { base } if matches(*base) => self.purchased += quantity,
            MovementDetail::Transfer { from_base, to_base } => {
                if matches(*to_base) {
                    self.transferred_in += quantity;
                }
                if matches(*from_base) {
                    self.transferred_out += quantity;
                }
            }
            MovementDetail::Assignment { base, .. } if matches(*base) => {
                self.assigned += quantity
            }
            MovementDetail::Expenditure { base, .. } if matches(*base) => {
                self.expended += quantity
            }
            _ => {}
        }
    }
}

/// How each kind of movement adjusts the closing balance beyond net movement.
pub trait BalancePolicy: Send + Sync {
    fn adjustment(&self, kind: MovementKind, quantity: Quantity) -> Quantity;
}

/// Default policy: expenditures leave base custody, assignments do not.
#[derive(Debug, Clone, Copy, Default)]
pub struct CustodyPolicy;

impl BalancePolicy for CustodyPolicy {
    fn adjustment(&self, kind: MovementKind, quantity: Quantity) -> Quantity {
        match kind {
            MovementKind::Expenditure => -quantity,
            MovementKind::Purchase | MovementKind::Transfer | MovementKind::Assignment => 0,
        }
    }
}

/// The five figures shown on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardMetrics {
    pub opening_balance: Quantity,
    pub closing_balance: Quantity,
    pub net_movement: Quantity,
    pub assigned: Quantity,
    pub expended: Quantity,
}

/// Sum quantities of the records matching `scope` inside its window.
pub fn tally(records: &[MovementRecord], scope: &MetricsScope) -> MovementTotals {
    records
        .iter()
        .filter(|r| scope.asset_type.is_none_or(|at| at == r.asset_type))
        .filter(|r| scope.window.contains(r.date))
        .fold(MovementTotals::default(), |mut totals, record| {
            totals.add(record, scope.base);
            totals
        })
}

/// Compute dashboard metrics from a set of records.
///
/// Records outside the asset-type or base filter are ignored, so callers may
/// pass a superset. Opening balance is the net movement of everything before
/// the window's lower bound (zero when the window is open below). Closing
/// balance is opening plus the window's net movement plus the policy's
/// per-kind adjustments for records inside the window.
pub fn compute_metrics(
    records: &[MovementRecord],
    scope: &MetricsScope,
    policy: &dyn BalancePolicy,
) -> DashboardMetrics {
    let in_scope = |r: &&MovementRecord| scope.asset_type.is_none_or(|at| at == r.asset_type);

    let mut opening = MovementTotals::default();
    let mut window = MovementTotals::default();
    let mut adjustment: Quantity = 0;

    for record in records.iter().filter(in_scope) {
        if scope.window.precedes(record.date) {
            opening.add(record, scope.base);
        } else if scope.window.contains(record.date) {
            window.add(record, scope.base);
            adjustment += policy.adjustment(record.kind(), record.quantity);
        }
    }

    let opening_balance = opening.net_movement();
    let net_movement = window.net_movement();

    DashboardMetrics {
        opening_balance,
        closing_balance: opening_balance + net_movement + adjustment,
        net_movement,
        assigned: window.assigned,
        expended: window.expended,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: BaseId = 1;
    const B: BaseId = 2;
    const C: BaseId = 3;
    const RIFLE: AssetTypeId = 10;
    const TRUCK: AssetTypeId = 11;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn record(asset_type: AssetTypeId, quantity: Quantity, on: &str, detail: MovementDetail) -> MovementRecord {
        MovementRecord::new(asset_type, quantity, date(on), detail).unwrap()
    }

    fn purchase(base: BaseId, quantity: Quantity, on: &str) -> MovementRecord {
        record(RIFLE, quantity, on, MovementDetail::Purchase { base })
    }

    fn transfer(from_base: BaseId, to_base: BaseId, quantity: Quantity, on: &str) -> MovementRecord {
        record(RIFLE, quantity, on, MovementDetail::Transfer { from_base, to_base })
    }

    fn assignment(base: BaseId, quantity: Quantity, on: &str) -> MovementRecord {
        record(
            RIFLE,
            quantity,
            on,
            MovementDetail::Assignment {
                base,
                personnel_name: "Sgt. Reyes".into(),
            },
        )
    }

    fn expenditure(base: BaseId, quantity: Quantity, on: &str) -> MovementRecord {
        record(RIFLE, quantity, on, MovementDetail::Expenditure { base, reason: None })
    }

    fn january(base: Option<BaseId>) -> MetricsScope {
        MetricsScope {
            base,
            asset_type: None,
            window: DateWindow::new(Some(date("2024-01-01")), Some(date("2024-01-31"))).unwrap(),
        }
    }

    fn sample_ledger() -> Vec<MovementRecord> {
        vec![
            purchase(A, 100, "2024-01-01"),
            expenditure(A, 30, "2024-01-05"),
            transfer(A, B, 20, "2024-01-10"),
        ]
    }

    #[test]
    fn test_window_rejects_inverted_range() {
        let result = DateWindow::new(Some(date("2024-02-01")), Some(date("2024-01-01")));
        assert!(matches!(result, Err(ValidationError::InvertedDateRange { .. })));
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let window = DateWindow::new(Some(date("2024-01-01")), Some(date("2024-01-31"))).unwrap();
        assert!(window.contains(date("2024-01-01")));
        assert!(window.contains(date("2024-01-31")));
        assert!(!window.contains(date("2024-02-01")));
        assert!(window.precedes(date("2023-12-31")));
        assert!(!window.precedes(date("2024-01-01")));
    }

    #[test]
    fn test_unbounded_window_never_precedes() {
        let window = DateWindow::unbounded();
        assert!(window.contains(date("1990-01-01")));
        assert!(!window.precedes(date("1990-01-01")));
    }

    #[test]
    fn test_empty_ledger_yields_zero_metrics() {
        let metrics = compute_metrics(&[], &january(Some(A)), &CustodyPolicy);
        assert_eq!(metrics, DashboardMetrics::default());
    }

    #[test]
    fn test_purchase_and_expenditure_at_one_base() {
        let records = vec![purchase(A, 100, "2024-01-01"), expenditure(A, 30, "2024-01-05")];

        let metrics = compute_metrics(&records, &january(Some(A)), &CustodyPolicy);

        assert_eq!(metrics.opening_balance, 0);
        assert_eq!(metrics.net_movement, 100);
        assert_eq!(metrics.expended, 30);
        assert_eq!(metrics.closing_balance, 70);
    }

    #[test]
    fn test_transfer_counts_against_each_leg() {
        let records = sample_ledger();

        let at_b = compute_metrics(&records, &january(Some(B)), &CustodyPolicy);
        assert_eq!(at_b.net_movement, 20);
        assert_eq!(at_b.closing_balance, 20);

        let at_a = compute_metrics(&records, &january(Some(A)), &CustodyPolicy);
        assert_eq!(at_a.net_movement, 80);
        assert_eq!(at_a.closing_balance, 50);
    }

    #[test]
    fn test_transfers_net_to_zero_fleet_wide() {
        let records = vec![
            transfer(A, B, 20, "2024-01-10"),
            transfer(B, C, 5, "2024-01-11"),
            transfer(C, A, 7, "2024-01-12"),
        ];

        let totals = tally(&records, &january(None));
        assert_eq!(totals.transferred_in, 32);
        assert_eq!(totals.transferred_out, 32);
        assert_eq!(totals.net_movement(), 0);
    }

    #[test]
    fn test_assignments_do_not_reduce_closing_balance() {
        let records = vec![purchase(A, 50, "2024-01-02"), assignment(A, 10, "2024-01-03")];

        let metrics = compute_metrics(&records, &january(Some(A)), &CustodyPolicy);

        assert_eq!(metrics.assigned, 10);
        assert_eq!(metrics.closing_balance, 50);
    }

    #[test]
    fn test_opening_balance_counts_records_before_window() {
        let records = vec![
            purchase(A, 40, "2023-12-15"),
            transfer(A, B, 15, "2023-12-20"),
            expenditure(A, 5, "2023-12-21"),
            purchase(A, 10, "2024-01-15"),
        ];

        let metrics = compute_metrics(&records, &january(Some(A)), &CustodyPolicy);

        assert_eq!(metrics.opening_balance, 25);
        assert_eq!(metrics.net_movement, 10);
        assert_eq!(metrics.closing_balance, 35);
    }

    #[test]
    fn test_open_lower_bound_has_zero_opening_balance() {
        let records = vec![purchase(A, 40, "2020-06-01"), purchase(A, 10, "2024-01-15")];
        let scope = MetricsScope {
            base: Some(A),
            asset_type: None,
            window: DateWindow::new(None, Some(date("2024-01-31"))).unwrap(),
        };

        let metrics = compute_metrics(&records, &scope, &CustodyPolicy);

        assert_eq!(metrics.opening_balance, 0);
        assert_eq!(metrics.net_movement, 50);
    }

    #[test]
    fn test_records_after_window_are_ignored() {
        let records = vec![purchase(A, 40, "2024-02-01")];
        let metrics = compute_metrics(&records, &january(Some(A)), &CustodyPolicy);
        assert_eq!(metrics, DashboardMetrics::default());
    }

    #[test]
    fn test_asset_type_filter() {
        let records = vec![
            purchase(A, 40, "2024-01-02"),
            record(TRUCK, 3, "2024-01-02", MovementDetail::Purchase { base: A }),
        ];
        let scope = MetricsScope {
            asset_type: Some(TRUCK),
            ..january(Some(A))
        };

        let metrics = compute_metrics(&records, &scope, &CustodyPolicy);
        assert_eq!(metrics.net_movement, 3);

        let all_types = compute_metrics(&records, &january(Some(A)), &CustodyPolicy);
        assert_eq!(all_types.net_movement, 43);
    }

    #[test]
    fn test_closing_balance_identity_holds() {
        let records = vec![
            purchase(A, 40, "2023-12-15"),
            purchase(B, 12, "2024-01-03"),
            transfer(A, B, 15, "2024-01-20"),
            expenditure(B, 4, "2024-01-21"),
            assignment(A, 9, "2024-01-22"),
            expenditure(A, 2, "2024-01-30"),
        ];

        for base in [None, Some(A), Some(B), Some(C)] {
            let m = compute_metrics(&records, &january(base), &CustodyPolicy);
            assert_eq!(m.closing_balance, m.opening_balance + m.net_movement - m.expended);
        }
    }

    struct ConsumingPolicy;

    impl BalancePolicy for ConsumingPolicy {
        fn adjustment(&self, kind: MovementKind, quantity: Quantity) -> Quantity {
            match kind {
                MovementKind::Assignment | MovementKind::Expenditure => -quantity,
                _ => 0,
            }
        }
    }

    #[test]
    fn test_custom_policy_changes_closing_balance_only() {
        let records = vec![
            purchase(A, 50, "2024-01-02"),
            assignment(A, 10, "2024-01-03"),
            expenditure(A, 5, "2024-01-04"),
        ];

        let metrics = compute_metrics(&records, &january(Some(A)), &ConsumingPolicy);

        assert_eq!(metrics.net_movement, 50);
        assert_eq!(metrics.assigned, 10);
        assert_eq!(metrics.expended, 5);
        assert_eq!(metrics.closing_balance, 35);
    }
}
