// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::NaiveDate;
use quartermaster::application::LedgerService;
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Helper to parse a date string into NaiveDate
pub fn parse_date(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
}

/// Test fixture: two bases and two asset types
pub struct Fixture {
    pub alpha: i64,
    pub bravo: i64,
    pub rifle: i64,
    pub radio: i64,
}

impl Fixture {
    /// Create bases Alpha and Bravo, asset types Rifle and Radio
    pub async fn create(service: &LedgerService) -> Result<Self> {
        let alpha = service.create_base("Alpha").await?.id;
        let bravo = service.create_base("Bravo").await?.id;
        let rifle = service.create_asset_type("Rifle").await?.id;
        let radio = service.create_asset_type("Radio").await?.id;
        Ok(Self {
            alpha,
            bravo,
            rifle,
            radio,
        })
    }

    /// Ledger used across the dashboard tests:
    /// purchase 100 rifles at Alpha, transfer 20 to Bravo, expend 30 at Alpha, assign 10 at Bravo
    pub async fn seed_rifles(&self, service: &LedgerService) -> Result<()> {
        service
            .create_purchase(self.alpha, self.rifle, 100, parse_date("2024-01-05"), None)
            .await?;
        service
            .create_transfer(
                self.alpha,
                self.bravo,
                self.rifle,
                20,
                parse_date("2024-01-10"),
                None,
            )
            .await?;
        service
            .create_expenditure(
                self.alpha,
                self.rifle,
                30,
                parse_date("2024-01-15"),
                Some("Training".into()),
                None,
            )
            .await?;
        service
            .create_assignment(
                "Sgt. Reyes".into(),
                self.bravo,
                self.rifle,
                10,
                parse_date("2024-01-20"),
                None,
            )
            .await?;
        Ok(())
    }
}
