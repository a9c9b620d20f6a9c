mod common;

use anyhow::Result;
use common::{Fixture, parse_date, test_service};
use quartermaster::application::{AppError, RecordFilter, RecordView};
use quartermaster::domain::{AuditAction, MovementKind, ReferenceKind, ValidationError};
use quartermaster::storage::{RecordQuery, Repository};
use tempfile::TempDir;

#[tokio::test]
async fn test_reference_data_is_unique_and_sorted() -> Result<()> {
    let (service, _temp) = test_service().await?;

    service.create_base("Charlie").await?;
    service.create_base("  Alpha  ").await?;

    let duplicate = service.create_base("Alpha").await;
    assert!(matches!(duplicate, Err(AppError::BaseAlreadyExists(_))));

    let empty = service.create_asset_type("   ").await;
    assert!(matches!(
        empty,
        Err(AppError::Validation(ValidationError::EmptyName(
            ReferenceKind::AssetType
        )))
    ));

    let names: Vec<String> = service
        .list_bases()
        .await?
        .into_iter()
        .map(|b| b.name)
        .collect();
    assert_eq!(names, vec!["Alpha", "Charlie"]);

    assert!(matches!(
        service.get_base("Delta").await,
        Err(AppError::BaseNotFound(_))
    ));

    Ok(())
}

#[tokio::test]
async fn test_create_records_assigns_increasing_sequence() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = Fixture::create(&service).await?;

    let purchase = service
        .create_purchase(
            fx.alpha,
            fx.rifle,
            50,
            parse_date("2024-02-01"),
            Some("quartermaster".into()),
        )
        .await?;
    let transfer = service
        .create_transfer(fx.alpha, fx.bravo, fx.rifle, 5, parse_date("2024-02-02"), None)
        .await?;

    assert!(transfer.sequence > purchase.sequence);
    assert_eq!(purchase.created_by.as_deref(), Some("quartermaster"));

    let loaded = service.get_record(purchase.id).await?;
    assert_eq!(loaded.id, purchase.id);
    assert_eq!(loaded.quantity, 50);
    assert_eq!(loaded.date, parse_date("2024-02-01"));
    assert_eq!(loaded.kind(), MovementKind::Purchase);

    Ok(())
}

#[tokio::test]
async fn test_invalid_records_leave_ledger_untouched() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = Fixture::create(&service).await?;
    let date = parse_date("2024-03-01");

    let zero = service
        .create_purchase(fx.alpha, fx.rifle, 0, date, None)
        .await;
    assert!(matches!(
        zero,
        Err(AppError::Validation(ValidationError::NonPositiveQuantity(0)))
    ));

    let negative = service
        .create_expenditure(fx.alpha, fx.rifle, -3, date, None, None)
        .await;
    assert!(matches!(
        negative,
        Err(AppError::Validation(ValidationError::NonPositiveQuantity(-3)))
    ));

    let same_base = service
        .create_transfer(fx.alpha, fx.alpha, fx.rifle, 10, date, None)
        .await;
    assert!(matches!(
        same_base,
        Err(AppError::Validation(ValidationError::SameBaseTransfer(_)))
    ));

    let nobody = service
        .create_assignment("  ".into(), fx.alpha, fx.rifle, 1, date, None)
        .await;
    assert!(matches!(
        nobody,
        Err(AppError::Validation(ValidationError::EmptyPersonnelName))
    ));

    let unknown_base = service
        .create_purchase(999, fx.rifle, 10, date, None)
        .await;
    assert!(matches!(
        unknown_base,
        Err(AppError::UnknownReference {
            kind: ReferenceKind::Base,
            id: 999
        })
    ));

    let unknown_type = service
        .create_purchase(fx.alpha, 999, 10, date, None)
        .await;
    assert!(matches!(
        unknown_type,
        Err(AppError::UnknownReference {
            kind: ReferenceKind::AssetType,
            ..
        })
    ));

    let stored = service.query_records(&RecordQuery::default()).await?;
    assert!(stored.is_empty());
    assert!(service.list_audit_log(None).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_list_records_fills_in_names() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = Fixture::create(&service).await?;
    fx.seed_rifles(&service).await?;

    let transfers = service
        .list_records(MovementKind::Transfer, RecordFilter::default())
        .await?;
    assert_eq!(transfers.len(), 1);
    match &transfers[0] {
        RecordView::Transfer(t) => {
            assert_eq!(t.from_base_name, "Alpha");
            assert_eq!(t.to_base_name, "Bravo");
            assert_eq!(t.asset_type_name, "Rifle");
            assert_eq!(t.quantity, 20);
        }
        other => panic!("expected a transfer, got {:?}", other),
    }

    let expenditures = service
        .list_records(MovementKind::Expenditure, RecordFilter::default())
        .await?;
    match &expenditures[0] {
        RecordView::Expenditure(e) => assert_eq!(e.reason, "Training"),
        other => panic!("expected an expenditure, got {:?}", other),
    }

    let assignments = service
        .list_records(MovementKind::Assignment, RecordFilter::default())
        .await?;
    match &assignments[0] {
        RecordView::Assignment(a) => {
            assert_eq!(a.personnel_name, "Sgt. Reyes");
            assert_eq!(a.base_name, "Bravo");
        }
        other => panic!("expected an assignment, got {:?}", other),
    }

    Ok(())
}

#[tokio::test]
async fn test_list_records_filters() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = Fixture::create(&service).await?;
    fx.seed_rifles(&service).await?;
    service
        .create_purchase(fx.bravo, fx.radio, 7, parse_date("2024-02-01"), None)
        .await?;
    service
        .create_transfer(fx.bravo, fx.alpha, fx.radio, 2, parse_date("2024-02-03"), None)
        .await?;

    let at_bravo = service
        .list_records(
            MovementKind::Purchase,
            RecordFilter {
                base: Some(fx.bravo),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(at_bravo.len(), 1);
    assert_eq!(at_bravo[0].quantity(), 7);

    // Base filter matches either leg of a transfer
    let touching_alpha = service
        .list_records(
            MovementKind::Transfer,
            RecordFilter {
                base: Some(fx.alpha),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(touching_alpha.len(), 2);

    let out_of_alpha = service
        .list_records(
            MovementKind::Transfer,
            RecordFilter {
                from_base: Some(fx.alpha),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(out_of_alpha.len(), 1);
    assert_eq!(out_of_alpha[0].quantity(), 20);

    let in_february = service
        .list_records(
            MovementKind::Transfer,
            RecordFilter {
                date_from: Some(parse_date("2024-02-01")),
                date_to: Some(parse_date("2024-02-28")),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(in_february.len(), 1);
    assert_eq!(in_february[0].quantity(), 2);

    let radios = service
        .list_records(
            MovementKind::Purchase,
            RecordFilter {
                asset_type: Some(fx.radio),
                ..Default::default()
            },
        )
        .await?;
    assert!(radios.iter().all(|r| r.kind() == MovementKind::Purchase));
    assert_eq!(radios.len(), 1);

    let limited = service
        .list_records(
            MovementKind::Transfer,
            RecordFilter {
                limit: Some(1),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(limited.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_list_records_rejects_bad_filters() -> Result<()> {
    let (service, _temp) = test_service().await?;
    Fixture::create(&service).await?;

    let inverted = service
        .list_records(
            MovementKind::Purchase,
            RecordFilter {
                date_from: Some(parse_date("2024-02-01")),
                date_to: Some(parse_date("2024-01-01")),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(inverted, Err(AppError::InvalidFilter(_))));

    let unknown = service
        .list_records(
            MovementKind::Purchase,
            RecordFilter {
                base: Some(404),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(unknown, Err(AppError::UnknownReference { .. })));

    Ok(())
}

#[tokio::test]
async fn test_audit_log_records_every_movement() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let fx = Fixture::create(&service).await?;

    let purchase = service
        .create_purchase(
            fx.alpha,
            fx.rifle,
            12,
            parse_date("2024-04-01"),
            Some("sgt.major".into()),
        )
        .await?;
    service
        .create_expenditure(
            fx.alpha,
            fx.rifle,
            2,
            parse_date("2024-04-02"),
            None,
            None,
        )
        .await?;

    let entries = service.list_audit_log(None).await?;
    assert_eq!(entries.len(), 2);

    // Newest first
    assert_eq!(entries[0].action, AuditAction::Expend);
    assert_eq!(entries[1].action, AuditAction::Purchase);
    assert_eq!(entries[1].user.as_deref(), Some("sgt.major"));
    assert_eq!(entries[1].details["id"], purchase.id.to_string());
    assert_eq!(entries[1].details["quantity"], 12);

    let latest = service.list_audit_log(Some(1)).await?;
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].action, AuditAction::Expend);

    Ok(())
}

#[tokio::test]
async fn test_concurrent_duplicate_names_report_already_exists() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let (first, second) = tokio::join!(service.create_base("Delta"), service.create_base("Delta"));
    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(AppError::BaseAlreadyExists(name)) if name == "Delta"))
    );

    let (first, second) = tokio::join!(
        service.create_asset_type("Radio"),
        service.create_asset_type("Radio")
    );
    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(AppError::AssetTypeAlreadyExists(_))))
    );

    assert_eq!(service.list_bases().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_repository_reports_taken_names() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("repo.db");
    let repo = Repository::init(&format!("sqlite:{}?mode=rwc", db_path.display())).await?;

    assert!(repo.save_base("Echo").await?.is_some());
    assert!(repo.save_base("Echo").await?.is_none());
    assert!(repo.save_asset_type("Flare").await?.is_some());
    assert!(repo.save_asset_type("Flare").await?.is_none());

    Ok(())
}
