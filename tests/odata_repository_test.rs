mod common;

use assert_matches::assert_matches;
use bin_lookup_api::{
    errors::{ServiceError, ValidationError},
    models::{BinStatus, NewBin, PartialBin},
    queries::ListQuery,
    repositories::{BinOperations, BinRepository},
    source::{LocalBinStore, SourceError},
};

use common::{bin_a001, seed, statistics_fixture, FakeODataSource};

fn repository() -> BinRepository<FakeODataSource> {
    BinRepository::new(FakeODataSource::new())
}

#[tokio::test]
async fn storage_bin_is_both_id_and_barcode() {
    let repo = repository();
    let created = repo.create(bin_a001()).await.unwrap();

    assert_eq!(created.id, "BIN-A001");
    assert_eq!(created.bin_number, "BIN-A001");
    // No distinct barcode column: the supplied barcode does not survive.
    assert_eq!(created.barcode, "BIN-A001");
    assert_eq!(created.location, "Aisle A - Row 1");
    assert_eq!(created.capacity, 1000);
    assert_eq!(created.current_stock, 750);

    assert_eq!(repo.get_by_barcode("BIN-A001").await.unwrap(), created);
    assert_matches!(
        repo.get_by_barcode("1234567890").await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn records_use_s4hana_encodings() {
    let repo = repository();
    repo.create(NewBin::new("01-02-03", "WH01", 40).with_status(BinStatus::Inactive))
        .await
        .unwrap();

    let records = repo.source().records().await;
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.storage_bin, "01-02-03");
    assert_eq!(record.warehouse, "WH01");
    assert_eq!(record.storage_type, "BULK");
    assert_eq!(record.blocking_indicator, "X");
    assert!(record
        .creation_date_time
        .as_deref()
        .is_some_and(|value| value.starts_with("/Date(")));

    let bin = repo.get_by_id("01-02-03").await.unwrap();
    assert_eq!(bin.location, "WH01 - BULK");
    assert_eq!(bin.status, BinStatus::Inactive);
}

#[tokio::test]
async fn status_filter_goes_through_blocking_indicator() {
    let repo = repository();
    seed(&repo, statistics_fixture()).await;

    let inactive = repo
        .list(&ListQuery::new().with_status(BinStatus::Inactive))
        .await
        .unwrap();
    assert_eq!(inactive.len(), 1);
    assert_eq!(inactive[0].bin_number, "BIN-D004");

    let stats = repo.statistics().await.unwrap();
    assert_eq!(stats.total_bins, 4);
    assert_eq!(stats.utilization_percentage, 61.43);
}

#[tokio::test]
async fn search_matches_warehouse_or_storage_type() {
    let repo = repository();
    seed(&repo, statistics_fixture()).await;

    let hits = repo.list(&ListQuery::new().with_search("row 3")).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].bin_number, "BIN-B002");
}

#[tokio::test]
async fn full_location_search_matches_like_the_local_store() {
    let odata = repository();
    let local = BinRepository::new(LocalBinStore::new());
    odata.create(bin_a001()).await.unwrap();
    local.create(bin_a001()).await.unwrap();

    for search in ["aisle a - row 1", "Aisle A - Row", "a - r"] {
        let query = ListQuery::new().with_search(search);
        let odata_hits = odata.list(&query).await.unwrap();
        let local_hits = local.list(&query).await.unwrap();
        assert_eq!(odata_hits.len(), 1, "odata search {search:?}");
        assert_eq!(local_hits.len(), 1, "local search {search:?}");
        assert_eq!(odata_hits[0].location, local_hits[0].location);
    }

    let misses = odata
        .list(&ListQuery::new().with_search("aisle a - row 2"))
        .await
        .unwrap();
    assert!(misses.is_empty());
}

#[tokio::test]
async fn duplicate_storage_bin_is_rejected() {
    let repo = repository();
    repo.create(bin_a001()).await.unwrap();

    assert_matches!(
        repo.create(NewBin::new("BIN-A001", "WH02", 1)).await,
        Err(ServiceError::DuplicateBinNumber(_))
    );
}

#[tokio::test]
async fn over_capacity_update_is_rejected_before_write() {
    let repo = repository();
    repo.create(bin_a001()).await.unwrap();
    let before = repo.source().records().await;

    let err = repo
        .update(
            "BIN-A001",
            PartialBin {
                capacity: Some(500),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_matches!(
        err,
        ServiceError::Validation(ValidationError::StockExceedsCapacity { .. })
    );
    assert_eq!(repo.source().records().await, before);
}

#[tokio::test]
async fn update_rewrites_location_sub_fields() {
    let repo = repository();
    repo.create(bin_a001()).await.unwrap();

    let updated = repo
        .update(
            "BIN-A001",
            PartialBin {
                location: Some("WH09 - 0020".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.location, "WH09 - 0020");

    let record = repo.source().records().await.remove(0);
    assert_eq!(record.warehouse, "WH09");
    assert_eq!(record.storage_type, "0020");
}

#[tokio::test]
async fn overlong_storage_bin_is_invalid_id() {
    let repo = repository();
    assert_matches!(
        repo.get_by_id("THIS-ID-IS-FAR-TOO-LONG").await,
        Err(ServiceError::InvalidId(_))
    );
    assert_matches!(repo.get_by_id("BIN-404").await, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn source_failures_surface_as_unavailable() {
    let repo = repository();
    repo.source().set_unavailable(true);

    assert_matches!(
        repo.list(&ListQuery::new()).await,
        Err(ServiceError::SourceUnavailable(SourceError::UnexpectedStatus { status: 503, .. }))
    );
    assert_matches!(
        repo.create(bin_a001()).await,
        Err(ServiceError::SourceUnavailable(_))
    );
    assert_matches!(repo.statistics().await, Err(ServiceError::SourceUnavailable(_)));
}
