//! Property-based tests for the bin model and field mappers.
//!
//! These tests use proptest to check mapping and validation invariants over
//! generated bins rather than a handful of fixtures.

use bin_lookup_api::{
    mapping::{
        odata::{compose_location, decompose_location},
        FieldMapper, LocalBinMapper, ODataBinMapper,
    },
    models::{validate, Bin, BinStatistics, BinStatus, NewBin, PartialBin},
    repositories::{BinOperations, BinRepository},
    source::LocalBinStore,
};
use chrono::{TimeZone, Utc};
use proptest::prelude::*;

// Strategies for generating test data
fn status_strategy() -> impl Strategy<Value = BinStatus> {
    prop_oneof![Just(BinStatus::Active), Just(BinStatus::Inactive)]
}

fn stocked_strategy() -> impl Strategy<Value = (u32, u32)> {
    (0u32..1_000_000).prop_flat_map(|capacity| (Just(capacity), 0..=capacity))
}

fn bin_strategy() -> impl Strategy<Value = Bin> {
    (
        "[A-Z]{3}-[0-9]{1,6}",
        "[A-Z0-9]{1,4}",
        "[A-Z0-9]{1,4}",
        stocked_strategy(),
        status_strategy(),
        "[0-9]{6,13}",
        0i64..4_000_000_000,
    )
        .prop_map(
            |(bin_number, warehouse, storage_type, (capacity, current_stock), status, barcode, secs)| {
                let created_at = Utc.timestamp_opt(secs, 0).unwrap();
                Bin {
                    id: bin_number.clone(),
                    bin_number,
                    location: compose_location(&warehouse, &storage_type),
                    capacity,
                    current_stock,
                    status,
                    barcode,
                    created_at,
                    last_updated: created_at,
                }
            },
        )
}

// Property: mapping to a source record and back keeps the canonical fields
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn local_mapping_is_lossless(bin in bin_strategy()) {
        let mapper = LocalBinMapper;
        let back = mapper.to_canonical(&mapper.to_source(&bin)).unwrap();
        prop_assert_eq!(back, bin);
    }

    #[test]
    fn odata_mapping_keeps_everything_but_barcode(bin in bin_strategy()) {
        let mapper = ODataBinMapper;
        let back = mapper.to_canonical(&mapper.to_source(&bin)).unwrap();

        prop_assert_eq!(&back.bin_number, &bin.bin_number);
        prop_assert_eq!(&back.id, &bin.bin_number);
        prop_assert_eq!(&back.barcode, &bin.bin_number);
        prop_assert_eq!(&back.location, &bin.location);
        prop_assert_eq!(back.capacity, bin.capacity);
        prop_assert_eq!(back.current_stock, bin.current_stock);
        prop_assert_eq!(back.status, bin.status);
        prop_assert_eq!(back.created_at, bin.created_at);
    }

    #[test]
    fn location_split_inverts_compose(warehouse in "[A-Za-z0-9 ]{1,12}", storage_type in "[A-Z0-9]{1,6}") {
        prop_assume!(!warehouse.contains(" - "));
        let location = compose_location(&warehouse, &storage_type);
        prop_assert_eq!(decompose_location(&location), (warehouse, storage_type));
    }
}

// Property: stock never exceeds capacity on any accepted write
proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn over_capacity_creates_are_rejected(capacity in 0u32..10_000, excess in 1u32..10_000) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let repo = BinRepository::new(LocalBinStore::new());

        let result = runtime.block_on(
            repo.create(NewBin::new("BIN-P", "Aisle P", capacity).with_stock(capacity + excess)),
        );
        prop_assert!(result.is_err(), "stock {} over capacity {} accepted", capacity + excess, capacity);
        prop_assert_eq!(runtime.block_on(repo.source().len()), 0);
    }

    #[test]
    fn accepted_updates_respect_capacity(
        (capacity, stock) in stocked_strategy(),
        new_capacity in proptest::option::of(0u32..1_000_000),
        new_stock in proptest::option::of(0u32..1_000_000),
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let repo = BinRepository::new(LocalBinStore::new());

        let created = runtime
            .block_on(repo.create(NewBin::new("BIN-P", "Aisle P", capacity).with_stock(stock)))
            .unwrap();
        let partial = PartialBin {
            capacity: new_capacity,
            current_stock: new_stock,
            ..Default::default()
        };

        match runtime.block_on(repo.update(&created.id, partial)) {
            Ok(updated) => prop_assert!(validate(&updated).is_ok()),
            Err(_) => {
                let stored = runtime.block_on(repo.get_by_id(&created.id)).unwrap();
                prop_assert_eq!(stored, created);
            }
        }
    }
}

// Property: utilization is a percentage with two decimals
proptest! {
    #[test]
    fn utilization_stays_within_bounds(bins in proptest::collection::vec(bin_strategy(), 0..20)) {
        let stats = BinStatistics::from_bins(&bins);
        prop_assert!((0.0..=100.0).contains(&stats.utilization_percentage));
        prop_assert_eq!(stats.active_bins + stats.inactive_bins, stats.total_bins);
        let scaled = stats.utilization_percentage * 100.0;
        prop_assert!((scaled - scaled.round()).abs() < 1e-6);
    }
}
