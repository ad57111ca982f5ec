//! Property-based tests for the stock ledger laws.
//!
//! Store-backed properties run each case against a fresh in-memory SQLite
//! database, so their case counts are kept small.

mod common;

use common::TestApp;
use proptest::prelude::*;
use stock_ledger_api::{
    entities::device_log::{MovementMode, QuantityDelta},
    services::ledger::MovementIntent,
};

fn mode_strategy() -> impl Strategy<Value = MovementMode> {
    prop_oneof![Just(MovementMode::Insert), Just(MovementMode::Remove)]
}

fn quantity_strategy() -> impl Strategy<Value = i64> {
    1i64..500
}

fn movements_strategy() -> impl Strategy<Value = Vec<(MovementMode, i64)>> {
    prop::collection::vec((mode_strategy(), quantity_strategy()), 0..12)
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

// Property: a delta and its inverse always cancel
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn inverse_delta_cancels(mode in mode_strategy(), qty in quantity_strategy()) {
        let delta = mode.delta(qty);
        let inverse = delta.inverse();
        prop_assert_eq!(delta.available + inverse.available, 0);
        prop_assert_eq!(delta.purchased + inverse.purchased, 0);
        prop_assert_eq!(inverse.inverse(), delta);
    }

    #[test]
    fn purchased_never_decreases_on_movement(mode in mode_strategy(), qty in quantity_strategy()) {
        let QuantityDelta { available, purchased } = mode.delta(qty);
        prop_assert!(purchased >= 0);
        prop_assert_eq!(available.abs(), qty);
    }
}

// Property: aggregates equal the signed sum of applied movements
proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn aggregate_is_signed_sum_of_movements(
        initial in quantity_strategy(),
        movements in movements_strategy(),
    ) {
        let (available, purchased, expected_available, expected_purchased) = runtime().block_on(async {
            let app = TestApp::new().await;
            let ledger = app.ledger();

            let created = ledger
                .record_movement(MovementIntent::new_device("Widget", "misc", initial), "prop")
                .await
                .unwrap();

            let mut expected_available = initial;
            let mut expected_purchased = initial;
            let mut last = created.device;
            for (mode, qty) in &movements {
                let intent = match mode {
                    MovementMode::Insert => MovementIntent::insert(created.device_id, *qty),
                    MovementMode::Remove => MovementIntent::remove(created.device_id, *qty),
                };
                last = ledger.record_movement(intent, "prop").await.unwrap().device;
                expected_available += mode.delta(*qty).available;
                expected_purchased += mode.delta(*qty).purchased;
            }
            (last.qty_available, last.qty_purchased, expected_available, expected_purchased)
        });

        prop_assert_eq!(available, expected_available);
        prop_assert_eq!(purchased, expected_purchased);
    }

    #[test]
    fn record_then_reverse_restores_aggregate(
        initial in quantity_strategy(),
        mode in mode_strategy(),
        qty in quantity_strategy(),
    ) {
        let (before, after, deleted) = runtime().block_on(async {
            let app = TestApp::new().await;
            let ledger = app.ledger();

            let created = ledger
                .record_movement(MovementIntent::new_device("Widget", "misc", initial), "prop")
                .await
                .unwrap();
            let before = (created.device.qty_available, created.device.qty_purchased);

            let intent = match mode {
                MovementMode::Insert => MovementIntent::insert(created.device_id, qty),
                MovementMode::Remove => MovementIntent::remove(created.device_id, qty),
            };
            let recorded = ledger.record_movement(intent, "prop").await.unwrap();
            let reversed = ledger.reverse_movement(recorded.devicelog_id).await.unwrap();

            let after = reversed
                .device
                .map(|d| (d.qty_available, d.qty_purchased));
            (before, after, reversed.device_deleted)
        });

        // `initial` is positive, so the reversal never crosses the cascade threshold.
        prop_assert!(!deleted);
        prop_assert_eq!(after, Some(before));
    }

    #[test]
    fn reversing_a_creating_insert_deletes_the_device(initial in quantity_strategy()) {
        let (deleted, remaining) = runtime().block_on(async {
            let app = TestApp::new().await;
            let ledger = app.ledger();

            let created = ledger
                .record_movement(MovementIntent::new_device("Widget", "misc", initial), "prop")
                .await
                .unwrap();
            let reversed = ledger.reverse_movement(created.devicelog_id).await.unwrap();
            let remaining = ledger.list_devices(1, 10).await.unwrap().total;
            (reversed.device_deleted, remaining)
        });

        prop_assert!(deleted);
        prop_assert_eq!(remaining, 0);
    }
}
