//! Integration tests for the ledger pipeline.
//!
//! Tests: append → sum / depletion run → ledger / session close → adjustments
//!
//! Verifies:
//! - the additivity invariant of `sum_deltas`
//! - correction protocol atomicity and audit trail
//! - depletion idempotency and mapping fan-out
//! - reconciliation threshold gating and close-once semantics

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use tapledger_core::{DomainError, InventoryItemId, ItemInfo, LocationId, SalesLineId, Uom};
    use tapledger_depletion::{
        DepletionEngine, ItemMapping, MappingMode, RecipeIngredient, RecordKind, SalesLine,
    };
    use tapledger_ledger::{
        ConfidenceLevel, EventFilter, EventType, LedgerStore, NewEvent, SourceSystem, TimeWindow,
        VarianceReason, correct_event,
    };
    use tapledger_sessions::{ActualValue, ReconcileEngine, ReconcilePolicy, SessionStore};

    use crate::catalog::InMemoryItemCatalog;
    use crate::ledger_store::InMemoryLedgerStore;
    use crate::mappings::{InMemoryMappingResolver, InMemorySalesLines, MappingRow};
    use crate::session_store::InMemorySessionStore;

    fn ts(day_offset: u64, hour: u32) -> DateTime<Utc> {
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap() + Days::new(day_offset);
        Utc.from_utc_datetime(&date.and_hms_opt(hour, 0, 0).unwrap())
    }

    fn seed_item(catalog: &InMemoryItemCatalog, location_id: LocationId, name: &str) -> InventoryItemId {
        let id = InventoryItemId::new();
        catalog.insert(ItemInfo {
            id,
            location_id,
            name: name.to_string(),
            base_uom: Uom::Units,
            pack_size: Some(dec!(24)),
            active: true,
        });
        id
    }

    fn receive(
        ledger: &InMemoryLedgerStore,
        location_id: LocationId,
        item_id: InventoryItemId,
        qty: Decimal,
        at: DateTime<Utc>,
    ) {
        ledger
            .append(
                NewEvent::new(
                    location_id,
                    item_id,
                    EventType::Receiving,
                    qty,
                    Uom::Units,
                    at,
                    ConfidenceLevel::Measured,
                )
                .with_notes("delivery"),
            )
            .unwrap();
    }

    fn sale(
        ledger: &InMemoryLedgerStore,
        location_id: LocationId,
        item_id: InventoryItemId,
        qty: Decimal,
        at: DateTime<Utc>,
    ) {
        ledger
            .append(NewEvent::new(
                location_id,
                item_id,
                EventType::PosSale,
                -qty,
                Uom::Units,
                at,
                ConfidenceLevel::Theoretical,
            ))
            .unwrap();
    }

    fn packaged_sale_line(
        location_id: LocationId,
        pos_item_id: &str,
        qty: Decimal,
        at: DateTime<Utc>,
    ) -> SalesLine {
        SalesLine {
            id: SalesLineId::new(),
            location_id,
            source_system: SourceSystem::Toast,
            kind: RecordKind::Sale,
            pos_item_id: pos_item_id.to_string(),
            pos_item_name: format!("item {pos_item_id}"),
            quantity: qty,
            sold_at: at,
            receipt_id: Some("r-1".to_string()),
            is_voided: false,
            is_refunded: false,
        }
    }

    fn packaged_mapping(
        location_id: LocationId,
        pos_item_id: &str,
        item_id: InventoryItemId,
    ) -> MappingRow {
        MappingRow {
            location_id,
            source_system: SourceSystem::Toast,
            pos_item_id: pos_item_id.to_string(),
            mapping: ItemMapping {
                mode: MappingMode::PackagedUnit { item_id },
            },
            active: true,
            effective_from: ts(0, 0),
            effective_to: None,
        }
    }

    // ---- ledger ----

    #[test]
    fn basic_depletion_scenario() {
        let ledger = InMemoryLedgerStore::new();
        let location_id = LocationId::new();
        let item_id = InventoryItemId::new();

        receive(&ledger, location_id, item_id, dec!(24), ts(0, 9));
        sale(&ledger, location_id, item_id, dec!(1), ts(1, 18));

        let on_hand = ledger
            .sum_deltas(item_id, TimeWindow::as_of(ts(1, 23)))
            .unwrap();
        assert_eq!(on_hand, dec!(23));
    }

    #[test]
    fn sum_deltas_is_windowed_on_event_ts() {
        let ledger = InMemoryLedgerStore::new();
        let location_id = LocationId::new();
        let item_id = InventoryItemId::new();

        receive(&ledger, location_id, item_id, dec!(24), ts(0, 9));
        sale(&ledger, location_id, item_id, dec!(1), ts(1, 18));

        // Before the sale, only the delivery counts.
        assert_eq!(
            ledger.sum_deltas(item_id, TimeWindow::as_of(ts(1, 0))).unwrap(),
            dec!(24)
        );
        // The bound is inclusive.
        assert_eq!(
            ledger.sum_deltas(item_id, TimeWindow::as_of(ts(1, 18))).unwrap(),
            dec!(23)
        );
    }

    #[test]
    fn zero_delta_append_is_rejected_before_write() {
        let ledger = InMemoryLedgerStore::new();
        let location_id = LocationId::new();
        let item_id = InventoryItemId::new();

        let err = ledger
            .append(NewEvent::new(
                location_id,
                item_id,
                EventType::ManualAdjustment,
                Decimal::ZERO,
                Uom::Units,
                ts(0, 9),
                ConfidenceLevel::Estimated,
            ))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(ledger.list(&EventFilter::for_item(item_id)).unwrap().is_empty());
    }

    #[test]
    fn batch_append_is_all_or_nothing() {
        let ledger = InMemoryLedgerStore::new();
        let location_id = LocationId::new();
        let item_id = InventoryItemId::new();

        let good = NewEvent::new(
            location_id,
            item_id,
            EventType::ManualAdjustment,
            dec!(5),
            Uom::Units,
            ts(0, 9),
            ConfidenceLevel::Estimated,
        );
        let bad = NewEvent::new(
            location_id,
            item_id,
            EventType::ManualAdjustment,
            Decimal::ZERO,
            Uom::Units,
            ts(0, 10),
            ConfidenceLevel::Estimated,
        );

        assert!(ledger.append_batch(vec![good, bad]).is_err());
        assert!(ledger.list(&EventFilter::for_item(item_id)).unwrap().is_empty());
    }

    proptest! {
        /// Additivity invariant: `sum_deltas(as_of = T)` equals the manual sum
        /// of every delta with `event_ts <= T`, whatever the event types.
        #[test]
        fn additivity_invariant(
            deltas in proptest::collection::vec((-50i64..50).prop_filter("non-zero", |d| *d != 0), 1..40),
            cutoff_day in 0u64..40,
        ) {
            let ledger = InMemoryLedgerStore::new();
            let location_id = LocationId::new();
            let item_id = InventoryItemId::new();

            let types = [
                EventType::PosSale,
                EventType::Receiving,
                EventType::Transfer,
                EventType::InventoryCountAdjustment,
                EventType::ManualAdjustment,
            ];

            let mut expected = Decimal::ZERO;
            for (idx, delta) in deltas.iter().enumerate() {
                let day = (idx % 40) as u64;
                let delta = Decimal::from(*delta);
                ledger.append(NewEvent::new(
                    location_id,
                    item_id,
                    types[idx % types.len()],
                    delta,
                    Uom::Units,
                    ts(day, 12),
                    ConfidenceLevel::Estimated,
                )).unwrap();
                if day <= cutoff_day {
                    expected += delta;
                }
            }

            let summed = ledger
                .sum_deltas(item_id, TimeWindow::as_of(ts(cutoff_day, 23)))
                .unwrap();
            prop_assert_eq!(summed, expected);
        }
    }

    // ---- corrections ----

    #[test]
    fn correction_round_trip() {
        let ledger = InMemoryLedgerStore::new();
        let location_id = LocationId::new();
        let item_id = InventoryItemId::new();

        receive(&ledger, location_id, item_id, dec!(24), ts(0, 9));
        let original = ledger
            .append(NewEvent::new(
                location_id,
                item_id,
                EventType::PosSale,
                dec!(-10),
                Uom::Units,
                ts(1, 18),
                ConfidenceLevel::Theoretical,
            ))
            .unwrap();

        let outcome =
            correct_event(&ledger, original.id, dec!(-12), Uom::Units, "miskeyed pour", ts(2, 9))
                .unwrap();

        // Net effect equals having written -12 in the first place.
        let on_hand = ledger.sum_deltas(item_id, TimeWindow::all()).unwrap();
        assert_eq!(on_hand, dec!(12));

        // The original row is untouched; the reversal references it.
        let stored = ledger.get(original.id).unwrap().unwrap();
        assert_eq!(stored.quantity_delta, dec!(-10));
        assert!(stored.reversal_of_event_id.is_none());

        let reversal = ledger.get(outcome.reversal_id).unwrap().unwrap();
        assert_eq!(reversal.reversal_of_event_id, Some(original.id));
        assert_eq!(reversal.quantity_delta, dec!(10));

        let replacement = ledger.get(outcome.replacement_id).unwrap().unwrap();
        assert_eq!(replacement.quantity_delta, dec!(-12));
        assert!(replacement.reversal_of_event_id.is_none());
    }

    #[test]
    fn correcting_twice_is_blocked() {
        let ledger = InMemoryLedgerStore::new();
        let location_id = LocationId::new();
        let item_id = InventoryItemId::new();

        let original = ledger
            .append(NewEvent::new(
                location_id,
                item_id,
                EventType::PosSale,
                dec!(-10),
                Uom::Units,
                ts(1, 18),
                ConfidenceLevel::Theoretical,
            ))
            .unwrap();

        correct_event(&ledger, original.id, dec!(-12), Uom::Units, "fix", ts(2, 9)).unwrap();
        let err =
            correct_event(&ledger, original.id, dec!(-11), Uom::Units, "fix again", ts(2, 10))
                .unwrap_err();
        assert!(matches!(err, DomainError::PreconditionFailed(_)));
    }

    #[test]
    fn correcting_missing_event_is_not_found() {
        let ledger = InMemoryLedgerStore::new();
        let err = correct_event(
            &ledger,
            tapledger_core::EventId::new(),
            dec!(-1),
            Uom::Units,
            "nope",
            ts(0, 0),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn corrected_view_hides_reversal_pairs_but_on_hand_keeps_them() {
        let ledger = InMemoryLedgerStore::new();
        let location_id = LocationId::new();
        let item_id = InventoryItemId::new();

        receive(&ledger, location_id, item_id, dec!(24), ts(0, 9));
        let original = ledger
            .append(NewEvent::new(
                location_id,
                item_id,
                EventType::PosSale,
                dec!(-10),
                Uom::Units,
                ts(1, 18),
                ConfidenceLevel::Theoretical,
            ))
            .unwrap();
        let outcome =
            correct_event(&ledger, original.id, dec!(-12), Uom::Units, "fix", ts(2, 9)).unwrap();

        let corrected = ledger
            .list(&EventFilter::for_item(item_id).corrected())
            .unwrap();
        let ids: Vec<_> = corrected.iter().map(|e| e.id).collect();
        assert!(!ids.contains(&original.id));
        assert!(!ids.contains(&outcome.reversal_id));
        assert!(ids.contains(&outcome.replacement_id));

        // Full history still nets to the corrected value.
        assert_eq!(ledger.sum_deltas(item_id, TimeWindow::all()).unwrap(), dec!(12));
    }

    // ---- depletion runs ----

    #[test]
    fn unmapped_sales_scenario() {
        let ledger = InMemoryLedgerStore::new();
        let sales = InMemorySalesLines::new();
        let mappings = InMemoryMappingResolver::new();
        let location_id = LocationId::new();

        for i in 0..10 {
            sales.insert(packaged_sale_line(location_id, &format!("pos-{i}"), dec!(1), ts(1, 12)));
        }
        // Map only 7 of the 10 POS items.
        for i in 0..7 {
            let item_id = InventoryItemId::new();
            mappings.insert(packaged_mapping(location_id, &format!("pos-{i}"), item_id));
        }

        let engine = DepletionEngine::new(&ledger, &sales, &mappings);
        let stats = engine.run(location_id, ts(1, 0), ts(2, 0), None).unwrap();

        assert_eq!(stats.processed, 10);
        assert_eq!(stats.created, 7);
        assert_eq!(stats.unmapped, 3);
        assert_eq!(stats.skipped, 0);

        // Re-running the same window is idempotent: the depleted records are
        // skipped, the unmapped ones stay unmapped.
        let again = engine.run(location_id, ts(1, 0), ts(2, 0), None).unwrap();
        assert_eq!(again.processed, 3);
        assert_eq!(again.created, 0);
        assert_eq!(again.unmapped, 3);
        assert_eq!(again.skipped, 7);
    }

    #[test]
    fn voided_records_do_not_deplete() {
        let ledger = InMemoryLedgerStore::new();
        let sales = InMemorySalesLines::new();
        let mappings = InMemoryMappingResolver::new();
        let location_id = LocationId::new();
        let item_id = InventoryItemId::new();

        let mut line = packaged_sale_line(location_id, "pos-void", dec!(2), ts(1, 12));
        line.is_voided = true;
        sales.insert(line);
        mappings.insert(packaged_mapping(location_id, "pos-void", item_id));

        let engine = DepletionEngine::new(&ledger, &sales, &mappings);
        let stats = engine.run(location_id, ts(1, 0), ts(2, 0), None).unwrap();

        assert_eq!(stats.processed, 1);
        assert_eq!(stats.created, 0);
        assert!(ledger.list(&EventFilter::for_item(item_id)).unwrap().is_empty());
    }

    #[test]
    fn recipe_mapping_fans_out_scaled_events() {
        let ledger = InMemoryLedgerStore::new();
        let sales = InMemorySalesLines::new();
        let mappings = InMemoryMappingResolver::new();
        let location_id = LocationId::new();
        let gin = InventoryItemId::new();
        let vermouth = InventoryItemId::new();

        sales.insert(packaged_sale_line(location_id, "martini", dec!(2), ts(1, 20)));
        mappings.insert(MappingRow {
            location_id,
            source_system: SourceSystem::Toast,
            pos_item_id: "martini".to_string(),
            mapping: ItemMapping {
                mode: MappingMode::Recipe {
                    ingredients: vec![
                        RecipeIngredient {
                            item_id: gin,
                            quantity_per_serving: dec!(2.5),
                            uom: Uom::Oz,
                        },
                        RecipeIngredient {
                            item_id: vermouth,
                            quantity_per_serving: dec!(0.5),
                            uom: Uom::Oz,
                        },
                    ],
                },
            },
            active: true,
            effective_from: ts(0, 0),
            effective_to: None,
        });

        let engine = DepletionEngine::new(&ledger, &sales, &mappings);
        let stats = engine.run(location_id, ts(1, 0), ts(2, 0), None).unwrap();
        assert_eq!(stats.created, 2);

        assert_eq!(
            ledger.sum_deltas(gin, TimeWindow::all()).unwrap(),
            dec!(-5.0)
        );
        assert_eq!(
            ledger.sum_deltas(vermouth, TimeWindow::all()).unwrap(),
            dec!(-1.0)
        );
    }

    #[test]
    fn draft_mapping_depletes_ounces_per_pour() {
        let ledger = InMemoryLedgerStore::new();
        let sales = InMemorySalesLines::new();
        let mappings = InMemoryMappingResolver::new();
        let location_id = LocationId::new();
        let keg_item = InventoryItemId::new();

        sales.insert(packaged_sale_line(location_id, "ipa-pint", dec!(2), ts(1, 19)));
        mappings.insert(MappingRow {
            location_id,
            source_system: SourceSystem::Toast,
            pos_item_id: "ipa-pint".to_string(),
            mapping: ItemMapping {
                mode: MappingMode::DraftByTap {
                    item_id: keg_item,
                    oz_per_pour: dec!(16),
                },
            },
            active: true,
            effective_from: ts(0, 0),
            effective_to: None,
        });

        let engine = DepletionEngine::new(&ledger, &sales, &mappings);
        engine.run(location_id, ts(1, 0), ts(2, 0), None).unwrap();

        let events = ledger.list(&EventFilter::for_item(keg_item)).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].quantity_delta, dec!(-32));
        assert_eq!(events[0].uom, Uom::Oz);
        assert_eq!(events[0].event_type, EventType::PosSale);
    }

    #[test]
    fn mapping_effective_range_is_checked_at_record_time() {
        let ledger = InMemoryLedgerStore::new();
        let sales = InMemorySalesLines::new();
        let mappings = InMemoryMappingResolver::new();
        let location_id = LocationId::new();
        let item_id = InventoryItemId::new();

        sales.insert(packaged_sale_line(location_id, "pos-1", dec!(1), ts(1, 12)));
        // Mapping only becomes effective after the sale.
        let mut row = packaged_mapping(location_id, "pos-1", item_id);
        row.effective_from = ts(2, 0);
        mappings.insert(row);

        let engine = DepletionEngine::new(&ledger, &sales, &mappings);
        let stats = engine.run(location_id, ts(1, 0), ts(2, 0), None).unwrap();
        assert_eq!(stats.unmapped, 1);
        assert_eq!(stats.created, 0);
    }

    #[test]
    fn expired_deadline_returns_partial_progress() {
        let ledger = InMemoryLedgerStore::new();
        let sales = InMemorySalesLines::new();
        let mappings = InMemoryMappingResolver::new();
        let location_id = LocationId::new();
        let item_id = InventoryItemId::new();

        sales.insert(packaged_sale_line(location_id, "pos-1", dec!(1), ts(1, 12)));
        mappings.insert(packaged_mapping(location_id, "pos-1", item_id));

        let engine = DepletionEngine::new(&ledger, &sales, &mappings);
        // Deadline already passed: the run stops before the first record.
        let stats = engine
            .run(location_id, ts(1, 0), ts(2, 0), Some(ts(0, 0)))
            .unwrap();
        assert_eq!(stats.processed, 0);
        assert_eq!(stats.created, 0);
        assert!(ledger.list(&EventFilter::for_item(item_id)).unwrap().is_empty());
    }

    // ---- sessions ----

    struct SessionFixture {
        ledger: InMemoryLedgerStore,
        sessions: InMemorySessionStore,
        catalog: InMemoryItemCatalog,
        location_id: LocationId,
    }

    impl SessionFixture {
        fn new() -> Self {
            Self {
                ledger: InMemoryLedgerStore::new(),
                sessions: InMemorySessionStore::new(),
                catalog: InMemoryItemCatalog::new(),
                location_id: LocationId::new(),
            }
        }

        fn engine(&self) -> ReconcileEngine<'_> {
            ReconcileEngine::new(
                &self.ledger,
                &self.sessions,
                &self.catalog,
                ReconcilePolicy::default(),
            )
        }
    }

    #[test]
    fn variance_below_threshold_closes_without_reason() {
        let fx = SessionFixture::new();
        let item_id = seed_item(&fx.catalog, fx.location_id, "Pale Ale");

        // Theoretical at session start: 24 received minus 1 sold = 23.
        receive(&fx.ledger, fx.location_id, item_id, dec!(24), ts(0, 9));
        sale(&fx.ledger, fx.location_id, item_id, dec!(1), ts(1, 18));

        let engine = fx.engine();
        let session = engine.open_session(fx.location_id, None, ts(2, 8)).unwrap();
        engine
            .add_line(session.id, item_id, ActualValue::Units(dec!(20)), None, None, ts(2, 9))
            .unwrap();

        let summary = engine
            .close_session(session.id, &HashMap::new(), None, ts(2, 10))
            .unwrap();

        assert_eq!(summary.adjustments_created, 1);
        assert_eq!(summary.total_variance, dec!(3));
        assert_eq!(summary.adjustments[0].variance, dec!(-3));

        let adjustments = fx
            .ledger
            .list(&EventFilter::for_item(item_id).with_types([EventType::InventoryCountAdjustment]))
            .unwrap();
        assert_eq!(adjustments.len(), 1);
        assert_eq!(adjustments[0].quantity_delta, dec!(-3));
        assert_eq!(adjustments[0].confidence_level, ConfidenceLevel::Measured);

        // The ledger now carries the counted truth.
        assert_eq!(
            fx.ledger.sum_deltas(item_id, TimeWindow::all()).unwrap(),
            dec!(20)
        );
    }

    #[test]
    fn threshold_gating_blocks_then_accepts_with_reason() {
        let fx = SessionFixture::new();
        let item_id = seed_item(&fx.catalog, fx.location_id, "Well Vodka");

        receive(&fx.ledger, fx.location_id, item_id, dec!(100), ts(0, 9));

        let engine = fx.engine();
        let session = engine.open_session(fx.location_id, None, ts(1, 8)).unwrap();
        engine
            .add_line(session.id, item_id, ActualValue::Units(dec!(106)), None, None, ts(1, 9))
            .unwrap();

        // Variance 6 > threshold 5 and no reason: the whole close fails and
        // commits nothing.
        let err = engine
            .close_session(session.id, &HashMap::new(), None, ts(1, 10))
            .unwrap_err();
        match err {
            DomainError::ReconciliationIncomplete { requires_reasons } => {
                assert_eq!(requires_reasons, vec![item_id]);
            }
            other => panic!("expected ReconciliationIncomplete, got {other:?}"),
        }
        assert!(
            fx.ledger
                .list(&EventFilter::for_item(item_id).with_types([EventType::InventoryCountAdjustment]))
                .unwrap()
                .is_empty()
        );
        assert!(!fx.sessions.get(session.id).unwrap().unwrap().is_closed());

        // Same close with the reason attached emits exactly one adjustment.
        let mut reasons = HashMap::new();
        reasons.insert(item_id, VarianceReason::Breakage);
        let summary = engine
            .close_session(session.id, &reasons, None, ts(1, 11))
            .unwrap();
        assert_eq!(summary.adjustments_created, 1);

        let adjustments = fx
            .ledger
            .list(&EventFilter::for_item(item_id).with_types([EventType::InventoryCountAdjustment]))
            .unwrap();
        assert_eq!(adjustments.len(), 1);
        assert_eq!(adjustments[0].quantity_delta, dec!(6));
        assert_eq!(adjustments[0].variance_reason, Some(VarianceReason::Breakage));
    }

    #[test]
    fn closing_twice_fails_precondition() {
        let fx = SessionFixture::new();
        let item_id = seed_item(&fx.catalog, fx.location_id, "House Red");
        receive(&fx.ledger, fx.location_id, item_id, dec!(10), ts(0, 9));

        let engine = fx.engine();
        let session = engine.open_session(fx.location_id, None, ts(1, 8)).unwrap();
        engine
            .add_line(session.id, item_id, ActualValue::Units(dec!(10)), None, None, ts(1, 9))
            .unwrap();

        engine
            .close_session(session.id, &HashMap::new(), None, ts(1, 10))
            .unwrap();
        let err = engine
            .close_session(session.id, &HashMap::new(), None, ts(1, 11))
            .unwrap_err();
        assert!(matches!(err, DomainError::PreconditionFailed(_)));

        // No double-applied adjustments.
        assert_eq!(
            fx.ledger.sum_deltas(item_id, TimeWindow::all()).unwrap(),
            dec!(10)
        );
    }

    #[test]
    fn duplicate_lines_for_one_item_are_additive() {
        let fx = SessionFixture::new();
        let item_id = seed_item(&fx.catalog, fx.location_id, "Bourbon");
        receive(&fx.ledger, fx.location_id, item_id, dec!(21), ts(0, 9));

        let engine = fx.engine();
        let session = engine.open_session(fx.location_id, None, ts(1, 8)).unwrap();
        // A full shelf and a weighed partial bottle.
        engine
            .add_line(session.id, item_id, ActualValue::Units(dec!(12)), None, None, ts(1, 9))
            .unwrap();
        engine
            .add_line(session.id, item_id, ActualValue::Units(dec!(8.5)), None, None, ts(1, 9))
            .unwrap();

        let preview = engine.preview_close(session.id).unwrap();
        assert_eq!(preview.len(), 1);
        assert_eq!(preview[0].actual, dec!(20.5));
        assert_eq!(preview[0].theoretical, dec!(21));
        assert_eq!(preview[0].variance, dec!(-0.5));
    }

    #[test]
    fn preview_writes_nothing_and_keeps_session_open() {
        let fx = SessionFixture::new();
        let item_id = seed_item(&fx.catalog, fx.location_id, "Stout");
        receive(&fx.ledger, fx.location_id, item_id, dec!(50), ts(0, 9));

        let engine = fx.engine();
        let session = engine.open_session(fx.location_id, None, ts(1, 8)).unwrap();
        engine
            .add_line(session.id, item_id, ActualValue::Units(dec!(30)), None, None, ts(1, 9))
            .unwrap();

        // Variance 20 is far over threshold, but preview neither gates nor
        // writes.
        let preview = engine.preview_close(session.id).unwrap();
        assert_eq!(preview[0].variance, dec!(-20));
        assert!(
            fx.ledger
                .list(&EventFilter::for_item(item_id).with_types([EventType::InventoryCountAdjustment]))
                .unwrap()
                .is_empty()
        );
        assert!(!fx.sessions.get(session.id).unwrap().unwrap().is_closed());
    }

    #[test]
    fn theoretical_is_anchored_at_session_start() {
        let fx = SessionFixture::new();
        let item_id = seed_item(&fx.catalog, fx.location_id, "Lager");
        receive(&fx.ledger, fx.location_id, item_id, dec!(30), ts(0, 9));

        let engine = fx.engine();
        let session = engine.open_session(fx.location_id, None, ts(1, 8)).unwrap();

        // Sales recorded while the count is underway must not move the
        // comparison point.
        sale(&fx.ledger, fx.location_id, item_id, dec!(5), ts(1, 9));
        engine
            .add_line(session.id, item_id, ActualValue::Units(dec!(30)), None, None, ts(1, 10))
            .unwrap();

        let preview = engine.preview_close(session.id).unwrap();
        assert_eq!(preview[0].theoretical, dec!(30));
        assert_eq!(preview[0].variance, Decimal::ZERO);
    }

    #[test]
    fn opening_a_second_session_force_closes_the_first() {
        let fx = SessionFixture::new();
        let item_id = seed_item(&fx.catalog, fx.location_id, "Cider");
        receive(&fx.ledger, fx.location_id, item_id, dec!(10), ts(0, 9));

        let engine = fx.engine();
        let first = engine.open_session(fx.location_id, None, ts(1, 8)).unwrap();
        engine
            .add_line(first.id, item_id, ActualValue::Units(dec!(2)), None, None, ts(1, 9))
            .unwrap();

        let second = engine.open_session(fx.location_id, None, ts(1, 12)).unwrap();
        assert_ne!(first.id, second.id);

        let stale = fx.sessions.get(first.id).unwrap().unwrap();
        assert!(stale.is_closed());
        assert_eq!(stale.closed_by, None);

        // Force-close skips reconciliation entirely: no adjustments despite
        // the counted variance.
        assert!(
            fx.ledger
                .list(&EventFilter::for_item(item_id).with_types([EventType::InventoryCountAdjustment]))
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn auto_close_applies_session_expired_to_every_item() {
        let fx = SessionFixture::new();
        let item_id = seed_item(&fx.catalog, fx.location_id, "Tequila");
        receive(&fx.ledger, fx.location_id, item_id, dec!(100), ts(0, 9));

        let engine = fx.engine();
        let session = engine.open_session(fx.location_id, None, ts(1, 8)).unwrap();
        // Variance 20 would normally demand a reason.
        engine
            .add_line(session.id, item_id, ActualValue::Units(dec!(80)), None, None, ts(1, 9))
            .unwrap();

        let summary = engine.auto_close_session(session.id, ts(1, 23)).unwrap();
        assert_eq!(summary.adjustments_created, 1);
        assert_eq!(summary.adjustments[0].reason, Some(VarianceReason::SessionExpired));

        let closed = fx.sessions.get(session.id).unwrap().unwrap();
        assert!(closed.is_closed());
        assert_eq!(closed.closed_by, None);
    }

    #[test]
    fn line_validation_and_closed_session_lines() {
        let fx = SessionFixture::new();
        let item_id = seed_item(&fx.catalog, fx.location_id, "Gin");

        let engine = fx.engine();
        let session = engine.open_session(fx.location_id, None, ts(1, 8)).unwrap();

        let err = engine
            .add_line(session.id, item_id, ActualValue::Units(dec!(-1)), None, None, ts(1, 9))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        engine
            .close_session(session.id, &HashMap::new(), None, ts(1, 10))
            .unwrap();
        let err = engine
            .add_line(session.id, item_id, ActualValue::Units(dec!(1)), None, None, ts(1, 11))
            .unwrap_err();
        assert!(matches!(err, DomainError::PreconditionFailed(_)));
    }
}
