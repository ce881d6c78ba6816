//! Property tests: recovery point selection is deterministic and picks the
//! newest restorable point regardless of catalog order.

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use drill_core::select_latest;
use drill_types::{RecoveryPoint, RecoveryPointStatus, RecoverySelector, ResourceKind};
use proptest::prelude::*;

fn arb_status() -> impl Strategy<Value = RecoveryPointStatus> {
    prop_oneof![
        3 => Just(RecoveryPointStatus::Completed),
        1 => Just(RecoveryPointStatus::Pending),
        1 => Just(RecoveryPointStatus::Failed),
        1 => Just(RecoveryPointStatus::Expired),
    ]
}

fn arb_kind() -> impl Strategy<Value = ResourceKind> {
    prop_oneof![Just(ResourceKind::Database), Just(ResourceKind::Volume)]
}

/// Points with few distinct timestamps so ties are common
fn arb_point() -> impl Strategy<Value = RecoveryPoint> {
    (0u8..50, 0i64..6, arb_kind(), arb_status()).prop_map(|(id, hour, kind, status)| {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + ChronoDuration::hours(hour);
        RecoveryPoint::completed(format!("rp-{:02}", id), kind, created).with_status(status)
    })
}

proptest! {
    /// The selected point is restorable, of the right kind, and no other
    /// candidate is newer or ties with a smaller id.
    #[test]
    fn selection_is_newest_then_smallest_id(
        points in prop::collection::vec(arb_point(), 0..30),
        kind in arb_kind(),
    ) {
        let candidates: Vec<&RecoveryPoint> = points
            .iter()
            .filter(|p| p.kind == kind && p.status.is_restorable())
            .collect();

        match select_latest(points.clone(), kind, &RecoverySelector::any()) {
            None => prop_assert!(candidates.is_empty()),
            Some(chosen) => {
                prop_assert_eq!(chosen.kind, kind);
                prop_assert!(chosen.status.is_restorable());
                for other in candidates {
                    prop_assert!(other.created_at <= chosen.created_at);
                    if other.created_at == chosen.created_at {
                        prop_assert!(other.id >= chosen.id);
                    }
                }
            }
        }
    }

    /// Catalog order never changes the selection
    #[test]
    fn selection_ignores_input_order(
        points in prop::collection::vec(arb_point(), 0..30),
        kind in arb_kind(),
    ) {
        let mut reversed = points.clone();
        reversed.reverse();

        let forward = select_latest(points, kind, &RecoverySelector::any());
        let backward = select_latest(reversed, kind, &RecoverySelector::any());
        prop_assert_eq!(
            forward.map(|p| (p.id, p.created_at)),
            backward.map(|p| (p.id, p.created_at))
        );
    }
}
