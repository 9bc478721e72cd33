use bson::doc;
use nexus_softdelete::Stage;
use nexus_softdelete::softdelete::{inject_not_deleted_stage, not_deleted_stage};
use proptest::prelude::*;

fn tail_stage() -> impl Strategy<Value = Stage> {
    prop_oneof![
        any::<i32>().prop_map(|x| Stage::Match(doc! { "x": x })),
        (0i64..100).prop_map(Stage::Limit),
        (0i64..100).prop_map(Stage::Skip),
        Just(Stage::Sort(doc! { "x": 1 })),
        Just(Stage::Count("n".into())),
    ]
}

proptest! {
    #[test]
    fn prop_match_lands_first_or_after_geo(lead_geo in any::<bool>(), tail in proptest::collection::vec(tail_stage(), 0..8)) {
        let geo = Stage::GeoNear(doc! { "near": [0.0, 0.0], "distanceField": "d" });
        let mut stages = Vec::new();
        if lead_geo {
            stages.push(geo.clone());
        }
        stages.extend(tail.iter().cloned());
        let before = stages.clone();
        inject_not_deleted_stage(&mut stages);

        prop_assert_eq!(stages.len(), before.len() + 1);
        let at = usize::from(lead_geo);
        prop_assert_eq!(&stages[at], &not_deleted_stage());
        let mut without = stages.clone();
        without.remove(at);
        prop_assert_eq!(without, before);
        if lead_geo {
            prop_assert_eq!(&stages[0], &geo);
        }
    }
}
