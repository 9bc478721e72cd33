use bson::{Bson, Document as BsonDocument, doc};
use nexus_softdelete::softdelete::{FilterDecision, apply_not_deleted_filter, with_bypass};
use nexus_softdelete::{BYPASS_FIELD, IS_DELETED};
use proptest::prelude::*;

fn field_name() -> impl Strategy<Value = String> {
    "[a-z]{1,8}".prop_filter("reserved", |s| s != IS_DELETED)
}

fn criteria() -> impl Strategy<Value = BsonDocument> {
    proptest::collection::vec((field_name(), any::<i32>()), 0..6).prop_map(|pairs| {
        let mut d = BsonDocument::new();
        for (k, v) in pairs {
            d.insert(k, v);
        }
        d
    })
}

proptest! {
    #[test]
    fn prop_injection_keeps_caller_fields(c in criteria()) {
        let mut out = c.clone();
        prop_assert_eq!(apply_not_deleted_filter(&mut out), FilterDecision::Injected);
        prop_assert_eq!(out.get(IS_DELETED), Some(&Bson::Document(doc! { "$ne": true })));
        out.remove(IS_DELETED);
        prop_assert_eq!(out, c);
    }

    #[test]
    fn prop_bypass_never_reaches_the_store(c in criteria(), flag in any::<bool>()) {
        let mut out = c.clone();
        out.insert(BYPASS_FIELD, flag);
        let decision = apply_not_deleted_filter(&mut out);
        prop_assert!(!out.contains_key(BYPASS_FIELD));
        if flag {
            prop_assert_eq!(decision, FilterDecision::Bypassed);
            prop_assert_eq!(out, c);
        } else {
            prop_assert_eq!(decision, FilterDecision::Injected);
        }
    }

    #[test]
    fn prop_explicit_constraint_is_untouched(c in criteria(), v in any::<bool>()) {
        let mut original = c;
        original.insert(IS_DELETED, v);
        let mut out = original.clone();
        prop_assert_eq!(apply_not_deleted_filter(&mut out), FilterDecision::CallerConstrained);
        prop_assert_eq!(out, original);
    }

    #[test]
    fn prop_with_bypass_round_trips(c in criteria()) {
        let mut out = with_bypass(c.clone());
        apply_not_deleted_filter(&mut out);
        prop_assert_eq!(out, c);
    }
}
