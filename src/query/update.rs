use crate::document::Document;
use bson::{Bson, Document as BsonDocument};
use chrono::Utc;

use super::eval::get_path;
use super::types::UpdateDoc;

/// Apply `$set` / `$unset` to a document. Returns whether anything changed.
pub fn apply_update(doc: &mut Document, upd: &UpdateDoc) -> bool {
    let mut modified = false;
    // Enforce caps on number of fields updated per operation to bound work
    for (path, val) in upd.set.iter().take(128) {
        modified |= set_path(&mut doc.data, path, val.clone());
    }
    for path in upd.unset.iter().take(128) {
        modified |= unset_path(&mut doc.data, path);
    }
    if modified {
        doc.metadata.updated_at = Utc::now();
    }
    modified
}

fn set_path(doc: &mut BsonDocument, path: &str, val: Bson) -> bool {
    let parts: Vec<&str> = path.split('.').collect();
    let Some((last, parents)) = parts.split_last() else { return false };
    let mut cur = doc;
    for key in parents {
        if !matches!(cur.get(*key), Some(Bson::Document(_))) {
            cur.insert((*key).to_string(), Bson::Document(BsonDocument::new()));
        }
        match cur.get_mut(*key) {
            Some(Bson::Document(d)) => cur = d,
            _ => return false,
        }
    }
    let changed = get_path(cur, last).is_none_or(|prev| prev != &val);
    cur.insert((*last).to_string(), val);
    changed
}

fn unset_path(doc: &mut BsonDocument, path: &str) -> bool {
    let parts: Vec<&str> = path.split('.').collect();
    let Some((last, parents)) = parts.split_last() else { return false };
    let mut cur = doc;
    for key in parents {
        match cur.get_mut(*key) {
            Some(Bson::Document(d)) => cur = d,
            _ => return false,
        }
    }
    cur.remove(*last).is_some()
}
