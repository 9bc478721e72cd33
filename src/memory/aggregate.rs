//! Aggregation executor for the in-memory store.

use super::geo::geo_near;
use crate::errors::DbError;
use crate::pipeline::{Pipeline, Stage};
use crate::query::{as_f64, compare_bson, compare_docs, compile_criteria, eval_filter, get_path, parse_sort, truthy};
use bson::{Bson, Document as BsonDocument};
use std::cmp::Ordering;

pub(crate) fn run_pipeline(input: Vec<BsonDocument>, pipeline: &Pipeline) -> Result<Vec<BsonDocument>, DbError> {
    let mut docs = input;
    for (pos, stage) in pipeline.stages.iter().enumerate() {
        docs = match stage {
            Stage::GeoNear(spec) => {
                if pos != 0 {
                    return Err(DbError::InvalidPipeline(
                        "$geoNear is only valid as the first stage in a pipeline".into(),
                    ));
                }
                geo_near(docs, spec)?
            }
            Stage::Match(criteria) => {
                let filter = compile_criteria(criteria)?;
                docs.into_iter().filter(|d| eval_filter(d, &filter)).collect()
            }
            Stage::Sort(spec) => {
                let sort = parse_sort(spec)?;
                docs.sort_by(|a, b| compare_docs(a, b, &sort));
                docs
            }
            Stage::Skip(n) => docs.into_iter().skip(to_usize(*n)).collect(),
            Stage::Limit(n) => docs.into_iter().take(to_usize(*n)).collect(),
            Stage::Project(spec) => project(docs, spec)?,
            Stage::Group(spec) => group(&docs, spec)?,
            Stage::Count(field) => {
                if docs.is_empty() {
                    Vec::new()
                } else {
                    let mut out = BsonDocument::new();
                    out.insert(field.clone(), int_bson(docs.len() as i64));
                    vec![out]
                }
            }
            Stage::Other { operator, .. } => {
                log::warn!("unsupported aggregation stage {operator}");
                return Err(DbError::InvalidPipeline(format!("unsupported stage {operator}")));
            }
        };
    }
    Ok(docs)
}

fn to_usize(n: i64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

fn int_bson(n: i64) -> Bson {
    i32::try_from(n).map_or(Bson::Int64(n), Bson::Int32)
}

/// Resolve `"$path"` references against `doc`; documents are resolved field by field, anything
/// else is a literal.
fn eval_expr(doc: &BsonDocument, expr: &Bson) -> Bson {
    match expr {
        Bson::String(s) if s.starts_with('$') => get_path(doc, &s[1..]).cloned().unwrap_or(Bson::Null),
        Bson::Document(d) => {
            let mut out = BsonDocument::new();
            for (k, v) in d {
                out.insert(k.clone(), eval_expr(doc, v));
            }
            Bson::Document(out)
        }
        other => other.clone(),
    }
}

fn project(docs: Vec<BsonDocument>, spec: &BsonDocument) -> Result<Vec<BsonDocument>, DbError> {
    let keep_id = spec.get("_id").is_none_or(truthy);
    let fields: Vec<(&String, &Bson)> = spec.iter().filter(|(k, _)| k.as_str() != "_id").collect();
    let excluding =
        fields.iter().all(|(_, v)| is_flag(v) && !truthy(v)) && !(fields.is_empty() && keep_id);
    if !excluding && fields.iter().any(|(_, v)| is_flag(v) && !truthy(v)) {
        return Err(DbError::InvalidPipeline("$project cannot mix inclusion and exclusion".into()));
    }
    Ok(docs
        .into_iter()
        .map(|mut d| {
            if excluding {
                for (k, _) in &fields {
                    d.remove(k.as_str());
                }
                if !keep_id {
                    d.remove("_id");
                }
                return d;
            }
            let mut out = BsonDocument::new();
            if keep_id && let Some(id) = d.get("_id") {
                out.insert("_id", id.clone());
            }
            for (k, v) in &fields {
                if is_flag(v) {
                    if let Some(val) = get_path(&d, k) {
                        out.insert((*k).clone(), val.clone());
                    }
                } else {
                    out.insert((*k).clone(), eval_expr(&d, v));
                }
            }
            out
        })
        .collect())
}

const fn is_flag(v: &Bson) -> bool {
    matches!(v, Bson::Boolean(_) | Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_))
}

#[derive(Debug, Clone)]
enum Acc {
    Sum { total: f64, int_total: i64, all_int32: bool, all_int: bool },
    Avg { total: f64, n: u64 },
    Min(Option<Bson>),
    Max(Option<Bson>),
    First(Option<Bson>),
    Push(Vec<Bson>),
}

impl Acc {
    fn new(op: &str) -> Result<Self, DbError> {
        Ok(match op {
            "$sum" | "$count" => Self::Sum { total: 0.0, int_total: 0, all_int32: true, all_int: true },
            "$avg" => Self::Avg { total: 0.0, n: 0 },
            "$min" => Self::Min(None),
            "$max" => Self::Max(None),
            "$first" => Self::First(None),
            "$push" => Self::Push(Vec::new()),
            other => return Err(DbError::InvalidPipeline(format!("unsupported accumulator {other}"))),
        })
    }

    fn feed(&mut self, v: Bson) {
        match self {
            Self::Sum { total, int_total, all_int32, all_int } => {
                match v {
                    Bson::Int32(i) => *int_total = int_total.saturating_add(i64::from(i)),
                    Bson::Int64(i) => {
                        *all_int32 = false;
                        *int_total = int_total.saturating_add(i);
                    }
                    Bson::Double(_) => *all_int = false,
                    _ => return,
                }
                if let Some(f) = as_f64(&v) {
                    *total += f;
                }
            }
            Self::Avg { total, n } => {
                if let Some(f) = as_f64(&v) {
                    *total += f;
                    *n += 1;
                }
            }
            // min/max skip null and missing values
            Self::Min(_) | Self::Max(_) if matches!(v, Bson::Null) => {}
            Self::Min(cur) => {
                if cur.as_ref().is_none_or(|c| compare_bson(&v, c) == Ordering::Less) {
                    *cur = Some(v);
                }
            }
            Self::Max(cur) => {
                if cur.as_ref().is_none_or(|c| compare_bson(&v, c) == Ordering::Greater) {
                    *cur = Some(v);
                }
            }
            Self::First(cur) => {
                if cur.is_none() {
                    *cur = Some(v);
                }
            }
            Self::Push(items) => {
                if !matches!(v, Bson::Null) {
                    items.push(v);
                }
            }
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn finish(self) -> Bson {
        match self {
            Self::Sum { total, int_total, all_int32, all_int } => {
                if all_int32 && all_int {
                    int_bson(int_total)
                } else if all_int {
                    Bson::Int64(int_total)
                } else {
                    Bson::Double(total)
                }
            }
            Self::Avg { total, n } => {
                if n == 0 {
                    Bson::Null
                } else {
                    Bson::Double(total / n as f64)
                }
            }
            Self::Min(v) | Self::Max(v) | Self::First(v) => v.unwrap_or(Bson::Null),
            Self::Push(items) => Bson::Array(items),
        }
    }
}

/// `$group` with an `_id` expression and single-operator accumulators. Groups come out in
/// first-seen order.
fn group(docs: &[BsonDocument], spec: &BsonDocument) -> Result<Vec<BsonDocument>, DbError> {
    let Some(key_expr) = spec.get("_id") else {
        return Err(DbError::InvalidPipeline("$group requires an _id".into()));
    };
    let mut accs: Vec<(&String, &str, &Bson)> = Vec::new();
    for (field, acc) in spec.iter().filter(|(k, _)| k.as_str() != "_id") {
        let Bson::Document(op_doc) = acc else {
            return Err(DbError::InvalidPipeline(format!("$group field {field} must be an accumulator")));
        };
        let Some((op, operand)) = op_doc.iter().next().filter(|_| op_doc.len() == 1) else {
            return Err(DbError::InvalidPipeline(format!("$group field {field} must have one accumulator")));
        };
        Acc::new(op)?;
        accs.push((field, op.as_str(), operand));
    }

    let mut groups: Vec<(Bson, Vec<Acc>)> = Vec::new();
    for d in docs {
        let key = eval_expr(d, key_expr);
        let idx = match groups.iter().position(|(k, _)| *k == key) {
            Some(i) => i,
            None => {
                let fresh = accs.iter().map(|(_, op, _)| Acc::new(op)).collect::<Result<Vec<_>, _>>()?;
                groups.push((key, fresh));
                groups.len() - 1
            }
        };
        for (acc, (_, op, operand)) in groups[idx].1.iter_mut().zip(&accs) {
            let value = if *op == "$count" { Bson::Int32(1) } else { eval_expr(d, operand) };
            acc.feed(value);
        }
    }

    Ok(groups
        .into_iter()
        .map(|(key, state)| {
            let mut out = BsonDocument::new();
            out.insert("_id", key);
            for ((field, _, _), acc) in accs.iter().zip(state) {
                out.insert((*field).clone(), acc.finish());
            }
            out
        })
        .collect())
}
