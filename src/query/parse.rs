use crate::errors::DbError;
use bson::{Bson, Document as BsonDocument};

use super::types::{CmpOp, Filter, MAX_IN_SET, Order, SortSpec};

/// Compile a Mongo-style criteria document into a `Filter`.
///
/// Top-level keys are field paths (implicit `$eq` or an operator document) or one of the
/// logical operators `$and`, `$or`, `$nor`. Several keys are conjoined.
///
/// # Errors
/// Returns `DbError::QueryError` on unknown operators or malformed operands.
pub fn compile_criteria(criteria: &BsonDocument) -> Result<Filter, DbError> {
    let mut clauses = Vec::with_capacity(criteria.len());
    for (key, value) in criteria {
        let clause = match key.as_str() {
            "$and" => Filter::And(compile_list(key, value)?),
            "$or" => Filter::Or(compile_list(key, value)?),
            "$nor" => Filter::Not(Box::new(Filter::Or(compile_list(key, value)?))),
            k if k.starts_with('$') => {
                return Err(DbError::QueryError(format!("unknown top-level operator {k}")));
            }
            path => match value {
                Bson::Document(ops) if is_operator_doc(ops) => compile_field_ops(path, ops)?,
                v => Filter::Cmp { path: path.to_string(), op: CmpOp::Eq, value: v.clone() },
            },
        };
        clauses.push(clause);
    }
    Ok(conjoin(clauses))
}

fn compile_list(op: &str, value: &Bson) -> Result<Vec<Filter>, DbError> {
    let Bson::Array(items) = value else {
        return Err(DbError::QueryError(format!("{op} requires an array")));
    };
    items
        .iter()
        .map(|item| match item {
            Bson::Document(d) => compile_criteria(d),
            _ => Err(DbError::QueryError(format!("{op} entries must be documents"))),
        })
        .collect()
}

fn is_operator_doc(doc: &BsonDocument) -> bool {
    doc.keys().next().is_some_and(|k| k.starts_with('$'))
}

fn compile_field_ops(path: &str, ops: &BsonDocument) -> Result<Filter, DbError> {
    let mut clauses = Vec::with_capacity(ops.len());
    for (op, v) in ops {
        let cmp = |op: CmpOp| Filter::Cmp { path: path.to_string(), op, value: v.clone() };
        let clause = match op.as_str() {
            "$eq" => cmp(CmpOp::Eq),
            "$ne" => cmp(CmpOp::Ne),
            "$gt" => cmp(CmpOp::Gt),
            "$gte" => cmp(CmpOp::Gte),
            "$lt" => cmp(CmpOp::Lt),
            "$lte" => cmp(CmpOp::Lte),
            "$in" => Filter::In { path: path.to_string(), values: set_operand(op, v)? },
            "$nin" => Filter::Nin { path: path.to_string(), values: set_operand(op, v)? },
            "$exists" => Filter::Exists { path: path.to_string(), exists: truthy(v) },
            "$not" => match v {
                Bson::Document(inner) if is_operator_doc(inner) => {
                    Filter::Not(Box::new(compile_field_ops(path, inner)?))
                }
                _ => return Err(DbError::QueryError("$not requires an operator document".into())),
            },
            other => return Err(DbError::QueryError(format!("unknown operator {other} on {path}"))),
        };
        clauses.push(clause);
    }
    Ok(conjoin(clauses))
}

fn set_operand(op: &str, v: &Bson) -> Result<Vec<Bson>, DbError> {
    match v {
        Bson::Array(vals) => Ok(vals.iter().take(MAX_IN_SET).cloned().collect()),
        _ => Err(DbError::QueryError(format!("{op} requires an array"))),
    }
}

fn conjoin(mut clauses: Vec<Filter>) -> Filter {
    match clauses.len() {
        0 => Filter::True,
        1 => clauses.remove(0),
        _ => Filter::And(clauses),
    }
}

pub(crate) fn truthy(v: &Bson) -> bool {
    match v {
        Bson::Boolean(b) => *b,
        Bson::Int32(i) => *i != 0,
        Bson::Int64(i) => *i != 0,
        Bson::Double(f) => *f != 0.0,
        Bson::Null | Bson::Undefined => false,
        _ => true,
    }
}

/// Parse a `$sort`-style document (`{ field: 1 | -1 }`) into sort specs.
///
/// # Errors
/// Returns `DbError::QueryError` when a direction is not 1 or -1.
pub fn parse_sort(spec: &BsonDocument) -> Result<Vec<SortSpec>, DbError> {
    spec.iter()
        .map(|(field, dir)| {
            let order = match dir {
                Bson::Int32(1) | Bson::Int64(1) => Order::Asc,
                Bson::Int32(-1) | Bson::Int64(-1) => Order::Desc,
                Bson::Double(d) if *d == 1.0 => Order::Asc,
                Bson::Double(d) if *d == -1.0 => Order::Desc,
                other => {
                    return Err(DbError::QueryError(format!("invalid sort direction {other} for {field}")));
                }
            };
            Ok(SortSpec { field: field.clone(), order })
        })
        .collect()
}
