use crate::errors::DbError;
use bson::{Bson, Document as BsonDocument};

/// One aggregation stage. `GeoNear` is kept apart from the rest because a store only accepts it
/// at the head of a pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    GeoNear(BsonDocument),
    Match(BsonDocument),
    Sort(BsonDocument),
    Project(BsonDocument),
    Group(BsonDocument),
    Limit(i64),
    Skip(i64),
    Count(String),
    Other { operator: String, spec: Bson },
}

impl Stage {
    #[must_use]
    pub fn operator(&self) -> &str {
        match self {
            Self::GeoNear(_) => "$geoNear",
            Self::Match(_) => "$match",
            Self::Sort(_) => "$sort",
            Self::Project(_) => "$project",
            Self::Group(_) => "$group",
            Self::Limit(_) => "$limit",
            Self::Skip(_) => "$skip",
            Self::Count(_) => "$count",
            Self::Other { operator, .. } => operator,
        }
    }

    #[must_use]
    pub const fn is_geo_near(&self) -> bool {
        matches!(self, Self::GeoNear(_))
    }

    /// Wire form: a single-key document `{ <operator>: <spec> }`.
    #[must_use]
    pub fn to_document(&self) -> BsonDocument {
        let spec = match self {
            Self::GeoNear(d) | Self::Match(d) | Self::Sort(d) | Self::Project(d) | Self::Group(d) => {
                Bson::Document(d.clone())
            }
            Self::Limit(n) | Self::Skip(n) => Bson::Int64(*n),
            Self::Count(field) => Bson::String(field.clone()),
            Self::Other { spec, .. } => spec.clone(),
        };
        let mut out = BsonDocument::new();
        out.insert(self.operator(), spec);
        out
    }
}

impl TryFrom<BsonDocument> for Stage {
    type Error = DbError;

    fn try_from(doc: BsonDocument) -> Result<Self, Self::Error> {
        if doc.len() != 1 {
            return Err(DbError::InvalidPipeline(format!(
                "a stage must have exactly one operator, found {}",
                doc.len()
            )));
        }
        let Some((operator, spec)) = doc.into_iter().next() else {
            return Err(DbError::InvalidPipeline("empty stage".into()));
        };
        Ok(match operator.as_str() {
            "$geoNear" => Self::GeoNear(stage_body(&operator, spec)?),
            "$match" => Self::Match(stage_body(&operator, spec)?),
            "$sort" => Self::Sort(stage_body(&operator, spec)?),
            "$project" => Self::Project(stage_body(&operator, spec)?),
            "$group" => Self::Group(stage_body(&operator, spec)?),
            "$limit" => Self::Limit(count_operand(&operator, &spec)?),
            "$skip" => Self::Skip(count_operand(&operator, &spec)?),
            "$count" => match spec {
                Bson::String(field) if !field.is_empty() && !field.starts_with('$') => Self::Count(field),
                other => {
                    return Err(DbError::InvalidPipeline(format!("$count expects a field name, got {other}")));
                }
            },
            _ => Self::Other { operator, spec },
        })
    }
}

fn stage_body(operator: &str, spec: Bson) -> Result<BsonDocument, DbError> {
    match spec {
        Bson::Document(d) => Ok(d),
        other => Err(DbError::InvalidPipeline(format!("{operator} expects a document, got {other}"))),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn count_operand(operator: &str, spec: &Bson) -> Result<i64, DbError> {
    let n = match spec {
        Bson::Int32(i) => i64::from(*i),
        Bson::Int64(i) => *i,
        Bson::Double(f) if f.fract() == 0.0 => *f as i64,
        other => {
            return Err(DbError::InvalidPipeline(format!("{operator} expects an integer, got {other}")));
        }
    };
    if n < 0 {
        return Err(DbError::InvalidPipeline(format!("{operator} must be non-negative")));
    }
    Ok(n)
}

/// An ordered sequence of stages handed to a store's aggregation entry point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
}

impl Pipeline {
    #[must_use]
    pub const fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    /// # Errors
    /// Returns `DbError::InvalidPipeline` when any document is not a single-operator stage.
    pub fn from_documents(docs: Vec<BsonDocument>) -> Result<Self, DbError> {
        docs.into_iter().map(Stage::try_from).collect::<Result<Vec<_>, _>>().map(Self::new)
    }

    #[must_use]
    pub fn to_documents(&self) -> Vec<BsonDocument> {
        self.stages.iter().map(Stage::to_document).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}
