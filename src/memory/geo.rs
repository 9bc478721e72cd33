//! `$geoNear` evaluation for the in-memory store.

use crate::errors::DbError;
use crate::query::{as_f64, compile_criteria, eval_filter, get_path};
use bson::{Bson, Document as BsonDocument};
use std::cmp::Ordering;

/// Mean earth radius in meters, as used for spherical GeoJSON distances.
const EARTH_RADIUS_M: f64 = 6_378_100.0;
const DEFAULT_KEY: &str = "location";

#[derive(Debug, Clone, Copy, PartialEq)]
struct Point {
    x: f64,
    y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Metric {
    Planar,
    /// Central angle in radians (legacy pair with `spherical: true`).
    Radians,
    /// Meters on the earth's surface (GeoJSON point).
    Meters,
}

/// Parsed `$geoNear` options.
#[derive(Debug)]
struct GeoNearSpec {
    near: Point,
    metric: Metric,
    distance_field: String,
    key: String,
    max_distance: Option<f64>,
    min_distance: Option<f64>,
    query: Option<BsonDocument>,
    multiplier: f64,
}

impl GeoNearSpec {
    fn parse(spec: &BsonDocument) -> Result<Self, DbError> {
        let (near, geojson) = match spec.get("near") {
            Some(v) => parse_point(v).ok_or_else(|| invalid("near must be a point"))?,
            None => return Err(invalid("near is required")),
        };
        let spherical = matches!(spec.get("spherical"), Some(Bson::Boolean(true)));
        let metric = match (geojson, spherical) {
            (true, _) => Metric::Meters,
            (false, true) => Metric::Radians,
            (false, false) => Metric::Planar,
        };
        let distance_field = match spec.get("distanceField") {
            Some(Bson::String(s)) if !s.is_empty() => s.clone(),
            _ => return Err(invalid("distanceField is required")),
        };
        let key = match spec.get("key") {
            Some(Bson::String(s)) => s.clone(),
            None => DEFAULT_KEY.to_string(),
            Some(_) => return Err(invalid("key must be a string")),
        };
        let number = |name: &str| -> Result<Option<f64>, DbError> {
            match spec.get(name) {
                None => Ok(None),
                Some(v) => as_f64(v).map(Some).ok_or_else(|| invalid(&format!("{name} must be a number"))),
            }
        };
        let query = match spec.get("query") {
            Some(Bson::Document(q)) => Some(q.clone()),
            None => None,
            Some(_) => return Err(invalid("query must be a document")),
        };
        Ok(Self {
            near,
            metric,
            distance_field,
            key,
            max_distance: number("maxDistance")?,
            min_distance: number("minDistance")?,
            query,
            multiplier: number("distanceMultiplier")?.unwrap_or(1.0),
        })
    }

    fn distance_to(&self, p: Point) -> f64 {
        match self.metric {
            Metric::Planar => (p.x - self.near.x).hypot(p.y - self.near.y),
            Metric::Radians => central_angle(self.near, p),
            Metric::Meters => central_angle(self.near, p) * EARTH_RADIUS_M,
        }
    }
}

fn invalid(msg: &str) -> DbError {
    DbError::InvalidPipeline(format!("$geoNear: {msg}"))
}

/// Legacy `[x, y]` pair or GeoJSON `{ type: "Point", coordinates: [lng, lat] }`.
/// The flag reports whether the point was GeoJSON.
fn parse_point(v: &Bson) -> Option<(Point, bool)> {
    match v {
        Bson::Array(xs) => pair(xs).map(|p| (p, false)),
        Bson::Document(d) => match (d.get("type"), d.get("coordinates")) {
            (Some(Bson::String(t)), Some(Bson::Array(xs))) if t == "Point" => pair(xs).map(|p| (p, true)),
            _ => None,
        },
        _ => None,
    }
}

fn pair(xs: &[Bson]) -> Option<Point> {
    match xs {
        [x, y] => Some(Point { x: as_f64(x)?, y: as_f64(y)? }),
        _ => None,
    }
}

/// Haversine central angle between two (longitude, latitude) points, in radians.
fn central_angle(a: Point, b: Point) -> f64 {
    let (lat1, lat2) = (a.y.to_radians(), b.y.to_radians());
    let dlat = lat2 - lat1;
    let dlng = (b.x - a.x).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * h.sqrt().min(1.0).asin()
}

/// Rank `docs` by distance from `near`, nearest first, writing the distance into
/// `distanceField`. Documents without a usable point under `key` are dropped.
pub(crate) fn geo_near(docs: Vec<BsonDocument>, spec: &BsonDocument) -> Result<Vec<BsonDocument>, DbError> {
    let spec = GeoNearSpec::parse(spec)?;
    let filter = spec.query.as_ref().map(compile_criteria).transpose()?;
    let mut ranked: Vec<(f64, BsonDocument)> = docs
        .into_iter()
        .filter(|d| filter.as_ref().is_none_or(|f| eval_filter(d, f)))
        .filter_map(|d| {
            let (p, _) = get_path(&d, &spec.key).and_then(parse_point)?;
            let dist = spec.distance_to(p);
            let within = spec.max_distance.is_none_or(|m| dist <= m) && spec.min_distance.is_none_or(|m| dist >= m);
            within.then_some((dist, d))
        })
        .collect();
    ranked.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
    Ok(ranked
        .into_iter()
        .map(|(dist, mut d)| {
            d.insert(spec.distance_field.clone(), dist * spec.multiplier);
            d
        })
        .collect())
}
