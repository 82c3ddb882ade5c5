//! Geo query strategies (§1, §4.C).
//!
//! The primitive geo searchers live in the external `IndexReader`; this
//! core only extracts the field name and carries the rest of the body
//! through as an opaque [`qx_ast::GeoParams`] payload for the reader to
//! interpret (`geo_shape`'s `circle` included).

use crate::strategy::ParseContext;
use crate::support::{as_object, boost_of};
use qx_ast::{normalize_field, Query};
use qx_core::Error;
use qx_core::Result;
use serde_json::Value as Json;

/// Finds the field-bearing entry in a geo query body, skipping the sibling
/// keys each keyword carries alongside the field (e.g. `geo_distance`'s
/// `distance`/`unit`). Map iteration order is not field-position-dependent,
/// so these must be named explicitly rather than inferred positionally.
fn field_and_params(kind: &str, body: &Json, sibling_keys: &[&str]) -> Result<(String, Json, f64)> {
    let obj = as_object(kind, body)?;
    let (field_raw, params) = obj
        .iter()
        .find(|(k, _)| !sibling_keys.contains(&k.as_str()))
        .ok_or_else(|| Error::MissingRequiredField { kind: kind.to_string(), field: "<field>".to_string() })?;
    Ok((normalize_field(field_raw), params.clone(), boost_of(body)))
}

pub fn bounding_box(body: &Json, _ctx: &ParseContext) -> Result<Query> {
    let (field, params, boost) = field_and_params("geo_bounding_box", body, &["boost", "type", "validation_method"])?;
    Ok(Query::GeoBoundingBox { field, params, boost })
}

pub fn distance(body: &Json, _ctx: &ParseContext) -> Result<Query> {
    let (field, params, boost) = field_and_params(
        "geo_distance",
        body,
        &["boost", "distance", "unit", "distance_type", "validation_method"],
    )?;
    Ok(Query::GeoDistance { field, params, boost })
}

pub fn polygon(body: &Json, _ctx: &ParseContext) -> Result<Query> {
    let (field, params, boost) = field_and_params("geo_polygon", body, &["boost", "validation_method"])?;
    Ok(Query::GeoPolygon { field, params, boost })
}

pub fn shape(body: &Json, _ctx: &ParseContext) -> Result<Query> {
    let (field, params, boost) = field_and_params("geo_shape", body, &["boost", "ignore_unmapped"])?;
    Ok(Query::GeoShape { field, params, boost })
}
