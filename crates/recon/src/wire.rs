//! Decoding of the JSON request shapes.
//!
//! Decoding walks `serde_json::Value` by hand rather than deriving
//! `Deserialize` so that a missing attribute is reported with its exact
//! location, and so that each file of a batch is decoded on its own: one
//! malformed file never prevents its siblings from being classified.

use serde_json::{Map, Value};

use crate::error::ReconError;
use crate::model::{
    AliasLevel, AliasMutation, AllocationRequest, BatchItem, FieldPair, FieldValue, FileRequest,
    RejectedFile, Scalar,
};
use crate::validation::ValidationVerdict;

/// Split a batch into per-file decode results.
///
/// Accepts `{"files": [...]}` or a bare array. Anything else rejects the whole
/// batch. A rejected file keeps its `filename` whenever it has a usable one.
pub fn decode_batch(value: &Value) -> Result<Vec<BatchItem>, ReconError> {
    let files = match value {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("files") {
            Some(Value::Array(items)) => items,
            Some(_) => return Err(ReconError::malformed("batch", "'files' must be an array")),
            None => return Err(ReconError::malformed("batch", "missing 'files'")),
        },
        _ => {
            return Err(ReconError::malformed(
                "batch",
                "expected an array of files or an object with 'files'",
            ))
        }
    };

    Ok(files
        .iter()
        .enumerate()
        .map(|(i, file)| {
            decode_file(file).map_err(|e| RejectedFile {
                filename: file
                    .get("filename")
                    .and_then(Value::as_str)
                    .filter(|name| !name.trim().is_empty())
                    .map(str::to_string),
                error: locate(e, &format!("files[{i}]")),
            })
        })
        .collect())
}

pub fn decode_file(value: &Value) -> Result<FileRequest, ReconError> {
    let obj = as_object(value, "file")?;
    let filename = required_str(obj, "filename", "file")?;
    let ctx = format!("file '{filename}'");

    let allocations = match obj.get("allocations") {
        Some(Value::Array(items)) => items,
        Some(_) => return Err(ReconError::malformed(&ctx, "'allocations' must be an array")),
        None => return Err(ReconError::malformed(&ctx, "missing 'allocations'")),
    };

    let allocations = allocations
        .iter()
        .enumerate()
        .map(|(i, alloc)| decode_allocation(alloc, &format!("{ctx} allocations[{i}]")))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FileRequest {
        filename,
        allocations,
    })
}

fn decode_allocation(value: &Value, ctx: &str) -> Result<AllocationRequest, ReconError> {
    let obj = as_object(value, ctx)?;

    let pairs = match obj.get("field_pairs") {
        Some(Value::Array(items)) => items,
        Some(_) => return Err(ReconError::malformed(ctx, "'field_pairs' must be an array")),
        None => return Err(ReconError::malformed(ctx, "missing 'field_pairs'")),
    };
    let field_pairs = pairs
        .iter()
        .enumerate()
        .map(|(i, pair)| decode_field_pair(pair, &format!("{ctx} field_pairs[{i}]")))
        .collect::<Result<Vec<_>, _>>()?;

    let validation = match obj.get("validation") {
        Some(Value::Object(map)) => decode_validation(map, ctx)?,
        Some(_) => return Err(ReconError::malformed(ctx, "'validation' must be an object")),
        None => return Err(ReconError::malformed(ctx, "missing 'validation'")),
    };

    Ok(AllocationRequest {
        field_pairs,
        validation,
    })
}

fn decode_validation(map: &Map<String, Value>, ctx: &str) -> Result<ValidationVerdict, ReconError> {
    let mut verdict = ValidationVerdict::new();
    for (field, passed) in map {
        match passed {
            Value::Bool(b) => verdict.insert(field, *b),
            _ => {
                return Err(ReconError::malformed(
                    ctx,
                    format!("validation '{field}' must be a boolean"),
                ))
            }
        }
    }
    Ok(verdict)
}

pub fn decode_field_pair(value: &Value, ctx: &str) -> Result<FieldPair, ReconError> {
    let obj = as_object(value, ctx)?;
    let field_name = required_str(obj, "field_name", ctx)?;
    let confirmation_value = required_scalar(obj, "confirmation_value", ctx)?;
    let booking_value = required_scalar(obj, "booking_value", ctx)?;
    Ok(FieldPair {
        field_name,
        confirmation_value,
        booking_value,
    })
}

/// Decode an alias add/remove payload. `on_field` is a single field name.
pub fn decode_alias_mutation(value: &Value) -> Result<AliasMutation, ReconError> {
    let ctx = "alias mutation";
    let obj = as_object(value, ctx)?;
    let source_name = required_str(obj, "source_name", ctx)?;
    let target_name = required_str(obj, "target_name", ctx)?;
    let on_field = required_str(obj, "on_field", ctx)?;
    let level_raw = required_str(obj, "level", ctx)?;
    let level = AliasLevel::parse(&level_raw).ok_or_else(|| {
        ReconError::malformed(
            ctx,
            format!("level must be \"global\" or \"counterparty\", got \"{level_raw}\""),
        )
    })?;
    Ok(AliasMutation {
        source_name,
        target_name,
        on_field,
        level,
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn as_object<'a>(value: &'a Value, ctx: &str) -> Result<&'a Map<String, Value>, ReconError> {
    value
        .as_object()
        .ok_or_else(|| ReconError::malformed(ctx, "expected an object"))
}

fn required_str(obj: &Map<String, Value>, key: &str, ctx: &str) -> Result<String, ReconError> {
    match obj.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(Value::String(_)) => Err(ReconError::malformed(ctx, format!("'{key}' is empty"))),
        Some(_) => Err(ReconError::malformed(ctx, format!("'{key}' must be a string"))),
        None => Err(ReconError::malformed(ctx, format!("missing '{key}'"))),
    }
}

/// A value attribute must be present; `null` is a valid (absent) value.
fn required_scalar(obj: &Map<String, Value>, key: &str, ctx: &str) -> Result<FieldValue, ReconError> {
    match obj.get(key) {
        Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(Scalar::Bool(*b))),
        Some(Value::String(s)) => Ok(Some(Scalar::String(s.clone()))),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(|f| Some(Scalar::Number(f)))
            .ok_or_else(|| ReconError::malformed(ctx, format!("'{key}' is not a finite number"))),
        Some(_) => Err(ReconError::malformed(
            ctx,
            format!("'{key}' must be a string, number, boolean or null"),
        )),
        None => Err(ReconError::malformed(ctx, format!("missing '{key}'"))),
    }
}

/// Prefix a malformed-input context with the element's batch position.
fn locate(err: ReconError, position: &str) -> ReconError {
    match err {
        ReconError::MalformedInput { context, reason } => ReconError::MalformedInput {
            context: format!("{position} ({context})"),
            reason,
        },
        other => other,
    }
}
