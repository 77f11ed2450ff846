// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Conversion of raw protocol readings into host command values.
//!
//! [`new_result`] is a total dispatch over the supported value-type tags.
//! Every tag in the supported set has an explicit arm performing a
//! best-effort coercion of the raw reading; anything outside the set falls
//! through to a single unsupported-type error. Successful conversions are
//! stamped with the wall-clock origin in milliseconds.

use chrono::Utc;
use opcd_sdk::{CommandRequest, CommandValue, DriverError, DriverResult, Value, ValueType};

// =============================================================================
// new_result
// =============================================================================

/// Convert a raw reading into the command value the request asked for.
///
/// Coercion failures name the failing resource; an unrecognized tag yields
/// a distinct unsupported-type error.
pub fn new_result(request: &CommandRequest, reading: Value) -> DriverResult<CommandValue> {
    let resource = &request.device_resource_name;
    let into_err = |message: String| DriverError::coercion(resource.clone(), message);

    let value = match request.value_type {
        ValueType::Bool => Value::Bool(coerce_bool(&reading).map_err(into_err)?),
        ValueType::String => Value::String(coerce_string(&reading)),
        ValueType::Uint8 => Value::Uint8(narrow_u64::<u8>(&reading).map_err(into_err)?),
        ValueType::Uint16 => Value::Uint16(narrow_u64::<u16>(&reading).map_err(into_err)?),
        ValueType::Uint32 => Value::Uint32(narrow_u64::<u32>(&reading).map_err(into_err)?),
        ValueType::Uint64 => Value::Uint64(coerce_u64(&reading).map_err(into_err)?),
        ValueType::Int8 => Value::Int8(narrow_i64::<i8>(&reading).map_err(into_err)?),
        ValueType::Int16 => Value::Int16(narrow_i64::<i16>(&reading).map_err(into_err)?),
        ValueType::Int32 => Value::Int32(narrow_i64::<i32>(&reading).map_err(into_err)?),
        ValueType::Int64 => Value::Int64(coerce_i64(&reading).map_err(into_err)?),
        ValueType::Float32 => Value::Float32(coerce_f32(&reading).map_err(into_err)?),
        ValueType::Float64 => Value::Float64(coerce_f64(&reading).map_err(into_err)?),
        unsupported => return Err(DriverError::unsupported_type(unsupported)),
    };

    Ok(CommandValue::new_with_origin(
        resource.clone(),
        request.value_type,
        value,
        Utc::now().timestamp_millis(),
    ))
}

// =============================================================================
// Coercion Helpers
// =============================================================================

fn cast_failure(reading: &Value, target: &str) -> String {
    format!(
        "unable to cast {} of type {} to {}",
        reading,
        reading.type_name(),
        target
    )
}

fn coerce_bool(reading: &Value) -> Result<bool, String> {
    match reading {
        Value::Bool(b) => Ok(*b),
        Value::String(s) => match s.trim() {
            "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
            "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
            _ => Err(cast_failure(reading, "bool")),
        },
        Value::Float32(f) => Ok(*f != 0.0),
        Value::Float64(f) => Ok(*f != 0.0),
        _ => match reading.as_i64() {
            Some(n) => Ok(n != 0),
            None => Err(cast_failure(reading, "bool")),
        },
    }
}

fn coerce_string(reading: &Value) -> String {
    match reading {
        Value::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn coerce_i64(reading: &Value) -> Result<i64, String> {
    match reading {
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| cast_failure(reading, "int64")),
        Value::Float32(f) => float_to_i64(f64::from(*f)).ok_or_else(|| cast_failure(reading, "int64")),
        Value::Float64(f) => float_to_i64(*f).ok_or_else(|| cast_failure(reading, "int64")),
        _ => reading
            .as_i64()
            .ok_or_else(|| cast_failure(reading, "int64")),
    }
}

fn coerce_u64(reading: &Value) -> Result<u64, String> {
    match reading {
        Value::Bool(b) => Ok(u64::from(*b)),
        Value::String(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| cast_failure(reading, "uint64")),
        Value::Float32(f) => float_to_u64(f64::from(*f)).ok_or_else(|| cast_failure(reading, "uint64")),
        Value::Float64(f) => float_to_u64(*f).ok_or_else(|| cast_failure(reading, "uint64")),
        _ => reading
            .as_u64()
            .ok_or_else(|| cast_failure(reading, "uint64")),
    }
}

fn coerce_f64(reading: &Value) -> Result<f64, String> {
    match reading {
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| cast_failure(reading, "float64")),
        _ => reading
            .as_f64()
            .ok_or_else(|| cast_failure(reading, "float64")),
    }
}

fn coerce_f32(reading: &Value) -> Result<f32, String> {
    let wide = coerce_f64(reading)?;
    let narrow = wide as f32;
    if wide.is_finite() && narrow.is_infinite() {
        return Err(cast_failure(reading, "float32"));
    }
    Ok(narrow)
}

fn narrow_i64<T>(reading: &Value) -> Result<T, String>
where
    T: TryFrom<i64> + std::fmt::Display,
{
    let wide = coerce_i64(reading)?;
    T::try_from(wide).map_err(|_| {
        format!(
            "value {} out of range for {}",
            wide,
            std::any::type_name::<T>()
        )
    })
}

fn narrow_u64<T>(reading: &Value) -> Result<T, String>
where
    T: TryFrom<u64> + std::fmt::Display,
{
    let wide = coerce_u64(reading)?;
    T::try_from(wide).map_err(|_| {
        format!(
            "value {} out of range for {}",
            wide,
            std::any::type_name::<T>()
        )
    })
}

// Integer conversion only for floats with no fractional part in range.
// Upper bounds are exclusive: MAX rounds up to 2^63 / 2^64 as f64, so a
// reading of exactly 2^63 (or 2^64) must be rejected, not saturated.
fn float_to_i64(f: f64) -> Option<i64> {
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < 9_223_372_036_854_775_808.0 {
        Some(f as i64)
    } else {
        None
    }
}

fn float_to_u64(f: f64) -> Option<u64> {
    if f.fract() == 0.0 && f >= 0.0 && f < 18_446_744_073_709_551_616.0 {
        Some(f as u64)
    } else {
        None
    }
}

// =============================================================================
// Tests
// =============================================================================
