// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request schema validation.
//!
//! Request types derive [`validator::Validate`]; [`ensure_valid`] runs the
//! schema once and reports every violation together, keyed by the field's
//! wire (camelCase) name.

use crate::error::{AppError, FieldViolation};
use std::borrow::Cow;
use validator::{Validate, ValidateEmail, ValidationError};

/// Rejects empty and whitespace-only strings.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message(Cow::Borrowed("is required")));
    }
    Ok(())
}

/// Requires a non-blank value that is an email address once trimmed.
pub fn required_email(value: &str) -> Result<(), ValidationError> {
    not_blank(value)?;
    if value.trim().validate_email() {
        return Ok(());
    }
    Err(ValidationError::new("email")
        .with_message(Cow::Borrowed("must be a valid email address")))
}

/// Collect every field violation of `input`, sorted by field name.
pub fn violations<T: Validate>(input: &T) -> Vec<FieldViolation> {
    let Err(errors) = input.validate() else {
        return Vec::new();
    };

    let mut out: Vec<FieldViolation> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            let wire = to_camel_case(&field);
            errs.iter()
                .map(|err| {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| default_message(&err.code));
                    FieldViolation::new(wire.clone(), message)
                })
                .collect::<Vec<_>>()
        })
        .collect();

    out.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.message.cmp(&b.message)));
    out
}

/// Fail with [`AppError::Validation`] if any violation is present.
pub fn ensure(violations: Vec<FieldViolation>) -> Result<(), AppError> {
    if violations.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(violations))
    }
}

/// Validate `input` against its schema.
pub fn ensure_valid<T: Validate>(input: &T) -> Result<(), AppError> {
    ensure(violations(input))
}

fn default_message(code: &str) -> String {
    match code {
        "email" => "must be a valid email address".to_string(),
        "length" => "has an invalid length".to_string(),
        other => format!("failed validation ({})", other),
    }
}

fn to_camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper_next = false;
    for ch in field.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}
