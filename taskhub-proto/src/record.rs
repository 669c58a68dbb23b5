//! Schemaless record plumbing shared by the document store and the
//! realtime tree.
//!
//! Writes are expressed as [`WriteFields`], an ordered list of field names
//! and [`FieldValue`]s. A [`FieldValue::ServerTimestamp`] is a sentinel that
//! the backing store replaces with its own clock at write time, so that
//! timestamps never come from the caller's device.
//!
//! Reads go the other way: a fetched [`Document`] is decoded field by field
//! with [`FieldReader`], which substitutes the documented default for any
//! field that is missing or has the wrong shape and records a
//! [`FieldFallback`] instead of failing the whole record.

use std::str::FromStr;

use serde_json::Value;

/// A fetched record as stored: field name to JSON value.
pub type Document = serde_json::Map<String, Value>;

/// A value to be written to a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// A concrete JSON value, written as-is.
    Value(Value),
    /// Replaced by the store's clock (epoch milliseconds) at write time.
    ServerTimestamp,
}

impl FieldValue {
    /// Resolves the value against the store's current time.
    #[must_use]
    pub fn resolve(&self, server_now_ms: u64) -> Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::ServerTimestamp => Value::from(server_now_ms),
        }
    }
}

/// An ordered set of field writes.
///
/// Setting the same field twice keeps the position of the first write and
/// the value of the last one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteFields(Vec<(String, FieldValue)>);

impl WriteFields {
    /// Creates an empty write.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Sets `name` to a concrete value.
    #[must_use]
    pub fn set(self, name: &str, value: impl Into<Value>) -> Self {
        self.with(name, FieldValue::Value(value.into()))
    }

    /// Sets `name` to the store's clock at write time.
    #[must_use]
    pub fn server_timestamp(self, name: &str) -> Self {
        self.with(name, FieldValue::ServerTimestamp)
    }

    fn with(mut self, name: &str, value: FieldValue) -> Self {
        if let Some(slot) = self.0.iter_mut().find(|(field, _)| field == name) {
            slot.1 = value;
        } else {
            self.0.push((name.to_string(), value));
        }
        self
    }

    /// Returns the pending value for `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Iterates over the writes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(field, value)| (field.as_str(), value))
    }

    /// Number of fields written.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no field is written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Materializes the write into a document, stamping server timestamps
    /// with `server_now_ms`.
    #[must_use]
    pub fn resolve(&self, server_now_ms: u64) -> Document {
        self.0
            .iter()
            .map(|(field, value)| (field.clone(), value.resolve(server_now_ms)))
            .collect()
    }
}

/// Why a field fell back to its default during decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// The field was absent (or `null`).
    Missing,
    /// The field was present with an unexpected JSON type.
    WrongType,
    /// The field had the right type but a value outside the accepted set.
    OutOfRange,
}

/// A field that was replaced by its default while decoding a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldFallback {
    /// Name of the field as stored.
    pub field: &'static str,
    /// What was wrong with it.
    pub reason: FallbackReason,
}

/// A decoded record plus the fields that had to fall back to defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    /// The decoded value. Always fully populated.
    pub value: T,
    /// Fields replaced by defaults, in decoding order.
    pub fallbacks: Vec<FieldFallback>,
}

impl<T> Decoded<T> {
    /// Returns `true` if every field decoded as stored.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.fallbacks.is_empty()
    }

    /// Fields that were present but unusable (wrong type or out of range).
    ///
    /// Missing fields are excluded: older records legitimately omit fields
    /// that were added later.
    pub fn malformed(&self) -> impl Iterator<Item = &FieldFallback> {
        self.fallbacks
            .iter()
            .filter(|fallback| fallback.reason != FallbackReason::Missing)
    }

    /// Returns `true` if any field was present but unusable.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        self.malformed().next().is_some()
    }

    /// Discards the fallback report.
    pub fn into_value(self) -> T {
        self.value
    }
}

/// Field-by-field decoder that never fails.
pub struct FieldReader<'a> {
    doc: &'a Document,
    fallbacks: Vec<FieldFallback>,
}

impl<'a> FieldReader<'a> {
    /// Starts decoding `doc`.
    #[must_use]
    pub const fn new(doc: &'a Document) -> Self {
        Self {
            doc,
            fallbacks: Vec::new(),
        }
    }

    fn fall_back(&mut self, field: &'static str, reason: FallbackReason) {
        self.fallbacks.push(FieldFallback { field, reason });
    }

    fn present(&mut self, field: &'static str) -> Option<&'a Value> {
        match self.doc.get(field) {
            None | Some(Value::Null) => {
                self.fall_back(field, FallbackReason::Missing);
                None
            }
            Some(value) => Some(value),
        }
    }

    /// Reads a string field, or `default`.
    pub fn string(&mut self, field: &'static str, default: &str) -> String {
        self.optional_string(field)
            .unwrap_or_else(|| default.to_string())
    }

    /// Reads a string field, or `None` if it is missing or not a string.
    pub fn optional_string(&mut self, field: &'static str) -> Option<String> {
        match self.present(field)? {
            Value::String(s) => Some(s.clone()),
            _ => {
                self.fall_back(field, FallbackReason::WrongType);
                None
            }
        }
    }

    /// Reads a non-negative epoch-millisecond field, or `0`.
    ///
    /// Whole-valued floats are accepted since some stores hand integers back
    /// as doubles.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss,
        clippy::float_cmp
    )]
    pub fn millis(&mut self, field: &'static str) -> u64 {
        let Some(value) = self.present(field) else {
            return 0;
        };
        let Value::Number(number) = value else {
            self.fall_back(field, FallbackReason::WrongType);
            return 0;
        };
        if let Some(ms) = number.as_u64() {
            return ms;
        }
        match number.as_f64() {
            Some(f) if f.fract() == 0.0 && f >= 0.0 && f <= u64::MAX as f64 => f as u64,
            _ => {
                self.fall_back(field, FallbackReason::OutOfRange);
                0
            }
        }
    }

    /// Reads a string field and parses it, falling back to `T::default()`
    /// when it is missing, not a string, or not a member of the set.
    pub fn parsed<T: FromStr + Default>(&mut self, field: &'static str) -> T {
        let Some(value) = self.present(field) else {
            return T::default();
        };
        let Value::String(raw) = value else {
            self.fall_back(field, FallbackReason::WrongType);
            return T::default();
        };
        raw.parse().unwrap_or_else(|_| {
            self.fall_back(field, FallbackReason::OutOfRange);
            T::default()
        })
    }

    /// Finishes decoding, attaching the fallback report to `value`.
    pub fn finish<T>(self, value: T) -> Decoded<T> {
        Decoded {
            value,
            fallbacks: self.fallbacks,
        }
    }
}

/// Decodes a JSON value that should be an object.
///
/// Non-object values decode as an empty document, so every field falls back.
#[must_use]
pub fn as_document(value: &Value) -> Document {
    match value {
        Value::Object(map) => map.clone(),
        _ => Document::new(),
    }
}
