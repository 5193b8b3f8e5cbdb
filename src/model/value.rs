//! Typed field values
//!
//! Values follow the backend's cross-type ordering:
//!
//! null < boolean < number < timestamp < string < bytes < reference
//! < geopoint < array < map
//!
//! Integers and doubles share one slot and compare numerically.
//! NaN sorts below every other number and compares equal to itself.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde_json::Value;

use super::document::DocumentKey;

/// Point in time with nanosecond precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: i32,
}

impl Timestamp {
    pub fn new(seconds: i64, nanos: i32) -> Self {
        Self { seconds, nanos }
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(time: DateTime<Utc>) -> Self {
        Self {
            seconds: time.timestamp(),
            nanos: time.timestamp_subsec_nanos() as i32,
        }
    }
}

/// Latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A value stored in a document field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    Timestamp(Timestamp),
    String(String),
    Bytes(Vec<u8>),
    Reference(DocumentKey),
    GeoPoint(GeoPoint),
    Array(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    /// Creates a reference value from a document path such as `cities/NYC`.
    /// Returns `None` when the path does not name a document.
    pub fn reference(path: &str) -> Option<Self> {
        DocumentKey::from_path_string(path)
            .ok()
            .map(FieldValue::Reference)
    }

    /// Position in the cross-type ordering
    pub fn type_order(&self) -> u8 {
        match self {
            FieldValue::Null => 0,
            FieldValue::Boolean(_) => 1,
            FieldValue::Integer(_) | FieldValue::Double(_) => 2,
            FieldValue::Timestamp(_) => 3,
            FieldValue::String(_) => 4,
            FieldValue::Bytes(_) => 5,
            FieldValue::Reference(_) => 6,
            FieldValue::GeoPoint(_) => 7,
            FieldValue::Array(_) => 8,
            FieldValue::Map(_) => 9,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn is_nan(&self) -> bool {
        matches!(self, FieldValue::Double(d) if d.is_nan())
    }

    pub fn is_array(&self) -> bool {
        matches!(self, FieldValue::Array(_))
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, FieldValue::Reference(_))
    }

    pub fn as_array(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::Array(values) => Some(values),
            _ => None,
        }
    }

    /// Key of the referenced document, if this is a reference
    pub fn reference_key(&self) -> Option<&DocumentKey> {
        match self {
            FieldValue::Reference(key) => Some(key),
            _ => None,
        }
    }

    /// Total order over all values
    pub fn compare(&self, other: &FieldValue) -> Ordering {
        let type_cmp = self.type_order().cmp(&other.type_order());
        if type_cmp != Ordering::Equal {
            return type_cmp;
        }

        match (self, other) {
            (FieldValue::Null, FieldValue::Null) => Ordering::Equal,
            (FieldValue::Boolean(a), FieldValue::Boolean(b)) => a.cmp(b),
            (FieldValue::Integer(a), FieldValue::Integer(b)) => a.cmp(b),
            (FieldValue::Double(a), FieldValue::Double(b)) => compare_doubles(*a, *b),
            (FieldValue::Double(a), FieldValue::Integer(b)) => compare_mixed(*a, *b),
            (FieldValue::Integer(a), FieldValue::Double(b)) => compare_mixed(*b, *a).reverse(),
            (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => a.cmp(b),
            (FieldValue::String(a), FieldValue::String(b)) => a.cmp(b),
            (FieldValue::Bytes(a), FieldValue::Bytes(b)) => a.cmp(b),
            (FieldValue::Reference(a), FieldValue::Reference(b)) => a.cmp(b),
            (FieldValue::GeoPoint(a), FieldValue::GeoPoint(b)) => {
                compare_doubles(a.latitude, b.latitude)
                    .then_with(|| compare_doubles(a.longitude, b.longitude))
            }
            (FieldValue::Array(a), FieldValue::Array(b)) => {
                for (left, right) in a.iter().zip(b.iter()) {
                    let cmp = left.compare(right);
                    if cmp != Ordering::Equal {
                        return cmp;
                    }
                }
                a.len().cmp(&b.len())
            }
            (FieldValue::Map(a), FieldValue::Map(b)) => {
                // BTreeMap iterates in key order
                for ((left_key, left), (right_key, right)) in a.iter().zip(b.iter()) {
                    let cmp = left_key.cmp(right_key).then_with(|| left.compare(right));
                    if cmp != Ordering::Equal {
                        return cmp;
                    }
                }
                a.len().cmp(&b.len())
            }
            _ => Ordering::Equal,
        }
    }

    /// Strict equality. Integers never equal doubles here, unlike `compare`.
    pub fn equals(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (FieldValue::Null, FieldValue::Null) => true,
            (FieldValue::Boolean(a), FieldValue::Boolean(b)) => a == b,
            (FieldValue::Integer(a), FieldValue::Integer(b)) => a == b,
            (FieldValue::Double(a), FieldValue::Double(b)) => double_equals(*a, *b),
            (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => a == b,
            (FieldValue::String(a), FieldValue::String(b)) => a == b,
            (FieldValue::Bytes(a), FieldValue::Bytes(b)) => a == b,
            (FieldValue::Reference(a), FieldValue::Reference(b)) => a == b,
            (FieldValue::GeoPoint(a), FieldValue::GeoPoint(b)) => {
                double_equals(a.latitude, b.latitude) && double_equals(a.longitude, b.longitude)
            }
            (FieldValue::Array(a), FieldValue::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(l, r)| l.equals(r))
            }
            (FieldValue::Map(a), FieldValue::Map(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(k, v)| b.get(k).map_or(false, |other| v.equals(other)))
            }
            _ => false,
        }
    }

    /// True if `self` is an array holding an element equal to `value`
    pub fn array_contains(&self, value: &FieldValue) -> bool {
        self.as_array()
            .map_or(false, |values| values.iter().any(|v| v.equals(value)))
    }

    /// String form used inside canonical ids. Not collision-free: the string
    /// `"1"` and the integer `1` render the same.
    pub fn canonical_id(&self) -> String {
        match self {
            FieldValue::Null => "null".to_string(),
            FieldValue::Boolean(b) => b.to_string(),
            FieldValue::Integer(i) => i.to_string(),
            FieldValue::Double(d) => d.to_string(),
            FieldValue::Timestamp(t) => format!("time({},{})", t.seconds, t.nanos),
            FieldValue::String(s) => s.clone(),
            FieldValue::Bytes(bytes) => BASE64.encode(bytes),
            FieldValue::Reference(key) => key.path().canonical_string(),
            FieldValue::GeoPoint(g) => format!("geo({},{})", g.latitude, g.longitude),
            FieldValue::Array(values) => {
                let parts: Vec<String> = values.iter().map(FieldValue::canonical_id).collect();
                format!("[{}]", parts.join(","))
            }
            FieldValue::Map(map) => {
                let parts: Vec<String> = map
                    .iter()
                    .map(|(k, v)| format!("{}:{}", k, v.canonical_id()))
                    .collect();
                format!("{{{}}}", parts.join(","))
            }
        }
    }
}

fn compare_doubles(a: f64, b: f64) -> Ordering {
    match a.partial_cmp(&b) {
        Some(ordering) => ordering,
        None => match (a.is_nan(), b.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            _ => Ordering::Greater,
        },
    }
}

/// Compares a double with an integer without losing integer precision
fn compare_mixed(double: f64, long: i64) -> Ordering {
    // i64::MIN is exactly representable; 2^63 is the first double above i64::MAX
    const MIN_LONG: f64 = -9_223_372_036_854_775_808.0;
    const MAX_LONG: f64 = 9_223_372_036_854_775_808.0;

    if double.is_nan() || double < MIN_LONG {
        return Ordering::Less;
    }
    if double >= MAX_LONG {
        return Ordering::Greater;
    }
    let truncated = double as i64;
    match truncated.cmp(&long) {
        Ordering::Equal => compare_doubles(double, long as f64),
        unequal => unequal,
    }
}

fn double_equals(a: f64, b: f64) -> bool {
    if a.is_nan() && b.is_nan() {
        return true;
    }
    a == b && a.is_sign_negative() == b.is_sign_negative()
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_id())
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Boolean(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Integer(i),
                None => FieldValue::Double(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => FieldValue::String(s),
            Value::Array(values) => {
                FieldValue::Array(values.into_iter().map(FieldValue::from).collect())
            }
            Value::Object(map) => FieldValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, FieldValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(time: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(time.into())
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Integer(i)
    }
}

impl From<f64> for FieldValue {
    fn from(d: f64) -> Self {
        FieldValue::Double(d)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Boolean(b)
    }
}
