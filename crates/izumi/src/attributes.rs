use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use serde::Serialize;

use crate::time::{parse_date, parse_duration};
use crate::xml::Element;

/// A typed manifest attribute value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    String(String),
    Bag(AttributeBag),
    List(Vec<Value>),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(number) => Some(*number),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bag(&self) -> Option<&AttributeBag> {
        match self {
            Value::Bag(bag) => Some(bag),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }
}

/// Attribute names mapped to typed values, accumulated while walking down the
/// manifest tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AttributeBag {
    entries: BTreeMap<String, Value>,
}

impl AttributeBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_number)
    }

    /// Numeric value with a fallback that applies only when the key is absent
    /// (a NaN stored under the key is returned as-is).
    pub fn number_or(&self, key: &str, fallback: f64) -> f64 {
        self.number(key).unwrap_or(fallback)
    }

    /// Numeric value, treating zero and NaN the same as an absent key.
    pub fn nonzero_number(&self, key: &str) -> Option<f64> {
        self.number(key).filter(|n| *n != 0.0 && !n.is_nan())
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn bag(&self, key: &str) -> Option<&AttributeBag> {
        self.get(key).and_then(Value::as_bag)
    }

    pub fn list(&self, key: &str) -> Option<&[Value]> {
        self.get(key).and_then(Value::as_list)
    }
}

/// Builds a new bag from a parent bag overlaid with a child bag.
///
/// Per-key rules: lists concatenate, nested bags merge recursively, anything
/// else is overridden by the child. Neither input is mutated, so sibling
/// branches of the tree never observe each other's values.
pub fn merge(parent: &AttributeBag, child: &AttributeBag) -> AttributeBag {
    let mut result = parent.clone();
    for (key, value) in &child.entries {
        let merged = match (result.entries.get(key), value) {
            (Some(Value::List(existing)), Value::List(update)) => {
                let mut list = existing.clone();
                list.extend(update.iter().cloned());
                Value::List(list)
            }
            (Some(Value::Bag(existing)), Value::Bag(update)) => Value::Bag(merge(existing, update)),
            _ => value.clone(),
        };
        result.entries.insert(key.clone(), merged);
    }
    result
}

/// Integer parse that accepts leading digits and yields NaN otherwise, so a
/// malformed numeric attribute poisons later arithmetic instead of being
/// silently replaced.
pub(crate) fn lenient_int(value: &str) -> f64 {
    let value = value.trim_start();
    let (sign, digits) = match value.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, value.strip_prefix('+').unwrap_or(value)),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return f64::NAN;
    }

    sign * digits[..end].parse::<f64>().unwrap_or(f64::NAN)
}

type AttributeParser = fn(&str) -> Value;

fn duration_seconds(value: &str) -> Value {
    Value::Number(parse_duration(value))
}

fn date_seconds(value: &str) -> Value {
    Value::Number(parse_date(value))
}

fn integer(value: &str) -> Value {
    Value::Number(lenient_int(value))
}

// Period@duration shares the attribute name with the segment duration in
// timescale units, so the integer form is preferred and the ISO form is the
// fallback.
fn integer_or_duration(value: &str) -> Value {
    let number = lenient_int(value);
    if number.is_nan() {
        Value::Number(parse_duration(value))
    } else {
        Value::Number(number)
    }
}

static ATTRIBUTE_PARSERS: LazyLock<HashMap<&'static str, AttributeParser>> = LazyLock::new(|| {
    let mut parsers: HashMap<&'static str, AttributeParser> = HashMap::new();
    parsers.insert("mediaPresentationDuration", duration_seconds);
    parsers.insert("minimumUpdatePeriod", duration_seconds);
    parsers.insert("timeShiftBufferDepth", duration_seconds);
    parsers.insert("start", duration_seconds);
    parsers.insert("availabilityStartTime", date_seconds);
    parsers.insert("width", integer);
    parsers.insert("height", integer);
    parsers.insert("bandwidth", integer);
    parsers.insert("startNumber", integer);
    parsers.insert("timescale", integer);
    parsers.insert("d", integer);
    parsers.insert("t", integer);
    parsers.insert("r", integer);
    parsers.insert("duration", integer_or_duration);
    parsers
});

/// Parses the attributes of an element, applying the typed parser registered
/// for each known name and passing everything else through as a string.
pub fn parse_attributes(element: &Element) -> AttributeBag {
    let mut bag = AttributeBag::new();
    for (name, value) in element.attributes() {
        match ATTRIBUTE_PARSERS.get(name.as_str()) {
            Some(parser) => bag.insert(name.clone(), parser(value)),
            None => bag.insert(name.clone(), Value::String(value.clone())),
        }
    }
    bag
}
