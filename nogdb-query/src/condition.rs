//! The condition/filter expression tree (§4.7): typed comparators over a
//! decoded record, combined into `MultiCondition` trees of AND/OR/NOT.

use crate::record::DecodedRecord;
use nogdb_api::{Error, PropertyId, PropertyType, Result, Value};
use ordered_float::OrderedFloat;
use std::collections::HashMap;

/// A property's declared type, looked up by name — what the filter engine
/// needs to decode a record's raw bytes before comparing.
pub type PropertyTypeMap = HashMap<String, (PropertyId, PropertyType)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
    Contain,
    BeginWith,
    EndWith,
    Like,
    Between,
    In,
    Null,
}

/// The operand(s) a comparator is evaluated against.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    One(Value),
    Between(Value, Value),
    Many(Vec<Value>),
    None,
}

/// A single `property <op> literal` leaf condition.
#[derive(Debug, Clone)]
pub struct Condition {
    pub property: String,
    pub comparator: Comparator,
    pub operand: Operand,
    pub ignore_case: bool,
    pub negate: bool,
}

impl Condition {
    pub fn new(property: impl Into<String>, comparator: Comparator, operand: Operand) -> Self {
        Condition {
            property: property.into(),
            comparator,
            operand,
            ignore_case: false,
            negate: false,
        }
    }

    pub fn eq(property: impl Into<String>, value: Value) -> Self {
        Condition::new(property, Comparator::Eq, Operand::One(value))
    }

    pub fn is_null(property: impl Into<String>) -> Self {
        Condition::new(property, Comparator::Null, Operand::None)
    }

    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    pub fn not(mut self) -> Self {
        self.negate = !self.negate;
        self
    }
}

/// A tree of conditions combined with AND/OR/NOT.
#[derive(Debug, Clone)]
pub enum MultiCondition {
    Leaf(Condition),
    And(Box<MultiCondition>, Box<MultiCondition>),
    Or(Box<MultiCondition>, Box<MultiCondition>),
    Not(Box<MultiCondition>),
}

impl MultiCondition {
    pub fn leaf(c: Condition) -> Self {
        MultiCondition::Leaf(c)
    }

    pub fn and(self, other: MultiCondition) -> Self {
        MultiCondition::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: MultiCondition) -> Self {
        MultiCondition::Or(Box::new(self), Box::new(other))
    }

    pub fn negate(self) -> Self {
        MultiCondition::Not(Box::new(self))
    }
}

impl From<Condition> for MultiCondition {
    fn from(c: Condition) -> Self {
        MultiCondition::Leaf(c)
    }
}

fn text_eq(a: &str, b: &str, ignore_case: bool) -> bool {
    if ignore_case {
        a.eq_ignore_ascii_case(b)
    } else {
        a == b
    }
}

fn fold(s: &str, ignore_case: bool) -> String {
    if ignore_case {
        s.to_lowercase()
    } else {
        s.to_string()
    }
}

/// Numeric ordering over the scalar variants that carry an order; `None`
/// for incomparable pairs (e.g. comparing a Text literal to a Blob record).
fn numeric_cmp(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    use Value::*;
    let af = as_f64(a)?;
    let bf = as_f64(b)?;
    Some(OrderedFloat(af).cmp(&OrderedFloat(bf)))
}

fn as_f64(v: &Value) -> Option<f64> {
    use Value::*;
    Some(match v {
        TinyInt(x) => *x as f64,
        UnsignedTinyInt(x) => *x as f64,
        SmallInt(x) => *x as f64,
        UnsignedSmallInt(x) => *x as f64,
        Integer(x) => *x as f64,
        UnsignedInteger(x) => *x as f64,
        BigInt(x) => *x as f64,
        UnsignedBigInt(x) => *x as f64,
        Real(x) => *x,
        Text(_) | Blob(_) => return None,
    })
}

fn as_text(v: &Value) -> Option<&str> {
    match v {
        Value::Text(s) => Some(s.as_str()),
        _ => None,
    }
}

/// Evaluates one leaf condition against a decoded property value.
///
/// `decoded` is `None` when the property is absent from the record's
/// schema-derived type map (dropped or never defined for this class); per
/// the spec this short-circuits every comparator to `false` except `NULL`,
/// which becomes `true`.
fn eval_leaf(cond: &Condition, decoded: Option<&Value>, property_type: Option<PropertyType>) -> Result<bool> {
    let result = match (cond.comparator, decoded) {
        (Comparator::Null, None) => true,
        (Comparator::Null, Some(_)) => false,
        (_, None) => false,
        (comparator, Some(value)) => eval_non_null(comparator, value, &cond.operand, cond.ignore_case, property_type)?,
    };
    Ok(result ^ cond.negate)
}

fn eval_non_null(
    comparator: Comparator,
    value: &Value,
    operand: &Operand,
    ignore_case: bool,
    property_type: Option<PropertyType>,
) -> Result<bool> {
    if property_type == Some(PropertyType::Blob) {
        return match comparator {
            Comparator::Eq => Ok(matches!((value, operand), (Value::Blob(a), Operand::One(Value::Blob(b))) if a == b)),
            _ => Err(Error::InvalidComparator),
        };
    }

    match comparator {
        Comparator::Eq => Ok(eq_value(value, operand, ignore_case)),
        Comparator::Gt | Comparator::Ge | Comparator::Lt | Comparator::Le => {
            let Operand::One(rhs) = operand else {
                return Err(Error::InvalidComparator);
            };
            let ord = match (as_text(value), as_text(rhs)) {
                (Some(a), Some(b)) => fold(a, ignore_case).cmp(&fold(b, ignore_case)),
                _ => numeric_cmp(value, rhs).ok_or(Error::InvalidComparator)?,
            };
            Ok(match comparator {
                Comparator::Gt => ord.is_gt(),
                Comparator::Ge => ord.is_ge(),
                Comparator::Lt => ord.is_lt(),
                Comparator::Le => ord.is_le(),
                _ => unreachable!(),
            })
        }
        Comparator::Contain | Comparator::BeginWith | Comparator::EndWith | Comparator::Like => {
            let (Some(haystack), Operand::One(rhs)) = (as_text(value), operand) else {
                return Err(Error::InvalidComparator);
            };
            let Some(needle) = as_text(rhs) else {
                return Err(Error::InvalidComparator);
            };
            let h = fold(haystack, ignore_case);
            let n = fold(needle, ignore_case);
            Ok(match comparator {
                Comparator::Contain => h.contains(&n),
                Comparator::BeginWith => h.starts_with(&n),
                Comparator::EndWith => h.ends_with(&n),
                Comparator::Like => like_match(&h, &n),
                _ => unreachable!(),
            })
        }
        Comparator::Between => {
            let Operand::Between(lo, hi) = operand else {
                return Err(Error::InvalidComparator);
            };
            let above_lo = numeric_cmp(value, lo).ok_or(Error::InvalidComparator)?.is_ge();
            let below_hi = numeric_cmp(value, hi).ok_or(Error::InvalidComparator)?.is_le();
            Ok(above_lo && below_hi)
        }
        Comparator::In => {
            let Operand::Many(items) = operand else {
                return Err(Error::InvalidComparator);
            };
            Ok(items.iter().any(|item| eq_value(value, &Operand::One(item.clone()), ignore_case)))
        }
        Comparator::Null => unreachable!("handled by caller"),
    }
}

fn eq_value(value: &Value, operand: &Operand, ignore_case: bool) -> bool {
    let Operand::One(rhs) = operand else {
        return false;
    };
    match (as_text(value), as_text(rhs)) {
        (Some(a), Some(b)) => text_eq(a, b, ignore_case),
        _ => value == rhs,
    }
}

/// `%`/`_` SQL-style wildcard match, case already folded by the caller.
fn like_match(haystack: &str, pattern: &str) -> bool {
    fn go(h: &[u8], p: &[u8]) -> bool {
        match p.first() {
            None => h.is_empty(),
            Some(b'%') => go(h, &p[1..]) || (!h.is_empty() && go(&h[1..], p)),
            Some(b'_') => !h.is_empty() && go(&h[1..], &p[1..]),
            Some(c) => h.first() == Some(c) && go(&h[1..], &p[1..]),
        }
    }
    go(haystack.as_bytes(), pattern.as_bytes())
}

/// Evaluates a condition tree against a decoded record and its schema's
/// property-type map, returning `false` (not an error) when a property is
/// entirely absent — except `NULL`, which becomes `true` — per §4.7 step 1.
pub fn evaluate(tree: &MultiCondition, record: &DecodedRecord, types: &PropertyTypeMap) -> Result<bool> {
    match tree {
        MultiCondition::Leaf(cond) => {
            let entry = types.get(&cond.property);
            let decoded = match entry {
                Some((id, ty)) => record.decode_property(*id, *ty)?,
                None => None,
            };
            let property_type = entry.map(|(_, ty)| *ty);
            eval_leaf(cond, decoded.as_ref(), property_type)
        }
        MultiCondition::And(a, b) => Ok(evaluate(a, record, types)? && evaluate(b, record, types)?),
        MultiCondition::Or(a, b) => Ok(evaluate(a, record, types)? || evaluate(b, record, types)?),
        MultiCondition::Not(inner) => Ok(!evaluate(inner, record, types)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    fn types() -> PropertyTypeMap {
        let mut m = Map::new();
        m.insert("temperature".to_string(), (1, PropertyType::Integer));
        m.insert("rating".to_string(), (2, PropertyType::Real));
        m.insert("name".to_string(), (3, PropertyType::Text));
        m
    }

    fn record(temperature: i32, rating: f64, name: &str) -> DecodedRecord {
        let mut r = DecodedRecord::new();
        r.set_raw(1, nogdb_api::Bytes::from_int(temperature));
        r.set_raw(2, nogdb_api::Bytes::from_real(rating));
        r.set_raw(3, nogdb_api::Bytes::from_text(name));
        r
    }

    #[test]
    fn compound_expression_matches_either_branch() {
        // (temperature > 35) OR (rating >= 4.5 AND name beginWith "E")
        let tree = MultiCondition::leaf(Condition::new(
            "temperature",
            Comparator::Gt,
            Operand::One(Value::Integer(35)),
        ))
        .or(MultiCondition::leaf(Condition::new(
            "rating",
            Comparator::Ge,
            Operand::One(Value::Real(4.5)),
        ))
        .and(MultiCondition::leaf(Condition::new(
            "name",
            Comparator::BeginWith,
            Operand::One(Value::Text("E".into())),
        ))));

        let types = types();
        assert!(evaluate(&tree, &record(40, 1.0, "Anything"), &types).unwrap());
        assert!(evaluate(&tree, &record(10, 4.8, "Elephant"), &types).unwrap());
        assert!(!evaluate(&tree, &record(10, 4.8, "Zebra"), &types).unwrap());
        assert!(!evaluate(&tree, &record(10, 1.0, "Elephant"), &types).unwrap());
    }

    #[test]
    fn null_short_circuits_other_comparators_to_false() {
        let types = types();
        let mut r = DecodedRecord::new();
        r.set_raw(3, nogdb_api::Bytes::empty());
        // missing "temperature" entirely
        let eq_cond = MultiCondition::leaf(Condition::eq("temperature", Value::Integer(1)));
        assert!(!evaluate(&eq_cond, &r, &types).unwrap());

        let null_cond = MultiCondition::leaf(Condition::is_null("temperature"));
        assert!(evaluate(&null_cond, &r, &types).unwrap());
    }

    #[test]
    fn blob_only_supports_eq_and_null() {
        let mut types = Map::new();
        types.insert("payload".to_string(), (9, PropertyType::Blob));
        let mut r = DecodedRecord::new();
        r.set_raw(9, nogdb_api::Bytes::from_blob(&[1, 2, 3]));

        let eq = MultiCondition::leaf(Condition::eq("payload", Value::Blob(vec![1, 2, 3])));
        assert!(evaluate(&eq, &r, &types).unwrap());

        let gt = MultiCondition::leaf(Condition::new(
            "payload",
            Comparator::Gt,
            Operand::One(Value::Blob(vec![1])),
        ));
        assert_eq!(evaluate(&gt, &r, &types).unwrap_err(), Error::InvalidComparator);
    }

    #[test]
    fn ignore_case_text_comparisons() {
        let types = types();
        let cond = MultiCondition::leaf(
            Condition::eq("name", Value::Text("elephant".into())).ignore_case(),
        );
        assert!(evaluate(&cond, &record(0, 0.0, "ELEPHANT"), &types).unwrap());
    }
}
