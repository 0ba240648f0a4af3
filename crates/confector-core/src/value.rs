use chrono::{DateTime, Utc};
use confector_schema::{AssignmentType, ValueKind};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::{Map, Number, Value};
use url::Url;

/// A property value that passed casting.
///
/// Each variant belongs to exactly one assignable kind; `Selector` is the
/// value of a link.
#[derive(Clone, Debug, PartialEq)]
pub enum TypedValue {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Enum(String),
    Date(DateTime<Utc>),
    Selector(Selector),
    List(Vec<TypedValue>),
    FeatureList(Vec<bool>),
    Url(Url),
    TextArea(String),
    Tags(Vec<String>),
    Hierarchies(Vec<Vec<String>>),
    Location(Map<String, Value>),
}

impl TypedValue {
    /// The assignment type this value satisfies.
    pub fn assignment_type(&self) -> AssignmentType {
        match self.kind() {
            Some(kind) => AssignmentType::Kind(kind),
            None => AssignmentType::Selector,
        }
    }

    /// The value kind, or `None` for a selector.
    pub fn kind(&self) -> Option<ValueKind> {
        let kind = match self {
            Self::Integer(_) => ValueKind::Integer,
            Self::Float(_) => ValueKind::Float,
            Self::String(_) => ValueKind::String,
            Self::Boolean(_) => ValueKind::Boolean,
            Self::Enum(_) => ValueKind::Enum,
            Self::Date(_) => ValueKind::Date,
            Self::Selector(_) => return None,
            Self::List(_) => ValueKind::List,
            Self::FeatureList(_) => ValueKind::FeatureList,
            Self::Url(_) => ValueKind::Url,
            Self::TextArea(_) => ValueKind::TextArea,
            Self::Tags(_) => ValueKind::Tags,
            Self::Hierarchies(_) => ValueKind::Hierarchies,
            Self::Location(_) => ValueKind::Location,
        };
        Some(kind)
    }

    /// The JSON form written to the archive.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Integer(i) => Value::from(*i),
            Self::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
            Self::String(s) | Self::Enum(s) | Self::TextArea(s) => Value::String(s.clone()),
            Self::Boolean(b) => Value::Bool(*b),
            Self::Date(dt) => Value::from(dt.timestamp()),
            Self::Selector(sel) => sel.to_json(),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::FeatureList(flags) => Value::from(flags.clone()),
            Self::Url(url) => Value::String(url.to_string()),
            Self::Tags(tags) => Value::from(tags.clone()),
            Self::Hierarchies(paths) => {
                Value::Array(paths.iter().map(|p| Value::from(p.clone())).collect())
            }
            Self::Location(map) => Value::Object(map.clone()),
        }
    }
}

impl Serialize for TypedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Integer(i) => serializer.serialize_i64(*i),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::String(s) | Self::Enum(s) | Self::TextArea(s) => serializer.serialize_str(s),
            Self::Boolean(b) => serializer.serialize_bool(*b),
            Self::Date(dt) => serializer.serialize_i64(dt.timestamp()),
            Self::Selector(sel) => sel.serialize(serializer),
            Self::List(items) => items.serialize(serializer),
            Self::FeatureList(flags) => flags.serialize(serializer),
            Self::Url(url) => serializer.serialize_str(url.as_str()),
            Self::Tags(tags) => tags.serialize(serializer),
            Self::Hierarchies(paths) => paths.serialize(serializer),
            Self::Location(map) => map.serialize(serializer),
        }
    }
}

/// The value of a link property: one or more values of the link's
/// resolved target kind.
#[derive(Clone, Debug, PartialEq)]
pub struct Selector {
    kind: ValueKind,
    values: Vec<TypedValue>,
}

impl Selector {
    /// `None` if `values` is empty or any value is not of `kind`.
    pub fn new(kind: ValueKind, values: Vec<TypedValue>) -> Option<Self> {
        let uniform = values.iter().all(|v| v.kind() == Some(kind));
        (!values.is_empty() && uniform).then_some(Self { kind, values })
    }

    /// Kind shared by all values.
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn values(&self) -> &[TypedValue] {
        &self.values
    }

    fn to_json(&self) -> Value {
        Value::Array(
            self.values
                .iter()
                .map(|v| {
                    let mut entry = Map::new();
                    entry.insert("type".into(), Value::from(self.kind.name()));
                    entry.insert("value".into(), v.to_json());
                    Value::Object(entry)
                })
                .collect(),
        )
    }
}

/// Serialized as `[{"type": <kind>, "value": <value>}, ...]`.
impl Serialize for Selector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        struct Element<'a>(ValueKind, &'a TypedValue);

        impl Serialize for Element<'_> {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", self.0.name())?;
                map.serialize_entry("value", self.1)?;
                map.end()
            }
        }

        let mut seq = serializer.serialize_seq(Some(self.values.len()))?;
        for value in &self.values {
            seq.serialize_element(&Element(self.kind, value))?;
        }
        seq.end()
    }
}

/// Input to a property assignment.
#[derive(Clone, Debug, PartialEq)]
pub enum RawValue {
    Null,
    Json(Value),
    Typed(TypedValue),
}

impl RawValue {
    /// True for `Null` and for JSON `null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null | Self::Json(Value::Null))
    }

    /// JSON form, used for casting and error reports.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Json(v) => v.clone(),
            Self::Typed(t) => t.to_json(),
        }
    }
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            other => Self::Json(other),
        }
    }
}

impl From<TypedValue> for RawValue {
    fn from(value: TypedValue) -> Self {
        Self::Typed(value)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

macro_rules! raw_from_json {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for RawValue {
                fn from(value: $t) -> Self {
                    Self::Json(Value::from(value))
                }
            }
        )*
    };
}

raw_from_json!(i32, i64, u32, u64, bool, &str, String, Vec<Value>);

/// Non-finite floats have no JSON number form; they are kept as their
/// string rendering so casting reports them instead of treating them as null.
impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        match Number::from_f64(value) {
            Some(n) => Self::Json(Value::Number(n)),
            None => Self::Json(Value::String(value.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn assignment_types() {
        assert_eq!(
            TypedValue::Integer(1).assignment_type(),
            AssignmentType::Kind(ValueKind::Integer)
        );
        let sel = Selector::new(ValueKind::String, vec![TypedValue::String("a".into())]).unwrap();
        assert_eq!(TypedValue::Selector(sel).assignment_type(), AssignmentType::Selector);
    }

    #[test]
    fn selector_rejects_empty_and_mixed() {
        assert!(Selector::new(ValueKind::Integer, vec![]).is_none());
        assert!(Selector::new(
            ValueKind::Integer,
            vec![TypedValue::Integer(1), TypedValue::Float(2.0)]
        )
        .is_none());
    }

    #[test]
    fn selector_serialization() {
        let sel = Selector::new(
            ValueKind::Integer,
            vec![TypedValue::Integer(3), TypedValue::Integer(4)],
        )
        .unwrap();
        let expected = json!([
            {"type": "KubunInt", "value": 3},
            {"type": "KubunInt", "value": 4},
        ]);
        assert_eq!(serde_json::to_value(&sel).unwrap(), expected);
        assert_eq!(TypedValue::Selector(sel).to_json(), expected);
    }

    #[test]
    fn date_serializes_as_unix_seconds() {
        let dt = DateTime::from_timestamp(1_600_000_000, 0).unwrap();
        let value = TypedValue::Date(dt);
        assert_eq!(serde_json::to_value(&value).unwrap(), json!(1_600_000_000));
        assert_eq!(value.to_json(), json!(1_600_000_000));
    }

    #[test]
    fn url_serializes_as_string() {
        let value = TypedValue::Url(Url::parse("https://kubun.io/zoo").unwrap());
        assert_eq!(serde_json::to_value(&value).unwrap(), json!("https://kubun.io/zoo"));
    }

    #[test]
    fn serialize_matches_to_json() {
        let values = vec![
            TypedValue::Float(1.5),
            TypedValue::Enum("mammal".into()),
            TypedValue::List(vec![TypedValue::Integer(1), TypedValue::Integer(2)]),
            TypedValue::FeatureList(vec![true, false]),
            TypedValue::Tags(vec!["a".into()]),
            TypedValue::Hierarchies(vec![vec!["animalia".into(), "chordata".into()]]),
            TypedValue::Location(json!({"lat": 1.0}).as_object().unwrap().clone()),
        ];
        for value in values {
            assert_eq!(serde_json::to_value(&value).unwrap(), value.to_json());
        }
    }

    #[test]
    fn raw_value_conversions() {
        assert!(RawValue::from(Value::Null).is_null());
        assert!(RawValue::from(None::<i64>).is_null());
        assert!(RawValue::Json(Value::Null).is_null());
        assert_eq!(RawValue::from(Some(5)), RawValue::Json(json!(5)));
        assert_eq!(RawValue::from("x"), RawValue::Json(json!("x")));
        assert_eq!(RawValue::from(2.5), RawValue::Json(json!(2.5)));
        assert_eq!(RawValue::from(f64::NAN), RawValue::Json(json!("NaN")));
        assert_eq!(RawValue::from(f64::NEG_INFINITY), RawValue::Json(json!("-inf")));
        assert!(!RawValue::from(f64::INFINITY).is_null());
        assert_eq!(
            RawValue::from(TypedValue::Boolean(true)).to_json(),
            json!(true)
        );
    }
}
