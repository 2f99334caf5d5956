use crate::{Error, Result, Type};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A column or bind value.
///
/// On the wire the value is untagged; temporal values travel as ISO-8601
/// strings (or, from some backends, epoch milliseconds) and are restored with
/// [`Value::materialize`] once the column type is known. Strings always
/// deserialize as `String`, whatever they look like.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,

    Bool(bool),

    I64(i64),

    F64(f64),

    // Ahead of the temporal variants so text is never read as a date
    String(String),

    Date(NaiveDate),

    DateTime(NaiveDateTime),
}

impl Value {
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::I64(v) => Some(*v),
            Self::F64(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::I64(v) => Some(*v as f64),
            Self::F64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(v) => Some(*v),
            Self::DateTime(v) => Some(v.date()),
            _ => None,
        }
    }

    /// Temporal values as a date-time; dates are taken at midnight.
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Date(v) => Some(v.and_time(NaiveTime::MIN)),
            Self::DateTime(v) => Some(*v),
            _ => None,
        }
    }

    /// Value equality as used for dirty tracking.
    ///
    /// Integers and floats compare numerically, and a date equals a
    /// date-time at midnight of the same day.
    pub fn same_as(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            _ => self.compare(other) == Some(Ordering::Equal),
        }
    }

    /// Orders two values of compatible kinds. Nulls and mismatched kinds do
    /// not compare.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::I64(a), Value::I64(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::I64(_) | Value::F64(_), Value::I64(_) | Value::F64(_)) => {
                self.as_f64()?.partial_cmp(&other.as_f64()?)
            }
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Date(_) | Value::DateTime(_), Value::Date(_) | Value::DateTime(_)) => {
                Some(self.as_datetime()?.cmp(&other.as_datetime()?))
            }
            _ => None,
        }
    }

    /// Render the value as an inline SQL literal.
    pub fn to_sql_literal(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(true) => "1".to_string(),
            Value::Bool(false) => "0".to_string(),
            Value::I64(v) => v.to_string(),
            Value::F64(v) => v.to_string(),
            Value::Date(v) => format!("'{}'", v.format("%Y-%m-%d")),
            Value::DateTime(v) => format!("'{}'", v.format("%Y-%m-%d %H:%M:%S")),
            Value::String(v) => format!("'{}'", v.replace('\'', "''")),
        }
    }

    /// Restore a raw backend value into the shape the column type calls for.
    ///
    /// Only temporal columns are touched: epoch milliseconds and ISO-8601
    /// strings become dates or date-times. Anything that does not parse is
    /// kept as it arrived.
    pub fn materialize(self, ty: Option<Type>) -> Value {
        let Some(ty) = ty.filter(|ty| ty.is_temporal()) else {
            return self;
        };

        let datetime = match &self {
            Value::I64(millis) => DateTime::from_timestamp_millis(*millis).map(|v| v.naive_utc()),
            Value::F64(millis) => {
                DateTime::from_timestamp_millis(*millis as i64).map(|v| v.naive_utc())
            }
            Value::String(text) => parse_datetime(text),
            Value::Date(date) => Some(date.and_time(NaiveTime::MIN)),
            Value::DateTime(datetime) => Some(*datetime),
            _ => None,
        };

        match (datetime, ty) {
            (Some(datetime), Type::Date) => Value::Date(datetime.date()),
            (Some(datetime), _) => Value::DateTime(datetime),
            (None, _) => self,
        }
    }

    /// Convert the value to `ty`, parsing strings where needed.
    pub fn cast(self, ty: Type) -> Result<Value> {
        let ret = match (ty, &self) {
            (_, Value::Null) => Some(Value::Null),
            (Type::Int, Value::I64(_)) => Some(self.clone()),
            (Type::Int, Value::F64(v)) if v.fract() == 0.0 => Some(Value::I64(*v as i64)),
            (Type::Int, Value::String(v)) => v.trim().parse().ok().map(Value::I64),
            (Type::Decimal, Value::I64(_) | Value::F64(_)) => Some(self.clone()),
            (Type::Decimal, Value::String(v)) => v.trim().parse().ok().map(Value::F64),
            (Type::Boolean, Value::Bool(_)) => Some(self.clone()),
            (Type::Boolean, Value::I64(v)) => Some(Value::Bool(*v != 0)),
            (Type::Boolean, Value::String(v)) => match v.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "y" | "yes" | "1" => Some(Value::Bool(true)),
                "false" | "f" | "n" | "no" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            (Type::String, Value::String(_)) => Some(self.clone()),
            (Type::String, _) => Some(Value::String(self.to_string())),
            (Type::Date | Type::DateTime | Type::Timestamp, _) => {
                match self.clone().materialize(Some(ty)) {
                    v @ (Value::Date(_) | Value::DateTime(_)) => Some(v),
                    _ => None,
                }
            }
            _ => None,
        };

        ret.ok_or_else(|| Error::type_conversion(self, ty))
    }
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();

    if let Ok(v) = DateTime::parse_from_rfc3339(text) {
        return Some(v.naive_utc());
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(v) = NaiveDateTime::parse_from_str(text, format) {
            return Some(v);
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(|v| v.and_time(NaiveTime::MIN))
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.compare(other)
    }
}

impl core::fmt::Display for Value {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(v) => write!(f, "{v}"),
            Value::I64(v) => write!(f, "{v}"),
            Value::F64(v) => write!(f, "{v}"),
            Value::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            Value::DateTime(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S")),
            Value::String(v) => f.write_str(v),
        }
    }
}

macro_rules! impl_from {
    ($( $src:ty => $variant:ident $( as $cast:ty )? ),* $(,)?) => {
        $(
            impl From<$src> for Value {
                fn from(value: $src) -> Self {
                    Self::$variant(value $( as $cast )?)
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i32 => I64 as i64,
    i64 => I64,
    u32 => I64 as i64,
    f64 => F64,
    String => String,
    NaiveDate => Date,
    NaiveDateTime => DateTime,
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}
