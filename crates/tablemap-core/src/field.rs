//! Conversions between Rust field types and [`Value`].
//!
//! Every field of a mapped record must implement [`SqlField`]. The derive
//! macro reads `FIELD_TYPE` and `NULLABLE` to describe the column and calls
//! `to_value`/`from_value` to bind and scan it.

use crate::error::ValueError;
use crate::types::FieldType;
use crate::value::Value;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A Rust type that can be stored in a single column.
pub trait SqlField: Sized {
    /// Semantic type used for DDL generation.
    const FIELD_TYPE: FieldType;

    /// Whether NULL is a legal value for this type.
    const NULLABLE: bool = false;

    /// Convert the field into a bindable value.
    fn to_value(&self) -> Result<Value, ValueError>;

    /// Convert a scanned value into the field type.
    fn from_value(value: Value) -> Result<Self, ValueError>;
}

fn mismatch(expected: &'static str, value: &Value) -> ValueError {
    if value.is_null() {
        ValueError::UnexpectedNull(expected)
    } else {
        ValueError::TypeMismatch {
            expected,
            actual: value.type_name(),
        }
    }
}

macro_rules! impl_sql_field_int {
    ($($ty:ty => $field_type:ident, $variant:ident as $repr:ty;)*) => {
        $(
            impl SqlField for $ty {
                const FIELD_TYPE: FieldType = FieldType::$field_type;

                fn to_value(&self) -> Result<Value, ValueError> {
                    Ok(Value::$variant(*self as $repr))
                }

                fn from_value(value: Value) -> Result<Self, ValueError> {
                    let wide = value
                        .as_i64()
                        .ok_or_else(|| mismatch(stringify!($ty), &value))?;
                    <$ty>::try_from(wide).map_err(|_| ValueError::OutOfRange {
                        value: wide.to_string(),
                        target: stringify!($ty),
                    })
                }
            }
        )*
    };
}

impl_sql_field_int! {
    i8 => Int8, TinyInt as i8;
    i16 => Int16, SmallInt as i16;
    i32 => Int32, Int as i32;
    i64 => Int64, BigInt as i64;
    u8 => UInt8, SmallInt as i16;
    u16 => UInt16, Int as i32;
    u32 => UInt32, BigInt as i64;
}

// u64 is stored bit-for-bit in a signed 64-bit column.
impl SqlField for u64 {
    const FIELD_TYPE: FieldType = FieldType::UInt64;

    fn to_value(&self) -> Result<Value, ValueError> {
        Ok(Value::BigInt(*self as i64))
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        value
            .as_i64()
            .map(|v| v as u64)
            .ok_or_else(|| mismatch("u64", &value))
    }
}

impl SqlField for bool {
    const FIELD_TYPE: FieldType = FieldType::Bool;

    fn to_value(&self) -> Result<Value, ValueError> {
        Ok(Value::Bool(*self))
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Bool(b) => Ok(b),
            Value::Text(ref s) => match s.as_str() {
                "true" | "t" | "1" => Ok(true),
                "false" | "f" | "0" => Ok(false),
                _ => Err(mismatch("bool", &value)),
            },
            other => other
                .as_i64()
                .map(|v| v != 0)
                .ok_or_else(|| mismatch("bool", &other)),
        }
    }
}

impl SqlField for f32 {
    const FIELD_TYPE: FieldType = FieldType::Float32;

    fn to_value(&self) -> Result<Value, ValueError> {
        Ok(Value::Float(*self))
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        value
            .as_f64()
            .map(|v| v as f32)
            .ok_or_else(|| mismatch("f32", &value))
    }
}

impl SqlField for f64 {
    const FIELD_TYPE: FieldType = FieldType::Float64;

    fn to_value(&self) -> Result<Value, ValueError> {
        Ok(Value::Double(*self))
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        value.as_f64().ok_or_else(|| mismatch("f64", &value))
    }
}

impl SqlField for String {
    const FIELD_TYPE: FieldType = FieldType::Text;

    fn to_value(&self) -> Result<Value, ValueError> {
        Ok(Value::Text(self.clone()))
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Text(s) => Ok(s),
            Value::Bytes(b) => String::from_utf8(b).map_err(|_| ValueError::TypeMismatch {
                expected: "String",
                actual: "Bytes",
            }),
            Value::Json(j) => Ok(j.to_string()),
            other => Err(mismatch("String", &other)),
        }
    }
}

impl SqlField for Vec<u8> {
    const FIELD_TYPE: FieldType = FieldType::Bytes;

    fn to_value(&self) -> Result<Value, ValueError> {
        Ok(Value::Bytes(self.clone()))
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Bytes(b) => Ok(b),
            Value::Text(s) => Ok(s.into_bytes()),
            other => Err(mismatch("Vec<u8>", &other)),
        }
    }
}

impl SqlField for SystemTime {
    const FIELD_TYPE: FieldType = FieldType::Timestamp;

    fn to_value(&self) -> Result<Value, ValueError> {
        let micros = match self.duration_since(UNIX_EPOCH) {
            Ok(after) => i64::try_from(after.as_micros()),
            Err(before) => i64::try_from(before.duration().as_micros()).map(|v| -v),
        }
        .map_err(|_| ValueError::OutOfRange {
            value: format!("{self:?}"),
            target: "Timestamp",
        })?;
        Ok(Value::Timestamp(micros))
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        let micros = match value {
            Value::Timestamp(us) | Value::BigInt(us) => us,
            other => return Err(mismatch("SystemTime", &other)),
        };
        let offset = Duration::from_micros(micros.unsigned_abs());
        let time = if micros >= 0 {
            UNIX_EPOCH.checked_add(offset)
        } else {
            UNIX_EPOCH.checked_sub(offset)
        };
        time.ok_or_else(|| ValueError::OutOfRange {
            value: micros.to_string(),
            target: "SystemTime",
        })
    }
}

impl SqlField for serde_json::Value {
    const FIELD_TYPE: FieldType = FieldType::Json;

    fn to_value(&self) -> Result<Value, ValueError> {
        Ok(Value::Json(self.clone()))
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Json(j) => Ok(j),
            Value::Text(s) => Ok(serde_json::from_str(&s)?),
            Value::Bytes(b) => Ok(serde_json::from_slice(&b)?),
            other => Err(mismatch("serde_json::Value", &other)),
        }
    }
}

impl<T: SqlField> SqlField for Option<T> {
    const FIELD_TYPE: FieldType = T::FIELD_TYPE;
    const NULLABLE: bool = true;

    fn to_value(&self) -> Result<Value, ValueError> {
        match self {
            Some(v) => v.to_value(),
            None => Ok(Value::Null),
        }
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

/// Stores any serde type as a JSON document column.
///
/// ```ignore
/// #[derive(Record, Default)]
/// struct Invoice {
///     id: i64,
///     lines: Json<Vec<Line>>,
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    /// Unwrap the inner value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::ops::Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> std::ops::DerefMut for Json<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

impl<T> SqlField for Json<T>
where
    T: Serialize + DeserializeOwned,
{
    const FIELD_TYPE: FieldType = FieldType::Json;

    fn to_value(&self) -> Result<Value, ValueError> {
        Ok(Value::Json(serde_json::to_value(&self.0)?))
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        let decoded = match value {
            Value::Json(j) => serde_json::from_value(j)?,
            Value::Text(s) => serde_json::from_str(&s)?,
            Value::Bytes(b) => serde_json::from_slice(&b)?,
            other => return Err(mismatch("Json", &other)),
        };
        Ok(Json(decoded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn integers_range_check() {
        assert_eq!(i8::from_value(Value::BigInt(12)), Ok(12));
        assert!(matches!(
            i8::from_value(Value::BigInt(300)),
            Err(ValueError::OutOfRange { target: "i8", .. })
        ));
        assert!(matches!(
            i32::from_value(Value::Text("abc".into())),
            Err(ValueError::TypeMismatch { expected: "i32", .. })
        ));
        assert_eq!(
            i64::from_value(Value::Null),
            Err(ValueError::UnexpectedNull("i64"))
        );
    }

    #[test]
    fn u64_survives_values_above_i64_max() {
        let big = u64::MAX - 5;
        let stored = big.to_value().unwrap();
        assert_eq!(u64::from_value(stored), Ok(big));
    }

    #[test]
    fn bool_reads_integer_storage() {
        assert_eq!(bool::from_value(Value::BigInt(1)), Ok(true));
        assert_eq!(bool::from_value(Value::BigInt(0)), Ok(false));
        assert_eq!(bool::from_value(Value::Text("t".into())), Ok(true));
    }

    #[test]
    fn option_is_nullable() {
        assert!(<Option<String> as SqlField>::NULLABLE);
        assert_eq!(Option::<String>::from_value(Value::Null), Ok(None));
        assert_eq!(Some(3_i32).to_value(), Ok(Value::Int(3)));
        assert_eq!(<Option<i64> as SqlField>::FIELD_TYPE, FieldType::Int64);
    }

    #[test]
    fn system_time_round_trips_before_epoch() {
        let t = UNIX_EPOCH - Duration::from_secs(90);
        let v = t.to_value().unwrap();
        assert_eq!(v, Value::Timestamp(-90_000_000));
        assert_eq!(SystemTime::from_value(v), Ok(t));
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Tags {
        names: Vec<String>,
    }

    #[test]
    fn json_reads_text_storage() {
        let stored = Value::Text(r#"{"names":["a","b"]}"#.to_string());
        let tags = Json::<Tags>::from_value(stored).unwrap();
        assert_eq!(tags.names, vec!["a", "b"]);

        let bad = Json::<Tags>::from_value(Value::Text("{".into()));
        assert!(matches!(bad, Err(ValueError::Json(_))));
    }
}
