//! Semantic field types.

/// The semantic type of a mapped field.
///
/// Dialects translate this into a concrete SQL column type. Nullability is
/// tracked separately, so `Option<i64>` and `i64` share `Int64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Text,
    Bytes,
    Timestamp,
    /// Structured document stored as JSON text.
    Json,
}

impl FieldType {
    /// Whether the type is an integer of any width or signedness.
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            FieldType::Int8
                | FieldType::Int16
                | FieldType::Int32
                | FieldType::Int64
                | FieldType::UInt8
                | FieldType::UInt16
                | FieldType::UInt32
                | FieldType::UInt64
        )
    }

    /// Whether the type is an unsigned integer.
    pub const fn is_unsigned(self) -> bool {
        matches!(
            self,
            FieldType::UInt8 | FieldType::UInt16 | FieldType::UInt32 | FieldType::UInt64
        )
    }

    /// Whether the type needs 64 bits of integer storage.
    pub const fn is_wide_integer(self) -> bool {
        matches!(self, FieldType::Int64 | FieldType::UInt64)
    }
}

#[cfg(test)]
mod tests {
    use super::FieldType;

    #[test]
    fn integer_classification() {
        assert!(FieldType::UInt16.is_integer());
        assert!(FieldType::UInt16.is_unsigned());
        assert!(!FieldType::Int16.is_unsigned());
        assert!(FieldType::UInt64.is_wide_integer());
        assert!(!FieldType::Int32.is_wide_integer());
        assert!(!FieldType::Float64.is_integer());
    }
}
