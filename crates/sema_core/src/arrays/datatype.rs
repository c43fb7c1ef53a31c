use std::fmt;

use sema_error::{DbError, Result};
use serde::{Deserialize, Serialize};

/// Size in bytes of a string slot (pointer + length, padded).
pub const STRING_SLOT_SIZE: usize = 16;
/// Size in bytes of a collection slot (pointer + number of tuples, padded).
pub const COLLECTION_SLOT_SIZE: usize = 16;
/// Size in bytes of a timestamp slot (time of day nanos + date).
pub const TIMESTAMP_SLOT_SIZE: usize = 16;

/// Metadata associated with decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecimalTypeMeta {
    pub precision: u8,
    pub scale: i8,
}

impl DecimalTypeMeta {
    pub const fn new(precision: u8, scale: i8) -> Self {
        DecimalTypeMeta { precision, scale }
    }
}

/// Metadata associated with structs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructTypeMeta {
    pub fields: Vec<(String, DataType)>,
}

/// Metadata associated with lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListTypeMeta {
    pub datatype: Box<DataType>,
}

/// Metadata associated with maps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapTypeMeta {
    pub key: Box<DataType>,
    pub value: Box<DataType>,
}

/// Semantic types known to the analyzer.
///
/// Every type except structs maps to a fixed physical slot size, see
/// `slot_size`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Type of an untyped NULL literal.
    Null,
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Decimal(DecimalTypeMeta),
    /// Days since epoch.
    Date,
    Timestamp,
    Utf8,
    /// Fixed length string stored inline.
    Char(usize),
    Varchar(usize),
    /// A list of values all of the same type.
    List(ListTypeMeta),
    Map(MapTypeMeta),
    /// A struct of different types.
    Struct(StructTypeMeta),
}

impl DataType {
    pub fn list(item: DataType) -> Self {
        DataType::List(ListTypeMeta {
            datatype: Box::new(item),
        })
    }

    pub fn map(key: DataType, value: DataType) -> Self {
        DataType::Map(MapTypeMeta {
            key: Box::new(key),
            value: Box::new(value),
        })
    }

    pub fn decimal(precision: u8, scale: i8) -> Self {
        DataType::Decimal(DecimalTypeMeta::new(precision, scale))
    }

    /// Number of bytes a value of this type occupies in a tuple.
    ///
    /// Errors for types that can't be stored directly in a slot.
    pub fn slot_size(&self) -> Result<usize> {
        Ok(match self {
            DataType::Null | DataType::Boolean | DataType::Int8 => 1,
            DataType::Int16 => 2,
            DataType::Int32 | DataType::Float32 | DataType::Date => 4,
            DataType::Int64 | DataType::Float64 => 8,
            DataType::Decimal(meta) => match meta.precision {
                0..=9 => 4,
                10..=18 => 8,
                _ => 16,
            },
            DataType::Timestamp => TIMESTAMP_SLOT_SIZE,
            DataType::Utf8 | DataType::Varchar(_) => STRING_SLOT_SIZE,
            DataType::Char(len) => {
                if *len == 0 {
                    return Err(DbError::new("CHAR length must be greater than zero"));
                }
                *len
            }
            DataType::List(_) | DataType::Map(_) => COLLECTION_SLOT_SIZE,
            DataType::Struct(_) => {
                return Err(DbError::new(format!(
                    "Struct type cannot be materialized in a slot: {self}"
                )));
            }
        })
    }

    /// Whether this type's values have a fixed width in serialized form.
    pub const fn is_fixed_length(&self) -> bool {
        !matches!(
            self,
            DataType::Utf8
                | DataType::Varchar(_)
                | DataType::List(_)
                | DataType::Map(_)
                | DataType::Struct(_)
        )
    }

    /// Return if this datatype is null.
    pub const fn is_null(&self) -> bool {
        matches!(self, DataType::Null)
    }

    pub const fn is_boolean(&self) -> bool {
        matches!(self, DataType::Boolean)
    }

    pub const fn is_integer(&self) -> bool {
        matches!(
            self,
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64
        )
    }

    pub const fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Int8
                | DataType::Int16
                | DataType::Int32
                | DataType::Int64
                | DataType::Float32
                | DataType::Float64
                | DataType::Decimal(_)
        )
    }

    pub const fn is_collection(&self) -> bool {
        matches!(self, DataType::List(_) | DataType::Map(_))
    }

    /// Columns exposed when a value of this collection type is unnested.
    ///
    /// Lists expose `item` (or the struct fields of the item) followed by
    /// `pos`. Maps expose `key` and `value`.
    pub fn collection_columns(&self) -> Result<Vec<(String, DataType)>> {
        match self {
            DataType::List(meta) => {
                let mut cols = match meta.datatype.as_ref() {
                    DataType::Struct(fields) => fields.fields.clone(),
                    other => vec![("item".to_string(), other.clone())],
                };
                cols.push(("pos".to_string(), DataType::Int64));
                Ok(cols)
            }
            DataType::Map(meta) => Ok(vec![
                ("key".to_string(), meta.key.as_ref().clone()),
                ("value".to_string(), meta.value.as_ref().clone()),
            ]),
            other => Err(DbError::new(format!(
                "Expected a collection type, got {other}"
            ))),
        }
    }

    /// Returns a type both `self` and `other` can be implicitly cast to.
    pub fn common_numeric_type(&self, other: &DataType) -> Option<DataType> {
        if self == other {
            return Some(self.clone());
        }
        match (self, other) {
            (DataType::Null, t) | (t, DataType::Null) => Some(t.clone()),
            (a, b) if a.is_integer() && b.is_integer() => {
                // Integer widths are ordered by slot size.
                let a_size = a.slot_size().ok()?;
                let b_size = b.slot_size().ok()?;
                Some(if a_size >= b_size { a.clone() } else { b.clone() })
            }
            (a, b) if a.is_numeric() && b.is_numeric() => Some(DataType::Float64),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL_TYPE"),
            Self::Boolean => write!(f, "BOOLEAN"),
            Self::Int8 => write!(f, "TINYINT"),
            Self::Int16 => write!(f, "SMALLINT"),
            Self::Int32 => write!(f, "INT"),
            Self::Int64 => write!(f, "BIGINT"),
            Self::Float32 => write!(f, "FLOAT"),
            Self::Float64 => write!(f, "DOUBLE"),
            Self::Decimal(meta) => write!(f, "DECIMAL({},{})", meta.precision, meta.scale),
            Self::Date => write!(f, "DATE"),
            Self::Timestamp => write!(f, "TIMESTAMP"),
            Self::Utf8 => write!(f, "STRING"),
            Self::Char(len) => write!(f, "CHAR({len})"),
            Self::Varchar(len) => write!(f, "VARCHAR({len})"),
            Self::List(meta) => write!(f, "ARRAY<{}>", meta.datatype),
            Self::Map(meta) => write!(f, "MAP<{},{}>", meta.key, meta.value),
            Self::Struct(meta) => {
                write!(
                    f,
                    "STRUCT<{}>",
                    meta.fields
                        .iter()
                        .map(|(name, typ)| format!("{name}:{typ}"))
                        .collect::<Vec<_>>()
                        .join(",")
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_slot_size_by_precision() {
        assert_eq!(4, DataType::decimal(9, 2).slot_size().unwrap());
        assert_eq!(8, DataType::decimal(18, 2).slot_size().unwrap());
        assert_eq!(16, DataType::decimal(38, 2).slot_size().unwrap());
    }

    #[test]
    fn struct_not_slottable() {
        let s = DataType::Struct(StructTypeMeta {
            fields: vec![("a".to_string(), DataType::Int32)],
        });
        assert!(s.slot_size().is_err());
    }

    #[test]
    fn list_of_struct_columns() {
        let item = DataType::Struct(StructTypeMeta {
            fields: vec![
                ("a".to_string(), DataType::Int32),
                ("b".to_string(), DataType::Utf8),
            ],
        });
        let cols = DataType::list(item).collection_columns().unwrap();
        let names: Vec<_> = cols.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(vec!["a", "b", "pos"], names);
    }

    #[test]
    fn map_columns() {
        let cols = DataType::map(DataType::Utf8, DataType::Int64)
            .collection_columns()
            .unwrap();
        assert_eq!(("key".to_string(), DataType::Utf8), cols[0]);
        assert_eq!(("value".to_string(), DataType::Int64), cols[1]);
    }

    #[test]
    fn common_numeric() {
        assert_eq!(
            Some(DataType::Int64),
            DataType::Int32.common_numeric_type(&DataType::Int64)
        );
        assert_eq!(
            Some(DataType::Float64),
            DataType::Int32.common_numeric_type(&DataType::Float32)
        );
        assert_eq!(None, DataType::Utf8.common_numeric_type(&DataType::Int8));
    }
}
