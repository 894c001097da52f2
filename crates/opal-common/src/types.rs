//! Type identifiers for OpalDB data types.

use serde::{Deserialize, Serialize};

/// Identifier for all supported SQL data types in OpalDB.
///
/// Type IDs are stored in tuple headers and catalog metadata
/// to identify the type of each column value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TypeId {
    Invalid = 0,
    Boolean = 1,

    // Integer types
    TinyInt = 2,
    SmallInt = 3,
    Integer = 4,
    BigInt = 5,

    // Fixed-precision type
    Decimal = 6,

    // Date/Time types
    Timestamp = 7,
    Date = 8,

    // Variable-length types
    Varchar = 9,
    Varbinary = 10,
    Array = 11,
}

/// Null sentinel for BOOLEAN payloads.
pub const BOOLEAN_NULL: i8 = i8::MIN;
/// Null sentinel for TINYINT payloads.
pub const TINYINT_NULL: i8 = i8::MIN;
/// Null sentinel for SMALLINT payloads.
pub const SMALLINT_NULL: i16 = i16::MIN;
/// Null sentinel for INTEGER payloads.
pub const INTEGER_NULL: i32 = i32::MIN;
/// Null sentinel for BIGINT payloads.
pub const BIGINT_NULL: i64 = i64::MIN;
/// Null sentinel for DECIMAL payloads.
pub const DECIMAL_NULL: f64 = f64::MIN;
/// Null sentinel for TIMESTAMP payloads.
pub const TIMESTAMP_NULL: u64 = u64::MAX;
/// Null sentinel for DATE payloads.
pub const DATE_NULL: u32 = u32::MAX;

/// Sentinel length for variable-length values.
///
/// Marks both SQL NULL (no data present) and the +infinity bound used
/// for index key comparisons (data marker present).
pub const VARLEN_MAX_LEN: u32 = u32::MAX;

impl TypeId {
    /// Returns the fixed byte size for this type, or None for
    /// variable-length types.
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            TypeId::Boolean | TypeId::TinyInt => Some(1),
            TypeId::SmallInt => Some(2),
            TypeId::Integer | TypeId::Date => Some(4),
            TypeId::BigInt | TypeId::Decimal | TypeId::Timestamp => Some(8),
            TypeId::Varchar | TypeId::Varbinary | TypeId::Array | TypeId::Invalid => None,
        }
    }

    /// Returns the number of bytes this type occupies in a fixed tuple
    /// slot: the payload width for fixed types, a pointer word for
    /// variable-length types.
    pub fn slot_size(&self) -> usize {
        self.fixed_size()
            .unwrap_or(std::mem::size_of::<*const u8>())
    }

    /// Returns true if this type has a fixed byte size.
    pub fn is_fixed_size(&self) -> bool {
        self.fixed_size().is_some()
    }

    /// Returns true if this type is an integer type.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            TypeId::TinyInt | TypeId::SmallInt | TypeId::Integer | TypeId::BigInt
        )
    }

    /// Returns true if this type is a numeric type.
    pub fn is_numeric(&self) -> bool {
        self.is_integer() || matches!(self, TypeId::Decimal)
    }

    /// Returns true if this type stores variable-length data.
    pub fn is_varlen(&self) -> bool {
        matches!(self, TypeId::Varchar | TypeId::Varbinary | TypeId::Array)
    }
}

impl std::fmt::Display for TypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TypeId::Invalid => "INVALID",
            TypeId::Boolean => "BOOLEAN",
            TypeId::TinyInt => "TINYINT",
            TypeId::SmallInt => "SMALLINT",
            TypeId::Integer => "INTEGER",
            TypeId::BigInt => "BIGINT",
            TypeId::Decimal => "DECIMAL",
            TypeId::Timestamp => "TIMESTAMP",
            TypeId::Date => "DATE",
            TypeId::Varchar => "VARCHAR",
            TypeId::Varbinary => "VARBINARY",
            TypeId::Array => "ARRAY",
        };
        write!(f, "{}", name)
    }
}
