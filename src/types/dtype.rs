//! Element type codes for array headers

/// Single-character numpy type code (`descr` kind character)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeCode {
    Float = b'f',
    Int = b'i',
    UInt = b'u',
    Bool = b'b',
    Complex = b'c',
}

impl TypeCode {
    /// The character written into the `descr` field
    pub fn as_char(self) -> char {
        self as u8 as char
    }

    /// Try to convert from a `descr` kind character
    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            b'f' => Some(TypeCode::Float),
            b'i' => Some(TypeCode::Int),
            b'u' => Some(TypeCode::UInt),
            b'b' => Some(TypeCode::Bool),
            b'c' => Some(TypeCode::Complex),
            _ => None,
        }
    }
}

/// Semantic value kind resolved from a (type code, byte width) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Float32,
    Float64,
    Float128,
    Int8,
    Int16,
    Int32,
    Int64,
    Int128,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    UInt128,
    Bool,
    Complex64,
    Complex128,
    Complex256,
    /// Pair outside the supported table
    Unknown,
}

impl ValueKind {
    /// Resolve a kind from a type character and word size.
    ///
    /// Unsupported combinations yield [`ValueKind::Unknown`]; callers that need a
    /// concrete type treat that as a soft failure.
    pub fn from_descr(code: u8, width: usize) -> Self {
        match (code, width) {
            (b'f', 4) => ValueKind::Float32,
            (b'f', 8) => ValueKind::Float64,
            (b'f', 16) => ValueKind::Float128,
            (b'i', 1) => ValueKind::Int8,
            (b'i', 2) => ValueKind::Int16,
            (b'i', 4) => ValueKind::Int32,
            (b'i', 8) => ValueKind::Int64,
            (b'i', 16) => ValueKind::Int128,
            (b'u', 1) => ValueKind::UInt8,
            (b'u', 2) => ValueKind::UInt16,
            (b'u', 4) => ValueKind::UInt32,
            (b'u', 8) => ValueKind::UInt64,
            (b'u', 16) => ValueKind::UInt128,
            (b'b', _) => ValueKind::Bool,
            (b'c', 8) => ValueKind::Complex64,
            (b'c', 16) => ValueKind::Complex128,
            (b'c', 32) => ValueKind::Complex256,
            _ => ValueKind::Unknown,
        }
    }

    /// Type code for this kind, `None` for [`ValueKind::Unknown`]
    pub fn type_code(self) -> Option<TypeCode> {
        match self {
            ValueKind::Float32 | ValueKind::Float64 | ValueKind::Float128 => Some(TypeCode::Float),
            ValueKind::Int8
            | ValueKind::Int16
            | ValueKind::Int32
            | ValueKind::Int64
            | ValueKind::Int128 => Some(TypeCode::Int),
            ValueKind::UInt8
            | ValueKind::UInt16
            | ValueKind::UInt32
            | ValueKind::UInt64
            | ValueKind::UInt128 => Some(TypeCode::UInt),
            ValueKind::Bool => Some(TypeCode::Bool),
            ValueKind::Complex64 | ValueKind::Complex128 | ValueKind::Complex256 => {
                Some(TypeCode::Complex)
            }
            ValueKind::Unknown => None,
        }
    }

    /// Type character for this kind; `?` when unknown
    pub fn type_char(self) -> u8 {
        self.type_code().map(|code| code as u8).unwrap_or(b'?')
    }

    /// Size in bytes of a single element, `None` for [`ValueKind::Unknown`]
    pub fn element_size(self) -> Option<usize> {
        let size = match self {
            ValueKind::Int8 | ValueKind::UInt8 | ValueKind::Bool => 1,
            ValueKind::Int16 | ValueKind::UInt16 => 2,
            ValueKind::Float32 | ValueKind::Int32 | ValueKind::UInt32 => 4,
            ValueKind::Float64 | ValueKind::Int64 | ValueKind::UInt64 | ValueKind::Complex64 => 8,
            ValueKind::Float128
            | ValueKind::Int128
            | ValueKind::UInt128
            | ValueKind::Complex128 => 16,
            ValueKind::Complex256 => 32,
            ValueKind::Unknown => return None,
        };
        Some(size)
    }

    pub fn is_integer(self) -> bool {
        matches!(self.type_code(), Some(TypeCode::Int | TypeCode::UInt))
    }

    pub fn is_float(self) -> bool {
        self.type_code() == Some(TypeCode::Float)
    }
}
