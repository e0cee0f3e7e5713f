use std::{fmt, str::FromStr};

/// The numeric element types a vector space can be built over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DType {
    #[default]
    Float32,
    Float64,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("dtype ({0}) is not a supported element type")]
pub struct UnknownDType(pub String);

impl DType {
    pub const ALL: [DType; 10] = [
        DType::Float32,
        DType::Float64,
        DType::Int8,
        DType::Int16,
        DType::Int32,
        DType::Int64,
        DType::UInt8,
        DType::UInt16,
        DType::UInt32,
        DType::UInt64,
    ];

    /// The signed integer type matching the platform word size (`"int"`).
    pub const fn default_int() -> Self {
        if std::mem::size_of::<isize>() == 4 {
            DType::Int32
        } else {
            DType::Int64
        }
    }

    /// The unsigned integer type matching the platform word size (`"uint"`).
    pub const fn default_uint() -> Self {
        if std::mem::size_of::<usize>() == 4 {
            DType::UInt32
        } else {
            DType::UInt64
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            DType::Float32 => "float32",
            DType::Float64 => "float64",
            DType::Int8 => "int8",
            DType::Int16 => "int16",
            DType::Int32 => "int32",
            DType::Int64 => "int64",
            DType::UInt8 => "uint8",
            DType::UInt16 => "uint16",
            DType::UInt32 => "uint32",
            DType::UInt64 => "uint64",
        }
    }

    /// Size in bytes of one element.
    pub const fn itemsize(self) -> usize {
        match self {
            DType::Int8 | DType::UInt8 => 1,
            DType::Int16 | DType::UInt16 => 2,
            DType::Float32 | DType::Int32 | DType::UInt32 => 4,
            DType::Float64 | DType::Int64 | DType::UInt64 => 8,
        }
    }

    pub const fn is_float(self) -> bool {
        matches!(self, DType::Float32 | DType::Float64)
    }

    pub const fn is_signed(self) -> bool {
        !matches!(
            self,
            DType::UInt8 | DType::UInt16 | DType::UInt32 | DType::UInt64
        )
    }

    /// The C type used for this element type in generated device kernels.
    pub const fn c_type(self) -> &'static str {
        match self {
            DType::Float32 => "float",
            DType::Float64 => "double",
            DType::Int8 => "signed char",
            DType::Int16 => "short",
            DType::Int32 => "int",
            DType::Int64 => "long long",
            DType::UInt8 => "unsigned char",
            DType::UInt16 => "unsigned short",
            DType::UInt32 => "unsigned int",
            DType::UInt64 => "unsigned long long",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DType {
    type Err = UnknownDType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let dtype = match s {
            "float32" | "f32" | "single" => DType::Float32,
            "float64" | "f64" | "double" | "float" => DType::Float64,
            "int8" | "i8" => DType::Int8,
            "int16" | "i16" => DType::Int16,
            "int32" | "i32" => DType::Int32,
            "int64" | "i64" => DType::Int64,
            "uint8" | "u8" => DType::UInt8,
            "uint16" | "u16" => DType::UInt16,
            "uint32" | "u32" => DType::UInt32,
            "uint64" | "u64" => DType::UInt64,
            "int" => DType::default_int(),
            "uint" => DType::default_uint(),
            other => return Err(UnknownDType(other.to_owned())),
        };
        Ok(dtype)
    }
}

#[cfg(test)]
mod tests {
    use super::{DType, UnknownDType};

    #[test]
    fn names_round_trip() {
        for dtype in DType::ALL {
            assert_eq!(dtype.name().parse::<DType>(), Ok(dtype));
        }
    }

    #[test]
    fn aliases() {
        assert_eq!("float".parse(), Ok(DType::Float64));
        assert_eq!("int".parse(), Ok(DType::default_int()));
        assert_eq!("f32".parse(), Ok(DType::Float32));
        assert_eq!(
            "complex64".parse::<DType>(),
            Err(UnknownDType("complex64".to_owned()))
        );
    }

    #[test]
    fn itemsize() {
        assert_eq!(DType::UInt8.itemsize(), 1);
        assert_eq!(DType::Int16.itemsize(), 2);
        assert_eq!(DType::Float32.itemsize(), 4);
        assert_eq!(DType::UInt64.itemsize(), 8);
        assert_eq!(DType::default(), DType::Float32);
        assert!(!DType::UInt32.is_signed());
        assert!(DType::Float64.is_float());
    }
}
