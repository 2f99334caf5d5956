use serde::{Deserialize, Serialize};

/// The semantic type of a column or bind value.
///
/// Backends report their own type names; [`Type::from_backend`] folds those
/// into the small set the engine reasons about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Type {
    /// Whole numbers
    Int,

    /// Fixed or floating point numbers
    Decimal,

    /// Character data
    String,

    Boolean,

    /// Calendar date without a time part
    Date,

    /// Date and time of day
    DateTime,

    /// Date and time of day with sub-second precision
    Timestamp,
}

impl Type {
    /// Map a backend-reported type name onto a semantic type.
    ///
    /// Matching is case-insensitive. Unknown names are treated as strings.
    pub fn from_backend(name: &str) -> Type {
        let name = name.trim().to_ascii_lowercase();
        let (base, args) = match name.find('(') {
            Some(pos) => (name[..pos].trim(), Some(&name[pos + 1..])),
            None => (name.as_str(), None),
        };

        // `number(10)` and `numeric(10, 0)` hold whole numbers only.
        let scale_is_zero = args.map(|args| {
            let args = args.trim_end_matches(')');
            match args.split_once(',') {
                Some((_, scale)) => scale.trim() == "0",
                None => true,
            }
        });

        match base {
            "int" | "integer" | "int2" | "int4" | "int8" | "smallint" | "bigint" | "tinyint"
            | "mediumint" | "serial" | "bigserial" | "long" | "pls_integer" => Type::Int,
            "number" | "numeric" | "decimal" => {
                if scale_is_zero == Some(true) {
                    Type::Int
                } else {
                    Type::Decimal
                }
            }
            "float" | "float4" | "float8" | "double" | "double precision" | "real" | "money"
            | "binary_float" | "binary_double" => Type::Decimal,
            "bool" | "boolean" | "bit" => Type::Boolean,
            "date" => Type::Date,
            "datetime" | "datetime2" | "smalldatetime" => Type::DateTime,
            _ if base.starts_with("timestamp") => Type::Timestamp,
            _ => Type::String,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Type::Int | Type::Decimal)
    }

    /// Returns `true` for date, datetime and timestamp columns.
    pub fn is_temporal(self) -> bool {
        matches!(self, Type::Date | Type::DateTime | Type::Timestamp)
    }
}

impl core::fmt::Display for Type {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str(match self {
            Type::Int => "int",
            Type::Decimal => "decimal",
            Type::String => "string",
            Type::Boolean => "boolean",
            Type::Date => "date",
            Type::DateTime => "datetime",
            Type::Timestamp => "timestamp",
        })
    }
}
