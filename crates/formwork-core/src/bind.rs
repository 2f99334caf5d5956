use crate::{Type, Value};

use serde::{Deserialize, Serialize};

/// A named placeholder in a statement together with the value bound to it.
///
/// Output binds (`output == true`) carry no input value; the gateway fills
/// them from a `returning` clause or a procedure's out parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindValue {
    /// Placeholder name, without the leading `:`
    pub name: String,

    /// Backend column the value belongs to, if any
    pub column: Option<String>,

    pub value: Value,

    /// Semantic type sent with the value
    pub ty: Option<Type>,

    /// True when the value flows back from the backend
    pub output: bool,

    /// True once the owner fixed `ty`; inference no longer applies
    forced: bool,
}

/// Procedure parameters use the same shape as bind values.
pub type Parameter = BindValue;

impl BindValue {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> BindValue {
        BindValue {
            name: name.into(),
            column: None,
            value: value.into(),
            ty: None,
            output: false,
            forced: false,
        }
    }

    /// An output bind receiving the value of `column`.
    pub fn output(name: impl Into<String>, column: impl Into<String>) -> BindValue {
        BindValue {
            output: true,
            column: Some(column.into()),
            ..BindValue::new(name, Value::Null)
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> BindValue {
        self.column = Some(column.into());
        self
    }

    /// Fix the bind's type. Later inference leaves it alone.
    pub fn with_forced_type(mut self, ty: Type) -> BindValue {
        self.force_type(ty);
        self
    }

    pub fn force_type(&mut self, ty: Type) {
        self.ty = Some(ty);
        self.forced = true;
    }

    /// Adopt a described type unless the type was forced.
    pub fn infer_type(&mut self, ty: Type) {
        if !self.forced {
            self.ty = Some(ty);
        }
    }

    pub fn is_forced(&self) -> bool {
        self.forced
    }
}
