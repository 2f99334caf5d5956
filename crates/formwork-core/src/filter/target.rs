use crate::{BindValue, Record, Type, Value};

use indexmap::IndexMap;

/// The column a leaf filter tests and the bind name it emits.
#[derive(Debug, Clone)]
pub(crate) struct Target {
    column: String,
    name: String,
    ty: Option<Type>,
    forced: bool,
}

impl Target {
    pub(crate) fn new(column: impl Into<String>) -> Target {
        let column = column.into().to_lowercase();

        Target {
            name: column.clone(),
            column,
            ty: None,
            forced: false,
        }
    }

    pub(crate) fn column(&self) -> &str {
        &self.column
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn rename(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn ty(&self) -> Option<Type> {
        self.ty
    }

    pub(crate) fn force_type(&mut self, ty: Type) {
        self.ty = Some(ty);
        self.forced = true;
    }

    pub(crate) fn infer_from(&mut self, types: &IndexMap<String, Type>) {
        if self.forced {
            return;
        }

        if let Some(ty) = types.get(&self.column) {
            self.ty = Some(*ty);
        }
    }

    /// The record's value for the column, if present and not null.
    pub(crate) fn value<'a>(&self, record: &'a Record) -> Option<&'a Value> {
        record.get_value(&self.column).filter(|value| !value.is_null())
    }

    pub(crate) fn bind(&self, name: String, value: Value) -> BindValue {
        let mut bind = BindValue::new(name, value).with_column(&self.column);

        match self.ty {
            Some(ty) if self.forced => bind.force_type(ty),
            Some(ty) => bind.infer_type(ty),
            None => {}
        }

        bind
    }
}
