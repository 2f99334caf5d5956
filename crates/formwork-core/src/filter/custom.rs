use crate::{BindValue, Record, Type, Value};

use std::fmt;

/// A user-defined filter.
///
/// `evaluate` and `as_sql` have no defaults, so a custom filter that cannot
/// do both does not compile. Implementors only need to derive `Clone` to
/// get [`CloneFilter`].
pub trait CustomFilter: CloneFilter + fmt::Debug + Send + Sync {
    fn evaluate(&self, record: &Record) -> bool;

    fn as_sql(&self) -> String;

    fn bind_values(&self) -> Vec<BindValue> {
        vec![]
    }

    fn set_constraint(&mut self, value: Value) {
        let _ = value;
    }

    fn set_data_type(&mut self, ty: Type) {
        let _ = ty;
    }

    fn name(&self) -> &str {
        "custom"
    }
}

#[doc(hidden)]
pub trait CloneFilter {
    fn clone_filter(&self) -> Box<dyn CustomFilter>;
}

impl<T: CustomFilter + Clone + 'static> CloneFilter for T {
    fn clone_filter(&self) -> Box<dyn CustomFilter> {
        Box::new(self.clone())
    }
}

#[derive(Debug)]
pub struct Custom(Box<dyn CustomFilter>);

impl Custom {
    pub fn new(filter: impl CustomFilter + 'static) -> Custom {
        Custom(Box::new(filter))
    }

    pub fn get(&self) -> &dyn CustomFilter {
        &*self.0
    }

    pub fn get_mut(&mut self) -> &mut dyn CustomFilter {
        &mut *self.0
    }

    pub(crate) fn name(&self) -> &str {
        self.0.name()
    }
}

impl Clone for Custom {
    fn clone(&self) -> Custom {
        Custom(self.0.clone_filter())
    }
}
