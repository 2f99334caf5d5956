//! Predicates over records.
//!
//! A [`Filter`] is a single predicate that can both render itself as a
//! backend clause with bind values and evaluate itself against a
//! [`Record`] in memory. Filters are combined with AND/OR in a
//! [`FilterStructure`].
//!
//! Every leaf renders an unset constraint as `1 = 2`, so a statement built
//! from an incomplete filter never runs unconstrained.

mod any_of;
pub use any_of::AnyOf;

mod between;
pub use between::Between;

mod contains;
pub use contains::Contains;

mod custom;
pub use custom::{CloneFilter, Custom, CustomFilter};

mod date_interval;
pub use date_interval::{DateInterval, DateUnit};

mod equals;
pub use equals::Equals;

mod is_null;
pub use is_null::IsNull;

mod like;
pub use like::Like;

mod structure;
pub use structure::{FilterEntry, FilterNode, FilterStructure, Junction};

mod sub_query;
pub use sub_query::SubQuery;

mod target;
use target::Target;

use crate::{BindValue, Record, Type, Value};

use indexmap::IndexMap;

/// Clause emitted for a filter whose constraint is not set.
pub const NEVER: &str = "1 = 2";

/// Member count above which set filters inline literals instead of binds.
pub const MAX_BOUND_MEMBERS: usize = 5;

#[derive(Debug, Clone)]
pub enum Filter {
    Equals(Equals),
    Like(Like),
    Between(Between),
    Contains(Contains),
    AnyOf(AnyOf),
    IsNull(IsNull),
    SubQuery(SubQuery),
    DateInterval(DateInterval),
    Custom(Custom),
}

/// Discriminates filter variants without borrowing their contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    Equals,
    Like,
    Between,
    Contains,
    AnyOf,
    NoneOf,
    IsNull,
    SubQuery,
    DateInterval,
    Custom,
}

impl Filter {
    pub fn equals(column: impl Into<String>) -> Filter {
        Filter::Equals(Equals::new(column))
    }

    pub fn like(column: impl Into<String>) -> Filter {
        Filter::Like(Like::new(column))
    }

    pub fn between(column: impl Into<String>) -> Filter {
        Filter::Between(Between::new(column))
    }

    pub fn contains<I>(columns: I) -> Filter
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Filter::Contains(Contains::new(columns))
    }

    pub fn any_of(column: impl Into<String>) -> Filter {
        Filter::AnyOf(AnyOf::new(column))
    }

    pub fn none_of(column: impl Into<String>) -> Filter {
        Filter::AnyOf(AnyOf::negated(column))
    }

    pub fn is_null(column: impl Into<String>) -> Filter {
        Filter::IsNull(IsNull::new(column))
    }

    pub fn is_not_null(column: impl Into<String>) -> Filter {
        Filter::IsNull(IsNull::negated(column))
    }

    pub fn sub_query<I>(columns: I) -> Filter
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Filter::SubQuery(SubQuery::new(columns))
    }

    pub fn date_interval(column: impl Into<String>, unit: DateUnit) -> Filter {
        Filter::DateInterval(DateInterval::new(column, unit))
    }

    pub fn custom(filter: impl CustomFilter + 'static) -> Filter {
        Filter::Custom(Custom::new(filter))
    }

    pub fn kind(&self) -> FilterKind {
        match self {
            Filter::Equals(_) => FilterKind::Equals,
            Filter::Like(_) => FilterKind::Like,
            Filter::Between(_) => FilterKind::Between,
            Filter::Contains(_) => FilterKind::Contains,
            Filter::AnyOf(f) if f.is_negated() => FilterKind::NoneOf,
            Filter::AnyOf(_) => FilterKind::AnyOf,
            Filter::IsNull(_) => FilterKind::IsNull,
            Filter::SubQuery(_) => FilterKind::SubQuery,
            Filter::DateInterval(_) => FilterKind::DateInterval,
            Filter::Custom(_) => FilterKind::Custom,
        }
    }

    /// The filter's default entry name: its bind name.
    pub fn name(&self) -> &str {
        match self {
            Filter::Equals(f) => f.target.name(),
            Filter::Like(f) => f.target.name(),
            Filter::Between(f) => f.target.name(),
            Filter::Contains(f) => f.name(),
            Filter::AnyOf(f) => f.target.name(),
            Filter::IsNull(f) => f.target.name(),
            Filter::SubQuery(f) => f.name(),
            Filter::DateInterval(f) => f.target.name(),
            Filter::Custom(f) => f.name(),
        }
    }

    /// Rename the bind placeholders this filter emits.
    pub fn named(mut self, name: impl Into<String>) -> Filter {
        let name = name.into();
        match &mut self {
            Filter::Equals(f) => f.target.rename(name),
            Filter::Like(f) => f.target.rename(name),
            Filter::Between(f) => f.target.rename(name),
            Filter::Contains(f) => f.rename(name),
            Filter::AnyOf(f) => f.target.rename(name),
            Filter::IsNull(f) => f.target.rename(name),
            Filter::SubQuery(f) => f.rename(name),
            Filter::DateInterval(f) => f.target.rename(name),
            Filter::Custom(_) => {}
        }
        self
    }

    /// Set the constraint from a single value.
    ///
    /// Range and set filters take the value as a one-point range or a
    /// one-member set; use the variant's own setters for more.
    pub fn set_constraint(&mut self, value: impl Into<Value>) {
        let value = value.into();
        match self {
            Filter::Equals(f) => f.set_constraint(value),
            Filter::Like(f) => f.set_constraint(value),
            Filter::Between(f) => f.set_range(value.clone(), value),
            Filter::Contains(f) => f.set_constraint(value),
            Filter::AnyOf(f) => f.set_values(if value.is_null() { vec![] } else { vec![value] }),
            Filter::IsNull(_) | Filter::SubQuery(_) => {}
            Filter::DateInterval(f) => f.set_constraint(value),
            Filter::Custom(f) => f.get_mut().set_constraint(value),
        }
    }

    /// Builder form of [`Filter::set_constraint`].
    pub fn with_constraint(mut self, value: impl Into<Value>) -> Filter {
        self.set_constraint(value);
        self
    }

    /// Force the type of every bind this filter emits.
    pub fn set_data_type(&mut self, ty: Type) {
        match self {
            Filter::Equals(f) => f.target.force_type(ty),
            Filter::Like(f) => f.target.force_type(ty),
            Filter::Between(f) => f.target.force_type(ty),
            Filter::Contains(_) => {}
            Filter::AnyOf(f) => f.target.force_type(ty),
            Filter::IsNull(_) => {}
            Filter::SubQuery(_) => {}
            Filter::DateInterval(f) => f.target.force_type(ty),
            Filter::Custom(f) => f.get_mut().set_data_type(ty),
        }
    }

    /// Adopt described column types for binds whose type was not forced.
    pub fn infer_types(&mut self, types: &IndexMap<String, Type>) {
        match self {
            Filter::Equals(f) => f.target.infer_from(types),
            Filter::Like(f) => f.target.infer_from(types),
            Filter::Between(f) => f.target.infer_from(types),
            Filter::Contains(_) => {}
            Filter::AnyOf(f) => f.target.infer_from(types),
            Filter::IsNull(_) => {}
            Filter::SubQuery(f) => f.infer_types(types),
            Filter::DateInterval(f) => f.target.infer_from(types),
            Filter::Custom(_) => {}
        }
    }

    /// Evaluate against a record. Missing inputs evaluate to `false`.
    pub fn evaluate(&self, record: &Record) -> bool {
        match self {
            Filter::Equals(f) => f.evaluate(record),
            Filter::Like(f) => f.evaluate(record),
            Filter::Between(f) => f.evaluate(record),
            Filter::Contains(f) => f.evaluate(record),
            Filter::AnyOf(f) => f.evaluate(record),
            Filter::IsNull(f) => f.evaluate(record),
            Filter::SubQuery(f) => f.evaluate(record),
            Filter::DateInterval(f) => f.evaluate(record),
            Filter::Custom(f) => f.get().evaluate(record),
        }
    }

    pub fn as_sql(&self) -> String {
        match self {
            Filter::Equals(f) => f.as_sql(),
            Filter::Like(f) => f.as_sql(),
            Filter::Between(f) => f.as_sql(),
            Filter::Contains(f) => f.as_sql(),
            Filter::AnyOf(f) => f.as_sql(),
            Filter::IsNull(f) => f.as_sql(),
            Filter::SubQuery(f) => f.as_sql(),
            Filter::DateInterval(f) => f.as_sql(),
            Filter::Custom(f) => f.get().as_sql(),
        }
    }

    pub fn bind_values(&self) -> Vec<BindValue> {
        match self {
            Filter::Equals(f) => f.bind_values(),
            Filter::Like(f) => f.bind_values(),
            Filter::Between(f) => f.bind_values(),
            Filter::Contains(f) => f.bind_values(),
            Filter::AnyOf(f) => f.bind_values(),
            Filter::IsNull(_) => vec![],
            Filter::SubQuery(f) => f.bind_values(),
            Filter::DateInterval(f) => f.bind_values(),
            Filter::Custom(f) => f.get().bind_values(),
        }
    }
}

macro_rules! impl_from_leaf {
    ( $( $leaf:ident ),* ) => {
        $(
            impl From<$leaf> for Filter {
                fn from(value: $leaf) -> Filter {
                    Filter::$leaf(value)
                }
            }
        )*
    };
}

impl_from_leaf!(Equals, Like, Between, Contains, AnyOf, IsNull, SubQuery, DateInterval, Custom);
