use crate::{DataSource, MemoryTable};

use formwork_core::{
    filter::DateUnit, Error, Filter, FilterKind, FilterStructure, Record, RecordState, Result, Type, Value,
};

use indexmap::{IndexMap, IndexSet};

/// Search criteria entered as values on a template record.
///
/// Each non-null value becomes a filter on its column: the explicit one
/// given to [`set_filter`](Self::set_filter), or one inferred from the
/// column type. Filters bind as `qbe_<column>` so they never collide with
/// master or user filters on the same column.
#[derive(Debug)]
pub struct QueryByExample {
    table: MemoryTable,

    template: Record,

    /// Current criterion per column
    filters: IndexMap<String, Filter>,

    /// Columns whose filter was given rather than inferred
    explicit: IndexSet<String>,

    last_query: IndexMap<String, Criterion>,
}

#[derive(Debug, Clone)]
struct Criterion {
    value: Value,
    filter: Option<Filter>,
}

impl QueryByExample {
    pub fn new<'a, I>(block: &str, columns: I, types: &IndexMap<String, Type>) -> QueryByExample
    where
        I: IntoIterator<Item = &'a String>,
    {
        let table = MemoryTable::new(format!("{block}_qbe"), columns.into_iter().cloned())
            .with_types(types.clone());
        let template = template(&table);

        QueryByExample {
            table,
            template,
            filters: IndexMap::new(),
            explicit: IndexSet::new(),
            last_query: IndexMap::new(),
        }
    }

    pub fn record(&self) -> &Record {
        &self.template
    }

    pub fn value(&self, column: &str) -> &Value {
        self.template.value(column)
    }

    /// True when no criterion is set.
    pub fn is_empty(&self) -> bool {
        self.active().next().is_none()
    }

    /// Set a criterion value and refresh the column's filter.
    pub fn set_value(&mut self, column: &str, value: impl Into<Value>) -> Result<bool> {
        let column = column.to_lowercase();
        let changed = self.template.set_value(&column, value)?;
        self.refresh_filter(&column);
        Ok(changed)
    }

    /// Use `filter` for `column`, or go back to inferring one when `None`.
    pub fn set_filter(&mut self, column: &str, filter: Option<Filter>) -> Result<()> {
        let column = column.to_lowercase();

        if self.template.get_value(&column).is_none() {
            return Err(Error::unknown_column(column));
        }

        match filter {
            Some(filter) => {
                self.explicit.insert(column.clone());
                self.filters
                    .insert(column.clone(), filter.named(format!("qbe_{column}")));
            }
            None => {
                self.explicit.shift_remove(&column);
            }
        }

        self.refresh_filter(&column);
        Ok(())
    }

    /// Every active criterion, joined with `and`.
    pub fn filters(&self) -> FilterStructure {
        let mut structure = FilterStructure::new();
        for (column, filter) in self.active() {
            structure.and(filter.clone(), column.as_str());
        }
        structure
    }

    /// Filters whose column holds a value. An explicit `is null` filter
    /// needs none.
    fn active(&self) -> impl Iterator<Item = (&String, &Filter)> {
        self.filters.iter().filter(|(column, filter)| {
            filter.kind() == FilterKind::IsNull || !self.template.value(column).is_null()
        })
    }

    /// Reset every criterion, remembering them for
    /// [`show_last_query`](Self::show_last_query).
    pub fn clear(&mut self) {
        let snapshot: IndexMap<String, Criterion> = self
            .template
            .iter()
            .filter(|(column, value)| !value.is_null() || self.explicit.contains(*column))
            .map(|(column, value)| {
                let filter = self
                    .explicit
                    .contains(column)
                    .then(|| self.filters.get(column).cloned())
                    .flatten();

                (
                    column.to_string(),
                    Criterion {
                        value: value.clone(),
                        filter,
                    },
                )
            })
            .collect();

        if !snapshot.is_empty() {
            self.last_query = snapshot;
        }

        self.template = template(&self.table);
        self.filters.clear();
        self.explicit.clear();
    }

    /// Restore the criteria in place before the last [`clear`](Self::clear).
    /// Returns `false` if there is nothing to restore.
    pub fn show_last_query(&mut self) -> Result<bool> {
        if self.last_query.is_empty() {
            return Ok(false);
        }

        self.template = template(&self.table);
        self.filters.clear();
        self.explicit.clear();

        for (column, criterion) in self.last_query.clone() {
            self.template.set_value(&column, criterion.value)?;

            if let Some(filter) = criterion.filter {
                self.explicit.insert(column.clone());
                self.filters.insert(column.clone(), filter);
            }

            self.refresh_filter(&column);
        }

        Ok(true)
    }

    fn refresh_filter(&mut self, column: &str) {
        let value = self.template.value(column).clone();

        if self.explicit.contains(column) {
            if let Some(filter) = self.filters.get_mut(column) {
                if !value.is_null() {
                    filter.set_constraint(value);
                }
            }
            return;
        }

        if value.is_null() {
            self.filters.shift_remove(column);
            return;
        }

        let ty = self
            .table
            .types()
            .get(column)
            .copied()
            .unwrap_or_else(|| type_of(&value));

        let filter = match ty {
            Type::String => Filter::like(column),
            Type::Int | Type::Decimal | Type::Boolean => Filter::equals(column),
            Type::Date | Type::DateTime | Type::Timestamp => {
                Filter::date_interval(column, DateUnit::Day)
            }
        };

        self.filters.insert(
            column.to_string(),
            filter.named(format!("qbe_{column}")).with_constraint(value),
        );
    }
}

fn template(table: &MemoryTable) -> Record {
    let mut record = table.new_record();
    record.set_state(RecordState::QueryFilter);
    record
}

fn type_of(value: &Value) -> Type {
    match value {
        Value::Bool(_) => Type::Boolean,
        Value::I64(_) => Type::Int,
        Value::F64(_) => Type::Decimal,
        Value::Date(_) => Type::Date,
        Value::DateTime(_) => Type::DateTime,
        Value::Null | Value::String(_) => Type::String,
    }
}
