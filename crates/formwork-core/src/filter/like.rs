use super::{Target, NEVER};
use crate::{BindValue, Record, Value};

/// `column like :name`, with `%` wildcards on either end.
///
/// Wildcards are detected once, when the constraint is set: a single
/// leading and a single trailing `%` are recognized, anything else in the
/// pattern is matched literally during in-memory evaluation.
#[derive(Debug, Clone)]
pub struct Like {
    pub(crate) target: Target,
    pattern: Option<String>,
    leading: bool,
    trailing: bool,
    ignore_case: bool,
}

impl Like {
    pub fn new(column: impl Into<String>) -> Like {
        Like {
            target: Target::new(column),
            pattern: None,
            leading: false,
            trailing: false,
            ignore_case: false,
        }
    }

    /// Compare case-insensitively; serializes as `lower(column) like :name`.
    pub fn ignore_case(mut self) -> Like {
        self.ignore_case = true;
        self
    }

    pub fn column(&self) -> &str {
        self.target.column()
    }

    pub fn is_ignore_case(&self) -> bool {
        self.ignore_case
    }

    pub fn set_constraint(&mut self, value: impl Into<Value>) {
        let value = value.into();

        if value.is_null() {
            self.pattern = None;
            self.leading = false;
            self.trailing = false;
            return;
        }

        let mut pattern = value.to_string();

        self.leading = match pattern.strip_prefix('%') {
            Some(rest) => {
                pattern = rest.to_string();
                true
            }
            None => false,
        };

        self.trailing = match pattern.strip_suffix('%') {
            Some(rest) => {
                pattern = rest.to_string();
                true
            }
            None => false,
        };

        self.pattern = Some(pattern);
    }

    /// The pattern as sent to the backend, wildcards included.
    pub fn pattern(&self) -> Option<String> {
        let core = self.pattern.as_ref()?;
        let lead = if self.leading { "%" } else { "" };
        let trail = if self.trailing { "%" } else { "" };

        let pattern = format!("{lead}{core}{trail}");

        Some(if self.ignore_case {
            pattern.to_lowercase()
        } else {
            pattern
        })
    }

    pub fn evaluate(&self, record: &Record) -> bool {
        let (Some(core), Some(value)) = (&self.pattern, self.target.value(record)) else {
            return false;
        };

        let (text, core) = if self.ignore_case {
            (value.to_string().to_lowercase(), core.to_lowercase())
        } else {
            (value.to_string(), core.clone())
        };

        match (self.leading, self.trailing) {
            (true, true) => text.contains(&core),
            (true, false) => text.ends_with(&core),
            (false, true) => text.starts_with(&core),
            (false, false) => text == core,
        }
    }

    pub fn as_sql(&self) -> String {
        if self.pattern.is_none() {
            return NEVER.to_string();
        }

        let column = self.target.column();
        let name = self.target.name();

        if self.ignore_case {
            format!("lower({column}) like :{name}")
        } else {
            format!("{column} like :{name}")
        }
    }

    pub fn bind_values(&self) -> Vec<BindValue> {
        match self.pattern() {
            Some(pattern) => vec![self
                .target
                .bind(self.target.name().to_string(), Value::String(pattern))],
            None => vec![],
        }
    }
}
