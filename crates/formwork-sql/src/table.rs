/// What the builders need to know about a backend table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,

    /// Key columns used to locate a row. When empty, every data-source
    /// column of the record is part of the key.
    pub primary_key: Vec<String>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Table {
        Table {
            name: name.into(),
            primary_key: vec![],
        }
    }

    pub fn with_primary_key<I>(mut self, columns: I) -> Table
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.primary_key = columns
            .into_iter()
            .map(|column| column.into().to_lowercase())
            .collect();
        self
    }
}
