use indexmap::IndexMap;

/// A master/detail link between two blocks.
///
/// The detail block only shows records whose `detail_columns` equal the
/// master's current values for `master_columns`, pairwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub name: String,

    pub master: String,

    pub detail: String,

    pub master_columns: Vec<String>,

    pub detail_columns: Vec<String>,

    /// Whether the detail may be queried on its own while the master is in
    /// query mode
    pub orphan_queries: bool,
}

impl Relation {
    pub fn new(master: impl Into<String>, detail: impl Into<String>) -> Relation {
        let master = master.into().to_lowercase();
        let detail = detail.into().to_lowercase();

        Relation {
            name: format!("{master}_{detail}"),
            master,
            detail,
            master_columns: vec![],
            detail_columns: vec![],
            orphan_queries: false,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Relation {
        self.name = name.into();
        self
    }

    /// Join `master_column` on the master to `detail_column` on the detail.
    pub fn link(mut self, master_column: &str, detail_column: &str) -> Relation {
        self.master_columns.push(master_column.to_lowercase());
        self.detail_columns.push(detail_column.to_lowercase());
        self
    }

    pub fn allow_orphan_queries(mut self) -> Relation {
        self.orphan_queries = true;
        self
    }

    /// `(master column, detail column)` pairs.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &str)> {
        self.master_columns
            .iter()
            .zip(&self.detail_columns)
            .map(|(m, d)| (m.as_str(), d.as_str()))
    }
}

/// What the coordinator needs to know about a master block when deciding
/// whether its detail may enter query mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockStatus {
    pub query_mode: bool,

    /// The block has no current record
    pub empty: bool,
}

/// The master/detail graph of a form.
#[derive(Debug, Default)]
pub struct BlockCoordinator {
    relations: Vec<Relation>,
    blocks: IndexMap<String, Links>,
}

/// Relation indices touching one block.
#[derive(Debug, Default)]
struct Links {
    /// Relations where the block is the master
    details: Vec<usize>,

    /// Relations where the block is the detail
    masters: Vec<usize>,

    /// Master column to the relations it drives
    fields: IndexMap<String, Vec<usize>>,
}

impl BlockCoordinator {
    pub fn new() -> BlockCoordinator {
        BlockCoordinator::default()
    }

    /// Make `block` known even if it takes part in no relation.
    pub fn add_block(&mut self, block: &str) {
        self.blocks.entry(block.to_lowercase()).or_default();
    }

    pub fn add_relation(&mut self, relation: Relation) {
        let index = self.relations.len();

        let master = self.blocks.entry(relation.master.clone()).or_default();
        master.details.push(index);
        for column in &relation.master_columns {
            master.fields.entry(column.clone()).or_default().push(index);
        }

        self.blocks
            .entry(relation.detail.clone())
            .or_default()
            .masters
            .push(index);

        self.relations.push(relation);
    }

    pub fn blocks(&self) -> impl Iterator<Item = &str> {
        self.blocks.keys().map(String::as_str)
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn find_relation(&self, master: &str, detail: &str) -> Option<&Relation> {
        let detail = detail.to_lowercase();
        self.details(master).find(|relation| relation.detail == detail)
    }

    /// Relations in which `block` is the detail.
    pub fn masters(&self, block: &str) -> impl Iterator<Item = &Relation> {
        let indices = self.links(block).map(|links| links.masters.as_slice());
        self.resolve(indices.unwrap_or_default())
    }

    /// Relations in which `block` is the master.
    pub fn details(&self, block: &str) -> impl Iterator<Item = &Relation> {
        let indices = self.links(block).map(|links| links.details.as_slice());
        self.resolve(indices.unwrap_or_default())
    }

    /// Relations that depend on `field` of the master `block`.
    pub fn details_for_field(&self, block: &str, field: &str) -> impl Iterator<Item = &Relation> {
        let field = field.to_lowercase();
        let indices = self
            .links(block)
            .and_then(|links| links.fields.get(&field))
            .map(Vec::as_slice);
        self.resolve(indices.unwrap_or_default())
    }

    /// Whether `block` may enter query mode: every master must be
    /// non-empty, or be in query mode itself with orphan queries allowed on
    /// the relation.
    pub fn allow_query_mode(&self, block: &str, status: impl Fn(&str) -> BlockStatus) -> bool {
        self.masters(block).all(|relation| {
            let master = status(&relation.master);
            !master.empty || (master.query_mode && relation.orphan_queries)
        })
    }

    /// Block names ordered so every master precedes its details.
    ///
    /// Blocks caught in a cycle keep declaration order at the end.
    pub fn flush_order(&self) -> Vec<String> {
        let mut incoming: IndexMap<&str, usize> = self
            .blocks
            .iter()
            .map(|(name, links)| (name.as_str(), links.masters.len()))
            .collect();

        let mut ready: Vec<&str> = incoming
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(name, _)| *name)
            .collect();
        ready.reverse();

        let mut order = vec![];

        while let Some(block) = ready.pop() {
            order.push(block.to_string());

            for relation in self.details(block) {
                if let Some(count) = incoming.get_mut(relation.detail.as_str()) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push(&relation.detail);
                    }
                }
            }
        }

        for name in self.blocks.keys() {
            if !order.contains(name) {
                order.push(name.clone());
            }
        }

        order
    }

    fn links(&self, block: &str) -> Option<&Links> {
        self.blocks.get(&block.to_lowercase())
    }

    fn resolve<'a>(&'a self, indices: &'a [usize]) -> impl Iterator<Item = &'a Relation> {
        indices.iter().map(move |index| &self.relations[*index])
    }
}
