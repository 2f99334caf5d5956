use super::{Form, Shared};
use crate::{
    block::BlockState, BlockCoordinator, BlockDefinition, QueryManager, Relation, Session,
    Wrapper,
};

use formwork_core::{bail, Error, FilterStructure, Result};

use indexmap::IndexMap;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct Builder {
    session: Session,

    blocks: Vec<BlockDefinition>,

    relations: Vec<Relation>,
}

impl Builder {
    pub(super) fn new(session: &Session) -> Builder {
        Builder {
            session: session.clone(),
            blocks: vec![],
            relations: vec![],
        }
    }

    pub fn block(&mut self, block: BlockDefinition) -> &mut Self {
        self.blocks.push(block);
        self
    }

    pub fn relation(&mut self, relation: Relation) -> &mut Self {
        self.relations.push(relation);
        self
    }

    pub fn build(&mut self) -> Result<Form> {
        let mut blocks = IndexMap::new();
        let mut coordinator = BlockCoordinator::new();

        for definition in std::mem::take(&mut self.blocks) {
            let name = definition.name;

            if blocks.contains_key(&name) {
                bail!("block `{name}` is defined twice");
            }

            let lock_mode = definition
                .lock_mode
                .unwrap_or(self.session.config().lock_mode);

            let wrapper = Wrapper::new(
                name.clone(),
                definition.source,
                definition.events.clone(),
                lock_mode,
            )
            .with_columns(definition.columns);

            let state = BlockState {
                wrapper,
                events: definition.events,
                view: definition.view,
                current: None,
                query_mode: false,
                qbe: None,
                filter: FilterStructure::new(),
                master_filter: FilterStructure::new(),
            };

            coordinator.add_block(&name);
            blocks.insert(name, Arc::new(Mutex::new(state)));
        }

        for relation in std::mem::take(&mut self.relations) {
            for block in [&relation.master, &relation.detail] {
                if !blocks.contains_key(block) {
                    return Err(Error::unknown_block(block));
                }
            }
            coordinator.add_relation(relation);
        }

        Ok(Form {
            shared: Arc::new(Shared {
                session: self.session.clone(),
                blocks,
                coordinator,
                queries: QueryManager::new(),
            }),
        })
    }
}
