use super::{DescribeCache, EvictionPolicy, Session, Shared};
use crate::{Config, Diagnostics};

use formwork_core::Gateway;

use std::sync::Arc;

#[derive(Default)]
pub struct Builder {
    gateway: Option<Arc<dyn Gateway>>,

    config: Config,

    eviction: EvictionPolicy,
}

impl Builder {
    pub fn gateway(&mut self, gateway: impl Gateway) -> &mut Self {
        self.gateway = Some(Arc::new(gateway));
        self
    }

    /// Use a gateway that is shared with other owners, such as a test
    /// harness that inspects it.
    pub fn shared_gateway(&mut self, gateway: Arc<dyn Gateway>) -> &mut Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn config(&mut self, config: Config) -> &mut Self {
        self.config = config;
        self
    }

    pub fn array_fetch_size(&mut self, size: usize) -> &mut Self {
        self.config.array_fetch_size = size;
        self
    }

    pub fn eviction_policy(&mut self, policy: EvictionPolicy) -> &mut Self {
        self.eviction = policy;
        self
    }

    pub fn build(&mut self) -> Session {
        Session {
            shared: Arc::new(Shared {
                gateway: self.gateway.clone(),
                config: self.config.clone(),
                describe_cache: DescribeCache::new(self.eviction),
                diagnostics: Diagnostics::new(),
            }),
        }
    }
}
