use formwork_core::{async_trait, FilterStructure, Record};

/// Application callbacks that gate a block's lifecycle transitions.
///
/// Every hook defaults to accepting. Returning `false` vetoes the
/// transition in progress and leaves the record as it was.
#[async_trait]
pub trait Events: Send + Sync {
    /// Before a new record is queued for insert.
    async fn pre_insert(&self, _block: &str, _record: &mut Record) -> bool {
        true
    }

    /// After the backend accepted an insert. A veto keeps the record in
    /// the `Insert` state.
    async fn post_insert(&self, _block: &str, _record: &Record) -> bool {
        true
    }

    async fn pre_update(&self, _block: &str, _record: &mut Record) -> bool {
        true
    }

    async fn post_update(&self, _block: &str, _record: &Record) -> bool {
        true
    }

    async fn pre_delete(&self, _block: &str, _record: &Record) -> bool {
        true
    }

    async fn post_delete(&self, _block: &str, _record: &Record) -> bool {
        true
    }

    /// Inspect or extend the filter about to be sent.
    async fn pre_query(&self, _block: &str, _filter: &mut FilterStructure) -> bool {
        true
    }

    /// A fetched record is about to enter the block. A veto skips it.
    async fn on_fetch(&self, _block: &str, _record: &mut Record) -> bool {
        true
    }

    async fn post_query(&self, _block: &str, _fetched: usize) -> bool {
        true
    }

    /// `field` was just set on `record`. A veto restores the old value.
    async fn validate_field(&self, _block: &str, _field: &str, _record: &Record) -> bool {
        true
    }

    /// Called before a changed record is queued or left.
    async fn validate_record(&self, _block: &str, _record: &Record) -> bool {
        true
    }
}

/// Accepts everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEvents;

impl Events for NoEvents {}
