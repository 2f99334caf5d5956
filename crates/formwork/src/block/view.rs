use formwork_core::{Record, RecordId};

/// The visual side of a block.
///
/// The engine pushes record changes through these calls and never reads
/// anything back except [`View::displayed`].
pub trait View: Send + Sync {
    /// The record's state or lock flags changed.
    fn set_attributes(&self, _id: RecordId, _record: &Record) {}

    /// The record's values changed.
    fn refresh(&self, _id: RecordId, _record: &Record) {}

    fn display(&self, _id: RecordId, _record: &Record) {}

    /// Remove every displayed record.
    fn clear(&self) {}

    /// Whether the record currently occupies a visible row.
    fn displayed(&self, _id: RecordId) -> bool {
        false
    }
}

/// A view that renders nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoView;

impl View for NoView {}
