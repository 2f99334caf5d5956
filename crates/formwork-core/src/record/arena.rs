use super::Record;

/// Handle to a record in a [`RecordArena`].
///
/// Handles are generation-stamped: once a record is removed, its handle no
/// longer resolves, even after the slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId {
    index: usize,
    generation: u32,
}

/// Owns records and hands out stable [`RecordId`]s.
#[derive(Debug, Default)]
pub struct RecordArena {
    slots: Vec<Slot>,
    free: Vec<usize>,
    len: usize,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    record: Option<Record>,
}

impl RecordArena {
    pub fn new() -> RecordArena {
        RecordArena::default()
    }

    pub fn insert(&mut self, record: Record) -> RecordId {
        self.len += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.generation = slot.generation.wrapping_add(1);
            slot.record = Some(record);
            return RecordId {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len();
        self.slots.push(Slot {
            generation: 0,
            record: Some(record),
        });
        RecordId {
            index,
            generation: 0,
        }
    }

    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.record.as_ref())
    }

    pub fn get_mut(&mut self, id: RecordId) -> Option<&mut Record> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.record.as_mut())
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.get(id).is_some()
    }

    pub fn remove(&mut self, id: RecordId) -> Option<Record> {
        let slot = self
            .slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)?;

        let record = slot.record.take()?;
        self.free.push(id.index);
        self.len -= 1;
        Some(record)
    }

    pub fn clear(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.record.take().is_some() {
                self.free.push(index);
            }
        }
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (RecordId, &Record)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.record.as_ref().map(|record| {
                (
                    RecordId {
                        index,
                        generation: slot.generation,
                    },
                    record,
                )
            })
        })
    }
}
