use formwork::{Record, RecordId, RecordState, Value, View};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    Display(Value),
    Refresh(Value),
    Attributes(Value, RecordState),
    Clear,
}

/// A view that remembers what the engine asked it to show. Records are
/// identified by the value of one key column.
#[derive(Debug)]
pub struct RecordingView {
    key: String,
    events: Mutex<Vec<ViewEvent>>,
    displayed: Mutex<Vec<RecordId>>,
}

impl RecordingView {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            events: Mutex::new(Vec::new()),
            displayed: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<ViewEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Key values of the records displayed since the last clear
    pub fn rows(&self) -> Vec<Value> {
        let events = self.events.lock().unwrap();
        let start = events
            .iter()
            .rposition(|event| *event == ViewEvent::Clear)
            .map_or(0, |pos| pos + 1);

        events[start..]
            .iter()
            .filter_map(|event| match event {
                ViewEvent::Display(key) => Some(key.clone()),
                _ => None,
            })
            .collect()
    }

    fn key(&self, record: &Record) -> Value {
        record.value(&self.key).clone()
    }

    fn push(&self, event: ViewEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl View for RecordingView {
    fn set_attributes(&self, _id: RecordId, record: &Record) {
        self.push(ViewEvent::Attributes(self.key(record), record.state()));
    }

    fn refresh(&self, _id: RecordId, record: &Record) {
        self.push(ViewEvent::Refresh(self.key(record)));
    }

    fn display(&self, id: RecordId, record: &Record) {
        self.displayed.lock().unwrap().push(id);
        self.push(ViewEvent::Display(self.key(record)));
    }

    fn clear(&self) {
        self.displayed.lock().unwrap().clear();
        self.push(ViewEvent::Clear);
    }

    fn displayed(&self, id: RecordId) -> bool {
        self.displayed.lock().unwrap().contains(&id)
    }
}
