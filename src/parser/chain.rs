//! Helpers shared by the dialect parsers for wiring records into chains.

use crate::model::EdgeKind;
use crate::record::{ComponentRecord, RecordLink};
use ahash::AHashMap;

/// A loose end of a parsed fragment: the record control leaves from, and the
/// condition guarding that exit.
pub(crate) type Exit = (String, Option<String>);

/// The entry and exits of a parsed run of steps.
#[derive(Debug, Default)]
pub(crate) struct Fragment {
    pub entry: Option<String>,
    pub exits: Vec<Exit>,
}

impl Fragment {
    pub fn single(id: String) -> Self {
        Self {
            entry: Some(id.clone()),
            exits: vec![(id, None)],
        }
    }

    /// A step that ends the flow.
    pub fn terminal(id: String) -> Self {
        Self {
            entry: Some(id),
            exits: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }
}

/// Collects records in document order and adds links between them by id.
#[derive(Debug, Default)]
pub(crate) struct RecordSink {
    records: Vec<ComponentRecord>,
    index: AHashMap<String, usize>,
}

impl RecordSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ComponentRecord) -> String {
        let id = record.id.clone();
        self.index.insert(id.clone(), self.records.len());
        self.records.push(record);
        id
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut ComponentRecord> {
        let index = *self.index.get(id)?;
        self.records.get_mut(index)
    }

    pub fn link(&mut self, from: &str, to: &str, kind: EdgeKind, condition: Option<String>) {
        if let Some(record) = self.get_mut(from) {
            record
                .links
                .push(RecordLink::new(to, kind).with_condition(condition));
        }
    }

    /// Links every exit to `to` with a sequence link.
    pub fn connect(&mut self, exits: &[Exit], to: &str) {
        for (from, condition) in exits {
            self.link(from, to, EdgeKind::Sequence, condition.clone());
        }
    }

    /// Runs `fragments` one after another, wiring the exits of each into the
    /// entry of the next. Empty fragments are skipped.
    pub fn sequence(&mut self, fragments: Vec<Fragment>) -> Fragment {
        let mut result = Fragment::default();
        let mut open: Option<Vec<Exit>> = None;
        for fragment in fragments {
            let Some(entry) = fragment.entry else {
                continue;
            };
            match open.take() {
                Some(exits) => self.connect(&exits, &entry),
                None => result.entry = Some(entry),
            }
            open = Some(fragment.exits);
        }
        result.exits = open.unwrap_or_default();
        result
    }

    pub fn into_records(self) -> Vec<ComponentRecord> {
        self.records
    }
}
