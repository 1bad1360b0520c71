//! Per-path-prefix sections and the registry that owns them

use super::counter::{CounterError, CounterShape, WindowedCounter};
use super::response::{ClassCounters, ClassCounts, ResponseClass};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Section name for a request path: everything before the second `/`.
///
/// `"/api/users/5"` → `"/api"`, `"/foo"` → `"/foo"`, `"/"` and `""` → `""`.
/// A path with no `/` at all has no section. Paths that don't start with `/`
/// are cut at their first `/` past index 0.
pub fn section_of(path: &str) -> &str {
    if path.len() <= 1 || !path.contains('/') {
        return "";
    }
    match path.bytes().skip(1).position(|b| b == b'/') {
        Some(pos) => &path[..pos + 1],
        None => path,
    }
}

#[derive(Debug)]
pub struct Section {
    name: String,
    hits: WindowedCounter,
    classes: ClassCounters,
}

impl Section {
    pub fn new(name: String, shape: CounterShape, origin: Instant) -> Self {
        Self {
            name,
            hits: WindowedCounter::new(shape, origin),
            classes: ClassCounters::new(shape, origin),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Count one hit, plus its class when it has one
    pub fn record(&self, class: Option<ResponseClass>) {
        self.hits.add(1);
        if let Some(class) = class {
            self.classes.record(class);
        }
    }

    pub fn hits(&self, d: Duration) -> Result<u64, CounterError> {
        self.hits.total(d)
    }

    pub fn class_totals(&self, d: Duration) -> Result<ClassCounts, CounterError> {
        self.classes.totals(d)
    }
}

/// Name → section map. Sections are created on first sight and live for the
/// whole process.
#[derive(Debug)]
pub struct SectionRegistry {
    shape: CounterShape,
    origin: Instant,
    sections: RwLock<HashMap<String, Arc<Section>>>,
}

impl SectionRegistry {
    pub fn new(shape: CounterShape, origin: Instant) -> Self {
        Self {
            shape,
            origin,
            sections: RwLock::new(HashMap::new()),
        }
    }

    pub fn get_or_create(&self, name: &str) -> Arc<Section> {
        if let Some(section) = self.sections.read().get(name) {
            return Arc::clone(section);
        }

        let mut sections = self.sections.write();
        let section = sections.entry(name.to_string()).or_insert_with(|| {
            log::debug!("New section: {:?}", name);
            Arc::new(Section::new(name.to_string(), self.shape, self.origin))
        });
        Arc::clone(section)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Section>> {
        self.sections.read().get(name).cloned()
    }

    /// Handles to every section. The registry lock is released on return.
    pub fn snapshot(&self) -> Vec<Arc<Section>> {
        self.sections.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sections.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.read().is_empty()
    }
}
