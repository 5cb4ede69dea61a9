//! Registry of in-flight preload tasks.
//!
//! Maps caller-chosen ids to their active task. An id present here always
//! refers to a task in `Pending` or `Running` state; reaching a terminal
//! state removes the entry immediately. All operations are short critical
//! sections, safe from the submitting thread, the worker lane, and any
//! thread issuing stop requests.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::PreloadError;
use crate::task::PreloadTask;

#[derive(Default)]
pub struct TaskRegistry {
    tasks: RwLock<HashMap<i64, Arc<PreloadTask>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `task` under `id`. Ids that are still active are rejected
    /// rather than silently replaced.
    pub fn put(&self, id: i64, task: Arc<PreloadTask>) -> Result<(), PreloadError> {
        match self.tasks.write().unwrap().entry(id) {
            Entry::Occupied(_) => Err(PreloadError::DuplicateTaskId(id)),
            Entry::Vacant(slot) => {
                slot.insert(task);
                Ok(())
            }
        }
    }

    pub fn get(&self, id: i64) -> Option<Arc<PreloadTask>> {
        self.tasks.read().unwrap().get(&id).cloned()
    }

    /// Removes and returns the task for `id`, if still active.
    pub fn remove(&self, id: i64) -> Option<Arc<PreloadTask>> {
        self.tasks.write().unwrap().remove(&id)
    }

    /// Drains every active task in one critical section, returning them so
    /// the caller can request cancellation on each.
    pub fn drain(&self) -> Vec<(i64, Arc<PreloadTask>)> {
        self.tasks.write().unwrap().drain().collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
