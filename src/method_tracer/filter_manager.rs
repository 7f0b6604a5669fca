use super::filter::Filter;
use crate::epoch::Epoch;
use enum_map::EnumMap;
use spin::Mutex;
use std::sync::Arc;

/// Holds the installed filter.
///
/// Replaced filters may still be referenced by data recorded in the epoch they were replaced
/// in, so they are retained until that epoch's data has been written out.
#[derive(Default)]
pub struct FilterManager {
    current: Mutex<Option<Arc<Filter>>>,
    // Only set while classes are being retransformed for a filter update.
    previous: Mutex<Option<Arc<Filter>>>,
    retired: Mutex<EnumMap<Epoch, Vec<Arc<Filter>>>>,
}

impl FilterManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Arc<Filter>> {
        self.current.lock().clone()
    }

    /// The filter being replaced, while an update is in progress.
    pub fn previous(&self) -> Option<Arc<Filter>> {
        self.previous.lock().clone()
    }

    /// Install `filter`. The filter it replaces stays visible through
    /// [`FilterManager::previous`] until [`FilterManager::finish_update`].
    pub fn begin_update(&self, filter: Arc<Filter>) -> Option<Arc<Filter>> {
        let mut current = self.current.lock();
        let replaced = current.replace(filter);
        *self.previous.lock() = replaced.clone();
        replaced
    }

    /// Hide the replaced filter and retain it for `epoch`.
    pub fn finish_update(&self, epoch: Epoch) {
        if let Some(replaced) = self.previous.lock().take() {
            self.retired.lock()[epoch].push(replaced);
        }
    }

    /// Drop the filters retained for the epoch before `current_epoch`.
    pub fn clear_previous_filters(&self, current_epoch: Epoch) {
        let dropped = std::mem::take(&mut self.retired.lock()[current_epoch.other()]);
        if !dropped.is_empty() {
            trace!("Dropped {} retired filters of {}", dropped.len(), current_epoch.other());
        }
    }

    pub fn retired_count(&self, epoch: Epoch) -> usize {
        self.retired.lock()[epoch].len()
    }
}
