use super::{Access, AccessMode};
use std::collections::BTreeMap;

#[derive(Copy, Clone, Debug)]
struct Entry {
    end: usize,
    mode: AccessMode,
    task: usize,
}

/// Interval map from declared byte ranges to the tasks that last touched them.
///
/// Entries are keyed by `(start, insertion order)`. A range holds at most one live writer, or
/// the readers submitted since that writer. Entries of finished tasks and entries fully covered
/// by a newer write are dropped, since any later task overlapping them also overlaps something
/// newer that already depends on them.
#[derive(Default, Debug)]
pub(crate) struct Tracker {
    entries: BTreeMap<(usize, usize), Entry>,
    longest: usize,
    inserted: usize,
}

impl Tracker {
    /// Records the accesses of `task` and returns the earlier tasks it must wait for, sorted and
    /// deduplicated. Tasks for which `is_done` holds are never returned.
    pub fn record(
        &mut self,
        task: usize,
        accesses: &[Access],
        is_done: impl Fn(usize) -> bool,
    ) -> Vec<usize> {
        let mut deps = Vec::new();
        let mut stale = Vec::new();

        for access in accesses {
            let range = access.range;
            if range.is_empty() {
                continue;
            }
            let writes = access.mode == AccessMode::Write;
            let lo = range.start.saturating_sub(self.longest);

            for (&key, entry) in self.entries.range((lo, 0)..(range.end, 0)) {
                if entry.end <= range.start {
                    continue;
                }
                if is_done(entry.task) {
                    stale.push(key);
                    continue;
                }
                if writes || entry.mode == AccessMode::Write {
                    deps.push(entry.task);
                }
                if writes && range.start <= key.0 && entry.end <= range.end {
                    stale.push(key);
                }
            }
        }

        for key in stale {
            self.entries.remove(&key);
        }

        for access in accesses {
            let range = access.range;
            if range.is_empty() {
                continue;
            }
            self.entries.insert(
                (range.start, self.inserted),
                Entry {
                    end: range.end,
                    mode: access.mode,
                    task,
                },
            );
            self.inserted += 1;
            self.longest = Ord::max(self.longest, range.len());
        }

        deps.sort_unstable();
        deps.dedup();
        deps
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
