//! Generation-tagged storage behind [`PortId`](crate::PortId) and
//! [`ModuleId`](crate::ModuleId).
//!
//! Freed entries go on a free list and are handed out again with their
//! generation bumped, so the backing vector stays as large as the peak live
//! count while a key from before the free never resolves to the new value.

/// Index plus generation of one slab entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct Key {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl Key {
    #[cfg(test)]
    pub(crate) const fn first(index: u32) -> Self {
        Self {
            index,
            generation: 0,
        }
    }
}

#[derive(Debug)]
struct Entry<T> {
    generation: u32,
    value: Option<T>,
}

#[derive(Debug)]
pub(crate) struct Slab<T> {
    entries: Vec<Entry<T>>,
    free: Vec<u32>,
}

impl<T> Default for Slab<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            free: Vec::new(),
        }
    }
}

impl<T> Slab<T> {
    /// Key the next [`insert`](Self::insert) will return.
    pub(crate) fn next_key(&self) -> Key {
        match self.free.last() {
            Some(&index) => Key {
                index,
                generation: self.entries[index as usize].generation,
            },
            None => Key {
                index: self.entries.len() as u32,
                generation: 0,
            },
        }
    }

    pub(crate) fn insert(&mut self, value: T) -> Key {
        let key = self.next_key();
        match self.free.pop() {
            Some(index) => self.entries[index as usize].value = Some(value),
            None => self.entries.push(Entry {
                generation: 0,
                value: Some(value),
            }),
        }
        key
    }

    pub(crate) fn remove(&mut self, key: Key) -> Option<T> {
        let entry = self
            .entries
            .get_mut(key.index as usize)
            .filter(|e| e.generation == key.generation)?;
        let value = entry.value.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(key.index);
        Some(value)
    }

    pub(crate) fn get(&self, key: Key) -> Option<&T> {
        self.entries
            .get(key.index as usize)
            .filter(|e| e.generation == key.generation)
            .and_then(|e| e.value.as_ref())
    }

    pub(crate) fn get_mut(&mut self, key: Key) -> Option<&mut T> {
        self.entries
            .get_mut(key.index as usize)
            .filter(|e| e.generation == key.generation)
            .and_then(|e| e.value.as_mut())
    }

    /// Live values with their keys, in index order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (Key, &T)> {
        self.entries.iter().enumerate().filter_map(|(i, e)| {
            e.value.as_ref().map(|v| {
                (
                    Key {
                        index: i as u32,
                        generation: e.generation,
                    },
                    v,
                )
            })
        })
    }

    pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entries.iter_mut().filter_map(|e| e.value.as_mut())
    }

    /// Number of live values.
    pub(crate) fn len(&self) -> usize {
        self.entries.len() - self.free.len()
    }

    /// Number of entries, live or free.
    pub(crate) fn capacity(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_freed_entry_reused_with_new_generation() {
        let mut slab = Slab::default();
        let a = slab.insert("a");
        let b = slab.insert("b");
        assert_eq!(slab.remove(a), Some("a"));
        assert_eq!(slab.next_key().index, a.index);

        let c = slab.insert("c");
        assert_eq!(c.index, a.index);
        assert_ne!(c, a);
        assert_eq!(slab.get(a), None);
        assert_eq!(slab.get(c), Some(&"c"));
        assert_eq!(slab.get(b), Some(&"b"));
        assert_eq!(slab.capacity(), 2);
        assert_eq!(slab.len(), 2);
    }

    #[test]
    fn test_stale_remove_is_ignored() {
        let mut slab = Slab::default();
        let a = slab.insert(1);
        slab.remove(a);
        let b = slab.insert(2);
        assert_eq!(slab.remove(a), None);
        assert_eq!(slab.get(b), Some(&2));
        assert_eq!(slab.iter().map(|(k, _)| k).collect::<Vec<_>>(), vec![b]);
    }

    #[test]
    fn test_churn_stays_bounded() {
        let mut slab = Slab::default();
        let mut live: Vec<Key> = (0..4).map(|i| slab.insert(i)).collect();
        for round in 0..100 {
            for key in live.drain(..) {
                slab.remove(key);
            }
            live = (0..4).map(|i| slab.insert(i + round)).collect();
        }
        assert_eq!(slab.capacity(), 4);
        assert_eq!(slab.len(), 4);
    }
}
