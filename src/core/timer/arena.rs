//! Generational arena backing timer entries.
//!
//! Slots are addressed by index plus generation; a slot's generation bumps
//! when it is freed, so a stale key held by a caller resolves to `None`
//! instead of aliasing a reused slot. This is what makes `Timers::legal` an
//! O(1) lookup with no dangling-reference risk.

/// Index-plus-generation key into the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct TimerKey {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

enum Slot<T> {
    Occupied { generation: u32, value: T },
    Free { generation: u32, next_free: Option<u32> },
}

/// Growable slab with an intrusive free list.
pub(crate) struct Arena<T> {
    slots: Vec<Slot<T>>,
    free_head: Option<u32>,
    len: usize,
}

impl<T> Arena<T> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_head: None,
            len: 0,
        }
    }

    /// Number of occupied slots.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Inserts a value, reusing a free slot when one exists.
    ///
    /// # Panics
    ///
    /// Panics if the arena would exceed `u32::MAX` slots.
    pub(crate) fn insert(&mut self, value: T) -> TimerKey {
        self.len += 1;

        if let Some(index) = self.free_head {
            let slot = &mut self.slots[index as usize];
            let generation = match slot {
                Slot::Free {
                    generation,
                    next_free,
                } => {
                    self.free_head = *next_free;
                    *generation
                }
                Slot::Occupied { .. } => unreachable!("free list points at occupied slot"),
            };
            *slot = Slot::Occupied { generation, value };
            return TimerKey { index, generation };
        }

        let index = u32::try_from(self.slots.len()).expect("timer arena exceeds u32::MAX slots");
        self.slots.push(Slot::Occupied {
            generation: 0,
            value,
        });
        TimerKey {
            index,
            generation: 0,
        }
    }

    /// Frees the slot behind `key`, returning its value.
    ///
    /// The slot's generation is bumped so outstanding keys stop resolving.
    pub(crate) fn remove(&mut self, key: TimerKey) -> Option<T> {
        let slot = self.slots.get_mut(key.index as usize)?;
        match slot {
            Slot::Occupied { generation, .. } if *generation == key.generation => {
                let next_generation = generation.wrapping_add(1);
                let old = std::mem::replace(
                    slot,
                    Slot::Free {
                        generation: next_generation,
                        next_free: self.free_head,
                    },
                );
                self.free_head = Some(key.index);
                self.len -= 1;
                match old {
                    Slot::Occupied { value, .. } => Some(value),
                    Slot::Free { .. } => unreachable!(),
                }
            }
            _ => None,
        }
    }

    pub(crate) fn get(&self, key: TimerKey) -> Option<&T> {
        match self.slots.get(key.index as usize) {
            Some(Slot::Occupied { generation, value }) if *generation == key.generation => {
                Some(value)
            }
            _ => None,
        }
    }

    pub(crate) fn get_mut(&mut self, key: TimerKey) -> Option<&mut T> {
        match self.slots.get_mut(key.index as usize) {
            Some(Slot::Occupied { generation, value }) if *generation == key.generation => {
                Some(value)
            }
            _ => None,
        }
    }

    pub(crate) fn contains(&self, key: TimerKey) -> bool {
        self.get(key).is_some()
    }
}
