//! Dense, bitmap-backed descriptor table with lowest-free allocation.
//!
//! This collapses the table abstraction duplicated across the file-system
//! layers this crate descends from (a `HashMap`-keyed table in one lineage,
//! an `EntryTable`-wrapped pool in another) into the one representation the
//! WASI call dispatcher actually needs: a dense `u32`-keyed slot array.

const WORD_BITS: u32 = 64;

pub struct DescriptorTable<T> {
    occupancy: Vec<u64>,
    slots: Vec<Option<T>>,
}

impl<T> Default for DescriptorTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DescriptorTable<T> {
    pub fn new() -> Self {
        DescriptorTable {
            occupancy: Vec::new(),
            slots: Vec::new(),
        }
    }

    /// Inserts `value` at the numerically smallest unused descriptor and
    /// returns it, growing the table by one word (64 slots) at a time when
    /// every existing word is full.
    pub fn insert(&mut self, value: T) -> u32 {
        let word_idx = match self.occupancy.iter().position(|w| *w != u64::MAX) {
            Some(idx) => idx,
            None => {
                self.occupancy.push(0);
                self.slots
                    .resize_with(self.slots.len() + WORD_BITS as usize, || None);
                self.occupancy.len() - 1
            }
        };
        let word = self.occupancy[word_idx];
        let bit = (!word).trailing_zeros();
        self.occupancy[word_idx] |= 1 << bit;
        let descriptor = word_idx as u32 * WORD_BITS + bit;
        self.slots[descriptor as usize] = Some(value);
        descriptor
    }

    /// Inserts `value` at exactly `descriptor`, growing the table if needed.
    /// Used to register the fixed stdio descriptors 0/1/2 and any
    /// configured pre-opens before guest code ever calls an `insert`.
    pub fn insert_at(&mut self, descriptor: u32, value: T) {
        self.ensure_capacity(descriptor);
        let (word_idx, bit) = Self::locate(descriptor);
        self.occupancy[word_idx] |= 1 << bit;
        self.slots[descriptor as usize] = Some(value);
    }

    pub fn contains_key(&self, descriptor: u32) -> bool {
        self.bit_set(descriptor)
    }

    pub fn get(&self, descriptor: u32) -> Option<&T> {
        if !self.bit_set(descriptor) {
            return None;
        }
        self.slots.get(descriptor as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, descriptor: u32) -> Option<&mut T> {
        if !self.bit_set(descriptor) {
            return None;
        }
        self.slots.get_mut(descriptor as usize)?.as_mut()
    }

    /// Clears the occupancy bit and returns the removed value, if any.
    pub fn delete(&mut self, descriptor: u32) -> Option<T> {
        if !self.bit_set(descriptor) {
            return None;
        }
        let (word_idx, bit) = Self::locate(descriptor);
        self.occupancy[word_idx] &= !(1 << bit);
        self.slots[descriptor as usize].take()
    }

    /// Visits occupied entries in ascending descriptor order; `f` returns
    /// `false` to stop early.
    pub fn scan<F: FnMut(u32, &T) -> bool>(&self, mut f: F) {
        for (descriptor, slot) in self.slots.iter().enumerate() {
            if let Some(value) = slot {
                if !f(descriptor as u32, value) {
                    break;
                }
            }
        }
    }

    pub fn reset(&mut self) {
        self.occupancy.clear();
        self.slots.clear();
    }

    pub fn len(&self) -> usize {
        self.occupancy.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn locate(descriptor: u32) -> (usize, u32) {
        ((descriptor / WORD_BITS) as usize, descriptor % WORD_BITS)
    }

    fn bit_set(&self, descriptor: u32) -> bool {
        let (word_idx, bit) = Self::locate(descriptor);
        self.occupancy
            .get(word_idx)
            .map(|w| w & (1 << bit) != 0)
            .unwrap_or(false)
    }

    fn ensure_capacity(&mut self, descriptor: u32) {
        let (word_idx, _) = Self::locate(descriptor);
        while self.occupancy.len() <= word_idx {
            self.occupancy.push(0);
            self.slots
                .resize_with(self.slots.len() + WORD_BITS as usize, || None);
        }
    }
}
