//! Fixed-capacity table with stable indices.
//!
//! An index handed out by [`SlotTable::insert`] keeps addressing the same entry
//! until that entry is removed; only then may it be reused. Lookups outside the
//! table or on a freed slot return `None`.

#[derive(Debug, Clone)]
pub struct SlotTable<T> {
    slots: Vec<Option<T>>,
    capacity: usize,
}

impl<T> SlotTable<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stores `value` in the lowest free slot. Gives the value back when full.
    pub fn insert(&mut self, value: T) -> Result<usize, T> {
        if let Some(i) = self.slots.iter().position(Option::is_none) {
            self.slots[i] = Some(value);
            return Ok(i);
        }
        if self.slots.len() >= self.capacity {
            return Err(value);
        }
        self.slots.push(Some(value));
        Ok(self.slots.len() - 1)
    }

    /// Appends after the highest used slot, never filling holes.
    pub fn push(&mut self, value: T) -> Result<usize, T> {
        if self.slots.len() >= self.capacity {
            return Err(value);
        }
        self.slots.push(Some(value));
        Ok(self.slots.len() - 1)
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    pub fn remove(&mut self, index: usize) -> Option<T> {
        let taken = self.slots.get_mut(index).and_then(Option::take);
        while matches!(self.slots.last(), Some(None)) {
            self.slots.pop();
        }
        taken
    }

    pub fn contains(&self, index: usize) -> bool {
        self.get(index).is_some()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (usize, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|v| (i, v)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, s)| s.as_mut().map(|v| (i, v)))
    }

    /// Indices of occupied slots, in ascending order.
    pub fn indices(&self) -> Vec<usize> {
        self.iter().map(|(i, _)| i).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_stay_stable() {
        let mut t = SlotTable::with_capacity(3);
        assert_eq!(t.insert("a"), Ok(0));
        assert_eq!(t.insert("b"), Ok(1));
        assert_eq!(t.insert("c"), Ok(2));
        assert_eq!(t.insert("d"), Err("d"));

        assert_eq!(t.remove(1), Some("b"));
        assert_eq!(t.get(2), Some(&"c"));
        assert_eq!(t.get(1), None);
        assert_eq!(t.insert("e"), Ok(1));
    }

    #[test]
    fn out_of_range_is_none() {
        let mut t: SlotTable<u8> = SlotTable::with_capacity(2);
        assert_eq!(t.get(500), None);
        assert_eq!(t.remove(500), None);
        assert!(t.is_empty());
    }

    #[test]
    fn push_does_not_fill_holes() {
        let mut t = SlotTable::with_capacity(4);
        t.push(1).unwrap();
        t.push(2).unwrap();
        t.push(3).unwrap();
        t.remove(1);
        assert_eq!(t.push(4), Ok(3));
        assert_eq!(t.indices(), vec![0, 2, 3]);
    }

    #[test]
    fn iterates_backwards_over_occupied_slots() {
        let mut t = SlotTable::with_capacity(4);
        t.push("x").unwrap();
        t.push("y").unwrap();
        t.push("z").unwrap();
        t.remove(1);
        let back: Vec<(usize, &&str)> = t.iter().rev().collect();
        assert_eq!(back, vec![(2, &"z"), (0, &"x")]);
    }
}
