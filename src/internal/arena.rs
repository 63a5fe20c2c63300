use std::{
    fmt::{Debug, Formatter},
    marker::PhantomData,
    ops::{Index, IndexMut},
};

/// An `Arena<TId, TValue>` holds a collection of `TValue`s and hands out `TId`s
/// that refer to them. Values are never removed, so an id stays valid for as
/// long as the arena itself is alive, even when the backing storage grows.
#[derive(Clone)]
pub(crate) struct Arena<TId: ArenaId, TValue> {
    data: Vec<TValue>,
    phantom: PhantomData<TId>,
}

impl<TId: ArenaId, TValue> Default for Arena<TId, TValue> {
    fn default() -> Self {
        Self::new()
    }
}

impl<TId: ArenaId, TValue> Arena<TId, TValue> {
    /// Constructs a new, empty arena.
    pub(crate) fn new() -> Self {
        Self {
            data: Vec::new(),
            phantom: PhantomData,
        }
    }

    /// Stores `value` in the arena and returns the id it can be retrieved with.
    pub(crate) fn alloc(&mut self, value: TValue) -> TId {
        let id = TId::from_usize(self.data.len());
        self.data.push(value);
        id
    }

    /// Returns the number of values in the arena.
    pub(crate) fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns the value with the given id, or `None` if the id was not
    /// allocated by this arena.
    pub(crate) fn get(&self, id: TId) -> Option<&TValue> {
        self.data.get(id.to_usize())
    }

    /// Iterates over all the values in allocation order together with their
    /// ids.
    pub(crate) fn iter(&self) -> impl DoubleEndedIterator<Item = (TId, &TValue)> + '_ {
        self.data
            .iter()
            .enumerate()
            .map(|(index, value)| (TId::from_usize(index), value))
    }
}

impl<TId: ArenaId, TValue> Index<TId> for Arena<TId, TValue> {
    type Output = TValue;

    fn index(&self, index: TId) -> &Self::Output {
        &self.data[index.to_usize()]
    }
}

impl<TId: ArenaId, TValue> IndexMut<TId> for Arena<TId, TValue> {
    fn index_mut(&mut self, index: TId) -> &mut Self::Output {
        &mut self.data[index.to_usize()]
    }
}

impl<TId: ArenaId, TValue: Debug> Debug for Arena<TId, TValue> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.data.iter()).finish()
    }
}

/// A trait indicating that the type can be transformed to `usize` and back
pub(crate) trait ArenaId {
    fn from_usize(x: usize) -> Self;
    fn to_usize(self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    struct Id(usize);

    impl ArenaId for Id {
        fn from_usize(x: usize) -> Self {
            Id(x)
        }

        fn to_usize(self) -> usize {
            self.0
        }
    }

    #[test]
    fn test_ids_survive_growth() {
        let mut arena = Arena::<Id, String>::new();
        let first = arena.alloc("first".to_owned());
        for i in 0..1000 {
            arena.alloc(i.to_string());
        }

        assert_eq!(first, Id(0));
        assert_eq!(arena[first], "first");
        assert_eq!(arena.len(), 1001);
        assert!(arena.get(Id(1001)).is_none());
    }
}
