//! Slot-indexed cache.
use serde::{Deserialize, Serialize};
use std::{cell::RefCell, rc::Rc, sync::Arc};

/// Clones a value such that the copy shares no mutable state with the original.
///
/// For plain data types this is the same as [`Clone::clone`], which is what the default
/// implementation does. Types holding shared handles must override it.
pub trait DeepClone: Clone {
    /// Returns an independent copy of `self`.
    fn deep_clone(&self) -> Self {
        self.clone()
    }
}

macro_rules! impl_deep_clone {
    ($($t:ty),*) => {
        $(impl DeepClone for $t {})*
    };
}

impl_deep_clone!((), bool, u8, i32, i64, u32, u64, usize, f32, f64, String);

impl<T: Clone> DeepClone for Vec<T> {}

impl<T: Clone> DeepClone for Rc<RefCell<T>> {
    fn deep_clone(&self) -> Self {
        Rc::new(RefCell::new(self.borrow().clone()))
    }
}

impl<T: Clone> DeepClone for Arc<T> {
    fn deep_clone(&self) -> Self {
        Arc::new((**self).clone())
    }
}

/// How [`CachePool::update`] stores values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum CloneStrategy {
    /// Stores a [`Clone::clone`] of the value; shared handles stay shared.
    Shallow,

    /// Stores a [`DeepClone::deep_clone`] of the value. Required when the environment
    /// manager mutates observations in place after handing them out.
    Deep,
}

/// Fixed-capacity cache holding the latest value of each environment slot.
pub struct CachePool<T> {
    name: String,
    values: Vec<Option<T>>,
    strategy: CloneStrategy,
}

impl<T: DeepClone> CachePool<T> {
    /// Creates a pool with `size` empty slots.
    pub fn new(name: impl Into<String>, size: usize, strategy: CloneStrategy) -> Self {
        Self {
            name: name.into(),
            values: (0..size).map(|_| None).collect(),
            strategy,
        }
    }

    /// Overwrites the entries of the slots in `values`; other slots are untouched.
    ///
    /// Panics if a slot id is out of range.
    pub fn update<'a>(&mut self, values: impl IntoIterator<Item = (&'a usize, &'a T)>)
    where
        T: 'a,
    {
        for (&env_id, v) in values {
            self.values[env_id] = Some(match self.strategy {
                CloneStrategy::Shallow => v.clone(),
                CloneStrategy::Deep => v.deep_clone(),
            });
        }
    }

    /// Returns the cached value of a slot, `None` if there is no entry.
    ///
    /// Panics if `env_id` is out of range.
    pub fn get(&self, env_id: usize) -> Option<&T> {
        self.values[env_id].as_ref()
    }

    /// Clears the entry of a slot.
    pub fn reset(&mut self, env_id: usize) {
        self.values[env_id] = None;
    }

    /// Clears all entries.
    pub fn reset_all(&mut self) {
        self.values.iter_mut().for_each(|v| *v = None);
    }

    /// Name of the pool, used in error messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The number of slots.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Clone strategy of the pool.
    pub fn strategy(&self) -> CloneStrategy {
        self.strategy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_update_and_reset() {
        let mut pool = CachePool::new("obs", 3, CloneStrategy::Shallow);
        pool.update(&BTreeMap::from([(0, 1.0f32), (2, 3.0)]));
        assert_eq!(pool.get(0), Some(&1.0));
        assert_eq!(pool.get(1), None);
        assert_eq!(pool.get(2), Some(&3.0));

        pool.update(&BTreeMap::from([(2, 4.0f32)]));
        assert_eq!(pool.get(0), Some(&1.0));
        assert_eq!(pool.get(2), Some(&4.0));

        pool.reset(0);
        assert_eq!(pool.get(0), None);
        assert_eq!(pool.get(2), Some(&4.0));

        pool.reset_all();
        assert!((0..pool.len()).all(|i| pool.get(i).is_none()));
    }

    #[test]
    fn test_deep_clone() {
        let obs = Rc::new(RefCell::new(vec![0.0f32; 2]));
        let values = BTreeMap::from([(1, obs.clone())]);

        let mut deep = CachePool::new("obs", 2, CloneStrategy::Deep);
        let mut shallow = CachePool::new("obs", 2, CloneStrategy::Shallow);
        deep.update(&values);
        shallow.update(&values);

        // The environment manager mutates the observation in place
        obs.borrow_mut()[0] = 1.0;

        assert_eq!(*deep.get(1).unwrap().borrow(), vec![0.0, 0.0]);
        assert_eq!(*shallow.get(1).unwrap().borrow(), vec![1.0, 0.0]);
    }

    #[test]
    #[should_panic]
    fn test_out_of_range() {
        let pool: CachePool<f32> = CachePool::new("obs", 2, CloneStrategy::Shallow);
        let _ = pool.get(2);
    }
}
