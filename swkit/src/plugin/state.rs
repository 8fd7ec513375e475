use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

/// Private storage of one plugin for one handled request.
///
/// Values are keyed by type. Every callback of the same plugin invoked while
/// handling the same request sees the same state; other plugins and other
/// requests never do.
#[derive(Clone, Default)]
pub struct PluginState {
    values: Arc<DashMap<TypeId, Box<dyn Any + Send + Sync>>>,
}

impl PluginState {
    /// Creates an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value`, replacing any previous value of the same type.
    pub fn insert<T>(&self, value: T)
    where
        T: Any + Send + Sync,
    {
        self.values.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// A copy of the stored value of type `T`.
    pub fn get<T>(&self) -> Option<T>
    where
        T: Any + Clone + Send + Sync,
    {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>().cloned())
    }

    /// Removes and returns the stored value of type `T`.
    pub fn remove<T>(&self) -> Option<T>
    where
        T: Any + Send + Sync,
    {
        let (_, value) = self.values.remove(&TypeId::of::<T>())?;
        value.downcast::<T>().ok().map(|value| *value)
    }

    /// `true` when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for PluginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginState")
            .field("len", &self.values.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Started(u32);

    #[test]
    fn values_are_keyed_by_type() {
        let state = PluginState::new();
        assert!(state.is_empty());
        state.insert(Started(1));
        state.insert(String::from("note"));
        assert_eq!(state.get::<Started>(), Some(Started(1)));
        assert_eq!(state.remove::<String>().as_deref(), Some("note"));
        assert_eq!(state.get::<String>(), None);
    }

    #[test]
    fn clones_share_values() {
        let state = PluginState::new();
        let clone = state.clone();
        clone.insert(Started(7));
        assert_eq!(state.get::<Started>(), Some(Started(7)));
    }
}
