//! # IDs
//! Widgets are moved out of the tree and back again by undo/redo. To tell "the same widget, put back"
//! apart from "a look-alike that was re-created", each one carries a `PlotID<T>`, unique for this
//! execution of the program and namespaced by the type T.
//!
//! To get a fresh ID, use `PlotID`'s `Default` impl.

use std::any::TypeId;
use std::collections::BTreeMap;

// Next free ID, by namespace. Only locked for the duration of a single increment.
static ID_SERVER: parking_lot::Mutex<BTreeMap<TypeId, u64>> =
    parking_lot::const_mutex(BTreeMap::new());

/// ID that is guaranteed unique within this execution of the program.
/// IDs with different types may share a value but should not be considered equal.
pub struct PlotID<T: 'static> {
    id: std::num::NonZeroU64,
    // fn() -> T, so the ID is Send + Sync regardless of T.
    _phantom: std::marker::PhantomData<fn() -> T>,
}
impl<T: 'static> Clone for PlotID<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T: 'static> Copy for PlotID<T> {}
impl<T: 'static> PartialEq for PlotID<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl<T: 'static> Eq for PlotID<T> {}
impl<T: 'static> std::hash::Hash for PlotID<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T: 'static> PlotID<T> {
    /// Get the raw numeric value of this ID.
    /// IDs from differing namespaces may share the same numeric ID!
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id.get()
    }
}
impl<T: 'static> Default for PlotID<T> {
    fn default() -> Self {
        let id = {
            let mut server = ID_SERVER.lock();
            let next = server.entry(TypeId::of::<T>()).or_insert(1);
            let id = *next;
            // A u64 will not be exhausted by widgets in any one session.
            *next = next.saturating_add(1);
            id
        };
        Self {
            // Counters start at one and never wrap.
            id: std::num::NonZeroU64::MIN.saturating_add(id - 1),
            _phantom: std::marker::PhantomData,
        }
    }
}
impl<T: 'static> std::fmt::Display for PlotID<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The rsplit always yields at least one element.
        let ty = std::any::type_name::<T>()
            .rsplit("::")
            .next()
            .unwrap_or_default();
        write!(f, "{ty}#{}", self.id)
    }
}
impl<T: 'static> std::fmt::Debug for PlotID<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Self as std::fmt::Display>::fmt(self, f)
    }
}

#[cfg(test)]
mod test {
    use super::PlotID;
    // Tests share the global ID server, so each uses its own namespace.

    #[test]
    fn ids_unique() {
        struct Namespace;
        type TestID = PlotID<Namespace>;

        let mut v: Vec<_> = (0..1024).map(|_| TestID::default()).collect();
        v.sort_unstable_by_key(PlotID::id);
        let length_before = v.len();
        v.dedup();
        assert_eq!(length_before, v.len(), "had duplicate ids");
    }
    #[test]
    fn first_id_is_one() {
        struct Namespace;
        // Not a stable guarantee! Dont use this!!
        assert_eq!(PlotID::<Namespace>::default().id(), 1);
    }
    #[test]
    fn display_names_namespace() {
        struct Namespace;
        let id = PlotID::<Namespace>::default();
        assert_eq!(id.to_string(), "Namespace#1");
    }
}
