use std::any::Any;
use std::fmt::{self, Debug, Formatter};
use std::rc::{self, Rc};
use std::sync::{self, Arc};

use crate::key::{Key, ShallowKey};

/// One entry of a dependants vector.
///
/// A dependant is a reference derived from the source whose identity gates
/// whether cached results are still valid: when the dependants of a call
/// differ shallowly from the previous call's, the affected cache partition
/// is cleared before lookup.
///
/// A dependant built from a shared handle ([`Dependant::shared`],
/// [`Dependant::shared_sync`]) is additionally *watchable*: it carries a
/// weak handle that lets the partition store notice when the dependant has
/// been dropped and release that partition. A dependant never keeps its
/// referent alive.
#[derive(Clone)]
pub struct Dependant {
    key: Key,
    watch: Option<Watch>,
}

impl Dependant {
    /// A watchable dependant keyed by the identity of an [`Rc`] allocation.
    pub fn shared<T: Any>(handle: &Rc<T>) -> Self {
        let key = handle.key();
        let erased: Rc<dyn Any> = Rc::<T>::clone(handle);
        Self { key, watch: Some(Watch::Rc(Rc::downgrade(&erased))) }
    }

    /// A watchable dependant keyed by the identity of an [`Arc`] allocation.
    pub fn shared_sync<T: Any + Send + Sync>(handle: &Arc<T>) -> Self {
        let key = handle.key();
        let erased: Arc<dyn Any + Send + Sync> = Arc::<T>::clone(handle);
        Self { key, watch: Some(Watch::Arc(Arc::downgrade(&erased))) }
    }

    /// A plain dependant keyed by shallow identity.
    ///
    /// Not watchable: within the partition store, resolution stops at the
    /// first such dependant and everything past it shares one cache. Prefer
    /// [`Dependant::shared`] where the dependant is a shared allocation.
    pub fn value<T: ShallowKey>(value: &T) -> Self {
        Self { key: value.key(), watch: None }
    }

    /// This dependant's identity token.
    pub(crate) fn key(&self) -> Key {
        self.key
    }

    /// The liveness handle, if this dependant is watchable.
    pub(crate) fn watch(&self) -> Option<&Watch> {
        self.watch.as_ref()
    }
}

impl Debug for Dependant {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_tuple("Dependant").field(&self.key).finish()
    }
}

/// A non-owning liveness handle for a shared dependant.
#[derive(Clone)]
pub(crate) enum Watch {
    Rc(rc::Weak<dyn Any>),
    Arc(sync::Weak<dyn Any + Send + Sync>),
}

impl Watch {
    /// Whether the watched allocation still has strong owners.
    pub(crate) fn alive(&self) -> bool {
        match self {
            Self::Rc(weak) => weak.strong_count() > 0,
            Self::Arc(weak) => weak.strong_count() > 0,
        }
    }
}

/// A type usable as a whole-source dependant.
///
/// [`Selector::new`](crate::Selector::new) caches on the entire source when
/// no dependants callback is supplied; this trait defines what "the entire
/// source" means as a dependant. Shared handles implement it out of the box.
pub trait AsDependant {
    /// This value, as a single dependant.
    fn as_dependant(&self) -> Dependant;
}

impl<T: Any> AsDependant for Rc<T> {
    fn as_dependant(&self) -> Dependant {
        Dependant::shared(self)
    }
}

impl<T: Any + Send + Sync> AsDependant for Arc<T> {
    fn as_dependant(&self) -> Dependant {
        Dependant::shared_sync(self)
    }
}

/// The result of a dependants callback, normalized to a vector.
///
/// A callback may return one dependant or a sequence of them; a single
/// dependant is wrapped as a one-element vector.
pub trait IntoDependants {
    /// Normalizes into an ordered dependants vector.
    fn into_dependants(self) -> Vec<Dependant>;
}

impl IntoDependants for Dependant {
    fn into_dependants(self) -> Vec<Dependant> {
        vec![self]
    }
}

impl IntoDependants for Vec<Dependant> {
    fn into_dependants(self) -> Vec<Dependant> {
        self
    }
}

impl<const N: usize> IntoDependants for [Dependant; N] {
    fn into_dependants(self) -> Vec<Dependant> {
        self.into()
    }
}
