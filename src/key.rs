use std::any::TypeId;
use std::rc::Rc;
use std::sync::Arc;

/// A shallow identity token for a single value.
///
/// Keys are what the caches actually store and compare: an argument tuple or
/// a dependants vector is reduced to a sequence of keys once per call and
/// never inspected again. A key captures *identity*, not content: it is not
/// a hash, and two allocations with equal contents produce different keys.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// The address of an allocation: a shared handle's heap cell or a plain
    /// reference's referent.
    Ref(*const ()),
    /// A primitive value folded to its bits. The `TypeId` keeps values of
    /// different types distinct even when their bit patterns coincide.
    Value(TypeId, u64),
}

/// Types that reduce to a shallow identity token.
///
/// Implemented for primitives (by value bits), for plain references (by
/// referent address) and for [`Rc`]/[`Arc`] handles (by allocation address).
///
/// An address is only a valid identity while the referent is alive: callers
/// comparing keys across calls must keep the keyed values alive in between,
/// which holds naturally when arguments come out of a persistent state tree.
pub trait ShallowKey {
    /// This value's identity token.
    fn key(&self) -> Key;
}

macro_rules! value_key {
    ($($ty:ty),*) => {
        $(impl ShallowKey for $ty {
            fn key(&self) -> Key {
                Key::Value(TypeId::of::<$ty>(), *self as u64)
            }
        })*
    };
}

value_key! { u8, u16, u32, u64, usize, i8, i16, i32, i64, isize, char }

impl ShallowKey for bool {
    fn key(&self) -> Key {
        Key::Value(TypeId::of::<bool>(), *self as u64)
    }
}

// Floats key by bit pattern. Unlike IEEE comparison this makes NaN identical
// to itself, which is the useful behavior for a cache key.
impl ShallowKey for f32 {
    fn key(&self) -> Key {
        Key::Value(TypeId::of::<f32>(), self.to_bits() as u64)
    }
}

impl ShallowKey for f64 {
    fn key(&self) -> Key {
        Key::Value(TypeId::of::<f64>(), self.to_bits())
    }
}

impl ShallowKey for () {
    fn key(&self) -> Key {
        Key::Value(TypeId::of::<()>(), 0)
    }
}

impl<T> ShallowKey for &T {
    fn key(&self) -> Key {
        Key::Ref(*self as *const T as *const ())
    }
}

impl<T> ShallowKey for Rc<T> {
    fn key(&self) -> Key {
        Key::Ref(Rc::as_ptr(self) as *const ())
    }
}

impl<T> ShallowKey for Arc<T> {
    fn key(&self) -> Key {
        Key::Ref(Arc::as_ptr(self) as *const ())
    }
}

/// Compares two key sequences shallowly.
///
/// True iff the sequences have the same length and every position holds the
/// same token. Total and side-effect free; two empty sequences are equal and
/// sequences of different lengths never are.
pub fn shallow_eq(a: &[Key], b: &[Key]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y)
}

/// An extra-argument tuple that can serve as a cache key.
///
/// Implemented for tuples of [`ShallowKey`] elements up to length twelve.
/// The leading source argument of a selector call is never part of the
/// tuple, so a retained cache entry cannot keep the source alive.
pub trait ArgKeys {
    /// The identity tokens of the tuple's elements, in order.
    fn keys(&self) -> Vec<Key>;
}

macro_rules! arg_keys {
    ($($param:tt $idx:tt),*) => {
        impl<$($param: ShallowKey),*> ArgKeys for ($($param,)*) {
            fn keys(&self) -> Vec<Key> {
                vec![$(self.$idx.key()),*]
            }
        }
    };
}

arg_keys! {}
arg_keys! { A 0 }
arg_keys! { A 0, B 1 }
arg_keys! { A 0, B 1, C 2 }
arg_keys! { A 0, B 1, C 2, D 3 }
arg_keys! { A 0, B 1, C 2, D 3, E 4 }
arg_keys! { A 0, B 1, C 2, D 3, E 4, F 5 }
arg_keys! { A 0, B 1, C 2, D 3, E 4, F 5, G 6 }
arg_keys! { A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7 }
arg_keys! { A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8 }
arg_keys! { A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8, J 9 }
arg_keys! { A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8, J 9, K 10 }
arg_keys! { A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8, J 9, K 10, L 11 }
