//! Rust types that know their type hint

use std::collections::BTreeMap;

use crate::catalog::CatalogEntry;
use crate::types::TypeHint;

/// A Rust type with a matching [`TypeHint`].
pub trait Typed {
    fn type_hint() -> TypeHint;

    /// Catalog entries this type needs, pushed once each.
    fn collect_entries(_entries: &mut Vec<CatalogEntry>) {}
}

/// A model or enum that can be registered in a
/// [`ModelCatalog`](crate::catalog::ModelCatalog).
///
/// Usually derived with `#[derive(Model)]`.
pub trait Describe: Typed {
    fn describe() -> CatalogEntry;
}

/// Push the entry of `T` unless an entry of that name is already there;
/// returns whether it was pushed. Derived `collect_entries` impls recurse
/// into field types only when this returns true, so recursive models
/// terminate.
pub fn push_entry<T: Describe>(entries: &mut Vec<CatalogEntry>) -> bool {
    let entry = T::describe();
    if entries.iter().any(|e| e.name() == entry.name()) {
        return false;
    }
    entries.push(entry);
    true
}

macro_rules! scalar {
    ($($ty:ty => $hint:expr),* $(,)?) => {$(
        impl Typed for $ty {
            fn type_hint() -> TypeHint {
                $hint
            }
        }
    )*};
}

scalar! {
    () => TypeHint::none(),
    bool => TypeHint::bool(),
    i8 => TypeHint::int(),
    i16 => TypeHint::int(),
    i32 => TypeHint::int(),
    i64 => TypeHint::int(),
    u8 => TypeHint::int(),
    u16 => TypeHint::int(),
    u32 => TypeHint::int(),
    u64 => TypeHint::int(),
    usize => TypeHint::int(),
    f32 => TypeHint::float(),
    f64 => TypeHint::float(),
    String => TypeHint::str(),
    bindery_value::Value => TypeHint::Any,
}

impl<T: Typed> Typed for Vec<T> {
    fn type_hint() -> TypeHint {
        TypeHint::list(T::type_hint())
    }

    fn collect_entries(entries: &mut Vec<CatalogEntry>) {
        T::collect_entries(entries)
    }
}

impl<T: Typed> Typed for Option<T> {
    fn type_hint() -> TypeHint {
        TypeHint::optional(T::type_hint())
    }

    fn collect_entries(entries: &mut Vec<CatalogEntry>) {
        T::collect_entries(entries)
    }
}

impl<T: Typed> Typed for Box<T> {
    fn type_hint() -> TypeHint {
        T::type_hint()
    }

    fn collect_entries(entries: &mut Vec<CatalogEntry>) {
        T::collect_entries(entries)
    }
}

impl<V: Typed> Typed for BTreeMap<String, V> {
    fn type_hint() -> TypeHint {
        TypeHint::dict(TypeHint::str(), V::type_hint())
    }

    fn collect_entries(entries: &mut Vec<CatalogEntry>) {
        V::collect_entries(entries)
    }
}

impl<A: Typed, B: Typed> Typed for (A, B) {
    fn type_hint() -> TypeHint {
        TypeHint::tuple(vec![A::type_hint(), B::type_hint()])
    }

    fn collect_entries(entries: &mut Vec<CatalogEntry>) {
        A::collect_entries(entries);
        B::collect_entries(entries);
    }
}

impl<A: Typed, B: Typed, C: Typed> Typed for (A, B, C) {
    fn type_hint() -> TypeHint {
        TypeHint::tuple(vec![A::type_hint(), B::type_hint(), C::type_hint()])
    }

    fn collect_entries(entries: &mut Vec<CatalogEntry>) {
        A::collect_entries(entries);
        B::collect_entries(entries);
        C::collect_entries(entries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_hints() {
        assert_eq!(Vec::<i64>::type_hint(), TypeHint::list(TypeHint::int()));
        assert_eq!(Option::<String>::type_hint(), TypeHint::optional(TypeHint::str()));
        assert_eq!(
            <(bool, f64)>::type_hint(),
            TypeHint::tuple(vec![TypeHint::bool(), TypeHint::float()])
        );
    }
}
