//! `serde::Serialize` for the lazy constructs (feature `serde`).
//!
//! Only serialization is offered. Deserializing into a singleton would mint a
//! second instance alongside the one a recipe builds.

use serde::{Serialize, Serializer};

use super::{LazySingleton, OnceSlot, TryLazySingleton};

impl<T: Serialize> Serialize for OnceSlot<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.get().serialize(serializer)
    }
}

/// Serializes the instance, building it first if needed.
impl<T: Serialize, F: Fn() -> T> Serialize for LazySingleton<T, F> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.get().serialize(serializer)
    }
}

/// Serializes the instance, building it first if needed. A failed recipe is
/// reported through `S::Error::custom`.
impl<T, E, F> Serialize for TryLazySingleton<T, E, F>
where
    T: Serialize,
    E: std::fmt::Display,
    F: Fn() -> Result<T, E>,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.get() {
            Ok(value) => value.serialize(serializer),
            Err(err) => Err(serde::ser::Error::custom(format_args!(
                "singleton construction failed: {err}"
            ))),
        }
    }
}
