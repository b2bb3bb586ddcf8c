//! Opaque identifiers for objects owned by the mapping library.
//!
//! The facade never looks inside a handle; it only keeps it around so that it
//! can hand it back to the library later (detach a marker, close a window...).

use serde::{Deserialize, Serialize};

/// Generates a copyable newtype handle around a library-assigned `u64`.
///
/// Usage:
/// ```ignore
/// define_handle!(MarkerHandle, "A marker placed on a map");
/// ```
macro_rules! define_handle {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl $name {
            pub fn id(&self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

define_handle!(ContainerHandle, "A host element resolved from a selector");
define_handle!(MapHandle, "A map bound to a container");
define_handle!(MarkerHandle, "A marker placed on a map");
define_handle!(InfoWindowHandle, "An info window that can be anchored on a marker");
define_handle!(DirectionsHandle, "A directions service paired with its renderer");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_display() {
        assert_eq!(MarkerHandle(7).to_string(), "MarkerHandle#7");
        assert_eq!(MapHandle(1).id(), 1);
    }
}
