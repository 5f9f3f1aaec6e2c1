//! Compile-time capability predicates (spec §4.2).
//!
//! A C++ template metaprogram answers "does this archive support X" with a
//! `constexpr bool` computed by SFINAE. Stable Rust has no direct
//! equivalent, so each predicate here is a trait with an associated
//! constant that defaults to `false` — a backend opts in by providing its
//! own `impl ... { const SUPPORTED: bool = true; }`. This degrades cleanly
//! (spec §4.2: "All traits must degrade to `false` cleanly; no trait may
//! cause compilation errors for types that simply lack a feature") because
//! every predicate here *has* a default impl; nothing needs to be written
//! for a backend that doesn't support a capability.

use crate::scope::Backend;

/// Whether `B` can read/write a key of type `K` directly (i.e. `K` is one of
/// `B`'s `supported_key_types`). Used by the map adapter's key-adaptation
/// priority rule (spec §4.5, rule 1).
pub trait SupportsKey<K>: Backend {
    /// `true` iff keys of type `K` round-trip through this backend without
    /// conversion.
    const SUPPORTED: bool = false;
}

/// Whether `B` can serialize a [`crate::bin_timestamp::BinTimestamp`]
/// directly as a map key (spec §4.5, rule 2 — a MessagePack convenience).
pub trait SupportsBinTimestampKey: Backend {
    /// `true` for binary backends whose native timestamp type can serve as
    /// a map key.
    const SUPPORTED: bool = false;
}

/// Whether `B`'s object scopes expose [`crate::scope::ObjectSaveScope::open_binary_scope`]
/// / [`crate::scope::ObjectLoadScope::open_binary_scope`] for real (rather
/// than the default `Ok(None)`).
pub trait SupportsBinary: Backend {
    /// `true` for backends with a native binary-blob concept (MessagePack).
    const SUPPORTED: bool = false;
}

/// Whether `B`'s object scopes expose a real attribute sub-scope.
pub trait SupportsAttribute: Backend {
    /// `true` for backends with an attribute concept (XML).
    const SUPPORTED: bool = false;
}

/// Whether `B` can open an array scope directly at the document root
/// without first opening an object (most tree-shaped backends can; a
/// strictly row-oriented backend like CSV cannot meaningfully support a
/// *nested* array-of-arrays, though it still supports one top-level array
/// of records).
pub trait SupportsRootArray: Backend {
    /// `true` unless the backend's outermost shape is fixed (e.g. "always a
    /// table of records").
    const SUPPORTED: bool = true;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_backend::TestBackend;

    #[test]
    fn predicates_default_to_false_for_unconfigured_capabilities() {
        assert!(!<TestBackend as SupportsBinTimestampKey>::SUPPORTED);
        assert!(!<TestBackend as SupportsAttribute>::SUPPORTED);
        assert!(!<TestBackend as SupportsBinary>::SUPPORTED);
    }

    #[test]
    fn root_array_defaults_to_supported() {
        assert!(<TestBackend as SupportsRootArray>::SUPPORTED);
    }
}
