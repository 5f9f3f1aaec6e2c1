//! The Scope Protocol (spec §4.1): the abstract contract every backend
//! implements.
//!
//! Spec Design Notes §9 calls for "a trait per scope role (RootSave,
//! RootLoad, ObjectSave, ObjectLoad, ArraySave, ArrayLoad, plus optional
//! Attribute/Binary)" with the backend type a compile-time parameter rather
//! than a trait object — the same choice `rkyv` makes for its `Serializer`
//! trait family. A [`Backend`] is the traits block from spec §3 (`Archive`):
//! it names the eight concrete scope types plus the constants
//! (`key_type`, `path_separator`, `is_binary`, `archive_type`) that are
//! constant for the process lifetime of one backend.
//!
//! Every scope operation that can read/write a value is generic over
//! [`Scalar`] for primitives and takes `&str`/`&mut String` for the string
//! family (spec §4.3 items 1-2); aggregates, enums, and containers go
//! through [`crate::dispatch`] instead of calling scope methods directly.

use std::cell::RefCell;
use std::rc::Rc;

use crate::context::SerializationContext;
use crate::convert::Number;
use crate::error::Error;
use crate::options::SerializationOptions;

/// The shared, per-operation error accumulator, as held by every scope.
///
/// Scopes form a strict stack (spec §3), so `Rc<RefCell<_>>` rather than a
/// borrowed reference: a child scope needs to reach the same context as its
/// parent without the parent's lifetime pinning the child, which is what
/// lets a backend build its tree with owned nodes instead of a web of
/// borrows. Spec §5 rules out concurrency within one archive instance, so
/// the single-threaded `Rc`/`RefCell` pair (rather than `Arc`/`Mutex`) is the
/// right-sized tool.
pub type SharedContext = Rc<RefCell<SerializationContext>>;

/// Widening/narrowing between a concrete primitive and the neutral
/// [`Number`] shape (spec §4.4). Implemented per-type in
/// [`crate::convert::numeric`]; [`Scalar`] just requires it of every member
/// of the sealed family.
pub trait ScalarNumberConv: Sized {
    /// Widens `self` to the category-preserving [`Number`] representation.
    fn to_number(self) -> Number;

    /// Narrows `number` to `Self`, returning `None` if it doesn't fit —
    /// the caller applies [`crate::options::Policy::overflow_number_policy`]
    /// (or `mismatched_types_policy`, for a `None` arising from a
    /// non-numeric archive value) to decide what `None` means.
    fn try_from_number(number: Number) -> Option<Self>;
}

/// Sealed marker for the primitive (integer/float/bool) family that scopes
/// read and write directly, without going through [`crate::dispatch`].
pub trait Scalar: Copy + PartialEq + ScalarNumberConv + private::Sealed + 'static {}

macro_rules! impl_scalar {
    ($($t:ty),* $(,)?) => {
        $(
            impl private::Sealed for $t {}
            impl Scalar for $t {}
        )*
    };
}

impl_scalar!(bool, i8, i16, i32, i64, i128, u8, u16, u32, u64, u128, f32, f64);

mod private {
    pub trait Sealed {}
}

/// Which direction a root operation is running, and (for backends that track
/// it) whether a field was physically present when `serialize_value`
/// returned `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Writing a value model out to the wire format.
    Save,
    /// Reading a value model in from the wire format.
    Load,
}

/// Operations common to every scope, regardless of role or direction.
pub trait ScopeCommon {
    /// RFC-6901-style pointer from the document root to this scope
    /// (spec §4.1). The root scope's path is the empty string.
    fn path(&self) -> String;

    /// The shared per-operation context (error accumulator).
    fn context(&self) -> SharedContext;

    /// The options in effect for this operation. `SerializationOptions` is
    /// `Copy`, so scopes hand back a snapshot rather than a reference.
    fn options(&self) -> SerializationOptions;

    /// `Save` or `Load`; the same concrete scope type is never both (spec
    /// §3 Scope invariants).
    fn mode(&self) -> Mode;
}

/// The traits block from spec §3 (`Archive`): names every concrete scope
/// type a backend provides and the handful of process-wide constants
/// (`key_type`, `path_separator`, `is_binary`, `archive_type`) that describe
/// it. A given `Backend` implementation is constant for the process
/// lifetime (spec §3: "A given traits value is constant for the lifetime of
/// the process").
pub trait Backend: Sized + 'static {
    /// Human-readable tag for the archive format (e.g. `"json"`).
    const ARCHIVE_TYPE: &'static str;
    /// The character that separates path segments in [`ScopeCommon::path`].
    const PATH_SEPARATOR: char;
    /// True for backends whose wire format is a byte stream rather than
    /// text (MessagePack); affects whether object field counts must be
    /// known up front (spec §4.3: "For binary archives, an Object scope
    /// open must be told the number of fields").
    const IS_BINARY: bool;

    /// The root scope type, writing.
    type RootSave: RootSaveScope<Self>;
    /// The root scope type, reading.
    type RootLoad: RootLoadScope<Self>;
    /// The object scope type, writing.
    type ObjectSave: ObjectSaveScope<Self>;
    /// The object scope type, reading.
    type ObjectLoad: ObjectLoadScope<Self>;
    /// The array scope type, writing.
    type ArraySave: ArraySaveScope<Self>;
    /// The array scope type, reading.
    type ArrayLoad: ArrayLoadScope<Self>;
    /// The binary scope type, writing. Backends with no binary-blob concept
    /// may use [`crate::scope::Unsupported`].
    type BinarySave: BinarySaveScope<Self>;
    /// The binary scope type, reading.
    type BinaryLoad: BinaryLoadScope<Self>;
}

/// A scope role a backend doesn't implement (e.g. CSV's binary scopes).
///
/// Associated types that name this can never actually be constructed —
/// `open_binary_scope` always returns `Ok(None)` for such a backend — but
/// the type still has to exist to fill the associated-type slot on
/// [`Backend`].
pub enum Unsupported {}

/// Root scope, writing (spec §4.1 "Root scope").
///
/// Exposes exactly one of the four top-level operations per spec: a
/// well-behaved backend user calls only one of `serialize_value`,
/// `serialize_string`, `open_object_scope`, `open_array_scope` on a given
/// root scope instance.
pub trait RootSaveScope<B: Backend>: ScopeCommon {
    /// Writes a single primitive as the entire document.
    fn serialize_value<T: Scalar>(&mut self, value: &T) -> Result<(), Error>;

    /// Writes a single string as the entire document.
    fn serialize_string(&mut self, value: &str) -> Result<(), Error>;

    /// Writes a null as the entire document (spec §4.5: "On Save of an
    /// empty/null value, a null is emitted"). Backends with no archive-level
    /// null marker accept the default, which falls back to an empty string.
    fn write_null(&mut self) -> Result<(), Error> {
        self.serialize_string("")
    }

    /// Opens an object scope as the entire document.
    fn open_object_scope(&mut self, n_fields_hint: usize) -> Result<B::ObjectSave, Error>;

    /// Opens an array scope as the entire document.
    fn open_array_scope(&mut self, arr_size: usize) -> Result<B::ArraySave, Error>;

    /// Renders the in-memory tree (or flushes the stream) to the bound
    /// sink. Idempotent; a scope that is dropped without an explicit call
    /// must still finalize itself (spec §4.1, §9 "Scope lifecycle on
    /// Save").
    fn finalize(&mut self) -> Result<(), Error>;
}

/// Root scope, reading.
pub trait RootLoadScope<B: Backend>: ScopeCommon {
    /// Reads the entire document as a single primitive.
    fn serialize_value<T: Scalar>(&mut self, value: &mut T) -> Result<bool, Error>;

    /// Reads the entire document as a single string.
    fn serialize_string(&mut self, value: &mut String) -> Result<bool, Error>;

    /// Opens the document as an object, or returns `None` if the document's
    /// top-level shape isn't an object (subject to
    /// [`crate::options::Policy`]).
    fn open_object_scope(&mut self, n_fields_hint: usize) -> Result<Option<B::ObjectLoad>, Error>;

    /// Opens the document as an array, or returns `None` for the analogous
    /// reason.
    fn open_array_scope(&mut self, arr_size: usize) -> Result<Option<B::ArrayLoad>, Error>;
}

/// Object scope, writing (spec §4.1 "Object scope").
pub trait ObjectSaveScope<B: Backend>: ScopeCommon {
    /// Writes a primitive under `key`.
    fn serialize_value<T: Scalar>(&mut self, key: &str, value: &T) -> Result<(), Error>;

    /// Writes a string under `key`.
    fn serialize_string(&mut self, key: &str, value: &str) -> Result<(), Error>;

    /// Writes a null under `key` (spec §4.5). Backends with no archive-level
    /// null marker accept the default, which falls back to an empty string.
    fn write_null(&mut self, key: &str) -> Result<(), Error> {
        self.serialize_string(key, "")
    }

    /// Opens a nested object scope under `key`, sized for `n_fields` (only
    /// meaningful for [`Backend::IS_BINARY`] backends).
    fn open_object_scope(&mut self, key: &str, n_fields: usize) -> Result<Option<B::ObjectSave>, Error>;

    /// Opens a nested array scope under `key`.
    fn open_array_scope(&mut self, key: &str, size: usize) -> Result<Option<B::ArraySave>, Error>;

    /// Opens a binary blob scope under `key`. Backends without a binary
    /// concept accept the default, which reports no support.
    fn open_binary_scope(&mut self, _key: &str, _size: usize) -> Result<Option<B::BinarySave>, Error> {
        Ok(None)
    }

    /// Opens the XML-style attribute sub-scope on the current object.
    /// Backends without an attribute concept accept the default.
    fn open_attribute_scope(&mut self) -> Result<Option<B::ObjectSave>, Error> {
        Ok(None)
    }
}

/// Object scope, reading.
pub trait ObjectLoadScope<B: Backend>: ScopeCommon {
    /// Reads a primitive from `key`. Returns `true` iff the key was present;
    /// when it returns `false` and no `Required` validator is attached, the
    /// caller must leave the field untouched (spec §4.1).
    fn serialize_value<T: Scalar>(&mut self, key: &str, value: &mut T) -> Result<bool, Error>;

    /// Reads a string from `key`.
    fn serialize_string(&mut self, key: &str, value: &mut String) -> Result<bool, Error>;

    /// Opens a nested object scope at `key`. Returns `None` if the key is
    /// missing or the wrong shape, per
    /// [`crate::options::SerializationOptions::mismatched_types_policy`].
    fn open_object_scope(&mut self, key: &str, n_fields: usize) -> Result<Option<B::ObjectLoad>, Error>;

    /// Opens a nested array scope at `key`.
    fn open_array_scope(&mut self, key: &str, size: usize) -> Result<Option<B::ArrayLoad>, Error>;

    /// Opens a binary blob scope at `key`.
    fn open_binary_scope(&mut self, _key: &str, _size: usize) -> Result<Option<B::BinaryLoad>, Error> {
        Ok(None)
    }

    /// Opens the XML-style attribute sub-scope on the current object.
    fn open_attribute_scope(&mut self) -> Result<Option<B::ObjectLoad>, Error> {
        Ok(None)
    }

    /// Enumerates archive keys at this level in archive order (used by map
    /// deserialization).
    fn visit_keys(&self, visit: &mut dyn FnMut(&str));

    /// Hint for reserving container capacity before reading.
    fn estimated_size(&self) -> usize {
        0
    }
}

/// Array scope, writing (spec §4.1 "Array scope").
pub trait ArraySaveScope<B: Backend>: ScopeCommon {
    /// Writes the next primitive element.
    fn serialize_value<T: Scalar>(&mut self, value: &T) -> Result<(), Error>;

    /// Writes the next string element.
    fn serialize_string(&mut self, value: &str) -> Result<(), Error>;

    /// Writes the next element as a null (spec §4.5). Backends with no
    /// archive-level null marker accept the default, which falls back to an
    /// empty string.
    fn write_null(&mut self) -> Result<(), Error> {
        self.serialize_string("")
    }

    /// Opens the next element as a nested object scope.
    fn open_object_scope(&mut self, n_fields: usize) -> Result<Option<B::ObjectSave>, Error>;

    /// Opens the next element as a nested array scope.
    fn open_array_scope(&mut self, size: usize) -> Result<Option<B::ArraySave>, Error>;
}

/// Array scope, reading.
pub trait ArrayLoadScope<B: Backend>: ScopeCommon {
    /// Reads the next primitive element.
    fn serialize_value<T: Scalar>(&mut self, value: &mut T) -> Result<(), Error>;

    /// Reads the next string element.
    fn serialize_string(&mut self, value: &mut String) -> Result<(), Error>;

    /// Opens the next element as a nested object scope.
    fn open_object_scope(&mut self, n_fields: usize) -> Result<Option<B::ObjectLoad>, Error>;

    /// Opens the next element as a nested array scope.
    fn open_array_scope(&mut self, size: usize) -> Result<Option<B::ArrayLoad>, Error>;

    /// True once every element has been consumed.
    fn is_end(&self) -> bool;

    /// The declared size of the array at open time.
    fn get_size(&self) -> usize;

    /// A hint for reserving container capacity; defaults to
    /// [`Self::get_size`].
    fn get_estimated_size(&self) -> usize {
        self.get_size()
    }
}

/// Binary blob scope, writing: byte-granular access to a fixed-size
/// payload, for backends whose wire format distinguishes binary blobs from
/// text (spec §4.1 "Binary scope").
pub trait BinarySaveScope<B: Backend>: ScopeCommon {
    /// Writes the entire payload in one call.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Error>;
}

/// Binary blob scope, reading.
pub trait BinaryLoadScope<B: Backend>: ScopeCommon {
    /// Reads the entire payload in one call.
    fn read_bytes(&mut self) -> Result<Vec<u8>, Error>;

    /// The declared length of the payload.
    fn len(&self) -> usize;

    /// True when the payload is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ScopeCommon for Unsupported {
    fn path(&self) -> String {
        match *self {}
    }

    fn context(&self) -> SharedContext {
        match *self {}
    }

    fn options(&self) -> SerializationOptions {
        match *self {}
    }

    fn mode(&self) -> Mode {
        match *self {}
    }
}

impl<B: Backend> BinarySaveScope<B> for Unsupported {
    fn write_bytes(&mut self, _bytes: &[u8]) -> Result<(), Error> {
        match *self {}
    }
}

impl<B: Backend> BinaryLoadScope<B> for Unsupported {
    fn read_bytes(&mut self) -> Result<Vec<u8>, Error> {
        match *self {}
    }

    fn len(&self) -> usize {
        match *self {}
    }
}
