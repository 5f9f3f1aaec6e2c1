//! BitSerializer: a format-agnostic serialization engine.
//!
//! An application describes its data model once, against the traits in
//! [`dispatch`], and that single description drives any backend crate that
//! implements [`scope::Backend`] (`bitserializer_json`, `bitserializer_csv`,
//! and so on) — the same "one model, many wire formats" shape the original
//! C++ library has, realized here with Rust's trait system standing in for
//! its template-based SFINAE dispatch.
//!
//! # Layout
//!
//! - [`scope`] — the Scope Protocol: `Backend` and its eight Save/Load
//!   scope traits, which a backend crate implements.
//! - [`dispatch`] — `BitSerialize`/`BitDeserialize`, implemented once per
//!   Rust type (primitives and `String` here, containers in
//!   [`containers`], aggregates via `#[derive(BitSerialize,
//!   BitDeserialize)]`).
//! - [`kv`] — [`kv::KeyValue`], the per-field binding derived code (or hand-
//!   written code) uses to wire a struct field into an object scope, with
//!   validators, refiners, and a fallback.
//! - [`validate`] / [`refine`] — the built-in validator and refiner rules.
//! - [`convert`] — numeric widening/narrowing, UTF transcoding, ISO-8601
//!   date/duration conversion, and the binary-archive timestamp shape.
//! - [`containers`] — `BitSerialize`/`BitDeserialize` for the standard
//!   containers.
//! - [`raw`] — [`raw::Raw`], an opaque byte blob passed through a backend's
//!   binary sub-scope unmodeled.
//! - [`options`] — [`options::SerializationOptions`] and the policies that
//!   govern `Load`'s behavior on a shape mismatch, overflow, or invalid
//!   byte sequence.
//! - [`context`] — [`context::SerializationContext`], the per-path
//!   validation-failure accumulator threaded through one `Load` call.
//! - [`error`] — the closed [`error::Error`] taxonomy shared by every
//!   backend.
//! - [`facade`] — the top-level `save_object`/`load_object` entry points a
//!   backend crate wires up via [`facade::Medium`].
//! - [`test_backend`] — an in-memory [`scope::Backend`] used by this
//!   crate's own tests; not part of the public API surface real
//!   applications depend on.

pub mod containers;
pub mod context;
pub mod convert;
pub mod dispatch;
pub mod error;
pub mod facade;
pub mod kv;
pub mod options;
pub mod raw;
pub mod refine;
pub mod scope;
pub mod traits;
pub mod validate;

#[cfg(any(test, feature = "test-backend"))]
pub mod test_backend;

#[cfg(not(any(test, feature = "test-backend")))]
mod test_backend;

#[cfg(feature = "derive")]
pub use bitserializer_derive::{BitDeserialize, BitSerialize, BitSerializeEnum};

/// Common imports for implementing a data model against this crate.
pub mod prelude {
    pub use crate::context::SerializationContext;
    pub use crate::convert::{BinTimestamp, Number};
    pub use crate::dispatch::{BitDeserialize, BitSerialize, FlattenLoad, FlattenSave};
    pub use crate::error::{Error, Result};
    pub use crate::kv::KeyValue;
    pub use crate::options::{MapLoadMode, Policy, SerializationOptions};
    pub use crate::raw::Raw;
    pub use crate::refine::{Refiner, ToLowerCase, TrimWhitespace};
    pub use crate::scope::Backend;
    pub use crate::validate::{Email, MaxSize, MinSize, PhoneNumber, Range, Required, Validator};

    #[cfg(feature = "derive")]
    pub use bitserializer_derive::{BitDeserialize, BitSerialize, BitSerializeEnum};
}
