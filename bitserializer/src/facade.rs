//! The Facade (spec §4.9 "top-level entry points" / §9 "LoadObject /
//! SaveObject"): the handful of free functions an application actually
//! calls, hiding the root-scope construction and stream encoding that the
//! rest of the crate exposes as building blocks.
//!
//! A concrete backend crate (e.g. `bitserializer_json`) supplies the
//! `Medium` type these generics are monomorphized over — something that
//! knows how to turn its own bytes/text into a `Backend::RootSave`/
//! `RootLoad` pair. That boundary is expressed here as the [`Medium`]
//! trait so this module stays backend-agnostic, the same way
//! `serde_json`/`serde_yaml` each implement `serde::Serializer` without
//! `serde` itself depending on either.

use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::path::Path;

use crate::convert::utf;
use crate::dispatch::{BitDeserialize, BitSerialize, RootLoadSite, RootSaveSite};
use crate::error::{Error, Result};
use crate::options::SerializationOptions;
use crate::scope::{Backend, RootLoadScope, RootSaveScope, ScopeCommon};

/// A concrete encoding a [`Backend`] can be driven through: constructing a
/// fresh root scope to save into and turning it into bytes/text, or parsing
/// bytes/text into a root scope to load from.
///
/// Implemented once per backend crate (e.g. `bitserializer_json::Json`),
/// not by application code.
pub trait Medium: Backend {
    /// Builds a fresh, empty root-save scope.
    fn new_root_save(options: SerializationOptions) -> Result<Self::RootSave>;

    /// Serializes a finished root-save scope to bytes (text encoded per
    /// `options.stream_options`, binary formats ignore it).
    fn finish_root_save(scope: Self::RootSave, options: SerializationOptions) -> Result<Vec<u8>>;

    /// Parses `bytes` into a root-load scope (BOM/encoding detected or
    /// forced per `options.stream_options`, per spec §6).
    fn new_root_load(bytes: &[u8], options: SerializationOptions) -> Result<Self::RootLoad>;
}

/// Serializes `value` with `M`, returning the encoded bytes.
pub fn save_object<M: Medium, T: BitSerialize>(value: &T, options: SerializationOptions) -> Result<Vec<u8>> {
    let mut scope = M::new_root_save(options)?;
    value.bit_save::<M, _>(RootSaveSite(&mut scope))?;
    M::finish_root_save(scope, options)
}

/// Deserializes `value` in place from `bytes` with `M`. Returns whether
/// anything was actually read (spec §4.1: an empty/absent document leaves
/// `value` untouched rather than erroring).
///
/// Every validator failure recorded against the operation's
/// [`crate::context::SerializationContext`] is collected once the traversal
/// finishes and raised together as [`Error::FailedValidation`] — the
/// accumulate-then-throw step spec §4.6/§8 describes ("Load throws
/// `FailedValidation` at the end").
pub fn load_object<M: Medium, T: BitDeserialize>(value: &mut T, bytes: &[u8], options: SerializationOptions) -> Result<bool> {
    let mut scope = M::new_root_load(bytes, options)?;
    let context = scope.context();
    let loaded = value.bit_load::<M, _>(RootLoadSite(&mut scope))?;
    let failures = context.borrow_mut().take_failures();
    if !failures.is_empty() {
        return Err(Error::FailedValidation(failures));
    }
    Ok(loaded)
}

/// Serializes `value` with `M` and writes the result to `path`.
///
/// Refuses to clobber an existing file unless `overwrite` is set, matching
/// the original library's `SaveObjectToFile` default (spec §4.9).
pub fn save_object_to_file<M: Medium, T: BitSerialize>(
    value: &T,
    path: impl AsRef<Path>,
    overwrite: bool,
    options: SerializationOptions,
) -> Result<()> {
    let bytes = save_object::<M, T>(value, options)?;
    let mut open_options = OpenOptions::new();
    open_options.write(true).truncate(true);
    if overwrite {
        open_options.create(true);
    } else {
        open_options.create_new(true);
    }
    let mut file = open_options.open(path.as_ref()).map_err(|err| {
        tracing::warn!(path = %path.as_ref().display(), %err, "failed to open file for save");
        Error::InputOutputError(format!("failed to open {}: {err}", path.as_ref().display()))
    })?;
    file.write_all(&bytes).map_err(|err| Error::InputOutputError(format!("failed to write {}: {err}", path.as_ref().display())))?;
    tracing::debug!(path = %path.as_ref().display(), bytes = bytes.len(), "object saved to file");
    Ok(())
}

/// Reads `path` and deserializes `value` in place from it with `M`.
pub fn load_object_from_file<M: Medium, T: BitDeserialize>(
    value: &mut T,
    path: impl AsRef<Path>,
    options: SerializationOptions,
) -> Result<bool> {
    let mut file = std::fs::File::open(path.as_ref()).map_err(|err| {
        tracing::warn!(path = %path.as_ref().display(), %err, "failed to open file for load");
        Error::InputOutputError(format!("failed to open {}: {err}", path.as_ref().display()))
    })?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|err| Error::InputOutputError(format!("failed to read {}: {err}", path.as_ref().display())))?;
    tracing::debug!(path = %path.as_ref().display(), bytes = bytes.len(), "object loaded from file");
    load_object::<M, T>(value, &bytes, options)
}

/// Strips a leading BOM and decodes the remaining bytes per
/// `options.stream_options`, detecting the encoding from the BOM when
/// present and falling back to `options.stream_options.encoding` otherwise.
/// Text-based backend crates call this from their [`Medium::new_root_load`].
pub fn decode_stream(bytes: &[u8], options: SerializationOptions) -> Result<String> {
    match utf::detect_encoding(bytes) {
        Some((encoding, bom_len)) => utf::decode(&bytes[bom_len..], encoding, options.utf_encoding_error_policy),
        None => utf::decode(bytes, options.stream_options.encoding, options.utf_encoding_error_policy),
    }
}

/// Encodes `text` per `options.stream_options`, writing a BOM first when
/// `write_bom` is set. Text-based backend crates call this from their
/// [`Medium::finish_root_save`].
pub fn encode_stream(text: &str, options: SerializationOptions) -> Vec<u8> {
    utf::encode(text, options.stream_options.encoding, options.stream_options.write_bom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{StreamOptions, UtfType};

    #[test]
    fn decode_stream_strips_a_utf8_bom() {
        let mut bytes = utf::bom_bytes(UtfType::Utf8).to_vec();
        bytes.extend_from_slice("hello".as_bytes());
        let text = decode_stream(&bytes, SerializationOptions::new()).unwrap();
        assert_eq!(text, "hello");
    }

    #[test]
    fn encode_stream_round_trips_through_decode_stream() {
        let options = SerializationOptions::new().with_stream_options(StreamOptions { write_bom: true, encoding: UtfType::Utf16Le });
        let bytes = encode_stream("hello", options);
        assert_eq!(decode_stream(&bytes, options).unwrap(), "hello");
    }
}
