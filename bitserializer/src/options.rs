//! [`SerializationOptions`] and the policies it carries (spec §3).

/// What to do when the archive value at a site is the wrong shape, or a
/// number overflows its target, or a string fails to transcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Policy {
    /// Raise the corresponding error immediately.
    #[default]
    ThrowError,
    /// Leave the field untouched and continue; a `Required` validator may
    /// still flag the field afterwards.
    Skip,
}

impl Policy {
    /// True for [`Policy::ThrowError`].
    pub fn is_throw(self) -> bool {
        matches!(self, Self::ThrowError)
    }

    /// True for [`Policy::Skip`].
    pub fn is_skip(self) -> bool {
        matches!(self, Self::Skip)
    }
}

/// Formatting knobs consumed by text backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatOptions {
    /// Pretty-print with indentation instead of the format's compact form.
    pub enable_format: bool,
    /// Character used to pad one indentation level.
    pub padding_char: char,
    /// Number of `padding_char` repetitions per indentation level.
    pub padding_char_num: u8,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            enable_format: false,
            padding_char: ' ',
            padding_char_num: 4,
        }
    }
}

/// The text encoding of an input/output stream (spec §4.4 UTF transcoding,
/// §6 Streams).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtfType {
    /// UTF-8, the default for every text backend.
    Utf8,
    /// UTF-16, little-endian byte order.
    Utf16Le,
    /// UTF-16, big-endian byte order.
    Utf16Be,
    /// UTF-32, little-endian byte order.
    Utf32Le,
    /// UTF-32, big-endian byte order.
    Utf32Be,
}

/// Stream-level knobs: BOM handling and the stream's text encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamOptions {
    /// Emit a byte-order-mark on `Save`. Ignored on `Load`, where BOM
    /// presence is auto-detected.
    pub write_bom: bool,
    /// The encoding to write with, or (on `Load`, before detection runs) the
    /// encoding to assume.
    pub encoding: UtfType,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self { write_bom: false, encoding: UtfType::Utf8 }
    }
}

/// How a map target is mutated on `Load` (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapLoadMode {
    /// Clear the target map, then insert every archive entry.
    #[default]
    Clean,
    /// Only read keys that already exist in the target map; archive entries
    /// for other keys are skipped.
    OnlyExistKeys,
    /// Read into `target[key]` for every archive entry, inserting new
    /// entries for keys the target didn't already have.
    UpdateKeys,
}

/// The full set of options threaded through one `Load`/`Save` operation.
///
/// Built with the usual `with_*` builder methods rather than a config file —
/// the spec scopes this to in-process knobs only (§6: "no persisted state").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializationOptions {
    /// Policy for archive-value/target-type shape mismatches.
    pub mismatched_types_policy: Policy,
    /// Policy for numbers (or durations) that don't fit their target.
    pub overflow_number_policy: Policy,
    /// Policy for invalid byte sequences encountered while transcoding.
    pub utf_encoding_error_policy: Policy,
    /// Pretty-printing knobs.
    pub format_options: FormatOptions,
    /// Stream encoding/BOM knobs.
    pub stream_options: StreamOptions,
    /// How `Load` mutates map targets.
    pub map_load_mode: MapLoadMode,
}

impl Default for SerializationOptions {
    fn default() -> Self {
        Self {
            mismatched_types_policy: Policy::ThrowError,
            overflow_number_policy: Policy::ThrowError,
            utf_encoding_error_policy: Policy::ThrowError,
            format_options: FormatOptions::default(),
            stream_options: StreamOptions::default(),
            map_load_mode: MapLoadMode::default(),
        }
    }
}

impl SerializationOptions {
    /// Starts from the defaults (every policy `ThrowError`, compact format).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets [`Self::mismatched_types_policy`].
    pub fn with_mismatched_types_policy(mut self, policy: Policy) -> Self {
        self.mismatched_types_policy = policy;
        self
    }

    /// Sets [`Self::overflow_number_policy`].
    pub fn with_overflow_number_policy(mut self, policy: Policy) -> Self {
        self.overflow_number_policy = policy;
        self
    }

    /// Sets [`Self::utf_encoding_error_policy`].
    pub fn with_utf_encoding_error_policy(mut self, policy: Policy) -> Self {
        self.utf_encoding_error_policy = policy;
        self
    }

    /// Sets [`Self::format_options`].
    pub fn with_format_options(mut self, format_options: FormatOptions) -> Self {
        self.format_options = format_options;
        self
    }

    /// Sets [`Self::stream_options`].
    pub fn with_stream_options(mut self, stream_options: StreamOptions) -> Self {
        self.stream_options = stream_options;
        self
    }

    /// Sets [`Self::map_load_mode`].
    pub fn with_map_load_mode(mut self, mode: MapLoadMode) -> Self {
        self.map_load_mode = mode;
        self
    }
}
