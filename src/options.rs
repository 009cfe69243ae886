//! Configuration options for serialization.
//!
//! [`Options`] controls how a [`Codec`](crate::Codec) writes payloads:
//!
//! - `pretty`: whether [`Codec::stringify`](crate::Codec::stringify) pretty-prints its output
//! - `max_depth`: how deeply nested a value may be before serialization gives up
//!
//! ## Examples
//!
//! ```rust
//! use serde_lossless::{value, Codec, Options};
//!
//! let codec = Codec::with_options(Options::pretty());
//! let text = codec.stringify(&value!({"a": [1, 2]})).unwrap();
//! assert!(text.contains('\n'));
//!
//! let shallow = Codec::with_options(Options::new().with_max_depth(1));
//! assert!(shallow.stringify(&value!({"a": {"b": {}}})).is_err());
//! ```

/// Default nesting limit, matching the recursion limit `serde_json` applies by default.
///
/// [`Codec::parse`](crate::Codec::parse) reads any payload that
/// [`Codec::stringify`](crate::Codec::stringify) wrote under the same limit, so raising it
/// raises both.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Configuration options for serialization.
///
/// # Examples
///
/// ```rust
/// use serde_lossless::Options;
///
/// // Compact output, default depth limit
/// let options = Options::new();
///
/// // Pretty-printed output
/// let options = Options::pretty();
///
/// // Custom configuration
/// let options = Options::new().with_pretty(true).with_max_depth(64);
/// assert_eq!(options.max_depth, 64);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Options {
    pub pretty: bool,
    pub max_depth: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            pretty: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Options {
    /// Creates default options (compact text, depth limit of 128).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_lossless::Options;
    ///
    /// let options = Options::new();
    /// assert_eq!(options.max_depth, 128);
    /// assert!(!options.pretty);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options for pretty-printed output.
    #[must_use]
    pub fn pretty() -> Self {
        Options {
            pretty: true,
            ..Default::default()
        }
    }

    /// Enables or disables pretty-printing.
    #[must_use]
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Sets the maximum nesting depth.
    ///
    /// The root is at depth 0; each array, object, map, set, error or instance level adds one.
    /// Serializing a value nested deeper fails with
    /// [`Error::DepthLimitExceeded`](crate::Error::DepthLimitExceeded). Parsing under the same
    /// limit accepts everything serialization can produce; a very large limit lets parsing
    /// recurse that deep on the stack.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}
