// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Cache and lock key derivation.
//!
//! A key is derived from a prefix, the identity of the cached computation and the
//! arguments of a call. Two formats are available, selected with [`KeyFormat`]:
//!
//! - [`KeyFormat::Compatible`] joins the string forms of every part with `:`.
//!   Keyword arguments keep the order in which they were supplied. Keys stay human
//!   readable, but distinct argument lists collide when their string forms do.
//! - [`KeyFormat::Canonical`] sorts keyword arguments by name and hashes a
//!   length-prefixed encoding of all arguments, so keyword order does not matter
//!   and embedded `:` characters cannot cause collisions.
//!
//! Every cache key has a lock key in a separate namespace, `Lock:` followed by the
//! cache key.

use std::fmt::Display;

/// The namespace prepended to a cache key to form its lock key.
pub const LOCK_PREFIX: &str = "Lock:";

/// The arguments of a single call, rendered to strings.
///
/// # Examples
///
/// ```
/// use revalidate::CallSignature;
///
/// let signature = CallSignature::new().arg(42).arg("eu-west").kwarg("verbose", true);
/// assert_eq!(signature.positional(), ["42", "eu-west"]);
/// assert_eq!(signature.keyword(), [("verbose".to_string(), "true".to_string())]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct CallSignature {
    positional: Vec<String>,
    keyword: Vec<(String, String)>,
}

impl CallSignature {
    /// Creates a signature with no arguments.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional argument.
    #[must_use]
    pub fn arg(mut self, value: impl Display) -> Self {
        self.push_arg(value);
        self
    }

    /// Appends a keyword argument.
    #[must_use]
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Display) -> Self {
        self.push_kwarg(name, value);
        self
    }

    /// Appends a positional argument in place.
    pub fn push_arg(&mut self, value: impl Display) {
        self.positional.push(value.to_string());
    }

    /// Appends a keyword argument in place.
    pub fn push_kwarg(&mut self, name: impl Into<String>, value: impl Display) {
        self.keyword.push((name.into(), value.to_string()));
    }

    /// Positional arguments in call order.
    #[must_use]
    pub fn positional(&self) -> &[String] {
        &self.positional
    }

    /// Keyword arguments in the order they were supplied.
    #[must_use]
    pub fn keyword(&self) -> &[(String, String)] {
        &self.keyword
    }
}

/// Arguments that can be rendered into a [`CallSignature`].
///
/// Implemented for `()`, for tuples of up to eight [`Display`] values and for
/// [`CallSignature`] itself. Implement it for an argument struct to contribute
/// keyword arguments.
///
/// # Examples
///
/// ```
/// use revalidate::{CallSignature, SignatureArgs};
///
/// struct Report {
///     region: String,
///     detailed: bool,
/// }
///
/// impl SignatureArgs for Report {
///     fn signature(&self) -> CallSignature {
///         CallSignature::new()
///             .arg(&self.region)
///             .kwarg("detailed", self.detailed)
///     }
/// }
///
/// let report = Report { region: "emea".into(), detailed: false };
/// assert_eq!(report.signature().positional(), ["emea"]);
/// ```
pub trait SignatureArgs {
    /// Renders the arguments.
    fn signature(&self) -> CallSignature;
}

impl SignatureArgs for () {
    fn signature(&self) -> CallSignature {
        CallSignature::new()
    }
}

impl SignatureArgs for CallSignature {
    fn signature(&self) -> CallSignature {
        self.clone()
    }
}

macro_rules! impl_signature_args {
    ($($name:ident),+) => {
        impl<$($name: Display),+> SignatureArgs for ($($name,)+) {
            #[expect(non_snake_case, reason = "type parameters double as bindings")]
            fn signature(&self) -> CallSignature {
                let ($($name,)+) = self;
                let mut signature = CallSignature::new();
                $(signature.push_arg($name);)+
                signature
            }
        }
    };
}

impl_signature_args!(A);
impl_signature_args!(A, B);
impl_signature_args!(A, B, C);
impl_signature_args!(A, B, C, D);
impl_signature_args!(A, B, C, D, E);
impl_signature_args!(A, B, C, D, E, F);
impl_signature_args!(A, B, C, D, E, F, G);
impl_signature_args!(A, B, C, D, E, F, G, H);

/// How cache keys are derived from call signatures.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum KeyFormat {
    /// `prefix:id:arg...:name:value...` with keyword arguments in supplied order.
    #[default]
    Compatible,
    /// `prefix:id:<hash>` over a length-prefixed encoding with sorted keyword arguments.
    Canonical,
}

impl KeyFormat {
    /// Derives the cache key and lock key for a call.
    #[must_use]
    pub fn cache_key(self, prefix: &str, computation_id: &str, signature: &CallSignature) -> CacheKey {
        let key = match self {
            Self::Compatible => build_key(computation_id, signature, prefix),
            Self::Canonical => build_canonical_key(computation_id, signature, prefix),
        };
        CacheKey::new(key)
    }
}

/// A cache key together with the key of the lock guarding its recomputation.
///
/// # Examples
///
/// ```
/// use revalidate::CacheKey;
///
/// let key = CacheKey::new("reports:daily:2024");
/// assert_eq!(key.key(), "reports:daily:2024");
/// assert_eq!(key.lock_key(), "Lock:reports:daily:2024");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    key: String,
    lock_key: String,
}

impl CacheKey {
    /// Wraps `key` and derives its lock key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        let lock_key = lock_key_for(&key);
        Self { key, lock_key }
    }

    /// The key under which the value is stored.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The key of the lock guarding recomputation.
    #[must_use]
    pub fn lock_key(&self) -> &str {
        &self.lock_key
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key)
    }
}

/// Returns the lock key for `key`.
#[must_use]
pub fn lock_key_for(key: &str) -> String {
    format!("{LOCK_PREFIX}{key}")
}

/// Builds a cache key in the [`KeyFormat::Compatible`] format.
///
/// # Examples
///
/// ```
/// use revalidate::{CallSignature, build_key};
///
/// let signature = CallSignature::new().arg(1).arg(2).kwarg("scale", 3);
/// assert_eq!(build_key("area", &signature, "shapes"), "shapes:area:1:2:scale:3");
/// assert_eq!(build_key("area", &CallSignature::new(), ""), ":area");
/// ```
#[must_use]
pub fn build_key(computation_id: &str, signature: &CallSignature, prefix: &str) -> String {
    let mut key = String::with_capacity(prefix.len() + computation_id.len() + 16);
    key.push_str(prefix);
    key.push(':');
    key.push_str(computation_id);

    for arg in &signature.positional {
        key.push(':');
        key.push_str(arg);
    }
    for (name, value) in &signature.keyword {
        key.push(':');
        key.push_str(name);
        key.push(':');
        key.push_str(value);
    }

    key
}

/// Builds a cache key in the [`KeyFormat::Canonical`] format.
///
/// # Examples
///
/// ```
/// use revalidate::{CallSignature, build_canonical_key};
///
/// let a = CallSignature::new().kwarg("x", 1).kwarg("y", 2);
/// let b = CallSignature::new().kwarg("y", 2).kwarg("x", 1);
/// assert_eq!(build_canonical_key("f", &a, "p"), build_canonical_key("f", &b, "p"));
/// ```
#[must_use]
pub fn build_canonical_key(computation_id: &str, signature: &CallSignature, prefix: &str) -> String {
    let mut keyword: Vec<&(String, String)> = signature.keyword.iter().collect();
    keyword.sort();

    let mut encoded = Vec::new();
    write_len(&mut encoded, signature.positional.len());
    for arg in &signature.positional {
        write_field(&mut encoded, arg);
    }
    write_len(&mut encoded, keyword.len());
    for (name, value) in keyword {
        write_field(&mut encoded, name);
        write_field(&mut encoded, value);
    }

    let digest = xxhash_rust::xxh3::xxh3_128(&encoded);
    format!("{prefix}:{computation_id}:{digest:032x}")
}

fn write_len(buffer: &mut Vec<u8>, len: usize) {
    buffer.extend_from_slice(&(len as u64).to_le_bytes());
}

fn write_field(buffer: &mut Vec<u8>, field: &str) {
    write_len(buffer, field.len());
    buffer.extend_from_slice(field.as_bytes());
}
