// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Redacting wrapper for the two secrets warden handles: the GitHub App
//! signing key and the installation access tokens minted from it.
//!
//! A [`Secret<T>`] prints as `[REDACTED]` through Debug, Display and
//! Serialize, is zeroized on drop, and only yields its value through an
//! explicit [`Secret::expose`] call.
//!
//! ```
//! use warden_common_secret::Secret;
//!
//! let token = Secret::new("ghs_abc123".to_string());
//! assert_eq!(format!("{token}"), "[REDACTED]");
//! assert_eq!(token.expose(), "ghs_abc123");
//! ```
//!
//! Serialization is redacted as well, so a config dump never leaks the key.
//! Code that must hand a secret across a process boundary has to expose it
//! on purpose.

use std::fmt;
use zeroize::Zeroize;

/// Placeholder printed in place of any secret value.
pub const REDACTED: &str = "[REDACTED]";

/// A value that must never show up in logs, status files or error messages.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct Secret<T>
where
	T: Zeroize,
{
	inner: T,
}

/// Signing keys and access tokens are always strings.
pub type SecretString = Secret<String>;

impl<T> Secret<T>
where
	T: Zeroize,
{
	pub fn new(inner: T) -> Self {
		Self { inner }
	}

	/// Access the wrapped value. Every call site is a place a secret leaves
	/// the wrapper, so keep them few and obvious.
	pub fn expose(&self) -> &T {
		&self.inner
	}
}

impl Secret<String> {
	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}

	/// Replace every occurrence of this secret in `text` with [`REDACTED`].
	///
	/// Used when rendering a command line or subprocess output that embeds
	/// the token, e.g. a git `insteadOf` URL.
	pub fn redact_in(&self, text: &str) -> String {
		if self.inner.is_empty() {
			return text.to_string();
		}
		text.replace(self.inner.as_str(), REDACTED)
	}
}

impl<T> Clone for Secret<T>
where
	T: Zeroize + Clone,
{
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

impl<T> fmt::Debug for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Secret").field(&REDACTED).finish()
	}
}

impl<T> fmt::Display for Secret<T>
where
	T: Zeroize,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl<T> PartialEq for Secret<T>
where
	T: Zeroize + PartialEq,
{
	fn eq(&self, other: &Self) -> bool {
		self.inner == other.inner
	}
}

impl<T> Eq for Secret<T> where T: Zeroize + Eq {}

#[cfg(feature = "serde")]
mod serde_impl {
	use super::{Secret, REDACTED};
	use serde::{Deserialize, Deserializer, Serialize, Serializer};
	use zeroize::Zeroize;

	impl<T> Serialize for Secret<T>
	where
		T: Serialize + Zeroize,
	{
		fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
		where
			S: Serializer,
		{
			serializer.serialize_str(REDACTED)
		}
	}

	impl<'de, T> Deserialize<'de> for Secret<T>
	where
		T: Deserialize<'de> + Zeroize,
	{
		fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
		where
			D: Deserializer<'de>,
		{
			T::deserialize(deserializer).map(Secret::new)
		}
	}
}
