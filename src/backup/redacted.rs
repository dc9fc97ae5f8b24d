//! Credentials read from the job configuration.
//!
//! The borg repository passphrase ends up in the `BORG_PASSPHRASE`
//! environment of `borg` and the ntfy password or access token in an
//! `Authorization` header. Anywhere else the value shows up as
//! [`REDACTED_SECRET`].

use bon::Builder;
use derive_more::From;
use getset::Getters;
use serde::de::{Error, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Debug, Formatter};
use std::result;
use validator::Validate;
use zeroize::Zeroize;

pub static REDACTED_SECRET: &str = "###REDACTED_SECRET###";

/// Passphrase or token. Zeroed when dropped.
#[derive(Validate, Clone, Zeroize, From, Builder, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct RedactedString {
    #[validate(length(min = 1))]
    #[builder(into)]
    inner: String,
}

impl RedactedString {
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl From<&str> for RedactedString {
    fn from(value: &str) -> Self {
        Self::builder().inner(value).build()
    }
}

impl Debug for RedactedString {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(REDACTED_SECRET)
    }
}

impl Serialize for RedactedString {
    fn serialize<S: Serializer>(&self, serializer: S) -> result::Result<S::Ok, S::Error> {
        serializer.serialize_str(REDACTED_SECRET)
    }
}

impl<'de> Deserialize<'de> for RedactedString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> result::Result<Self, D::Error> {
        deserializer.deserialize_any(CredentialVisitor)
    }
}

impl Drop for RedactedString {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// Accepts plain YAML scalars, so an all-digit PIN-like passphrase written
/// without quotes still loads as the same text.
struct CredentialVisitor;

impl Visitor<'_> for CredentialVisitor {
    type Value = RedactedString;

    fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
        formatter.write_str("a passphrase or token")
    }

    fn visit_str<E: Error>(self, v: &str) -> result::Result<Self::Value, E> {
        Ok(RedactedString::from(v))
    }

    fn visit_u64<E: Error>(self, v: u64) -> result::Result<Self::Value, E> {
        Ok(RedactedString::from(v.to_string()))
    }

    fn visit_i64<E: Error>(self, v: i64) -> result::Result<Self::Value, E> {
        Ok(RedactedString::from(v.to_string()))
    }
}
