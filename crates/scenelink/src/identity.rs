//! Reference identity: base path + optional copy number.
//!
//! When one file is referenced several times the host tells the loads apart
//! by suffixing the path with a copy number: `rig.ma`, `rig.ma{1}`,
//! `rig.ma{2}`. [`ReferenceIdentity::parse`] splits that raw form and
//! [`ReferenceIdentity::compose`] restores it.
//!
//! Grammar accepted as a copy-number suffix: everything after the first `{`
//! must be a canonical decimal (`0`, or digits without a leading zero, fitting
//! `u32`) followed by a single closing `}`. Anything else is not an error: the
//! whole string is taken as the base path. That keeps `parse` total and makes
//! `compose(parse(s)) == s` hold for every string.

use crate::path::PathHandle;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceIdentity {
    base: PathHandle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    copy_number: Option<u32>,
}

impl ReferenceIdentity {
    pub fn new(base: impl Into<PathHandle>, copy_number: Option<u32>) -> Self {
        Self {
            base: base.into(),
            copy_number,
        }
    }

    pub fn parse(raw: &str) -> Self {
        match split_copy_number(raw) {
            Some((base, n)) => Self::new(base, Some(n)),
            None => Self::new(raw, None),
        }
    }

    pub fn compose(base: &str, copy_number: Option<u32>) -> String {
        match copy_number {
            Some(n) => format!("{base}{{{n}}}"),
            None => base.to_string(),
        }
    }

    pub fn base(&self) -> &PathHandle {
        &self.base
    }

    pub fn copy_number(&self) -> Option<u32> {
        self.copy_number
    }

    /// The copy-number-qualified form used to address the reference.
    pub fn raw(&self) -> String {
        Self::compose(self.base.as_str(), self.copy_number)
    }
}

impl fmt::Display for ReferenceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw())
    }
}

fn split_copy_number(raw: &str) -> Option<(&str, u32)> {
    let (base, rest) = raw.split_once('{')?;
    let digits = rest.strip_suffix('}')?;
    let canonical = !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
        && (digits == "0" || !digits.starts_with('0'));
    if !canonical {
        return None;
    }
    digits.parse().ok().map(|n| (base, n))
}
