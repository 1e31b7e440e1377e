//! In-memory credential store

/***********************************************************************
 * (c) 2021 Christoph Grenz <christophg+gitorious @ grenz-bonn.de>     *
 *                                                                     *
 * This Source Code Form is subject to the terms of the Mozilla Public *
 * License, v. 2.0. If a copy of the MPL was not distributed with this *
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.            *
 ***********************************************************************/

use crate::error::GroupError;
use crate::groups::{CredentialStore, Gid};
use crate::GroupResult;
use std::io;

/// Non-OS implementation of `CredentialStore`
///
/// Holds a supplementary group list in memory. Code written against
/// [`CredentialStore`] can be exercised with it without privileges and
/// without touching the credentials of the running process.
///
/// Reads and writes can be made to fail with `EIO` and `EPERM`
/// respectively, and every successful write is counted in
/// [`writes`][`Self::writes`].
///
/// ```rust
/// use pam_authctx::CredentialStore;
/// use pam_authctx::cred_mock::Credentials;
///
/// let mut creds = Credentials::with_groups(vec![1000, 1001, 1002]);
/// creds.drop_group(1001).unwrap();
/// assert_eq!(creds.groups, vec![1000, 1002]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
	/// The current group list
	pub groups: Vec<Gid>,
	/// Number of successful `set_groups` calls
	pub writes: usize,
	/// Fail every `groups` call
	pub fail_reads: bool,
	/// Fail every `set_groups` call
	pub fail_writes: bool,
}

impl Credentials {
	/// Creates a store with an empty group list
	#[must_use]
	pub const fn new() -> Self {
		Self {
			groups: Vec::new(),
			writes: 0,
			fail_reads: false,
			fail_writes: false,
		}
	}

	/// Creates a store with a preset group list
	#[must_use]
	pub fn with_groups(groups: impl Into<Vec<Gid>>) -> Self {
		Self {
			groups: groups.into(),
			..Self::new()
		}
	}
}

impl CredentialStore for Credentials {
	fn groups(&self) -> GroupResult<Vec<Gid>> {
		if self.fail_reads {
			return Err(GroupError::Query(io::Error::from_raw_os_error(libc::EIO)));
		}
		Ok(self.groups.clone())
	}

	fn set_groups(&mut self, groups: &[Gid]) -> GroupResult<()> {
		if self.fail_writes {
			return Err(GroupError::Update(io::Error::from_raw_os_error(libc::EPERM)));
		}
		self.groups = groups.to_vec();
		self.writes += 1;
		Ok(())
	}
}
