//! Supplementary group management

/***********************************************************************
 * (c) 2021 Christoph Grenz <christophg+gitorious @ grenz-bonn.de>     *
 *                                                                     *
 * This Source Code Form is subject to the terms of the Mozilla Public *
 * License, v. 2.0. If a copy of the MPL was not distributed with this *
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.            *
 ***********************************************************************/

use crate::error::GroupError;
use crate::GroupResult;

use libc::c_int;
use log::{debug, trace};
use std::io;

/// Numeric group ID
pub type Gid = libc::gid_t;

/// Read and write access to a supplementary group list
///
/// Implemented by [`ProcessCredentials`] for the calling process and by
/// [`cred_mock::Credentials`][`crate::cred_mock::Credentials`] for an
/// in-memory list.
///
/// # Limitations
///
/// [`add_group()`][`Self::add_group()`] and
/// [`drop_group()`][`Self::drop_group()`] are read-modify-write operations.
/// For the process credentials they are not atomic: if another thread
/// changes the group list between the read and the write, that change is
/// lost.
///
/// Reading the process list takes two `getgroups(2)` calls (count, then
/// contents). If another thread adds groups in between, the read fails
/// with [`GroupError::Query`] carrying `EINVAL`; nothing is retried, so
/// callers that race with such updates must call again themselves.
pub trait CredentialStore {
	/// Returns the current supplementary groups.
	#[rustversion::attr(since(1.48), doc(alias = "getgroups"))]
	fn groups(&self) -> GroupResult<Vec<Gid>>;

	/// Replaces the supplementary groups with `groups`.
	#[rustversion::attr(since(1.48), doc(alias = "setgroups"))]
	fn set_groups(&mut self, groups: &[Gid]) -> GroupResult<()>;

	/// Adds `group` to the end of the list unless it is already present.
	///
	/// Nothing is written if `group` is already in the list.
	fn add_group(&mut self, group: Gid) -> GroupResult<()> {
		let mut groups = self.groups()?;
		if groups.contains(&group) {
			trace!("add_group: {} already present", group);
			return Ok(());
		}
		groups.push(group);
		self.set_groups(&groups)
	}

	/// Removes every occurrence of `group` from the list.
	///
	/// Nothing is written if `group` isn't in the list. A failed read is
	/// always reported, even if the list would have been empty anyway.
	fn drop_group(&mut self, group: Gid) -> GroupResult<()> {
		let groups = self.groups()?;
		if !groups.contains(&group) {
			trace!("drop_group: {} not present", group);
			return Ok(());
		}
		let remaining: Vec<Gid> = groups.into_iter().filter(|&g| g != group).collect();
		self.set_groups(&remaining)
	}
}

/// The supplementary groups of the calling process
///
/// These belong to the OS process, not to this struct: every instance
/// reads and writes the same list. Writing requires `CAP_SETGID` (or
/// root) on Linux.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessCredentials;

impl ProcessCredentials {
	/// Creates a handle to the process credentials
	#[must_use]
	pub const fn new() -> Self {
		Self
	}
}

/// Internal: Reads a group list with a `getgroups(2)`-like function.
///
/// Asks for the count first, then fills a buffer of that size. If the list
/// grew in between, the second call fails with `EINVAL` and that failure
/// is returned as is.
fn read_groups<F>(mut getgroups: F) -> GroupResult<Vec<Gid>>
where
	F: FnMut(c_int, *mut Gid) -> c_int,
{
	let count = getgroups(0, std::ptr::null_mut());
	if count < 0 {
		return Err(GroupError::Query(io::Error::last_os_error()));
	}
	if count == 0 {
		return Ok(Vec::new());
	}

	let mut groups: Vec<Gid> = vec![0; count as usize];
	let read = getgroups(count, groups.as_mut_ptr());
	if read < 0 {
		return Err(GroupError::Query(io::Error::last_os_error()));
	}
	groups.truncate(read as usize);
	Ok(groups)
}

impl CredentialStore for ProcessCredentials {
	fn groups(&self) -> GroupResult<Vec<Gid>> {
		read_groups(|size, list| unsafe { libc::getgroups(size, list) })
	}

	fn set_groups(&mut self, groups: &[Gid]) -> GroupResult<()> {
		if groups.len() > c_int::MAX as usize {
			return Err(GroupError::Update(io::Error::from_raw_os_error(libc::EINVAL)));
		}
		#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
		let result = unsafe { libc::setgroups(groups.len() as _, groups.as_ptr()) };
		if result != 0 {
			return Err(GroupError::Update(io::Error::last_os_error()));
		}
		debug!("setgroups: {:?}", groups);
		Ok(())
	}
}

/// Returns the supplementary group IDs of the calling process.
///
/// # Errors
/// [`GroupError::Query`] if `getgroups(2)` fails.
pub fn get_groups() -> GroupResult<Vec<Gid>> {
	ProcessCredentials.groups()
}

/// Replaces the supplementary groups of the calling process.
///
/// An empty slice clears all supplementary groups.
///
/// # Errors
/// [`GroupError::Update`] if `setgroups(2)` fails, e.g. with `EPERM` for
/// lack of privilege or `EINVAL` for a too long list.
pub fn set_groups(groups: &[Gid]) -> GroupResult<()> {
	ProcessCredentials.set_groups(groups)
}

/// Adds `group` to the supplementary groups of the calling process.
///
/// No-op if the group is already present. See
/// [`CredentialStore::add_group()`], including its limitations.
pub fn add_group(group: Gid) -> GroupResult<()> {
	ProcessCredentials.add_group(group)
}

/// Removes `group` from the supplementary groups of the calling process.
///
/// No-op if the group isn't present. See
/// [`CredentialStore::drop_group()`], including its limitations.
pub fn drop_group(group: Gid) -> GroupResult<()> {
	ProcessCredentials.drop_group(group)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::cred_mock::Credentials;

	#[test]
	fn test_drop_preserves_order() {
		let mut creds = Credentials::with_groups(vec![1000, 1001, 1002]);
		creds.drop_group(1001).unwrap();
		assert_eq!(creds.groups().unwrap(), vec![1000, 1002]);
	}

	#[test]
	fn test_drop_all_occurrences() {
		let mut creds = Credentials::with_groups(vec![5, 1001, 7, 1001]);
		creds.drop_group(1001).unwrap();
		assert_eq!(creds.groups().unwrap(), vec![5, 7]);
		assert_eq!(creds.writes, 1);
	}

	#[test]
	fn test_drop_absent_is_noop() {
		let mut creds = Credentials::with_groups(vec![1000, 1002]);
		creds.drop_group(1001).unwrap();
		creds.drop_group(1001).unwrap();
		assert_eq!(creds.groups().unwrap(), vec![1000, 1002]);
		assert_eq!(creds.writes, 0);

		let mut creds = Credentials::new();
		creds.drop_group(1001).unwrap();
		assert_eq!(creds.writes, 0);
	}

	#[test]
	fn test_add_appends() {
		let mut creds = Credentials::with_groups(vec![1000, 1002]);
		creds.add_group(1001).unwrap();
		assert_eq!(creds.groups().unwrap(), vec![1000, 1002, 1001]);
	}

	#[test]
	fn test_add_idempotent() {
		let mut creds = Credentials::with_groups(vec![1000]);
		for _ in 0..3 {
			creds.add_group(1001).unwrap();
		}
		let groups = creds.groups().unwrap();
		assert_eq!(groups.iter().filter(|&&g| g == 1001).count(), 1);
		assert_eq!(creds.writes, 1);
	}

	#[test]
	fn test_set_empty() {
		let mut creds = Credentials::with_groups(vec![1000, 1001]);
		creds.set_groups(&[]).unwrap();
		assert!(creds.groups().unwrap().is_empty());
	}

	#[test]
	fn test_read_failure() {
		let mut creds = Credentials::new();
		creds.fail_reads = true;
		assert!(matches!(creds.add_group(1), Err(GroupError::Query(_))));
		// An empty list with a failed read is still an error
		assert!(matches!(creds.drop_group(1), Err(GroupError::Query(_))));
		assert_eq!(creds.writes, 0);
	}

	#[test]
	fn test_write_failure() {
		let mut creds = Credentials::with_groups(vec![1000]);
		creds.fail_writes = true;
		assert!(matches!(creds.add_group(1001), Err(GroupError::Update(_))));
		assert!(matches!(creds.drop_group(1000), Err(GroupError::Update(_))));
		// Nothing changed, and no-ops don't write at all
		assert_eq!(creds.groups().unwrap(), vec![1000]);
		assert!(creds.add_group(1000).is_ok());
		assert!(creds.drop_group(1001).is_ok());
	}

	#[test]
	fn test_process_groups() {
		let groups = get_groups().unwrap();
		let count = unsafe { libc::getgroups(0, std::ptr::null_mut()) };
		assert_eq!(groups.len(), count as usize);
	}

	#[test]
	fn test_process_set_unprivileged() {
		// Writes back the current list, so the process credentials never change
		if unsafe { libc::geteuid() } == 0 {
			return;
		}
		let groups = get_groups().unwrap();
		match set_groups(&groups) {
			Err(GroupError::Update(e)) => assert_eq!(e.raw_os_error(), Some(libc::EPERM)),
			// Non-root with CAP_SETGID; the list was rewritten unchanged
			Ok(()) => assert_eq!(get_groups().unwrap(), groups),
			Err(other) => panic!("setgroups without root returned {:?}", other),
		}
	}

	/// Fake `getgroups(2)` whose list is replaced by `next` after the
	/// first count was handed out.
	#[cfg(target_os = "linux")]
	fn racing_getgroups(
		first: Vec<Gid>,
		next: Vec<Gid>,
		calls: &mut usize,
	) -> impl FnMut(c_int, *mut Gid) -> c_int + '_ {
		let mut current = first;
		let mut next = Some(next);
		move |size, list| {
			*calls += 1;
			if size == 0 {
				let count = current.len() as c_int;
				if let Some(next) = next.take() {
					current = next;
				}
				return count;
			}
			if (size as usize) < current.len() {
				unsafe { *libc::__errno_location() = libc::EINVAL };
				return -1;
			}
			let out = unsafe { std::slice::from_raw_parts_mut(list, size as usize) };
			out[..current.len()].copy_from_slice(&current);
			current.len() as c_int
		}
	}

	#[test]
	#[cfg(target_os = "linux")]
	fn test_read_list_grew() {
		let mut calls = 0;
		let result = read_groups(racing_getgroups(vec![1000], vec![1000, 1001], &mut calls));
		match result {
			Err(GroupError::Query(e)) => assert_eq!(e.raw_os_error(), Some(libc::EINVAL)),
			other => panic!("unexpected result {:?}", other),
		}
		assert_eq!(calls, 2);
	}

	#[test]
	#[cfg(target_os = "linux")]
	fn test_read_list_shrank() {
		let mut calls = 0;
		let groups = read_groups(racing_getgroups(vec![1000, 1001, 1002], vec![1002], &mut calls)).unwrap();
		assert_eq!(groups, vec![1002]);
	}
}
