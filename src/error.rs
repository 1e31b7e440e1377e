//! Error structs and related helpers

/***********************************************************************
 * (c) 2021 Christoph Grenz <christophg+gitorious @ grenz-bonn.de>     *
 *                                                                     *
 * This Source Code Form is subject to the terms of the Mozilla Public *
 * License, v. 2.0. If a copy of the MPL was not distributed with this *
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.            *
 ***********************************************************************/

use crate::char_ptr_to_str;
#[doc(no_inline)]
pub use crate::ErrorCode;
use libc::c_int;
use pam_sys::pam_handle as PamHandle;
use pam_sys::pam_strerror;

use std::error;
use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use std::hash::{Hash, Hasher};
use std::io;

/// Error type for PAM operations
///
/// Carries the raw return code of the failed libpam call, so codes this
/// crate doesn't know about survive unchanged. Use [`kind()`][`Self::kind()`]
/// to match on the well-known ones.
#[must_use]
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Error {
	code: c_int,
	msg: String,
}

impl Error {
	/// Creates a new [`Error`] from a raw return code.
	///
	/// The message is looked up with `pam_strerror`. A null `handle` is
	/// allowed; no lookup happens then.
	pub(crate) fn new(handle: *mut PamHandle, code: c_int) -> Error {
		let msg = if handle.is_null() {
			String::new()
		} else {
			char_ptr_to_str(unsafe { pam_strerror(handle, code) })
				.unwrap_or("")
				.into()
		};
		Self { code, msg }
	}

	/// The raw return code of the failed PAM call.
	pub const fn raw_code(&self) -> c_int {
		self.code
	}

	/// The error code, if it is one of the codes defined by PAM.
	pub fn kind(&self) -> Option<ErrorCode> {
		ErrorCode::from_repr(self.code)
	}

	/// Text representation of the error code from `pam_strerror`, if available.
	pub fn message(&self) -> Option<&str> {
		if self.msg.is_empty() {
			None
		} else {
			Some(&self.msg)
		}
	}
}

impl Debug for Error {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.debug_struct("pam_authctx::Error")
			.field("code", &self.code)
			.field("kind", &self.kind())
			.field("msg", &self.msg)
			.finish()
	}
}

impl Display for Error {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		write!(f, "PAM error code {}", self.code)?;
		if !self.msg.is_empty() {
			write!(f, ": {}", self.msg)?;
		}
		Ok(())
	}
}

impl error::Error for Error {}

impl PartialEq for Error {
	fn eq(&self, other: &Self) -> bool {
		self.code == other.code
	}
}

impl Eq for Error {}

impl Hash for Error {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.code.hash(state);
	}
}

/// Wrapping of a [`ErrorCode`] in a [`Error`] without a PAM handle.
///
/// These instances won't have a message string, only a code.
///
/// ```rust
/// # use pam_authctx::{Error, ErrorCode};
/// let error = Error::from(ErrorCode::BAD_ITEM);
/// assert_eq!(error.kind(), Some(ErrorCode::BAD_ITEM));
/// ```
impl From<ErrorCode> for Error {
	fn from(code: ErrorCode) -> Self {
		Error {
			code: code.repr(),
			msg: String::new(),
		}
	}
}

/// Automatic wrapping in [`std::io::Error`].
///
/// ```rust
/// # use pam_authctx::{Result, ErrorCode};
/// # fn some_failing_pam_function() -> Result<()> {
/// #     Err(ErrorCode::PERM_DENIED.into())
/// # }
/// fn main() {
///     let result: std::io::Result<()> = some_failing_pam_function().map_err(Into::into);
///     assert_eq!(result.unwrap_err().kind(), std::io::ErrorKind::PermissionDenied);
/// }
/// ```
impl From<Error> for io::Error {
	fn from(error: Error) -> Self {
		io::Error::new(
			match error.kind() {
				Some(ErrorCode::INCOMPLETE) => io::ErrorKind::Interrupted,
				Some(ErrorCode::BAD_ITEM) | Some(ErrorCode::USER_UNKNOWN) => io::ErrorKind::NotFound,
				Some(ErrorCode::CRED_INSUFFICIENT) | Some(ErrorCode::PERM_DENIED) => {
					io::ErrorKind::PermissionDenied
				}
				_ => io::ErrorKind::Other,
			},
			Box::new(error),
		)
	}
}

/// Error type for supplementary group operations
///
/// Both variants carry the `errno` of the failed system call.
#[derive(Debug)]
pub enum GroupError {
	/// `getgroups(2)` failed
	Query(io::Error),
	/// `setgroups(2)` failed, e.g. for lack of privilege or a too long list
	Update(io::Error),
}

impl GroupError {
	/// The underlying OS error.
	pub fn os_error(&self) -> &io::Error {
		match self {
			Self::Query(e) | Self::Update(e) => e,
		}
	}
}

impl Display for GroupError {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		match self {
			Self::Query(e) => write!(f, "GetGroups call failed: {}", e),
			Self::Update(e) => write!(f, "SetGroups call failed: {}", e),
		}
	}
}

impl error::Error for GroupError {
	fn source(&self) -> Option<&(dyn error::Error + 'static)> {
		Some(self.os_error())
	}
}

/// Unwraps to the OS error, keeping its `errno`.
impl From<GroupError> for io::Error {
	fn from(error: GroupError) -> Self {
		match error {
			GroupError::Query(e) | GroupError::Update(e) => e,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::error::Error as _;

	#[test]
	fn test_no_msg() {
		let error = Error::from(ErrorCode::BUF_ERR);
		assert_eq!(
			format!("{}", error),
			format!("PAM error code {}", ErrorCode::BUF_ERR.repr())
		);
		assert_eq!(error.message(), None);
		assert_eq!(error.kind(), Some(ErrorCode::BUF_ERR));
		assert!(format!("{:?}", error).contains("BUF_ERR"));
	}

	#[test]
	fn test_unknown_code() {
		let error = Error::new(std::ptr::null_mut(), 4711);
		assert_eq!(error.raw_code(), 4711);
		assert_eq!(error.kind(), None);
		assert_eq!(format!("{}", error), "PAM error code 4711");
	}

	#[test]
	fn test_eq_ignores_msg() {
		let mut error = Error::from(ErrorCode::ABORT);
		let other = error.clone();
		error.msg = "Critical error - immediate abort".into();
		assert_eq!(error, other);
		assert_eq!(
			format!("{}", error),
			format!("PAM error code {}: Critical error - immediate abort", ErrorCode::ABORT.repr())
		);
		assert_eq!(error.message(), Some("Critical error - immediate abort"));
	}

	#[test]
	fn test_io_error() {
		let error: io::Error = Error::from(ErrorCode::USER_UNKNOWN).into();
		assert_eq!(error.kind(), io::ErrorKind::NotFound);
		let error: io::Error = Error::from(ErrorCode::SYSTEM_ERR).into();
		assert_eq!(error.kind(), io::ErrorKind::Other);
	}

	#[test]
	fn test_group_error() {
		let error = GroupError::Query(io::Error::from_raw_os_error(libc::EINVAL));
		assert!(format!("{}", error).starts_with("GetGroups call failed"));
		assert!(error.source().is_some());

		let error = GroupError::Update(io::Error::from_raw_os_error(libc::EPERM));
		assert!(format!("{}", error).starts_with("SetGroups call failed"));
		let error: io::Error = error.into();
		assert_eq!(error.raw_os_error(), Some(libc::EPERM));
		assert_eq!(error.kind(), io::ErrorKind::PermissionDenied);
	}
}
