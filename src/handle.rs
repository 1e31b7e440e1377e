//! Borrowed PAM transaction handle and its accessors

/***********************************************************************
 * (c) 2021 Christoph Grenz <christophg+gitorious @ grenz-bonn.de>     *
 *                                                                     *
 * This Source Code Form is subject to the terms of the Mozilla Public *
 * License, v. 2.0. If a copy of the MPL was not distributed with this *
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.            *
 ***********************************************************************/

use crate::error::{Error, ErrorCode};
use crate::ffi::pam_get_user;
use crate::{Result, PAM_SUCCESS};

use enum_repr::EnumRepr;
use libc::{c_char, c_int, c_void};
use log::trace;
use pam_sys::pam_get_item;
use pam_sys::pam_handle as PamHandle;
use std::cell::Cell;
use std::ffi::CStr;
use std::fmt;
use std::marker::PhantomData;
use std::ptr;

/// String-typed PAM items
#[allow(non_camel_case_types)]
#[EnumRepr(type = "c_int")]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ItemType {
	/// The service name
	SERVICE = pam_sys::PAM_SERVICE as c_int,
	/// The username of the entity under whose identity service will be given
	USER = pam_sys::PAM_USER as c_int,
	/// The terminal name
	TTY = pam_sys::PAM_TTY as c_int,
	/// The requesting hostname
	RHOST = pam_sys::PAM_RHOST as c_int,
	/// The requesting user name
	RUSER = pam_sys::PAM_RUSER as c_int,
	/// The string used when prompting for a user's name
	USER_PROMPT = pam_sys::PAM_USER_PROMPT as c_int,
}

/// Internal: Builds getters for optional string-typed PAM items.
macro_rules! impl_pam_str_item {
	($name:ident, $item_type:expr, $doc:literal) => {
		#[doc = "Returns "]
		#[doc = $doc]
		#[doc = "\n\n`None` if the item isn't set."]
		pub fn $name(&self) -> Result<Option<String>> {
			self.item($item_type)
		}
	};
}

/// Reference to a live PAM transaction
///
/// The transaction is owned by whoever started it (libpam calling into a
/// module, or a [`Transaction`][`crate::Transaction`]); a `Handle` only
/// operates on it. It must refer to a valid, still open transaction
/// whenever one of its methods is called.
///
/// A handle wrapping a null pointer is allowed. All accessors fail with
/// [`ErrorCode::SYSTEM_ERR`] on it, like libpam does.
pub struct Handle<'a> {
	ptr: *mut PamHandle,
	// Status of the last libpam call, shared with an owning `Transaction`.
	last_status: Option<&'a Cell<c_int>>,
	_transaction: PhantomData<&'a mut PamHandle>,
}

impl<'a> Handle<'a> {
	/// Wraps a raw `pam_handle_t` pointer.
	///
	/// # Safety
	/// `ptr` must be null or point to a PAM transaction that stays open
	/// for `'a` and is not used concurrently from another thread.
	pub unsafe fn from_raw(ptr: *mut PamHandle) -> Self {
		Self {
			ptr,
			last_status: None,
			_transaction: PhantomData,
		}
	}

	/// Internal: Wraps the handle of an owned transaction, recording the
	/// status of every libpam call in `last_status`.
	pub(crate) unsafe fn with_status(ptr: *mut PamHandle, last_status: &'a Cell<c_int>) -> Self {
		Self {
			ptr,
			last_status: Some(last_status),
			_transaction: PhantomData,
		}
	}

	/// Returns the wrapped raw pointer.
	#[must_use]
	pub const fn as_ptr(&self) -> *mut PamHandle {
		self.ptr
	}

	/// Internal: Fails early on a null handle.
	fn check(&self) -> Result<*mut PamHandle> {
		if self.ptr.is_null() {
			Err(ErrorCode::SYSTEM_ERR.into())
		} else {
			Ok(self.ptr)
		}
	}

	/// Internal: Wraps a raw PAM return value into a `Result` and records
	/// it as the last status, if there is an owner to report to.
	#[inline]
	fn wrap_pam_return(&self, status: c_int) -> Result<()> {
		if let Some(last_status) = self.last_status {
			last_status.set(status);
		}
		match status {
			PAM_SUCCESS => Ok(()),
			code => Err(Error::new(self.ptr, code)),
		}
	}

	/// Returns the name of the user being authenticated.
	///
	/// Asks libpam with `pam_get_user`, so if no user is set yet the
	/// transaction's conversation handler may be asked for one.
	///
	/// # Errors
	/// Expected error codes include:
	/// - `SYSTEM_ERR` – Null or otherwise invalid handle
	/// - `CONV_ERR` – No user set and the conversation failed to get one
	/// - `USER_UNKNOWN` – No user name could be determined
	/// - `INCOMPLETE` – The conversation handler asked to try again later
	#[rustversion::attr(since(1.48), doc(alias = "pam_get_user"))]
	pub fn user(&self) -> Result<String> {
		let pamh = self.check()?;
		let mut user: *const c_char = ptr::null();
		self.wrap_pam_return(unsafe { pam_get_user(pamh, &mut user, ptr::null()) })?;
		if user.is_null() {
			return Err(Error::new(pamh, ErrorCode::USER_UNKNOWN.repr()));
		}
		let user = unsafe { CStr::from_ptr(user) }.to_string_lossy().into_owned();
		trace!("pam_get_user: {}", user);
		Ok(user)
	}

	/// Returns the remote host of the transaction (`PAM_RHOST`).
	///
	/// # Errors
	/// Expected error codes include:
	/// - `SYSTEM_ERR` – Null or otherwise invalid handle
	/// - `BAD_ITEM` – No remote host is set
	#[rustversion::attr(since(1.48), doc(alias = "PAM_RHOST"))]
	pub fn remote_host(&self) -> Result<String> {
		match self.item(ItemType::RHOST)? {
			Some(host) => Ok(host),
			None => Err(Error::new(self.ptr, ErrorCode::BAD_ITEM.repr())),
		}
	}

	/// Returns a string-typed PAM item.
	///
	/// # Errors
	/// Expected error codes include:
	/// - `SYSTEM_ERR` – Null or otherwise invalid handle
	/// - `BAD_ITEM` – Unsupported, undefined or inaccessible item
	/// - `BUF_ERR` – Memory buffer error
	#[rustversion::attr(since(1.48), doc(alias = "pam_get_item"))]
	pub fn item(&self, item_type: ItemType) -> Result<Option<String>> {
		let pamh = self.check()?;
		let mut result: *const c_void = ptr::null();
		self.wrap_pam_return(unsafe { pam_get_item(pamh, item_type.repr(), &mut result) })?;
		if result.is_null() {
			trace!("pam_get_item({:?}): not set", item_type);
			return Ok(None);
		}
		let string = unsafe { CStr::from_ptr(result as *const c_char) }
			.to_string_lossy()
			.into_owned();
		trace!("pam_get_item({:?}): {}", item_type, string);
		Ok(Some(string))
	}

	impl_pam_str_item!(service, ItemType::SERVICE, "the service name");
	impl_pam_str_item!(ruser, ItemType::RUSER, "the requesting user name");
	impl_pam_str_item!(tty, ItemType::TTY, "the terminal name");
}

impl fmt::Debug for Handle<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Handle").field(&self.ptr).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_null_handle() {
		let handle = unsafe { Handle::from_raw(ptr::null_mut()) };
		assert!(handle.as_ptr().is_null());

		let error = handle.user().unwrap_err();
		assert_eq!(error.kind(), Some(ErrorCode::SYSTEM_ERR));
		let error = handle.remote_host().unwrap_err();
		assert_eq!(error.kind(), Some(ErrorCode::SYSTEM_ERR));
		assert!(handle.service().is_err());
		assert!(handle.item(ItemType::TTY).is_err());
		assert!(format!("{}", error).starts_with("PAM error code"));
	}

	#[test]
	fn test_item_type_repr() {
		assert_eq!(ItemType::RHOST.repr(), pam_sys::PAM_RHOST as c_int);
		assert_eq!(ItemType::from_repr(pam_sys::PAM_USER as c_int), Some(ItemType::USER));
	}
}
