//! Owned PAM transaction

/***********************************************************************
 * (c) 2021 Christoph Grenz <christophg+gitorious @ grenz-bonn.de>     *
 *                                                                     *
 * This Source Code Form is subject to the terms of the Mozilla Public *
 * License, v. 2.0. If a copy of the MPL was not distributed with this *
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.            *
 ***********************************************************************/

use crate::error::{Error, ErrorCode};
use crate::ffi::null_pam_conv;
use crate::handle::{Handle, ItemType};
use crate::{Result, PAM_SUCCESS};

use libc::{c_int, c_void};
use log::debug;
use pam_sys::{pam_end, pam_set_item, pam_start};
use pam_sys::{pam_conv as PamConversation, pam_handle as PamHandle};
use std::cell::Cell;
use std::ffi::CString;
use std::ptr;

/// Internal: Builds setters for string-typed PAM items.
macro_rules! impl_pam_str_setter {
	($set_name:ident, $item_type:expr, $doc:literal) => {
		#[doc = "Sets "]
		#[doc = $doc]
		pub fn $set_name(&mut self, value: Option<&str>) -> Result<()> {
			self.set_str_item($item_type, value)
		}
	};
}

/// A PAM transaction started and owned by this process
///
/// For applications that don't get a handle passed in by libpam. The
/// transaction has no way to talk to a user: any module asking for input
/// gets a conversation error. Preset the user name when starting.
///
/// The transaction is ended with `pam_end` on drop.
pub struct Transaction {
	handle: *mut PamHandle,
	// Needs to be boxed, as libpam keeps a pointer to it.
	_conversation: Box<PamConversation>,
	last_status: Cell<c_int>,
}

impl Transaction {
	/// Starts a PAM transaction.
	///
	/// # Parameters
	/// - `service` – Name of the service. The policy for the service will be
	///   read from the file /etc/pam.d/*service_name*, falling back to
	///   /etc/pam.conf.
	/// - `username` – Name of the target user.
	///
	/// # Errors
	/// Expected error codes include:
	/// - `ABORT` – General failure
	/// - `BUF_ERR` – Memory allocation failure or NUL byte in a parameter
	/// - `SYSTEM_ERR` – Other system error
	#[rustversion::attr(since(1.48), doc(alias = "pam_start"))]
	pub fn start(service: &str, username: Option<&str>) -> Result<Self> {
		let c_service = CString::new(service).map_err(|_| Error::from(ErrorCode::BUF_ERR))?;
		let c_username = match username {
			None => None,
			Some(name) => Some(CString::new(name).map_err(|_| Error::from(ErrorCode::BUF_ERR))?),
		};
		let conversation = Box::new(null_pam_conv());
		let mut handle: *mut PamHandle = ptr::null_mut();

		let status = unsafe {
			pam_start(
				c_service.as_ptr(),
				c_username.as_ref().map_or(ptr::null(), |s| s.as_ptr()),
				&*conversation,
				&mut handle,
			)
		};
		match status {
			PAM_SUCCESS => {
				// Should not happen, but for safetys sake check for a null
				// pointer on success.
				if handle.is_null() {
					Err(ErrorCode::ABORT.into())
				} else {
					debug!("pam_start: started transaction for service {}", service);
					Ok(Self {
						handle,
						_conversation: conversation,
						last_status: Cell::new(PAM_SUCCESS),
					})
				}
			}
			code => Err(Error::new(handle, code)),
		}
	}

	/// Returns a [`Handle`] for this transaction.
	///
	/// Lookups through the handle count as the last PAM call, so a failed
	/// one is what `pam_end` gets to see on drop.
	pub fn handle(&self) -> Handle<'_> {
		unsafe { Handle::with_status(self.handle, &self.last_status) }
	}

	/// Internal: Wraps a raw PAM return value into a `Result` and sets
	/// `last_status`.
	#[inline]
	fn wrap_pam_return(&self, status: c_int) -> Result<()> {
		self.last_status.set(status);
		match status {
			PAM_SUCCESS => Ok(()),
			code => Err(Error::new(self.handle, code)),
		}
	}

	/// Internal: Sets or clears a string-typed item.
	///
	/// libpam copies the string, so the `CString` may be dropped afterwards.
	fn set_str_item(&mut self, item_type: ItemType, value: Option<&str>) -> Result<()> {
		let cstring = match value {
			None => None,
			Some(string) => Some(
				CString::new(string).map_err(|_| Error::new(self.handle, ErrorCode::BUF_ERR.repr()))?,
			),
		};
		let ptr = cstring
			.as_ref()
			.map_or(ptr::null(), |s| s.as_ptr() as *const c_void);
		self.wrap_pam_return(unsafe { pam_set_item(self.handle, item_type.repr(), ptr) })
	}

	impl_pam_str_setter!(set_rhost, ItemType::RHOST, "the requesting hostname");
	impl_pam_str_setter!(set_ruser, ItemType::RUSER, "the requesting user name");
	impl_pam_str_setter!(set_tty, ItemType::TTY, "the terminal name");
}

/// Destructor ending the PAM transaction
impl Drop for Transaction {
	#[rustversion::attr(since(1.48), doc(alias = "pam_end"))]
	fn drop(&mut self) {
		unsafe { pam_end(self.handle, self.last_status.get()) };
	}
}
