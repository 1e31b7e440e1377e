//! Raw libpam declarations and the conversation callback for owned transactions

/***********************************************************************
 * (c) 2021-2022 Christoph Grenz <christophg+gitorious @ grenz-bonn.de>*
 *                                                                     *
 * This Source Code Form is subject to the terms of the Mozilla Public *
 * License, v. 2.0. If a copy of the MPL was not distributed with this *
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.            *
 ***********************************************************************/

use libc::{c_char, c_int, c_void};
use pam_sys::PAM_CONV_ERR;
use pam_sys::{
	pam_conv as PamConversation, pam_handle as PamHandle, pam_message as PamMessage,
	pam_response as PamResponse,
};
use std::ptr;

extern "C" {
	// Part of the module-side API (`security/pam_modules.h`), which the
	// application bindings of `pam-sys` don't cover.
	pub(crate) fn pam_get_user(
		pamh: *mut PamHandle,
		user: *mut *const c_char,
		prompt: *const c_char,
	) -> c_int;
}

/// Builds the `pam_conv` struct handed to `pam_start`.
///
/// Transactions started by this crate never talk to a user, so there is no
/// application data to carry.
pub(crate) fn null_pam_conv() -> PamConversation {
	PamConversation {
		conv: Some(pam_converse_null),
		appdata_ptr: ptr::null_mut(),
	}
}

/// Conversation function C library callback.
///
/// Refuses every message. Modules that need input fail with `CONV_ERR`
/// instead of blocking on a terminal that isn't there.
pub(crate) unsafe extern "C" fn pam_converse_null(
	_num_msg: c_int,
	_msg: *mut *const PamMessage,
	out_resp: *mut *mut PamResponse,
	_appdata_ptr: *mut c_void,
) -> c_int {
	if !out_resp.is_null() {
		*out_resp = ptr::null_mut();
	}
	PAM_CONV_ERR as c_int
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_null_conv_refuses() {
		let pam_conv = null_pam_conv();
		let c_callback = pam_conv.conv.unwrap();
		assert!(pam_conv.appdata_ptr.is_null());

		let mut responses: *mut PamResponse = 1 as *mut PamResponse;
		let result = unsafe {
			c_callback(1, ptr::null_mut(), &mut responses as *mut *mut _, ptr::null_mut())
		};
		assert_eq!(result, PAM_CONV_ERR as c_int);
		assert!(responses.is_null(), "response pointer wasn't reset");

		// A null `out_resp` must not be written through
		let result = unsafe { c_callback(0, ptr::null_mut(), ptr::null_mut(), ptr::null_mut()) };
		assert_eq!(result, PAM_CONV_ERR as c_int);
	}
}
