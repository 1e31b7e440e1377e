/*!
 * Authentication context and supplementary group helpers for Pluggable
 * Authentication Modules (PAM)
 *
 * A privileged process that took part in a PAM transaction (a login or
 * session daemon, or a PAM module running inside one) usually needs two
 * things afterwards: who was authenticated, from where, and precise
 * control over which supplementary groups it keeps running with.
 *
 * This library provides both:
 * - [`Handle`] wraps a live PAM transaction and reads the user and the
 *   remote host from it. [`Transaction`] starts an owned transaction for
 *   applications that don't receive a handle from the PAM framework.
 * - [`get_groups()`], [`set_groups()`], [`add_group()`] and [`drop_group()`]
 *   read and modify the supplementary groups of the calling process. They
 *   are built on the [`CredentialStore`] trait, so the same logic runs
 *   against [`cred_mock::Credentials`] in tests.
 *
 * # Examples
 *
 * Inside a PAM module, with the handle passed in by libpam:
 *
 * ```no_run
 * use pam_authctx::Handle;
 * # let pamh: *mut pam_sys::pam_handle = std::ptr::null_mut();
 *
 * let handle = unsafe { Handle::from_raw(pamh) };
 * let user = handle.user().expect("No user in PAM transaction");
 * let rhost = handle.remote_host().expect("No remote host in PAM transaction");
 * println!("{} logged in from {}", user, rhost);
 * ```
 *
 * Adjusting the supplementary groups before dropping privileges:
 *
 * ```no_run
 * use pam_authctx::{add_group, drop_group, get_groups};
 *
 * add_group(100).expect("Adding group failed");     // e.g. "users"
 * drop_group(0).expect("Dropping group failed");    // never keep "root"
 * println!("now running with groups {:?}", get_groups().unwrap());
 * ```
 *
 * Starting a transaction of your own:
 *
 * ```no_run
 * use pam_authctx::Transaction;
 *
 * let mut transaction = Transaction::start("my-service", Some("username"))
 *     .expect("Failed to initialize PAM context");
 * transaction.set_rhost(Some("client.example.org")).unwrap();
 * assert_eq!(transaction.handle().remote_host().unwrap(), "client.example.org");
 * ```
 */

/***********************************************************************
 * (c) 2021 Christoph Grenz <christophg+gitorious @ grenz-bonn.de>     *
 *                                                                     *
 * This Source Code Form is subject to the terms of the Mozilla Public *
 * License, v. 2.0. If a copy of the MPL was not distributed with this *
 * file, You can obtain one at http://mozilla.org/MPL/2.0/.            *
 ***********************************************************************/

mod error;
mod ffi;
mod groups;
mod handle;
mod transaction;
pub mod cred_mock;

use libc::{c_char, c_int};
use std::ffi::CStr;

pub use error::{Error, GroupError};
pub use groups::{add_group, drop_group, get_groups, set_groups};
pub use groups::{CredentialStore, Gid, ProcessCredentials};
pub use handle::{Handle, ItemType};
pub use transaction::Transaction;

use enum_repr::EnumRepr;
use pam_sys::*;

fn char_ptr_to_str<'a>(ptr: *const c_char) -> Option<&'a str> {
	if ptr.is_null() {
		None
	} else {
		let cstr = unsafe { CStr::from_ptr(ptr) };
		match cstr.to_str() {
			Err(_) => None,
			Ok(s) => Some(s),
		}
	}
}

#[allow(non_camel_case_types)]
#[EnumRepr(type = "c_int")]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorCode {
	OPEN_ERR = PAM_OPEN_ERR as c_int,
	SYMBOL_ERR = PAM_SYMBOL_ERR as c_int,
	SERVICE_ERR = PAM_SERVICE_ERR as c_int,
	SYSTEM_ERR = PAM_SYSTEM_ERR as c_int,
	BUF_ERR = PAM_BUF_ERR as c_int,
	PERM_DENIED = PAM_PERM_DENIED as c_int,
	AUTH_ERR = PAM_AUTH_ERR as c_int,
	CRED_INSUFFICIENT = PAM_CRED_INSUFFICIENT as c_int,
	AUTHINFO_UNAVAIL = PAM_AUTHINFO_UNAVAIL as c_int,
	USER_UNKNOWN = PAM_USER_UNKNOWN as c_int,
	MAXTRIES = PAM_MAXTRIES as c_int,
	NEW_AUTHTOK_REQD = PAM_NEW_AUTHTOK_REQD as c_int,
	ACCT_EXPIRED = PAM_ACCT_EXPIRED as c_int,
	SESSION_ERR = PAM_SESSION_ERR as c_int,
	CRED_UNAVAIL = PAM_CRED_UNAVAIL as c_int,
	CRED_EXPIRED = PAM_CRED_EXPIRED as c_int,
	CRED_ERR = PAM_CRED_ERR as c_int,
	CONV_ERR = PAM_CONV_ERR as c_int,
	AUTHTOK_ERR = PAM_AUTHTOK_ERR as c_int,
	AUTHTOK_RECOVERY_ERR = PAM_AUTHTOK_RECOVERY_ERR as c_int,
	AUTHTOK_LOCK_BUSY = PAM_AUTHTOK_LOCK_BUSY as c_int,
	AUTHTOK_DISABLE_AGING = PAM_AUTHTOK_DISABLE_AGING as c_int,
	ABORT = PAM_ABORT as c_int,
	AUTHTOK_EXPIRED = PAM_AUTHTOK_EXPIRED as c_int,
	MODULE_UNKNOWN = PAM_MODULE_UNKNOWN as c_int,
	BAD_ITEM = PAM_BAD_ITEM as c_int,
	CONV_AGAIN = PAM_CONV_AGAIN as c_int,
	INCOMPLETE = PAM_INCOMPLETE as c_int,
}

/// Type alias for the result of PAM methods.
pub type Result<T> = std::result::Result<T, Error>;
/// Type alias for the result of supplementary group operations.
pub type GroupResult<T> = std::result::Result<T, GroupError>;

const PAM_SUCCESS: c_int = pam_sys::PAM_SUCCESS as c_int;
