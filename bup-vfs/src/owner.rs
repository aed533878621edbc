//! Owner and group name lookup with a per-session cache.

use std::collections::HashMap;
use std::ffi::CStr;

/// Maps numeric ids to names.
pub trait NameLookup {
    fn user_name(&self, uid: u32) -> Option<String>;
    fn group_name(&self, gid: u32) -> Option<String>;
}

/// Looks names up in the system user and group databases.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemNames;

const MAX_LOOKUP_BUFFER: usize = 1 << 20;

fn initial_buffer_len(key: libc::c_int) -> usize {
    let n = unsafe { libc::sysconf(key) };
    if n > 0 {
        n as usize
    } else {
        2048
    }
}

impl NameLookup for SystemNames {
    fn user_name(&self, uid: u32) -> Option<String> {
        let mut buf = vec![0u8; initial_buffer_len(libc::_SC_GETPW_R_SIZE_MAX)];
        loop {
            let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
            let mut result: *mut libc::passwd = std::ptr::null_mut();

            let rc = unsafe {
                libc::getpwuid_r(
                    uid as libc::uid_t,
                    &mut pwd as *mut libc::passwd,
                    buf.as_mut_ptr() as *mut libc::c_char,
                    buf.len(),
                    &mut result as *mut *mut libc::passwd,
                )
            };

            if rc == libc::ERANGE && buf.len() < MAX_LOOKUP_BUFFER {
                buf.resize(buf.len() * 2, 0);
                continue;
            }
            if rc != 0 || result.is_null() {
                return None;
            }

            let name = unsafe { CStr::from_ptr(pwd.pw_name) };
            return Some(name.to_string_lossy().into_owned());
        }
    }

    fn group_name(&self, gid: u32) -> Option<String> {
        let mut buf = vec![0u8; initial_buffer_len(libc::_SC_GETGR_R_SIZE_MAX)];
        loop {
            let mut grp: libc::group = unsafe { std::mem::zeroed() };
            let mut result: *mut libc::group = std::ptr::null_mut();

            let rc = unsafe {
                libc::getgrgid_r(
                    gid as libc::gid_t,
                    &mut grp as *mut libc::group,
                    buf.as_mut_ptr() as *mut libc::c_char,
                    buf.len(),
                    &mut result as *mut *mut libc::group,
                )
            };

            if rc == libc::ERANGE && buf.len() < MAX_LOOKUP_BUFFER {
                buf.resize(buf.len() * 2, 0);
                continue;
            }
            if rc != 0 || result.is_null() {
                return None;
            }

            let name = unsafe { CStr::from_ptr(grp.gr_name) };
            return Some(name.to_string_lossy().into_owned());
        }
    }
}

/// Memoizes successful lookups for the lifetime of a session.
///
/// Failed lookups are not remembered: every miss asks the lookup again and
/// falls back to the decimal id.
#[derive(Debug, Default)]
pub struct OwnerCache<L = SystemNames> {
    lookup: L,
    users: HashMap<u32, String>,
    groups: HashMap<u32, String>,
}

impl<L: NameLookup> OwnerCache<L> {
    pub fn new(lookup: L) -> OwnerCache<L> {
        OwnerCache {
            lookup,
            users: HashMap::new(),
            groups: HashMap::new(),
        }
    }

    pub fn user(&mut self, uid: u32) -> String {
        if let Some(name) = self.users.get(&uid) {
            return name.clone();
        }
        match self.lookup.user_name(uid) {
            Some(name) => {
                self.users.insert(uid, name.clone());
                name
            }
            None => uid.to_string(),
        }
    }

    pub fn group(&mut self, gid: u32) -> String {
        if let Some(name) = self.groups.get(&gid) {
            return name.clone();
        }
        match self.lookup.group_name(gid) {
            Some(name) => {
                self.groups.insert(gid, name.clone());
                name
            }
            None => gid.to_string(),
        }
    }
}
