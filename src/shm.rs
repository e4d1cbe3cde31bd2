//! Low-level POSIX shared memory operations

use crate::error::{ModswitchError, Result};
use rustix::fd::OwnedFd;
use rustix::fs::{fstat, ftruncate};
use rustix::io::Errno;
use rustix::mm::{mmap, munmap, MapFlags, ProtFlags};
use rustix::shm::{shm_open, shm_unlink, Mode, ShmOFlags};
use std::ffi::CString;
use std::ptr::NonNull;

const MAX_NAME_LEN: usize = 255;

/// Check that `name` is a portable POSIX shm name ("/" followed by one component)
/// and convert it for the syscalls.
pub(crate) fn shm_cname(name: &str) -> Result<CString> {
    let valid = name.len() > 1
        && name.len() <= MAX_NAME_LEN
        && name.starts_with('/')
        && !name[1..].contains('/');
    if !valid {
        return Err(ModswitchError::InvalidName {
            name: name.to_string(),
        });
    }
    CString::new(name).map_err(|_| ModswitchError::InvalidName {
        name: name.to_string(),
    })
}

/// Handle to a mapped shared memory region
pub struct SharedRegion {
    #[allow(dead_code)]
    fd: OwnedFd,
    addr: NonNull<u8>,
    size: usize,
    name: String,
    is_owner: bool,
}

// SAFETY: the mapping stays valid for the lifetime of the handle and every
// access to it goes through atomic byte operations.
unsafe impl Send for SharedRegion {}
unsafe impl Sync for SharedRegion {}

impl SharedRegion {
    /// Create (or take over) a shared memory region and map it read-write
    ///
    /// # Arguments
    /// * `name` - POSIX shm name, e.g. "/modsw"
    /// * `size` - Size in bytes
    ///
    /// An object left behind by a crashed owner is reused rather than
    /// rejected; the caller is expected to hold the instance lock.
    pub fn create(name: &str, size: usize) -> Result<Self> {
        let c_name = shm_cname(name)?;

        // World-readable, owner-writable
        let fd = shm_open(
            c_name.as_c_str(),
            ShmOFlags::CREATE | ShmOFlags::RDWR,
            Mode::RUSR | Mode::WUSR | Mode::RGRP | Mode::ROTH,
        )
        .map_err(|e| ModswitchError::ShmCreate {
            name: name.to_string(),
            source: e.into(),
        })?;

        // From here on the object exists, so failures must unlink it again.
        let unlink_on_err = |err: ModswitchError| {
            let _ = shm_unlink(c_name.as_c_str());
            err
        };

        ftruncate(&fd, size as u64)
            .map_err(|e| unlink_on_err(ModswitchError::Truncate(e.into())))?;

        let addr = map(&fd, size, ProtFlags::READ | ProtFlags::WRITE).map_err(unlink_on_err)?;

        Ok(Self {
            fd,
            addr,
            size,
            name: name.to_string(),
            is_owner: true,
        })
    }

    /// Open an existing region read-only, requiring it to be exactly `size` bytes
    pub fn open_read_only(name: &str, size: usize) -> Result<Self> {
        let c_name = shm_cname(name)?;

        let fd = shm_open(c_name.as_c_str(), ShmOFlags::RDONLY, Mode::empty()).map_err(|e| {
            if e == Errno::NOENT {
                ModswitchError::ChannelNotFound {
                    name: name.to_string(),
                }
            } else {
                ModswitchError::ShmOpen {
                    name: name.to_string(),
                    source: e.into(),
                }
            }
        })?;

        // A zero-length object means the owner has not sized it yet; mapping
        // it anyway would fault on first access.
        let stat = fstat(&fd).map_err(|e| ModswitchError::ShmOpen {
            name: name.to_string(),
            source: e.into(),
        })?;
        let got = stat.st_size.max(0) as u64;
        if got != size as u64 {
            return Err(ModswitchError::ChannelSize {
                name: name.to_string(),
                expected: size,
                got,
            });
        }

        let addr = map(&fd, size, ProtFlags::READ)?;

        Ok(Self {
            fd,
            addr,
            size,
            name: name.to_string(),
            is_owner: false,
        })
    }

    /// Get raw pointer to shared memory
    #[inline(always)]
    pub fn as_ptr(&self) -> *mut u8 {
        self.addr.as_ptr()
    }

    /// Get size of shared memory region
    #[inline(always)]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Get the name of shared memory
    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if this handle owns (and will unlink) the shared memory
    #[inline(always)]
    pub fn is_owner(&self) -> bool {
        self.is_owner
    }
}

fn map(fd: &OwnedFd, size: usize, prot: ProtFlags) -> Result<NonNull<u8>> {
    let addr = unsafe {
        mmap(std::ptr::null_mut(), size, prot, MapFlags::SHARED, fd, 0)
            .map_err(|e| ModswitchError::Mmap(e.into()))?
    };
    NonNull::new(addr.cast::<u8>())
        .ok_or_else(|| ModswitchError::Mmap(std::io::Error::other("mmap returned null")))
}

impl Drop for SharedRegion {
    fn drop(&mut self) {
        unsafe {
            let _ = munmap(self.addr.as_ptr().cast(), self.size);
        }

        if self.is_owner {
            if let Ok(c_name) = CString::new(self.name.as_str()) {
                let _ = shm_unlink(c_name.as_c_str());
            }
        }
    }
}
