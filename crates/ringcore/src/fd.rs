//! Move-only owned file descriptor, closing on drop.

use std::fmt;

/// Single-owner wrapper around a raw Unix file descriptor.
///
/// Mirrors the classic `unique_socket` pattern: exactly one `OwnedFd`
/// ever holds a given descriptor, and dropping it closes the descriptor.
/// Copying is impossible by construction; moving is the only way to
/// transfer ownership, and leaves the source empty.
pub struct OwnedFd {
    raw: i32,
}

impl OwnedFd {
    pub const NONE: i32 = -1;

    /// Takes ownership of `raw`. Caller must not close `raw` itself afterward.
    #[inline]
    pub fn from_raw(raw: i32) -> Self {
        Self { raw }
    }

    #[inline]
    pub fn raw(&self) -> i32 {
        self.raw
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.raw >= 0
    }

    /// Releases ownership without closing, returning the raw descriptor.
    #[inline]
    pub fn into_raw(mut self) -> i32 {
        let raw = self.raw;
        self.raw = Self::NONE;
        raw
    }

    fn close(&mut self) {
        if self.raw >= 0 {
            unsafe {
                libc::close(self.raw);
            }
            self.raw = Self::NONE;
        }
    }
}

impl Drop for OwnedFd {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for OwnedFd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedFd").field("raw", &self.raw).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_tracks_validity() {
        let fd = OwnedFd::from_raw(3);
        assert!(fd.is_valid());
        assert_eq!(fd.raw(), 3);
    }

    #[test]
    fn into_raw_releases_without_closing() {
        let fd = OwnedFd::from_raw(3);
        let raw = fd.into_raw();
        assert_eq!(raw, 3);
    }

    #[test]
    fn negative_raw_is_invalid() {
        let fd = OwnedFd::from_raw(-1);
        assert!(!fd.is_valid());
    }
}
