//! Session bookkeeping for a meter connection
//!
//! A session tracks:
//! - Last classified error (type + code)
//! - Successful operation counter
//! - Failed operation counter
//!
//! Nothing here is reset implicitly. Counters and the last error only go back
//! to zero through the `clear_*` methods or the `clear` flag of the getters.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::error::{ErrorCode, ErrorKind, ErrorType};

/// Session state
///
/// Cheap to clone (Arc internally); clones observe the same counters, so a
/// monitoring task can read statistics while the meter is in use.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    success_count: AtomicU32,
    error_count: AtomicU32,
    last_error: parking_lot::RwLock<ErrorKind>,
}

impl Session {
    /// Create a session with cleared counters
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SessionInner {
                success_count: AtomicU32::new(0),
                error_count: AtomicU32::new(0),
                last_error: parking_lot::RwLock::new(ErrorKind::NONE),
            }),
        }
    }

    /// Record a successful operation
    pub fn record_success(&self) {
        self.inner.success_count.fetch_add(1, Ordering::AcqRel);
    }

    /// Record a failed operation and remember its classification
    pub fn record_failure(&self, kind: ErrorKind) {
        *self.inner.last_error.write() = kind;
        self.inner.error_count.fetch_add(1, Ordering::AcqRel);
    }

    /// Last classified error
    pub fn last_error(&self) -> ErrorKind {
        *self.inner.last_error.read()
    }

    /// Forget the last error (type and code)
    pub fn clear_last_error(&self) {
        *self.inner.last_error.write() = ErrorKind::NONE;
    }

    /// Type of the last error, optionally clearing it
    pub fn error_type(&self, clear: bool) -> ErrorType {
        let mut last = self.inner.last_error.write();
        let error_type = last.error_type;
        if clear {
            last.error_type = ErrorType::None;
        }
        error_type
    }

    /// Code of the last error, optionally clearing it
    pub fn error_code(&self, clear: bool) -> ErrorCode {
        let mut last = self.inner.last_error.write();
        let code = last.code;
        if clear {
            last.code = ErrorCode::NoError;
        }
        code
    }

    /// Number of failed operations, optionally clearing it
    pub fn error_count(&self, clear: bool) -> u32 {
        if clear {
            self.inner.error_count.swap(0, Ordering::AcqRel)
        } else {
            self.inner.error_count.load(Ordering::Acquire)
        }
    }

    /// Number of successful operations, optionally clearing it
    pub fn success_count(&self, clear: bool) -> u32 {
        if clear {
            self.inner.success_count.swap(0, Ordering::AcqRel)
        } else {
            self.inner.success_count.load(Ordering::Acquire)
        }
    }

    pub fn clear_error_type(&self) {
        self.inner.last_error.write().error_type = ErrorType::None;
    }

    pub fn clear_error_code(&self) {
        self.inner.last_error.write().code = ErrorCode::NoError;
    }

    pub fn clear_error_count(&self) {
        self.inner.error_count.store(0, Ordering::Release);
    }

    pub fn clear_success_count(&self) {
        self.inner.success_count.store(0, Ordering::Release);
    }

    /// Human readable type of the last error
    pub fn type_str(&self, clear: bool) -> &'static str {
        self.error_type(clear).description()
    }

    /// Human readable description of the last error
    pub fn error_str(&self, clear: bool) -> &'static str {
        self.error_code(clear).description()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
