use std::sync::atomic::{AtomicU64, Ordering};

/// Issues reference numbers from a process-wide atomic counter
///
/// Numbers are strictly increasing in issue order. Zero is never issued, and
/// values whose decimal form contains a run of two or more zeros are skipped.
#[derive(Debug)]
pub struct ReferenceIssuer {
    prefix: String,
    next: AtomicU64,
}

impl ReferenceIssuer {
    pub fn new(prefix: impl Into<String>, start: u64) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(start.max(1)),
        }
    }

    /// Issue the next reference number
    pub fn issue(&self) -> String {
        loop {
            let value = self.next.fetch_add(1, Ordering::Relaxed);
            if is_issuable(value) {
                return format!("{}-{}", self.prefix, value);
            }
        }
    }

    pub fn issue_many(&self, count: usize) -> Vec<String> {
        (0..count).map(|_| self.issue()).collect()
    }
}

/// True when the decimal form of `value` contains "00"
pub fn has_zero_run(value: u64) -> bool {
    value.to_string().contains("00")
}

#[inline]
fn is_issuable(value: u64) -> bool {
    value != 0 && !has_zero_run(value)
}
