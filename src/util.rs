use std::fmt;
use std::time::{Duration, Instant};

use crate::Error;

/// Log wire data at trace level, one row per line in the data.
pub(crate) fn log_data(data: &[u8]) {
    if !log_enabled!(log::Level::Trace) {
        return;
    }

    for row in data.split_inclusive(|c| *c == b'\n') {
        trace!("{:?}", Row(row));
    }
}

struct Row<'a>(&'a [u8]);

impl fmt::Debug for Row<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"")?;
        for c in self.0 {
            match c {
                b'\r' => write!(f, "\\r")?,
                b'\n' => write!(f, "\\n")?,
                b'\t' => write!(f, "\\t")?,
                b'"' => write!(f, "\\\"")?,
                0x20..=0x7e => write!(f, "{}", *c as char)?,
                _ => write!(f, "\\x{:02x}", c)?,
            }
        }
        write!(f, "\"")
    }
}

/// Point in time when the whole operation must be done.
#[derive(Debug, Clone, Copy, Default)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// A deadline that never passes.
    pub const NONE: Deadline = Deadline(None);

    pub(crate) fn after(timeout: Option<Duration>) -> Deadline {
        Deadline(timeout.and_then(|t| Instant::now().checked_add(t)))
    }

    /// Time left, `None` for no deadline.
    ///
    /// Errors with [`Error::Timeout`] once the deadline has passed.
    pub fn remaining(&self) -> Result<Option<Duration>, Error> {
        let Some(at) = self.0 else {
            return Ok(None);
        };

        let now = Instant::now();
        if now >= at {
            return Err(Error::Timeout);
        }

        Ok(Some(at - now))
    }
}

/// Strip the brackets of an IPv6 literal host, `[::1]` -> `::1`.
pub(crate) fn unbracket(host: &str) -> &str {
    host.strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host)
}
