#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,

    /// One or more simulated clients ended in `failed`.
    ClientsFailed = 10,

    /// Invalid CLI input (bad flags, durations, patterns, base URL, client count).
    InvalidInput = 30,

    /// Internal/runtime error, including an interrupted run.
    RuntimeError = 40,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    #[must_use]
    pub fn from_failed_clients(failed: usize) -> Self {
        if failed == 0 {
            Self::Success
        } else {
            Self::ClientsFailed
        }
    }
}
