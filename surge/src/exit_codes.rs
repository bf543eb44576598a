#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,

    /// Invalid CLI flags or values (unknown subcommand, zero group width, bad timeout, etc.).
    InvalidInput = 30,

    /// Runtime error (socket bind failures, unreachable report server, IO errors).
    RuntimeError = 40,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}
