#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,

    /// Script execution error (runtime raised an error while executing the user script).
    ScriptError = 20,

    /// Invalid CLI/config/options (bad flags, invalid durations, invalid thresholds syntax, etc.).
    InvalidInput = 30,

    /// Internal/runtime error (IO errors, unexpected invariants, panics caught at top-level).
    RuntimeError = 40,

    /// The run completed but a threshold was violated at some point (checks fold into this via
    /// a threshold defined over their counter; checks have no exit code of their own).
    Tainted = 99,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    #[must_use]
    pub fn from_tainted(tainted: bool) -> Self {
        if tainted { Self::Tainted } else { Self::Success }
    }
}
