use std::fmt;
use std::str::FromStr;

/// Host platform family, as far as invoking the worker is concerned.
///
/// - `Windows`: scripts need an explicit host (`cmd.exe`, `powershell.exe`)
///   and the executable is probed across `PATH` x `PATHEXT`.
/// - `Unix`: the worker name is handed to the OS as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Unix,
}

impl Platform {
    /// Platform this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Platform::current()
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "windows" | "win32" => Ok(Platform::Windows),
            "unix" | "linux" | "macos" => Ok(Platform::Unix),
            other => Err(format!(
                "invalid platform: {other} (expected \"windows\" or \"unix\")"
            )),
        }
    }
}

/// How a supervised run ended, as written into the end banner of each log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnding {
    Ok,
    Exit(i32),
    Timeout,
    Error,
    ResultDetected,
}

impl fmt::Display for RunEnding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunEnding::Ok => f.write_str("ok"),
            RunEnding::Exit(code) => write!(f, "exit {code}"),
            RunEnding::Timeout => f.write_str("timeout"),
            RunEnding::Error => f.write_str("error"),
            RunEnding::ResultDetected => f.write_str("result detected, terminated"),
        }
    }
}
