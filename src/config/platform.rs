//! Host platform selection
//!
//! The save directory differs between Windows and POSIX hosts. The platform
//! is detected once at startup and then passed around as a plain value, so the
//! rest of the library never inspects the host itself.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which family of save path applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Unix,
}

impl Platform {
    /// The platform this binary was built for
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Windows => write!(f, "windows"),
            Platform::Unix => write!(f, "unix"),
        }
    }
}
