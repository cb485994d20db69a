//! Environment detection for terminal prompts.
//!
//! Collects information about the user's environment so suggested commands
//! match their platform and shell.

use anyhow::{bail, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Target platform for suggested commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    Mac,
    Windows,
}

impl Platform {
    /// Platform this binary runs on; anything unknown is treated as Linux.
    pub fn detect() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    fn from_os(os: &str) -> Self {
        match os {
            "macos" => Platform::Mac,
            "windows" => Platform::Windows,
            _ => Platform::Linux,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Linux => "linux",
            Platform::Mac => "mac",
            Platform::Windows => "windows",
        };
        f.write_str(name)
    }
}

impl FromStr for Platform {
    type Err = anyhow::Error;

    /// Accepts `auto` as well as the platform names.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::detect()),
            "linux" => Ok(Platform::Linux),
            "mac" | "macos" | "darwin" => Ok(Platform::Mac),
            "windows" | "win" => Ok(Platform::Windows),
            other => bail!("Unknown platform '{}': use auto, linux, mac or windows", other),
        }
    }
}

/// The user's shell environment.
#[derive(Debug, Clone)]
pub struct Environment {
    pub platform: Platform,
    pub shell: String,
    pub cwd: PathBuf,
    /// Linux distribution or macOS version, when known.
    pub distro: Option<String>,
}

impl Environment {
    /// Gather the environment, targeting `platform`.
    pub fn gather(platform: Platform) -> Self {
        Self {
            platform,
            shell: get_shell(),
            cwd: get_cwd(),
            distro: if platform == Platform::detect() {
                get_distro_info()
            } else {
                None
            },
        }
    }

    /// Short description used inside prompts.
    pub fn describe(&self) -> String {
        let mut out = format!("Platform: {}", self.platform);
        if let Some(distro) = &self.distro {
            out.push_str(&format!(" ({})", distro));
        }
        out.push_str(&format!("\nShell: {}", self.shell));
        out.push_str(&format!("\nWorking directory: {}", self.cwd.display()));
        out
    }
}

/// Get the current working directory.
fn get_cwd() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Get the user's shell from $SHELL environment variable.
fn get_shell() -> String {
    std::env::var("SHELL").unwrap_or_else(|_| {
        if cfg!(windows) {
            "powershell".to_string()
        } else {
            "/bin/sh".to_string()
        }
    })
}

/// Get Linux distribution info from /etc/os-release.
fn get_distro_info() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        if let Ok(contents) = std::fs::read_to_string("/etc/os-release") {
            return parse_pretty_name(&contents);
        }
    }

    #[cfg(target_os = "macos")]
    {
        use std::process::Command;
        if let Ok(output) = Command::new("sw_vers").arg("-productVersion").output() {
            if output.status.success() {
                let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
                return Some(format!("macOS {}", version));
            }
        }
    }

    None
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_pretty_name(os_release: &str) -> Option<String> {
    os_release
        .lines()
        .find_map(|line| line.strip_prefix("PRETTY_NAME="))
        .map(|name| name.trim_matches('"').to_string())
}
