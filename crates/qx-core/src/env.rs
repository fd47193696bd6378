//! Execution environment detection: CI and terminal capabilities.
//!
//! Detection never fails; it only yields defaults that the option layering may
//! override.

use std::io::IsTerminal;

use crate::config::OptionMap;
use crate::logging::LogLevel;

const CI_KEYS: &[&str] = &[
    "CI",
    "GITHUB_ACTIONS",
    "JENKINS_HOME",
    "BUILDKITE",
    "CIRCLECI",
    "TRAVIS",
    "TEAMCITY_VERSION",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Environment {
    pub ci: bool,
    pub stdout_is_tty: bool,
    pub stderr_is_tty: bool,
    pub no_color: bool,
}

/// Defaults derived from an [`Environment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvDefaults {
    pub ci: bool,
    pub color: bool,
    pub progress: bool,
    pub loglevel: Option<LogLevel>,
}

impl Environment {
    pub fn detect() -> Self {
        Self::detect_with(
            |key| std::env::var(key).ok(),
            std::io::stdout().is_terminal(),
            std::io::stderr().is_terminal(),
        )
    }

    pub fn detect_with(
        get_env: impl Fn(&str) -> Option<String>,
        stdout_is_tty: bool,
        stderr_is_tty: bool,
    ) -> Self {
        Self {
            ci: CI_KEYS.iter().any(|key| get_env(key).is_some()),
            stdout_is_tty,
            stderr_is_tty,
            no_color: get_env("NO_COLOR").is_some(),
        }
    }

    /// A non-interactive environment, used where nothing should be detected.
    pub fn headless() -> Self {
        Self {
            ci: false,
            stdout_is_tty: false,
            stderr_is_tty: false,
            no_color: true,
        }
    }

    pub fn defaults(&self) -> EnvDefaults {
        if self.ci || !self.stderr_is_tty {
            EnvDefaults {
                ci: self.ci,
                color: false,
                progress: false,
                loglevel: None,
            }
        } else if !self.stdout_is_tty {
            // Output is piped: keep stderr quiet unless something breaks.
            EnvDefaults {
                ci: self.ci,
                color: !self.no_color,
                progress: false,
                loglevel: Some(LogLevel::Error),
            }
        } else {
            EnvDefaults {
                ci: self.ci,
                color: !self.no_color,
                progress: true,
                loglevel: None,
            }
        }
    }
}

impl EnvDefaults {
    /// The lowest-precedence option layer.
    pub fn to_layer(&self) -> OptionMap {
        let mut layer = OptionMap::new();
        layer.insert("ci".to_string(), self.ci.into());
        layer.insert("color".to_string(), self.color.into());
        layer.insert("progress".to_string(), self.progress.into());
        if let Some(level) = self.loglevel {
            layer.insert("loglevel".to_string(), level.as_str().into());
        }
        layer
    }
}
