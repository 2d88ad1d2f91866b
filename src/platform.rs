//! Platform detection and the capability gate.
//!
//! Every public operation of [`crate::ScreenStatusDetect`] passes through a
//! [`CapabilityGate`] before it reaches the native sensor. Operations the
//! current platform cannot serve are short-circuited: a diagnostic naming the
//! operation is logged and the caller gets [`Capability::Unsupported`] instead
//! of an error.

use crate::error::ScreenStatusError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Target environment tag consulted by the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
    Macos,
    Windows,
    Linux,
    Other,
}

impl Platform {
    /// Platform this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(target_os = "android") {
            Platform::Android
        } else if cfg!(target_os = "ios") {
            Platform::Ios
        } else if cfg!(target_os = "macos") {
            Platform::Macos
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "linux") {
            Platform::Linux
        } else {
            Platform::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Android => "android",
            Platform::Ios => "ios",
            Platform::Macos => "macos",
            Platform::Windows => "windows",
            Platform::Linux => "linux",
            Platform::Other => "other",
        }
    }

    /// Parse a platform tag, case-insensitively.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().as_str() {
            "android" => Some(Platform::Android),
            "ios" => Some(Platform::Ios),
            "macos" | "darwin" => Some(Platform::Macos),
            "windows" => Some(Platform::Windows),
            "linux" => Some(Platform::Linux),
            "other" => Some(Platform::Other),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every operation the gate knows how to answer for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    GetCurrentStatus,
    AddListener,
    RemoveListener,
    GetCertificateFingerprint,
    GetCertificateValue,
    EnableSecureScreen,
    DisableSecureScreen,
    /// Native arm signal, sent when the first listener appears.
    Subscribe,
    /// Native disarm signal, sent when the last listener goes away.
    Unsubscribe,
    IsEmulator,
    CheckIsBlueStacks,
}

impl Operation {
    pub const ALL: [Operation; 11] = [
        Operation::GetCurrentStatus,
        Operation::AddListener,
        Operation::RemoveListener,
        Operation::GetCertificateFingerprint,
        Operation::GetCertificateValue,
        Operation::EnableSecureScreen,
        Operation::DisableSecureScreen,
        Operation::Subscribe,
        Operation::Unsubscribe,
        Operation::IsEmulator,
        Operation::CheckIsBlueStacks,
    ];

    /// Name of the operation as application code sees it.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::GetCurrentStatus => "getCurrentStatus",
            Operation::AddListener => "addListener",
            Operation::RemoveListener => "removeListener",
            Operation::GetCertificateFingerprint => "getCertificateFingerprint",
            Operation::GetCertificateValue => "getCertificateValue",
            Operation::EnableSecureScreen => "enableSecureScreen",
            Operation::DisableSecureScreen => "disableSecureScreen",
            Operation::Subscribe => "subscribe",
            Operation::Unsubscribe => "unsubscribe",
            Operation::IsEmulator => "isEmulator",
            Operation::CheckIsBlueStacks => "checkIsBlueStacks",
        }
    }

    /// Whether the operation needs the Android native module.
    pub fn android_only(&self) -> bool {
        !matches!(
            self,
            Operation::GetCurrentStatus | Operation::AddListener | Operation::RemoveListener
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Platform-support check guarding every call into the native sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityGate {
    platform: Platform,
}

impl CapabilityGate {
    pub fn new(platform: Platform) -> Self {
        Self { platform }
    }

    pub fn current() -> Self {
        Self::new(Platform::current())
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Pure support check, no side effects.
    pub fn supports(&self, operation: Operation) -> bool {
        !operation.android_only() || self.platform == Platform::Android
    }

    /// Support check that logs a diagnostic when the operation is refused.
    pub fn check(&self, operation: Operation) -> bool {
        let supported = self.supports(operation);
        if !supported {
            tracing::warn!(
                operation = operation.name(),
                platform = self.platform.as_str(),
                "({operation}) this method is only available on android platform"
            );
        }
        supported
    }

    /// Operations available on this gate's platform.
    pub fn supported_operations(&self) -> Vec<Operation> {
        Operation::ALL
            .iter()
            .copied()
            .filter(|op| self.supports(*op))
            .collect()
    }
}

impl Default for CapabilityGate {
    fn default() -> Self {
        Self::current()
    }
}

/// Outcome of a gated operation.
///
/// Lets callers tell "this platform doesn't support it" apart from "it was
/// attempted and failed". `into_option` gives the safe default for callers
/// that don't care.
#[derive(Debug)]
pub enum Capability<T> {
    Supported(T),
    Unsupported(Operation),
    Failed(ScreenStatusError),
}

impl<T> Capability<T> {
    pub fn is_supported(&self) -> bool {
        matches!(self, Capability::Supported(_))
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Capability::Unsupported(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Capability::Failed(_))
    }

    /// The value, or `None` for both unsupported and failed outcomes.
    pub fn into_option(self) -> Option<T> {
        match self {
            Capability::Supported(value) => Some(value),
            _ => None,
        }
    }

    /// Propagate failures, collapse the unsupported case to `Ok(None)`.
    pub fn into_result(self) -> Result<Option<T>, ScreenStatusError> {
        match self {
            Capability::Supported(value) => Ok(Some(value)),
            Capability::Unsupported(_) => Ok(None),
            Capability::Failed(err) => Err(err),
        }
    }

    pub fn map<U, F>(self, f: F) -> Capability<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Capability::Supported(value) => Capability::Supported(f(value)),
            Capability::Unsupported(op) => Capability::Unsupported(op),
            Capability::Failed(err) => Capability::Failed(err),
        }
    }

    pub fn error(&self) -> Option<&ScreenStatusError> {
        match self {
            Capability::Failed(err) => Some(err),
            _ => None,
        }
    }
}

impl<T, E> From<Result<T, E>> for Capability<T>
where
    E: Into<ScreenStatusError>,
{
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Capability::Supported(value),
            Err(err) => Capability::Failed(err.into()),
        }
    }
}
