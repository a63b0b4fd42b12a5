//! Batch outcome: state, failure mask and artifact checks.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Independent failure causes, combined into one bitmask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct FailureMask(u8);

impl FailureMask {
    /// The conversion reported failure (includes zero pages written and cancellation).
    pub const CONVERSION_FAILED: Self = Self(1 << 0);
    /// No artifact exists at the output location.
    pub const ARTIFACT_MISSING: Self = Self(1 << 1);
    /// The artifact exists but is not a regular file.
    pub const NOT_REGULAR_FILE: Self = Self(1 << 2);
    /// The artifact is a regular file of zero bytes.
    pub const ARTIFACT_EMPTY: Self = Self(1 << 3);

    const NAMES: [(Self, &'static str); 4] = [
        (Self::CONVERSION_FAILED, "conversion failed"),
        (Self::ARTIFACT_MISSING, "artifact missing"),
        (Self::NOT_REGULAR_FILE, "artifact is not a regular file"),
        (Self::ARTIFACT_EMPTY, "artifact is empty"),
    ];

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

impl BitOr for FailureMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for FailureMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.insert(rhs);
    }
}

impl fmt::Display for FailureMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "ok");
        }
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "{}", names.join(", "))
    }
}

/// Lifecycle of one batch invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchState {
    Idle,
    Running,
    Succeeded,
    Failed,
}

impl BatchState {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance_to(self, next: BatchState) -> bool {
        matches!(
            (self, next),
            (BatchState::Idle, BatchState::Running)
                | (BatchState::Idle, BatchState::Failed)
                | (BatchState::Running, BatchState::Succeeded)
                | (BatchState::Running, BatchState::Failed)
        )
    }

    /// `Succeeded` and `Failed` are terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, BatchState::Succeeded | BatchState::Failed)
    }
}

/// Aggregate result of a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// Final state, either `Succeeded` or `Failed`.
    pub state: BatchState,
    /// Zero exactly when `state` is `Succeeded`.
    pub failure: FailureMask,
    /// Pages appended to the document.
    pub pages_written: usize,
    /// Inputs skipped because they could not be decoded.
    pub skipped: Vec<String>,
    /// Delivered document, only set on success.
    pub artifact: Option<PathBuf>,
    /// Human readable summary.
    pub message: String,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.state == BatchState::Succeeded
    }

    /// Process exit code: the failure mask bits.
    pub fn exit_code(&self) -> i32 {
        self.failure.bits() as i32
    }
}

/// Check the finalized artifact at `path`.
///
/// Existence is checked first; the regular-file and size checks only apply
/// to something that exists.
pub fn verify_artifact(path: &Path) -> FailureMask {
    let mut mask = FailureMask::empty();
    let metadata = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(_) => return FailureMask::ARTIFACT_MISSING,
    };
    if !metadata.is_file() {
        mask |= FailureMask::NOT_REGULAR_FILE;
    } else if metadata.len() == 0 {
        mask |= FailureMask::ARTIFACT_EMPTY;
    }
    mask
}
