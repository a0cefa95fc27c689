//! Project-count admission control.

/// Project limit applied to free accounts.
pub const DEFAULT_PROJECT_LIMIT: u32 = 5;

/// Returns whether one more project may be created.
pub fn can_create(current_count: u32, limit: u32) -> bool {
    current_count < limit
}

/// Creation gate consulted before a project is inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionPolicy {
    Limited(u32),
    /// Paid plans.
    Unlimited,
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self::Limited(DEFAULT_PROJECT_LIMIT)
    }
}

impl AdmissionPolicy {
    /// `0` means no limit, matching the config file convention.
    pub fn from_limit(limit: u32) -> Self {
        if limit == 0 {
            Self::Unlimited
        } else {
            Self::Limited(limit)
        }
    }

    pub fn allows(self, current_count: u32) -> bool {
        match self {
            Self::Limited(limit) => can_create(current_count, limit),
            Self::Unlimited => true,
        }
    }

    pub fn limit(self) -> Option<u32> {
        match self {
            Self::Limited(limit) => Some(limit),
            Self::Unlimited => None,
        }
    }

    /// Projects still creatable, `None` when unlimited.
    pub fn remaining(self, current_count: u32) -> Option<u32> {
        self.limit()
            .map(|limit| limit.saturating_sub(current_count))
    }
}
