use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Write operations gated by the access policy. Reads are always allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ManageStudents,
    ManageCourses,
    ManageSemesters,
    RecordResults,
    ComputeCgpa,
    SendNotifications,
}

impl Capability {
    pub const fn all() -> [Self; 6] {
        [
            Self::ManageStudents,
            Self::ManageCourses,
            Self::ManageSemesters,
            Self::RecordResults,
            Self::ComputeCgpa,
            Self::SendNotifications,
        ]
    }

    pub const fn key(self) -> &'static str {
        match self {
            Self::ManageStudents => "manage_students",
            Self::ManageCourses => "manage_courses",
            Self::ManageSemesters => "manage_semesters",
            Self::RecordResults => "record_results",
            Self::ComputeCgpa => "compute_cgpa",
            Self::SendNotifications => "send_notifications",
        }
    }

    pub fn from_key(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        Self::all()
            .into_iter()
            .find(|capability| capability.key() == normalized)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("operation requires the '{}' capability", .0.key())]
pub struct AccessDenied(pub Capability);

/// Set of write capabilities granted to callers of the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
    granted: BTreeSet<Capability>,
}

impl AccessPolicy {
    pub fn open() -> Self {
        Self {
            granted: Capability::all().into_iter().collect(),
        }
    }

    pub fn read_only() -> Self {
        Self {
            granted: BTreeSet::new(),
        }
    }

    pub fn with_capabilities<I>(capabilities: I) -> Self
    where
        I: IntoIterator<Item = Capability>,
    {
        Self {
            granted: capabilities.into_iter().collect(),
        }
    }

    pub fn permits(&self, capability: Capability) -> bool {
        self.granted.contains(&capability)
    }

    pub fn authorize(&self, capability: Capability) -> Result<(), AccessDenied> {
        if self.permits(capability) {
            Ok(())
        } else {
            Err(AccessDenied(capability))
        }
    }

    pub fn granted(&self) -> impl Iterator<Item = Capability> + '_ {
        self.granted.iter().copied()
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::open()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_policy_grants_every_capability() {
        let policy = AccessPolicy::open();
        assert!(Capability::all()
            .into_iter()
            .all(|capability| policy.permits(capability)));
    }

    #[test]
    fn read_only_policy_names_the_missing_capability() {
        let err = AccessPolicy::read_only()
            .authorize(Capability::SendNotifications)
            .expect_err("read only denies writes");
        assert_eq!(
            err.to_string(),
            "operation requires the 'send_notifications' capability"
        );
    }

    #[test]
    fn capability_keys_round_trip() {
        for capability in Capability::all() {
            assert_eq!(Capability::from_key(capability.key()), Some(capability));
        }
        assert_eq!(Capability::from_key(" Record_Results "), Some(Capability::RecordResults));
        assert_eq!(Capability::from_key("delete_everything"), None);
    }
}
