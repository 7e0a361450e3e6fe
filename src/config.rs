// src/config.rs

//! Per-operation configuration threaded through the engine
//!
//! A [`PackageConfiguration`] travels with every install, upgrade,
//! uninstall and cleanup call. It names the acting user (for author
//! attribution and rights checks), whether conflict questions may block
//! on a human answer, and the job-status handle log lines should be
//! attributed to.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::package::Namespace;
use crate::progress::JobStatus;

/// Distinguished author used when no acting user was supplied
const SUPERADMIN: &str = "superadmin";

/// Reference to a user identity, as understood by the rights service
/// and the content store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserRef(String);

impl UserRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The fallback author used for writes when no acting user exists
    pub fn superadmin() -> Self {
        Self(SUPERADMIN.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Configuration for one package operation
#[derive(Clone)]
pub struct PackageConfiguration {
    /// Whether conflict questions may block for a human answer
    pub interactive: bool,
    /// The user the operation acts as; writes are attributed to them
    pub acting_user: Option<UserRef>,
    /// Distinct caller identity when a script or service acts on
    /// behalf of the acting user
    pub caller: Option<UserRef>,
    /// The namespace the operation targets
    pub namespace: Namespace,
    /// Whether [`report`](Self::report) lines reach the job status;
    /// nested operations disable this to keep the owning job's log
    /// clean
    pub logging_enabled: bool,
    /// Job-status handle for progress/log attribution, write-only here
    pub job_status: Option<Arc<dyn JobStatus>>,
}

impl PackageConfiguration {
    pub fn new(namespace: Namespace) -> Self {
        Self {
            interactive: false,
            acting_user: None,
            caller: None,
            namespace,
            logging_enabled: true,
            job_status: None,
        }
    }

    /// Derive a configuration that never prompts
    ///
    /// Used by cleanup and namespace propagation, which must run
    /// unattended while preserving the acting user.
    pub fn non_interactive(&self) -> Self {
        let mut cfg = self.clone();
        cfg.interactive = false;
        cfg
    }

    /// Same configuration retargeted at another namespace
    pub fn for_namespace(&self, namespace: Namespace) -> Self {
        let mut cfg = self.clone();
        cfg.namespace = namespace;
        cfg
    }

    /// The author content writes are attributed to
    pub fn author(&self) -> UserRef {
        self.acting_user.clone().unwrap_or_else(UserRef::superadmin)
    }

    /// Report a line to the attached job status, if any
    ///
    /// Silent when `logging_enabled` is off.
    pub fn report(&self, message: &str) {
        if !self.logging_enabled {
            return;
        }
        if let Some(status) = &self.job_status {
            status.log(message);
        }
    }
}

impl fmt::Debug for PackageConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackageConfiguration")
            .field("interactive", &self.interactive)
            .field("acting_user", &self.acting_user)
            .field("caller", &self.caller)
            .field("namespace", &self.namespace)
            .field("logging_enabled", &self.logging_enabled)
            .field("job_status", &self.job_status.is_some())
            .finish()
    }
}

impl Default for PackageConfiguration {
    fn default() -> Self {
        Self::new(Namespace::Root)
    }
}
