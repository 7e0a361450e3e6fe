// src/plan.rs

//! Installation plans and their actions
//!
//! A plan is the ordered output of the external dependency resolver:
//! one [`Action`] per package operation, each naming the namespace it
//! targets, the previously installed package handles it replaces, and
//! the package it installs. The engine consumes the plan as given; it
//! never reorders or re-resolves it.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::package::{Namespace, PackageHandle};

/// The kind of one plan step
///
/// Round-trips through its uppercase job-framework spelling via
/// `Display` and `FromStr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum ActionKind {
    Install,
    Upgrade,
    Uninstall,
}

/// One step of an installation plan
pub struct Action {
    pub kind: ActionKind,
    /// The namespace this step operates on
    pub namespace: Namespace,
    /// Handles of the previously installed versions of the package.
    ///
    /// More than one when the same logical package was reached through
    /// different dependency chains.
    pub previous: Vec<Arc<PackageHandle>>,
    /// The package being installed or upgraded to; absent for
    /// uninstalls.
    pub next: Option<Arc<PackageHandle>>,
}

impl Action {
    pub fn install(namespace: Namespace, next: Arc<PackageHandle>) -> Self {
        Self {
            kind: ActionKind::Install,
            namespace,
            previous: Vec::new(),
            next: Some(next),
        }
    }

    pub fn upgrade(
        namespace: Namespace,
        previous: Vec<Arc<PackageHandle>>,
        next: Arc<PackageHandle>,
    ) -> Self {
        Self {
            kind: ActionKind::Upgrade,
            namespace,
            previous,
            next: Some(next),
        }
    }

    pub fn uninstall(namespace: Namespace, previous: Vec<Arc<PackageHandle>>) -> Self {
        Self {
            kind: ActionKind::Uninstall,
            namespace,
            previous,
            next: None,
        }
    }

    /// Human-readable description for job logs
    pub fn description(&self) -> String {
        match (&self.kind, &self.next) {
            (ActionKind::Uninstall, _) => {
                let names: Vec<String> =
                    self.previous.iter().map(|h| h.id().to_string()).collect();
                format!("UNINSTALL {} from {}", names.join(", "), self.namespace)
            }
            (kind, Some(next)) => format!("{} {} on {}", kind, next.id(), self.namespace),
            (kind, None) => format!("{} <missing package> on {}", kind, self.namespace),
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// The ordered set of actions produced by the dependency resolver
#[derive(Default)]
pub struct InstallationPlan {
    pub actions: Vec<Action>,
}

impl InstallationPlan {
    pub fn new(actions: Vec<Action>) -> Self {
        Self { actions }
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
