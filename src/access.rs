// src/access.rs

//! Administrative-rights gate
//!
//! Every mutating action is preceded by a rights check requested by the
//! caller. The check runs with the execution context temporarily
//! switched to the target namespace; the switch is scoped through an
//! RAII guard so the prior context is restored on success and failure
//! alike.

use std::fmt;

use strum_macros::Display;
use tracing::debug;

use crate::config::{PackageConfiguration, UserRef};
use crate::error::{Error, Result};
use crate::package::{EntryKey, Namespace};

/// A right the gate can require
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Right {
    Admin,
    Edit,
    Delete,
    Programming,
}

/// External rights service seam
pub trait RightsService: Send + Sync {
    /// Whether `user` holds `right` on `document` (or on the whole
    /// namespace when `document` is `None`)
    fn has_right(
        &self,
        user: &UserRef,
        right: Right,
        namespace: &Namespace,
        document: Option<&EntryKey>,
    ) -> bool;
}

/// The mutable "current namespace" of the surrounding execution layer
///
/// Rights evaluation is namespace-relative, so the gate switches the
/// context before asking and restores it after. This trait is the only
/// place the engine touches that ambient state.
pub trait ExecutionContext: Send + Sync {
    fn current_namespace(&self) -> Namespace;
    fn set_namespace(&self, namespace: Namespace);
}

/// Scoped context switch, restored on drop
///
/// Restoration is unconditional: the guard drops on the error path of
/// `check_right` exactly as on the success path.
pub struct ContextGuard<'a> {
    context: &'a dyn ExecutionContext,
    saved: Namespace,
}

impl<'a> ContextGuard<'a> {
    /// Switch `context` to `namespace`, remembering the prior scope
    pub fn enter(context: &'a dyn ExecutionContext, namespace: Namespace) -> Self {
        let saved = context.current_namespace();
        context.set_namespace(namespace);
        Self { context, saved }
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        self.context.set_namespace(self.saved.clone());
    }
}

/// Pre-mutation rights check
pub struct AccessGate<'a> {
    rights: &'a dyn RightsService,
    context: &'a dyn ExecutionContext,
}

impl<'a> AccessGate<'a> {
    pub fn new(rights: &'a dyn RightsService, context: &'a dyn ExecutionContext) -> Self {
        Self { rights, context }
    }

    /// Require `right` on `document` in `namespace` before a mutation
    ///
    /// When the configuration carries a caller identity distinct from
    /// the acting user (a script or service acting on someone's
    /// behalf), the caller must hold the right; the acting user is not
    /// consulted. Otherwise the acting user must hold it.
    ///
    /// `None` for `namespace` means the root namespace.
    ///
    /// # Errors
    /// [`Error::AccessDenied`] when the required right is missing; the
    /// enclosing action must then be aborted before any entry is
    /// applied.
    pub fn check_right(
        &self,
        namespace: Option<&Namespace>,
        right: Right,
        document: Option<&EntryKey>,
        cfg: &PackageConfiguration,
    ) -> Result<()> {
        let target = namespace.cloned().unwrap_or(Namespace::Root);
        let _scope = ContextGuard::enter(self.context, target.clone());

        let checked = match (&cfg.caller, &cfg.acting_user) {
            // A distinct caller must hold the right itself.
            (Some(caller), Some(user)) if caller != user => caller.clone(),
            (Some(caller), None) => caller.clone(),
            (_, Some(user)) => user.clone(),
            (None, None) => UserRef::superadmin(),
        };

        debug!("Checking {} right for {} on {}", right, checked, target);
        if self.rights.has_right(&checked, right, &target, document) {
            Ok(())
        } else {
            Err(Error::AccessDenied {
                user: checked,
                right: right.to_string(),
                namespace: target,
            })
        }
    }
}
