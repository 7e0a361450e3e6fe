// src/conflict.rs

//! Three-way conflict resolution for a single entry
//!
//! Applying an entry compares three contents: what is currently in the
//! store, what the previously installed package shipped, and what the
//! next package ships. The trivial cases resolve without a question;
//! the rest produce a [`ConflictQuestion`] carrying a three-way merge
//! proposal. In interactive mode the question blocks on an external
//! answer, and an interactive run without an answer channel fails with
//! [`crate::Error::AnswerRequired`]; unattended runs take the merged
//! content.
//!
//! Cancellation of the owning job surfaces as [`crate::Error::Cancelled`]
//! returned by the answerer, never as a hang.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum_macros::Display;
use tracing::debug;

use crate::config::PackageConfiguration;
use crate::error::{Error, Result};
use crate::package::EntryKey;

/// Possible resolutions of a conflict question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum ConflictAction {
    /// Keep the content currently in the store
    Current,
    /// Revert to the previous package's content
    Previous,
    /// Take the next package's content
    Next,
    /// Take the three-way merge proposal (the default)
    Merged,
    /// Take caller-supplied content
    Custom,
}

/// One outstanding conflict, with the merge proposal precomputed
#[derive(Debug, Clone)]
pub struct ConflictQuestion {
    pub key: EntryKey,
    pub current: Vec<u8>,
    pub previous: Vec<u8>,
    pub next: Vec<u8>,
    pub merged: Vec<u8>,
}

/// Answer to a [`ConflictQuestion`]
#[derive(Debug, Clone)]
pub struct ConflictAnswer {
    pub action: ConflictAction,
    /// Required when `action` is [`ConflictAction::Custom`]
    pub custom: Option<Vec<u8>>,
}

impl ConflictAnswer {
    pub fn take(action: ConflictAction) -> Self {
        Self {
            action,
            custom: None,
        }
    }

    pub fn custom(content: impl Into<Vec<u8>>) -> Self {
        Self {
            action: ConflictAction::Custom,
            custom: Some(content.into()),
        }
    }
}

/// External answer channel for interactive runs
///
/// The call blocks the worker thread until the question is answered.
/// Job cancellation must unblock the wait by returning
/// [`crate::Error::Cancelled`].
pub trait ConflictAnswerer: Send + Sync {
    fn answer(&self, question: &ConflictQuestion) -> Result<ConflictAnswer>;
}

/// Resolves a single entry's content across three versions
#[derive(Default)]
pub struct ConflictResolver {
    answerer: Option<Arc<dyn ConflictAnswerer>>,
}

impl ConflictResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the answer channel used for interactive questions
    pub fn with_answerer(answerer: Arc<dyn ConflictAnswerer>) -> Self {
        Self {
            answerer: Some(answerer),
        }
    }

    /// Resolve the content one entry should end up with
    ///
    /// `current` is the content now in the store (`None` when absent),
    /// `previous` what the replaced package shipped (`None` for new
    /// entries), `next` what the incoming package ships.
    ///
    /// # Errors
    /// [`Error::AnswerRequired`] when an interactive question cannot be
    /// answered, either because no answer channel is attached or
    /// because the answer chose `CUSTOM` without content.
    /// [`Error::Cancelled`] when the owning job was cancelled during
    /// the wait.
    pub fn resolve(
        &self,
        key: &EntryKey,
        current: Option<&[u8]>,
        previous: Option<&[u8]>,
        next: &[u8],
        cfg: &PackageConfiguration,
    ) -> Result<Vec<u8>> {
        let current = match current {
            // Nothing in the store yet: plain import.
            None => return Ok(next.to_vec()),
            Some(c) => c,
        };
        let previous = previous.unwrap_or_default();

        if current == previous {
            // No local edits since the previous version.
            return Ok(next.to_vec());
        }
        if current == next {
            // Already at the target content.
            return Ok(current.to_vec());
        }

        let merged = three_way_merge(previous, current, next);
        let question = ConflictQuestion {
            key: key.clone(),
            current: current.to_vec(),
            previous: previous.to_vec(),
            next: next.to_vec(),
            merged,
        };

        if !cfg.interactive {
            debug!("Conflict on {} resolved to merged content (unattended)", key);
            return Ok(question.merged);
        }

        // Interactive runs must not decide silently; a missing channel
        // is a caller error, not a fallback.
        let Some(answerer) = &self.answerer else {
            return Err(Error::AnswerRequired(key.to_string()));
        };

        let answer = answerer.answer(&question)?;
        match answer.action {
            ConflictAction::Current => Ok(question.current),
            ConflictAction::Previous => Ok(question.previous),
            ConflictAction::Next => Ok(question.next),
            ConflictAction::Merged => Ok(question.merged),
            ConflictAction::Custom => answer
                .custom
                .ok_or_else(|| Error::AnswerRequired(key.to_string())),
        }
    }
}

/// Merge `current` and `next` against their common ancestor `previous`
///
/// Non-UTF-8 content cannot be merged line-wise; the next package's
/// content wins, matching how binary attachments are upgraded. When the
/// textual merge conflicts, the conflict-marked text is the proposal,
/// so a human (or the job log) can see both sides.
fn three_way_merge(previous: &[u8], current: &[u8], next: &[u8]) -> Vec<u8> {
    let (Ok(ancestor), Ok(ours), Ok(theirs)) = (
        std::str::from_utf8(previous),
        std::str::from_utf8(current),
        std::str::from_utf8(next),
    ) else {
        return next.to_vec();
    };

    match diffy::merge(ancestor, ours, theirs) {
        Ok(clean) => clean.into_bytes(),
        Err(conflicted) => conflicted.into_bytes(),
    }
}
