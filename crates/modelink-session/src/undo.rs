//! Undo/redo manager using recorded model events.
//!
//! Every model mutation leaves a revertible event in the model's outbox.
//! Committing drains the outbox into one transaction. Undoing reverts the
//! transaction's events newest first; the inverse events this produces
//! form the transaction that redo reverts in turn.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use modelink_core::{Model, ModelEvent};

/// Events committed together as one undo step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    events: Vec<ModelEvent>,
}

impl Transaction {
    pub fn new(events: Vec<ModelEvent>) -> Self {
        Self { events }
    }

    pub fn events(&self) -> &[ModelEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Revert every event, newest first. Returns the inverse transaction.
    ///
    /// If an event fails, the events reverted so far are re-applied before
    /// the error is returned, so the model is back where it started.
    pub fn revert(&self, model: &mut Model) -> Result<Transaction> {
        for (index, event) in self.events.iter().enumerate().rev() {
            if let Err(err) = event.revert(model) {
                let partial = Transaction::new(model.take_events());
                for undone in partial.events.iter().rev() {
                    if let Err(rollback) = undone.revert(model) {
                        warn!(error = %rollback, "rollback of a failed revert is incomplete");
                        break;
                    }
                }
                model.take_events();
                return Err(err.context(format!("Failed to revert event {} of {}", index + 1, self.events.len())));
            }
        }
        Ok(Transaction::new(model.take_events()))
    }
}

/// Stacks as written to a history file
#[derive(Serialize, Deserialize)]
struct History {
    undo: Vec<Transaction>,
    redo: Vec<Transaction>,
}

/// Manages undo/redo with event transactions
#[derive(Debug)]
pub struct UndoManager {
    /// Committed transactions, oldest first
    undo_stack: Vec<Transaction>,
    /// Reverted transactions, ready to be re-applied
    redo_stack: Vec<Transaction>,
    /// Maximum history size
    max_history: usize,
}

impl UndoManager {
    pub fn new(max_history: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_history,
        }
    }

    /// Turn the model's pending events into an undo step.
    ///
    /// Returns false when nothing changed. A new step clears the redo stack.
    pub fn commit(&mut self, model: &mut Model) -> bool {
        let events = model.take_events();
        if events.is_empty() {
            return false;
        }
        debug!(events = events.len(), "commit");
        self.undo_stack.push(Transaction::new(events));
        self.redo_stack.clear();
        self.trim();
        true
    }

    /// Revert the latest step. Pending changes are committed first.
    ///
    /// A step that fails to revert stays on the undo stack.
    pub fn undo(&mut self, model: &mut Model) -> Result<bool> {
        self.commit(model);
        let Some(transaction) = self.undo_stack.pop() else {
            return Ok(false);
        };
        let inverse = match transaction.revert(model) {
            Ok(inverse) => inverse,
            Err(err) => {
                self.undo_stack.push(transaction);
                return Err(err.context("Failed to undo"));
            }
        };
        debug!(events = inverse.len(), "undo");
        self.redo_stack.push(inverse);
        Ok(true)
    }

    /// Re-apply the latest undone step
    pub fn redo(&mut self, model: &mut Model) -> Result<bool> {
        self.commit(model);
        let Some(transaction) = self.redo_stack.pop() else {
            return Ok(false);
        };
        let inverse = match transaction.revert(model) {
            Ok(inverse) => inverse,
            Err(err) => {
                self.redo_stack.push(transaction);
                return Err(err.context("Failed to redo"));
            }
        };
        debug!(events = inverse.len(), "redo");
        self.undo_stack.push(inverse);
        self.trim();
        Ok(true)
    }

    fn trim(&mut self) {
        if self.undo_stack.len() > self.max_history {
            let excess = self.undo_stack.len() - self.max_history;
            self.undo_stack.drain(..excess);
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Latest undo step
    pub fn last(&self) -> Option<&Transaction> {
        self.undo_stack.last()
    }

    /// Write both stacks as JSON
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let history = History {
            undo: self.undo_stack.clone(),
            redo: self.redo_stack.clone(),
        };
        let content = serde_json::to_string_pretty(&history)?;
        fs::write(path, content).with_context(|| format!("Failed to save history to {:?}", path))?;
        Ok(())
    }

    /// Read stacks written by [`UndoManager::save_to`]
    pub fn load(path: &Path, max_history: usize) -> Result<Self> {
        let content = fs::read_to_string(path).with_context(|| format!("Failed to read history from {:?}", path))?;
        let history: History =
            serde_json::from_str(&content).with_context(|| format!("Invalid history file {:?}", path))?;
        let mut manager = Self {
            undo_stack: history.undo,
            redo_stack: history.redo,
            max_history,
        };
        manager.trim();
        Ok(manager)
    }
}

impl Default for UndoManager {
    fn default() -> Self {
        Self::new(100)
    }
}
