//! Per-user dashboard edit session.
//!
//! ```text
//! Viewing --begin_edit--> Editing(drafts) --commit_saved--> Viewing(new config)
//!                                      \--cancel-------> Viewing(old config)
//! ```
//!
//! Saving is split in two so that a failed write never leaves optimistic
//! state behind: [`DashboardSession::prepare_save`] computes the candidate
//! config without changing state, and only [`DashboardSession::commit_saved`]
//! with the value the store actually holds moves the session back to
//! viewing. If the write fails the session simply stays in `Editing`.

use crate::dashboard::DashboardConfig;
use crate::error::CoreError;
use crate::reconcile::{reconcile, Reconciled};
use crate::types::WidgetId;
use crate::widget::WidgetDraft;
use uuid::Uuid;

/// Where a session is in its edit lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum EditState {
    Viewing,
    Editing { drafts: Vec<WidgetDraft> },
}

/// A dashboard as one user sees and edits it.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSession {
    config: DashboardConfig,
    state: EditState,
}

impl DashboardSession {
    /// Start in `Viewing` with the config loaded from the store.
    pub fn viewing(config: DashboardConfig) -> Self {
        Self {
            config,
            state: EditState::Viewing,
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.state, EditState::Editing { .. })
    }

    /// Enter `Editing`, seeding one draft per current widget. Each draft
    /// carries its current layout size.
    pub fn begin_edit(&mut self) -> Result<(), CoreError> {
        if self.is_editing() {
            return Err(CoreError::Conflict(
                "dashboard is already being edited".to_string(),
            ));
        }
        let drafts = self
            .config
            .widgets
            .iter()
            .map(|w| WidgetDraft::from_widget(w, self.config.layout_entry(w.id).map(|e| e.size())))
            .collect();
        self.state = EditState::Editing { drafts };
        Ok(())
    }

    /// Add a draft, or replace the draft with the same id.
    ///
    /// A draft without an id is given a fresh one so it can be removed again
    /// before saving. Returns the draft's id.
    pub fn upsert_draft(&mut self, mut draft: WidgetDraft) -> Result<WidgetId, CoreError> {
        let drafts = self.drafts_mut()?;
        let id = *draft.id.get_or_insert_with(Uuid::new_v4);
        match drafts.iter().position(|d| d.id == Some(id)) {
            Some(idx) => drafts[idx] = draft,
            None => drafts.push(draft),
        }
        Ok(id)
    }

    /// Remove the draft with `id`. Returns `NotFound` if there is none.
    pub fn remove_draft(&mut self, id: WidgetId) -> Result<(), CoreError> {
        let drafts = self.drafts_mut()?;
        let before = drafts.len();
        drafts.retain(|d| d.id != Some(id));
        if drafts.len() == before {
            return Err(CoreError::NotFound {
                entity: "WidgetDraft",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// Replace the whole draft list, as a form submit does.
    pub fn replace_drafts(&mut self, drafts: Vec<WidgetDraft>) -> Result<(), CoreError> {
        *self.drafts_mut()? = drafts;
        Ok(())
    }

    /// Reconcile the drafts against the current config. The session state
    /// is not changed.
    pub fn prepare_save(&self) -> Result<Reconciled, CoreError> {
        match &self.state {
            EditState::Editing { drafts } => reconcile(drafts.clone(), &self.config),
            EditState::Viewing => Err(not_editing()),
        }
    }

    /// Finish the edit with the config the store now holds.
    pub fn commit_saved(&mut self, persisted: DashboardConfig) -> Result<(), CoreError> {
        if !self.is_editing() {
            return Err(not_editing());
        }
        self.config = persisted;
        self.state = EditState::Viewing;
        Ok(())
    }

    /// Discard the drafts and keep the config as it was.
    pub fn cancel(&mut self) {
        self.state = EditState::Viewing;
    }

    fn drafts_mut(&mut self) -> Result<&mut Vec<WidgetDraft>, CoreError> {
        match &mut self.state {
            EditState::Editing { drafts } => Ok(drafts),
            EditState::Viewing => Err(not_editing()),
        }
    }
}

fn not_editing() -> CoreError {
    CoreError::Conflict("dashboard is not being edited".to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
