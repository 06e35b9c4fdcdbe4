use thiserror::Error;

use crate::roster::{Record, Roster};

pub const VOTE_URL_BASE: &str = "https://sisvoto.ump.app.br/App?codigo=";

/// Build the external voting link for a resolved code. The code goes in raw,
/// never normalized.
pub fn vote_url(code: &str) -> String {
    format!("{VOTE_URL_BASE}{code}")
}

/// Where one lookup interaction currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    /// No search has been triggered yet.
    Idle,
    NoMatch,
    OneMatch,
    ManyMatches,
    /// Exactly one record confirmed; the voting link can be built.
    Resolved,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlowError {
    #[error("no candidates to choose from")]
    NoCandidates,
    #[error("confirmation requires exactly one candidate")]
    NotSingle,
    #[error("no candidate with code {0}")]
    UnknownCandidate(String),
}

/// One user interaction with the lookup widget, modeled as an explicit state
/// machine: `Idle` → search → `NoMatch` | `OneMatch` | `ManyMatches` →
/// confirm/choose → `Resolved`.
///
/// Every search wipes the previous matches and selection before
/// re-classifying, and a single match still needs an explicit [`confirm`]
/// (or [`choose`]) step; detection alone never resolves.
///
/// [`confirm`]: SelectionFlow::confirm
/// [`choose`]: SelectionFlow::choose
#[derive(Debug, Clone)]
pub struct SelectionFlow<'a> {
    roster: &'a Roster,
    raw_input: String,
    searched: bool,
    matches: Vec<Record>,
    selected: Option<Record>,
}

impl<'a> SelectionFlow<'a> {
    pub fn new(roster: &'a Roster) -> Self {
        Self {
            roster,
            raw_input: String::new(),
            searched: false,
            matches: Vec::new(),
            selected: None,
        }
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.raw_input = text.into();
    }

    pub fn raw_input(&self) -> &str {
        &self.raw_input
    }

    /// Run the matcher over the current input and classify the outcome.
    /// Any earlier selection is discarded first.
    pub fn search(&mut self) -> FlowState {
        self.selected = None;
        self.searched = true;
        self.matches = self.roster.search(&self.raw_input);
        self.state()
    }

    pub fn state(&self) -> FlowState {
        if self.selected.is_some() {
            return FlowState::Resolved;
        }
        if !self.searched {
            return FlowState::Idle;
        }
        match self.matches.len() {
            0 => FlowState::NoMatch,
            1 => FlowState::OneMatch,
            _ => FlowState::ManyMatches,
        }
    }

    /// Candidates from the last search, in dataset order.
    pub fn matches(&self) -> &[Record] {
        &self.matches
    }

    /// Whether the widget should show the not-found message: only after a
    /// search, only when nothing matched, and never for a blank submit.
    pub fn shows_not_found(&self) -> bool {
        self.searched && self.matches.is_empty() && !self.raw_input.trim().is_empty()
    }

    /// Confirm the sole candidate. Only valid in `OneMatch`.
    pub fn confirm(&mut self) -> Result<&Record, FlowError> {
        match self.state() {
            FlowState::OneMatch => {
                let record = self.matches[0].clone();
                Ok(&*self.selected.insert(record))
            }
            FlowState::ManyMatches => Err(FlowError::NotSingle),
            _ => Err(FlowError::NoCandidates),
        }
    }

    /// Pick a candidate by its code. Valid with one or many candidates; the
    /// code must belong to one of them.
    pub fn choose(&mut self, code: &str) -> Result<&Record, FlowError> {
        match self.state() {
            FlowState::OneMatch | FlowState::ManyMatches => {
                match self.matches.iter().find(|record| record.code == code) {
                    Some(record) => {
                        let record = record.clone();
                        Ok(&*self.selected.insert(record))
                    }
                    None => Err(FlowError::UnknownCandidate(code.to_string())),
                }
            }
            _ => Err(FlowError::NoCandidates),
        }
    }

    pub fn selected(&self) -> Option<&Record> {
        self.selected.as_ref()
    }

    /// The voting link for the resolved record, if the flow has resolved.
    pub fn vote_url(&self) -> Option<String> {
        self.selected.as_ref().map(|record| vote_url(&record.code))
    }
}
