use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::{is_on_board, status_on_drop, store::StatusWriter, Column, UpdatedStatus};
use crate::status::SurveyStatus;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Card {
    pub id: i64,
    pub status: SurveyStatus,
    pub urgent: bool,
    pub created_by: Uuid,
    pub requester: Option<String>,
    pub needed_date: Option<NaiveDate>,
    pub admin_deadline: Option<NaiveDate>,
    pub completed_at: Option<NaiveDateTime>,
    pub contract_code: Option<String>,
    pub contract_title: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Slot {
    pub column: Column,
    pub index: usize,
}

/// A finished drag gesture. `destination` is `None` when the card was
/// released outside every column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragEnd {
    pub survey_id: i64,
    pub source: Slot,
    pub destination: Option<Slot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("could not save the status change: {0}")]
    WriteRejected(String),
    #[error("could not save the status change: no rows were updated (permission denied)")]
    WriteIneffective,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Nothing to do: dropped outside a column, on its own slot, or unknown card.
    Skipped,
    /// The actor may not move cards.
    Ignored,
    Committed {
        survey_id: i64,
        status: SurveyStatus,
    },
    Reverted {
        survey_id: i64,
        status: SurveyStatus,
        error: MoveError,
    },
}

#[derive(Debug)]
pub enum MoveStart {
    Skipped,
    Ignored,
    Pending(PendingMove),
}

/// A tentatively applied status change waiting for the storage result.
#[derive(Debug)]
#[must_use = "a pending move must be settled against the write result"]
pub struct PendingMove {
    survey_id: i64,
    previous: SurveyStatus,
    next: SurveyStatus,
}

impl PendingMove {
    pub fn survey_id(&self) -> i64 {
        self.survey_id
    }

    pub fn next_status(&self) -> SurveyStatus {
        self.next
    }

    pub fn previous_status(&self) -> SurveyStatus {
        self.previous
    }

    /// Confirms the tentative status when the write returned the updated row,
    /// otherwise restores the previous status.
    pub fn settle(
        self,
        board: &mut Board,
        result: anyhow::Result<Vec<UpdatedStatus>>,
    ) -> MoveOutcome {
        let failure = match result {
            Ok(rows) => match rows.into_iter().find(|row| row.id == self.survey_id) {
                Some(row) => {
                    if let Some(card) = board.card_mut(self.survey_id) {
                        card.status = row.status;
                        card.completed_at = row.completed_at;
                    }
                    return MoveOutcome::Committed {
                        survey_id: self.survey_id,
                        status: row.status,
                    };
                }
                None => MoveError::WriteIneffective,
            },
            Err(err) => MoveError::WriteRejected(err.to_string()),
        };

        if let Some(card) = board.card_mut(self.survey_id) {
            card.status = self.previous;
        }
        tracing::warn!(
            survey_id = self.survey_id,
            attempted = %self.next,
            restored = %self.previous,
            error = %failure,
            "status move reverted"
        );
        MoveOutcome::Reverted {
            survey_id: self.survey_id,
            status: self.previous,
            error: failure,
        }
    }
}

/// In-memory list of surveys backing one rendering of the board.
#[derive(Debug, Clone, Default)]
pub struct Board {
    cards: Vec<Card>,
}

impl Board {
    pub fn new(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn card(&self, survey_id: i64) -> Option<&Card> {
        self.cards.iter().find(|card| card.id == survey_id)
    }

    fn card_mut(&mut self, survey_id: i64) -> Option<&mut Card> {
        self.cards.iter_mut().find(|card| card.id == survey_id)
    }

    /// Cards rendered under `column`, in load order.
    pub fn column(&self, column: Column, now: NaiveDateTime, retention: Duration) -> Vec<&Card> {
        self.cards
            .iter()
            .filter(|card| column.contains(card.status))
            .filter(|card| is_on_board(card.status, card.completed_at, now, retention))
            .collect()
    }

    /// First phase of a move: validates the gesture and applies the next
    /// status to the board without touching storage.
    pub fn begin_move(&mut self, drag: &DragEnd, can_move: bool) -> MoveStart {
        if !can_move {
            return MoveStart::Ignored;
        }
        let Some(destination) = drag.destination else {
            return MoveStart::Skipped;
        };
        if destination == drag.source {
            return MoveStart::Skipped;
        }
        let Some(card) = self.card_mut(drag.survey_id) else {
            return MoveStart::Skipped;
        };

        let previous = card.status;
        let next = status_on_drop(destination.column, previous);
        card.status = next;

        MoveStart::Pending(PendingMove {
            survey_id: drag.survey_id,
            previous,
            next,
        })
    }

    /// Runs a full move: optimistic update, one storage write, then commit or
    /// revert depending on what the write returned.
    pub async fn drop_card<W>(&mut self, drag: &DragEnd, can_move: bool, writer: &W) -> MoveOutcome
    where
        W: StatusWriter + ?Sized,
    {
        let pending = match self.begin_move(drag, can_move) {
            MoveStart::Skipped => return MoveOutcome::Skipped,
            MoveStart::Ignored => return MoveOutcome::Ignored,
            MoveStart::Pending(pending) => pending,
        };

        let result = writer
            .update_status(pending.survey_id(), pending.next_status())
            .await;
        pending.settle(self, result)
    }
}
