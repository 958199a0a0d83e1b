//! Kanban grouping of survey statuses and the drop rules used when an
//! administrator drags a card between columns.
//!
//! Column membership is always derived from a survey's status; nothing here is
//! persisted. Both directions of the mapping live in lookup tables so a new
//! status or column only touches data.

pub mod board;
pub mod store;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::status::SurveyStatus;

pub use board::{Board, Card, DragEnd, MoveError, MoveOutcome, MoveStart, PendingMove, Slot};
pub use store::{PgStatusWriter, RowPolicy, StatusWriter, UpdatedStatus};

/// Completed surveys older than this drop off the board.
pub const DEFAULT_COMPLETED_RETENTION_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Column {
    Open = 0,
    InProgress = 1,
    Done = 2,
    Cancelled = 3,
}

pub struct ColumnSpec {
    pub column: Column,
    pub title: &'static str,
    pub color: &'static str,
    pub statuses: &'static [SurveyStatus],
    drop_rule: DropRule,
}

/// Status written when a card lands in a column.
enum DropRule {
    Set(SurveyStatus),
    /// Keep the current status when it is listed, otherwise fall back.
    Keep {
        keep: &'static [SurveyStatus],
        otherwise: SurveyStatus,
    },
}

/// Board columns in display order.
pub static COLUMNS: [ColumnSpec; 4] = [
    ColumnSpec {
        column: Column::Open,
        title: "Open",
        color: "#26405d",
        statuses: &[
            SurveyStatus::Draft,
            SurveyStatus::Submitted,
            SurveyStatus::UrgentReview,
        ],
        drop_rule: DropRule::Keep {
            keep: &[SurveyStatus::UrgentReview],
            otherwise: SurveyStatus::Submitted,
        },
    },
    ColumnSpec {
        column: Column::InProgress,
        title: "In progress",
        color: "#c35e1e",
        statuses: &[
            SurveyStatus::Scheduling,
            SurveyStatus::Scheduled,
            SurveyStatus::InProgress,
        ],
        drop_rule: DropRule::Set(SurveyStatus::InProgress),
    },
    ColumnSpec {
        column: Column::Done,
        title: "Done",
        color: "#00a49a",
        statuses: &[SurveyStatus::Completed],
        drop_rule: DropRule::Set(SurveyStatus::Completed),
    },
    ColumnSpec {
        column: Column::Cancelled,
        title: "Cancelled",
        color: "#b85236",
        statuses: &[SurveyStatus::Cancelled],
        drop_rule: DropRule::Set(SurveyStatus::Cancelled),
    },
];

impl Column {
    pub fn spec(self) -> &'static ColumnSpec {
        &COLUMNS[self as usize]
    }

    /// Column a status is shown under.
    pub fn of(status: SurveyStatus) -> Column {
        COLUMNS
            .iter()
            .find(|spec| spec.statuses.contains(&status))
            .map(|spec| spec.column)
            .unwrap_or_else(|| unreachable!("status {status} has no column"))
    }

    pub fn contains(self, status: SurveyStatus) -> bool {
        self.spec().statuses.contains(&status)
    }
}

/// Status to persist when a card currently in `current` is dropped on `target`.
pub fn status_on_drop(target: Column, current: SurveyStatus) -> SurveyStatus {
    match target.spec().drop_rule {
        DropRule::Set(status) => status,
        DropRule::Keep { keep, otherwise } => {
            if keep.contains(&current) {
                current
            } else {
                otherwise
            }
        }
    }
}

/// Whether a survey is rendered on the board at `now`.
///
/// Only completed surveys whose completion is older than `retention` are hidden;
/// a completed survey without a completion timestamp stays visible.
pub fn is_on_board(
    status: SurveyStatus,
    completed_at: Option<NaiveDateTime>,
    now: NaiveDateTime,
    retention: Duration,
) -> bool {
    if status != SurveyStatus::Completed {
        return true;
    }
    match completed_at {
        Some(completed_at) => now - completed_at <= retention,
        None => true,
    }
}
