use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SurveyStatus {
    Draft,
    Submitted,
    UrgentReview,
    Scheduling,
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl SurveyStatus {
    pub const ALL: [SurveyStatus; 8] = [
        SurveyStatus::Draft,
        SurveyStatus::Submitted,
        SurveyStatus::UrgentReview,
        SurveyStatus::Scheduling,
        SurveyStatus::Scheduled,
        SurveyStatus::InProgress,
        SurveyStatus::Completed,
        SurveyStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SurveyStatus::Draft => "DRAFT",
            SurveyStatus::Submitted => "SUBMITTED",
            SurveyStatus::UrgentReview => "URGENT_REVIEW",
            SurveyStatus::Scheduling => "SCHEDULING",
            SurveyStatus::Scheduled => "SCHEDULED",
            SurveyStatus::InProgress => "IN_PROGRESS",
            SurveyStatus::Completed => "COMPLETED",
            SurveyStatus::Cancelled => "CANCELLED",
        }
    }

    /// Status a freshly submitted request starts in.
    pub fn initial(urgent: bool) -> Self {
        if urgent {
            SurveyStatus::UrgentReview
        } else {
            SurveyStatus::Submitted
        }
    }

    pub fn badge(self, urgent: bool) -> StatusBadge {
        let tone = match self {
            SurveyStatus::Draft => &DRAFT_TONE,
            SurveyStatus::Submitted | SurveyStatus::UrgentReview => &OPEN_TONE,
            SurveyStatus::Scheduling | SurveyStatus::Scheduled | SurveyStatus::InProgress => {
                &IN_PROGRESS_TONE
            }
            SurveyStatus::Completed => &COMPLETED_TONE,
            SurveyStatus::Cancelled => &CANCELLED_TONE,
        };

        StatusBadge {
            label: tone.label,
            color: tone.color,
            background: tone.background,
            border: tone.border,
            urgent: urgent || self == SurveyStatus::UrgentReview,
        }
    }
}

impl fmt::Display for SurveyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown survey status '{}'", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for SurveyStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        SurveyStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| UnknownStatus(value.to_string()))
    }
}

struct Tone {
    label: &'static str,
    color: &'static str,
    background: &'static str,
    border: &'static str,
}

const DRAFT_TONE: Tone = Tone {
    label: "Draft",
    color: "#26405d",
    background: "rgba(38,64,93,0.10)",
    border: "rgba(38,64,93,0.35)",
};

const OPEN_TONE: Tone = Tone {
    label: "Open",
    color: "#26405d",
    background: "rgba(38,64,93,0.10)",
    border: "rgba(38,64,93,0.35)",
};

const IN_PROGRESS_TONE: Tone = Tone {
    label: "In progress",
    color: "#c35e1e",
    background: "rgba(195,94,30,0.10)",
    border: "rgba(195,94,30,0.35)",
};

const COMPLETED_TONE: Tone = Tone {
    label: "Completed",
    color: "#00a49a",
    background: "rgba(0,164,154,0.10)",
    border: "rgba(0,164,154,0.35)",
};

const CANCELLED_TONE: Tone = Tone {
    label: "Cancelled",
    color: "#b85236",
    background: "rgba(184,82,54,0.10)",
    border: "rgba(184,82,54,0.35)",
};

/// Human-readable label and palette for a status, as shown on cards and tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusBadge {
    pub label: &'static str,
    pub color: &'static str,
    pub background: &'static str,
    pub border: &'static str,
    pub urgent: bool,
}
