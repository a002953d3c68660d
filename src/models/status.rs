//! Hiring-pipeline statuses and the transition table between them.
//!
//! This is the single source of truth for status names, display labels and
//! allowed edges. Everything else (the match service, notifications, the
//! pipeline dictionary endpoint) reads from here.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    PendingProposal,
    Suggested,
    Applied,
    DocumentScreening,
    DocumentPassed,
    Interview,
    InterviewPassed,
    Offer,
    OfferAccepted,
    Rejected,
    Withdrawn,
}

use MatchStatus::*;

impl MatchStatus {
    pub const ALL: [MatchStatus; 11] = [
        PendingProposal,
        Suggested,
        Applied,
        DocumentScreening,
        DocumentPassed,
        Interview,
        InterviewPassed,
        Offer,
        OfferAccepted,
        Rejected,
        Withdrawn,
    ];

    /// Outgoing edges. Terminal statuses return an empty slice.
    pub fn allowed_transitions(self) -> &'static [MatchStatus] {
        match self {
            PendingProposal => &[Suggested, Rejected, Withdrawn],
            Suggested => &[Applied, Offer, Rejected, Withdrawn],
            Applied => &[DocumentScreening, Offer, Rejected, Withdrawn],
            DocumentScreening => &[DocumentPassed, Offer, Rejected, Withdrawn],
            DocumentPassed => &[Interview, Offer, Rejected, Withdrawn],
            Interview => &[InterviewPassed, Offer, Rejected, Withdrawn],
            // further interview rounds loop back here
            InterviewPassed => &[Interview, Offer, Rejected, Withdrawn],
            Offer => &[OfferAccepted, Rejected, Withdrawn],
            OfferAccepted | Rejected | Withdrawn => &[],
        }
    }

    pub fn can_transition_to(self, target: MatchStatus) -> bool {
        self.allowed_transitions().contains(&target)
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// Statuses a match may be created in.
    pub fn is_initial(self) -> bool {
        matches!(self, PendingProposal | Suggested)
    }

    /// Only un-actioned matches may be hard deleted.
    pub fn is_deletable(self) -> bool {
        self == Suggested
    }

    /// Entering one of these statuses notifies the assigned owners.
    pub fn is_notifiable(self) -> bool {
        matches!(
            self,
            Applied | DocumentPassed | Interview | InterviewPassed | Offer | OfferAccepted
        )
    }

    /// Scheduled-event statuses must carry an event date.
    pub fn requires_event_date(self) -> bool {
        self == Interview
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PendingProposal => "pending_proposal",
            Suggested => "suggested",
            Applied => "applied",
            DocumentScreening => "document_screening",
            DocumentPassed => "document_passed",
            Interview => "interview",
            InterviewPassed => "interview_passed",
            Offer => "offer",
            OfferAccepted => "offer_accepted",
            Rejected => "rejected",
            Withdrawn => "withdrawn",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PendingProposal => "Awaiting proposal",
            Suggested => "Proposed",
            Applied => "Applied",
            DocumentScreening => "Document screening",
            DocumentPassed => "Documents passed",
            Interview => "Interview",
            InterviewPassed => "Interview passed",
            Offer => "Offer",
            OfferAccepted => "Offer accepted",
            Rejected => "Rejected",
            Withdrawn => "Withdrawn",
        }
    }

    /// Display label that accounts for multi-round interviews.
    pub fn round_label(self, interview_round: u32) -> String {
        match self {
            Interview if interview_round > 1 => format!("Interview (round {})", interview_round),
            InterviewPassed if interview_round > 1 => {
                format!("Interview round {} passed", interview_round)
            }
            other => other.label().to_string(),
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            PendingProposal => "📌",
            Suggested => "💡",
            Applied => "📝",
            DocumentScreening => "📄",
            DocumentPassed => "✅",
            Interview => "🗓️",
            InterviewPassed => "🎉",
            Offer => "🎁",
            OfferAccepted => "🎊",
            Rejected => "❌",
            Withdrawn => "↩️",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MatchStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown match status: {}", s))
    }
}
