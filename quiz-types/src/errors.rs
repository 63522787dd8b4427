use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Machine-readable reason attached to business-rule rejections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum DomainReason {
    SessionFull,
    SessionEnded,
    AlreadyAnswered,
    SessionNotLive,
    QuestionNotOpen,
}

impl DomainReason {
    pub fn code(self) -> &'static str {
        match self {
            DomainReason::SessionFull => "session_full",
            DomainReason::SessionEnded => "session_ended",
            DomainReason::AlreadyAnswered => "already_answered",
            DomainReason::SessionNotLive => "session_not_live",
            DomainReason::QuestionNotOpen => "question_not_open",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            DomainReason::SessionFull => "session full",
            DomainReason::SessionEnded => "session ended",
            DomainReason::AlreadyAnswered => "already answered",
            DomainReason::SessionNotLive => "session is not live",
            DomainReason::QuestionNotOpen => "question is not open yet",
        }
    }
}

impl std::fmt::Display for DomainReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// JSON body returned for every rejected request.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ErrorBody {
    pub error: String,
    pub reason: Option<DomainReason>,
}
