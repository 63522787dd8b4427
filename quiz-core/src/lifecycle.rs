use std::sync::LazyLock;

use quiz_types::{
    CreateSessionRequest, DomainReason, ParticipantId, PlayerViewMode, RedirectTarget,
    SessionStatus,
};
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

pub const DEFAULT_MAX_PLAYERS: i32 = 5;
pub const DEFAULT_TIME_PER_QUESTION_SECONDS: i32 = 30;
pub const DEFAULT_POINTS_PER_QUESTION: i32 = 10;
pub const MAX_NICKNAME_LEN: usize = 32;

static NICKNAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\p{L}\p{N} _.\-]+$").expect("nickname pattern is valid")
});

/// Rule violations detected by the pure lifecycle checks. The persistence
/// layer maps these onto its error taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("caller is not the host of this session")]
    NotHost,
    #[error("cannot {action} a session that is {}", .from.as_str())]
    InvalidTransition {
        from: SessionStatus,
        action: &'static str,
    },
    #[error("quiz has no questions")]
    NoQuestions,
    #[error("nickname already taken")]
    NicknameTaken,
    #[error("invalid nickname: {0}")]
    InvalidNickname(String),
    #[error("invalid session config: {0}")]
    InvalidConfig(String),
    #[error("{0}")]
    Domain(DomainReason),
}

/// Immutable per-session settings fixed at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionConfig {
    pub max_players: i32,
    pub time_per_question_seconds: i32,
    pub points_per_question: i32,
    pub total_questions: i32,
    pub player_view_mode: PlayerViewMode,
}

impl SessionConfig {
    pub fn from_request(
        request: &CreateSessionRequest,
        total_questions: i32,
    ) -> Result<Self, LifecycleError> {
        let config = Self {
            max_players: request.max_players.unwrap_or(DEFAULT_MAX_PLAYERS),
            time_per_question_seconds: request
                .time_per_question_seconds
                .unwrap_or(DEFAULT_TIME_PER_QUESTION_SECONDS),
            points_per_question: request
                .points_per_question
                .unwrap_or(DEFAULT_POINTS_PER_QUESTION),
            total_questions,
            player_view_mode: request.player_view_mode.unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LifecycleError> {
        if !(1..=500).contains(&self.max_players) {
            return Err(LifecycleError::InvalidConfig(format!(
                "max_players must be between 1 and 500, got {}",
                self.max_players
            )));
        }
        if !(1..=3600).contains(&self.time_per_question_seconds) {
            return Err(LifecycleError::InvalidConfig(format!(
                "time_per_question_seconds must be between 1 and 3600, got {}",
                self.time_per_question_seconds
            )));
        }
        if !(0..=100_000).contains(&self.points_per_question) {
            return Err(LifecycleError::InvalidConfig(format!(
                "points_per_question must be between 0 and 100000, got {}",
                self.points_per_question
            )));
        }
        if self.total_questions < 0 {
            return Err(LifecycleError::InvalidConfig(
                "total_questions cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn ensure_can_start(
    status: SessionStatus,
    is_host: bool,
    total_questions: i32,
) -> Result<(), LifecycleError> {
    if !is_host {
        return Err(LifecycleError::NotHost);
    }
    if status != SessionStatus::Lobby {
        return Err(LifecycleError::InvalidTransition {
            from: status,
            action: "start",
        });
    }
    if total_questions <= 0 {
        return Err(LifecycleError::NoQuestions);
    }
    Ok(())
}

pub fn ensure_can_cancel(status: SessionStatus, is_host: bool) -> Result<(), LifecycleError> {
    if !is_host {
        return Err(LifecycleError::NotHost);
    }
    if status.is_terminal() {
        return Err(LifecycleError::InvalidTransition {
            from: status,
            action: "cancel",
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotLive(SessionStatus),
    StaleIndex { current: i32, expected: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceDecision {
    /// Stale or duplicate trigger; nothing changes.
    Skip(SkipReason),
    Advance { next_index: i32 },
    End,
}

/// Decides what a fired advancement job for `expected_index` does. Jobs are
/// matched against the stored index, never counted, so late and duplicate
/// firings fall through to `Skip`.
pub fn advance_decision(
    status: SessionStatus,
    current_index: i32,
    expected_index: i32,
    total_questions: i32,
) -> AdvanceDecision {
    if status != SessionStatus::Live {
        return AdvanceDecision::Skip(SkipReason::NotLive(status));
    }
    if current_index != expected_index {
        return AdvanceDecision::Skip(SkipReason::StaleIndex {
            current: current_index,
            expected: expected_index,
        });
    }

    let next_index = current_index + 1;
    if next_index >= total_questions {
        AdvanceDecision::End
    } else {
        AdvanceDecision::Advance { next_index }
    }
}

pub fn redirect_for(status: SessionStatus) -> Option<RedirectTarget> {
    match status {
        SessionStatus::Live => Some(RedirectTarget::Game),
        SessionStatus::Lobby => Some(RedirectTarget::Lobby),
        SessionStatus::Ended | SessionStatus::Cancelled => None,
    }
}

/// Everything the join check needs, read while the session row is locked.
#[derive(Debug, Clone)]
pub struct JoinContext {
    pub status: SessionStatus,
    pub active_players: u64,
    pub max_players: i32,
    pub existing_participant: Option<ParticipantId>,
    pub nickname_taken: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinDecision {
    Rejoin {
        participant_id: ParticipantId,
        redirect: RedirectTarget,
    },
    Create,
}

pub fn join_decision(ctx: &JoinContext) -> Result<JoinDecision, LifecycleError> {
    let Some(redirect) = redirect_for(ctx.status) else {
        return Err(LifecycleError::Domain(DomainReason::SessionEnded));
    };

    if let Some(participant_id) = ctx.existing_participant {
        return Ok(JoinDecision::Rejoin {
            participant_id,
            redirect,
        });
    }

    if ctx.nickname_taken {
        return Err(LifecycleError::NicknameTaken);
    }

    let capacity = u64::try_from(ctx.max_players).unwrap_or(0);
    if ctx.active_players >= capacity {
        return Err(LifecycleError::Domain(DomainReason::SessionFull));
    }

    Ok(JoinDecision::Create)
}

/// Trims and checks a requested nickname.
pub fn normalize_nickname(raw: &str) -> Result<String, LifecycleError> {
    let nickname = raw.trim();
    if nickname.is_empty() {
        return Err(LifecycleError::InvalidNickname(
            "nickname is required".to_string(),
        ));
    }
    if nickname.chars().count() > MAX_NICKNAME_LEN {
        return Err(LifecycleError::InvalidNickname(format!(
            "nickname must be at most {MAX_NICKNAME_LEN} characters"
        )));
    }
    if !NICKNAME_PATTERN.is_match(nickname) {
        return Err(LifecycleError::InvalidNickname(
            "nickname may only contain letters, digits, spaces, '_', '-' and '.'".to_string(),
        ));
    }
    Ok(nickname.to_string())
}

/// Answers may only target questions that have already been shown.
pub fn ensure_question_open(position: i32, current_index: i32) -> Result<(), LifecycleError> {
    if position > current_index {
        return Err(LifecycleError::Domain(DomainReason::QuestionNotOpen));
    }
    Ok(())
}
