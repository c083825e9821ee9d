//! Task lifecycle reconstruction
//!
//! Task messages use `{task_id}__{TASK_TYPE}` as their memo type, where the
//! task id is a generated message id. A task's state is folded from every
//! decoded message sharing its id, independent of arrival order.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::warn;

use crate::error::{MemoError, Result};

static TASK_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^v\d+\.\d+\.\d{4}-\d{2}-\d{2}_\d{2}:\d{2}__[A-Z0-9]{4}").expect("static regex")
});

/// Lifecycle step carried by a task message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum TaskType {
    Request,
    Proposal,
    Acceptance,
    Refusal,
    Completion,
    VerificationPrompt,
    VerificationResponse,
    Reward,
}

impl TaskType {
    pub const ALL: [TaskType; 8] = [
        TaskType::Request,
        TaskType::Proposal,
        TaskType::Acceptance,
        TaskType::Refusal,
        TaskType::Completion,
        TaskType::VerificationPrompt,
        TaskType::VerificationResponse,
        TaskType::Reward,
    ];

    /// Suffix used in the memo type.
    pub fn suffix(&self) -> &'static str {
        match self {
            TaskType::Request => "TASK_REQUEST",
            TaskType::Proposal => "PROPOSAL",
            TaskType::Acceptance => "ACCEPTANCE",
            TaskType::Refusal => "REFUSAL",
            TaskType::Completion => "TASK_COMPLETION",
            TaskType::VerificationPrompt => "VERIFICATION_PROMPT",
            TaskType::VerificationResponse => "VERIFICATION_RESPONSE",
            TaskType::Reward => "REWARD",
        }
    }

    pub fn from_suffix(suffix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.suffix() == suffix)
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Memo type for a `task_type` message of `task_id`.
pub fn task_message_id(task_id: &str, task_type: TaskType) -> String {
    format!("{}__{}", task_id, task_type.suffix())
}

/// Split a task memo type into task id and type.
pub fn parse_task_message_id(memo_type: &str) -> Result<(String, TaskType)> {
    let task_id = TASK_ID_RE
        .find(memo_type)
        .ok_or_else(|| MemoError::InvalidTaskId(memo_type.to_string()))?
        .as_str();

    let task_type = memo_type[task_id.len()..]
        .strip_prefix("__")
        .and_then(TaskType::from_suffix)
        .ok_or_else(|| MemoError::UnknownTaskType(memo_type.to_string()))?;

    Ok((task_id.to_string(), task_type))
}

/// A decoded message belonging to a task
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskMessage {
    pub task_id: String,
    pub task_type: TaskType,
    pub timestamp: DateTime<Utc>,
    pub text: String,
    /// Tokens delivered with the message
    pub amount: f64,
}

impl TaskMessage {
    /// Build from a decoded group's id and content.
    pub fn from_decoded(
        memo_type: &str,
        timestamp: DateTime<Utc>,
        text: impl Into<String>,
        amount: f64,
    ) -> Result<Self> {
        let (task_id, task_type) = parse_task_message_id(memo_type)?;
        Ok(Self {
            task_id,
            task_type,
            timestamp,
            text: text.into(),
            amount,
        })
    }
}

/// One lifecycle step of a task
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskEvent {
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Task record folded from its messages
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub task_id: String,
    pub request: TaskEvent,
    pub proposal: Option<TaskEvent>,
    pub acceptance: Option<TaskEvent>,
    pub refusal: Option<TaskEvent>,
    pub completion: Option<TaskEvent>,
    pub verification_prompt: Option<TaskEvent>,
    pub verification_response: Option<TaskEvent>,
    pub reward: Option<TaskEvent>,
    /// Tokens delivered with the winning reward message
    pub reward_amount: f64,
}

impl Task {
    /// Fold the messages of `task_id` into a task.
    ///
    /// The earliest request is the task's request. Every other step is
    /// applied in ascending timestamp order, so the most recent message of
    /// each type wins.
    pub fn reconstruct(task_id: &str, messages: &[TaskMessage]) -> Result<Self> {
        let mut ordered: Vec<&TaskMessage> =
            messages.iter().filter(|m| m.task_id == task_id).collect();
        ordered.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.task_type.cmp(&b.task_type))
        });

        let request = ordered
            .iter()
            .find(|m| m.task_type == TaskType::Request)
            .ok_or_else(|| MemoError::MissingTaskRequest(task_id.to_string()))?;

        let mut task = Task {
            task_id: task_id.to_string(),
            request: TaskEvent {
                text: request.text.clone(),
                timestamp: request.timestamp,
            },
            proposal: None,
            acceptance: None,
            refusal: None,
            completion: None,
            verification_prompt: None,
            verification_response: None,
            reward: None,
            reward_amount: 0.0,
        };

        for message in ordered {
            let event = Some(TaskEvent {
                text: message.text.clone(),
                timestamp: message.timestamp,
            });
            match message.task_type {
                TaskType::Request => {}
                TaskType::Proposal => task.proposal = event,
                TaskType::Acceptance => task.acceptance = event,
                TaskType::Refusal => task.refusal = event,
                TaskType::Completion => task.completion = event,
                TaskType::VerificationPrompt => task.verification_prompt = event,
                TaskType::VerificationResponse => task.verification_response = event,
                TaskType::Reward => {
                    task.reward = event;
                    task.reward_amount = message.amount;
                }
            }
        }

        Ok(task)
    }

    /// Most advanced lifecycle step reached.
    pub fn current_state(&self) -> TaskType {
        if self.reward.is_some() {
            TaskType::Reward
        } else if self.verification_response.is_some() {
            TaskType::VerificationResponse
        } else if self.verification_prompt.is_some() {
            TaskType::VerificationPrompt
        } else if self.completion.is_some() {
            TaskType::Completion
        } else if self.refusal.is_some() {
            TaskType::Refusal
        } else if self.acceptance.is_some() {
            TaskType::Acceptance
        } else if self.proposal.is_some() {
            TaskType::Proposal
        } else {
            TaskType::Request
        }
    }

    /// A verification prompt awaits a response.
    pub fn is_verification_pending(&self) -> bool {
        self.verification_prompt.is_some()
            && self.verification_response.is_none()
            && self.refusal.is_none()
    }

    pub fn is_rewarded(&self) -> bool {
        self.reward.is_some() && self.reward_amount > 0.0
    }

    /// Timestamp of the most recent step.
    pub fn last_activity(&self) -> DateTime<Utc> {
        [
            &self.proposal,
            &self.acceptance,
            &self.refusal,
            &self.completion,
            &self.verification_prompt,
            &self.verification_response,
            &self.reward,
        ]
        .into_iter()
        .flatten()
        .map(|event| event.timestamp)
        .fold(self.request.timestamp, |latest, ts| latest.max(ts))
    }
}

/// Reconstruct every task in `messages`, isolating failures per task.
pub fn reconstruct_tasks(messages: &[TaskMessage]) -> BTreeMap<String, Result<Task>> {
    let mut task_ids: Vec<&str> = messages.iter().map(|m| m.task_id.as_str()).collect();
    task_ids.sort_unstable();
    task_ids.dedup();

    task_ids
        .into_iter()
        .map(|task_id| {
            let result = Task::reconstruct(task_id, messages);
            if let Err(e) = &result {
                warn!(task_id, error = %e, "Task reconstruction failed");
            }
            (task_id.to_string(), result)
        })
        .collect()
}
