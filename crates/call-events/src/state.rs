use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a call, from first packet to terminal archive.
///
/// Transitions outside the graph encoded in [`CallState::can_transition_to`]
/// never reach the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallState {
	InProgress,
	ProcessingAi,
	Completed,
	Failed,
	Archived,
}

/// Processing status of a call's AI result row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AiStatus {
	Processing,
	Completed,
	Failed,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
	#[error("illegal transition: {from} -> {to}")]
	IllegalTransition { from: CallState, to: CallState },

	#[error("unknown call state: {0}")]
	UnknownState(String),

	#[error("unknown ai status: {0}")]
	UnknownStatus(String),
}

impl CallState {
	/// Wire and storage form of the state.
	pub fn as_str(&self) -> &'static str {
		match self {
			CallState::InProgress => "IN_PROGRESS",
			CallState::ProcessingAi => "PROCESSING_AI",
			CallState::Completed => "COMPLETED",
			CallState::Failed => "FAILED",
			CallState::Archived => "ARCHIVED",
		}
	}

	pub fn can_transition_to(&self, next: CallState) -> bool {
		use CallState::*;
		matches!(
			(*self, next),
			(InProgress, ProcessingAi) | (InProgress, Failed) | (InProgress, Completed) | (ProcessingAi, Completed) | (ProcessingAi, Failed) | (Failed, ProcessingAi) | (Failed, Archived) | (Completed, Archived)
		)
	}

	/// Validate a proposed transition, returning the new state on success.
	pub fn transition(&self, next: CallState) -> Result<CallState, StateError> {
		if self.can_transition_to(next) {
			Ok(next)
		} else {
			Err(StateError::IllegalTransition { from: *self, to: next })
		}
	}

	/// Terminal states accept no further transitions.
	pub fn is_terminal(&self) -> bool {
		matches!(self, CallState::Archived)
	}
}

impl fmt::Display for CallState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

impl std::str::FromStr for CallState {
	type Err = StateError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"IN_PROGRESS" => Ok(CallState::InProgress),
			"PROCESSING_AI" => Ok(CallState::ProcessingAi),
			"COMPLETED" => Ok(CallState::Completed),
			"FAILED" => Ok(CallState::Failed),
			"ARCHIVED" => Ok(CallState::Archived),
			_ => Err(StateError::UnknownState(s.to_string())),
		}
	}
}

impl TryFrom<String> for CallState {
	type Error = StateError;

	fn try_from(s: String) -> Result<Self, Self::Error> {
		s.parse()
	}
}

impl AiStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			AiStatus::Processing => "PROCESSING",
			AiStatus::Completed => "COMPLETED",
			AiStatus::Failed => "FAILED",
		}
	}
}

impl fmt::Display for AiStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

impl std::str::FromStr for AiStatus {
	type Err = StateError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"PROCESSING" => Ok(AiStatus::Processing),
			"COMPLETED" => Ok(AiStatus::Completed),
			"FAILED" => Ok(AiStatus::Failed),
			_ => Err(StateError::UnknownStatus(s.to_string())),
		}
	}
}

impl TryFrom<String> for AiStatus {
	type Error = StateError;

	fn try_from(s: String) -> Result<Self, Self::Error> {
		s.parse()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use CallState::*;

	#[test]
	fn test_legal_transitions() {
		assert!(InProgress.can_transition_to(ProcessingAi));
		assert!(InProgress.can_transition_to(Failed));
		assert!(InProgress.can_transition_to(Completed));
		assert!(ProcessingAi.can_transition_to(Completed));
		assert!(ProcessingAi.can_transition_to(Failed));
		assert!(Failed.can_transition_to(ProcessingAi));
		assert!(Failed.can_transition_to(Archived));
		assert!(Completed.can_transition_to(Archived));
	}

	#[test]
	fn test_illegal_transitions() {
		assert!(!InProgress.can_transition_to(Archived));
		assert!(!InProgress.can_transition_to(InProgress));
		assert!(!ProcessingAi.can_transition_to(InProgress));
		assert!(!ProcessingAi.can_transition_to(ProcessingAi));
		assert!(!ProcessingAi.can_transition_to(Archived));
		assert!(!Completed.can_transition_to(InProgress));
		assert!(!Completed.can_transition_to(ProcessingAi));
		assert!(!Completed.can_transition_to(Failed));
		assert!(!Failed.can_transition_to(InProgress));
		assert!(!Failed.can_transition_to(Completed));
	}

	#[test]
	fn test_archived_is_frozen() {
		for next in [InProgress, ProcessingAi, Completed, Failed, Archived] {
			assert!(!Archived.can_transition_to(next), "ARCHIVED must not transition to {next}");
		}
		assert!(Archived.is_terminal());
	}

	#[test]
	fn test_transition_returns_next_state() {
		assert_eq!(InProgress.transition(ProcessingAi), Ok(ProcessingAi));
	}

	#[test]
	fn test_transition_error_names_both_states() {
		let err = Completed.transition(Failed).unwrap_err();
		assert_eq!(err, StateError::IllegalTransition { from: Completed, to: Failed });
		assert!(err.to_string().contains("COMPLETED"));
		assert!(err.to_string().contains("FAILED"));
	}

	#[test]
	fn test_state_round_trips_through_string() {
		for state in [InProgress, ProcessingAi, Completed, Failed, Archived] {
			let parsed: CallState = state.as_str().parse().unwrap();
			assert_eq!(parsed, state);
		}
	}

	#[test]
	fn test_unknown_state_rejected() {
		assert!("in_progress".parse::<CallState>().is_err());
		assert!("".parse::<CallState>().is_err());
	}

	#[test]
	fn test_ai_status_round_trips() {
		for status in [AiStatus::Processing, AiStatus::Completed, AiStatus::Failed] {
			let parsed: AiStatus = status.as_str().parse().unwrap();
			assert_eq!(parsed, status);
		}
	}

	#[test]
	fn test_serde_uses_wire_form() {
		let json = serde_json::to_string(&ProcessingAi).unwrap();
		assert_eq!(json, "\"PROCESSING_AI\"");
		let back: CallState = serde_json::from_str(&json).unwrap();
		assert_eq!(back, ProcessingAi);
	}
}
