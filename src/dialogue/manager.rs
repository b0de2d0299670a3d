//! DialogueManager: the atomic transition API over the session table.
//!
//! Every operation locks the user's slot for its whole read-validate-write
//! step, so two events from one user can never both advance the same state.
//! Generation orders are handed back to the caller and run after the lock
//! is released.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::channels::OutgoingResponse;
use crate::error::{CommandError, ValidationError};
use crate::generation::{GenerationOrder, PlanScope};
use crate::profile::{UserId, UserProfile};
use crate::store::Database;
use crate::subscription::Entitlements;

use super::prompts;
use super::session::{BufferedFields, DialogueInput, DialogueSession, SessionTable};
use super::state::{DialogueFlow, DialogueState};

/// Result of feeding one input to a user's dialogue.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// The user has no dialogue in progress.
    NoSession,
    /// Input rejected; state unchanged.
    Reprompt {
        error: ValidationError,
        response: OutgoingResponse,
    },
    /// Field buffered; `state` is the next question.
    Advanced {
        state: DialogueState,
        response: OutgoingResponse,
    },
    /// Profile flow finished and the profile was stored.
    ProfileCommitted {
        profile: UserProfile,
        response: OutgoingResponse,
    },
    /// Generation flow finished; the caller runs the order.
    GenerationOrdered(GenerationOrder),
    /// The session reached commit without a complete record and was dropped.
    Aborted { response: OutgoingResponse },
}

pub struct DialogueManager {
    store: Arc<dyn Database>,
    entitlements: Entitlements,
    sessions: SessionTable,
}

impl DialogueManager {
    pub fn new(store: Arc<dyn Database>) -> Self {
        Self {
            entitlements: Entitlements::new(store.clone()),
            store,
            sessions: SessionTable::new(),
        }
    }

    pub fn sessions(&self) -> &SessionTable {
        &self.sessions
    }

    pub async fn state_of(&self, user_id: UserId) -> Option<DialogueState> {
        self.sessions.state_of(user_id).await
    }

    /// Start (or restart) profile collection, replacing any session.
    ///
    /// With a stored profile every field is pre-seeded and the dialogue
    /// starts at the goal question.
    pub async fn start_profile(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<OutgoingResponse, CommandError> {
        let slot = self.sessions.slot(user_id).await;
        let mut guard = slot.lock().await;

        let existing = self.store.get_profile(user_id).await?;
        let mut session = DialogueSession::new(user_id, DialogueFlow::Profile, now);

        let response = match existing {
            Some(profile) => {
                session.fields = BufferedFields::from_profile(&profile);
                session.state = DialogueState::AwaitingGoal;
                prompts::existing_profile(&profile)
            }
            None => prompts::prompt_for(session.state),
        };

        if guard.is_some() {
            debug!(user_id, "Replacing existing dialogue session");
        }
        info!(user_id, state = %session.state, "Profile dialogue started");
        *guard = Some(session);
        Ok(response)
    }

    /// Start a generation dialogue. Refused up front, without touching any
    /// existing session, when the user is not entitled to `scope`.
    pub async fn start_generation(
        &self,
        user_id: UserId,
        scope: PlanScope,
        now: DateTime<Utc>,
    ) -> Result<OutgoingResponse, CommandError> {
        self.entitlements.require(user_id, scope, now).await?;

        let slot = self.sessions.slot(user_id).await;
        let mut guard = slot.lock().await;
        if guard.is_some() {
            debug!(user_id, "Replacing existing dialogue session");
        }
        *guard = Some(DialogueSession::new(
            user_id,
            DialogueFlow::Generation(scope),
            now,
        ));
        info!(user_id, %scope, "Generation dialogue started");
        Ok(prompts::generation_started(scope))
    }

    /// Tear down the user's session. Returns whether one existed.
    pub async fn cancel(&self, user_id: UserId) -> bool {
        let slot = self.sessions.slot(user_id).await;
        let cancelled = slot.lock().await.take().is_some();
        if cancelled {
            info!(user_id, "Dialogue cancelled");
        }
        cancelled
    }

    /// Validate and apply one input under the user's lock.
    pub async fn handle_input(
        &self,
        user_id: UserId,
        input: DialogueInput<'_>,
        now: DateTime<Utc>,
    ) -> Result<Transition, CommandError> {
        let slot = self.sessions.slot(user_id).await;
        let mut guard = slot.lock().await;

        let Some(session) = guard.as_mut() else {
            return Ok(Transition::NoSession);
        };
        session.last_activity = now;
        let from = session.state;

        let state = match session.accept(input) {
            Ok(state) => state,
            Err(error) => {
                match &error {
                    ValidationError::UnknownToken { field, token } => {
                        warn!(user_id, state = %from, field, token, "Unknown selection token");
                    }
                    other => debug!(user_id, state = %from, error = %other, "Input rejected"),
                }
                let response = prompts::reprompt(from, &error);
                return Ok(Transition::Reprompt { error, response });
            }
        };

        debug!(user_id, from = %from, to = %state, "Dialogue advanced");

        if !state.is_terminal() {
            return Ok(Transition::Advanced {
                state,
                response: prompts::prompt_for(state),
            });
        }

        // Committed: the session ends here whatever happens next.
        let Some(session) = guard.take() else {
            return Ok(Transition::NoSession);
        };

        match session.flow {
            DialogueFlow::Profile => {
                let Some(profile) = session.fields.to_profile(user_id, now) else {
                    error!(user_id, "Profile dialogue committed with incomplete fields");
                    return Ok(Transition::Aborted {
                        response: OutgoingResponse::text(
                            "❌ Something went wrong. Please start again with /profile",
                        ),
                    });
                };
                self.store.put_profile(&profile).await?;
                info!(user_id, "Profile saved");
                Ok(Transition::ProfileCommitted {
                    response: prompts::profile_saved(&profile),
                    profile,
                })
            }
            DialogueFlow::Generation(scope) => match session.to_order() {
                Some(order) => Ok(Transition::GenerationOrdered(order)),
                None => {
                    error!(user_id, %scope, "Generation dialogue committed with incomplete fields");
                    Ok(Transition::Aborted {
                        response: OutgoingResponse::text(
                            "❌ Something went wrong. Please start again.",
                        ),
                    })
                }
            },
        }
    }

    pub async fn prune_stale(&self, max_idle: Duration, now: DateTime<Utc>) -> usize {
        self.sessions.prune_stale(max_idle, now).await
    }
}
