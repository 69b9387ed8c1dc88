//! Per-session login state and the policy operations gated on it.
//!
//! A [`SessionWorkflow`] owns only its binding; the store is borrowed per
//! call so several sessions can share one [`RecordStore`]. Every mutation
//! changes one record in memory and then rewrites the whole store. A failed
//! rewrite is returned to the caller but the in-memory change is kept.

use serde_json::{json, Value};

use crate::errors::HomecoverError;
use crate::logging::append_run_log;
use crate::matching::{
    match_credentials, match_free_text, normalize_cover_key, Credentials, MatchReason,
};
use crate::record_store::RecordStore;
use crate::summary::SummaryArtifact;
use crate::types::{PolicyRecord, PolicyStatus};

type SessionResult<T> = Result<T, HomecoverError>;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Authenticated { policy_number: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Success {
        policy_number: String,
        full_name: String,
        reason: MatchReason,
    },
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverUpdate {
    pub policy_number: String,
    pub cover_key: String,
    pub new_limit: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub policy_number: String,
    pub status: PolicyStatus,
}

#[derive(Debug, Clone, Default)]
pub struct SessionWorkflow {
    state: SessionState,
}

impl SessionWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn current_policy(&self) -> Option<&str> {
        match &self.state {
            SessionState::Authenticated { policy_number } => Some(policy_number),
            SessionState::Unauthenticated => None,
        }
    }

    /// Free-text login. On no match the previous binding, if any, is kept.
    pub fn authenticate(&mut self, store: &RecordStore, free_text: &str) -> AuthOutcome {
        let found = match_free_text(store.records(), free_text);
        self.bind(found, "free_text")
    }

    /// Structured login: policy number and postcode, or full name and date
    /// of birth, compared for equality.
    pub fn authenticate_with_credentials(
        &mut self,
        store: &RecordStore,
        credentials: &Credentials,
    ) -> AuthOutcome {
        let found = match_credentials(store.records(), credentials);
        self.bind(found, "credentials")
    }

    fn bind(&mut self, found: Option<(&PolicyRecord, MatchReason)>, method: &str) -> AuthOutcome {
        let Some((record, reason)) = found else {
            append_run_log("warn", "session.auth.failed", json!({ "method": method }));
            return AuthOutcome::Failed;
        };
        append_run_log(
            "info",
            "session.auth.succeeded",
            json!({
                "method": method,
                "reason": format!("{reason:?}"),
                "policy_number": record.policy_number,
            }),
        );
        self.state = SessionState::Authenticated {
            policy_number: record.policy_number.clone(),
        };
        AuthOutcome::Success {
            policy_number: record.policy_number.clone(),
            full_name: record.full_name.clone(),
            reason,
        }
    }

    pub fn get_details(&self, store: &RecordStore) -> SessionResult<PolicyRecord> {
        let policy_number = self.require_policy()?;
        store
            .lookup_by_identifier(policy_number)
            .cloned()
            .ok_or_else(|| HomecoverError::RecordNotFound(policy_number.to_string()))
    }

    pub fn update_cover(
        &self,
        store: &mut RecordStore,
        cover_type: &str,
        new_limit: u64,
    ) -> SessionResult<CoverUpdate> {
        let policy_number = self.require_policy()?;
        let requested = normalize_cover_key(cover_type);
        let record = bound_record(store, policy_number)?;
        // Stored keys are normalized too, so "Contents" in the file resolves.
        let Some(cover_key) = record
            .cover_details
            .keys()
            .find(|key| normalize_cover_key(key) == requested)
            .cloned()
        else {
            return Err(HomecoverError::UnknownCoverType {
                requested: cover_type.to_string(),
                known: record.cover_keys(),
            });
        };
        record
            .cover_details
            .insert(cover_key.clone(), Value::from(new_limit));

        append_run_log(
            "info",
            "session.cover.updated",
            json!({
                "policy_number": policy_number,
                "cover_key": cover_key,
                "new_limit": new_limit,
            }),
        );
        store.persist()?;
        Ok(CoverUpdate {
            policy_number: policy_number.to_string(),
            cover_key,
            new_limit,
        })
    }

    pub fn renew(&self, store: &mut RecordStore) -> SessionResult<StatusChange> {
        self.set_status(store, PolicyStatus::Renewed)
    }

    /// Marks the bound policy cancelled. The record stays in the store.
    pub fn cancel(&self, store: &mut RecordStore) -> SessionResult<StatusChange> {
        self.set_status(store, PolicyStatus::Cancelled)
    }

    // No transition guard: the last status call wins.
    fn set_status(
        &self,
        store: &mut RecordStore,
        status: PolicyStatus,
    ) -> SessionResult<StatusChange> {
        let policy_number = self.require_policy()?;
        bound_record(store, policy_number)?.status = status.clone();
        append_run_log(
            "info",
            "session.status.changed",
            json!({
                "policy_number": policy_number,
                "status": status.as_str(),
            }),
        );
        store.persist()?;
        Ok(StatusChange {
            policy_number: policy_number.to_string(),
            status,
        })
    }

    pub fn export_summary(&self, store: &RecordStore) -> SessionResult<SummaryArtifact> {
        let record = self.get_details(store)?;
        Ok(SummaryArtifact::for_record(&record))
    }

    fn require_policy(&self) -> SessionResult<&str> {
        self.current_policy().ok_or(HomecoverError::NotAuthenticated)
    }
}

fn bound_record<'a>(
    store: &'a mut RecordStore,
    policy_number: &str,
) -> SessionResult<&'a mut PolicyRecord> {
    store
        .lookup_mut(policy_number)
        .ok_or_else(|| HomecoverError::RecordNotFound(policy_number.to_string()))
}
