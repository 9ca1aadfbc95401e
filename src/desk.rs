use crate::engine::{is_plausible_email, LeadEngine};
use crate::errors::{AppError, AppResult};
use crate::lifecycle::ToggleCommand;
use crate::models::{
    Agent, Lead, LeadField, LeaderboardData, MeetingRequest, MeetingRequestPayload, NewLead, NewLeadPayload,
    SubmittedLead, TimeWindow, ToggleOutcome,
};
use crate::notify::{agent_lead_notification, lead_confirmation, meeting_confirmation, NotificationDispatcher};
use std::sync::Arc;

const DEFAULT_MEETING_TYPE: &str = "Virtual";
const DEFAULT_MEETING_STATUS: &str = "Pending";

/// Host-facing entry point: resolves agents, records writes through the
/// engine and fires the matching emails.
#[derive(Clone)]
pub struct LeadDesk {
    engine: Arc<LeadEngine>,
    notifications: NotificationDispatcher,
}

impl LeadDesk {
    pub fn new(engine: Arc<LeadEngine>, notifications: NotificationDispatcher) -> Self {
        Self {
            engine,
            notifications,
        }
    }

    pub fn engine(&self) -> &Arc<LeadEngine> {
        &self.engine
    }

    pub async fn submit_lead(&self, payload: NewLeadPayload) -> AppResult<SubmittedLead> {
        if payload.agent_id.trim().is_empty() {
            return Err(AppError::Validation("Missing required fields: agentId".to_string()));
        }
        let agent = self.resolve_agent(&payload.agent_id)?;

        let meeting = payload
            .meeting
            .filter(|meeting| !meeting.preferred_date.trim().is_empty());

        let lead = self.engine.create_lead(NewLead {
            agent: agent.to_agent_ref(),
            first_name: payload.first_name,
            last_name: payload.last_name,
            client_email: payload.client_email,
            client_phone: payload.client_phone,
            package: payload.package_id,
            company_name: payload.company_name,
            team_size: payload.team_size,
            preferred_contact: payload.preferred_contact,
            best_time: payload.best_time,
            notes: payload.notes,
            lead_source: None,
        })?;

        self.notifications.dispatch(lead_confirmation(&lead, &agent));
        self.notifications.dispatch(agent_lead_notification(&lead, &agent));

        let meeting_requested = match meeting {
            Some(preference) => {
                let request = MeetingRequest {
                    timestamp: self.engine.now_timestamp(),
                    agent_name: agent.full_name.clone(),
                    agent_email: agent.email.clone(),
                    client_name: lead.client_name(),
                    client_email: lead.client_email.clone(),
                    client_phone: lead.client_phone.clone(),
                    package_interest: lead.package.clone(),
                    preferred_date: preference.preferred_date,
                    preferred_time: preference.preferred_time,
                    meeting_type: DEFAULT_MEETING_TYPE.to_string(),
                    notes: preference.notes,
                    status: DEFAULT_MEETING_STATUS.to_string(),
                };
                self.engine.create_meeting_request(&request)?;
                self.notifications.dispatch(meeting_confirmation(&request));
                true
            }
            None => false,
        };

        Ok(SubmittedLead {
            lead_id: lead.lead_id,
            meeting_requested,
        })
    }

    pub async fn request_meeting(&self, payload: MeetingRequestPayload) -> AppResult<MeetingRequest> {
        validate_meeting(&payload)?;
        let agent = self.resolve_agent(&payload.agent_id)?;

        let request = MeetingRequest {
            timestamp: self.engine.now_timestamp(),
            agent_name: agent.full_name,
            agent_email: agent.email,
            client_name: payload.client_name.trim().to_string(),
            client_email: payload.client_email.trim().to_string(),
            client_phone: payload.client_phone,
            package_interest: payload.package_id,
            preferred_date: payload.preferred_date,
            preferred_time: payload.preferred_time,
            meeting_type: DEFAULT_MEETING_TYPE.to_string(),
            notes: payload.notes,
            status: DEFAULT_MEETING_STATUS.to_string(),
        };
        self.engine.create_meeting_request(&request)?;
        self.notifications.dispatch(meeting_confirmation(&request));
        Ok(request)
    }

    /// Flips `field` on the lead inside `view` optimistically, then persists.
    /// The local copy is restored if the transition is gated or the write fails.
    pub fn toggle_lead(&self, view: &mut [Lead], lead_id: &str, field: LeadField) -> AppResult<ToggleOutcome> {
        let lead = view
            .iter_mut()
            .find(|lead| lead.lead_id == lead_id)
            .ok_or_else(|| AppError::NotFound(format!("Lead {} not in view", lead_id)))?;

        let desired = !lead.flag(field);
        let Some(command) = ToggleCommand::prepare(lead, field, desired) else {
            return Ok(ToggleOutcome::PreconditionFailed {
                lead_id: lead_id.to_string(),
                field,
            });
        };

        command.apply(lead);
        match self.engine.toggle_field(lead_id, field, desired) {
            Ok(outcome @ ToggleOutcome::Applied { .. }) => Ok(outcome),
            Ok(outcome) => {
                command.rollback(lead);
                Ok(outcome)
            }
            Err(error) => {
                command.rollback(lead);
                tracing::warn!(error = %error, lead_id, field = field.as_str(), "toggle reverted");
                Err(error)
            }
        }
    }

    pub fn toggle_field(&self, lead_id: &str, field: LeadField, value: bool) -> AppResult<ToggleOutcome> {
        self.engine.toggle_field(lead_id, field, value)
    }

    pub fn leaderboard(&self, window: TimeWindow) -> AppResult<LeaderboardData> {
        self.engine.get_leaderboard(window)
    }

    pub fn agent_leads(&self, agent_id: &str) -> AppResult<Vec<Lead>> {
        let agent = self.resolve_agent(agent_id)?;
        self.engine.leads_for_agent(&agent)
    }

    fn resolve_agent(&self, agent_id: &str) -> AppResult<Agent> {
        self.engine
            .find_agent(agent_id)?
            .ok_or_else(|| AppError::NotFound(format!("Agent {} not found", agent_id.trim())))
    }
}

fn validate_meeting(payload: &MeetingRequestPayload) -> AppResult<()> {
    let missing = [
        ("agentId", &payload.agent_id),
        ("clientName", &payload.client_name),
        ("clientEmail", &payload.client_email),
        ("preferredDate", &payload.preferred_date),
        ("preferredTime", &payload.preferred_time),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(key, _)| key)
    .collect::<Vec<_>>();

    if !missing.is_empty() {
        return Err(AppError::Validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }
    if !is_plausible_email(&payload.client_email) {
        return Err(AppError::Validation(format!(
            "Invalid client email: {}",
            payload.client_email.trim()
        )));
    }
    Ok(())
}
