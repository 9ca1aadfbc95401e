use crate::catalog::find_package;
use crate::errors::AppResult;
use crate::models::{Agent, Lead, MeetingRequest};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailTemplate {
    LeadConfirmation,
    AgentLeadNotification,
    MeetingConfirmation,
}

impl EmailTemplate {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LeadConfirmation => "lead_confirmation",
            Self::AgentLeadNotification => "agent_lead_notification",
            Self::MeetingConfirmation => "meeting_confirmation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundEmail {
    pub to: String,
    /// Agent mailbox the message is sent on behalf of.
    pub sender: String,
    pub template: EmailTemplate,
    pub data: serde_json::Value,
}

/// Mail transport. Implementations may block.
pub trait Notifier: Send + Sync {
    fn send_email(&self, email: &OutboundEmail) -> AppResult<()>;
}

/// Writes emails to the log instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send_email(&self, email: &OutboundEmail) -> AppResult<()> {
        tracing::info!(
            to = %email.to,
            template = email.template.as_str(),
            "email delivery skipped; no transport configured"
        );
        Ok(())
    }
}

/// Sends email off the request path. Failures are logged and swallowed; a
/// lead write never fails because of mail.
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Option<Arc<dyn Notifier>>,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier: Some(notifier),
        }
    }

    pub fn disabled() -> Self {
        Self { notifier: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.notifier.is_some()
    }

    /// Must be called from within a Tokio runtime.
    pub fn dispatch(&self, email: OutboundEmail) -> Option<JoinHandle<()>> {
        let notifier = self.notifier.clone()?;
        Some(tokio::task::spawn_blocking(move || {
            if let Err(error) = notifier.send_email(&email) {
                tracing::warn!(
                    error = %error,
                    to = %email.to,
                    template = email.template.as_str(),
                    "email delivery failed"
                );
            }
        }))
    }
}

fn package_summary(raw: &str) -> (String, String, Option<String>) {
    match find_package(raw) {
        Some(package) => (
            package.full_name.to_string(),
            package.price_label(),
            package.enroll_url.map(ToString::to_string),
        ),
        None => (raw.to_string(), "Custom Pricing".to_string(), None),
    }
}

pub fn lead_confirmation(lead: &Lead, agent: &Agent) -> OutboundEmail {
    let (package_name, price, enroll_url) = package_summary(&lead.package);
    OutboundEmail {
        to: lead.client_email.clone(),
        sender: agent.email.clone(),
        template: EmailTemplate::LeadConfirmation,
        data: json!({
            "clientName": lead.client_name(),
            "agentName": agent.full_name,
            "packageName": package_name,
            "price": price,
            "enrollUrl": enroll_url,
        }),
    }
}

pub fn agent_lead_notification(lead: &Lead, agent: &Agent) -> OutboundEmail {
    let (package_name, price, _) = package_summary(&lead.package);
    OutboundEmail {
        to: agent.email.clone(),
        sender: agent.email.clone(),
        template: EmailTemplate::AgentLeadNotification,
        data: json!({
            "agentName": agent.full_name,
            "clientName": lead.client_name(),
            "clientEmail": lead.client_email,
            "clientPhone": lead.client_phone,
            "companyName": lead.company_name,
            "teamSize": lead.team_size,
            "preferredContact": lead.preferred_contact,
            "bestTime": lead.best_time,
            "notes": lead.notes,
            "packageName": package_name,
            "price": price,
        }),
    }
}

pub fn meeting_confirmation(meeting: &MeetingRequest) -> OutboundEmail {
    let (package_name, _, _) = package_summary(&meeting.package_interest);
    OutboundEmail {
        to: meeting.client_email.clone(),
        sender: meeting.agent_email.clone(),
        template: EmailTemplate::MeetingConfirmation,
        data: json!({
            "clientName": meeting.client_name,
            "agentName": meeting.agent_name,
            "packageName": package_name,
            "preferredDate": meeting.preferred_date,
            "preferredTime": meeting.preferred_time,
            "meetingType": meeting.meeting_type,
        }),
    }
}
