use crate::models::{Lead, LeadField};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStage {
    New,
    MeetingDone,
    Paid,
}

impl LeadStage {
    pub fn of(lead: &Lead) -> Self {
        if lead.payment_received {
            Self::Paid
        } else if lead.meeting_done {
            Self::MeetingDone
        } else {
            Self::New
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::MeetingDone => "meeting_done",
            Self::Paid => "paid",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageCounts {
    pub total: u32,
    pub new: u32,
    pub meeting_done: u32,
    pub paid: u32,
}

impl StageCounts {
    pub fn from_leads<'a>(leads: impl IntoIterator<Item = &'a Lead>) -> Self {
        let mut counts = Self::default();
        for lead in leads {
            counts.total += 1;
            match LeadStage::of(lead) {
                LeadStage::New => counts.new += 1,
                LeadStage::MeetingDone => counts.meeting_done += 1,
                LeadStage::Paid => counts.paid += 1,
            }
        }
        counts
    }
}

/// Payment cannot be switched on for a lead that has neither a meeting nor a
/// prior payment. Every other edge is open, including un-marking a meeting on
/// a paid lead.
pub fn transition_allowed(lead: &Lead, field: LeadField, value: bool) -> bool {
    !(field == LeadField::PaymentReceived && value && !lead.meeting_done && !lead.payment_received)
}

/// A single-field flag change that can be applied to a local copy of a lead
/// ahead of the durable write, and undone if that write fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleCommand {
    pub lead_id: String,
    pub field: LeadField,
    pub previous: bool,
    pub desired: bool,
}

impl ToggleCommand {
    /// Returns `None` when the transition is gated.
    pub fn prepare(lead: &Lead, field: LeadField, desired: bool) -> Option<Self> {
        if !transition_allowed(lead, field, desired) {
            return None;
        }
        Some(Self {
            lead_id: lead.lead_id.clone(),
            field,
            previous: lead.flag(field),
            desired,
        })
    }

    pub fn apply(&self, lead: &mut Lead) {
        set_flag(lead, self.field, self.desired);
    }

    pub fn rollback(&self, lead: &mut Lead) {
        set_flag(lead, self.field, self.previous);
    }

    pub fn is_noop(&self) -> bool {
        self.previous == self.desired
    }
}

fn set_flag(lead: &mut Lead, field: LeadField, value: bool) {
    match field {
        LeadField::MeetingDone => lead.meeting_done = value,
        LeadField::PaymentReceived => lead.payment_received = value,
    }
}

#[cfg(test)]
pub(crate) fn sample_lead(lead_id: &str, meeting_done: bool, payment_received: bool) -> Lead {
    use crate::models::AgentRef;
    Lead {
        lead_id: lead_id.to_string(),
        timestamp: "2026-10-19T09:30:00.000Z".to_string(),
        agent: AgentRef {
            id: Some("AG-1".to_string()),
            name: "Amira Haddad".to_string(),
            email: "amira@sasa-worldwide.com".to_string(),
        },
        first_name: "Omar".to_string(),
        last_name: "Nasser".to_string(),
        client_email: "omar@example.com".to_string(),
        client_phone: "+971500000000".to_string(),
        package: "starter".to_string(),
        company_name: String::new(),
        team_size: String::new(),
        preferred_contact: String::new(),
        best_time: String::new(),
        notes: String::new(),
        meeting_done,
        payment_received,
        status: "New".to_string(),
        lead_source: "QR Code".to_string(),
    }
}
