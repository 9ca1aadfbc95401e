use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LeadField {
    MeetingDone,
    PaymentReceived,
}

impl LeadField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MeetingDone => "meetingDone",
            Self::PaymentReceived => "paymentReceived",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "meetingDone" => Some(Self::MeetingDone),
            "paymentReceived" => Some(Self::PaymentReceived),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TimeWindow {
    Today,
    Week,
    Month,
    #[default]
    All,
}

impl TimeWindow {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Week => "week",
            Self::Month => "month",
            Self::All => "all",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "today" => Some(Self::Today),
            "week" => Some(Self::Week),
            "month" => Some(Self::Month),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::Week => "This Week",
            Self::Month => "This Month",
            Self::All => "All Time",
        }
    }
}

/// Agent attribution carried on every lead row. `id` is absent on rows
/// written before the agent id column existed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AgentRef {
    pub id: Option<String>,
    pub name: String,
    pub email: String,
}

impl AgentRef {
    pub fn normalized_email(&self) -> String {
        self.email.trim().to_lowercase()
    }

    pub fn is_known(&self) -> bool {
        self.id.as_deref().is_some_and(|id| !id.trim().is_empty()) || !self.email.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub lead_id: String,
    pub timestamp: String,
    pub agent: AgentRef,
    pub first_name: String,
    pub last_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub package: String,
    pub company_name: String,
    pub team_size: String,
    pub preferred_contact: String,
    pub best_time: String,
    pub notes: String,
    pub meeting_done: bool,
    pub payment_received: bool,
    pub status: String,
    pub lead_source: String,
}

impl Lead {
    pub fn client_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }

    pub fn flag(&self, field: LeadField) -> bool {
        match field {
            LeadField::MeetingDone => self.meeting_done,
            LeadField::PaymentReceived => self.payment_received,
        }
    }
}

/// Fields the engine needs to record a new lead. The agent has already been
/// resolved by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLead {
    pub agent: AgentRef,
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub package: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub team_size: String,
    #[serde(default)]
    pub preferred_contact: String,
    #[serde(default)]
    pub best_time: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub lead_source: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingPreference {
    pub preferred_date: String,
    #[serde(default)]
    pub preferred_time: String,
    #[serde(default)]
    pub notes: String,
}

/// Form submission as posted from an agent's QR landing page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLeadPayload {
    pub agent_id: String,
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub package_id: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub team_size: String,
    #[serde(default)]
    pub preferred_contact: String,
    #[serde(default)]
    pub best_time: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub meeting: Option<MeetingPreference>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedLead {
    pub lead_id: String,
    pub meeting_requested: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingRequestPayload {
    pub agent_id: String,
    pub client_name: String,
    pub client_email: String,
    #[serde(default)]
    pub client_phone: String,
    #[serde(default)]
    pub package_id: String,
    pub preferred_date: String,
    pub preferred_time: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingRequest {
    pub timestamp: String,
    pub agent_name: String,
    pub agent_email: String,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub package_interest: String,
    pub preferred_date: String,
    pub preferred_time: String,
    pub meeting_type: String,
    pub notes: String,
    pub status: String,
}

/// Directory entry for a sales agent. Credential columns are never loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub agent_id: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
}

impl Agent {
    pub fn to_agent_ref(&self) -> AgentRef {
        AgentRef {
            id: Some(self.agent_id.clone()),
            name: self.full_name.clone(),
            email: self.email.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentLeaderboardStats {
    pub agent_id: Option<String>,
    pub full_name: String,
    pub email: String,
    pub total_leads: u32,
    pub meetings_done: u32,
    pub payment_received: u32,
    pub revenue: u64,
    pub meeting_rate: f64,
    pub conversion_rate: f64,
    pub leads: Vec<Lead>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardData {
    pub window: TimeWindow,
    pub leaderboard: Vec<AgentLeaderboardStats>,
    pub recent_leads: Vec<Lead>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase", tag = "outcome")]
pub enum ToggleOutcome {
    Applied {
        lead_id: String,
        field: LeadField,
        value: bool,
    },
    PreconditionFailed {
        lead_id: String,
        field: LeadField,
    },
}

impl ToggleOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}
