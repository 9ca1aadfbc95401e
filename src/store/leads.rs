use super::{
    agent_cols, bool_cell, cell, lead_cols, meeting_cols, parse_bool_cell, Row, RowStore, AGENT_HEADERS,
    FIRST_DATA_ROW, LEAD_HEADERS, MEETING_HEADERS,
};
use crate::catalog::canonical_package_id;
use crate::errors::{AppError, AppResult};
use crate::models::{Agent, AgentRef, Lead, LeadField, MeetingRequest};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetNames {
    pub leads: String,
    pub agents: String,
    pub meetings: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            leads: "Leads".to_string(),
            agents: "Agent Credentials".to_string(),
            meetings: "Meeting Requests".to_string(),
        }
    }
}

/// A lead together with its physical row. The row index never leaves the
/// store layer.
#[derive(Debug, Clone)]
pub struct StoredLead {
    pub lead: Lead,
    row_index: usize,
}

/// Translates between sheet rows and domain entities.
#[derive(Clone)]
pub struct LeadStore {
    rows: Arc<dyn RowStore>,
    sheets: SheetNames,
}

impl LeadStore {
    pub fn new(rows: Arc<dyn RowStore>, sheets: SheetNames) -> Self {
        Self { rows, sheets }
    }

    pub fn sheets(&self) -> &SheetNames {
        &self.sheets
    }

    pub fn ensure_headers(&self) -> AppResult<()> {
        self.rows.ensure_sheet(&self.sheets.agents, &AGENT_HEADERS)?;
        self.rows.ensure_sheet(&self.sheets.leads, &LEAD_HEADERS)?;
        self.rows.ensure_sheet(&self.sheets.meetings, &MEETING_HEADERS)?;
        Ok(())
    }

    pub fn load_leads(&self) -> AppResult<Vec<StoredLead>> {
        let rows = self.rows.read_rows(&self.sheets.leads)?;
        let leads = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| !is_blank(row))
            .map(|(offset, row)| {
                let row_index = offset + FIRST_DATA_ROW;
                StoredLead {
                    lead: lead_from_row(row, row_index),
                    row_index,
                }
            })
            .collect::<Vec<_>>();
        tracing::debug!(sheet = %self.sheets.leads, count = leads.len(), "loaded lead rows");
        Ok(leads)
    }

    pub fn locate(&self, lead_id: &str) -> AppResult<StoredLead> {
        self.load_leads()?
            .into_iter()
            .find(|stored| stored.lead.lead_id == lead_id)
            .ok_or_else(|| AppError::NotFound(format!("Lead {} not found", lead_id)))
    }

    pub fn append_lead(&self, lead: &Lead) -> AppResult<()> {
        self.rows.append_row(&self.sheets.leads, lead_to_row(lead))
    }

    pub fn write_flag(&self, stored: &StoredLead, field: LeadField, value: bool) -> AppResult<()> {
        let column = match field {
            LeadField::MeetingDone => lead_cols::MEETING_DONE,
            LeadField::PaymentReceived => lead_cols::PAYMENT_RECEIVED,
        };
        self.rows
            .update_cell(&self.sheets.leads, stored.row_index, column, bool_cell(value))
    }

    pub fn load_agents(&self) -> AppResult<Vec<Agent>> {
        let rows = self.rows.read_rows(&self.sheets.agents)?;
        Ok(rows
            .iter()
            .filter(|row| !cell(row, agent_cols::AGENT_ID).trim().is_empty())
            .map(|row| Agent {
                agent_id: cell(row, agent_cols::AGENT_ID).trim().to_string(),
                full_name: cell(row, agent_cols::FULL_NAME).to_string(),
                email: cell(row, agent_cols::EMAIL).to_string(),
                phone: cell(row, agent_cols::PHONE).to_string(),
            })
            .collect())
    }

    pub fn find_agent_by_id(&self, agent_id: &str) -> AppResult<Option<Agent>> {
        let agent_id = agent_id.trim();
        Ok(self
            .load_agents()?
            .into_iter()
            .find(|agent| agent.agent_id == agent_id))
    }

    pub fn append_meeting(&self, meeting: &MeetingRequest) -> AppResult<()> {
        self.rows.append_row(&self.sheets.meetings, meeting_to_row(meeting))
    }
}

fn is_blank(row: &[String]) -> bool {
    row.iter().all(|value| value.trim().is_empty())
}

/// Rows written before the id column existed get an id derived from their
/// position and content. Rows are never removed, so it stays stable across
/// scans, and two identical rows still get distinct ids.
fn legacy_lead_id(row: &[String], row_index: usize) -> String {
    let seed = format!(
        "{}|{}|{}|{}",
        row_index,
        cell(row, lead_cols::AGENT_EMAIL).trim().to_lowercase(),
        cell(row, lead_cols::TIMESTAMP).trim(),
        cell(row, lead_cols::CLIENT_EMAIL).trim().to_lowercase(),
    );
    Uuid::new_v5(&Uuid::NAMESPACE_OID, seed.as_bytes()).to_string()
}

pub(crate) fn lead_from_row(row: &[String], row_index: usize) -> Lead {
    let lead_id = match cell(row, lead_cols::LEAD_ID).trim() {
        "" => legacy_lead_id(row, row_index),
        id => id.to_string(),
    };
    let agent_id = match cell(row, lead_cols::AGENT_ID).trim() {
        "" => None,
        id => Some(id.to_string()),
    };

    Lead {
        lead_id,
        timestamp: cell(row, lead_cols::TIMESTAMP).to_string(),
        agent: AgentRef {
            id: agent_id,
            name: cell(row, lead_cols::AGENT_NAME).to_string(),
            email: cell(row, lead_cols::AGENT_EMAIL).to_string(),
        },
        first_name: cell(row, lead_cols::FIRST_NAME).to_string(),
        last_name: cell(row, lead_cols::LAST_NAME).to_string(),
        client_email: cell(row, lead_cols::CLIENT_EMAIL).to_string(),
        client_phone: cell(row, lead_cols::CLIENT_PHONE).to_string(),
        package: canonical_package_id(cell(row, lead_cols::PACKAGE)),
        company_name: cell(row, lead_cols::COMPANY_NAME).to_string(),
        team_size: cell(row, lead_cols::TEAM_SIZE).to_string(),
        preferred_contact: cell(row, lead_cols::PREFERRED_CONTACT).to_string(),
        best_time: cell(row, lead_cols::BEST_TIME).to_string(),
        notes: cell(row, lead_cols::NOTES).to_string(),
        meeting_done: parse_bool_cell(cell(row, lead_cols::MEETING_DONE)),
        payment_received: parse_bool_cell(cell(row, lead_cols::PAYMENT_RECEIVED)),
        status: cell(row, lead_cols::STATUS).to_string(),
        lead_source: cell(row, lead_cols::LEAD_SOURCE).to_string(),
    }
}

pub(crate) fn lead_to_row(lead: &Lead) -> Row {
    let mut row = vec![String::new(); lead_cols::WIDTH];
    row[lead_cols::TIMESTAMP] = lead.timestamp.clone();
    row[lead_cols::AGENT_NAME] = lead.agent.name.clone();
    row[lead_cols::AGENT_EMAIL] = lead.agent.email.clone();
    row[lead_cols::FIRST_NAME] = lead.first_name.clone();
    row[lead_cols::LAST_NAME] = lead.last_name.clone();
    row[lead_cols::CLIENT_EMAIL] = lead.client_email.clone();
    row[lead_cols::CLIENT_PHONE] = lead.client_phone.clone();
    row[lead_cols::PACKAGE] = lead.package.clone();
    row[lead_cols::COMPANY_NAME] = lead.company_name.clone();
    row[lead_cols::TEAM_SIZE] = lead.team_size.clone();
    row[lead_cols::PREFERRED_CONTACT] = lead.preferred_contact.clone();
    row[lead_cols::BEST_TIME] = lead.best_time.clone();
    row[lead_cols::NOTES] = lead.notes.clone();
    row[lead_cols::MEETING_DONE] = bool_cell(lead.meeting_done).to_string();
    row[lead_cols::PAYMENT_RECEIVED] = bool_cell(lead.payment_received).to_string();
    row[lead_cols::STATUS] = lead.status.clone();
    row[lead_cols::LEAD_SOURCE] = lead.lead_source.clone();
    row[lead_cols::LEAD_ID] = lead.lead_id.clone();
    row[lead_cols::AGENT_ID] = lead.agent.id.clone().unwrap_or_default();
    row
}

fn meeting_to_row(meeting: &MeetingRequest) -> Row {
    let mut row = vec![String::new(); meeting_cols::WIDTH];
    row[meeting_cols::TIMESTAMP] = meeting.timestamp.clone();
    row[meeting_cols::AGENT_NAME] = meeting.agent_name.clone();
    row[meeting_cols::AGENT_EMAIL] = meeting.agent_email.clone();
    row[meeting_cols::CLIENT_NAME] = meeting.client_name.clone();
    row[meeting_cols::CLIENT_EMAIL] = meeting.client_email.clone();
    row[meeting_cols::CLIENT_PHONE] = meeting.client_phone.clone();
    row[meeting_cols::PACKAGE_INTEREST] = meeting.package_interest.clone();
    row[meeting_cols::PREFERRED_DATE] = meeting.preferred_date.clone();
    row[meeting_cols::PREFERRED_TIME] = meeting.preferred_time.clone();
    row[meeting_cols::MEETING_TYPE] = meeting.meeting_type.clone();
    row[meeting_cols::NOTES] = meeting.notes.clone();
    row[meeting_cols::STATUS] = meeting.status.clone();
    row
}
