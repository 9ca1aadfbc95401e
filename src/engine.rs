use crate::cache::LeaderboardCache;
use crate::catalog::canonical_package_id;
use crate::clock::{CalendarZone, Clock};
use crate::config::EngineSettings;
use crate::errors::{AppError, AppResult};
use crate::leaderboard::{aggregate, recent_activity, restrict_to_window, sort_newest_first};
use crate::lifecycle::ToggleCommand;
use crate::models::{Agent, Lead, LeadField, LeaderboardData, MeetingRequest, NewLead, TimeWindow, ToggleOutcome};
use crate::store::{LeadStore, RowStore};
use chrono::{Local, SecondsFormat};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use uuid::Uuid;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Lead lifecycle and leaderboard operations over a row store.
///
/// Every accepted write invalidates the leaderboard cache, but only after the
/// store has confirmed it.
pub struct LeadEngine {
    store: LeadStore,
    cache: LeaderboardCache,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
}

impl LeadEngine {
    pub fn new(rows: Arc<dyn RowStore>, clock: Arc<dyn Clock>, settings: EngineSettings) -> Self {
        let store = LeadStore::new(rows, settings.sheet_names());
        let cache = LeaderboardCache::new(settings.cache_ttl(), clock.clone());
        Self {
            store,
            cache,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn store(&self) -> &LeadStore {
        &self.store
    }

    pub fn ensure_headers(&self) -> AppResult<()> {
        self.store.ensure_headers()
    }

    pub fn now_timestamp(&self) -> String {
        self.clock.now().to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn create_lead(&self, new_lead: NewLead) -> AppResult<Lead> {
        validate_new_lead(&new_lead)?;

        let lead = Lead {
            lead_id: Uuid::new_v4().to_string(),
            timestamp: self.now_timestamp(),
            agent: new_lead.agent,
            first_name: new_lead.first_name.trim().to_string(),
            last_name: new_lead.last_name.trim().to_string(),
            client_email: new_lead.client_email.trim().to_string(),
            client_phone: new_lead.client_phone.trim().to_string(),
            package: canonical_package_id(&new_lead.package),
            company_name: new_lead.company_name,
            team_size: new_lead.team_size,
            preferred_contact: new_lead.preferred_contact,
            best_time: new_lead.best_time,
            notes: new_lead.notes,
            meeting_done: false,
            payment_received: false,
            status: self.settings.default_lead_status.clone(),
            lead_source: new_lead
                .lead_source
                .filter(|source| !source.trim().is_empty())
                .unwrap_or_else(|| self.settings.default_lead_source.clone()),
        };

        self.store.append_lead(&lead)?;
        self.cache.invalidate();
        tracing::info!(
            lead_id = %lead.lead_id,
            agent_email = %lead.agent.email,
            package = %lead.package,
            "lead created"
        );
        Ok(lead)
    }

    /// Sets one flag on a stored lead. A gated transition is reported as
    /// [`ToggleOutcome::PreconditionFailed`] and never reaches the store.
    pub fn toggle_field(&self, lead_id: &str, field: LeadField, value: bool) -> AppResult<ToggleOutcome> {
        let stored = self.store.locate(lead_id)?;
        let Some(command) = ToggleCommand::prepare(&stored.lead, field, value) else {
            tracing::info!(lead_id, field = field.as_str(), value, "transition rejected: meeting not done");
            return Ok(ToggleOutcome::PreconditionFailed {
                lead_id: lead_id.to_string(),
                field,
            });
        };

        self.store.write_flag(&stored, command.field, command.desired)?;
        self.cache.invalidate();
        tracing::info!(
            lead_id,
            field = field.as_str(),
            value,
            previous = command.previous,
            "lead flag updated"
        );
        Ok(ToggleOutcome::Applied {
            lead_id: lead_id.to_string(),
            field,
            value,
        })
    }

    pub fn get_leaderboard(&self, window: TimeWindow) -> AppResult<LeaderboardData> {
        let baseline = self.cache.get_or_rebuild(|| self.rebuild())?;
        if window == TimeWindow::All {
            return Ok(baseline.as_ref().clone());
        }
        let now = self.clock.now();
        Ok(match self.clock.zone() {
            CalendarZone::Local => restrict_to_window(&baseline, window, &now.with_timezone(&Local)),
            CalendarZone::Fixed(offset) => restrict_to_window(&baseline, window, &now.with_timezone(&offset)),
        })
    }

    /// Drops the cached leaderboard so the next read goes to the store.
    pub fn invalidate_cache(&self) {
        self.cache.invalidate();
    }

    /// The agent's own leads, newest first. Legacy rows without an agent id
    /// are matched on the agent's email.
    pub fn leads_for_agent(&self, agent: &Agent) -> AppResult<Vec<Lead>> {
        let email = agent.email.trim().to_lowercase();
        let mut leads = self
            .store
            .load_leads()?
            .into_iter()
            .map(|stored| stored.lead)
            .filter(|lead| match lead.agent.id.as_deref() {
                Some(id) => id == agent.agent_id,
                None => !email.is_empty() && lead.agent.normalized_email() == email,
            })
            .collect::<Vec<_>>();
        sort_newest_first(&mut leads);
        Ok(leads)
    }

    pub fn find_agent(&self, agent_id: &str) -> AppResult<Option<Agent>> {
        self.store.find_agent_by_id(agent_id)
    }

    pub fn create_meeting_request(&self, meeting: &MeetingRequest) -> AppResult<()> {
        self.store.append_meeting(meeting)?;
        tracing::info!(
            agent_email = %meeting.agent_email,
            preferred_date = %meeting.preferred_date,
            "meeting request recorded"
        );
        Ok(())
    }

    fn rebuild(&self) -> AppResult<LeaderboardData> {
        let leads = self
            .store
            .load_leads()?
            .into_iter()
            .map(|stored| stored.lead)
            .collect::<Vec<_>>();
        let leaderboard = aggregate(&leads);
        let recent_leads = recent_activity(&leads, self.settings.recent_activity_limit);
        tracing::debug!(
            leads = leads.len(),
            agents = leaderboard.len(),
            "leaderboard rebuilt"
        );
        Ok(LeaderboardData {
            window: TimeWindow::All,
            leaderboard,
            recent_leads,
            generated_at: self.clock.now(),
        })
    }
}

pub fn validate_new_lead(new_lead: &NewLead) -> AppResult<()> {
    let mut missing = Vec::new();
    if !new_lead.agent.is_known() {
        missing.push("agent");
    }
    if new_lead.first_name.trim().is_empty() {
        missing.push("firstName");
    }
    if new_lead.client_email.trim().is_empty() {
        missing.push("clientEmail");
    }
    if new_lead.client_phone.trim().is_empty() {
        missing.push("clientPhone");
    }
    if new_lead.package.trim().is_empty() {
        missing.push("package");
    }
    if !missing.is_empty() {
        return Err(AppError::Validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }
    if !is_plausible_email(&new_lead.client_email) {
        return Err(AppError::Validation(format!(
            "Invalid client email: {}",
            new_lead.client_email.trim()
        )));
    }
    Ok(())
}

pub fn is_plausible_email(raw: &str) -> bool {
    EMAIL_RE.is_match(raw.trim())
}

#[cfg(test)]
mod tests {
    use super::{validate_new_lead, LeadEngine};
    use crate::clock::ManualClock;
    use crate::config::EngineSettings;
    use crate::errors::AppError;
    use crate::models::{AgentRef, LeadField, NewLead, TimeWindow, ToggleOutcome};
    use crate::store::{MemoryRowStore, RowStore};
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::Arc;

    fn new_lead(package: &str) -> NewLead {
        NewLead {
            agent: AgentRef {
                id: Some("AG-1".to_string()),
                name: "Amira Haddad".to_string(),
                email: "amira@sasa-worldwide.com".to_string(),
            },
            first_name: "Omar".to_string(),
            last_name: "Nasser".to_string(),
            client_email: "omar@example.com".to_string(),
            client_phone: "+971500000000".to_string(),
            package: package.to_string(),
            ..NewLead::default()
        }
    }

    fn setup() -> (Arc<MemoryRowStore>, Arc<ManualClock>, LeadEngine) {
        let rows = Arc::new(MemoryRowStore::new());
        let clock = Arc::new(ManualClock::utc(Utc.with_ymd_and_hms(2026, 10, 21, 9, 0, 0).unwrap()));
        let engine = LeadEngine::new(rows.clone(), clock.clone(), EngineSettings::default());
        engine.ensure_headers().expect("headers");
        (rows, clock, engine)
    }

    #[test]
    fn validation_happens_before_any_store_io() {
        let (rows, _clock, engine) = setup();
        let mut lead = new_lead("starter");
        lead.client_phone = " ".to_string();
        lead.package = String::new();
        let err = engine.create_lead(lead).expect_err("invalid");
        match err {
            AppError::Validation(message) => {
                assert!(message.contains("clientPhone"));
                assert!(message.contains("package"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(rows.write_count("Leads"), 0);

        let mut bad_email = new_lead("starter");
        bad_email.client_email = "not-an-email".to_string();
        assert!(matches!(validate_new_lead(&bad_email), Err(AppError::Validation(_))));
    }

    #[test]
    fn created_lead_starts_new_with_defaults() {
        let (_rows, _clock, engine) = setup();
        let lead = engine.create_lead(new_lead("Starter")).expect("create");
        assert_eq!(lead.package, "starter");
        assert_eq!(lead.status, "New");
        assert_eq!(lead.lead_source, "QR Code");
        assert_eq!(lead.timestamp, "2026-10-21T09:00:00.000Z");
        assert!(!lead.meeting_done && !lead.payment_received);

        let stored = engine.store().locate(&lead.lead_id).expect("stored");
        assert_eq!(stored.lead, lead);
    }

    #[test]
    fn rejected_payment_never_writes() {
        let (rows, _clock, engine) = setup();
        let lead = engine.create_lead(new_lead("starter")).expect("create");
        let writes_before = rows.write_count("Leads");

        let outcome = engine
            .toggle_field(&lead.lead_id, LeadField::PaymentReceived, true)
            .expect("toggle");
        assert!(matches!(outcome, ToggleOutcome::PreconditionFailed { .. }));
        assert_eq!(rows.write_count("Leads"), writes_before);
    }

    #[test]
    fn failed_write_keeps_cache_and_state() {
        let (rows, _clock, engine) = setup();
        let lead = engine.create_lead(new_lead("starter")).expect("create");
        engine.get_leaderboard(TimeWindow::All).expect("warm");
        let reads = rows.read_count("Leads");

        rows.set_fail_writes(true);
        let err = engine
            .toggle_field(&lead.lead_id, LeadField::MeetingDone, true)
            .expect_err("store down");
        assert!(err.is_store_failure());
        rows.set_fail_writes(false);

        let reads_after_toggle = rows.read_count("Leads");
        assert_eq!(reads_after_toggle, reads + 1);
        engine.get_leaderboard(TimeWindow::All).expect("cached");
        assert_eq!(rows.read_count("Leads"), reads_after_toggle);
        let stored = engine.store().locate(&lead.lead_id).expect("stored");
        assert!(!stored.lead.meeting_done);
    }

    #[test]
    fn unknown_lead_is_not_found() {
        let (_rows, _clock, engine) = setup();
        let err = engine
            .toggle_field("missing", LeadField::MeetingDone, true)
            .expect_err("missing");
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn cache_expires_after_ttl() {
        let (rows, clock, engine) = setup();
        engine.create_lead(new_lead("starter")).expect("create");
        engine.get_leaderboard(TimeWindow::All).expect("first");
        engine.get_leaderboard(TimeWindow::Week).expect("filtered reads cached baseline");
        assert_eq!(rows.read_count("Leads"), 1);

        clock.advance(Duration::seconds(30));
        engine.get_leaderboard(TimeWindow::All).expect("expired");
        assert_eq!(rows.read_count("Leads"), 2);
    }

    #[test]
    fn toggle_on_a_duplicated_legacy_row_writes_that_row() {
        let (rows, _clock, engine) = setup();
        let mut legacy = vec![String::new(); 17];
        legacy[0] = "2026-10-01T08:00:00.000Z".to_string();
        legacy[2] = "amira@sasa-worldwide.com".to_string();
        legacy[5] = "omar@example.com".to_string();
        rows.append_row("Leads", legacy.clone()).expect("first");
        rows.append_row("Leads", legacy).expect("second");

        let ids = engine
            .store()
            .load_leads()
            .expect("load")
            .into_iter()
            .map(|stored| stored.lead.lead_id)
            .collect::<Vec<_>>();
        assert_ne!(ids[0], ids[1]);

        let outcome = engine
            .toggle_field(&ids[1], LeadField::MeetingDone, true)
            .expect("toggle");
        assert!(outcome.is_applied());

        let raw = rows.read_rows("Leads").expect("read");
        assert_eq!(raw[0][13], "");
        assert_eq!(raw[1][13], "TRUE");
    }

    #[test]
    fn agent_leads_include_legacy_rows_by_email() {
        let (rows, clock, engine) = setup();
        let first = engine.create_lead(new_lead("starter")).expect("create");
        clock.advance(Duration::minutes(5));
        let second = engine.create_lead(new_lead("enterprise")).expect("create");
        let mut legacy = vec![String::new(); 17];
        legacy[0] = "2026-10-01T08:00:00.000Z".to_string();
        legacy[2] = "AMIRA@sasa-worldwide.com".to_string();
        legacy[3] = "Old".to_string();
        rows.append_row("Leads", legacy).expect("legacy");

        let agent = crate::models::Agent {
            agent_id: "AG-1".to_string(),
            full_name: "Amira Haddad".to_string(),
            email: "amira@sasa-worldwide.com".to_string(),
            phone: String::new(),
        };
        let leads = engine.leads_for_agent(&agent).expect("leads");
        let names = leads.iter().map(|l| l.lead_id.clone()).collect::<Vec<_>>();
        assert_eq!(names.len(), 3);
        assert_eq!(names[0], second.lead_id);
        assert_eq!(names[1], first.lead_id);
        assert_eq!(leads[2].first_name, "Old");
    }
}
