use crate::catalog::package_price;
use crate::models::{AgentLeaderboardStats, AgentRef, Lead, LeaderboardData, TimeWindow};
use crate::window::{filter_leads, timestamp_millis};
use chrono::{DateTime, TimeZone};
use std::collections::HashMap;

/// Grouping identity for an agent. Rows written before agent ids existed only
/// carry the agent's email.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AgentKey {
    Id(String),
    Email(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Tally {
    total_leads: u32,
    meetings_done: u32,
    payment_received: u32,
    revenue: u64,
}

impl Tally {
    fn add(&mut self, lead: &Lead) {
        self.total_leads += 1;
        if lead.meeting_done {
            self.meetings_done += 1;
        }
        if lead.payment_received {
            self.payment_received += 1;
            self.revenue += package_price(&lead.package);
        }
    }

    fn of<'a>(leads: impl IntoIterator<Item = &'a Lead>) -> Self {
        let mut tally = Self::default();
        for lead in leads {
            tally.add(lead);
        }
        tally
    }
}

/// Maps normalized emails to agent ids seen on newer rows, so legacy rows of
/// the same agent fold into the same group.
fn email_index(leads: &[Lead]) -> HashMap<String, String> {
    let mut index = HashMap::new();
    for lead in leads {
        let Some(id) = known_id(&lead.agent) else {
            continue;
        };
        let email = lead.agent.normalized_email();
        if !email.is_empty() {
            index.entry(email).or_insert_with(|| id.to_string());
        }
    }
    index
}

fn known_id(agent: &AgentRef) -> Option<&str> {
    agent
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
}

fn agent_key(agent: &AgentRef, index: &HashMap<String, String>) -> Option<AgentKey> {
    if let Some(id) = known_id(agent) {
        return Some(AgentKey::Id(id.to_string()));
    }
    let email = agent.normalized_email();
    if email.is_empty() {
        return None;
    }
    Some(match index.get(&email) {
        Some(id) => AgentKey::Id(id.clone()),
        None => AgentKey::Email(email),
    })
}

fn stats_from(agent_id: Option<String>, full_name: String, email: String, leads: Vec<Lead>) -> AgentLeaderboardStats {
    let tally = Tally::of(&leads);
    AgentLeaderboardStats {
        agent_id,
        full_name,
        email,
        total_leads: tally.total_leads,
        meetings_done: tally.meetings_done,
        payment_received: tally.payment_received,
        revenue: tally.revenue,
        meeting_rate: ratio(tally.meetings_done, tally.total_leads),
        conversion_rate: ratio(tally.payment_received, tally.total_leads),
        leads,
    }
}

fn ratio(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        0.0
    } else {
        f64::from(part) / f64::from(whole)
    }
}

/// Revenue first, then lead count. The sort is stable so remaining ties keep
/// discovery order.
fn rank(stats: &mut [AgentLeaderboardStats]) {
    stats.sort_by(|a, b| {
        b.revenue
            .cmp(&a.revenue)
            .then_with(|| b.total_leads.cmp(&a.total_leads))
    });
}

/// Folds leads into ranked per-agent statistics. Leads with no agent
/// reference at all are not attributable and are skipped.
pub fn aggregate(leads: &[Lead]) -> Vec<AgentLeaderboardStats> {
    let index = email_index(leads);
    let mut order: HashMap<AgentKey, usize> = HashMap::new();
    let mut groups: Vec<(AgentKey, AgentRef, Vec<Lead>)> = Vec::new();

    for lead in leads {
        let Some(key) = agent_key(&lead.agent, &index) else {
            continue;
        };
        let slot = *order.entry(key.clone()).or_insert_with(|| {
            groups.push((key.clone(), lead.agent.clone(), Vec::new()));
            groups.len() - 1
        });
        let (_, agent, members) = &mut groups[slot];
        if agent.name.trim().is_empty() {
            agent.name = lead.agent.name.clone();
        }
        if agent.email.trim().is_empty() {
            agent.email = lead.agent.email.clone();
        }
        members.push(lead.clone());
    }

    let mut stats = groups
        .into_iter()
        .map(|(key, agent, members)| {
            let agent_id = match key {
                AgentKey::Id(id) => Some(id),
                AgentKey::Email(_) => None,
            };
            stats_from(agent_id, agent.name, agent.email, members)
        })
        .collect::<Vec<_>>();
    rank(&mut stats);
    stats
}

/// Newest first; unparseable timestamps sort as the epoch.
pub fn sort_newest_first(leads: &mut [Lead]) {
    leads.sort_by_key(|lead| std::cmp::Reverse(timestamp_millis(&lead.timestamp).unwrap_or(0)));
}

pub fn recent_activity(leads: &[Lead], limit: usize) -> Vec<Lead> {
    let mut recent = leads
        .iter()
        .filter(|lead| lead.agent.is_known())
        .cloned()
        .collect::<Vec<_>>();
    sort_newest_first(&mut recent);
    recent.truncate(limit);
    recent
}

/// Re-derives every agent's counters from the leads inside `window`. Agents
/// left with no leads are dropped rather than shown with zeroes.
pub fn restrict_to_window<Tz: TimeZone>(
    data: &LeaderboardData,
    window: TimeWindow,
    now: &DateTime<Tz>,
) -> LeaderboardData {
    if window == TimeWindow::All {
        return LeaderboardData {
            window,
            ..data.clone()
        };
    }

    let mut leaderboard = data
        .leaderboard
        .iter()
        .filter_map(|agent| {
            let leads = filter_leads(&agent.leads, window, now);
            if leads.is_empty() {
                return None;
            }
            Some(stats_from(
                agent.agent_id.clone(),
                agent.full_name.clone(),
                agent.email.clone(),
                leads,
            ))
        })
        .collect::<Vec<_>>();
    rank(&mut leaderboard);

    let recent_leads = filter_leads(&data.recent_leads, window, now);

    LeaderboardData {
        window,
        leaderboard,
        recent_leads,
        generated_at: data.generated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::{aggregate, recent_activity, restrict_to_window};
    use crate::lifecycle::sample_lead;
    use crate::models::{AgentRef, Lead, LeaderboardData, TimeWindow};
    use chrono::{FixedOffset, TimeZone, Utc};

    fn lead_for(agent_id: Option<&str>, email: &str, package: &str, meeting: bool, paid: bool) -> Lead {
        let mut lead = sample_lead(&format!("{}-{}", email, package), meeting, paid);
        lead.agent = AgentRef {
            id: agent_id.map(ToString::to_string),
            name: email.split('@').next().unwrap_or_default().to_string(),
            email: email.to_string(),
        };
        lead.package = package.to_string();
        lead
    }

    #[test]
    fn custom_priced_sales_count_but_add_no_revenue() {
        let leads = vec![
            lead_for(Some("A"), "a@x.com", "starter", true, true),
            lead_for(Some("A"), "a@x.com", "starter", true, true),
            lead_for(Some("A"), "a@x.com", "enterprise", true, true),
            lead_for(Some("A"), "a@x.com", "unknown-package", true, true),
        ];
        let stats = aggregate(&leads);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].revenue, 2000);
        assert_eq!(stats[0].payment_received, 4);
        assert_eq!(stats[0].total_leads, 4);
    }

    #[test]
    fn ranking_is_revenue_then_volume_then_discovery() {
        let leads = vec![
            lead_for(Some("low"), "low@x.com", "starter", false, false),
            lead_for(Some("tie-1"), "t1@x.com", "starter", true, true),
            lead_for(Some("tie-2"), "t2@x.com", "Starter", true, true),
            lead_for(Some("big"), "big@x.com", "full-immersion", true, true),
            lead_for(Some("low"), "low@x.com", "starter", false, false),
        ];
        let stats = aggregate(&leads);
        let order = stats
            .iter()
            .map(|s| s.agent_id.clone().unwrap_or_default())
            .collect::<Vec<_>>();
        assert_eq!(order, vec!["big", "tie-1", "tie-2", "low"]);
        for pair in stats.windows(2) {
            assert!(
                pair[0].revenue > pair[1].revenue
                    || (pair[0].revenue == pair[1].revenue && pair[0].total_leads >= pair[1].total_leads)
            );
        }
    }

    #[test]
    fn legacy_rows_fold_into_agent_by_email() {
        let leads = vec![
            lead_for(None, "Sam@X.com", "starter", true, true),
            lead_for(Some("S-1"), "sam@x.com", "starter", false, false),
            lead_for(None, "solo@x.com", "starter", false, false),
        ];
        let stats = aggregate(&leads);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].agent_id.as_deref(), Some("S-1"));
        assert_eq!(stats[0].total_leads, 2);
        assert_eq!(stats[0].revenue, 1000);
        assert_eq!(stats[0].conversion_rate, 0.5);
        assert_eq!(stats[1].agent_id, None);
        assert_eq!(stats[1].email, "solo@x.com");
    }

    #[test]
    fn unattributed_leads_are_skipped() {
        let leads = vec![lead_for(None, "", "starter", true, true)];
        assert!(aggregate(&leads).is_empty());
        assert!(recent_activity(&leads, 50).is_empty());
    }

    #[test]
    fn recent_activity_is_newest_first_and_bounded() {
        let mut leads = Vec::new();
        for day in 1..=9 {
            let mut lead = lead_for(Some("A"), "a@x.com", "starter", false, false);
            lead.lead_id = format!("day-{}", day);
            lead.timestamp = format!("2026-10-0{}T12:00:00Z", day);
            leads.push(lead);
        }
        let mut broken = lead_for(Some("A"), "a@x.com", "starter", false, false);
        broken.lead_id = "broken".to_string();
        broken.timestamp = "n/a".to_string();
        leads.insert(0, broken);

        let recent = recent_activity(&leads, 3);
        let ids = recent.iter().map(|l| l.lead_id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["day-9", "day-8", "day-7"]);

        let all = recent_activity(&leads, 50);
        assert_eq!(all.last().map(|l| l.lead_id.as_str()), Some("broken"));
    }

    #[test]
    fn window_drops_agents_without_matching_leads() {
        let now = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2026, 10, 21, 10, 0, 0)
            .unwrap();
        let mut current = lead_for(Some("A"), "a@x.com", "starter", true, true);
        current.timestamp = "2026-10-20T09:00:00Z".to_string();
        let mut old_paid = lead_for(Some("A"), "a@x.com", "full-immersion", true, true);
        old_paid.timestamp = "2026-09-01T09:00:00Z".to_string();
        let mut stale = lead_for(Some("B"), "b@x.com", "full-immersion", true, true);
        stale.timestamp = "2026-08-01T09:00:00Z".to_string();

        let leads = vec![current, old_paid, stale];
        let data = LeaderboardData {
            window: TimeWindow::All,
            leaderboard: aggregate(&leads),
            recent_leads: recent_activity(&leads, 50),
            generated_at: Utc::now(),
        };
        assert_eq!(data.leaderboard.len(), 2);

        let week = restrict_to_window(&data, TimeWindow::Week, &now);
        assert_eq!(week.window, TimeWindow::Week);
        assert_eq!(week.leaderboard.len(), 1);
        assert_eq!(week.leaderboard[0].agent_id.as_deref(), Some("A"));
        assert_eq!(week.leaderboard[0].total_leads, 1);
        assert_eq!(week.leaderboard[0].revenue, 1000);
        assert_eq!(week.recent_leads.len(), 1);

        let all = restrict_to_window(&data, TimeWindow::All, &now);
        assert_eq!(all.leaderboard, data.leaderboard);
    }
}
