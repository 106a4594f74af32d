//! The fixed research field schema.
//!
//! Every research record carries exactly these fields, in this order. The
//! parser matches model output against the keys, labels and aliases defined
//! here; the writers use the same order for CSV columns and report rows.

use serde::{Deserialize, Serialize};

/// Number of fields in a research record.
pub const RESEARCH_FIELD_COUNT: usize = 27;

/// One named signal captured during prospect research.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchField {
    GeneralReport,
    AiMlInitiatives,
    KeyChallengesSolving,
    HowWeCanHelp,
    PersonalDetails,
    ExecutiveUrgencyEarningsBoardMentions,
    ExecutiveUrgencyInfraCosts,
    RegulatoryComplianceDeadlines,
    RegulatorySoc2EuAiAct,
    IncidentOutageRollback,
    CompetitiveStackUsageRivalVendors,
    FreshFundingPartnerships,
    HiringSpikesMlOpsAiInfra,
    MetricTargetsSlaArrCsatCost,
    NegativeTriggersLayoffsChurnFailedPocs,
    TechnicalDeploymentOnPremProvider,
    TechnicalDeploymentCloudProviders,
    ProductionMaturityInferenceVolume,
    ProductionMaturityFdaCleared,
    ConferenceWebinarQuotes,
    #[serde(rename = "recent_ai_posts_comments_90_days")]
    RecentAiPostsComments90Days,
    ExperienceShiftCareerPivot,
    OrgMapBossPeersReports,
    InternalOkrsScorecards,
    EventActivitySpeakerExhibitor,
    PollParticipationAiCostRegulation,
    BreakageClaimsRolloutGovernance,
}

/// Static description of a research field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Column/JSON key.
    pub key: &'static str,
    /// Label the model is asked to emit (`Label: value`).
    pub label: &'static str,
    /// Extra spellings accepted when matching model output.
    pub aliases: &'static [&'static str],
    /// Why the signal matters for outreach.
    pub why_it_matters: &'static str,
    /// Where the signal is usually found.
    pub how_to_capture: &'static str,
}

impl ResearchField {
    /// All fields, in schema order.
    pub const ALL: [ResearchField; RESEARCH_FIELD_COUNT] = [
        Self::GeneralReport,
        Self::AiMlInitiatives,
        Self::KeyChallengesSolving,
        Self::HowWeCanHelp,
        Self::PersonalDetails,
        Self::ExecutiveUrgencyEarningsBoardMentions,
        Self::ExecutiveUrgencyInfraCosts,
        Self::RegulatoryComplianceDeadlines,
        Self::RegulatorySoc2EuAiAct,
        Self::IncidentOutageRollback,
        Self::CompetitiveStackUsageRivalVendors,
        Self::FreshFundingPartnerships,
        Self::HiringSpikesMlOpsAiInfra,
        Self::MetricTargetsSlaArrCsatCost,
        Self::NegativeTriggersLayoffsChurnFailedPocs,
        Self::TechnicalDeploymentOnPremProvider,
        Self::TechnicalDeploymentCloudProviders,
        Self::ProductionMaturityInferenceVolume,
        Self::ProductionMaturityFdaCleared,
        Self::ConferenceWebinarQuotes,
        Self::RecentAiPostsComments90Days,
        Self::ExperienceShiftCareerPivot,
        Self::OrgMapBossPeersReports,
        Self::InternalOkrsScorecards,
        Self::EventActivitySpeakerExhibitor,
        Self::PollParticipationAiCostRegulation,
        Self::BreakageClaimsRolloutGovernance,
    ];

    /// Position of this field in [`ResearchField::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Snake-case key used for CSV columns and JSON objects.
    pub fn key(self) -> &'static str {
        self.spec().key
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        self.spec().label
    }

    /// Look up a field by its exact key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }

    /// Full static description.
    pub fn spec(self) -> &'static FieldSpec {
        &FIELD_SPECS[self.index()]
    }
}

impl std::fmt::Display for ResearchField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

static FIELD_SPECS: [FieldSpec; RESEARCH_FIELD_COUNT] = [
    FieldSpec {
        key: "general_report",
        label: "General Report",
        aliases: &["person ai project", "person report", "general"],
        why_it_matters: "Understanding the person and role",
        how_to_capture: "LinkedIn, company bio, recent posts",
    },
    FieldSpec {
        key: "ai_ml_initiatives",
        label: "AI/ML Initiatives",
        aliases: &["company ai initiatives", "ai initiatives", "ml initiatives"],
        why_it_matters: "Active AI projects indicate need for infrastructure",
        how_to_capture: "Company blog, press releases, LinkedIn posts",
    },
    FieldSpec {
        key: "key_challenges_solving",
        label: "Key Challenges",
        aliases: &["key challenges", "challenges", "pain points"],
        why_it_matters: "Pain points we can solve",
        how_to_capture: "Technical posts, interviews, conference talks",
    },
    FieldSpec {
        key: "how_we_can_help",
        label: "How We Can Help",
        aliases: &["how truefoundry can help", "truefoundry fit", "fit", "how we help"],
        why_it_matters: "Value proposition alignment",
        how_to_capture: "Analysis of needs vs our capabilities",
    },
    FieldSpec {
        key: "personal_details",
        label: "Personal Details",
        aliases: &["personal", "interests"],
        why_it_matters: "Relationship building and personalization",
        how_to_capture: "Social media, interviews, bio information",
    },
    FieldSpec {
        key: "executive_urgency_earnings_board_mentions",
        label: "Executive Urgency - Earnings",
        aliases: &["earnings board mentions", "executive urgency earnings"],
        why_it_matters: "Board pressure creates urgency",
        how_to_capture: "Earnings calls, board reports",
    },
    FieldSpec {
        key: "executive_urgency_infra_costs",
        label: "Executive Urgency - Costs",
        aliases: &["infra costs", "infrastructure costs", "executive urgency costs"],
        why_it_matters: "Cost pressure drives platform adoption",
        how_to_capture: "Financial reports, cost optimization mentions",
    },
    FieldSpec {
        key: "regulatory_compliance_deadlines",
        label: "Regulatory Compliance",
        aliases: &["compliance deadlines", "regulatory compliance deadlines"],
        why_it_matters: "Compliance creates urgency for governance",
        how_to_capture: "Regulatory filings, compliance mentions",
    },
    FieldSpec {
        key: "regulatory_soc2_eu_ai_act",
        label: "SOC-2 / EU AI Act",
        aliases: &["soc2", "soc 2", "eu ai act", "soc 2 eu ai act"],
        why_it_matters: "Regulatory requirements drive platform needs",
        how_to_capture: "Compliance documentation, regulatory mentions",
    },
    FieldSpec {
        key: "incident_outage_rollback",
        label: "Incidents/Outages",
        aliases: &["incidents", "outages", "incident outage rollback", "rollbacks"],
        why_it_matters: "System reliability issues indicate infrastructure needs",
        how_to_capture: "Status pages, incident reports, postmortems",
    },
    FieldSpec {
        key: "competitive_stack_usage_rival_vendors",
        label: "Competitive Stack",
        aliases: &["competitive stack usage", "rival vendors"],
        why_it_matters: "Current vendor relationships and switching potential",
        how_to_capture: "Tech stack mentions, vendor discussions",
    },
    FieldSpec {
        key: "fresh_funding_partnerships",
        label: "Funding/Partnerships",
        aliases: &["fresh funding", "funding", "partnerships"],
        why_it_matters: "New funding enables new technology adoption",
        how_to_capture: "Funding announcements, partnership news",
    },
    FieldSpec {
        key: "hiring_spikes_ml_ops_ai_infra",
        label: "Hiring Spikes",
        aliases: &["hiring", "hiring spikes ml ops ai infra"],
        why_it_matters: "Hiring indicates growing AI/ML operations",
        how_to_capture: "Job postings, hiring announcements",
    },
    FieldSpec {
        key: "metric_targets_sla_arr_csat_cost",
        label: "Metric Targets",
        aliases: &["metrics", "sla arr csat cost"],
        why_it_matters: "Performance targets drive infrastructure decisions",
        how_to_capture: "KPI mentions, performance reports",
    },
    FieldSpec {
        key: "negative_triggers_layoffs_churn_failed_pocs",
        label: "Negative Triggers",
        aliases: &["layoffs", "failed pocs", "vendor churn"],
        why_it_matters: "Pain points create openness to alternatives",
        how_to_capture: "News reports, failed project mentions",
    },
    FieldSpec {
        key: "technical_deployment_on_prem_provider",
        label: "On-Prem Deployment",
        aliases: &["on prem provider", "on prem", "on premise provider"],
        why_it_matters: "Current infrastructure choices",
        how_to_capture: "Technical documentation, architecture discussions",
    },
    FieldSpec {
        key: "technical_deployment_cloud_providers",
        label: "Cloud Providers",
        aliases: &["cloud provider", "cloud"],
        why_it_matters: "Cloud strategy and multi-cloud needs",
        how_to_capture: "Cloud provider mentions, architecture posts",
    },
    FieldSpec {
        key: "production_maturity_inference_volume",
        label: "Production Scale",
        aliases: &["inference volume", "production maturity"],
        why_it_matters: "Scale indicates serious AI operations",
        how_to_capture: "Performance metrics, volume discussions",
    },
    FieldSpec {
        key: "production_maturity_fda_cleared",
        label: "FDA/Regulated",
        aliases: &["fda cleared", "fda"],
        why_it_matters: "Regulated industries need compliant platforms",
        how_to_capture: "Regulatory approvals, compliance mentions",
    },
    FieldSpec {
        key: "conference_webinar_quotes",
        label: "Conference Quotes",
        aliases: &["webinar quotes", "conference webinar quotes"],
        why_it_matters: "Public statements reveal priorities and challenges",
        how_to_capture: "Conference recordings, webinar content",
    },
    FieldSpec {
        key: "recent_ai_posts_comments_90_days",
        label: "Recent AI Posts",
        aliases: &["recent posts", "recent ai posts comments"],
        why_it_matters: "Current thinking and active engagement",
        how_to_capture: "Social media posts, comments, discussions",
    },
    FieldSpec {
        key: "experience_shift_career_pivot",
        label: "Experience Shift",
        aliases: &["career pivot"],
        why_it_matters: "Career pivots indicate growing AI focus",
        how_to_capture: "LinkedIn updates, role changes",
    },
    FieldSpec {
        key: "org_map_boss_peers_reports",
        label: "Org Map",
        aliases: &["org chart", "boss peers reports"],
        why_it_matters: "Decision making structure and influence",
        how_to_capture: "Org charts, LinkedIn connections, team pages",
    },
    FieldSpec {
        key: "internal_okrs_scorecards",
        label: "Internal OKRs",
        aliases: &["okrs", "scorecards"],
        why_it_matters: "Internal metrics drive technology decisions",
        how_to_capture: "Public OKR mentions, performance discussions",
    },
    FieldSpec {
        key: "event_activity_speaker_exhibitor",
        label: "Event Activity",
        aliases: &["events", "speaker exhibitor"],
        why_it_matters: "Industry engagement indicates influence",
        how_to_capture: "Conference speaker lists, event participation",
    },
    FieldSpec {
        key: "poll_participation_ai_cost_regulation",
        label: "Poll Participation",
        aliases: &["polls"],
        why_it_matters: "Engagement shows active interest in topics",
        how_to_capture: "Social media polls, survey responses",
    },
    FieldSpec {
        key: "breakage_claims_rollout_governance",
        label: "Breakage Claims",
        aliases: &["breakage", "rollout governance"],
        why_it_matters: "Infrastructure pain points create opportunities",
        how_to_capture: "Problem reports, infrastructure complaints",
    },
];
