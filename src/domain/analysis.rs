use std::fmt;

use serde::{Deserialize, Serialize};

/// Scoring output as produced by the model. Shape is checked, ranges are not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub authority_score: u32,
    pub executive_summary: String,
    pub metrics: Metrics,
    pub growth_roadmap: Vec<RoadmapStep>,
    pub niche_verdict: String,
    #[serde(default)]
    pub is_simulated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    pub quality: u32,
    pub authority: u32,
    pub technical: u32,
    pub structure: u32,
    pub velocity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadmapStep {
    pub step: u32,
    pub action: String,
    pub impact: Impact,
    pub rationale: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Impact {
    High,
    #[serde(alias = "Medium")]
    Med,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Strong,
    Moderate,
    Weak,
}

impl ScoreBand {
    pub fn from_score(score: u32) -> Self {
        if score >= 80 {
            ScoreBand::Strong
        } else if score >= 50 {
            ScoreBand::Moderate
        } else {
            ScoreBand::Weak
        }
    }
}

impl fmt::Display for ScoreBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ScoreBand::Strong => "strong",
            ScoreBand::Moderate => "moderate",
            ScoreBand::Weak => "weak",
        };
        f.pad(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictTier {
    Leader,
    Challenger,
    Laggard,
}

impl VerdictTier {
    /// First sentiment token found in the verdict, checked in tier order.
    pub fn detect(verdict: &str) -> Option<Self> {
        [
            ("Leader", VerdictTier::Leader),
            ("Challenger", VerdictTier::Challenger),
            ("Laggard", VerdictTier::Laggard),
        ]
        .into_iter()
        .find(|(token, _)| verdict.contains(token))
        .map(|(_, tier)| tier)
    }
}

impl fmt::Display for VerdictTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            VerdictTier::Leader => "Leader",
            VerdictTier::Challenger => "Challenger",
            VerdictTier::Laggard => "Laggard",
        };
        f.pad(label)
    }
}

impl AnalysisResult {
    pub fn score_band(&self) -> ScoreBand {
        ScoreBand::from_score(self.authority_score)
    }

    pub fn verdict_tier(&self) -> Option<VerdictTier> {
        VerdictTier::detect(&self.niche_verdict)
    }
}
