//! Turns a day of category minutes into mood and stress scores, a short summary and a shareable
//! caption. A configured remote model is tried first; the local rules always produce an answer.

use std::sync::Mutex;

use anyhow::Result;
use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::{config::AiConfig, daemon::storage::entities::CategoryMinutes};

use categorizer::ProductivityAnalysis;
use remote::TextGenerator;

pub mod categorizer;
pub mod local;
pub mod remote;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnalysisInput {
    pub minutes: CategoryMinutes,
    pub avg_activity_score: f64,
    pub productivity: ProductivityAnalysis,
}

impl AnalysisInput {
    pub fn new(minutes: CategoryMinutes, avg_activity_score: f64) -> Self {
        Self {
            minutes,
            avg_activity_score,
            productivity: categorizer::analyze_productivity(&minutes),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisSource {
    Remote,
    Local,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub mood_score: f64,
    pub stress_score: f64,
    pub summary: String,
    pub caption: String,
    pub source: AnalysisSource,
}

pub struct DailyAnalyzer {
    remote: Option<Box<dyn TextGenerator>>,
    rng: Mutex<StdRng>,
}

impl DailyAnalyzer {
    pub fn new(remote: Option<Box<dyn TextGenerator>>, rng: StdRng) -> Self {
        Self {
            remote,
            rng: Mutex::new(rng),
        }
    }

    pub fn local_only(rng: StdRng) -> Self {
        Self::new(None, rng)
    }

    pub fn from_config(config: &AiConfig) -> Result<Self> {
        let remote = remote::build_text_generator(config)?;
        match &remote {
            Some(_) => info!("Remote analysis enabled ({:?})", config.provider),
            None => info!("Using local analysis only"),
        }
        Ok(Self::new(remote, StdRng::from_entropy()))
    }

    /// Never fails. Any remote problem is logged and answered by the local rules.
    #[instrument(skip_all)]
    pub async fn analyze(&self, input: &AnalysisInput) -> AnalysisResult {
        if let Some(generator) = &self.remote {
            match remote::analyze(generator.as_ref(), input).await {
                Ok(result) => return result,
                Err(e) => warn!("Remote analysis failed, falling back to local rules: {e:?}"),
            }
        }
        self.analyze_locally(input)
    }

    fn analyze_locally(&self, input: &AnalysisInput) -> AnalysisResult {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        local::analyze(input, &mut *rng)
    }
}
