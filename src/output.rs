//! Output writers (C14, spec.md §6): serializes a set of kept plans into
//! the structured document format, as JSON or CSV.

use crate::error::Result;
use crate::plan::Plan;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct PrimerRecord {
    pub seq: String,
    pub strand: &'static str,
    pub penalty: f64,
    pub pair_penalty: f64,
    pub tm: f64,
    pub gc: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FragmentRecord {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub id: String,
    pub cost: f64,
    pub url: Option<String>,
    pub seq: String,
    #[serde(rename = "pcrSeq", skip_serializing_if = "Option::is_none")]
    pub pcr_seq: Option<String>,
    pub primers: Vec<PrimerRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SolutionRecord {
    pub count: usize,
    pub cost: f64,
    pub fragments: Vec<FragmentRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanDocument {
    pub target: String,
    pub seq: String,
    pub time: String,
    pub solutions: Vec<SolutionRecord>,
}

impl PlanDocument {
    pub fn from_plans(target: &str, seq: &str, time: &str, plans: &[Plan]) -> Self {
        PlanDocument {
            target: target.to_string(),
            seq: seq.to_string(),
            time: time.to_string(),
            solutions: plans.iter().map(solution_record).collect(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Flattens every fragment of every solution into one CSV table, one
    /// row per fragment, with a leading solution index column.
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::WriterBuilder::new().from_writer(vec![]);
        writer.write_record([
            "solution", "count", "solution_cost", "type", "id", "cost", "url", "seq", "pcr_seq",
        ])?;
        for (i, solution) in self.solutions.iter().enumerate() {
            for fragment in &solution.fragments {
                writer.write_record([
                    i.to_string(),
                    solution.count.to_string(),
                    solution.cost.to_string(),
                    fragment.kind.to_string(),
                    fragment.id.clone(),
                    fragment.cost.to_string(),
                    fragment.url.clone().unwrap_or_default(),
                    fragment.seq.clone(),
                    fragment.pcr_seq.clone().unwrap_or_default(),
                ])?;
            }
        }
        let bytes = writer.into_inner().map_err(|e| {
            crate::error::PlannerError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
        })?;
        Ok(String::from_utf8(bytes)?)
    }
}

fn solution_record(plan: &Plan) -> SolutionRecord {
    SolutionRecord {
        count: plan.count,
        cost: plan.cost,
        fragments: plan
            .fragments
            .iter()
            .map(|f| FragmentRecord {
                kind: f.kind,
                id: f.id.clone(),
                cost: f.cost,
                url: f.source_url.clone(),
                seq: f.seq.clone(),
                pcr_seq: f.pcr_seq.clone(),
                primers: f
                    .primers
                    .as_ref()
                    .map(|pair| {
                        vec![
                            PrimerRecord {
                                seq: pair.fwd.sequence.clone(),
                                strand: "+",
                                penalty: pair.fwd.individual_penalty,
                                pair_penalty: pair.pair_penalty,
                                tm: pair.fwd.annealing_tm,
                                gc: pair.fwd.gc_fraction,
                            },
                            PrimerRecord {
                                seq: pair.rev.sequence.clone(),
                                strand: "-",
                                penalty: pair.rev.individual_penalty,
                                pair_penalty: pair.pair_penalty,
                                tm: pair.rev.annealing_tm,
                                gc: pair.rev.gc_fraction,
                            },
                        ]
                    })
                    .unwrap_or_default(),
            })
            .collect(),
    }
}
