use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Hint, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStep {
    pub id: String,
    #[serde(rename = "type")]
    pub step_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub needs: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub config: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelinePlan {
    pub steps: Vec<PipelinePlanStep>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelinePlanStep {
    pub id: String,
    #[serde(rename = "type")]
    pub step_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub needs: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub config: HashMap<String, serde_json::Value>,
    pub status: PipelineStepStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStepStatus {
    Ready,
    Missing,
}

/// Reports which prerequisites (credentials, settings) a step type still lacks.
pub trait PipelineCapabilityResolver {
    fn missing(&self, step_type: &str) -> Vec<String>;
}

pub trait PipelineStepExecutor {
    fn execute_step(&self, step: &PipelineStep) -> Result<PipelineStepResult>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStepResult {
    pub id: String,
    #[serde(rename = "type")]
    pub step_type: String,
    pub status: PipelineRunStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<Hint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<StepError>,
}

/// Error recorded against a failed step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub details: serde_json::Value,
}

impl From<&Error> for StepError {
    fn from(err: &Error) -> Self {
        Self {
            code: err.code.as_str().to_string(),
            message: err.message.clone(),
            details: err.details.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRunResult {
    pub steps: Vec<PipelineStepResult>,
    pub status: PipelineRunStatus,
    pub summary: PipelineRunSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRunSummary {
    pub total_steps: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub next_actions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PipelineRunStatus {
    Success,
    PartialSuccess,
    Failed,
    Skipped,
}

pub fn plan(
    steps: &[PipelineStep],
    resolver: &dyn PipelineCapabilityResolver,
    field: &str,
) -> Result<PipelinePlan> {
    let ordered = order_steps(steps, field)?;
    let planned_steps = ordered
        .into_iter()
        .map(|step| to_plan_step(step, resolver))
        .collect();

    Ok(PipelinePlan {
        steps: planned_steps,
        warnings: Vec::new(),
    })
}

/// Topologically order steps by their `needs`, keeping declaration order
/// among steps that are ready at the same time.
pub fn order_steps(steps: &[PipelineStep], field: &str) -> Result<Vec<PipelineStep>> {
    let mut id_index = HashMap::new();
    for (idx, step) in steps.iter().enumerate() {
        if id_index.contains_key(&step.id) {
            return Err(Error::validation_invalid_argument(
                field,
                format!("Duplicate step id '{}'", step.id),
                None,
                None,
            ));
        }
        id_index.insert(step.id.clone(), idx);
    }

    let mut indegree = vec![0usize; steps.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); steps.len()];

    for (idx, step) in steps.iter().enumerate() {
        for need in &step.needs {
            if let Some(&parent_idx) = id_index.get(need) {
                indegree[idx] += 1;
                dependents[parent_idx].push(idx);
            } else {
                return Err(Error::validation_invalid_argument(
                    field,
                    format!("Step '{}' depends on unknown step '{}'", step.id, need),
                    None,
                    None,
                ));
            }
        }
    }

    let mut queue: VecDeque<usize> = indegree
        .iter()
        .enumerate()
        .filter(|(_, count)| **count == 0)
        .map(|(idx, _)| idx)
        .collect();

    let mut ordered = Vec::with_capacity(steps.len());
    while let Some(idx) = queue.pop_front() {
        ordered.push(steps[idx].clone());
        for &child in &dependents[idx] {
            indegree[child] -= 1;
            if indegree[child] == 0 {
                queue.push_back(child);
            }
        }
    }

    if ordered.len() != steps.len() {
        let pending: Vec<String> = steps
            .iter()
            .enumerate()
            .filter(|(idx, _)| indegree[*idx] > 0)
            .map(|(_, step)| step.id.clone())
            .collect();
        return Err(Error::validation_invalid_argument(
            field,
            "Steps contain a cycle".to_string(),
            None,
            Some(pending),
        ));
    }

    Ok(ordered)
}

fn to_plan_step(step: PipelineStep, resolver: &dyn PipelineCapabilityResolver) -> PipelinePlanStep {
    let missing = resolver.missing(&step.step_type);
    let status = if missing.is_empty() {
        PipelineStepStatus::Ready
    } else {
        PipelineStepStatus::Missing
    };

    PipelinePlanStep {
        id: step.id,
        step_type: step.step_type,
        label: step.label,
        needs: step.needs,
        config: step.config,
        status,
        missing,
    }
}

/// Execute steps one at a time in dependency order.
///
/// A step whose dependency did not succeed is recorded as skipped and never
/// handed to the executor.
pub fn run(
    steps: &[PipelineStep],
    executor: &dyn PipelineStepExecutor,
    field: &str,
) -> Result<PipelineRunResult> {
    let ordered = order_steps(steps, field)?;
    let mut results: Vec<PipelineStepResult> = Vec::with_capacity(ordered.len());
    let mut status_map: HashMap<String, PipelineRunStatus> = HashMap::new();

    for step in ordered {
        let failed_dependency = step
            .needs
            .iter()
            .find(|need| !matches!(status_map.get(*need), Some(PipelineRunStatus::Success)))
            .cloned();

        let result = match failed_dependency {
            Some(dep) => PipelineStepResult {
                id: step.id.clone(),
                step_type: step.step_type.clone(),
                status: PipelineRunStatus::Skipped,
                warnings: vec![format!("Skipped because '{}' did not succeed", dep)],
                hints: Vec::new(),
                data: None,
                error: None,
            },
            None => execute_single_step(step, executor),
        };

        status_map.insert(result.id.clone(), result.status.clone());
        results.push(result);
    }

    let status = derive_overall_status(&results);
    let summary = build_summary(&results);

    Ok(PipelineRunResult {
        steps: results,
        status,
        summary,
    })
}

fn execute_single_step(step: PipelineStep, executor: &dyn PipelineStepExecutor) -> PipelineStepResult {
    match executor.execute_step(&step) {
        Ok(mut result) => {
            if result.status == PipelineRunStatus::Success {
                result.error = None;
            }
            result
        }
        Err(err) => PipelineStepResult {
            id: step.id,
            step_type: step.step_type,
            status: PipelineRunStatus::Failed,
            warnings: Vec::new(),
            hints: err.hints.clone(),
            data: None,
            error: Some(StepError::from(&err)),
        },
    }
}

pub fn derive_overall_status(results: &[PipelineStepResult]) -> PipelineRunStatus {
    let has_success = results
        .iter()
        .any(|result| matches!(result.status, PipelineRunStatus::Success));
    let has_failed = results
        .iter()
        .any(|result| matches!(result.status, PipelineRunStatus::Failed));

    match (has_success, has_failed) {
        (true, true) => PipelineRunStatus::PartialSuccess,
        (false, true) => PipelineRunStatus::Failed,
        (true, false) => PipelineRunStatus::Success,
        (false, false) => PipelineRunStatus::Skipped,
    }
}

fn build_summary(results: &[PipelineStepResult]) -> PipelineRunSummary {
    let count = |status: PipelineRunStatus| results.iter().filter(|r| r.status == status).count();

    PipelineRunSummary {
        total_steps: results.len(),
        succeeded: count(PipelineRunStatus::Success),
        failed: count(PipelineRunStatus::Failed),
        skipped: count(PipelineRunStatus::Skipped),
        next_actions: Vec::new(),
    }
}
