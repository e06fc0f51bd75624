//! Pipeline builder with construction-time graph validation.

use crate::contract::StageSpec;
use crate::errors::PipelineBuildError;
use crate::generate::Generator;
use crate::overlap::OverlapCheck;
use crate::pipeline::{Coordinator, Pipeline, PipelineMode};
use crate::quality::QualityPolicy;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Builder for validated pipelines.
///
/// Graph violations are rejected as early as possible: a stage's
/// dependencies must already be present when the stage is added, a stage
/// cannot depend on itself, and the finished graph is checked for cycles.
#[derive(Debug)]
pub struct PipelineBuilder {
    name: String,
    stages: Vec<(StageSpec, Arc<dyn Generator>)>,
    policy: QualityPolicy,
    coordinator: Option<Arc<dyn Coordinator>>,
    overlap_stages: Option<(String, String)>,
}

impl PipelineBuilder {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
            policy: QualityPolicy::default(),
            coordinator: None,
            overlap_stages: None,
        }
    }

    /// Adds a stage with its generation collaborator.
    ///
    /// # Errors
    ///
    /// Returns an error if the spec is invalid, duplicates an existing stage
    /// name, or references a dependency that has not been added yet.
    pub fn stage(
        mut self,
        spec: StageSpec,
        generator: Arc<dyn Generator>,
    ) -> Result<Self, PipelineBuildError> {
        spec.validate()?;

        if self.stages.iter().any(|(existing, _)| existing.name == spec.name) {
            return Err(
                PipelineBuildError::new(format!("duplicate stage name '{}'", spec.name))
                    .with_stages(vec![spec.name]),
            );
        }

        for dep in &spec.dependencies {
            if !self.stages.iter().any(|(existing, _)| &existing.name == dep) {
                return Err(PipelineBuildError::new(format!(
                    "stage '{}' depends on unknown stage '{}'",
                    spec.name, dep
                ))
                .with_stages(vec![spec.name.clone(), dep.clone()]));
            }
        }

        self.stages.push((spec, generator));
        Ok(self)
    }

    /// Replaces the quality policy.
    #[must_use]
    pub fn with_policy(mut self, policy: QualityPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Switches the pipeline to delegating execution under a coordinator.
    #[must_use]
    pub fn delegating(mut self, coordinator: Arc<dyn Coordinator>) -> Self {
        self.coordinator = Some(coordinator);
        self
    }

    /// Enables overlap detection between a business-type and a
    /// technical-type exception stage. Vocabularies come from the policy.
    #[must_use]
    pub fn with_overlap_between(
        mut self,
        business_stage: impl Into<String>,
        technical_stage: impl Into<String>,
    ) -> Self {
        self.overlap_stages = Some((business_stage.into(), technical_stage.into()));
        self
    }

    /// Builds the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty pipeline, a dependency cycle, or an
    /// overlap check naming unknown stages.
    pub fn build(self) -> Result<Pipeline, PipelineBuildError> {
        if self.stages.is_empty() {
            return Err(PipelineBuildError::new("pipeline has no stages"));
        }

        detect_cycle(&self.stages)?;

        let overlap_check = match self.overlap_stages {
            Some((business, technical)) => {
                for stage in [&business, &technical] {
                    if !self.stages.iter().any(|(spec, _)| &spec.name == stage) {
                        return Err(PipelineBuildError::new(format!(
                            "overlap check references unknown stage '{}'",
                            stage
                        ))
                        .with_stages(vec![stage.clone()]));
                    }
                }
                Some(
                    OverlapCheck::new(business, technical)
                        .with_left_vocabulary(self.policy.business_keyword_vocabulary.clone())
                        .with_right_vocabulary(self.policy.technical_keyword_vocabulary.clone()),
                )
            }
            None => None,
        };

        let mode = match self.coordinator {
            Some(coordinator) => PipelineMode::Delegating(coordinator),
            None => PipelineMode::Sequential,
        };

        Ok(Pipeline::from_parts(
            self.name,
            self.stages,
            self.policy,
            mode,
            overlap_check,
        ))
    }
}

/// Depth-first cycle detection reporting the offending path.
fn detect_cycle(stages: &[(StageSpec, Arc<dyn Generator>)]) -> Result<(), PipelineBuildError> {
    let graph: HashMap<&str, Vec<&str>> = stages
        .iter()
        .map(|(spec, _)| {
            (
                spec.name.as_str(),
                spec.dependencies.iter().map(String::as_str).collect(),
            )
        })
        .collect();

    let mut visited: HashSet<&str> = HashSet::new();
    let mut in_stack: HashSet<&str> = HashSet::new();
    let mut path: Vec<&str> = Vec::new();

    fn dfs<'a>(
        node: &'a str,
        graph: &HashMap<&'a str, Vec<&'a str>>,
        visited: &mut HashSet<&'a str>,
        in_stack: &mut HashSet<&'a str>,
        path: &mut Vec<&'a str>,
    ) -> Result<(), Vec<String>> {
        if in_stack.contains(node) {
            let start = path.iter().position(|n| *n == node).unwrap_or(0);
            let mut cycle: Vec<String> = path[start..].iter().map(ToString::to_string).collect();
            cycle.push(node.to_string());
            return Err(cycle);
        }
        if visited.contains(node) {
            return Ok(());
        }

        visited.insert(node);
        in_stack.insert(node);
        path.push(node);

        if let Some(deps) = graph.get(node) {
            for dep in deps {
                dfs(dep, graph, visited, in_stack, path)?;
            }
        }

        in_stack.remove(node);
        path.pop();
        Ok(())
    }

    for (spec, _) in stages {
        dfs(
            &spec.name,
            &graph,
            &mut visited,
            &mut in_stack,
            &mut path,
        )
        .map_err(|cycle| {
            PipelineBuildError::new(format!("dependency cycle: {}", cycle.join(" -> ")))
                .with_stages(cycle)
        })?;
    }

    Ok(())
}
