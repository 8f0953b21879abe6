//! Use-case artifact model as delivered by the artifact service.
//!
//! Only the parts the layout engine reads are modelled. Unknown JSON fields
//! are ignored so payloads from newer servers still deserialize.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UseCase {
    pub id: i64,
    pub name: String,
    pub pre_condition: Option<Step>,
    pub steps: Vec<Step>,
    pub post_condition: Option<Step>,
}

/// Who performs a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepOf {
    #[default]
    Actor,
    System,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Step {
    pub id: i64,
    pub name: String,
    pub order_index: f64,
    pub description: String,
    pub step_of: StepOf,
    pub flows: Vec<Flow>,
    pub condition: bool,
    pub external: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Flow {
    pub id: i64,
    pub name: String,
    pub order_index: f64,
    pub is_external: bool,
    pub steps: Vec<Step>,
    pub return_to_step_name: Option<String>,
}

impl Step {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            order_index: id as f64,
            ..Default::default()
        }
    }

    pub fn with_flow(mut self, flow: Flow) -> Self {
        self.flows.push(flow);
        self
    }
}

impl Flow {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            order_index: id as f64,
            ..Default::default()
        }
    }

    pub fn returning_to(mut self, step_name: impl Into<String>) -> Self {
        self.return_to_step_name = Some(step_name.into());
        self
    }

    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }
}

/// Returns `items` ordered by their order index; ties keep input order.
pub(crate) fn in_order<T>(items: &[T], order: impl Fn(&T) -> f64) -> Vec<&T> {
    let mut ordered: Vec<&T> = items.iter().collect();
    ordered.sort_by(|a, b| order(a).total_cmp(&order(b)));
    ordered
}
