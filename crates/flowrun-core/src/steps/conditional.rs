//! Conditional step handler.

use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;

use flowrun_workflow::{ConditionalOperator, Step, StepConfig, StepRunResult, StepType};

use super::{config_mismatch, SharedState, StepHandler};
use crate::error::EngineError;

/// Evaluate a comparison between two resolved values.
///
/// `greater_than` and `less_than` compare numerically when both sides parse
/// as numbers, lexically otherwise.
pub fn evaluate_condition(left: &str, operator: ConditionalOperator, right: &str) -> bool {
    match operator {
        ConditionalOperator::Equals => left == right,
        ConditionalOperator::NotEquals => left != right,
        ConditionalOperator::Contains => left.contains(right),
        ConditionalOperator::NotContains => !left.contains(right),
        ConditionalOperator::GreaterThan => compare(left, right) == Ordering::Greater,
        ConditionalOperator::LessThan => compare(left, right) == Ordering::Less,
    }
}

fn compare(left: &str, right: &str) -> Ordering {
    match (left.trim().parse::<f64>(), right.trim().parse::<f64>()) {
        (Ok(l), Ok(r)) => l.partial_cmp(&r).unwrap_or(Ordering::Equal),
        _ => left.cmp(right),
    }
}

/// Branches flow execution based on a condition.
///
/// Fires the `true` port when the condition holds, `false` otherwise.
pub struct ConditionalHandler;

#[async_trait]
impl StepHandler for ConditionalHandler {
    fn step_type(&self) -> StepType {
        StepType::Conditional
    }

    async fn run(
        &self,
        step: &Step,
        _state: &SharedState,
        config: &StepConfig,
    ) -> Result<StepRunResult, EngineError> {
        let StepConfig::Conditional(config) = config else {
            return Err(config_mismatch(StepType::Conditional));
        };

        let left = config.left.as_value().cloned().unwrap_or_default();
        let right = config.right.as_value().cloned().unwrap_or_default();
        let outcome = evaluate_condition(&left, config.operator, &right);

        let port = if outcome { "true" } else { "false" };
        Ok(StepRunResult::success(step.id)
            .with_fired_ports(vec![port.to_string()])
            .with_output("condition_result", Value::Bool(outcome)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equals_and_not_equals() {
        assert!(evaluate_condition("admin", ConditionalOperator::Equals, "admin"));
        assert!(!evaluate_condition("user", ConditionalOperator::Equals, "admin"));
        assert!(evaluate_condition("user", ConditionalOperator::NotEquals, "admin"));
    }

    #[test]
    fn contains_checks_substring_of_left() {
        assert!(evaluate_condition("hello world", ConditionalOperator::Contains, "world"));
        assert!(!evaluate_condition("hello", ConditionalOperator::Contains, "world"));
        assert!(evaluate_condition("hello", ConditionalOperator::NotContains, "world"));
    }

    #[test]
    fn numeric_comparison_when_both_sides_parse() {
        assert!(evaluate_condition("10", ConditionalOperator::GreaterThan, "9"));
        assert!(evaluate_condition("2.5", ConditionalOperator::LessThan, "10"));
        // "10" < "9" lexically, but not numerically.
        assert!(!evaluate_condition("10", ConditionalOperator::LessThan, "9"));
    }

    #[test]
    fn lexical_fallback_when_either_side_is_not_numeric() {
        assert!(evaluate_condition("b", ConditionalOperator::GreaterThan, "a"));
        assert!(evaluate_condition("10", ConditionalOperator::LessThan, "abc"));
    }
}
