//! Calculator tool - basic arithmetic on two numbers

use serde::{Deserialize, Serialize};

/// Arithmetic operation requested by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
    /// Any operation name outside the supported four
    #[serde(other)]
    Unsupported,
}

/// Input for the calculator tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatorInput {
    pub operation: Operation,
    pub a: f64,
    pub b: f64,
}

/// Apply `operation` to `a` and `b`, returning the result as text.
///
/// Errors are returned as text too: `"Error: Division by zero"` and
/// `"Error: Unknown operation"`.
pub fn calculator(input: &CalculatorInput) -> String {
    let CalculatorInput { operation, a, b } = *input;
    let result = match operation {
        Operation::Add => a + b,
        Operation::Subtract => a - b,
        Operation::Multiply => a * b,
        Operation::Divide if b == 0.0 => return "Error: Division by zero".to_string(),
        Operation::Divide => a / b,
        Operation::Unsupported => return "Error: Unknown operation".to_string(),
    };
    format_number(result)
}

/// Integral values keep a trailing `.0` so results always read as decimals
/// (`42.0`, `0.5`, `-3.25`).
fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}
