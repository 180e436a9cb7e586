//! Calculator tool for evaluating arithmetic expressions.
//!
//! Registered as a single-string tool, so the model may send a bare
//! expression, `{"expression": "..."}`, or any other one-entry mapping.

use async_trait::async_trait;
use krishi_core::{TextTool, Tool, ToolError};
use serde_json::{json, Value};

/// Maximum allowed length for calculator expressions to prevent abuse.
const MAX_EXPRESSION_LENGTH: usize = 1000;

/// Calculator tool for evaluating mathematical expressions.
///
/// Supports basic arithmetic (+, -, *, /, %), exponents (`^` or `**`),
/// parentheses, and common functions (sqrt, sin, cos, tan, ln, abs).
/// Whole-number results are formatted without decimals.
///
/// # Example
///
/// ```no_run
/// use krishi_calculator::Calculator;
/// use krishi_core::TextTool;
///
/// # async fn example() -> Result<(), krishi_core::ToolError> {
/// let result = Calculator.call("25 * 4 + 10").await?;
/// assert_eq!(result, "110");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Calculator;

impl Tool for Calculator {
    fn name(&self) -> &str {
        "calculate"
    }

    fn description(&self) -> &str {
        "Evaluate a mathematical expression. Input: the expression, e.g. \"25*4+10\" or \
         {\"expression\": \"(1200 - 450) / 3\"}. Supports +, -, *, /, %, ^, parentheses and sqrt."
    }
}

#[async_trait]
impl TextTool for Calculator {
    async fn call(&self, input: &str) -> Result<Value, ToolError> {
        let expression = input.trim();
        if expression.is_empty() {
            return Err(ToolError::InvalidInput("Missing expression".into()));
        }

        // Validate input length to prevent abuse
        if expression.len() > MAX_EXPRESSION_LENGTH {
            return Err(ToolError::InvalidInput(format!(
                "Expression too long ({} chars, max {})",
                expression.len(),
                MAX_EXPRESSION_LENGTH
            )));
        }

        let normalized = expression
            .replace("**", "^")
            .replace('×', "*")
            .replace('÷', "/");

        match meval::eval_str(&normalized) {
            Ok(result) => {
                if result.is_nan() {
                    return Err(ToolError::ExecutionFailed(
                        "Result is not a number (NaN)".into(),
                    ));
                }
                if result.is_infinite() {
                    return Err(ToolError::ExecutionFailed(
                        "Result is infinite (division by zero or overflow)".into(),
                    ));
                }

                let formatted = if result.fract() == 0.0 && result.abs() < 1e15 {
                    format!("{:.0}", result)
                } else {
                    format!("{}", result)
                };
                log::debug!("Calculated: {} = {}", expression, formatted);
                Ok(json!(formatted))
            }
            Err(e) => Err(ToolError::ExecutionFailed(format!(
                "Failed to evaluate expression: {}",
                e
            ))),
        }
    }
}
