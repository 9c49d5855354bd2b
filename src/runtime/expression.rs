use crate::error::{RuntimeError, RuntimeResult};
use crate::lang::ast::{BinaryOp, Expression, ExpressionKind};
use std::collections::HashMap;
use std::f64::consts::PI;

/// Gate parameter values visible while a gate body is being instantiated.
pub type Bindings = HashMap<String, f64>;

/// Evaluates `expression` to a finite real number.
pub fn evaluate(expression: &Expression, bindings: &Bindings) -> RuntimeResult<f64> {
    let value = match &expression.kind {
        ExpressionKind::Real(v) => *v,
        ExpressionKind::Integer(v) => *v as f64,
        ExpressionKind::Pi => PI,
        ExpressionKind::Variable(variable) => *bindings
            .get(&variable.name)
            .ok_or_else(|| RuntimeError::UnboundParameter(variable.to_string()))?,
        ExpressionKind::Minus(target) => -evaluate(target, bindings)?,
        ExpressionKind::Binary { op, left, right } => {
            let (l, r) = (evaluate(left, bindings)?, evaluate(right, bindings)?);
            match op {
                BinaryOp::Add => l + r,
                BinaryOp::Sub => l - r,
                BinaryOp::Mul => l * r,
                BinaryOp::Div => l / r,
                BinaryOp::Pow => l.powf(r),
            }
        }
        ExpressionKind::Unary { func, target } => func.apply(evaluate(target, bindings)?),
    };
    if value.is_finite() {
        Ok(value)
    } else {
        Err(RuntimeError::NotANumber(expression.to_string()).at(&expression.context))
    }
}
