use crate::{
    environment::prelude::Value,
    parser::prelude::{BinaryOperator, UnaryOperator},
};

use super::governor::MAX_STRING_LENGTH;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OperationError {
    #[error("Illegal operation")]
    IllegalOperation,
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Modulo of zero")]
    ModuloOfZero,
    #[error("Out of bounds")]
    OutOfBounds,
    #[error("String is too long")]
    StringTooLong,
}

impl OperationError {
    /// Zero divisors are reported at the right operand, everything else at
    /// the whole operation.
    pub fn blames_right_operand(&self) -> bool {
        matches!(self, Self::DivisionByZero | Self::ModuloOfZero)
    }
}

pub fn binary(
    operator: BinaryOperator,
    left: &Value,
    right: &Value,
) -> Result<Value, OperationError> {
    use BinaryOperator::*;

    match (left, right) {
        (Value::String { .. }, Value::String { .. }) if operator == Add => concat(left, right),
        (Value::String { .. }, other) | (other, Value::String { .. }) if operator == Add => {
            match other.as_number() {
                Some(_) => concat(left, right),
                None => Err(OperationError::IllegalOperation),
            }
        },
        _ => {
            let (Some(a), Some(b)) = (left.as_number(), right.as_number()) else {
                return Err(OperationError::IllegalOperation);
            };

            numeric(operator, a, b, left, right)
        },
    }
}

fn concat(left: &Value, right: &Value) -> Result<Value, OperationError> {
    let (left, right) = (left.to_string(), right.to_string());

    if left.len() + right.len() > MAX_STRING_LENGTH {
        return Err(OperationError::StringTooLong);
    }

    Ok(Value::string(left + &right))
}

fn numeric(
    operator: BinaryOperator,
    a: f64,
    b: f64,
    left: &Value,
    right: &Value,
) -> Result<Value, OperationError> {
    use BinaryOperator::*;

    let value = match operator {
        Add => Value::number(a + b),
        Sub => Value::number(a - b),
        Mul => Value::number(a * b),
        Div if b == 0.0 => return Err(OperationError::DivisionByZero),
        Div => Value::number(a / b),
        Mod if b == 0.0 => return Err(OperationError::ModuloOfZero),
        Mod => Value::number(a % b),
        Pow => Value::number(a.powf(b)),
        Equal => Value::boolean(numeric_eq(left, right)),
        NotEqual => Value::boolean(!numeric_eq(left, right)),
        LessThan => Value::boolean(a < b),
        GreaterThan => Value::boolean(a > b),
        LessThanOrEqual => Value::boolean(a <= b),
        GreaterThanOrEqual => Value::boolean(a >= b),
        And => Value::boolean(left.is_true() && right.is_true()),
        Or => Value::boolean(left.is_true() || right.is_true()),
    };

    Ok(value)
}

// null only equals null
fn numeric_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Number { value: a }, Value::Number { value: b }) => a == b,
        _ => false,
    }
}

pub fn unary(operator: UnaryOperator, operand: &Value) -> Result<Value, OperationError> {
    let Some(value) = operand.as_number() else {
        return Err(OperationError::IllegalOperation);
    };

    let result = match operator {
        UnaryOperator::Minus => Value::number(-value),
        UnaryOperator::Plus => operand.clone(),
        UnaryOperator::Not => Value::boolean(!operand.is_true()),
    };

    Ok(result)
}

/// Validates `index` against a sequence of `len` items.
fn position(index: &Value, len: usize) -> Result<usize, OperationError> {
    let index = index.as_number().ok_or(OperationError::IllegalOperation)?;

    if index.fract() != 0.0 || index < 0.0 || index >= len as f64 {
        return Err(OperationError::OutOfBounds);
    }

    Ok(index as usize)
}

/// Reads an element of a list or a character of a string.
pub fn index_get(target: &Value, index: &Value) -> Result<Value, OperationError> {
    match target {
        Value::List { elements } => {
            let elements = elements.borrow();
            let at = position(index, elements.len())?;

            Ok(elements[at].clone())
        },
        Value::String { value } => {
            let at = position(index, value.chars().count())?;

            Ok(value.chars().nth(at).map(Value::string).unwrap_or(Value::Null))
        },
        _ => Err(OperationError::IllegalOperation),
    }
}

/// Overwrites a list element in place, so every alias of the list sees it.
pub fn index_set(target: &Value, index: &Value, value: Value) -> Result<Value, OperationError> {
    let Value::List { elements } = target else {
        return Err(OperationError::IllegalOperation);
    };

    let mut elements = elements.borrow_mut();
    let at = position(index, elements.len())?;
    elements[at] = value.clone();

    Ok(value)
}
