use serde::{Deserialize, Serialize};

use crate::model;
use geo;

/// Arithmetic over JSON-RPC.
pub struct ArithService {
    rpc: quillrpc::Service,
}

#[derive(Debug, thiserror::Error)]
pub enum ArithError {
    #[error("divide by zero")]
    DivideByZero,
}

/// Quotient of an integer division.
#[derive(Debug, Serialize, Deserialize)]
pub struct Quotient {
    /// Integer part.
    #[serde(rename = "Quo")]
    pub quo: i64,
    /// Remainder.
    pub rem: i64,
}

impl ArithService {
    /// Divide divides two numbers.
    /// quillrpc:a the dividend
    /// quillrpc:b the divisor
    /// quillrpc:return quotient and remainder
    /// quillrpc:-32603 divide by zero
    pub fn divide(&self, a: i64, b: i64) -> Result<Quotient, ArithError> {
        if b == 0 {
            return Err(ArithError::DivideByZero);
        }

        Ok(Quotient { quo: a / b, rem: a % b })
    }

    /// Pow returns base**exp. If exp is not set then default value is 2.
    /// quillrpc:exp=2.0 exponent could be empty
    pub fn pow(&self, base: f64, exp: Option<f64>) -> f64 {
        base.powf(exp.unwrap_or(2.0))
    }

    /// Sum sums two digits and reports the caller address as the error.
    pub fn sum(&self, ctx: &quillrpc::Context, a: i64, b: i64) -> Result<bool, quillrpc::Error> {
        let addr = ctx.get::<String>().cloned().unwrap_or_default();
        Err(quillrpc::Error::new(a + b, addr))
    }

    /// Multiply multiples two digits and returns result.
    pub async fn multiply(&self, a: i64, b: i64) -> i64 {
        a * b
    }

    pub fn pi(&self) -> f64 {
        std::f64::consts::PI
    }

    /// CheckError throws an error when is_err is true.
    /// quillrpc:500 test error
    pub fn check_error(&self, is_err: bool) -> Result<(), ArithError> {
        if is_err {
            return Err(ArithError::DivideByZero);
        }

        Ok(())
    }

    /// GetPoints returns the first count points of the lattice.
    pub fn get_points(&self, count: i64) -> Vec<model::Point> {
        let _ = count;
        Vec::new()
    }

    /// Area of a vendored circle.
    pub fn area(&self, circle: geo::Circle) -> f64 {
        std::f64::consts::PI * circle.radius * circle.radius
    }

    fn clamp(&self, value: i64) -> i64 {
        value.max(0)
    }
}
