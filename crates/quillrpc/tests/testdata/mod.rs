//! Arithmetic test service with a hand-written dispatch impl matching the
//! output shape of `quillrpc-gen`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use quillrpc::{smd, Context, Invoker, Response};

/// Client address a transport would stash into the request extensions.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteAddr(pub String);

#[derive(Debug, Error)]
pub enum ArithError {
    #[error("divide by zero")]
    DivideByZero,
}

#[derive(Debug, Serialize)]
pub struct Quotient {
    #[serde(rename = "Quo")]
    pub quo: i64,
    pub rem: i64,
}

pub struct ArithService;

impl ArithService {
    /// Returns the quotient and remainder of two numbers.
    pub fn divide(&self, a: i64, b: i64) -> Result<Quotient, ArithError> {
        if b == 0 {
            return Err(ArithError::DivideByZero);
        }

        Ok(Quotient { quo: a / b, rem: a % b })
    }

    /// Returns base**exp; exp falls back to 2 when not supplied.
    pub fn pow(&self, base: f64, exp: Option<f64>) -> f64 {
        base.powf(exp.unwrap_or(2.0))
    }

    /// Always errors with the sum as code and the caller address as message.
    pub fn sum(&self, ctx: &Context, a: i64, b: i64) -> Result<bool, quillrpc::Error> {
        let addr = ctx
            .get::<RemoteAddr>()
            .map(|addr| addr.0.clone())
            .unwrap_or_default();

        Err(quillrpc::Error::new(a + b, addr))
    }

    pub async fn multiply(&self, a: i64, b: i64) -> i64 {
        a * b
    }

    pub fn pi(&self) -> f64 {
        std::f64::consts::PI
    }

    pub fn check_error(&self, is_err: bool) -> Result<(), ArithError> {
        if is_err {
            return Err(ArithError::DivideByZero);
        }

        Ok(())
    }
}

// The code below mirrors what quillrpc-gen emits for this service.

pub struct RpcArithService {
    pub divide: &'static str,
    pub pow: &'static str,
    pub sum: &'static str,
    pub multiply: &'static str,
    pub pi: &'static str,
    pub check_error: &'static str,
}

pub struct Rpc {
    pub arith_service: RpcArithService,
}

pub const RPC: Rpc = Rpc {
    arith_service: RpcArithService {
        divide: "divide",
        pow: "pow",
        sum: "sum",
        multiply: "multiply",
        pi: "pi",
        check_error: "check_error",
    },
};

#[async_trait]
impl Invoker for ArithService {
    async fn invoke(&self, ctx: &Context, method: &str, params: Option<Value>) -> Response {
        match method {
            "divide" => {
                #[derive(Deserialize)]
                struct Args {
                    a: i64,
                    b: i64,
                }

                let params = match params {
                    Some(Value::Array(values)) => {
                        match quillrpc::params::to_named(&["a", "b"], values) {
                            Ok(object) => Some(object),
                            Err(err) => return Response::from_error(err),
                        }
                    }
                    other => other,
                };

                let args: Args = match quillrpc::params::decode(params) {
                    Ok(args) => args,
                    Err(err) => return Response::from_error(err),
                };

                match self.divide(args.a, args.b) {
                    Ok(value) => Response::result(&value),
                    Err(err) => Response::internal(err.to_string()),
                }
            }
            "pow" => {
                #[derive(Deserialize)]
                struct Args {
                    base: f64,
                    exp: Option<f64>,
                }

                let params = match params {
                    Some(Value::Array(values)) => {
                        match quillrpc::params::to_named(&["base", "exp"], values) {
                            Ok(object) => Some(object),
                            Err(err) => return Response::from_error(err),
                        }
                    }
                    other => other,
                };

                let mut args: Args = match quillrpc::params::decode(params) {
                    Ok(args) => args,
                    Err(err) => return Response::from_error(err),
                };

                if args.exp.is_none() {
                    args.exp = Some(2.0);
                }

                Response::result(&self.pow(args.base, args.exp))
            }
            "sum" => {
                #[derive(Deserialize)]
                struct Args {
                    a: i64,
                    b: i64,
                }

                let params = match params {
                    Some(Value::Array(values)) => {
                        match quillrpc::params::to_named(&["a", "b"], values) {
                            Ok(object) => Some(object),
                            Err(err) => return Response::from_error(err),
                        }
                    }
                    other => other,
                };

                let args: Args = match quillrpc::params::decode(params) {
                    Ok(args) => args,
                    Err(err) => return Response::from_error(err),
                };

                match self.sum(ctx, args.a, args.b) {
                    Ok(value) => Response::result(&value),
                    Err(err) => Response::from_error(err),
                }
            }
            "multiply" => {
                #[derive(Deserialize)]
                struct Args {
                    a: i64,
                    b: i64,
                }

                let params = match params {
                    Some(Value::Array(values)) => {
                        match quillrpc::params::to_named(&["a", "b"], values) {
                            Ok(object) => Some(object),
                            Err(err) => return Response::from_error(err),
                        }
                    }
                    other => other,
                };

                let args: Args = match quillrpc::params::decode(params) {
                    Ok(args) => args,
                    Err(err) => return Response::from_error(err),
                };

                Response::result(&self.multiply(args.a, args.b).await)
            }
            "pi" => Response::result(&self.pi()),
            "check_error" => {
                #[derive(Deserialize)]
                struct Args {
                    #[serde(rename = "isErr")]
                    is_err: bool,
                }

                let params = match params {
                    Some(Value::Array(values)) => {
                        match quillrpc::params::to_named(&["isErr"], values) {
                            Ok(object) => Some(object),
                            Err(err) => return Response::from_error(err),
                        }
                    }
                    other => other,
                };

                let args: Args = match quillrpc::params::decode(params) {
                    Ok(args) => args,
                    Err(err) => return Response::from_error(err),
                };

                match self.check_error(args.is_err) {
                    Ok(value) => Response::result(&value),
                    Err(err) => Response::internal(err.to_string()),
                }
            }
            _ => Response::error_code(quillrpc::ErrorCode::MethodNotFound, None),
        }
    }

    fn smd(&self) -> smd::ServiceInfo {
        let mut methods = std::collections::HashMap::new();

        methods.insert(
            "divide".to_string(),
            smd::Service {
                description: "Returns the quotient and remainder of two numbers.".to_string(),
                parameters: vec![
                    smd::JsonSchema::named("a", smd::Kind::Integer),
                    smd::JsonSchema::named("b", smd::Kind::Integer),
                ],
                returns: Some(
                    smd::JsonSchema::of(smd::Kind::Object).with_properties([
                        ("Quo".to_string(), smd::Property::of(smd::Kind::Integer)),
                        ("rem".to_string(), smd::Property::of(smd::Kind::Integer)),
                    ]),
                ),
                errors: smd::errors([(-32603, "divide by zero")]),
            },
        );
        methods.insert(
            "pow".to_string(),
            smd::Service {
                description: "Returns base**exp; exp falls back to 2 when not supplied."
                    .to_string(),
                parameters: vec![
                    smd::JsonSchema::named("base", smd::Kind::Float),
                    smd::JsonSchema::named("exp", smd::Kind::Float)
                        .optional()
                        .with_default(serde_json::json!(2.0)),
                ],
                returns: Some(smd::JsonSchema::of(smd::Kind::Float)),
                errors: Default::default(),
            },
        );
        methods.insert(
            "pi".to_string(),
            smd::Service {
                description: String::new(),
                parameters: vec![],
                returns: Some(smd::JsonSchema::of(smd::Kind::Float)),
                errors: Default::default(),
            },
        );

        smd::ServiceInfo {
            description: "Arithmetic over JSON-RPC.".to_string(),
            methods,
        }
    }
}
