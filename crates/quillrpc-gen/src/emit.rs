//! Renders the generated source file: one `RPC` descriptor plus, per
//! service, an `Invoker` impl (dispatch) and an `smd()` self-description.

use std::collections::BTreeSet;

use quillrpc_parser::cases;
use quillrpc_parser::{Arg, ErrorKind, Method, PackageInfo, Property, Service, TypeInfo};
use quillrpc_smd::Kind;

use crate::writer::CodeWriter;

/// Emitter options fixed by CLI flags.
#[derive(Debug, Clone)]
pub struct EmitOptions {
    /// Separator between namespace and method in wire method names; baked
    /// into the generated file as `SCOPE_SEPARATOR`.
    pub separator: char,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self { separator: '.' }
    }
}

/// Name of the file emitted next to the entry sources.
pub fn output_file_name(package: &PackageInfo) -> String {
    format!("{}{}", package.name, quillrpc_parser::GENERATED_FILE_SUFFIX)
}

/// Render the complete generated file. Output is deterministic: the same
/// package model always produces byte-identical text.
pub fn generate(package: &PackageInfo, options: &EmitOptions) -> String {
    let mut w = CodeWriter::new();

    let any_args = package
        .services
        .iter()
        .flat_map(|service| &service.methods)
        .any(|method| !method.args.is_empty());

    w.line("// Code generated by quillrpc-gen. DO NOT EDIT.");
    w.blank();
    w.line("use async_trait::async_trait;");
    if any_args {
        w.line("use serde::Deserialize;");
    }
    w.line("use serde_json::Value;");
    w.blank();
    w.line("use quillrpc::{smd, Context, Invoker, Response};");
    w.blank();
    w.line("use super::*;");
    for import in package.referenced_namespaces() {
        w.line(&import.use_line());
    }
    w.blank();

    w.line("/// Separator between namespace and method in wire method names.");
    w.line(&format!("pub const SCOPE_SEPARATOR: char = {:?};", options.separator));
    w.blank();

    emit_rpc_descriptor(&mut w, package);

    for service in &package.services {
        emit_service(&mut w, package, service);
    }

    w.finish()
}

/// The `RPC` descriptor gives user code compile-time identifiers for every
/// routing name.
fn emit_rpc_descriptor(w: &mut CodeWriter, package: &PackageInfo) {
    for service in &package.services {
        w.block(&format!("pub struct Rpc{} {{", service.name), "}", |w| {
            for method in &service.methods {
                w.line(&format!("pub {}: &'static str,", method.name));
            }
        });
        w.blank();
    }

    w.block("pub struct Rpc {", "}", |w| {
        for service in &package.services {
            w.line(&format!(
                "pub {}: Rpc{},",
                cases::to_case_with_sep(&service.name, '_'),
                service.name
            ));
        }
    });
    w.blank();

    w.block("pub const RPC: Rpc = Rpc {", "};", |w| {
        for service in &package.services {
            w.block(
                &format!("{}: Rpc{} {{", cases::to_case_with_sep(&service.name, '_'), service.name),
                "},",
                |w| {
                    for method in &service.methods {
                        w.line(&format!("{}: {},", method.name, quote_str(&method.route_name)));
                    }
                },
            );
        }
    });
    w.blank();
}

fn emit_service(w: &mut CodeWriter, package: &PackageInfo, service: &Service) {
    w.line("#[async_trait]");
    w.block(&format!("impl Invoker for {} {{", service.name), "}", |w| {
        w.line("#[allow(unused_variables)]");
        w.block(
            "async fn invoke(&self, ctx: &Context, method: &str, params: Option<Value>) -> Response {",
            "}",
            |w| {
                w.block("match method {", "}", |w| {
                    for method in &service.methods {
                        emit_method_arm(w, method);
                    }
                    w.line("_ => Response::error_code(quillrpc::ErrorCode::MethodNotFound, None),");
                });
            },
        );
        w.blank();
        emit_smd_fn(w, package, service);
    });
    w.blank();
}

fn emit_method_arm(w: &mut CodeWriter, method: &Method) {
    w.block(&format!("{} => {{", quote_str(&method.route_name)), "}", |w| {
        if !method.args.is_empty() {
            emit_args_struct(w, &method.args);
            w.blank();
            emit_positional_conversion(w, &method.args);
            w.blank();

            let has_defaults = method.args.iter().any(|arg| arg.default.is_some());
            let binding = if has_defaults { "let mut args" } else { "let args" };
            w.block(
                &format!("{binding}: Args = match quillrpc::params::decode(params) {{"),
                "};",
                |w| {
                    w.line("Ok(args) => args,");
                    w.line("Err(err) => return Response::from_error(err),");
                },
            );

            for arg in &method.args {
                let Some(default) = &arg.default else {
                    continue;
                };
                w.blank();
                if !arg.description.is_empty() {
                    w.line(&format!("// {}", arg.description));
                }
                w.block(&format!("if args.{}.is_none() {{", arg.name), "}", |w| {
                    w.line(&format!("args.{} = Some({});", arg.name, default));
                });
            }
            w.blank();
        }

        emit_call(w, method);
    });
}

fn emit_args_struct(w: &mut CodeWriter, args: &[Arg]) {
    w.line("#[derive(Deserialize)]");
    w.block("struct Args {", "}", |w| {
        for arg in args {
            if arg.json_name != arg.name {
                w.line(&format!("#[serde(rename = {})]", quote_str(&arg.json_name)));
            }
            w.line(&format!("{}: {},", arg.name, arg.ty.spelling));
        }
    });
}

fn emit_positional_conversion(w: &mut CodeWriter, args: &[Arg]) {
    let names = args
        .iter()
        .map(|arg| quote_str(&arg.json_name))
        .collect::<Vec<_>>()
        .join(", ");

    w.block("let params = match params {", "};", |w| {
        w.block("Some(Value::Array(values)) => {", "}", |w| {
            w.block(
                &format!("match quillrpc::params::to_named(&[{names}], values) {{"),
                "}",
                |w| {
                    w.line("Ok(object) => Some(object),");
                    w.line("Err(err) => return Response::from_error(err),");
                },
            );
        });
        w.line("other => other,");
    });
}

fn emit_call(w: &mut CodeWriter, method: &Method) {
    let mut call_args: Vec<String> = Vec::new();
    if method.has_context {
        call_args.push("ctx".to_string());
    }
    for arg in &method.args {
        call_args.push(format!("args.{}", arg.name));
    }

    let suffix = if method.is_async { ".await" } else { "" };
    let call = format!("self.{}({}){suffix}", method.name, call_args.join(", "));

    match (&method.returns.error, &method.returns.data) {
        (Some(kind), _) => {
            w.block(&format!("match {call} {{"), "}", |w| {
                w.line("Ok(value) => Response::result(&value),");
                match kind {
                    ErrorKind::Library => w.line("Err(err) => Response::from_error(err),"),
                    ErrorKind::Plain => w.line("Err(err) => Response::internal(err.to_string()),"),
                }
            });
        }
        (None, Some(_)) => {
            w.line(&format!("Response::result(&{call})"));
        }
        (None, None) => {
            w.line(&format!("{call};"));
            w.line("Response::result(&())");
        }
    }
}

fn emit_smd_fn(w: &mut CodeWriter, package: &PackageInfo, service: &Service) {
    w.block("fn smd(&self) -> smd::ServiceInfo {", "}", |w| {
        w.line("let mut methods = std::collections::HashMap::new();");
        w.blank();

        for method in &service.methods {
            w.block("methods.insert(", ");", |w| {
                w.line(&format!("{}.to_string(),", quote_str(&method.route_name)));
                w.block("smd::Service {", "},", |w| {
                    w.line(&format!("description: {},", string_expr(&method.description)));

                    if method.args.is_empty() {
                        w.line("parameters: vec![],");
                    } else {
                        w.block("parameters: vec![", "],", |w| {
                            for arg in &method.args {
                                let node = schema_node(
                                    package,
                                    Some(&arg.json_name),
                                    &arg.ty,
                                    &arg.description,
                                    arg.default.as_deref(),
                                );
                                emit_chain(w, node, ",");
                            }
                        });
                    }

                    match &method.returns.data {
                        None => w.line("returns: None,"),
                        Some(data) => {
                            let node = schema_node(
                                package,
                                None,
                                data,
                                &method.return_description,
                                None,
                            );
                            w.block("returns: Some(", "),", |w| {
                                emit_chain(w, node, "");
                            });
                        }
                    }

                    if method.errors.is_empty() {
                        w.line("errors: Default::default(),");
                    } else {
                        w.block("errors: smd::errors([", "]),", |w| {
                            for (code, message) in &method.errors {
                                w.line(&format!("({code}, {}),", quote_str(message)));
                            }
                        });
                    }
                });
            });
            w.blank();
        }

        w.block("smd::ServiceInfo {", "}", |w| {
            w.line(&format!("description: {},", string_expr(&service.description)));
            w.line("methods,");
        });
    });
}

/// One builder-chain expression for a parameter or return schema node.
struct Chain {
    head: String,
    pieces: Vec<Piece>,
}

enum Piece {
    /// A chained call that fits on one line, e.g. `.optional()`.
    Call(String),
    /// `.with_properties([...])` with one entry line per property.
    Properties(Vec<String>),
    /// `.with_definitions([...])` with per-definition property entries.
    Definitions(Vec<(String, Vec<String>)>),
}

fn schema_node(
    package: &PackageInfo,
    name: Option<&str>,
    info: &TypeInfo,
    description: &str,
    default: Option<&str>,
) -> Chain {
    let kind = kind_expr(info.kind);
    let head = match name {
        Some(name) => format!("smd::JsonSchema::named({}, {kind})", quote_str(name)),
        None => format!("smd::JsonSchema::of({kind})"),
    };

    let mut pieces = Vec::new();

    if info.optional {
        pieces.push(Piece::Call(".optional()".to_string()));
    }
    if let Some(default) = default {
        pieces.push(Piece::Call(format!(".with_default({})", default_expr(default))));
    }
    if !description.is_empty() {
        pieces.push(Piece::Call(format!(".with_description({})", quote_str(description))));
    }

    if info.kind == Kind::Array {
        match &info.reference {
            Some(reference) => pieces.push(Piece::Call(format!(
                ".with_items_ref({})",
                quote_str(&reference.key())
            ))),
            None => {
                if let Some(item) = info.item_kind {
                    pieces.push(Piece::Call(format!(".with_items_kind({})", kind_expr(item))));
                }
            }
        }
    }

    if info.kind == Kind::Object {
        if let Some(entries) = info
            .reference
            .as_ref()
            .and_then(|reference| resolved_properties(package, &reference.key()))
        {
            if !entries.is_empty() {
                pieces.push(Piece::Properties(entries));
            }
        }
    }

    let definitions: Vec<(String, Vec<String>)> = collect_definitions(package, info)
        .into_iter()
        .filter_map(|key| resolved_properties(package, &key).map(|entries| (key, entries)))
        .collect();
    if !definitions.is_empty() {
        pieces.push(Piece::Definitions(definitions));
    }

    Chain { head, pieces }
}

/// Entry lines of a resolved struct's property map.
fn resolved_properties(package: &PackageInfo, key: &str) -> Option<Vec<String>> {
    let properties = package.structs.get(key)?.properties.as_ref()?;
    Some(properties.iter().map(property_entry).collect())
}

fn property_entry(property: &Property) -> String {
    let mut chain = format!("smd::Property::of({})", kind_expr(property.kind));

    if !property.description.is_empty() {
        chain.push_str(&format!(".with_description({})", quote_str(&property.description)));
    }

    match property.kind {
        Kind::Object => {
            if let Some(reference) = &property.reference {
                chain.push_str(&format!(".with_ref({})", quote_str(reference)));
            }
        }
        Kind::Array => {
            if let Some(reference) = &property.reference {
                chain.push_str(&format!(".with_items_ref({})", quote_str(reference)));
            } else if let Some(item) = property.item_kind {
                chain.push_str(&format!(".with_items_kind({})", kind_expr(item)));
            }
        }
        _ => {}
    }

    format!("({}.to_string(), {chain}),", quote_str(&property.name))
}

/// Structs a schema node's `$ref`s can reach, transitively. An object root's
/// own properties are inlined, so the root itself only appears when one of
/// its descendants cycles back to it.
fn collect_definitions(package: &PackageInfo, info: &TypeInfo) -> Vec<String> {
    let mut queue: Vec<String> = Vec::new();

    match (&info.reference, info.kind) {
        (Some(reference), Kind::Object) => {
            if let Some(properties) = package
                .structs
                .get(&reference.key())
                .and_then(|def| def.properties.as_ref())
            {
                queue.extend(properties.iter().filter_map(|p| p.reference.clone()));
            }
        }
        (Some(reference), Kind::Array) => queue.push(reference.key()),
        _ => {}
    }

    let mut found = BTreeSet::new();
    let mut visited = BTreeSet::new();
    while let Some(key) = queue.pop() {
        if !visited.insert(key.clone()) {
            continue;
        }

        let Some(properties) = package.structs.get(&key).and_then(|def| def.properties.as_ref())
        else {
            continue;
        };

        found.insert(key);
        queue.extend(properties.iter().filter_map(|p| p.reference.clone()));
    }

    found.into_iter().collect()
}

/// Write a builder chain; `terminator` lands on its final line.
fn emit_chain(w: &mut CodeWriter, chain: Chain, terminator: &str) {
    let all_calls = chain.pieces.iter().all(|piece| matches!(piece, Piece::Call(_)));
    if all_calls {
        let suffix: String = chain
            .pieces
            .iter()
            .map(|piece| match piece {
                Piece::Call(text) => text.as_str(),
                _ => unreachable!(),
            })
            .collect();
        w.line(&format!("{}{suffix}{terminator}", chain.head));
        return;
    }

    w.line(&chain.head);
    w.indented(|w| {
        let last = chain.pieces.len() - 1;
        for (index, piece) in chain.pieces.into_iter().enumerate() {
            let piece_terminator = if index == last { terminator } else { "" };
            match piece {
                Piece::Call(text) => w.line(&format!("{text}{piece_terminator}")),
                Piece::Properties(entries) => {
                    w.block(".with_properties([", &format!("]){piece_terminator}"), |w| {
                        for entry in entries {
                            w.line(&entry);
                        }
                    });
                }
                Piece::Definitions(definitions) => {
                    w.block(".with_definitions([", &format!("]){piece_terminator}"), |w| {
                        for (key, entries) in definitions {
                            w.block("(", "),", |w| {
                                w.line(&format!("{}.to_string(),", quote_str(&key)));
                                w.block("smd::Definition::object([", "]),", |w| {
                                    for entry in entries {
                                        w.line(&entry);
                                    }
                                });
                            });
                        }
                    });
                }
            }
        }
    });
}

fn kind_expr(kind: Kind) -> &'static str {
    match kind {
        Kind::Boolean => "smd::Kind::Boolean",
        Kind::Integer => "smd::Kind::Integer",
        Kind::Float => "smd::Kind::Float",
        Kind::String => "smd::Kind::String",
        Kind::Array => "smd::Kind::Array",
        Kind::Object => "smd::Kind::Object",
    }
}

/// Rust string literal with escapes.
fn quote_str(text: &str) -> String {
    format!("{text:?}")
}

fn string_expr(text: &str) -> String {
    if text.is_empty() {
        "String::new()".to_string()
    } else {
        format!("{}.to_string()", quote_str(text))
    }
}

/// SMD `default` payload for a directive default. Literals that are valid
/// JSON go in as raw values; any other Rust expression is recorded as its
/// source text.
fn default_expr(text: &str) -> String {
    if serde_json::from_str::<serde_json::Value>(text).is_ok() {
        format!("serde_json::json!({text})")
    } else {
        format!("serde_json::Value::String({}.to_string())", quote_str(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_expr_distinguishes_json_from_expressions() {
        assert_eq!(default_expr("2.0"), "serde_json::json!(2.0)");
        assert_eq!(default_expr("false"), "serde_json::json!(false)");
        assert_eq!(
            default_expr("vec![1.0, 2.0]"),
            "serde_json::Value::String(\"vec![1.0, 2.0]\".to_string())"
        );
    }

    #[test]
    fn strings_are_escaped_as_rust_literals() {
        assert_eq!(quote_str(r#"say "hi""#), r#""say \"hi\"""#);
        assert_eq!(string_expr(""), "String::new()");
    }
}
