//! Fragment evaluation and dispatch
//!
//! [`dispatch`] walks a compiled unit in textual order, evaluating each
//! fragment against the execution context and splicing the result into the
//! output. Every capability call is awaited where it appears, so `set` and
//! `get` observe each other in source order.

use crate::engine::context::ExecutionContext;
use crate::engine::render::{render_invocation, Invocation};
use crate::error::{Frame, Result};
use crate::log::LogLevel;
use crate::template::expr::{BinaryOp, Expr, ExprKind, LogicalOp, Span, UnaryOp};
use crate::template::{Builtin, CompiledUnit, Map, Segment, Value};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::time::Duration;

/// Name of the internal frame added by the dispatcher
pub(crate) const DISPATCH_FRAME: &str = "dispatch";

/// Render `unit` with `ctx`
pub(crate) async fn dispatch(unit: &CompiledUnit, ctx: &mut ExecutionContext) -> Result<String> {
    let mut output = String::new();
    for segment in unit.segments() {
        match segment {
            Segment::Text(text) => output.push_str(text),
            Segment::Fragment(expr) => {
                let value = eval(expr, ctx)
                    .await
                    .map_err(|e| e.with_frame(Frame::Internal(DISPATCH_FRAME)))?;
                output.push_str(&value.to_string());
            }
        }
    }
    Ok(output)
}

fn eval<'a>(expr: &'a Expr, ctx: &'a mut ExecutionContext) -> BoxFuture<'a, Result<Value>> {
    async move {
        match &expr.kind {
            ExprKind::Literal(value) => Ok(value.clone()),
            ExprKind::Ident(name) => ctx
                .lookup(name)
                .cloned()
                .ok_or_else(|| ctx.fail(expr.span, format!("{} is not defined", name))),
            ExprKind::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(eval(item, ctx).await?);
                }
                Ok(Value::Array(values))
            }
            ExprKind::Object(entries) => {
                let mut map = Map::new();
                for (key, value) in entries {
                    let value = eval(value, ctx).await?;
                    map.insert(key.clone(), value);
                }
                Ok(Value::Object(map))
            }
            ExprKind::Member { object, property } => {
                let target = eval(object, ctx).await?;
                read_property(&target, property, expr.span, ctx)
            }
            ExprKind::Index { object, index } => {
                let target = eval(object, ctx).await?;
                let key = eval(index, ctx).await?;
                read_property(&target, &key.to_string(), expr.span, ctx)
            }
            ExprKind::Call { callee, args } => {
                let function = eval(callee, ctx).await?;
                let Value::Builtin(builtin) = function else {
                    return Err(ctx.fail(
                        expr.span,
                        format!("{} is not a function", callee.describe()),
                    ));
                };
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(eval(arg, ctx).await?);
                }
                call_builtin(builtin, values, expr.span, ctx).await
            }
            ExprKind::Unary { op, operand } => {
                let value = eval(operand, ctx).await?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!value.is_truthy()),
                    UnaryOp::Neg => Value::Number(-value.to_number()),
                    UnaryOp::Plus => Value::Number(value.to_number()),
                })
            }
            ExprKind::Binary { op, left, right } => {
                let left = eval(left, ctx).await?;
                let right = eval(right, ctx).await?;
                Ok(apply_binary(*op, &left, &right))
            }
            ExprKind::Logical { op, left, right } => {
                let left = eval(left, ctx).await?;
                let take_left = match op {
                    LogicalOp::And => !left.is_truthy(),
                    LogicalOp::Or => left.is_truthy(),
                    LogicalOp::Nullish => !left.is_nullish(),
                };
                if take_left {
                    Ok(left)
                } else {
                    eval(right, ctx).await
                }
            }
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if eval(test, ctx).await?.is_truthy() {
                    eval(consequent, ctx).await
                } else {
                    eval(alternate, ctx).await
                }
            }
            ExprKind::Await(inner) => eval(inner, ctx).await,
        }
    }
    .boxed()
}

fn read_property(
    target: &Value,
    property: &str,
    span: Span,
    ctx: &ExecutionContext,
) -> Result<Value> {
    let index = property.parse::<usize>().ok();
    match target {
        Value::Undefined | Value::Null => Err(ctx.fail(
            span,
            format!(
                "Cannot read properties of {} (reading '{}')",
                target.type_name(),
                property
            ),
        )),
        Value::String(s) if property == "length" => Ok(Value::Number(s.chars().count() as f64)),
        Value::String(s) => Ok(index
            .and_then(|i| s.chars().nth(i))
            .map(|c| Value::String(c.to_string()))
            .unwrap_or_default()),
        Value::Array(items) if property == "length" => Ok(Value::Number(items.len() as f64)),
        Value::Array(items) => Ok(index
            .and_then(|i| items.get(i).cloned())
            .unwrap_or_default()),
        Value::Object(map) => Ok(map.get(property).cloned().unwrap_or_default()),
        Value::Bool(_) | Value::Number(_) | Value::Builtin(_) => Ok(Value::Undefined),
    }
}

fn apply_binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::Add => {
            let concatenates = |v: &Value| {
                matches!(v, Value::String(_) | Value::Array(_) | Value::Object(_))
            };
            if concatenates(left) || concatenates(right) {
                Value::String(format!("{}{}", left, right))
            } else {
                Value::Number(left.to_number() + right.to_number())
            }
        }
        BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Rem => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (left, right) {
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => left.to_number().partial_cmp(&right.to_number()),
            };
            let result = match ordering {
                None => false,
                Some(ordering) => match op {
                    BinaryOp::Lt => ordering.is_lt(),
                    BinaryOp::Le => ordering.is_le(),
                    BinaryOp::Gt => ordering.is_gt(),
                    _ => ordering.is_ge(),
                },
            };
            Value::Bool(result)
        }
        BinaryOp::Eq => Value::Bool(left.loose_equals(right)),
        BinaryOp::Ne => Value::Bool(!left.loose_equals(right)),
        BinaryOp::StrictEq => Value::Bool(left.strict_equals(right)),
        BinaryOp::StrictNe => Value::Bool(!left.strict_equals(right)),
    }
}

fn template_name(
    builtin: Builtin,
    value: Option<&Value>,
    span: Span,
    ctx: &ExecutionContext,
) -> Result<String> {
    match value {
        Some(Value::String(name)) if !name.is_empty() => Ok(name.clone()),
        other => Err(ctx.fail(
            span,
            format!(
                "{}() expects a template name, got {}",
                builtin.name(),
                other.map_or("nothing", Value::type_name)
            ),
        )),
    }
}

/// Caller locals with `overrides` layered on top
fn forwarded_locals(
    builtin: Builtin,
    overrides: Option<Value>,
    span: Span,
    ctx: &ExecutionContext,
) -> Result<Map> {
    let mut locals = ctx.locals.clone();
    match overrides {
        None | Some(Value::Undefined) | Some(Value::Null) => {}
        Some(Value::Object(overrides)) => locals.extend(overrides),
        Some(other) => {
            return Err(ctx.fail(
                span,
                format!(
                    "{}() expects an object of locals, got {}",
                    builtin.name(),
                    other.type_name()
                ),
            ))
        }
    }
    Ok(locals)
}

async fn call_builtin(
    builtin: Builtin,
    args: Vec<Value>,
    span: Span,
    ctx: &mut ExecutionContext,
) -> Result<Value> {
    match builtin {
        Builtin::Include | Builtin::ImportVars => {
            let name = template_name(builtin, args.first(), span, ctx)?;
            let locals = forwarded_locals(builtin, args.into_iter().nth(1), span, ctx)?;
            let exports = (builtin == Builtin::ImportVars).then(Map::new);
            let invocation = Invocation {
                name,
                locals,
                settings: ctx.settings.clone(),
                exports,
            };

            let (text, exports) = render_invocation(ctx.engine.clone(), invocation)
                .await
                .map_err(|e| e.with_frame(ctx.frame(span)))?;

            Ok(match builtin {
                Builtin::Include => Value::String(text),
                _ => Value::Object(exports.unwrap_or_default()),
            })
        }
        Builtin::Set => {
            let mut args = args.into_iter();
            let key = args.next().unwrap_or_default().to_string();
            ctx.session.set(key, args.next().unwrap_or_default());
            Ok(Value::empty())
        }
        Builtin::Get => {
            let key = args.into_iter().next().unwrap_or_default().to_string();
            Ok(ctx.session.get(&key))
        }
        Builtin::ExportVar => {
            let mut args = args.into_iter();
            let key = args.next().unwrap_or_default().to_string();
            ctx.session.export(key, args.next().unwrap_or_default());
            Ok(Value::empty())
        }
        Builtin::Log => {
            let message = args
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" ");
            ctx.engine.logger().log(LogLevel::Info, &message);
            Ok(Value::empty())
        }
        Builtin::Sleep => {
            let ms = args.first().map_or(0.0, Value::to_number);
            if !ms.is_finite() {
                std::future::pending::<()>().await;
            } else if ms > 0.0 {
                // Past what a Duration can hold is as good as forever
                match Duration::try_from_secs_f64(ms / 1000.0) {
                    Ok(duration) => tokio::time::sleep(duration).await,
                    Err(_) => std::future::pending::<()>().await,
                }
            }
            Ok(Value::empty())
        }
        Builtin::Json => {
            let value = args.into_iter().next().unwrap_or_default();
            serde_json::to_string(&value.to_json())
                .map(Value::String)
                .map_err(|e| ctx.fail(span, format!("json() failed: {}", e)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::context::{build_context, Session};
    use crate::engine::Engine;
    use crate::error::RenderError;
    use crate::fs::MemoryFs;
    use crate::template::Compiler;
    use std::path::Path;
    use std::sync::Arc;

    const PATH: &str = "/v/test.template";

    async fn run(source: &str, locals: Map) -> Result<String> {
        let engine = Engine::with_fs(
            EngineConfig::default().with_views("/v"),
            Arc::new(MemoryFs::new()),
        )
        .unwrap();
        let unit = Compiler::new().compile(Path::new(PATH), source).unwrap();
        let mut ctx = build_context(&engine, Path::new(PATH), locals, None, Session::default());
        dispatch(&unit, &mut ctx).await
    }

    async fn render(source: &str) -> String {
        run(source, Map::new()).await.unwrap()
    }

    #[tokio::test]
    async fn test_text_and_values() {
        assert_eq!(render("plain").await, "plain");
        assert_eq!(render("${1 + 2}|${'a' + 1}|${[1, null, 2]}").await, "3|a1|1,,2");
        assert_eq!(render("${undefined}|${null}|${{a: 1}}").await, "undefined|null|[object Object]");
    }

    #[tokio::test]
    async fn test_operators() {
        assert_eq!(render("${7 % 4 * 2 - 1}").await, "5");
        assert_eq!(render("${'b' > 'a'}|${2 <= 1}|${1 == '1'}|${1 === '1'}").await, "true|false|false|false");
        assert_eq!(render("${null == undefined}|${null === undefined}").await, "true|false");
        assert_eq!(render("${0 || 'x'}|${0 ?? 'x'}|${null ?? 'y'}|${1 && 2}").await, "x|0|y|2");
        assert_eq!(render("${!''}|${-'3'}|${true ? 'y' : 'n'}").await, "true|-3|y");
    }

    #[tokio::test]
    async fn test_member_and_index() {
        let mut locals = Map::new();
        locals.insert(
            "user".to_string(),
            Value::from(serde_json::json!({"name": "Ada", "tags": ["x", "y"]})),
        );
        let out = run(
            "${user.name}|${user.tags[1]}|${user.tags.length}|${user['name'].length}|${user.age}",
            locals,
        )
        .await
        .unwrap();
        assert_eq!(out, "Ada|y|2|3|undefined");
    }

    #[tokio::test]
    async fn test_set_then_get_in_order() {
        assert_eq!(render("a${set('k', 5)}b${get('k')}c${get('nope')}").await, "ab5cundefined");
    }

    #[tokio::test]
    async fn test_short_circuit_skips_failing_operand() {
        assert_eq!(render("${false && missing}|${true || missing}").await, "false|true");
    }

    #[tokio::test]
    async fn test_json_capability() {
        assert_eq!(render("${json({b: [1, 'two'], a: null})}").await, r#"{"a":null,"b":[1,"two"]}"#);
    }

    #[tokio::test]
    async fn test_unknown_name_is_located_runtime_error() {
        let err = run("line one\n  ${missing}", Map::new()).await.unwrap_err();
        match &err {
            RenderError::Runtime { message, trace } => {
                assert_eq!(message, "missing is not defined");
                assert_eq!(trace[0], Frame::template(Path::new(PATH), 2, 5));
                assert_eq!(trace[1], Frame::Internal(DISPATCH_FRAME));
            }
            other => panic!("expected runtime error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_property_read_on_undefined() {
        let err = run("${get('x').y}", Map::new()).await.unwrap_err();
        assert!(err
            .to_string()
            .contains("Cannot read properties of undefined (reading 'y')"));
    }

    #[tokio::test]
    async fn test_calling_non_function() {
        let err = run("${__template()}", Map::new()).await.unwrap_err();
        assert!(err.to_string().contains("__template is not a function"));
    }

    #[tokio::test]
    async fn test_include_requires_name() {
        let err = run("${include(3)}", Map::new()).await.unwrap_err();
        assert!(err
            .to_string()
            .contains("include() expects a template name, got number"));
    }

    #[tokio::test]
    async fn test_sleep_renders_empty() {
        assert_eq!(render("a${sleep(1)}b${sleep(-5)}").await, "ab");
    }
}
