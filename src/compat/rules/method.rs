//! Rules for RPC methods that exist on both sides.

use crate::compat::categories::ViolationKind;
use crate::compat::type_compat::{TypeChecker, TypeCompatibility};
use crate::compat::types::{Event, Rule, RuleContext};
use crate::descriptor::{MessageId, MethodDescriptor};
use crate::diff::Change;

fn changed_method<'a>(event: &Event<'a>) -> Option<(&'a MethodDescriptor, &'a MethodDescriptor)> {
    match event {
        Event::Method {
            change: Change::Changed { current, candidate },
            ..
        } => Some((*current, *candidate)),
        _ => None,
    }
}

#[derive(Debug, Default)]
pub struct MethodClientStreamingRule;

impl Rule for MethodClientStreamingRule {
    fn id(&self) -> &'static str {
        "METHOD_CLIENT_STREAMING"
    }

    fn check<'a>(&self, ctx: &mut RuleContext<'a>, event: &Event<'a>) -> anyhow::Result<()> {
        if let Some((current, candidate)) = changed_method(event) {
            if current.client_streaming != candidate.client_streaming {
                ctx.report(ViolationKind::WireIncompatibility, "changed to/from client streaming");
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MethodServerStreamingRule;

impl Rule for MethodServerStreamingRule {
    fn id(&self) -> &'static str {
        "METHOD_SERVER_STREAMING"
    }

    fn check<'a>(&self, ctx: &mut RuleContext<'a>, event: &Event<'a>) -> anyhow::Result<()> {
        if let Some((current, candidate)) = changed_method(event) {
            if current.server_streaming != candidate.server_streaming {
                ctx.report(ViolationKind::WireIncompatibility, "changed to/from server streaming");
            }
        }
        Ok(())
    }
}

/// Which side of the signature a rule looks at.
#[derive(Debug, Clone, Copy)]
enum Direction {
    Input,
    Output,
}

impl Direction {
    fn label(self) -> &'static str {
        match self {
            Direction::Input => "input",
            Direction::Output => "output",
        }
    }

    fn type_of(self, method: &MethodDescriptor) -> (Option<MessageId>, &str) {
        match self {
            Direction::Input => (method.input_type, &method.input_type_name),
            Direction::Output => (method.output_type, &method.output_type_name),
        }
    }
}

fn check_signature_type<'a>(
    ctx: &mut RuleContext<'a>,
    direction: Direction,
    current: &MethodDescriptor,
    candidate: &MethodDescriptor,
) {
    let (current_id, current_name) = direction.type_of(current);
    let (candidate_id, candidate_name) = direction.type_of(candidate);

    let (current_name, candidate_name) = match (current_id, candidate_id) {
        (Some(a), Some(b)) => {
            let (a, b) = (ctx.current().message(a), ctx.candidate().message(b));
            match TypeChecker::new(ctx.current(), ctx.candidate()).check_messages(a, b) {
                TypeCompatibility::Incompatible(incompatibility) => {
                    ctx.report(
                        incompatibility.kind,
                        format!(
                            "{} type changed: {}",
                            direction.label(),
                            incompatibility.description
                        ),
                    );
                    return;
                }
                TypeCompatibility::Unknown(reason) => ctx.warn(reason),
                TypeCompatibility::Compatible => {}
            }
            (a.full_name.as_str(), b.full_name.as_str())
        }
        _ => {
            if current_name != candidate_name {
                ctx.warn(format!(
                    "cannot compare unresolved {} types {} and {} of method {}",
                    direction.label(),
                    current_name,
                    candidate_name,
                    candidate.full_name
                ));
            }
            (current_name, candidate_name)
        }
    };

    if current_name.trim_start_matches('.') != candidate_name.trim_start_matches('.') {
        ctx.report(
            ViolationKind::GeneratedSourceCodeIncompatibility,
            format!("method {} type changed", direction.label()),
        );
    }
}

#[derive(Debug, Default)]
pub struct MethodInputTypeRule;

impl Rule for MethodInputTypeRule {
    fn id(&self) -> &'static str {
        "METHOD_INPUT_TYPE"
    }

    fn check<'a>(&self, ctx: &mut RuleContext<'a>, event: &Event<'a>) -> anyhow::Result<()> {
        if let Some((current, candidate)) = changed_method(event) {
            check_signature_type(ctx, Direction::Input, current, candidate);
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MethodOutputTypeRule;

impl Rule for MethodOutputTypeRule {
    fn id(&self) -> &'static str {
        "METHOD_OUTPUT_TYPE"
    }

    fn check<'a>(&self, ctx: &mut RuleContext<'a>, event: &Event<'a>) -> anyhow::Result<()> {
        if let Some((current, candidate)) = changed_method(event) {
            check_signature_type(ctx, Direction::Output, current, candidate);
        }
        Ok(())
    }
}

/// Idempotency may only become stricter.
#[derive(Debug, Default)]
pub struct MethodIdempotencyRule;

impl Rule for MethodIdempotencyRule {
    fn id(&self) -> &'static str {
        "METHOD_IDEMPOTENCY"
    }

    fn check<'a>(&self, ctx: &mut RuleContext<'a>, event: &Event<'a>) -> anyhow::Result<()> {
        if let Some((current, candidate)) = changed_method(event) {
            if !current
                .idempotency_level
                .permits_transition_to(candidate.idempotency_level)
            {
                ctx.report(ViolationKind::BestPractice, "Idempotency level changed to less strict");
            }
        }
        Ok(())
    }
}
