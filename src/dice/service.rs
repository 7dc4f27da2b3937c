//! Instrumented dice rolls.

use opentelemetry::baggage::BaggageExt;
use opentelemetry::trace::{Link, Span as _, SpanContext, SpanKind, TraceContextExt, Tracer as _};
use opentelemetry::{Context, KeyValue};
use opentelemetry_sdk::trace::SdkTracer;

use crate::dice::generator::{self, DiceError};
use crate::observability::trace;

pub const DICE_MIN: i64 = 1;
pub const DICE_MAX: i64 = 6;

pub const SETUP_SPAN: &str = "dice_setup";
pub const ROLL_SPAN: &str = "roll_dice";
pub const ROLL_EVENT: &str = "rolling dice";

/// Baggage entry logged with every roll.
pub const USER_ID_KEY: &str = "user-id";

/// Rolls dice inside a traced scope.
///
/// Every roll span links back to the setup span recorded at construction,
/// relating per-request traces to the startup trace.
#[derive(Clone)]
pub struct DiceRoller {
    tracer: SdkTracer,
    setup_span: SpanContext,
}

impl DiceRoller {
    /// Record the setup span and return a roller linked to it.
    pub fn new(tracer: SdkTracer) -> Self {
        let builder = tracer.span_builder(SETUP_SPAN).with_kind(SpanKind::Internal);
        let mut setup = tracer.build_with_context(builder, &Context::new());
        let setup_span = setup.span_context().clone();
        setup.end();

        tracing::debug!(
            trace_id = %setup_span.trace_id(),
            span_id = %setup_span.span_id(),
            "Dice setup span recorded"
        );

        Self { tracer, setup_span }
    }

    pub fn setup_span(&self) -> &SpanContext {
        &self.setup_span
    }

    /// Roll a six-sided die as a child of `parent`.
    pub fn roll(&self, parent: &Context) -> Result<i64, DiceError> {
        self.roll_between(parent, DICE_MIN, DICE_MAX)
    }

    /// Roll a value in `min..=max` as a child of `parent`.
    pub fn roll_between(&self, parent: &Context, min: i64, max: i64) -> Result<i64, DiceError> {
        let builder = self
            .tracer
            .span_builder(ROLL_SPAN)
            .with_kind(SpanKind::Internal)
            .with_attributes(vec![
                KeyValue::new("dice.min", min),
                KeyValue::new("dice.max", max),
            ])
            .with_links(vec![Link::with_context(self.setup_span.clone())]);

        trace::in_span(&self.tracer, builder, parent, |cx| -> Result<i64, DiceError> {
            trace::record_event(cx, ROLL_EVENT);
            let value = generator::random_in_range(min, max)?;
            cx.span().set_attribute(KeyValue::new("dice.value", value));

            let user_id = cx
                .baggage()
                .get(USER_ID_KEY)
                .map(|v| v.to_string())
                .unwrap_or_else(|| "none".to_string());
            tracing::info!("Baggage user-id: {user_id}");
            tracing::debug!(
                value,
                trace_id = %cx.span().span_context().trace_id(),
                "Rolled dice"
            );
            Ok(value)
        })
    }
}
