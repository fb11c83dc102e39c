//! Ready-made handler that describes the running service.

use http::StatusCode;
use serde_json::{Map, Value, json};
use tracing::Instrument;

use crate::context::Context;
use crate::engine::process;
use crate::middleware::{Path, Service, Tracing, Versioning};
use crate::outcome::Success;
use crate::request::Request;
use crate::writer::Writer;

/// Answers `200` with `{"<service>": {"path", "service", "version"}}`.
///
/// Values come from the [`Path`], [`Service`] and [`Versioning`] layers;
/// unset ones read as empty (the version as `development`). When a
/// [`Tracing`] layer is present the work runs in a `metadata` span.
pub async fn handler(request: Request) -> Writer {
    let mut writer = Writer::new();
    process(request, &mut writer, |ctx: Context| async move {
        let span = match Tracing::value(ctx.scope()) {
            Some(tracer) => tracer.span("metadata"),
            None => tracing::Span::none(),
        };

        async {
            let scope = ctx.scope();
            let service = Service::value(scope).unwrap_or_default().to_owned();

            let mut payload = Map::new();
            payload.insert(
                service.clone(),
                json!({
                    "path": Path::value(scope).unwrap_or_default(),
                    "service": service,
                    "version": Versioning::value(scope).service,
                }),
            );

            ctx.complete(Success::new(StatusCode::OK, Value::Object(payload)));
        }
        .instrument(span)
        .await;
    })
    .await;
    writer
}
