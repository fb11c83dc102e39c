//! Minimal verdict example: one validated endpoint, one metadata endpoint.
//!
//! Run with:
//!   RUST_LOG=debug PORT=3000 cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/metadata
//!   curl -X POST http://localhost:3000/users -d '{"name":"alice"}'
//!   curl -X POST http://localhost:3000/users -d '{"name":""}'
//!   curl -X POST http://localhost:3000/users -d 'nope'
//!   curl http://localhost:3000/missing

use std::time::Duration;

use http::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use verdict::middleware::{
    Decorator, Envoy, Middlewares, Path, ServerName, Service, Telemetry, Timeout, Tracer, Tracing, Versioning,
};
use verdict::validation::{Shape, Validator, Validators};
use verdict::{Config, Context, Exception, Redirect, Request, Server, Success, Writer};

#[derive(Deserialize)]
struct NewUser {
    #[serde(default)]
    name: String,
}

impl Shape for NewUser {
    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": { "name": { "type": "string", "minLength": 1, "maxLength": 64 } },
            "required": ["name"]
        })
    }

    fn help(&self) -> Validators {
        let mut fields = Validators::new();
        let report = match self.name.len() {
            0 => Validator::invalid(self.name.as_str(), "name is required"),
            1..=64 => Validator::valid(self.name.as_str()),
            _ => Validator::invalid(self.name.as_str(), "name must be at most 64 characters"),
        };
        fields.insert("name".into(), report);
        fields
    }
}

#[tokio::main]
async fn main() -> Result<(), verdict::Error> {
    let config = Config::from_env()?;
    verdict::logging::init(config.log_format)?;

    let server = config.server_name.clone().unwrap_or_else(|| "verdict".to_owned());

    let mut stack = Middlewares::new();
    stack.add([
        Decorator::from(Timeout::new(Duration::from_secs(5))),
        Decorator::from(Telemetry),
        Decorator::from(Envoy),
        Decorator::from(Tracing::new(Tracer::new("users"))),
        Decorator::from(Versioning::new(env!("CARGO_PKG_VERSION"))),
        Decorator::from(Service::new("users")),
        Decorator::from(ServerName::new(server)),
        Decorator::from(Path),
    ]);

    Server::from_config(&config)?.serve(stack.handler(route)).await
}

async fn route(req: Request) -> Writer {
    let method = req.method().clone();
    let path = req.path().to_owned();

    match (method, path.as_str()) {
        (Method::GET, "/metadata") => verdict::metadata::handler(req).await,
        (Method::POST, "/users") => create_user(req).await,
        (Method::GET, "/") => {
            let mut writer = Writer::new();
            verdict::process(req, &mut writer, |ctx: Context| async move {
                ctx.redirect(Redirect::found("/metadata"));
            })
            .await;
            writer
        }
        _ => {
            let mut writer = Writer::new();
            verdict::process(req, &mut writer, |ctx: Context| async move {
                let path = ctx.request().path().to_owned();
                ctx.error(Exception::new(StatusCode::NOT_FOUND).log("no such route").with_metadata("path", path));
            })
            .await;
            writer
        }
    }
}

async fn create_user(req: Request) -> Writer {
    let mut writer = Writer::new();
    verdict::validate::<NewUser, _, _>(req, &mut writer, |ctx| async move {
        let Ok(user) = ctx.input() else {
            ctx.complete(None);
            return;
        };

        let created = json!({ "id": 99, "name": user.name });
        ctx.headers().insert(http::header::LOCATION, http::HeaderValue::from_static("/users/99"));
        ctx.complete(Success::new(StatusCode::CREATED, created));
    })
    .await;
    writer
}
