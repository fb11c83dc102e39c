use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, LOCATION};
use http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::subscriber::DefaultGuard;
use verdict::validation::{Shape, Validator, Validators};
use verdict::{Context, Error, Exception, Redirect, Request, Success, Terminal, Writer};

/// Helper: a request with the given method, path and body.
fn request(method: Method, path: &'static str, body: &'static str) -> Request {
    Request::new(method, Uri::from_static(path), HeaderMap::new(), Bytes::from_static(body.as_bytes()))
}

/// Helper: captures formatted log lines for the current thread.
#[derive(Clone, Default)]
struct Logs(Arc<Mutex<Vec<u8>>>);

impl Logs {
    fn install(&self) -> DefaultGuard {
        let logs = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .with_writer(move || logs.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for Logs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct NewUser {
    #[serde(default)]
    name: String,
}

impl Shape for NewUser {
    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": { "name": { "type": "string", "minLength": 1 } },
            "required": ["name"]
        })
    }

    fn help(&self) -> Validators {
        let mut fields = Validators::new();
        if self.name.is_empty() {
            fields.insert("name".into(), Validator::invalid(self.name.as_str(), "name is required"));
        } else {
            fields.insert("name".into(), Validator::valid(self.name.as_str()));
        }
        fields
    }
}

#[derive(Debug, Deserialize)]
struct Misconfigured {}

impl Shape for Misconfigured {
    fn schema() -> Value {
        json!({ "type": "object", "properties": { "x": { "type": 12 } } })
    }

    fn help(&self) -> Validators {
        Validators::new()
    }
}

// ── Success ───────────────────────────────────────────────────────

#[tokio::test]
async fn structured_success_is_json() {
    let mut writer = Writer::new();
    let terminal = verdict::process(request(Method::POST, "/users", ""), &mut writer, |ctx: Context| async move {
        ctx.complete(Success::new(StatusCode::CREATED, json!({"id": 7})));
    })
    .await;

    assert_eq!(terminal, Terminal::Completed);
    assert_eq!(writer.status(), Some(StatusCode::CREATED));
    assert_eq!(writer.headers().unwrap()[CONTENT_TYPE], "application/json");
    assert_eq!(writer.bytes(), br#"{"id":7}"#);
}

#[tokio::test]
async fn empty_text_reads_no_content() {
    let logs = Logs::default();
    let _guard = logs.install();

    let mut writer = Writer::new();
    verdict::process(request(Method::GET, "/empty", ""), &mut writer, |ctx: Context| async move {
        ctx.complete(Success::new(StatusCode::OK, ""));
    })
    .await;

    assert_eq!(writer.status(), Some(StatusCode::OK));
    assert_eq!(writer.headers().unwrap()[CONTENT_TYPE], "text/plain");
    assert_eq!(writer.bytes(), b"No Content");
    assert!(logs.text().contains("no content in response"));
}

// ── Engine faults ─────────────────────────────────────────────────

#[tokio::test]
async fn missing_success_is_a_fault() {
    let logs = Logs::default();
    let _guard = logs.install();

    let mut writer = Writer::new();
    let terminal = verdict::process(request(Method::GET, "/nil", ""), &mut writer, |ctx: Context| async move {
        ctx.complete(None);
    })
    .await;

    assert_eq!(terminal, Terminal::Faulted);
    assert_eq!(writer.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert_eq!(writer.bytes(), b"Internal Server Error");

    let logs = logs.text();
    assert!(logs.contains("ERROR"));
    assert!(logs.contains("complete called without a response"));
}

#[tokio::test]
async fn missing_redirect_is_a_fault() {
    let logs = Logs::default();
    let _guard = logs.install();

    let mut writer = Writer::new();
    let terminal = verdict::process(request(Method::GET, "/nil", ""), &mut writer, |ctx: Context| async move {
        ctx.redirect(None);
    })
    .await;

    assert_eq!(terminal, Terminal::Faulted);
    assert_eq!(writer.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert!(logs.text().contains("redirect called without a target"));
}

#[tokio::test]
async fn handler_without_outcome_is_a_fault() {
    let mut writer = Writer::new();
    let terminal = verdict::process(request(Method::GET, "/silent", ""), &mut writer, |_ctx: Context| async {}).await;

    assert_eq!(terminal, Terminal::Faulted);
    assert_eq!(writer.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
}

#[tokio::test]
async fn panicking_handler_is_a_fault() {
    let mut writer = Writer::new();
    let terminal = verdict::process(request(Method::GET, "/panic", ""), &mut writer, |ctx: Context| async move {
        if !ctx.is_cancelled() {
            panic!("handler blew up");
        }
    })
    .await;

    assert_eq!(terminal, Terminal::Faulted);
    assert_eq!(writer.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
}

// ── Emission ──────────────────────────────────────────────────────

#[tokio::test]
async fn only_the_first_outcome_is_written() {
    let logs = Logs::default();
    let _guard = logs.install();

    let (results, observed) = tokio::sync::oneshot::channel();

    let mut writer = Writer::new();
    let terminal = verdict::process(request(Method::GET, "/twice", ""), &mut writer, |ctx: Context| async move {
        let first = ctx.complete(Success::new(StatusCode::OK, "first"));
        let second = ctx.error(Exception::new(StatusCode::CONFLICT));
        let _ = results.send((first, second));
    })
    .await;

    assert_eq!(terminal, Terminal::Completed);
    assert_eq!(writer.status(), Some(StatusCode::OK));
    assert_eq!(writer.bytes(), b"first");
    assert_eq!(observed.await.unwrap(), (true, false));
    assert!(logs.text().contains("duplicate outcome ignored"));
}

// ── Cancellation ──────────────────────────────────────────────────

#[tokio::test]
async fn cancellation_beats_a_slow_handler() {
    let token = CancellationToken::new();
    let req = request(Method::GET, "/slow", "").with_token(token.clone());

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(5)).await;
        token.cancel();
    });

    let mut writer = Writer::new();
    let terminal = verdict::process(req, &mut writer, |ctx: Context| async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        ctx.complete(Success::new(StatusCode::OK, "too late"));
    })
    .await;

    assert_eq!(terminal, Terminal::Cancelled);
    assert!(!writer.is_committed());
    assert!(writer.bytes().is_empty());
}

#[tokio::test]
async fn cancellation_wins_over_every_ready_outcome() {
    type Emit = fn(&Context) -> bool;
    let emitters: [Emit; 4] = [
        |ctx| ctx.complete(Success::new(StatusCode::OK, "ok")),
        |ctx| ctx.redirect(Redirect::found("/elsewhere")),
        |ctx| ctx.error(Exception::new(StatusCode::BAD_GATEWAY)),
        |ctx| ctx.complete(None),
    ];

    for emit in emitters {
        let token = CancellationToken::new();
        token.cancel();

        let mut writer = Writer::new();
        let req = request(Method::GET, "/gone", "").with_token(token);
        let terminal = verdict::process(req, &mut writer, move |ctx: Context| async move {
            emit(&ctx);
        })
        .await;

        assert_eq!(terminal, Terminal::Cancelled);
        assert!(!terminal.wrote());
        assert!(!writer.is_committed());
    }
}

#[tokio::test]
async fn handler_observes_cancellation() {
    let token = CancellationToken::new();
    let req = request(Method::GET, "/slow", "").with_token(token.clone());
    let (stopped, observed) = tokio::sync::oneshot::channel();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(5)).await;
        token.cancel();
    });

    let mut writer = Writer::new();
    verdict::process(req, &mut writer, |ctx: Context| async move {
        tokio::select! {
            () = ctx.cancelled() => {
                let _ = stopped.send(ctx.is_cancelled());
            }
            () = tokio::time::sleep(Duration::from_secs(5)) => {
                ctx.complete(Success::new(StatusCode::OK, "done"));
            }
        }
    })
    .await;

    assert!(observed.await.unwrap());
}

// ── Validation ────────────────────────────────────────────────────

#[tokio::test]
async fn field_violations_are_400() {
    let called = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&called);

    let mut writer = Writer::new();
    let terminal = verdict::validate::<NewUser, _, _>(
        request(Method::POST, "/users", r#"{"name": ""}"#),
        &mut writer,
        move |_ctx| async move {
            flag.store(true, Ordering::SeqCst);
        },
    )
    .await;

    assert_eq!(terminal, Terminal::Rejected);
    assert!(!called.load(Ordering::SeqCst));
    assert_eq!(writer.status(), Some(StatusCode::BAD_REQUEST));
    assert_eq!(writer.headers().unwrap()[CONTENT_TYPE], "application/json");
    assert_eq!(
        writer.bytes(),
        br#"{"name":{"value":"","valid":false,"message":"name is required"}}"#,
    );
}

#[tokio::test]
async fn malformed_body_is_422() {
    let logs = Logs::default();
    let _guard = logs.install();

    let mut writer = Writer::new();
    let terminal = verdict::validate::<NewUser, _, _>(
        request(Method::POST, "/users", "{not json"),
        &mut writer,
        |_ctx| async {},
    )
    .await;

    assert_eq!(terminal, Terminal::Rejected);
    assert_eq!(writer.status(), Some(StatusCode::UNPROCESSABLE_ENTITY));
    assert_eq!(writer.headers().unwrap()[CONTENT_TYPE], "text/plain; charset=utf-8");
    assert_eq!(writer.bytes(), b"(422) Unprocessable Entity: Valid JSON Required as Input");
    assert!(logs.text().contains("invalid request"));
}

#[tokio::test]
async fn misconfigured_validator_is_503() {
    let called = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&called);

    let mut writer = Writer::new();
    let terminal = verdict::validate::<Misconfigured, _, _>(
        request(Method::POST, "/broken", "{}"),
        &mut writer,
        move |_ctx| async move {
            flag.store(true, Ordering::SeqCst);
        },
    )
    .await;

    assert_eq!(terminal, Terminal::Rejected);
    assert!(!called.load(Ordering::SeqCst));
    assert_eq!(writer.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
    assert_eq!(writer.bytes(), b"(503) Service Unavailable");
}

#[tokio::test]
async fn schema_violation_without_field_report_is_400() {
    #[derive(Debug, Deserialize)]
    struct Contact {
        #[serde(default)]
        email: String,
    }

    impl Shape for Contact {
        fn schema() -> Value {
            json!({
                "type": "object",
                "properties": { "email": { "type": "string", "pattern": "^[^@]+@[^@]+$" } },
                "required": ["email"]
            })
        }

        fn help(&self) -> Validators {
            let mut fields = Validators::new();
            fields.insert("email".into(), Validator::valid(self.email.as_str()));
            fields
        }
    }

    let mut writer = Writer::new();
    let terminal = verdict::validate::<Contact, _, _>(
        request(Method::POST, "/contacts", r#"{"email": "nope"}"#),
        &mut writer,
        |_ctx| async {},
    )
    .await;

    assert_eq!(terminal, Terminal::Rejected);
    assert_eq!(writer.status(), Some(StatusCode::BAD_REQUEST));
    let body: Value = serde_json::from_slice(writer.bytes()).unwrap();
    assert_eq!(body["email"]["value"], "nope");
    assert_eq!(body["email"]["valid"], false);
}

#[tokio::test]
async fn valid_input_reaches_the_handler() {
    let mut writer = Writer::new();
    let terminal = verdict::validate::<NewUser, _, _>(
        request(Method::POST, "/users", r#"{"name": "ada"}"#),
        &mut writer,
        |ctx: Context<NewUser>| async move {
            let name = ctx.input().map(|user| user.name.clone()).unwrap_or_default();
            ctx.complete(Success::new(StatusCode::CREATED, json!({ "name": name })));
        },
    )
    .await;

    assert_eq!(terminal, Terminal::Completed);
    assert_eq!(writer.bytes(), br#"{"name":"ada"}"#);
}

#[tokio::test]
async fn input_without_validation_is_null() {
    let (result, observed) = tokio::sync::oneshot::channel();

    let mut writer = Writer::new();
    verdict::process(request(Method::GET, "/", ""), &mut writer, |ctx: Context| async move {
        let _ = result.send(matches!(ctx.input(), Err(Error::Null)));
        ctx.complete(Success::new(StatusCode::OK, "ok"));
    })
    .await;

    assert!(observed.await.unwrap());
}

// ── Exception and redirect ────────────────────────────────────────

#[tokio::test]
async fn exception_sends_status_and_public_message() {
    let logs = Logs::default();
    let _guard = logs.install();

    let mut writer = Writer::new();
    let terminal = verdict::process(request(Method::GET, "/users/9", ""), &mut writer, |ctx: Context| async move {
        ctx.error(
            Exception::new(StatusCode::NOT_FOUND)
                .message("user not found")
                .log("select returned no rows")
                .with_metadata("id", 9),
        );
    })
    .await;

    assert_eq!(terminal, Terminal::Failed);
    assert_eq!(writer.status(), Some(StatusCode::NOT_FOUND));
    assert_eq!(writer.bytes(), b"(404) user not found");

    let logs = logs.text();
    assert!(logs.contains("error while processing request"));
    assert!(logs.contains("N/A"));
    assert!(logs.contains("select returned no rows"));
    assert!(!String::from_utf8_lossy(writer.bytes()).contains("select returned no rows"));
}

#[tokio::test]
async fn redirect_sets_location() {
    let mut writer = Writer::new();
    let terminal = verdict::process(request(Method::GET, "/old", ""), &mut writer, |ctx: Context| async move {
        ctx.redirect(Redirect::found("/new"));
    })
    .await;

    assert_eq!(terminal, Terminal::Redirected);
    assert_eq!(writer.status(), Some(StatusCode::FOUND));
    assert_eq!(writer.headers().unwrap()[LOCATION], "/new");
    assert_eq!(writer.bytes(), b"<a href=\"/new\">Found</a>.\n");
}

// ── Pending headers ───────────────────────────────────────────────

#[tokio::test]
async fn handler_headers_are_merged_under_renderer_headers() {
    let mut writer = Writer::new();
    verdict::process(request(Method::GET, "/", ""), &mut writer, |ctx: Context| async move {
        {
            let mut headers = ctx.headers();
            headers.insert("x-request-id", HeaderValue::from_static("r-1"));
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/html"));
        }
        ctx.complete(Success::new(StatusCode::OK, json!({"ok": true})));
    })
    .await;

    let headers = writer.headers().unwrap();
    assert_eq!(headers["x-request-id"], "r-1");
    assert_eq!(headers[CONTENT_TYPE], "application/json");
}

#[tokio::test]
async fn unrenderable_redirect_keeps_handler_headers() {
    let logs = Logs::default();
    let _guard = logs.install();

    let mut writer = Writer::new();
    let terminal = verdict::process(request(Method::GET, "/old", ""), &mut writer, |ctx: Context| async move {
        ctx.headers().insert("x-request-id", HeaderValue::from_static("r-2"));
        ctx.redirect(Redirect::found("/line\nbreak"));
    })
    .await;

    assert_eq!(terminal, Terminal::Faulted);
    assert_eq!(writer.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert_eq!(writer.headers().unwrap()["x-request-id"], "r-2");
    assert!(!writer.headers().unwrap().contains_key(LOCATION));
    assert!(logs.text().contains("unable to render redirect"));
}
