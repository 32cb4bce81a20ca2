//! Minimal restive example: one resource, a few routes, polite explanations.
//!
//! No transport here: requests are built by hand and fed to the engine, the
//! way a server loop would after reading the socket.
//!
//! Run with:
//!   cargo run --example basic

use http::StatusCode;
use restive::{
    ArgKind, CatchMode, Call, Engine, EngineConfig, ExplainCall, FailureKind, Reply, Request, Signature, Verb,
    VerbKind,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let config = EngineConfig::from_toml_str(
        r#"
        home-resource = "items"
        catch-plain = "catch-with-trace"
        catch-http = "catch-plain"
        "#,
    )?;
    let mut engine = Engine::with_config(config)?;

    engine
        .resource("items", Signature::new().optional("id", "all").keyword("color"))?
        .route("items", Verb::Get, "application/json", &[ArgKind::Integer], get_item_json)?
        .route("items", Verb::Get, "text/*", &[], get_item_text)?
        .route("items", Verb::Post, "application/json", &[], create_item)?
        .route("items", VerbKind::Only(Verb::Delete), "*/*", &[ArgKind::Integer], |_: &Call<'_>| ())?
        .explain(Some(FailureKind::NoSuchResource), None, "text/plain", |call: &ExplainCall<'_>| {
            format!("There is nothing at /{}. Try /items.\n", call.resource().unwrap_or_default())
        })?;

    let requests = [
        Request::get("/items/42?color=red").accept("application/json"),
        Request::get("/items/42.html"),
        Request::get("/"),
        Request::get("/items/abc").accept("application/json"),
        Request::new("POST", "/items").content_type("application/json").body(r#"{"name":"lamp"}"#),
        Request::new("POST", "/items").content_type("text/plain").body("lamp"),
        Request::new("DELETE", "/items/42"),
        Request::get("/widgets"),
        Request::get("/items/7").accept("image/png"),
    ];

    for request in &requests {
        let response = engine.respond(request);
        println!("{} {}", request.method(), request.uri());
        println!("  -> {} {}", response.status(), response.content_type());
        for line in response.text().lines() {
            println!("     {line}");
        }
    }
    Ok(())
}

// GET /items/:id with an integer id, as JSON.
fn get_item_json(call: &Call<'_>) -> Reply {
    let id = call.arg(0).and_then(|v| v.as_i64()).unwrap_or_default();
    let color = call.keyword("color").map(ToString::to_string).unwrap_or_else(|| "plain".to_owned());
    Reply::new(format!(r#"{{"id":{id},"color":"{color}"}}"#))
}

// GET /items/:id as any text type. Declares nothing, so the negotiated leaf
// (text/plain or text/html) becomes the response type.
fn get_item_text(call: &Call<'_>) -> String {
    match call.content_type() {
        "text/html" => format!("<p>item {}</p>", call.arg(0).map(ToString::to_string).unwrap_or_default()),
        _ => format!("item {}", call.arg(0).map(ToString::to_string).unwrap_or_default()),
    }
}

// POST /items with a JSON payload.
fn create_item(call: &Call<'_>) -> Result<Reply, restive::Failure> {
    let input: serde_json::Value = serde_json::from_slice(call.payload())
        .map_err(|e| restive::Failure::http(StatusCode::BAD_REQUEST, e.to_string()))?;
    let name = input["name"].as_str().unwrap_or("unnamed");
    Ok(Reply::json(format!(r#"{{"id":99,"name":"{name}"}}"#)).status(StatusCode::CREATED))
}
