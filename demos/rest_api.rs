use emberapi::{
    auth, rest::RateLimit, Endpoint, Request, Response, RestDispatcher, Server, StatusCode,
};
use std::time::Duration;
use tokio::net::TcpListener;

fn json_body(request: &Request) -> Option<serde_json::Value> {
    serde_json::from_slice(request.body()?).ok()
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let builder = Server::builder()
        .listener(TcpListener::bind("127.0.0.1:8080").await.unwrap())
        .credentials("./demos-db")
        .await;
    let credentials = builder
        .credentials_handle()
        .expect("just opened above");

    let signup_store = credentials.clone();
    let login_store = credentials.clone();
    let rotate_store = credentials.clone();

    let dispatcher = RestDispatcher::new(credentials)
        .endpoint(Endpoint::new(
            emberapi::Method::Post,
            "/signup",
            auth::NONE,
            RateLimit::new(10, Duration::from_secs(60)),
            move |_username, request, response| {
                let store = signup_store.clone();
                async move {
                    let Some(body) = json_body(request) else {
                        return response.status(StatusCode::BadRequest).body("invalid JSON body");
                    };
                    let (Some(username), Some(password)) = (
                        body.get("username").and_then(|v| v.as_str()),
                        body.get("password").and_then(|v| v.as_str()),
                    ) else {
                        return response.status(StatusCode::BadRequest).body("missing username/password");
                    };

                    match store.create_user(username, password, serde_json::json!({})).await {
                        Ok(()) => response.status(StatusCode::Ok).body(r#"{"created":true}"#),
                        Err(err) => err.respond(response, true),
                    }
                }
            },
        ))
        .endpoint(Endpoint::new(
            emberapi::Method::Post,
            "/login",
            auth::NONE,
            RateLimit::new(20, Duration::from_secs(60)),
            move |_username, request, response| {
                let store = login_store.clone();
                async move {
                    let Some(body) = json_body(request) else {
                        return response.status(StatusCode::BadRequest).body("invalid JSON body");
                    };
                    let (Some(username), Some(password)) = (
                        body.get("username").and_then(|v| v.as_str()),
                        body.get("password").and_then(|v| v.as_str()),
                    ) else {
                        return response.status(StatusCode::BadRequest).body("missing username/password");
                    };

                    if let Err(err) = store.verify_user(username, password).await {
                        return err.respond(response, true);
                    }

                    match store.issue_default_access_token(username).await {
                        Ok(token) => response
                            .status(StatusCode::Ok)
                            .body(format!(r#"{{"access_token":"{token}"}}"#)),
                        Err(err) => err.respond(response, true),
                    }
                }
            },
        ))
        .endpoint(Endpoint::new(
            emberapi::Method::Get,
            "/me",
            auth::TOKEN,
            RateLimit::default(),
            |username, _request, response| async move {
                let username = username.unwrap_or("unknown");
                response
                    .status(StatusCode::Ok)
                    .body(format!(r#"{{"username":"{username}"}}"#))
            },
        ))
        .endpoint(Endpoint::new(
            emberapi::Method::Post,
            "/api-keys",
            auth::TOKEN,
            RateLimit::new(5, Duration::from_secs(60)),
            move |username, _request, response| {
                let store = rotate_store.clone();
                async move {
                    let Some(username) = username else {
                        return response.status(StatusCode::Unauthorized).body("");
                    };

                    match store.create_api_key(username).await {
                        Ok((key, secret)) => response
                            .status(StatusCode::Ok)
                            .body(format!(r#"{{"api_key":"{key}","api_secret":"{secret}"}}"#)),
                        Err(err) => err.respond(response, true),
                    }
                }
            },
        ));

    builder.handler(dispatcher).build().launch().await;
}
