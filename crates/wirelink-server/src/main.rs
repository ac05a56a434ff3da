//! The Wirelink relay server.
//!
//! Pairs one console and one remote agent per session code and relays
//! command/result payloads between them. Serves a small bootstrap console
//! page at `/`, the WebSocket endpoint at `/ws`, and a loopback-only
//! counter surface at `/status`.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context as _;
use axum::{
    Router,
    extract::{
        ConnectInfo, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wirelink_relay::{ConnectionCtx, DEFAULT_SESSION_LIMIT, RelayRouter, SessionRegistry};

/// Server configuration, read from the environment.
struct Config {
    addr: SocketAddr,
    session_limit: usize,
}

impl Config {
    fn from_env() -> anyhow::Result<Self> {
        let addr = std::env::var("WIRELINK_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_owned())
            .parse()
            .context("invalid WIRELINK_ADDR")?;
        let session_limit = match std::env::var("WIRELINK_SESSION_LIMIT") {
            Ok(raw) => raw.parse().context("invalid WIRELINK_SESSION_LIMIT")?,
            Err(_) => DEFAULT_SESSION_LIMIT,
        };
        Ok(Self {
            addr,
            session_limit,
        })
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    router: Arc<RelayRouter>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::from_env()?;
    let registry = Arc::new(SessionRegistry::with_limit(config.session_limit));
    let state = AppState {
        router: Arc::new(RelayRouter::new(registry)),
    };

    let app = Router::new()
        .route("/", get(index_handler))
        .route("/status", get(status_handler))
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("Wirelink relay listening on http://{}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Plain-text session counters, restricted to loopback callers.
async fn status_handler(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> Response {
    if !addr.ip().is_loopback() {
        return (StatusCode::FORBIDDEN, "Forbidden\n").into_response();
    }
    let counts = state.router.registry().counts();
    format!(
        "Total sessions: {}\nActive sessions: {}\n",
        counts.total, counts.active
    )
    .into_response()
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // The connection's opaque send capability: whatever the router or a
    // session peer pushes here goes out as one text frame.
    let (tx, mut rx) = mpsc::unbounded_channel::<serde_json::Value>();

    let send_task = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            let json = match serde_json::to_string(&payload) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!("failed to serialize outbound payload: {e}");
                    continue;
                }
            };
            if ws_sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let mut conn = ConnectionCtx::new(tx);

    while let Some(msg) = ws_receiver.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(data)) => match String::from_utf8(data.to_vec()) {
                Ok(s) => s.into(),
                Err(_) => continue,
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!("WebSocket error: {e}");
                break;
            }
        };

        let payload: serde_json::Value = match serde_json::from_str(&text) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("discarding unparseable frame: {e}");
                continue;
            }
        };

        state.router.handle_message(&mut conn, payload);
    }

    // Any exit path counts as a disconnect and drives the normal
    // termination transition.
    state.router.handle_disconnect(&mut conn);
    send_task.abort();
}

const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html>
<head>
    <title>Wirelink Console</title>
    <style>
        body { margin: 0; padding: 20px; background: #1e1e1e; color: #d4d4d4;
               font-family: Menlo, Monaco, monospace; font-size: 13px; }
        h1 { color: #fff; font-size: 16px; }
        #console p { margin: 4px 0; }
        .prompt::before { content: '> '; color: #4a4; }
        .output { color: #aaa; }
        .error { color: #a44; }
        .notice { color: #888; }
        a { color: #6af; }
        input { background: none; border: none; color: inherit; font: inherit;
                outline: none; width: 70%; }
    </style>
</head>
<body>
    <h1>Wirelink Console</h1>
    <div id="console"></div>

    <script>
        const log = document.getElementById('console');
        const prompts = [];
        let connected = false;
        let ws;

        function line(cls, html) {
            const p = document.createElement('p');
            p.className = cls;
            p.innerHTML = html;
            log.appendChild(p);
            return p;
        }

        function promptFor(onEnter, label) {
            const p = line('prompt', label || '');
            const input = document.createElement('input');
            p.appendChild(input);
            input.focus();
            input.onkeydown = (e) => {
                if (e.key === 'Enter' && input.value) {
                    input.disabled = true;
                    onEnter(input.value);
                }
            };
        }

        function sessionPrompt() {
            promptFor((value) => {
                prompts.push({ command: value });
                ws.send(JSON.stringify({ connectConsole: parseInt(value, 10),
                                         id: prompts.length - 1 }));
            }, 'Session Id? ');
        }

        function commandPrompt() {
            promptFor((value) => {
                prompts.push({ command: value });
                ws.send(JSON.stringify({ id: prompts.length - 1, command: value }));
                commandPrompt();
            });
        }

        function expand(id, name) {
            const command = prompts[id].command + '["' + name + '"]';
            prompts.push({ command });
            ws.send(JSON.stringify({ id: prompts.length - 1, command }));
        }

        function format(value, id, name) {
            if (value === null) return 'null';
            if (typeof value !== 'object') return JSON.stringify(value);
            if ('__wirelink' in value) {
                switch (value.__wirelink) {
                    case 0: return '<a href="#" data-id="' + id + '" data-name="'
                                   + name + '">' + value.name + '</a>';
                    case 1: return value.name;
                    case 2: return 'undefined';
                    case 3: return '<span class="error">Error thrown on remote: '
                                   + value.message + '</span>';
                    case 4: return '"' + value.intro + '..." <a href="#" data-id="' + id
                                   + '" data-name="' + name + '">View all</a>';
                }
            }
            const items = [];
            for (const key in value) {
                const prefix = Array.isArray(value) ? '' : key + ': ';
                items.push(prefix + format(value[key], id, key));
            }
            return (Array.isArray(value) ? '[' : '{') + items.join(', ')
                   + (Array.isArray(value) ? ']' : '}');
        }

        log.onclick = (e) => {
            if (e.target.tagName === 'A' && e.target.dataset.name !== undefined) {
                e.preventDefault();
                expand(parseInt(e.target.dataset.id, 10), e.target.dataset.name);
            }
        };

        ws = new WebSocket('ws://' + window.location.host + '/ws');
        ws.onopen = sessionPrompt;
        ws.onmessage = (event) => {
            const msg = JSON.parse(event.data);
            if (msg.response !== undefined) {
                line('output', format(msg.response, msg.id, null));
            } else if (msg.message) {
                line('notice', 'Wirelink: ' + msg.message);
            }
            if (msg.connectError) {
                sessionPrompt();
            } else if (!connected) {
                connected = true;
                commandPrompt();
            }
        };
        ws.onclose = () => line('error', 'Connection closed.');
    </script>
</body>
</html>
"##;
