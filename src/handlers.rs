use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::flow::{vote_url, FlowError, FlowState, SelectionFlow};
use crate::roster::{Record, Roster};

#[derive(Clone)]
pub struct AppState {
    pub roster: Arc<Roster>,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub name: Option<String>,
}

#[derive(Deserialize)]
pub struct SelectQuery {
    pub name: String,
    pub codigo: String,
}

#[derive(Serialize)]
pub struct Candidate {
    name: String,
    group: String,
    code: String,
}

impl From<&Record> for Candidate {
    fn from(record: &Record) -> Self {
        Self {
            name: record.name.clone(),
            group: record.group.clone(),
            code: record.code.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct SearchResponse {
    query: String,
    outcome: &'static str,
    total: usize,
    not_found: bool,
    candidates: Vec<Candidate>,
}

#[derive(Serialize)]
pub struct SelectResponse {
    name: String,
    group: String,
    code: String,
    vote_url: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(frontend))
        .route("/robots.txt", get(robots))
        .route("/healthz", get(healthz))
        .route("/v1/search", get(search))
        .route("/v1/select", get(select))
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    "ok"
}

async fn robots() -> impl IntoResponse {
    (
        axum::http::HeaderMap::from_iter([(
            axum::http::header::CONTENT_TYPE,
            axum::http::HeaderValue::from_static("text/plain; charset=utf-8"),
        )]),
        "User-agent: *\nDisallow: /",
    )
}

async fn frontend() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn search(
    State(state): State<AppState>,
    axum::extract::Query(params): axum::extract::Query<SearchQuery>,
) -> Json<SearchResponse> {
    let mut flow = SelectionFlow::new(&state.roster);
    flow.set_input(params.name.unwrap_or_default());
    let outcome = flow.search();

    let candidates = flow.matches().iter().map(Candidate::from).collect();
    Json(SearchResponse {
        query: flow.raw_input().to_string(),
        outcome: outcome_label(outcome),
        total: flow.matches().len(),
        not_found: flow.shows_not_found(),
        candidates,
    })
}

async fn select(
    State(state): State<AppState>,
    axum::extract::Query(params): axum::extract::Query<SelectQuery>,
) -> Result<Json<SelectResponse>, ApiError> {
    let mut flow = SelectionFlow::new(&state.roster);
    flow.set_input(params.name);
    flow.search();

    let record = flow
        .choose(&params.codigo)
        .map_err(|err| match err {
            FlowError::UnknownCandidate(_) | FlowError::NoCandidates => {
                ApiError::not_found(format!("no candidate with code {}", params.codigo))
            }
            FlowError::NotSingle => ApiError::bad_request(err.to_string()),
        })?
        .clone();

    Ok(Json(SelectResponse {
        vote_url: vote_url(&record.code),
        name: record.name,
        group: record.group,
        code: record.code,
    }))
}

fn outcome_label(state: FlowState) -> &'static str {
    match state {
        FlowState::Idle => "idle",
        FlowState::NoMatch => "no_match",
        FlowState::OneMatch => "one_match",
        FlowState::ManyMatches => "many_matches",
        FlowState::Resolved => "resolved",
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("internal server error")]
    Internal,
}

impl ApiError {
    fn bad_request<T: Into<String>>(msg: T) -> Self {
        ApiError::BadRequest(msg.into())
    }

    fn not_found<T: Into<String>>(msg: T) -> Self {
        ApiError::NotFound(msg.into())
    }
}

const INDEX_HTML: &str = r##"
<!doctype html>
<html lang="pt-BR">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Buscar seu código</title>
  <link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/css/bootstrap.min.css" rel="stylesheet">
  <style>
    body { background: #f8f9fa; }
    .lookup-card { max-width: 28rem; }
  </style>
</head>
<body class="py-4">
  <div class="container d-flex justify-content-center">
    <div class="card shadow-sm lookup-card w-100">
      <div class="card-header text-center">
        <h1 class="h5 mb-0">Buscar seu código</h1>
      </div>
      <div class="card-body">
        <div class="mb-3">
          <input id="nameInput" type="text" class="form-control form-control-lg"
                 placeholder="Digite seu nome completo" autocomplete="off">
        </div>
        <div class="d-grid mb-3">
          <button id="searchBtn" class="btn btn-primary btn-lg">Buscar</button>
        </div>
        <p id="notFound" class="text-center text-danger small d-none">
          Nome não encontrado. Verifique se digitou corretamente.
        </p>
        <div id="candidates" class="text-center d-none">
          <p id="candidatesHint" class="text-muted small"></p>
          <div id="candidateList" class="d-grid gap-2"></div>
        </div>
        <div id="resolved" class="text-center d-none">
          <p class="small fw-semibold"><span id="resolvedName"></span> - Seu link de votação:</p>
          <div class="d-grid">
            <a id="voteLink" href="#" target="_blank" rel="noopener noreferrer"
               class="btn btn-success btn-lg">Acessar meu link</a>
          </div>
        </div>
      </div>
    </div>
  </div>

  <script>
    const nameInput = document.getElementById('nameInput');
    const searchBtn = document.getElementById('searchBtn');
    const notFound = document.getElementById('notFound');
    const candidates = document.getElementById('candidates');
    const candidatesHint = document.getElementById('candidatesHint');
    const candidateList = document.getElementById('candidateList');
    const resolved = document.getElementById('resolved');
    const resolvedName = document.getElementById('resolvedName');
    const voteLink = document.getElementById('voteLink');

    function resetPanels() {
      notFound.classList.add('d-none');
      candidates.classList.add('d-none');
      resolved.classList.add('d-none');
      candidateList.innerHTML = '';
    }

    async function runSearch() {
      resetPanels();
      const name = nameInput.value;
      try {
        const resp = await fetch(`/v1/search?name=${encodeURIComponent(name)}`);
        if (!resp.ok) throw new Error(`Request failed (${resp.status})`);
        const data = await resp.json();
        if (data.not_found) {
          notFound.classList.remove('d-none');
          return;
        }
        if (data.total === 1) {
          candidatesHint.textContent = 'Encontrado:';
          renderCandidates(name, data.candidates);
        } else if (data.total > 1) {
          candidatesHint.textContent =
            'Há mais de uma pessoa com esse nome. Escolha seu nome completo:';
          renderCandidates(name, data.candidates);
        }
      } catch (err) {
        notFound.classList.remove('d-none');
      }
    }

    function renderCandidates(name, list) {
      candidates.classList.remove('d-none');
      list.forEach(candidate => {
        const btn = document.createElement('button');
        btn.type = 'button';
        btn.className = 'btn btn-outline-secondary';
        btn.textContent = candidate.name;
        btn.addEventListener('click', () => runSelect(name, candidate.code));
        candidateList.appendChild(btn);
      });
    }

    async function runSelect(name, code) {
      try {
        const url = `/v1/select?name=${encodeURIComponent(name)}&codigo=${encodeURIComponent(code)}`;
        const resp = await fetch(url);
        if (!resp.ok) throw new Error(`Request failed (${resp.status})`);
        const data = await resp.json();
        resetPanels();
        resolvedName.textContent = data.name;
        voteLink.href = data.vote_url;
        resolved.classList.remove('d-none');
      } catch (err) {
        notFound.classList.remove('d-none');
      }
    }

    searchBtn.addEventListener('click', runSearch);
    nameInput.addEventListener('keydown', (e) => {
      if (e.key === 'Enter') {
        e.preventDefault();
        runSearch();
      }
    });
  </script>
</body>
</html>
"#;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}
