use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use jobrelay_types::{ExecutionResult, Job, JobRecord, JobRelayError, NamedPromptProfile};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/status", get(status))
        .route("/api/v1/jobs", post(create_job).get(list_jobs))
        .route("/api/v1/jobs/{job_id}", get(get_job))
        .route("/api/v1/jobs/{job_id}/execute", post(execute_job))
        .route("/api/v1/prompts", post(create_prompt).get(list_prompts))
        .route("/api/v1/prompts/{prompt_id}", get(get_prompt))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn error_response(err: JobRelayError) -> (StatusCode, String) {
    let status = match &err {
        JobRelayError::JobNotFound(_) | JobRelayError::PromptProfileNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        JobRelayError::InvalidStatusTransition { .. } => StatusCode::CONFLICT,
        JobRelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

async fn health() -> &'static str {
    "ok"
}

#[derive(serde::Serialize)]
struct StatusResponse {
    executor: String,
    configured: bool,
    jobs: usize,
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        executor: state.executor.name().to_string(),
        configured: state.executor.is_configured(),
        jobs: state.jobs.len(),
    })
}

#[derive(serde::Deserialize)]
struct CreateJobRequest {
    #[serde(rename = "type")]
    job_type: String,
    input_prompt: String,
    /// Either the serialized JSON text or an inline object.
    #[serde(default)]
    context_data: Option<serde_json::Value>,
    #[serde(default)]
    project: Option<String>,
}

async fn create_job(
    State(state): State<AppState>,
    Json(req): Json<CreateJobRequest>,
) -> Result<(StatusCode, Json<JobRecord>), (StatusCode, String)> {
    let mut job = Job::new(req.job_type, req.input_prompt);
    job.context_data = req.context_data.map(|v| match v {
        serde_json::Value::String(raw) => raw,
        other => other.to_string(),
    });
    job.validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let record = JobRecord::new(job).with_project(req.project);
    tracing::info!(job_id = %record.id(), job_type = %record.job.job_type, "job created");

    let record_clone = record.clone();
    state.jobs.insert(record.id(), record);
    state.persist().await;

    Ok((StatusCode::CREATED, Json(record_clone)))
}

async fn list_jobs(State(state): State<AppState>) -> Json<Vec<JobRecord>> {
    let mut jobs: Vec<JobRecord> = state.jobs.iter().map(|r| r.value().clone()).collect();
    jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Json(jobs)
}

async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobRecord>, (StatusCode, String)> {
    state.job(job_id).map(Json).map_err(error_response)
}

#[derive(serde::Deserialize)]
struct ExecuteRequest {
    #[serde(default)]
    prompt_profile_id: Option<Uuid>,
}

async fn execute_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(req): Json<ExecuteRequest>,
) -> Result<Json<JobRecord>, (StatusCode, String)> {
    let profile = req
        .prompt_profile_id
        .map(|id| state.prompt_profile(id))
        .transpose()
        .map_err(error_response)?;
    let job = state.start_job(job_id).map_err(error_response)?;
    state.persist().await;

    // Detached so a dropped connection cannot leave the job in `Running`.
    let task_state = state.clone();
    let task = tokio::spawn(async move {
        let result = task_state.executor.run(&job, profile.as_ref()).await;
        let finished = task_state.finish_job(job.id, result);
        task_state.persist().await;
        finished
    });

    let record = match task.await {
        Ok(finished) => finished,
        Err(e) => {
            tracing::error!(job_id = %job_id, "execution task failed: {e}");
            let error = format!("Execution task failed: {e}");
            let _ = state.finish_job(job_id, ExecutionResult::failure(error.clone()));
            state.persist().await;
            Err(JobRelayError::Internal(error))
        }
    }
    .map_err(error_response)?;

    tracing::info!(job_id = %job_id, status = ?record.status, "job finished");
    Ok(Json(record))
}

#[derive(serde::Deserialize)]
struct CreatePromptRequest {
    name: String,
    system_prompt: String,
}

async fn create_prompt(
    State(state): State<AppState>,
    Json(req): Json<CreatePromptRequest>,
) -> Result<(StatusCode, Json<NamedPromptProfile>), (StatusCode, String)> {
    if req.system_prompt.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "system_prompt must not be empty".to_string(),
        ));
    }
    let profile = NamedPromptProfile::new(req.name, req.system_prompt);
    let profile_clone = profile.clone();
    state.prompts.insert(profile.id, profile);
    state.persist().await;

    Ok((StatusCode::CREATED, Json(profile_clone)))
}

async fn list_prompts(State(state): State<AppState>) -> Json<Vec<NamedPromptProfile>> {
    let mut prompts: Vec<NamedPromptProfile> =
        state.prompts.iter().map(|r| r.value().clone()).collect();
    prompts.sort_by(|a, b| a.name.cmp(&b.name));
    Json(prompts)
}

async fn get_prompt(
    State(state): State<AppState>,
    Path(prompt_id): Path<Uuid>,
) -> Result<Json<NamedPromptProfile>, (StatusCode, String)> {
    state
        .prompts
        .get(&prompt_id)
        .map(|p| Json(p.clone()))
        .ok_or_else(|| error_response(JobRelayError::PromptProfileNotFound(prompt_id)))
}
