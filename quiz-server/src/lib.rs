use std::convert::Infallible;
use std::sync::Arc;

use quiz_core::{Caller, is_known_channel};
use quiz_persistence::SessionError;
use quiz_types::{
    CreateSessionRequest, ErrorBody, JoinSessionRequest, ParticipantRequest,
    SubmitResponseRequest,
};
use serde::Serialize;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::auth::{AuthError, AuthService};
use crate::broadcast::BroadcastHub;
use crate::session_service::SessionService;

pub mod auth;
pub mod broadcast;
pub mod config;
pub mod scheduler;
pub mod session_service;
pub mod websocket;

const MAX_BODY_BYTES: u64 = 16 * 1024;

pub fn create_routes(
    session_service: Arc<SessionService>,
    auth_service: Arc<AuthService>,
    hub: Arc<BroadcastHub>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let service_filter = warp::any().map({
        let session_service = session_service.clone();
        move || session_service.clone()
    });

    let auth_filter = warp::any().map({
        let auth_service = auth_service.clone();
        move || auth_service.clone()
    });

    let hub_filter = warp::any().map({
        let hub = hub.clone();
        move || hub.clone()
    });

    // Authorization and guest token headers, resolved per handler
    let identity = warp::header::optional::<String>("authorization")
        .and(warp::header::optional::<String>("x-guest-token"))
        .and(auth_filter.clone());

    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", StatusCode::OK));

    let create_session = warp::path!("sessions")
        .and(warp::post())
        .and(json_body::<CreateSessionRequest>())
        .and(identity.clone())
        .and(service_filter.clone())
        .and_then(handle_create_request);

    let join_session = warp::path!("sessions" / "join")
        .and(warp::post())
        .and(json_body::<JoinSessionRequest>())
        .and(identity.clone())
        .and(service_filter.clone())
        .and_then(handle_join_request);

    let session_snapshot = warp::path!("sessions" / i32)
        .and(warp::get())
        .and(service_filter.clone())
        .and_then(handle_snapshot_request);

    let current_question = warp::path!("sessions" / i32 / "question")
        .and(warp::get())
        .and(service_filter.clone())
        .and_then(handle_question_request);

    let leaderboard = warp::path!("sessions" / i32 / "leaderboard")
        .and(warp::get())
        .and(service_filter.clone())
        .and_then(handle_leaderboard_request);

    let start_session = warp::path!("sessions" / i32 / "start")
        .and(warp::post())
        .and(identity.clone())
        .and(service_filter.clone())
        .and_then(handle_start_request);

    let cancel_session = warp::path!("sessions" / i32 / "cancel")
        .and(warp::post())
        .and(identity.clone())
        .and(service_filter.clone())
        .and_then(handle_cancel_request);

    let kick_participant = warp::path!("sessions" / i32 / "kick")
        .and(warp::post())
        .and(json_body::<ParticipantRequest>())
        .and(identity.clone())
        .and(service_filter.clone())
        .and_then(handle_kick_request);

    let leave_session = warp::path!("sessions" / i32 / "leave")
        .and(warp::post())
        .and(json_body::<ParticipantRequest>())
        .and(identity.clone())
        .and(service_filter.clone())
        .and_then(handle_leave_request);

    let submit_response = warp::path!("sessions" / i32 / "responses")
        .and(warp::post())
        .and(json_body::<SubmitResponseRequest>())
        .and(identity.clone())
        .and(service_filter.clone())
        .and_then(handle_submit_request);

    // Channel subscriptions; only session channel names are accepted
    let channels = warp::path!("channels" / String)
        .and(warp::get())
        .and_then(|channel: String| async move {
            if is_known_channel(&channel) {
                Ok(channel)
            } else {
                Err(warp::reject::not_found())
            }
        })
        .and(warp::ws())
        .and(hub_filter.clone())
        .map(|channel: String, ws: warp::ws::Ws, hub: Arc<BroadcastHub>| {
            ws.on_upgrade(move |socket| websocket::handle_subscription(socket, channel, hub))
        });

    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type", "authorization", "x-guest-token"])
        .allow_methods(vec!["GET", "POST"]);

    health
        .or(create_session)
        .or(join_session)
        .or(session_snapshot)
        .or(current_question)
        .or(leaderboard)
        .or(start_session)
        .or(cancel_session)
        .or(kick_participant)
        .or(leave_session)
        .or(submit_response)
        .or(channels)
        .recover(handle_rejection)
        .with(cors)
        .with(warp::log("live_quiz"))
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = warp::Rejection> + Clone
where
    T: serde::de::DeserializeOwned + Send,
{
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

fn error_body(message: impl Into<String>, status: StatusCode) -> Response {
    warp::reply::with_status(
        warp::reply::json(&ErrorBody {
            error: message.into(),
            reason: None,
        }),
        status,
    )
    .into_response()
}

fn session_error_reply(err: &SessionError) -> Response {
    let status = match err {
        SessionError::Unauthorized(_) => StatusCode::FORBIDDEN,
        SessionError::NotFound(_) => StatusCode::NOT_FOUND,
        SessionError::Conflict(_) | SessionError::InvalidState(_) => StatusCode::CONFLICT,
        SessionError::Domain(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SessionError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        SessionError::Database(e) => {
            tracing::error!("Storage failure: {}", e);
            return error_body("internal error", StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    warp::reply::with_status(
        warp::reply::json(&ErrorBody {
            error: err.to_string(),
            reason: err.reason(),
        }),
        status,
    )
    .into_response()
}

fn respond<T: Serialize>(result: Result<T, SessionError>, success: StatusCode) -> Response {
    match result {
        Ok(body) => warp::reply::with_status(warp::reply::json(&body), success).into_response(),
        Err(err) => session_error_reply(&err),
    }
}

fn resolve_caller(
    auth_service: &AuthService,
    authorization: Option<String>,
    guest_token: Option<String>,
) -> Result<Caller, Response> {
    auth_service
        .caller_from_headers(authorization.as_deref(), guest_token.as_deref())
        .map_err(|e: AuthError| {
            tracing::debug!("Rejected credentials: {}", e);
            error_body(e.to_string(), StatusCode::UNAUTHORIZED)
        })
}

async fn handle_create_request(
    request: CreateSessionRequest,
    authorization: Option<String>,
    guest_token: Option<String>,
    auth_service: Arc<AuthService>,
    session_service: Arc<SessionService>,
) -> Result<Response, Rejection> {
    let caller = match resolve_caller(&auth_service, authorization, guest_token) {
        Ok(caller) => caller,
        Err(reply) => return Ok(reply),
    };
    Ok(respond(
        session_service.create_session(&caller, &request).await,
        StatusCode::CREATED,
    ))
}

async fn handle_join_request(
    request: JoinSessionRequest,
    authorization: Option<String>,
    guest_token: Option<String>,
    auth_service: Arc<AuthService>,
    session_service: Arc<SessionService>,
) -> Result<Response, Rejection> {
    let caller = match resolve_caller(&auth_service, authorization, guest_token) {
        Ok(caller) => caller,
        Err(reply) => return Ok(reply),
    };
    Ok(respond(
        session_service.join_session(&request, &caller).await,
        StatusCode::OK,
    ))
}

async fn handle_snapshot_request(
    session_id: i32,
    session_service: Arc<SessionService>,
) -> Result<Response, Rejection> {
    Ok(respond(session_service.snapshot(session_id).await, StatusCode::OK))
}

async fn handle_question_request(
    session_id: i32,
    session_service: Arc<SessionService>,
) -> Result<Response, Rejection> {
    Ok(respond(
        session_service.current_question(session_id).await,
        StatusCode::OK,
    ))
}

async fn handle_leaderboard_request(
    session_id: i32,
    session_service: Arc<SessionService>,
) -> Result<Response, Rejection> {
    Ok(respond(
        session_service.leaderboard(session_id).await,
        StatusCode::OK,
    ))
}

async fn handle_start_request(
    session_id: i32,
    authorization: Option<String>,
    guest_token: Option<String>,
    auth_service: Arc<AuthService>,
    session_service: Arc<SessionService>,
) -> Result<Response, Rejection> {
    let caller = match resolve_caller(&auth_service, authorization, guest_token) {
        Ok(caller) => caller,
        Err(reply) => return Ok(reply),
    };
    Ok(respond(
        session_service.start_session(session_id, &caller).await,
        StatusCode::OK,
    ))
}

async fn handle_cancel_request(
    session_id: i32,
    authorization: Option<String>,
    guest_token: Option<String>,
    auth_service: Arc<AuthService>,
    session_service: Arc<SessionService>,
) -> Result<Response, Rejection> {
    let caller = match resolve_caller(&auth_service, authorization, guest_token) {
        Ok(caller) => caller,
        Err(reply) => return Ok(reply),
    };
    Ok(respond(
        session_service.cancel_session(session_id, &caller).await,
        StatusCode::OK,
    ))
}

async fn handle_kick_request(
    session_id: i32,
    request: ParticipantRequest,
    authorization: Option<String>,
    guest_token: Option<String>,
    auth_service: Arc<AuthService>,
    session_service: Arc<SessionService>,
) -> Result<Response, Rejection> {
    let caller = match resolve_caller(&auth_service, authorization, guest_token) {
        Ok(caller) => caller,
        Err(reply) => return Ok(reply),
    };
    Ok(respond(
        session_service
            .kick_participant(session_id, request.participant_id, &caller)
            .await,
        StatusCode::OK,
    ))
}

async fn handle_leave_request(
    session_id: i32,
    request: ParticipantRequest,
    authorization: Option<String>,
    guest_token: Option<String>,
    auth_service: Arc<AuthService>,
    session_service: Arc<SessionService>,
) -> Result<Response, Rejection> {
    let caller = match resolve_caller(&auth_service, authorization, guest_token) {
        Ok(caller) => caller,
        Err(reply) => return Ok(reply),
    };
    Ok(respond(
        session_service
            .leave_session(session_id, request.participant_id, &caller)
            .await,
        StatusCode::OK,
    ))
}

async fn handle_submit_request(
    session_id: i32,
    request: SubmitResponseRequest,
    authorization: Option<String>,
    guest_token: Option<String>,
    auth_service: Arc<AuthService>,
    session_service: Arc<SessionService>,
) -> Result<Response, Rejection> {
    let caller = match resolve_caller(&auth_service, authorization, guest_token) {
        Ok(caller) => caller,
        Err(reply) => return Ok(reply),
    };
    Ok(respond(
        session_service
            .submit_response(session_id, &request, &caller)
            .await,
        StatusCode::CREATED,
    ))
}

async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    if err.is_not_found() {
        return Ok(error_body("not found", StatusCode::NOT_FOUND));
    }
    if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        return Ok(error_body(
            format!("invalid request body: {}", e),
            StatusCode::BAD_REQUEST,
        ));
    }
    if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        return Ok(error_body("request body too large", StatusCode::PAYLOAD_TOO_LARGE));
    }
    if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        return Ok(error_body("method not allowed", StatusCode::METHOD_NOT_ALLOWED));
    }

    tracing::warn!("Unhandled rejection: {:?}", err);
    Ok(error_body("bad request", StatusCode::BAD_REQUEST))
}
