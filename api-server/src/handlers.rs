use actix_web::{
    http::{Method, StatusCode},
    web::{Data, Path},
    HttpRequest, HttpResponse, Responder,
};

use helicarrier_core::Avenger;

use crate::auth::request_token;
use crate::config::AppState;
use crate::response::json_error;
use crate::session::{execute_fire, execute_reset, FireAction, SessionFailure};

fn failure_response(failure: SessionFailure) -> HttpResponse {
    let status = StatusCode::from_u16(failure.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        tracing::error!("request failed: {}", failure.message);
    }
    json_error(status, failure.message)
}

/// Run a fire action under the token's lock; shared by all fire routes.
fn run_fire(req: &HttpRequest, state: &AppState, action: FireAction) -> HttpResponse {
    let Some(token) = request_token(req) else {
        return json_error(StatusCode::FORBIDDEN, "missing token");
    };

    let lock = state.locks.for_token(&token);
    let _guard = lock.lock().unwrap();
    match execute_fire(state.store.as_ref(), state.map_dir.as_deref(), &token, action) {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(failure) => failure_response(failure),
    }
}

pub(crate) async fn fire_status(req: HttpRequest, state: Data<AppState>) -> impl Responder {
    run_fire(&req, &state, FireAction::Status)
}

/// Route order is row/column; the engine works in (x = column, y = row).
pub(crate) async fn fire_at(
    req: HttpRequest,
    state: Data<AppState>,
    path: Path<(i32, i32)>,
) -> impl Responder {
    let (row, column) = path.into_inner();
    run_fire(
        &req,
        &state,
        FireAction::Shot {
            x: column,
            y: row,
            avenger: None,
        },
    )
}

pub(crate) async fn fire_avenger_at(
    req: HttpRequest,
    state: Data<AppState>,
    path: Path<(i32, i32, String)>,
) -> impl Responder {
    let (row, column, avenger) = path.into_inner();
    let Ok(avenger) = avenger.parse::<Avenger>() else {
        return json_error(
            StatusCode::BAD_REQUEST,
            format!("unknown avenger: {avenger}"),
        );
    };
    run_fire(
        &req,
        &state,
        FireAction::Shot {
            x: column,
            y: row,
            avenger: Some(avenger),
        },
    )
}

pub(crate) async fn reset(req: HttpRequest, state: Data<AppState>) -> impl Responder {
    let Some(token) = request_token(&req) else {
        return json_error(StatusCode::FORBIDDEN, "missing token");
    };
    let wipe = req
        .query_string()
        .split('&')
        .any(|pair| pair == "wipe" || pair.starts_with("wipe="));

    let lock = state.locks.for_token(&token);
    let _guard = lock.lock().unwrap();
    match execute_reset(state.store.as_ref(), &token, wipe) {
        Ok(deleted) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "deleted": deleted,
            "wiped": wipe,
        })),
        Err(failure) => failure_response(failure),
    }
}

/// Anything that missed the route table: wrong method is a bad request,
/// an unknown path is an invalid action.
pub(crate) async fn fallback(req: HttpRequest) -> impl Responder {
    if req.method() != Method::GET {
        json_error(StatusCode::BAD_REQUEST, "only GET is supported")
    } else {
        json_error(StatusCode::NOT_FOUND, "invalid action")
    }
}

pub(crate) fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    use actix_web::web;

    cfg.route("/fire", web::get().to(fire_status))
        .route("/fire/{row}/{column}", web::get().to(fire_at))
        .route(
            "/fire/{row}/{column}/avenger/{avenger}",
            web::get().to(fire_avenger_at),
        )
        .route("/reset", web::get().to(reset))
        .default_service(web::to(fallback));
}
