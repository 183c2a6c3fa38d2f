use std::time::Duration;

use axum::Router;
use axum::error_handling::HandleErrorLayer;
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tower::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::net::error;
use crate::net::layer;
use crate::state::ArcShared;

mod handle;

async fn handle_error(error: tower::BoxError) -> error::Error {
    error::Error::new().source(error)
}

pub fn routes(state: &ArcShared) -> Router {
    Router::new()
        .route(
            "/",
            get(handle::get)
        )
        .route(
            "/login",
            get(handle::auth::login::get)
                .post(handle::auth::login::post)
        )
        .route(
            "/login/verify",
            get(handle::auth::verify::get)
                .post(handle::auth::verify::post)
        )
        .route(
            "/logout",
            get(handle::auth::logout::handle)
                .post(handle::auth::logout::handle)
        )
        .route(
            "/create-account",
            get(handle::register::get)
                .post(handle::register::post)
        )
        .route(
            "/reset-password",
            get(handle::auth::reset::get)
                .post(handle::auth::reset::post)
        )
        .route(
            "/account",
            get(handle::account::get)
        )
        .route(
            "/account/change-password",
            get(handle::account::password::get)
                .post(handle::account::password::post)
        )
        .route(
            "/account/totp",
            get(handle::account::totp::get)
                .post(handle::account::totp::post)
        )
        .route(
            "/account/totp/disable",
            post(handle::account::totp::disable)
        )
        .route(
            "/characters",
            get(handle::characters::get)
        )
        .layer(ServiceBuilder::new()
            .layer(layer::RIDLayer::new())
            .layer(TraceLayer::new_for_http()
                .make_span_with(layer::trace::make_span_with)
                .on_request(layer::trace::on_request)
                .on_response(layer::trace::on_response)
                .on_failure(layer::trace::on_failure))
            .layer(HandleErrorLayer::new(handle_error))
            .layer(TimeoutLayer::new(Duration::new(90, 0))))
        .with_state(state.clone())
}
