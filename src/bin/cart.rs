use lambda_http::{run, service_fn, Body, Error, Request, Response};
use plant_shop::db_utils::AppState;
use plant_shop::handlers::cart;

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_http::tracing::init_default_subscriber();

    let state = AppState::from_env().await?;
    let state = &state;

    run(service_fn(move |event: Request| async move {
        Ok::<Response<Body>, Error>(cart::handle_event(&event, state).await)
    }))
    .await
}
