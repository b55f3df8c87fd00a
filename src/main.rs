use usermgmt::{app, config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;

    if config.json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(config.log_filter.as_str())
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(config.log_filter.as_str())
            .init();
    }

    let addr = config.bind_addr();
    let app_state = AppState::init(config);
    tracing::info!(users = app_state.store.len(), "in-memory user store ready");

    let app = app::build_app(app_state);
    app::serve(app, &addr).await
}
