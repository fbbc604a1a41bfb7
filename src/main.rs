//src/main.rs

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use store_backend::{create_app, AppState, Config};

#[tokio::main]
async fn main() {
    // Inicializa o logger; RUST_LOG controla o nível (padrão: info).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let config = Config::from_env().expect("Falha ao carregar a configuração.");
    let (app_state, audit_queue) = AppState::new(&config)
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    let tenants = app_state.tenants.clone();
    let app = create_app(app_state);

    let listener = TcpListener::bind(&config.server_addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", config.server_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Erro no servidor Axum");

    // Desligamento: fecha as pools das lojas e grava o resto da auditoria.
    tenants.drain().await;
    audit_queue.shutdown().await;
    tracing::info!("👋 Servidor encerrado");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Falha ao escutar Ctrl+C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Falha ao escutar SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("🛑 Sinal de desligamento recebido");
}
