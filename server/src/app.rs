//! Core application

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::api::ApiServer;
use crate::core::cli::{self, CliConfig, Commands};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG};
use crate::core::shutdown::ShutdownService;
use crate::data::{PostgresService, SpanBuffer};
use crate::domain::{SpanWriter, WriterStatus};

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub database: Arc<PostgresService>,
    pub buffer: Arc<SpanBuffer>,
    pub writer_status: Arc<WriterStatus>,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Collector starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        match command {
            Some(Commands::Start) | None => {}
        }

        let app = Self::init(&cli_config).await?;
        Self::start_server(app).await
    }

    async fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;

        let database = Arc::new(
            PostgresService::init(&config.database, config.collector.retention_days)
                .await
                .context("Failed to initialize database")?,
        );

        let buffer = Arc::new(SpanBuffer::new(config.collector.buffer_max_size));
        let writer_status = Arc::new(WriterStatus::new());
        let shutdown = ShutdownService::new();

        Ok(Self {
            shutdown,
            config,
            database,
            buffer,
            writer_status,
        })
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start_server(app: Self) -> Result<()> {
        // Install signal handlers FIRST (before any blocking calls)
        app.shutdown.install_signal_handlers();

        app.start_background_tasks().await;

        tracing::info!(
            host = %app.config.server.host,
            port = app.config.server.port,
            "Hikari collector listening"
        );

        let server = ApiServer::new(app);
        let app = server.start().await?;
        app.shutdown.shutdown().await;
        app.database.close().await;

        Ok(())
    }

    async fn start_background_tasks(&self) {
        let writer = SpanWriter::new(
            Arc::clone(&self.buffer),
            self.database.pool().clone(),
            Arc::clone(&self.writer_status),
            self.config.collector.write_batch_size,
            self.config.collector.db_retry_interval(),
        );

        self.shutdown
            .register(writer.start(self.shutdown.subscribe()))
            .await;

        tracing::debug!("Background tasks started");
    }
}
