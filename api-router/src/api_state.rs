use async_openai::{config::OpenAIConfig, Client};
use common::{
    cache::CacheLayer,
    clients::{embedding::EmbeddingClient, llm::LlmClient},
    error::AppError,
    metrics::Metrics,
    storage::{db::GraphStore, indexes},
    utils::config::AppConfig,
};
use orchestration::{
    admission::AdmissionQueue,
    pipeline::config::{OrchestrationConfig, OrchestrationTuning},
    Orchestrator,
};
use persistence::{NutritionLabelService, RunHistoryService};
use retrieval_pipeline::GraphRagService;

/// Everything a handler needs, wired once at startup in `main` and cloned
/// cheaply into axum's router (every field is itself `Arc`-backed or a plain
/// value type). Holds no per-request state.
#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Orchestrator,
    pub history: RunHistoryService,
    pub nutrition_labels: NutritionLabelService,
    pub graphrag: GraphRagService,
    pub store: GraphStore,
    pub llm: LlmClient,
    pub embedding: EmbeddingClient,
    pub metrics: Metrics,
    pub config: AppConfig,
}

impl ApiState {
    pub async fn new(config: AppConfig) -> Result<Self, AppError> {
        let store = GraphStore::connect(
            &config.store_uri,
            &config.store_auth.username,
            &config.store_auth.password,
            &config.store_namespace,
            &config.store_database,
        )
        .await?;

        indexes::bootstrap(&store, config.embedding_dimension).await?;

        let llm_client = Client::with_config(
            OpenAIConfig::new()
                .with_api_key(config.openai_api_key.clone())
                .with_api_base(config.llm_base_url.clone()),
        );
        let llm = LlmClient::new(llm_client, config.llm_model.clone());

        let embedding_client = Client::with_config(
            OpenAIConfig::new()
                .with_api_key(config.openai_api_key.clone())
                .with_api_base(config.embedding_base_url.clone()),
        );
        let embedding = EmbeddingClient::new(embedding_client, config.embedding_model.clone());

        let metrics = Metrics::new();
        let caches = CacheLayer::new(metrics.clone());
        let admission = AdmissionQueue::new(
            config.admission_capacity,
            std::time::Duration::from_secs(config.admission_timeout_seconds),
            metrics.clone(),
        );

        let orchestration_config = OrchestrationConfig {
            tuning: OrchestrationTuning {
                memory_budget_mb: config.memory_budget_mb,
                run_timeout: std::time::Duration::from_secs(config.run_timeout_seconds),
                admission_capacity: config.admission_capacity,
                admission_timeout: std::time::Duration::from_secs(config.admission_timeout_seconds),
                embedding_batch_size: config.embedding_batch_size,
                ..OrchestrationTuning::default()
            },
        };

        let orchestrator = Orchestrator::new(llm.clone(), caches, metrics.clone(), admission, orchestration_config);
        let history = RunHistoryService::new(store.clone());
        let nutrition_labels = NutritionLabelService::new(store.clone());
        let graphrag = GraphRagService::new(embedding.clone(), store.clone());

        Ok(Self {
            orchestrator,
            history,
            nutrition_labels,
            graphrag,
            store,
            llm,
            embedding,
            metrics,
            config,
        })
    }
}
