//! Async context service
//!
//! Runs the synchronous retrieval pipeline on tokio's blocking pool, bounded
//! by a semaphore, and merges document and web context into a system prompt.

pub mod prompt;

use crate::config::Config;
use crate::error::{DocctxError, Result};
use crate::retrieval::{IngestReport, Retrieval, RetrievalConfig, RetrievalOrchestrator};
use crate::websearch::{format_results, GoogleSearchProvider, WebResult, WebSearchProvider};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// A file attached to a request
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Inputs for one chat turn
#[derive(Debug, Clone, Default)]
pub struct ContextRequest {
    pub query: String,
    pub file: Option<UploadedFile>,
    pub use_web_search: bool,
    /// Overrides the service defaults for this request
    pub retrieval: Option<RetrievalConfig>,
}

impl ContextRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn with_file(mut self, name: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.file = Some(UploadedFile {
            name: name.into(),
            bytes,
        });
        self
    }

    pub fn with_web_search(mut self, enabled: bool) -> Self {
        self.use_web_search = enabled;
        self
    }

    pub fn with_retrieval(mut self, config: RetrievalConfig) -> Self {
        self.retrieval = Some(config);
        self
    }
}

/// A web page cited in the context
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Source {
    pub title: String,
    pub link: String,
}

/// Everything gathered for one chat turn
#[derive(Debug, Clone, Serialize)]
pub struct ChatContext {
    pub system_prompt: Option<String>,
    pub sources: Vec<Source>,
    pub ingest: Option<IngestReport>,
    pub retrieval: Option<Retrieval>,
    /// Document-side failure, also reported inside the prompt
    pub document_error: Option<String>,
}

pub struct ContextService {
    orchestrator: Arc<RetrievalOrchestrator>,
    web: Option<Arc<dyn WebSearchProvider>>,
    web_max_results: usize,
    defaults: RetrievalConfig,
    permits: Arc<Semaphore>,
}

impl ContextService {
    pub fn new(orchestrator: Arc<RetrievalOrchestrator>, max_concurrent_jobs: usize) -> Self {
        Self {
            orchestrator,
            web: None,
            web_max_results: 5,
            defaults: RetrievalConfig::default(),
            permits: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
        }
    }

    pub fn with_web_search(mut self, provider: Arc<dyn WebSearchProvider>, max_results: usize) -> Self {
        self.web = Some(provider);
        self.web_max_results = max_results;
        self
    }

    pub fn with_retrieval_defaults(mut self, defaults: RetrievalConfig) -> Self {
        self.defaults = defaults;
        self
    }

    /// Build the orchestrator and, when enabled, the web search provider
    ///
    /// Missing search credentials disable web search with a warning.
    pub fn from_config(config: &Config) -> Result<Self> {
        let orchestrator = Arc::new(RetrievalOrchestrator::from_config(config)?);
        let mut service = Self::new(orchestrator, config.service.max_concurrent_jobs)
            .with_retrieval_defaults(RetrievalConfig::from(&config.retrieval));

        if config.web_search.enabled {
            match GoogleSearchProvider::from_config(&config.web_search) {
                Ok(provider) => {
                    service = service.with_web_search(Arc::new(provider), config.web_search.max_results)
                }
                Err(e) => warn!("Web search disabled: {}", e),
            }
        }

        Ok(service)
    }

    pub fn orchestrator(&self) -> &Arc<RetrievalOrchestrator> {
        &self.orchestrator
    }

    pub fn defaults(&self) -> &RetrievalConfig {
        &self.defaults
    }

    /// Run a synchronous orchestrator call on the blocking pool
    async fn run_blocking<T, F>(&self, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&RetrievalOrchestrator) -> Result<T> + Send + 'static,
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| DocctxError::Worker(e.to_string()))?;

        let orchestrator = Arc::clone(&self.orchestrator);
        tokio::task::spawn_blocking(move || job(&orchestrator))
            .await
            .map_err(|e| DocctxError::Worker(format!("Blocking task failed: {}", e)))?
    }

    pub async fn process_file(&self, file_name: String, bytes: Vec<u8>) -> Result<IngestReport> {
        self.run_blocking(move |orch| orch.process_file(&file_name, bytes))
            .await
    }

    pub async fn retrieve(&self, query: String, config: RetrievalConfig) -> Result<Retrieval> {
        self.run_blocking(move |orch| orch.retrieve(&query, &config))
            .await
    }

    /// Search the web; any failure yields no results
    pub async fn web_results(&self, query: &str) -> Vec<WebResult> {
        let Some(provider) = &self.web else {
            debug!("Web search requested but no provider is configured");
            return Vec::new();
        };

        match provider.search(query, self.web_max_results).await {
            Ok(results) => results,
            Err(e) => {
                warn!("Web search via {} failed: {}", provider.name(), e);
                Vec::new()
            }
        }
    }

    /// Gather document and web context for one chat turn
    pub async fn build_context(&self, request: ContextRequest) -> Result<ChatContext> {
        let config = request.retrieval.clone().unwrap_or_else(|| self.defaults.clone());
        let mut blocks = Vec::new();
        let mut sources = Vec::new();
        let mut ingest = None;
        let mut retrieval = None;
        let mut document_error = None;

        match self.document_context(&request, config).await {
            Ok((report, found)) => {
                if let (Some(context), Some(file_name)) =
                    (found.context.as_deref(), found.file_name.as_deref())
                {
                    blocks.push(prompt::document_block(file_name, context));
                }
                ingest = report;
                retrieval = Some(found);
            }
            Err(e) => {
                warn!("Document context failed: {}", e);
                blocks.push(prompt::error_block(&e.to_string()));
                document_error = Some(e.to_string());
            }
        }

        if request.use_web_search {
            let results = self.web_results(&request.query).await;
            sources.extend(results.iter().map(|r| Source {
                title: r.title.clone(),
                link: r.link.clone(),
            }));
            blocks.push(prompt::web_block(&format_results(&results)));
        }

        info!(
            "Context built: {} block(s), {} source(s)",
            blocks.len(),
            sources.len()
        );

        Ok(ChatContext {
            system_prompt: prompt::compose_system_prompt(&blocks),
            sources,
            ingest,
            retrieval,
            document_error,
        })
    }

    async fn document_context(
        &self,
        request: &ContextRequest,
        config: RetrievalConfig,
    ) -> Result<(Option<IngestReport>, Retrieval)> {
        let query = request.query.clone();
        match &request.file {
            // One job, so the answer comes from this upload's index
            Some(file) => {
                let (name, bytes) = (file.name.clone(), file.bytes.clone());
                let (report, retrieval) = self
                    .run_blocking(move |orch| {
                        orch.process_file_and_retrieve(&name, bytes, &query, &config)
                    })
                    .await?;
                Ok((Some(report), retrieval))
            }
            None => Ok((None, self.retrieve(query, config).await?)),
        }
    }
}
