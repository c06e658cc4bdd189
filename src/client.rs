use std::path::Path;

use chrono::Utc;
use uuid::Uuid;

use crate::dataset::{parse_delimited, Dataset};
use crate::engine::{execute, sort_and_limit, QueryResult};
use crate::error::{EngineError, EngineResult};
use crate::expr::ExprCache;
use crate::model::{Purpose, QueryModel, RunMeta};
use crate::query::build_query;
use crate::snapshot::{SnapshotPayload, SnapshotStore};

/// One run's output: the finalized result, the SQL text the projection
/// represents, and the metadata recorded for it.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub result: QueryResult,
    pub sql: String,
    pub meta: RunMeta,
}

/// Host object owning the current dataset, model and result state.
/// All engine stages read that state immutably for the duration of one
/// call; persistence is injected so the storage backend is swappable.
pub struct AnalyticsClient<S: SnapshotStore> {
    store: S,
    dataset: Option<Dataset>,
    run_meta: Option<RunMeta>,
    result: Option<QueryResult>,
    previous_result: Option<QueryResult>,
    exprs: ExprCache,
}

impl<S: SnapshotStore> AnalyticsClient<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            dataset: None,
            run_meta: None,
            result: None,
            previous_result: None,
            exprs: ExprCache::new(),
        }
    }

    /// Construct a client restored from the store's snapshot slot, if any.
    pub fn restore(store: S) -> Self {
        let mut client = Self::new(store);
        if let Some(payload) = client.store.load() {
            tracing::info!("restored snapshot");
            client.dataset = payload.dataset;
            client.run_meta = payload.run_meta;
            client.result = payload.result;
            client.previous_result = payload.previous_result;
        }
        client
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    pub fn run_meta(&self) -> Option<&RunMeta> {
        self.run_meta.as_ref()
    }

    pub fn result(&self) -> Option<&QueryResult> {
        self.result.as_ref()
    }

    /// Previous run's result, retained for diffing.
    pub fn previous_result(&self) -> Option<&QueryResult> {
        self.previous_result.as_ref()
    }

    /// Ingest delimited text as the active dataset.
    pub fn load_dataset_text(&mut self, name: Option<&str>, text: &str) -> EngineResult<&Dataset> {
        let dataset = parse_delimited(text, name)?;
        tracing::info!(
            name = %dataset.name,
            columns = dataset.columns.len(),
            rows = dataset.rows.len(),
            "dataset loaded"
        );
        self.dataset = Some(dataset);
        self.save_snapshot();
        self.dataset.as_ref().ok_or(EngineError::NoDataset)
    }

    /// Read and ingest a delimited file. The only asynchronous operation;
    /// the host awaits it before running queries.
    pub async fn load_dataset_file(&mut self, path: impl AsRef<Path>) -> EngineResult<&Dataset> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path).await?;
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::to_string);
        self.load_dataset_text(name.as_deref(), &text)
    }

    /// Compile and execute `model` against the loaded dataset.
    pub fn run(&mut self, model: &QueryModel, purpose: Purpose) -> EngineResult<RunOutput> {
        model.validate()?;
        let dataset = self.dataset.as_ref().ok_or(EngineError::NoDataset)?;

        let compiled = build_query(model, &dataset.name);
        let raw = execute(&compiled.projection, &model.filters, dataset, &mut self.exprs);
        let rows = sort_and_limit(raw.rows, &model.sort, model.limit);
        let result = QueryResult {
            columns: raw.columns,
            rows,
        };

        let meta = RunMeta {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            purpose,
            model: model.clone(),
        };
        tracing::info!(run = %meta.id, rows = result.rows.len(), "query executed");

        self.previous_result = self.result.take();
        self.result = Some(result.clone());
        self.run_meta = Some(meta.clone());
        self.save_snapshot();

        Ok(RunOutput {
            result,
            sql: compiled.sql,
            meta,
        })
    }

    fn save_snapshot(&self) {
        let payload = SnapshotPayload {
            dataset: self.dataset.clone(),
            run_meta: self.run_meta.clone(),
            result: self.result.clone(),
            previous_result: self.previous_result.clone(),
        };
        self.store.save(&payload);
    }
}
