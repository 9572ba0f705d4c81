use std::{ops::Deref, sync::Arc};

use surrealdb::{
    engine::any::{connect, Any},
    opt::auth::Root,
    Error, Surreal,
};
use tracing::warn;

use crate::error::AppError;

use super::types::StoredObject;

/// Thin wrapper over the property-graph driver. Exposes parameterized reads,
/// atomic multi-statement writes, and KNN vector search over a pre-created
/// HNSW index; never string-concatenates caller input into a query.
#[derive(Clone)]
pub struct GraphStore {
    pub client: Surreal<Any>,
}

pub trait ProvidesStore {
    fn store(&self) -> &Arc<GraphStore>;
}

impl GraphStore {
    pub async fn connect(
        address: &str,
        username: &str,
        password: &str,
        namespace: &str,
        database: &str,
    ) -> Result<Self, AppError> {
        let db = connect(address)
            .await
            .map_err(|err| AppError::StoreUnavailable(err.to_string()))?;

        db.signin(Root { username, password })
            .await
            .map_err(|err| AppError::StoreUnavailable(err.to_string()))?;

        db.use_ns(namespace)
            .use_db(database)
            .await
            .map_err(|err| AppError::StoreUnavailable(err.to_string()))?;

        Ok(GraphStore { client: db })
    }

    /// Runs a single parameterized read query, binding every parameter rather
    /// than interpolating caller-controlled values into the query string.
    pub async fn run_read<T>(
        &self,
        query: &str,
        params: Vec<(&str, surrealdb::sql::Value)>,
    ) -> Result<Vec<T>, AppError>
    where
        T: for<'de> serde::Deserialize<'de>,
    {
        let mut q = self.client.query(query);
        for (key, value) in params {
            q = q.bind((key.to_string(), value));
        }
        let mut response = q.await.map_err(map_store_error)?;
        response.take(0).map_err(map_store_error)
    }

    /// Runs a sequence of statements inside one `BEGIN TRANSACTION` /
    /// `COMMIT TRANSACTION` block. All statements commit or none do.
    pub async fn run_write(
        &self,
        statements: &str,
        params: Vec<(&str, surrealdb::sql::Value)>,
    ) -> Result<surrealdb::Response, AppError> {
        let body = format!("BEGIN TRANSACTION;\n{statements}\nCOMMIT TRANSACTION;");
        let mut q = self.client.query(body);
        for (key, value) in params {
            q = q.bind((key.to_string(), value));
        }
        let response = q.await.map_err(map_store_error)?;
        response.check().map_err(map_store_error)
    }

    /// Runs a sequence of statements inside one `BEGIN TRANSACTION` /
    /// `COMMIT TRANSACTION` block, binding each parameter as a plain
    /// serializable value rather than the narrower [`surrealdb::sql::Value`]
    /// `run_write` takes. Used by callers (the persistence service) that bind
    /// whole content objects rather than scalars.
    pub async fn run_write_values(
        &self,
        statements: &str,
        params: Vec<(String, serde_json::Value)>,
    ) -> Result<surrealdb::Response, AppError> {
        let body = format!("BEGIN TRANSACTION;\n{statements}\nCOMMIT TRANSACTION;");
        let mut q = self.client.query(body);
        for (key, value) in params {
            q = q.bind((key, value));
        }
        let response = q.await.map_err(map_store_error)?;
        response.check().map_err(map_store_error)
    }

    /// KNN search over a named HNSW index, returning the `top_k` nearest rows
    /// deserialized as `T` alongside their similarity score.
    pub async fn vector_query<T>(
        &self,
        table: &str,
        vector_field: &str,
        vector: &[f32],
        top_k: usize,
        ef: usize,
    ) -> Result<Vec<(T, f64)>, AppError>
    where
        T: for<'de> serde::Deserialize<'de>,
    {
        #[derive(serde::Deserialize)]
        struct ScoredRow<U> {
            #[serde(flatten)]
            row: U,
            score: f64,
        }

        let query = format!(
            "SELECT *, vector::similarity::cosine({vector_field}, $vector) AS score \
             FROM {table} WHERE {vector_field} <|{top_k},{ef}|> $vector ORDER BY score DESC;"
        );

        let mut response = self
            .client
            .query(query)
            .bind(("vector", vector.to_vec()))
            .await
            .map_err(map_store_error)?;

        let rows: Vec<ScoredRow<T>> = response.take(0).map_err(map_store_error)?;
        Ok(rows.into_iter().map(|r| (r.row, r.score)).collect())
    }

    pub async fn store_item<T>(&self, item: T) -> Result<Option<T>, AppError>
    where
        T: StoredObject + Send + Sync + 'static,
    {
        self.client
            .create((T::table_name(), item.get_id()))
            .content(item)
            .await
            .map_err(map_store_error)
    }

    pub async fn get_item<T>(&self, id: &str) -> Result<Option<T>, AppError>
    where
        T: for<'de> StoredObject,
    {
        self.client
            .select((T::table_name(), id))
            .await
            .map_err(map_store_error)
    }

    pub async fn get_all_stored_items<T>(&self) -> Result<Vec<T>, AppError>
    where
        T: for<'de> StoredObject,
    {
        self.client
            .select(T::table_name())
            .await
            .map_err(map_store_error)
    }

    /// Cheap liveness probe for `GET /health`: a trivial query that only
    /// succeeds if the connection and session are still good.
    pub async fn is_available(&self) -> bool {
        self.client.query("RETURN 1;").await.is_ok()
    }
}

fn map_store_error(err: Error) -> AppError {
    let message = err.to_string();
    if message.contains("connection")
        || message.contains("Io error")
        || message.contains("timed out")
    {
        warn!(error = %message, "graph store connection error");
        AppError::StoreUnavailable(message)
    } else {
        AppError::Database(err)
    }
}

impl Deref for GraphStore {
    type Target = Surreal<Any>;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl GraphStore {
    /// Creates an in-memory graph store for testing.
    pub async fn memory(namespace: &str, database: &str) -> Result<Self, AppError> {
        let db = connect("mem://")
            .await
            .map_err(|err| AppError::StoreUnavailable(err.to_string()))?;

        db.use_ns(namespace)
            .use_db(database)
            .await
            .map_err(|err| AppError::StoreUnavailable(err.to_string()))?;

        Ok(GraphStore { client: db })
    }
}
