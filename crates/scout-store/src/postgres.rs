//! Postgres + pgvector candidate store.
//!
//! Stage-1 retrieval is a single SQL statement: the filter predicates sit in
//! the `WHERE` clause and the cosine-distance ordering in `ORDER BY`, so the
//! planner never post-filters a capped neighbour list. With an HNSW index the
//! session additionally requests `hnsw.iterative_scan = strict_order`, which
//! makes the index keep scanning until `LIMIT` filtered rows are found.
//!
//! Requires the `store-pgvector` feature.

use async_trait::async_trait;
use ::pgvector::Vector;
use tokio_postgres::{Client, NoTls, Row};
use uuid::Uuid;

use scout_core::{CandidateProfile, CandidateRecord, Dependency, Error, Result};

use crate::store::{CandidateStore, StoreHit, StoreQuery};

/// Default table name.
pub const DEFAULT_TABLE: &str = "candidates";

/// Candidate store backed by a pgvector table.
pub struct PgVectorStore {
    client: Client,
    table: String,
    dimension: usize,
    select_sql: String,
    upsert_sql: String,
}

impl PgVectorStore {
    /// Connect to Postgres and prepare the session.
    ///
    /// The connection driver runs on a spawned task; if it terminates, every
    /// subsequent query fails with [`Error::DependencyUnavailable`].
    pub async fn connect(database_url: &str, table: &str, dimension: usize) -> Result<Self> {
        validate_identifier(table)?;
        if dimension == 0 {
            return Err(Error::config("store dimension must be positive"));
        }

        let (client, connection) = tokio_postgres::connect(database_url, NoTls)
            .await
            .map_err(store_error)?;
        tokio::spawn(async move {
            if let Err(err) = connection.await {
                tracing::error!(error = %err, "postgres connection terminated");
            }
        });

        if let Err(err) = client
            .batch_execute("SET hnsw.iterative_scan = strict_order")
            .await
        {
            tracing::warn!(
                error = %err,
                "pgvector lacks iterative index scans; filtered HNSW queries may return fewer rows"
            );
        }

        tracing::info!(table, dimension, "connected to pgvector store");
        Ok(Self {
            client,
            select_sql: select_sql(table),
            upsert_sql: upsert_sql(table),
            table: table.to_string(),
            dimension,
        })
    }

    /// Create the extension, table and HNSW index if they do not exist.
    pub async fn ensure_schema(&self) -> Result<()> {
        let ddl = format!(
            "CREATE EXTENSION IF NOT EXISTS vector;
             CREATE TABLE IF NOT EXISTS {table} (
                 id UUID PRIMARY KEY,
                 full_name TEXT NOT NULL,
                 professional_title TEXT,
                 summary TEXT,
                 location TEXT NOT NULL DEFAULT '',
                 years_experience INTEGER NOT NULL DEFAULT 0,
                 skills TEXT[] NOT NULL DEFAULT '{{}}',
                 languages TEXT[] NOT NULL DEFAULT '{{}}',
                 education TEXT,
                 embedding vector({dim})
             );
             CREATE INDEX IF NOT EXISTS {table}_embedding_hnsw
                 ON {table} USING hnsw (embedding vector_cosine_ops);",
            table = self.table,
            dim = self.dimension,
        );
        self.client.batch_execute(&ddl).await.map_err(store_error)
    }
}

/// Reject anything that is not a plain SQL identifier.
fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::config(format!("invalid table name '{name}'")))
    }
}

fn store_error(err: tokio_postgres::Error) -> Error {
    Error::dependency(Dependency::Store, err.to_string())
}

fn select_sql(table: &str) -> String {
    format!(
        "SELECT id, full_name, professional_title, summary, location, years_experience, \
                skills, languages, education, \
                (1 - (embedding <=> $1))::real AS similarity \
         FROM {table} \
         WHERE embedding IS NOT NULL \
           AND ($2::text IS NULL \
                OR lower(regexp_replace(btrim(location), '\\s+', ' ', 'g')) = $2) \
           AND ($3::integer IS NULL OR years_experience >= $3) \
           AND (cardinality($4::text[]) = 0 \
                OR ARRAY(SELECT lower(btrim(s)) FROM unnest(skills) AS s) @> $4) \
         ORDER BY embedding <=> $1 ASC, id ASC \
         LIMIT $5"
    )
}

fn upsert_sql(table: &str) -> String {
    format!(
        "INSERT INTO {table} (id, full_name, professional_title, summary, location, \
                              years_experience, skills, languages, education, embedding) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         ON CONFLICT (id) DO UPDATE SET \
             full_name = EXCLUDED.full_name, \
             professional_title = EXCLUDED.professional_title, \
             summary = EXCLUDED.summary, \
             location = EXCLUDED.location, \
             years_experience = EXCLUDED.years_experience, \
             skills = EXCLUDED.skills, \
             languages = EXCLUDED.languages, \
             education = EXCLUDED.education, \
             embedding = EXCLUDED.embedding"
    )
}

fn hit_from_row(row: &Row) -> Result<StoreHit> {
    let years: i32 = row.try_get("years_experience").map_err(store_error)?;
    let skills: Vec<String> = row.try_get("skills").map_err(store_error)?;
    let profile = CandidateProfile {
        id: row.try_get("id").map_err(store_error)?,
        full_name: row.try_get("full_name").map_err(store_error)?,
        professional_title: row.try_get("professional_title").map_err(store_error)?,
        summary: row.try_get("summary").map_err(store_error)?,
        location: row.try_get("location").map_err(store_error)?,
        years_experience: u32::try_from(years).unwrap_or(0),
        skills: skills.into_iter().collect(),
        languages: row.try_get("languages").map_err(store_error)?,
        education: row.try_get("education").map_err(store_error)?,
    };
    let similarity: f32 = row.try_get("similarity").map_err(store_error)?;
    Ok(StoreHit {
        profile,
        similarity: if similarity.is_finite() { similarity } else { 0.0 },
    })
}

#[async_trait]
impl CandidateStore for PgVectorStore {
    async fn nearest(&self, query: &StoreQuery) -> Result<Vec<StoreHit>> {
        if query.vector.len() != self.dimension {
            return Err(Error::invalid_data(format!(
                "query vector has dimension {}, store holds {}",
                query.vector.len(),
                self.dimension
            )));
        }
        if query.limit == 0 {
            return Ok(Vec::new());
        }

        let vector = Vector::from(query.vector.clone());
        let location = query.filters.location.clone();
        let min_experience = query
            .filters
            .min_experience
            .map(|years| i32::try_from(years).unwrap_or(i32::MAX));
        let skills: Vec<String> = query.filters.skills.iter().cloned().collect();
        let limit = i64::try_from(query.limit).unwrap_or(i64::MAX);

        let rows = self
            .client
            .query(
                &self.select_sql,
                &[&vector, &location, &min_experience, &skills, &limit],
            )
            .await
            .map_err(store_error)?;

        let hits = rows.iter().map(hit_from_row).collect::<Result<Vec<_>>>()?;
        tracing::debug!(
            store = "pgvector",
            hits = hits.len(),
            limit = query.limit,
            "nearest query served"
        );
        Ok(hits)
    }

    async fn upsert(&self, record: CandidateRecord) -> Result<()> {
        if let Some(embedding) = &record.embedding {
            if embedding.len() != self.dimension {
                return Err(Error::invalid_data(format!(
                    "candidate {} has embedding dimension {}, store holds {}",
                    record.id(),
                    embedding.len(),
                    self.dimension
                )));
            }
        }

        let profile = &record.profile;
        let id: Uuid = profile.id;
        let years = i32::try_from(profile.years_experience)
            .map_err(|_| Error::invalid_data("years_experience out of range"))?;
        let skills: Vec<String> = profile.skills.iter().cloned().collect();
        let embedding = record.embedding.clone().map(Vector::from);

        self.client
            .execute(
                &self.upsert_sql,
                &[
                    &id,
                    &profile.full_name,
                    &profile.professional_title,
                    &profile.summary,
                    &profile.location,
                    &years,
                    &skills,
                    &profile.languages,
                    &profile.education,
                    &embedding,
                ],
            )
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        let row = self
            .client
            .query_one(&format!("SELECT count(*) FROM {}", self.table), &[])
            .await
            .map_err(store_error)?;
        let count: i64 = row.try_get(0).map_err(store_error)?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "pgvector"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("candidates").is_ok());
        assert!(validate_identifier("_c2").is_ok());
        assert!(validate_identifier("2c").is_err());
        assert!(validate_identifier("c; DROP TABLE x").is_err());
        assert!(validate_identifier("").is_err());
    }

    #[test]
    fn test_select_sql_filters_inside_query() {
        let sql = select_sql("candidates");
        assert!(sql.contains("FROM candidates"));
        assert!(sql.contains("WHERE embedding IS NOT NULL"));
        assert!(sql.contains("ORDER BY embedding <=> $1 ASC, id ASC"));
        assert!(sql.contains("LIMIT $5"));
    }

    #[test]
    fn test_upsert_sql_replaces_whole_row() {
        let sql = upsert_sql("candidates");
        assert!(sql.contains("ON CONFLICT (id) DO UPDATE"));
        assert!(sql.contains("embedding = EXCLUDED.embedding"));
    }
}
