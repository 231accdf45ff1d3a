//! Candidate file loading.
//!
//! Reads a JSON array of [`CandidateRecord`]s (the hand-over format of the
//! ingestion workflow) and upserts them into a store. Records without an
//! embedding can optionally be embedded on the way in.

use std::path::Path;

use scout_core::{CandidateRecord, Error, Result};

use crate::embedding::EmbeddingProvider;
use crate::store::CandidateStore;

/// Read candidate records from a JSON file.
pub async fn load_candidates(path: &Path) -> Result<Vec<CandidateRecord>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::io_with_path(e, path))?;
    serde_json::from_str(&content).map_err(|e| {
        Error::invalid_data(format!("failed to parse candidates in {}: {e}", path.display()))
    })
}

/// Compose the text embedded for a candidate profile.
pub fn profile_embedding_text(record: &CandidateRecord) -> String {
    let profile = &record.profile;
    let mut parts = Vec::new();
    if let Some(title) = &profile.professional_title {
        parts.push(title.clone());
    }
    if let Some(summary) = &profile.summary {
        parts.push(summary.clone());
    }
    if !profile.skills.is_empty() {
        parts.push(profile.skills.iter().cloned().collect::<Vec<_>>().join(", "));
    }
    if !profile.location.is_empty() {
        parts.push(profile.location.clone());
    }
    parts.join(". ")
}

/// Upsert records into a store, embedding those that lack a vector when an
/// embedder is given. Returns the number of records written.
pub async fn ingest(
    store: &dyn CandidateStore,
    embedder: Option<&dyn EmbeddingProvider>,
    records: Vec<CandidateRecord>,
) -> Result<usize> {
    let mut written = 0;
    for mut record in records {
        if record.embedding.is_none() {
            if let Some(embedder) = embedder {
                let text = profile_embedding_text(&record);
                record.embedding = Some(embedder.embed(&text).await?);
            }
        }
        store.upsert(record).await?;
        written += 1;
    }
    tracing::info!(store = store.name(), written, "candidates ingested");
    Ok(written)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::embedding::MockEmbeddingProvider;
    use crate::memory::MemoryCandidateStore;
    use scout_core::CandidateProfile;
    use std::io::Write;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_load_candidates_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"id": "00000000-0000-0000-0000-000000000001", "full_name": "A",
                  "location": "Berlin", "years_experience": 6, "skills": ["rust"],
                  "embedding": [1.0, 0.0]}},
                {{"id": "00000000-0000-0000-0000-000000000002", "full_name": "B"}}
            ]"#
        )
        .unwrap();

        let records = load_candidates(file.path()).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].profile.location, "Berlin");
        assert!(records[1].embedding.is_none());
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = load_candidates(Path::new("/nonexistent/candidates.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[tokio::test]
    async fn test_load_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        let err = load_candidates(file.path()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[tokio::test]
    async fn test_ingest_embeds_pending_records() {
        let store = MemoryCandidateStore::new(16);
        let embedder = MockEmbeddingProvider::new(16);
        let records = vec![
            CandidateRecord::pending(
                CandidateProfile::new(Uuid::from_u128(1), "A").with_title("Backend Engineer"),
            ),
            CandidateRecord::pending(CandidateProfile::new(Uuid::from_u128(2), "B")),
        ];

        let written = ingest(&store, Some(&embedder as &dyn EmbeddingProvider), records)
            .await
            .unwrap();
        assert_eq!(written, 2);
        assert_eq!(store.count().await.unwrap(), 2);
        let stored = store.get(Uuid::from_u128(1)).await.unwrap();
        assert!(stored.is_retrievable(16));
    }

    #[test]
    fn test_profile_embedding_text() {
        let record = CandidateRecord::pending(
            CandidateProfile::new(Uuid::nil(), "A")
                .with_title("Data Engineer")
                .with_skill("spark")
                .with_location("Lisbon"),
        );
        assert_eq!(profile_embedding_text(&record), "Data Engineer. spark. Lisbon");
    }
}
