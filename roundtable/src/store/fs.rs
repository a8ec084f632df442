//! Filesystem-backed [`Store`] implementation.
//!
//! Layout, one file per artifact:
//!
//! ```text
//! <root>/sessions/<id>/meta.json
//! <root>/sessions/<id>/versions/<v>.json
//! <root>/sessions/<id>/reviews/<v>.json
//! <root>/sessions/<id>/report.json
//! ```
//!
//! Every write goes to `<file>.tmp-<random>` first, then
//! `tokio::fs::rename` swaps it into place — the standard
//! write-temp-then-rename idiom for atomic per-artifact writes on a
//! single filesystem.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{
    ConvergenceReport, DocumentVersion, Participant, Review, Session, SessionId, SessionStatus, TokenCounts,
};

use super::traits::{Store, StoreError, StoreResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IterationMeta {
    iteration: u32,
    input_version: u32,
    output_version: Option<u32>,
    delta: f64,
    #[serde(default)]
    convergence_reason: String,
    #[serde(default)]
    moderator_tokens: TokenCounts,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionMeta {
    id: SessionId,
    status: SessionStatus,
    participants: Vec<Participant>,
    #[serde(default)]
    moderator_focus: String,
    #[serde(default)]
    planner_tokens: TokenCounts,
    #[serde(default)]
    max_iterations: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    iteration_meta: Vec<IterationMeta>,
}

/// A plain-directory-tree [`Store`].
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn session_dir(&self, id: SessionId) -> PathBuf {
        self.root.join("sessions").join(id.to_string())
    }

    fn meta_path(&self, id: SessionId) -> PathBuf {
        self.session_dir(id).join("meta.json")
    }

    fn version_path(&self, id: SessionId, version: u32) -> PathBuf {
        self.session_dir(id).join("versions").join(format!("{version:06}.json"))
    }

    fn reviews_path(&self, id: SessionId, version: u32) -> PathBuf {
        self.session_dir(id).join("reviews").join(format!("{version:06}.json"))
    }

    fn report_path(&self, id: SessionId) -> PathBuf {
        self.session_dir(id).join("report.json")
    }

    /// Highest version number already written for this session, or
    /// `None` if no version has been written yet.
    async fn max_existing_version(&self, id: SessionId) -> StoreResult<Option<u32>> {
        let dir = self.session_dir(id).join("versions");
        if !tokio::fs::try_exists(&dir).await? {
            return Ok(None);
        }
        let mut entries = tokio::fs::read_dir(&dir).await?;
        let mut max = None;
        while let Some(entry) = entries.next_entry().await? {
            if let Some(stem) = entry.path().file_stem().and_then(|s| s.to_str()) {
                if let Ok(v) = stem.parse::<u32>() {
                    max = Some(max.map_or(v, |m: u32| m.max(v)));
                }
            }
        }
        Ok(max)
    }

    async fn write_atomic<T: Serialize + Sync>(path: &Path, value: &T) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp_path = path.with_extension(format!("tmp-{}", Uuid::new_v4()));
        let bytes = serde_json::to_vec_pretty(value)?;
        tokio::fs::write(&tmp_path, bytes).await?;
        tokio::fs::rename(&tmp_path, path).await?;
        Ok(())
    }

    async fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, std::io::Error> {
        let bytes = tokio::fs::read(path).await?;
        serde_json::from_slice(&bytes).map_err(std::io::Error::other)
    }

    async fn meta_or_not_found(&self, id: SessionId) -> StoreResult<SessionMeta> {
        let path = self.meta_path(id);
        match Self::read_json::<SessionMeta>(&path).await {
            Ok(meta) => Ok(meta),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::SessionNotFound(id)),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    fn meta_from_session(session: &Session) -> SessionMeta {
        let iteration_meta = session
            .iterations
            .iter()
            .map(|it| IterationMeta {
                iteration: it.iteration,
                input_version: it.input_version,
                output_version: it.output_version,
                delta: it.delta,
                convergence_reason: it.convergence_reason.clone(),
                moderator_tokens: it.moderator_tokens,
                started_at: it.started_at,
                finished_at: it.finished_at,
            })
            .collect();
        SessionMeta {
            id: session.id,
            status: session.status,
            participants: session.participants.clone(),
            moderator_focus: session.moderator_focus.clone(),
            planner_tokens: session.planner_tokens,
            max_iterations: session.max_iterations,
            created_at: session.created_at,
            updated_at: session.updated_at,
            iteration_meta,
        }
    }
}

#[async_trait]
impl Store for FsStore {
    async fn create_session(&self, session: &Session) -> StoreResult<()> {
        let meta_path = self.meta_path(session.id);
        if tokio::fs::try_exists(&meta_path).await? {
            return Err(StoreError::AlreadyExists(session.id));
        }
        self.save_session(session).await?;
        for version in &session.versions {
            self.put_version(session.id, version).await?;
        }
        Ok(())
    }

    async fn save_session(&self, session: &Session) -> StoreResult<()> {
        let meta = Self::meta_from_session(session);
        Self::write_atomic(&self.meta_path(session.id), &meta).await
    }

    async fn get_session(&self, id: SessionId) -> StoreResult<Session> {
        let meta = self.meta_or_not_found(id).await?;

        let mut versions = Vec::with_capacity(meta.iteration_meta.len() + 1);
        versions.push(self.get_version(id, 1).await?);
        for it in &meta.iteration_meta {
            if let Some(v) = it.output_version {
                versions.push(self.get_version(id, v).await?);
            }
        }

        let mut iterations = Vec::with_capacity(meta.iteration_meta.len());
        for it in &meta.iteration_meta {
            let reviews = self.get_reviews(id, it.input_version).await?;
            iterations.push(crate::model::IterationRecord {
                iteration: it.iteration,
                input_version: it.input_version,
                reviews,
                output_version: it.output_version,
                delta: it.delta,
                convergence_reason: it.convergence_reason,
                moderator_tokens: it.moderator_tokens,
                started_at: it.started_at,
                finished_at: it.finished_at,
            });
        }

        let report = self.get_report(id).await?;

        Ok(Session {
            id: meta.id,
            status: meta.status,
            participants: meta.participants,
            moderator_focus: meta.moderator_focus,
            planner_tokens: meta.planner_tokens,
            max_iterations: meta.max_iterations,
            versions,
            iterations,
            report,
            created_at: meta.created_at,
            updated_at: meta.updated_at,
        })
    }

    async fn list_sessions(&self) -> StoreResult<Vec<SessionId>> {
        let sessions_dir = self.root.join("sessions");
        if !tokio::fs::try_exists(&sessions_dir).await? {
            return Ok(Vec::new());
        }
        let mut entries = tokio::fs::read_dir(&sessions_dir).await?;
        let mut dated = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                if let Ok(id) = name.parse::<SessionId>() {
                    let created_at = self.meta_or_not_found(id).await?.created_at;
                    dated.push((id, created_at));
                }
            }
        }
        // Spec §4.7: newest session first.
        dated.sort_by_key(|(_, created_at)| std::cmp::Reverse(*created_at));
        Ok(dated.into_iter().map(|(id, _)| id).collect())
    }

    async fn delete_session(&self, id: SessionId) -> StoreResult<()> {
        let dir = self.session_dir(id);
        if tokio::fs::try_exists(&dir).await? {
            tokio::fs::remove_dir_all(&dir).await?;
        }
        Ok(())
    }

    async fn put_version(&self, id: SessionId, version: &DocumentVersion) -> StoreResult<()> {
        let expected = match self.max_existing_version(id).await? {
            Some(max) => max + 1,
            None => 1,
        };
        if version.version != expected {
            return Err(StoreError::NonSequentialVersion {
                session_id: id,
                expected,
                attempted: version.version,
            });
        }
        Self::write_atomic(&self.version_path(id, version.version), version).await
    }

    async fn get_version(&self, id: SessionId, version: u32) -> StoreResult<DocumentVersion> {
        Self::read_json(&self.version_path(id, version))
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => StoreError::VersionNotFound { session_id: id, version },
                _ => StoreError::Io(e),
            })
    }

    async fn put_reviews(&self, id: SessionId, version: u32, reviews: &[Review]) -> StoreResult<()> {
        Self::write_atomic(&self.reviews_path(id, version), &reviews.to_vec()).await
    }

    async fn get_reviews(&self, id: SessionId, version: u32) -> StoreResult<Vec<Review>> {
        match Self::read_json(&self.reviews_path(id, version)).await {
            Ok(reviews) => Ok(reviews),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn put_report(&self, id: SessionId, report: &ConvergenceReport) -> StoreResult<()> {
        Self::write_atomic(&self.report_path(id), report).await
    }

    async fn get_report(&self, id: SessionId) -> StoreResult<Option<ConvergenceReport>> {
        match Self::read_json(&self.report_path(id)).await {
            Ok(report) => Ok(Some(report)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Severity;

    fn sample_session() -> Session {
        let now = Utc::now();
        Session::new(SessionId::new(), DocumentVersion::initial("hello world", now), now)
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let session = sample_session();

        store.create_session(&session).await.unwrap();
        let loaded = store.get_session(session.id).await.unwrap();

        assert_eq!(loaded.id, session.id);
        assert_eq!(loaded.versions.len(), 1);
        assert_eq!(loaded.versions[0].content, "hello world");
    }

    #[tokio::test]
    async fn create_session_twice_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let session = sample_session();

        store.create_session(&session).await.unwrap();
        let err = store.create_session(&session).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn get_missing_session_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let err = store.get_session(SessionId::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn put_version_accepts_exact_successor() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let session = sample_session();
        store.create_session(&session).await.unwrap();

        let v2 = session.versions[0].next("revised", Utc::now());
        store.put_version(session.id, &v2).await.unwrap();
        assert_eq!(store.get_version(session.id, 2).await.unwrap().content, "revised");
    }

    #[tokio::test]
    async fn put_version_rejects_a_gap() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let session = sample_session();
        store.create_session(&session).await.unwrap();

        let mut skipped = session.versions[0].next("revised", Utc::now());
        skipped.version = 5;
        let err = store.put_version(session.id, &skipped).await.unwrap_err();
        assert!(matches!(err, StoreError::NonSequentialVersion { expected: 2, attempted: 5, .. }));
    }

    #[tokio::test]
    async fn reviews_round_trip_per_version() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let session = sample_session();
        store.create_session(&session).await.unwrap();

        let reviews = vec![Review {
            participant_id: "r1".into(),
            issues: vec![crate::model::Issue::new(Severity::High, "issue").with_reviewer_name("r1")],
            summary: "needs work".into(),
            approved: false,
            token_counts: Default::default(),
            timestamp: chrono::Utc::now(),
        }];
        store.put_reviews(session.id, 1, &reviews).await.unwrap();
        let loaded = store.get_reviews(session.id, 1).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded[0].has_high_severity_issues());
    }

    #[tokio::test]
    async fn reviews_for_unwritten_version_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let session = sample_session();
        store.create_session(&session).await.unwrap();
        let reviews = store.get_reviews(session.id, 7).await.unwrap();
        assert!(reviews.is_empty());
    }

    #[tokio::test]
    async fn report_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let session = sample_session();
        store.create_session(&session).await.unwrap();

        assert!(store.get_report(session.id).await.unwrap().is_none());

        let now = Utc::now();
        let report = ConvergenceReport {
            session_id: session.id,
            title: None,
            initial_version: 1,
            final_version: 2,
            total_iterations: 2,
            converged: true,
            convergence_reason: "no high-severity issues remained".into(),
            stopped_by: crate::model::StoppedBy::NoHighIssues,
            total_issues_identified: 3,
            final_issue_count: Default::default(),
            started_at: now,
            ended_at: now,
            history: vec![],
            token_totals: Default::default(),
            participants: vec!["r1".into()],
            delta_metric: "normalized_levenshtein".into(),
            final_delta: 0.01,
        };
        store.put_report(session.id, &report).await.unwrap();
        let loaded = store.get_report(session.id).await.unwrap().unwrap();
        assert_eq!(loaded.total_iterations, 2);
    }

    #[tokio::test]
    async fn list_sessions_reflects_created_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let s1 = sample_session();
        let s2 = sample_session();
        store.create_session(&s1).await.unwrap();
        store.create_session(&s2).await.unwrap();

        let mut ids = store.list_sessions().await.unwrap();
        ids.sort_by_key(|id| id.to_string());
        let mut expected = vec![s1.id, s2.id];
        expected.sort_by_key(|id| id.to_string());
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn list_sessions_orders_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());

        let older = Session::new(SessionId::new(), DocumentVersion::initial("a", Utc::now()), Utc::now() - chrono::Duration::hours(2));
        let newer = Session::new(SessionId::new(), DocumentVersion::initial("b", Utc::now()), Utc::now());
        store.create_session(&older).await.unwrap();
        store.create_session(&newer).await.unwrap();

        let ids = store.list_sessions().await.unwrap();
        assert_eq!(ids, vec![newer.id, older.id]);
    }

    #[tokio::test]
    async fn delete_session_removes_all_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let session = sample_session();
        store.create_session(&session).await.unwrap();

        store.delete_session(session.id).await.unwrap();
        let err = store.get_session(session.id).await.unwrap_err();
        assert!(matches!(err, StoreError::SessionNotFound(_)));
    }
}
