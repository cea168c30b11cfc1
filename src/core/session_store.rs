use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::errors::CoreError;
use super::interview::InterviewSession;
use super::settings_store::app_data_root;

pub struct JsonSessionStore {
    sessions_root: PathBuf,
    retention_hours: i64,
    mutex: Mutex<()>,
}

impl JsonSessionStore {
    pub fn new(retention_hours: i64) -> Self {
        let sessions_root = app_data_root().join("sessions");
        Self::new_with_root(sessions_root, retention_hours)
    }

    pub fn new_with_root(sessions_root: PathBuf, retention_hours: i64) -> Self {
        Self {
            sessions_root,
            retention_hours: retention_hours.max(1),
            mutex: Mutex::new(()),
        }
    }

    pub fn sessions_root(&self) -> &Path {
        &self.sessions_root
    }

    pub async fn save(&self, session: &InterviewSession) -> anyhow::Result<()> {
        let _lock = self.mutex.lock().await;
        tokio::fs::create_dir_all(&self.sessions_root).await?;

        let json = serde_json::to_string_pretty(session)?;
        tokio::fs::write(self.session_path(&session.id)?, json).await?;
        debug!(session_id = %session.id, "saved interview session");
        Ok(())
    }

    pub async fn load(&self, session_id: &str) -> anyhow::Result<InterviewSession> {
        let _lock = self.mutex.lock().await;
        let path = self.session_path(session_id)?;
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(CoreError::SessionNotFound(session_id.to_string()).into());
        }

        let json = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed reading {}", path.display()))?;
        let session = serde_json::from_str::<InterviewSession>(&json)
            .with_context(|| format!("invalid session file {}", path.display()))?;
        Ok(session)
    }

    pub async fn delete(&self, session_id: &str) -> anyhow::Result<bool> {
        let _lock = self.mutex.lock().await;
        let path = self.session_path(session_id)?;
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(false);
        }

        tokio::fs::remove_file(path).await?;
        Ok(true)
    }

    /// Session ids, most recently updated first.
    pub async fn list(&self) -> anyhow::Result<Vec<String>> {
        self.cleanup_expired_sessions().await?;

        let _lock = self.mutex.lock().await;
        if !tokio::fs::try_exists(&self.sessions_root)
            .await
            .unwrap_or(false)
        {
            return Ok(Vec::new());
        }

        let mut dir = tokio::fs::read_dir(&self.sessions_root).await?;
        let mut sessions = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|v| v.to_str()) != Some("json") {
                continue;
            }

            let json = tokio::fs::read_to_string(&path).await?;
            if let Ok(session) = serde_json::from_str::<InterviewSession>(&json) {
                sessions.push((session.updated_at, session.id));
            }
        }

        sessions.sort_by(|a, b| b.cmp(a));
        Ok(sessions.into_iter().map(|(_, id)| id).collect())
    }

    pub async fn cleanup_expired_sessions(&self) -> anyhow::Result<usize> {
        if !tokio::fs::try_exists(&self.sessions_root)
            .await
            .unwrap_or(false)
        {
            return Ok(0);
        }

        let _lock = self.mutex.lock().await;
        let now = Utc::now();
        let mut removed = 0;
        let mut dir = tokio::fs::read_dir(&self.sessions_root).await?;

        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|v| v.to_str()) != Some("json") {
                continue;
            }

            let json = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("failed reading {}", path.display()))?;
            let reference_time = serde_json::from_str::<InterviewSession>(&json)
                .map(|session| session.updated_at)
                .unwrap_or(now);

            if now.signed_duration_since(reference_time) > Duration::hours(self.retention_hours) {
                tokio::fs::remove_file(&path).await?;
                removed += 1;
            }
        }

        if removed > 0 {
            info!(removed, "removed expired interview sessions");
        }
        Ok(removed)
    }

    fn session_path(&self, session_id: &str) -> anyhow::Result<PathBuf> {
        let valid = !session_id.is_empty()
            && session_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(CoreError::InvalidRequest(format!("invalid session id: {session_id}")).into());
        }

        Ok(self.sessions_root.join(format!("{session_id}.json")))
    }
}
