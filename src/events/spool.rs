//! Fila durável em disco: um arquivo JSON Lines por canal.
//!
//! O [`SpoolPublisher`] é um recurso de processo: aberto uma vez na
//! inicialização, compartilhado via `Arc` e liberado com
//! [`SpoolPublisher::shutdown`]. Cada linha gravada é sincronizada com o
//! disco antes de `publish` retornar.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{EventPublisher, PublishError};

/// One line of a channel file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpooledEvent {
    /// Message id; consumers use it to drop redeliveries.
    pub id: Uuid,
    pub channel: String,
    pub published_at: DateTime<Utc>,
    pub payload: Value,
}

pub struct SpoolPublisher {
    dir: PathBuf,
    // `None` once shut down.
    files: Mutex<Option<HashMap<String, File>>>,
}

impl SpoolPublisher {
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, PublishError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        tracing::debug!(dir = %dir.display(), "event spool opened");
        Ok(Self {
            dir,
            files: Mutex::new(Some(HashMap::new())),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn channel_path(&self, channel: &str) -> PathBuf {
        self.dir.join(format!("{channel}.jsonl"))
    }

    /// Flushes and closes every channel file. Later publishes fail with
    /// [`PublishError::Closed`]. Calling it twice is harmless.
    pub async fn shutdown(&self) -> Result<(), PublishError> {
        let Some(files) = self.files.lock().await.take() else {
            return Ok(());
        };
        for (channel, mut file) in files {
            file.flush().await?;
            file.sync_all().await?;
            tracing::debug!(channel = %channel, "event channel closed");
        }
        Ok(())
    }

    /// Reads back every event spooled on `channel`, oldest first.
    pub async fn read_channel(
        dir: impl AsRef<Path>,
        channel: &str,
    ) -> Result<Vec<SpooledEvent>, PublishError> {
        let path = dir.as_ref().join(format!("{channel}.jsonl"));
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(PublishError::from))
            .collect()
    }
}

fn valid_channel_name(channel: &str) -> bool {
    !channel.is_empty()
        && channel
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !channel.starts_with('.')
}

#[async_trait]
impl EventPublisher for SpoolPublisher {
    async fn publish(&self, channel: &str, payload: &Value) -> Result<(), PublishError> {
        if !valid_channel_name(channel) {
            return Err(PublishError::Rejected(format!(
                "invalid channel name {channel:?}"
            )));
        }

        let mut guard = self.files.lock().await;
        let files = guard.as_mut().ok_or(PublishError::Closed)?;

        if !files.contains_key(channel) {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.channel_path(channel))
                .await?;
            files.insert(channel.to_string(), file);
        }
        let file = files
            .get_mut(channel)
            .ok_or_else(|| PublishError::Rejected(format!("channel {channel} not open")))?;

        let event = SpooledEvent {
            id: Uuid::new_v4(),
            channel: channel.to_string(),
            published_at: Utc::now(),
            payload: payload.clone(),
        };
        let mut line = serde_json::to_vec(&event)?;
        line.push(b'\n');

        file.write_all(&line).await?;
        file.sync_data().await?;
        tracing::debug!(channel, event_id = %event.id, "event spooled");
        Ok(())
    }
}
