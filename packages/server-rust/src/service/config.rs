use kvstore_core::ConfigError;
use serde::{Deserialize, Serialize};

/// Dispatch engine sizing.
///
/// `queue_count * threads_per_queue` OS threads are spawned at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Number of independent event queues.
    pub queue_count: usize,
    /// Worker threads blocking on each queue.
    pub threads_per_queue: usize,
}

impl ServiceConfig {
    /// Rejects empty pools.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] if either count is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_count == 0 {
            return Err(ConfigError::InvalidOption {
                option: "queue_count",
                reason: "at least one event queue is required".to_string(),
            });
        }
        if self.threads_per_queue == 0 {
            return Err(ConfigError::InvalidOption {
                option: "threads_per_queue",
                reason: "at least one worker per queue is required".to_string(),
            });
        }
        Ok(())
    }

    /// Total worker threads.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.queue_count * self.threads_per_queue
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            queue_count: 4,
            threads_per_queue: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.queue_count, 4);
        assert_eq!(config.threads_per_queue, 2);
        assert_eq!(config.worker_count(), 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_counts_rejected() {
        let no_queues = ServiceConfig {
            queue_count: 0,
            ..ServiceConfig::default()
        };
        assert!(matches!(
            no_queues.validate(),
            Err(ConfigError::InvalidOption { option: "queue_count", .. })
        ));

        let no_threads = ServiceConfig {
            threads_per_queue: 0,
            ..ServiceConfig::default()
        };
        assert!(matches!(
            no_threads.validate(),
            Err(ConfigError::InvalidOption { option: "threads_per_queue", .. })
        ));
    }

    #[test]
    fn partial_document_keeps_defaults() {
        let config: ServiceConfig = serde_json::from_str(r#"{"queue_count": 1}"#).unwrap();
        assert_eq!(config.queue_count, 1);
        assert_eq!(config.threads_per_queue, 2);
    }
}
