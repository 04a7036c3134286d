use log::{debug, info};

use crate::api::Backend;
use crate::error::ApiError;
use crate::models::Message;

/// Fetches the persisted conversation with `peer_id`, oldest first.
///
/// A conversation that was never started yields an empty list.
pub async fn load_history<B>(
    backend: &B,
    local_user_id: &str,
    peer_id: &str,
) -> Result<Vec<Message>, ApiError>
where
    B: Backend + ?Sized,
{
    debug!("loading history with {}", peer_id);
    let records = backend.chat_history(peer_id).await?;
    info!("loaded {} message(s) with {}", records.len(), peer_id);

    Ok(records
        .into_iter()
        .map(|record| Message::from_record(record, local_user_id))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HistoryRecord, User};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    struct Fixed(Result<Vec<HistoryRecord>, ApiError>);

    #[async_trait]
    impl Backend for Fixed {
        async fn current_user(&self) -> Result<User, ApiError> {
            Err(ApiError::NotFound)
        }
        async fn profile(&self, _user_id: &str) -> Result<User, ApiError> {
            Err(ApiError::NotFound)
        }
        async fn chat_history(&self, _peer_id: &str) -> Result<Vec<HistoryRecord>, ApiError> {
            self.0.clone()
        }
        async fn logout(&self) -> Result<(), ApiError> {
            Ok(())
        }
    }

    fn record(id: &str, sender: &str, text: &str, minute: u32) -> HistoryRecord {
        HistoryRecord {
            id: id.into(),
            sender_id: sender.into(),
            text: text.into(),
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 12, minute, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn keeps_source_order_and_marks_own_messages() {
        // Deliberately not sorted by timestamp.
        let backend = Fixed(Ok(vec![
            record("m1", "u1", "hi", 5),
            record("m2", "u2", "hello", 1),
        ]));
        let messages = load_history(&backend, "u2", "u1").await.unwrap();
        let ids: Vec<_> = messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["m1", "m2"]);
        assert!(!messages[0].sender_is_self);
        assert!(messages[1].sender_is_self);
    }

    #[tokio::test]
    async fn empty_conversation_is_not_an_error() {
        let backend = Fixed(Ok(Vec::new()));
        assert!(load_history(&backend, "u2", "u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unauthorized_propagates_distinctly() {
        let backend = Fixed(Err(ApiError::Unauthorized));
        assert_eq!(
            load_history(&backend, "u2", "u1").await,
            Err(ApiError::Unauthorized)
        );
    }
}
