//! Run-request queue gateway endpoints

use crate::error::Result;
use crate::{ControlPlaneClient, handle_empty_response, handle_response};
use runway_core::domain::run::QueueMessage;
use runway_core::dto::queue::{ReceiveMessages, ReceivedMessages};

impl ControlPlaneClient {
    /// Long-poll a queue for up to `max_messages` messages
    ///
    /// # Arguments
    /// * `queue` - Queue name
    /// * `max_messages` - Upper bound on the batch size
    /// * `wait_time_seconds` - How long the gateway may hold the request open
    ///
    /// # Returns
    /// The received batch, empty when the wait time elapsed without messages
    pub async fn receive_messages(
        &self,
        queue: &str,
        max_messages: u32,
        wait_time_seconds: u32,
    ) -> Result<Vec<QueueMessage>> {
        let url = self.endpoint(&["api", "queues", queue, "receive"])?;
        let response = self
            .client
            .post(url)
            .json(&ReceiveMessages {
                max_messages,
                wait_time_seconds,
            })
            .send()
            .await?;

        let batch: ReceivedMessages = handle_response(response).await?;
        Ok(batch.messages)
    }

    /// Delete a message from a queue using its receipt handle
    pub async fn delete_message(&self, queue: &str, receipt_handle: &str) -> Result<()> {
        let url = self.endpoint(&["api", "queues", queue, "messages", receipt_handle])?;
        let response = self.client.delete(url).send().await?;

        handle_empty_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use crate::ControlPlaneClient;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_receive_messages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/queues/tfc-run-events/receive"))
            .and(body_json(serde_json::json!({
                "max-messages": 5,
                "wait-time-seconds": 10
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": [
                    {"message-id": "m-1", "body": "{}", "receipt-handle": "r-1"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ControlPlaneClient::new(server.uri());
        let messages = client
            .receive_messages("tfc-run-events", 5, 10)
            .await
            .unwrap();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].receipt_handle, "r-1");
    }

    #[tokio::test]
    async fn test_receive_empty_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/queues/tfc-run-events/receive"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let client = ControlPlaneClient::new(server.uri());
        let messages = client
            .receive_messages("tfc-run-events", 5, 10)
            .await
            .unwrap();

        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn test_delete_message_surfaces_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/queues/tfc-run-events/messages/r-1"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = ControlPlaneClient::new(server.uri());
        let err = client
            .delete_message("tfc-run-events", "r-1")
            .await
            .unwrap_err();

        assert!(err.is_server_error());
    }
}
