//! Configuration version endpoints

use crate::error::Result;
use crate::{ControlPlaneClient, handle_empty_response, handle_response};
use runway_core::domain::configuration_version::{ConfigurationStatus, ConfigurationVersion};
use runway_core::domain::run::RunStatus;
use runway_core::dto::configuration_version::{
    ConfigurationVersionDocument, RunStatusUpdate, UpdateConfigurationStatus,
};

impl ControlPlaneClient {
    /// Persist a new configuration version record
    ///
    /// # Returns
    /// The record as stored by the control plane
    pub async fn create_configuration_version(
        &self,
        cv: ConfigurationVersion,
    ) -> Result<ConfigurationVersion> {
        let url = self.endpoint(&["api", "configuration-versions"])?;
        let response = self
            .client
            .post(url)
            .json(&ConfigurationVersionDocument::from(cv))
            .send()
            .await?;

        let doc: ConfigurationVersionDocument = handle_response(response).await?;
        Ok(doc.into())
    }

    /// Set the upload status of a configuration version
    pub async fn update_configuration_status(
        &self,
        id: &str,
        status: ConfigurationStatus,
    ) -> Result<()> {
        let url = self.endpoint(&["api", "configuration-versions", id])?;
        let response = self
            .client
            .patch(url)
            .json(&UpdateConfigurationStatus::new(status))
            .send()
            .await?;

        handle_empty_response(response).await
    }

    /// Write the run state of a configuration version back to the control plane
    ///
    /// # Arguments
    /// * `id` - Configuration version id
    /// * `status` - New run status
    /// * `message` - Optional failure detail
    pub async fn update_run_status(
        &self,
        id: &str,
        status: RunStatus,
        message: Option<String>,
    ) -> Result<()> {
        let url = self.endpoint(&["api", "configuration-versions", id, "run-status"])?;
        let response = self
            .client
            .put(url)
            .json(&RunStatusUpdate { status, message })
            .send()
            .await?;

        handle_empty_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use crate::ControlPlaneClient;
    use runway_core::domain::configuration_version::ConfigurationStatus;
    use runway_core::domain::run::RunStatus;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_update_configuration_status() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/api/configuration-versions/cv-1"))
            .and(body_json(serde_json::json!({
                "data": {"type": "configuration-versions", "attributes": {"status": "uploaded"}}
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = ControlPlaneClient::new(server.uri());
        client
            .update_configuration_status("cv-1", ConfigurationStatus::Uploaded)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_run_status_omits_empty_message() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/configuration-versions/cv-1/run-status"))
            .and(body_json(serde_json::json!({"status": "initialized"})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = ControlPlaneClient::new(server.uri());
        client
            .update_run_status("cv-1", RunStatus::Initialized, None)
            .await
            .unwrap();
    }
}
