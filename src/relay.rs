use crate::dto::{QueueSubmitResponse, StatusResponse, SyncSubmitResponse, TxRequest};
use crate::error::RelayError;
use crate::pool::{RelayMode, ServiceConfig};
use crate::resolver::StatusApi;
use async_trait::async_trait;
use std::time::Duration;

/// What a submission gave us back: always at least one of the two, which one
/// depends on the relay mode.
#[derive(Clone, Debug, PartialEq)]
pub struct SubmitAck {
    pub queue_id: Option<String>,
    pub tx_hash: Option<String>,
}

/// HTTP client for the relay API. Holds its own reqwest client so the
/// certificate relaxation stays scoped to relay traffic instead of leaking
/// into a process-global agent.
#[derive(Clone, Debug)]
pub struct RelayClient {
    client: reqwest::Client,
    base_url: String,
    mode: RelayMode,
    auth_token: Option<String>,
}

impl RelayClient {
    pub fn new(config: &ServiceConfig) -> Result<RelayClient, RelayError> {
        let timeout = match config.relay_request_timeout_secs {
            Some(v) => v,
            None => 30,
        };
        let client = reqwest::Client::builder()
            // internal relay deployments run self-signed certificates; this
            // is an explicit per-deployment trust decision
            .danger_accept_invalid_certs(config.allow_untrusted_relay_certificate)
            .timeout(Duration::from_secs(timeout))
            .build()?;
        Ok(RelayClient {
            client,
            base_url: config.relay_base_url.trim_end_matches('/').to_owned(),
            mode: config.relay_mode,
            auth_token: config.relay_auth_token.to_owned(),
        })
    }

    pub async fn send_transaction(&self, body: &TxRequest) -> Result<SubmitAck, RelayError> {
        match self.mode {
            RelayMode::QueuePoll => self.send_queue_poll(body).await,
            RelayMode::SyncHash => self.send_sync_hash(body).await,
        }
    }

    async fn send_queue_poll(&self, body: &TxRequest) -> Result<SubmitAck, RelayError> {
        let url = self.base_url.to_owned() + "/sendTransaction";
        let response = self.client.post(url).json(body).send().await?;
        let response = check_status(response).await?;
        let ack = response.json::<QueueSubmitResponse>().await?;
        match ack.queue_id {
            Some(queue_id) => Ok(SubmitAck {
                queue_id: Some(queue_id),
                tx_hash: None,
            }),
            None => Err(RelayError::Rejected {
                status: 200,
                body: "relay response carried no queueId".to_owned(),
            }),
        }
    }

    async fn send_sync_hash(&self, body: &TxRequest) -> Result<SubmitAck, RelayError> {
        let url = self.base_url.to_owned() + "/transaction/send";
        let mut request = self.client.post(url).json(body);
        if let Some(token) = &self.auth_token {
            request = request.header("Authorization", token.to_owned());
        }
        let response = request.send().await?;
        let response = check_status(response).await?;
        let ack = response.json::<SyncSubmitResponse>().await?;
        if !ack.success {
            return Err(RelayError::Rejected {
                status: 200,
                body: "relay reported success = false".to_owned(),
            });
        }
        match ack.tx_hash {
            Some(tx_hash) => Ok(SubmitAck {
                queue_id: None,
                tx_hash: Some(tx_hash),
            }),
            None => Err(RelayError::Rejected {
                status: 200,
                body: "relay reported success without a txHash".to_owned(),
            }),
        }
    }
}

#[async_trait]
impl StatusApi for RelayClient {
    async fn transaction_status(&self, queue_id: &str) -> Result<Option<String>, RelayError> {
        let url = self.base_url.to_owned() + "/transactionStatus/" + queue_id;
        let response = self.client.get(url).header("accept", "application/json").send().await?;
        let response = check_status(response).await?;
        let status = response.json::<StatusResponse>().await?;
        Ok(status.tx_hash)
    }
}

/// Non-2xx answers become `Rejected` with the body kept for the logs.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RelayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = match response.text().await {
        Ok(text) => text,
        Err(_) => "".to_owned(),
    };
    Err(RelayError::Rejected {
        status: status.as_u16(),
        body,
    })
}
