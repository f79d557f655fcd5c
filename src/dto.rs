use rocket::serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// Body of the periodic submission request, shaped the way the relay's
/// `/sendTransaction` endpoint expects it.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct TxRequest {
    #[serde(rename = "functionSignature")]
    pub function_signature: String,
    pub args: Vec<Json>,
    #[serde(rename = "rpcUrl")]
    pub rpc_url: String,
    #[serde(rename = "contractAddress")]
    pub contract_address: String,
    #[serde(rename = "backendWallet")]
    pub backend_wallet: String,
    #[serde(rename = "chainId")]
    pub chain_id: u64,
}

impl TxRequest {
    pub fn new(config: &crate::pool::ServiceConfig) -> TxRequest {
        TxRequest {
            function_signature: config.function_signature.to_owned(),
            args: vec![],
            rpc_url: config.rpc_url.to_owned(),
            contract_address: config.contract_address.to_owned(),
            backend_wallet: config.backend_wallet.to_owned(),
            chain_id: config.chain_id,
        }
    }
}

/// `queue_poll` relay answer to a submission.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct QueueSubmitResponse {
    #[serde(rename = "queueId")]
    pub queue_id: Option<String>,
}

/// `sync_hash` relay answer to a submission.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct SyncSubmitResponse {
    pub success: bool,
    #[serde(rename = "txHash")]
    pub tx_hash: Option<String>,
}

/// Answer of `GET /transactionStatus/{queueId}`; `txHash` stays absent until
/// the transaction is confirmed.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct StatusResponse {
    #[serde(rename = "txHash")]
    pub tx_hash: Option<String>,
}

/// Inbound webhook body. The wrapper is optional so that its absence can be
/// answered with a plain 400 instead of a catcher.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct DagRunPayload {
    pub conf: Option<EventConf>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct EventConf {
    pub transaction_id: String,
    pub block_number: Option<i64>,
    pub event_name: Option<String>,
    pub event_data: Option<Json>,
}
