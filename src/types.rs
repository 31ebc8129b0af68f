/// Steem SDK - Node Data Types
///
/// JSON-RPC framing plus the chain objects returned by `condenser_api`.
/// Only the fields the SDK reads are typed; unknown fields are ignored.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// JSON-RPC FRAMING
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Vec<Value>,
    pub id: u64,
}

impl RpcRequest {
    pub fn new(method: &str, params: Vec<Value>, id: u64) -> Self {
        RpcRequest {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
            id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

/// The `error` member of a failed JSON-RPC response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

// ============================================================================
// CHAIN OBJECTS
// ============================================================================

/// Subset of `get_dynamic_global_properties`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicGlobalProperties {
    pub head_block_number: u32,
    pub head_block_id: String,
    #[serde(default)]
    pub time: String,
    pub last_irreversible_block_num: u32,
    /// Not reported by every node version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_irreversible_block_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Id of the parent block
    pub previous: String,
    pub timestamp: String,
    #[serde(default)]
    pub witness: String,
    #[serde(default)]
    pub transaction_merkle_root: String,
    #[serde(default)]
    pub witness_signature: String,
    #[serde(default)]
    pub transactions: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_id: Option<String>,
    #[serde(default)]
    pub transaction_ids: Vec<String>,
}

/// A fetched block tagged with its number.
///
/// `block` is `None` only when the node had no such block.
#[derive(Debug, Clone, PartialEq)]
pub struct WrapBlock {
    pub block_num: u32,
    pub block: Option<Block>,
}

/// Node reply to `broadcast_transaction_synchronous`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastResult {
    pub id: String,
    pub block_num: u32,
    pub trx_num: u32,
    #[serde(default)]
    pub expired: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_properties_from_node_json() {
        let props: DynamicGlobalProperties = serde_json::from_value(json!({
            "head_block_number": 20_248_488,
            "head_block_id": "0134f7a8e2ab5df7a1b5d5e4f11f9b4d3f4ac6a1",
            "time": "2018-02-22T09:35:12",
            "last_irreversible_block_num": 20_248_470,
            "current_supply": "271009286.023 STEEM",
        }))
        .unwrap();

        assert_eq!(props.head_block_number, 20_248_488);
        assert_eq!(props.last_irreversible_block_num, 20_248_470);
        assert!(props.last_irreversible_block_id.is_none());
    }

    #[test]
    fn test_block_defaults() {
        let block: Block = serde_json::from_value(json!({
            "previous": "0134f7a7aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
            "timestamp": "2018-02-22T09:35:12",
        }))
        .unwrap();
        assert!(block.transactions.is_empty());
        assert!(block.block_id.is_none());
    }

    #[test]
    fn test_rpc_error_response() {
        let resp: RpcResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "error": {"code": -32003, "message": "missing required posting authority"},
            "id": 1,
        }))
        .unwrap();
        assert!(resp.result.is_none());
        assert_eq!(resp.error.unwrap().code, -32003);
    }
}
