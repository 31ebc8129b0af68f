//! Operation set supported by the SDK.
//!
//! Operations are a closed sum type; adding a kind means adding a variant
//! here and a writer arm in the serializer.

use serde::de::Error as DeError;
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::asset::Asset;
use crate::keystore::KeyRole;

// ============================================================================
// AUTHORITY
// ============================================================================

/// Permission level an operation must be signed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    Active,
    Posting,
}

impl Authority {
    /// Single authority that covers every operation in a batch.
    ///
    /// Active satisfies posting, so any active operation makes the whole batch
    /// active. Nodes reject signatures the batch does not need.
    pub fn for_operations(operations: &[Operation]) -> Authority {
        if operations.iter().any(|op| op.required_authority() == Authority::Active) {
            Authority::Active
        } else {
            Authority::Posting
        }
    }

    pub fn key_role(&self) -> KeyRole {
        match self {
            Authority::Active => KeyRole::Active,
            Authority::Posting => KeyRole::Posting,
        }
    }
}

// ============================================================================
// OPERATION PAYLOADS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteOperation {
    pub voter: String,
    pub author: String,
    pub permlink: String,
    /// Basis points, -10000..=10000
    pub weight: i16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentOperation {
    pub parent_author: String,
    pub parent_permlink: String,
    pub author: String,
    pub permlink: String,
    pub title: String,
    pub body: String,
    pub json_metadata: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOperation {
    pub from: String,
    pub to: String,
    pub amount: Asset,
    pub memo: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferToVestingOperation {
    pub from: String,
    pub to: String,
    pub amount: Asset,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteCommentOperation {
    pub author: String,
    pub permlink: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomJsonOperation {
    pub required_auths: Vec<String>,
    pub required_posting_auths: Vec<String>,
    pub id: String,
    pub json: String,
}

impl CustomJsonOperation {
    /// Build with both auth lists sorted, since the chain treats them as flat sets.
    pub fn new(
        required_auths: &[String],
        required_posting_auths: &[String],
        id: &str,
        json: &str,
    ) -> Self {
        let mut required_auths = required_auths.to_vec();
        required_auths.sort();
        let mut required_posting_auths = required_posting_auths.to_vec();
        required_posting_auths.sort();

        CustomJsonOperation {
            required_auths,
            required_posting_auths,
            id: id.to_string(),
            json: json.to_string(),
        }
    }
}

// ============================================================================
// OPERATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Vote(VoteOperation),
    Comment(CommentOperation),
    Transfer(TransferOperation),
    TransferToVesting(TransferToVestingOperation),
    DeleteComment(DeleteCommentOperation),
    CustomJson(CustomJsonOperation),
}

impl Operation {
    /// Position of the operation in the chain's static variant list
    pub fn id(&self) -> u32 {
        match self {
            Operation::Vote(_) => 0,
            Operation::Comment(_) => 1,
            Operation::Transfer(_) => 2,
            Operation::TransferToVesting(_) => 3,
            Operation::DeleteComment(_) => 17,
            Operation::CustomJson(_) => 18,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Vote(_) => "vote",
            Operation::Comment(_) => "comment",
            Operation::Transfer(_) => "transfer",
            Operation::TransferToVesting(_) => "transfer_to_vesting",
            Operation::DeleteComment(_) => "delete_comment",
            Operation::CustomJson(_) => "custom_json",
        }
    }

    pub fn required_authority(&self) -> Authority {
        match self {
            Operation::Vote(_) | Operation::Comment(_) | Operation::DeleteComment(_) => {
                Authority::Posting
            }
            Operation::Transfer(_) | Operation::TransferToVesting(_) => Authority::Active,
            Operation::CustomJson(op) if !op.required_auths.is_empty() => Authority::Active,
            Operation::CustomJson(_) => Authority::Posting,
        }
    }

    pub fn vote(voter: &str, author: &str, permlink: &str, weight: i16) -> Self {
        Operation::Vote(VoteOperation {
            voter: voter.to_string(),
            author: author.to_string(),
            permlink: permlink.to_string(),
            weight,
        })
    }

    pub fn transfer(from: &str, to: &str, amount: Asset, memo: &str) -> Self {
        Operation::Transfer(TransferOperation {
            from: from.to_string(),
            to: to.to_string(),
            amount,
            memo: memo.to_string(),
        })
    }
}

impl Serialize for Operation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(self.name())?;
        match self {
            Operation::Vote(op) => tuple.serialize_element(op)?,
            Operation::Comment(op) => tuple.serialize_element(op)?,
            Operation::Transfer(op) => tuple.serialize_element(op)?,
            Operation::TransferToVesting(op) => tuple.serialize_element(op)?,
            Operation::DeleteComment(op) => tuple.serialize_element(op)?,
            Operation::CustomJson(op) => tuple.serialize_element(op)?,
        }
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for Operation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (name, body): (String, serde_json::Value) = Deserialize::deserialize(deserializer)?;
        let op = match name.as_str() {
            "vote" => serde_json::from_value(body).map(Operation::Vote),
            "comment" => serde_json::from_value(body).map(Operation::Comment),
            "transfer" => serde_json::from_value(body).map(Operation::Transfer),
            "transfer_to_vesting" => serde_json::from_value(body).map(Operation::TransferToVesting),
            "delete_comment" => serde_json::from_value(body).map(Operation::DeleteComment),
            "custom_json" => serde_json::from_value(body).map(Operation::CustomJson),
            other => return Err(D::Error::custom(format!("unsupported operation '{}'", other))),
        };
        op.map_err(D::Error::custom)
    }
}
