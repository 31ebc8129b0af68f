// ============================================================================
// Protocol Module - Chain Data Types & Serialization
// ============================================================================
//
// Components:
//   - asset: fixed-precision amounts ("1.000 STEEM")
//   - operation: the closed operation set and required authorities
//   - transaction: unsigned/signed transactions, chain id, ref-block helpers
//   - serializer: graphene binary encoding used for digests
//
// ============================================================================

pub mod asset;
pub mod operation;
pub mod serializer;
pub mod transaction;

pub use asset::Asset;
pub use operation::{
    Authority, CommentOperation, CustomJsonOperation, DeleteCommentOperation, Operation,
    TransferOperation, TransferToVestingOperation, VoteOperation,
};
pub use serializer::{GrapheneSerializer, TransactionSerializer};
pub use transaction::{ref_block_num, ref_block_prefix, ChainId, SignedTransaction, Transaction};
