/// Graphene binary serialization for transactions.
///
/// Operation order and the extension list are written exactly as held by the
/// transaction; nothing is sorted or deduplicated here.

use super::asset::Asset;
use super::operation::Operation;
use super::transaction::Transaction;
use crate::error::{Error, Result};

/// Canonical byte serializer used to compute transaction digests.
pub trait TransactionSerializer: Send + Sync {
    fn serialize(&self, tx: &Transaction) -> Result<Vec<u8>>;
}

/// The chain's native little-endian, varint-prefixed encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrapheneSerializer;

impl TransactionSerializer for GrapheneSerializer {
    fn serialize(&self, tx: &Transaction) -> Result<Vec<u8>> {
        let mut w = Writer::default();

        w.u16(tx.ref_block_num);
        w.u32(tx.ref_block_prefix);

        let expiration = u32::try_from(tx.expiration.timestamp()).map_err(|_| {
            Error::Serialization(format!("expiration {} out of range", tx.expiration))
        })?;
        w.u32(expiration);

        w.varint(tx.operations.len() as u32);
        for op in &tx.operations {
            write_operation(&mut w, op);
        }

        if !tx.extensions.is_empty() {
            return Err(Error::Serialization(
                "transaction extensions are not supported".into(),
            ));
        }
        w.varint(0);

        Ok(w.into_bytes())
    }
}

fn write_operation(w: &mut Writer, op: &Operation) {
    w.varint(op.id());
    match op {
        Operation::Vote(v) => {
            w.string(&v.voter);
            w.string(&v.author);
            w.string(&v.permlink);
            w.i16(v.weight);
        }
        Operation::Comment(c) => {
            w.string(&c.parent_author);
            w.string(&c.parent_permlink);
            w.string(&c.author);
            w.string(&c.permlink);
            w.string(&c.title);
            w.string(&c.body);
            w.string(&c.json_metadata);
        }
        Operation::Transfer(t) => {
            w.string(&t.from);
            w.string(&t.to);
            w.asset(&t.amount);
            w.string(&t.memo);
        }
        Operation::TransferToVesting(t) => {
            w.string(&t.from);
            w.string(&t.to);
            w.asset(&t.amount);
        }
        Operation::DeleteComment(d) => {
            w.string(&d.author);
            w.string(&d.permlink);
        }
        Operation::CustomJson(c) => {
            w.string_set(&c.required_auths);
            w.string_set(&c.required_posting_auths);
            w.string(&c.id);
            w.string(&c.json);
        }
    }
}

#[derive(Default)]
struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn varint(&mut self, mut v: u32) {
        loop {
            let byte = (v & 0x7f) as u8;
            v >>= 7;
            if v == 0 {
                self.buf.push(byte);
                return;
            }
            self.buf.push(byte | 0x80);
        }
    }

    fn string(&mut self, s: &str) {
        self.varint(s.len() as u32);
        self.buf.extend_from_slice(s.as_bytes());
    }

    fn string_set(&mut self, items: &[String]) {
        self.varint(items.len() as u32);
        for item in items {
            self.string(item);
        }
    }

    fn asset(&mut self, asset: &Asset) {
        self.buf.extend_from_slice(&asset.to_bytes());
    }

    fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::operation::CustomJsonOperation;
    use chrono::{TimeZone, Utc};

    fn tx_with(ops: Vec<Operation>) -> Transaction {
        Transaction {
            ref_block_num: 0x1234,
            ref_block_prefix: 0xdead_beef,
            expiration: Utc.with_ymd_and_hms(2026, 10, 17, 12, 10, 0).unwrap(),
            operations: ops,
            extensions: vec![],
        }
    }

    #[test]
    fn test_vote_transaction_bytes() {
        let tx = tx_with(vec![Operation::vote("alice", "bob", "p", 10000)]);
        let bytes = GrapheneSerializer.serialize(&tx).unwrap();
        assert_eq!(
            hex::encode(bytes),
            "3412efbeadde9865d36a010005616c69636503626f620170102700"
        );
    }

    #[test]
    fn test_transfer_operation_bytes() {
        let mut w = Writer::default();
        write_operation(&mut w, &Operation::transfer("alice", "bob", Asset::steem(1000), "memo"));
        assert_eq!(
            hex::encode(w.into_bytes()),
            "0205616c69636503626f62e80300000000000003535445454d0000046d656d6f"
        );
    }

    #[test]
    fn test_custom_json_operation_bytes() {
        let mut w = Writer::default();
        let op = CustomJsonOperation::new(&[], &["alice".into()], "follow", "{}");
        write_operation(&mut w, &Operation::CustomJson(op));
        assert_eq!(hex::encode(w.into_bytes()), "12000105616c69636506666f6c6c6f77027b7d");
    }

    #[test]
    fn test_varint() {
        let mut w = Writer::default();
        w.varint(300);
        w.varint(0);
        w.varint(127);
        assert_eq!(hex::encode(w.into_bytes()), "ac02007f");
    }

    #[test]
    fn test_operation_order_preserved() {
        let a = tx_with(vec![
            Operation::vote("alice", "bob", "p", 1),
            Operation::vote("alice", "bob", "q", 1),
        ]);
        let b = tx_with(vec![
            Operation::vote("alice", "bob", "q", 1),
            Operation::vote("alice", "bob", "p", 1),
        ]);
        assert_ne!(
            GrapheneSerializer.serialize(&a).unwrap(),
            GrapheneSerializer.serialize(&b).unwrap()
        );
    }

    #[test]
    fn test_extensions_rejected() {
        let mut tx = tx_with(vec![Operation::vote("alice", "bob", "p", 1)]);
        tx.extensions.push(serde_json::json!({"x": 1}));
        assert!(matches!(GrapheneSerializer.serialize(&tx), Err(Error::Serialization(_))));
    }
}
