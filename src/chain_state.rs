/// Chain-state collaborator used by transaction assembly and block fetching.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Block, DynamicGlobalProperties};

/// Read-only view of the chain head and its blocks.
///
/// `RpcClient` is the production implementation; tests plug in fakes.
#[async_trait]
pub trait ChainState: Send + Sync {
    async fn get_chain_head_properties(&self) -> Result<DynamicGlobalProperties>;

    /// `Ok(None)` when the node has no block at that height yet
    async fn get_block(&self, block_num: u32) -> Result<Option<Block>>;
}

#[async_trait]
impl<T: ChainState + ?Sized> ChainState for std::sync::Arc<T> {
    async fn get_chain_head_properties(&self) -> Result<DynamicGlobalProperties> {
        (**self).get_chain_head_properties().await
    }

    async fn get_block(&self, block_num: u32) -> Result<Option<Block>> {
        (**self).get_block(block_num).await
    }
}

#[async_trait]
impl<T: ChainState + ?Sized> ChainState for &T {
    async fn get_chain_head_properties(&self) -> Result<DynamicGlobalProperties> {
        (**self).get_chain_head_properties().await
    }

    async fn get_block(&self, block_num: u32) -> Result<Option<Block>> {
        (**self).get_block(block_num).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct StaticChain;

    #[async_trait]
    impl ChainState for StaticChain {
        async fn get_chain_head_properties(&self) -> Result<DynamicGlobalProperties> {
            Ok(DynamicGlobalProperties {
                head_block_number: 42,
                head_block_id: "0000002a00000000000000000000000000000000".into(),
                time: String::new(),
                last_irreversible_block_num: 40,
                last_irreversible_block_id: None,
            })
        }

        async fn get_block(&self, _block_num: u32) -> Result<Option<Block>> {
            Ok(None)
        }
    }

    #[test]
    fn test_wrappers_delegate() {
        let shared: Arc<dyn ChainState> = Arc::new(StaticChain);
        let props = tokio_test::block_on(shared.get_chain_head_properties()).unwrap();
        assert_eq!(props.head_block_number, 42);

        let chain = StaticChain;
        let by_ref = &chain;
        assert_eq!(tokio_test::block_on(by_ref.get_block(7)).unwrap(), None);
    }
}
