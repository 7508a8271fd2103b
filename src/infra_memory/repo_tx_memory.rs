use crate::domain_port::{StorageTx, TxManager};

/// The memory backend applies writes immediately; the transaction object
/// only satisfies the port. The one multi-record decision that matters,
/// consuming a record during rotation, is a compare-and-set under the map
/// lock and stays race-free without transactional isolation.
pub struct MemoryTxManager;

#[async_trait::async_trait]
impl TxManager for MemoryTxManager {
    async fn begin<'t>(&'t self) -> anyhow::Result<Box<dyn StorageTx<'t> + 't>> {
        Ok(Box::new(MemoryTx))
    }
}

pub struct MemoryTx;

#[async_trait::async_trait]
impl<'t> StorageTx<'t> for MemoryTx {
    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> anyhow::Result<()> {
        Ok(())
    }
}
