use serde::{Deserialize, Serialize};

use crate::disk::{BackingStore, HEADER_SIZE};
use crate::unit::error::Result;

/// 磁盘头部：块 0 的前 24 字节。
/// bincode 默认配置（定长整数、小端）正好给出固定 24 字节布局：
///
///   bytes  0..4   capacity
///   bytes  4..8   block_size
///   bytes  8..12  first_free_block
///   bytes 12..16  first_free_block_index
///   bytes 16..20  first_free_inode_offset
///   bytes 20..24  inode_count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskHeader {
    pub capacity: u32,                // 磁盘总块数
    pub block_size: u32,              // 每块字节数
    pub first_free_block: u32,        // 空闲块目录根的块号，0 = 磁盘满
    pub first_free_block_index: u32,  // 根目录内的游标
    pub first_free_inode_offset: u32, // 第一个空闲 i-node 的字节偏移，0 = 无
    pub inode_count: u32,             // i-node 总数（空闲 + 已用）
}

impl DiskHeader {
    /// 从块 0 读出头部。
    pub fn load(store: &BackingStore) -> Result<Self> {
        let mut raw = [0u8; HEADER_SIZE as usize];
        store.read_at(0, &mut raw)?;
        let header = bincode::deserialize(&raw)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        Ok(header)
    }

    /// 将头部写回块 0（write-through：每次分配器状态变化都调用）。
    pub fn sync(&self, store: &BackingStore) -> Result<()> {
        let raw = bincode::serialize(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        store.write_at(0, &raw)?;
        Ok(())
    }
}
