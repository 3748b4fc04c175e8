use serde::{Deserialize, Serialize};

use crate::disk::{BackingStore, INODE_SIZE};
use crate::unit::error::{DiskError, Result};

/// i-node 类型字节
pub const INODE_FREE: u8 = 0;
pub const INODE_TAKEN: u8 = 1;

/// 一条 9 字节的 i-node 记录。
/// bincode 定长编码正好落在 9 字节上：4 + 4 + 1。
/// 空闲时 next_or_first 存下一个空闲 i-node 的字节偏移（0 结束链表），
/// 已用时存文件的第一个数据块号。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct INode {
    pub next_or_first: u32,
    pub size: u32,
    pub kind: u8,
}

impl INode {
    fn free(next: u32) -> Self {
        Self {
            next_or_first: next,
            size: 0,
            kind: INODE_FREE,
        }
    }

    fn taken() -> Self {
        Self {
            next_or_first: 0,
            size: 0,
            kind: INODE_TAKEN,
        }
    }

    /// 从磁盘偏移 offset 处读一条记录。
    pub fn load(store: &BackingStore, offset: u32) -> Result<Self> {
        let mut raw = [0u8; INODE_SIZE as usize];
        store.read_at(offset as u64, &mut raw)?;
        let node = bincode::deserialize(&raw)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        Ok(node)
    }

    /// 把记录写到磁盘偏移 offset 处。
    pub fn sync(&self, store: &BackingStore, offset: u32) -> Result<()> {
        let raw = bincode::serialize(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        store.write_at(offset as u64, &raw)?;
        Ok(())
    }
}

/// i-node 池：头部之后前 floor(capacity/100) 个块组成的定长记录区。
/// 空闲记录按字节偏移串成链表，已用记录只计数。
/// 记录不跨块：每块只放 floor(block_size/9) 条，块尾的碎字节空着。
#[derive(Debug)]
pub struct INodePool {
    pub first_free_inode_offset: u32, // 空闲链表头的字节偏移，0 = 无空闲
    free_count: u32,
    taken_count: u32,
    reserved_blocks: u32,
}

impl INodePool {
    /// 池占用的块数。
    pub fn reserved_blocks(capacity: u32) -> u32 {
        capacity / 100
    }

    /// 每块能放多少条记录。
    pub fn inodes_per_block(block_size: u32) -> u32 {
        block_size / INODE_SIZE
    }

    /// 新建磁盘时构建整个池：顺序走过每个保留块，切出 9 字节槽位，
    /// 把空闲链表写上盘。i-node 0 直接标为已用，代表根目录。
    pub fn build(store: &BackingStore, capacity: u32, block_size: u32) -> Result<Self> {
        let reserved = Self::reserved_blocks(capacity);
        let per_block = Self::inodes_per_block(block_size);
        let total = reserved * per_block;

        for b in 0..reserved {
            for j in 0..per_block {
                let index = b * per_block + j;
                let offset = (1 + b) * block_size + j * INODE_SIZE;

                let node = if index == 0 {
                    // i-node 0：预分配给根目录，不进空闲链表
                    INode::taken()
                } else if index == total - 1 {
                    // 整个池的最后一条，链表到头
                    INode::free(0)
                } else if j == per_block - 1 {
                    // 本块最后一条：跳过块尾碎字节，指向下一块的第一条
                    INode::free((1 + b + 1) * block_size)
                } else {
                    INode::free(offset + INODE_SIZE)
                };
                node.sync(store, offset)?;
            }
        }

        let first_free = if total > 1 {
            block_size + INODE_SIZE // i-node 1
        } else {
            0
        };

        Ok(Self {
            first_free_inode_offset: first_free,
            free_count: total.saturating_sub(1),
            taken_count: total.min(1),
            reserved_blocks: reserved,
        })
    }

    /// 挂载时从头部字段恢复。空闲数通过走一遍链表重算，
    /// 已用数 = 总数 - 空闲数。
    pub fn from_header(
        store: &BackingStore,
        first_free_inode_offset: u32,
        capacity: u32,
        block_size: u32,
    ) -> Result<Self> {
        let reserved = Self::reserved_blocks(capacity);
        let total = reserved * Self::inodes_per_block(block_size);

        let mut free_count = 0;
        let mut offset = first_free_inode_offset;
        // 链表长度不可能超过总数，防止损坏的镜像让我们转圈
        while offset != 0 && free_count < total {
            free_count += 1;
            offset = store.read_u32_at(offset as u64)?;
        }

        Ok(Self {
            first_free_inode_offset,
            free_count,
            taken_count: total - free_count,
            reserved_blocks: reserved,
        })
    }

    /// 弹出空闲链表头，移入已用集合，返回它的字节偏移。
    pub fn get_free_inode(&mut self, store: &BackingStore) -> Result<u32> {
        if self.first_free_inode_offset == 0 {
            return Err(DiskError::FullDisk);
        }

        let offset = self.first_free_inode_offset;
        let node = INode::load(store, offset)?;
        self.first_free_inode_offset = node.next_or_first;

        INode::taken().sync(store, offset)?;
        self.free_count -= 1;
        self.taken_count += 1;
        Ok(offset)
    }

    /// i-node 总数 = 空闲 + 已用，按需重算。
    pub fn number_of_inodes(&self) -> u32 {
        self.free_count + self.taken_count
    }

    pub fn free_inodes(&self) -> u32 {
        self.free_count
    }

    pub fn taken_inodes(&self) -> u32 {
        self.taken_count
    }

    /// 数据区的第一个块号（池后面紧跟的块）。
    pub fn first_data_block(&self) -> u32 {
        self.reserved_blocks + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch_store(capacity: u32, block_size: u32) -> (BackingStore, PathBuf) {
        let path = std::env::temp_dir().join(format!("vdisk-pool-{}", uuid::Uuid::new_v4()));
        let store = BackingStore::create(&path, capacity, block_size).unwrap();
        (store, path)
    }

    #[test]
    fn geometry_of_the_default_disk() {
        // 256 块 / 32 字节：2 个保留块，每块 3 条，共 6 条
        assert_eq!(INodePool::reserved_blocks(256), 2);
        assert_eq!(INodePool::inodes_per_block(32), 3);

        let (store, path) = scratch_store(256, 32);
        let pool = INodePool::build(&store, 256, 32).unwrap();

        assert_eq!(pool.number_of_inodes(), 6);
        assert_eq!(pool.first_data_block(), 3);
        // 链表头 = i-node 1 的偏移
        assert_eq!(pool.first_free_inode_offset, 41);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn root_inode_is_pre_taken() {
        let (store, path) = scratch_store(256, 32);
        let pool = INodePool::build(&store, 256, 32).unwrap();

        let root = INode::load(&store, 32).unwrap();
        assert_eq!(root.kind, INODE_TAKEN);
        assert_eq!(pool.taken_inodes(), 1);
        assert_eq!(pool.free_inodes(), 5);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn no_record_crosses_a_block_boundary() {
        let (store, path) = scratch_store(256, 32);
        INodePool::build(&store, 256, 32).unwrap();

        // 顺着链表检查每条记录都整体落在一个块内
        let mut offset = 41u32;
        while offset != 0 {
            assert!(
                offset % 32 + INODE_SIZE <= 32,
                "record at offset {} straddles a block boundary",
                offset
            );
            offset = store.read_u32_at(offset as u64).unwrap();
        }

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn chain_skips_block_tail_slack() {
        let (store, path) = scratch_store(256, 32);
        INodePool::build(&store, 256, 32).unwrap();

        // 块 1 的记录在 32/41/50，块 2 的在 64/73/82：
        // 50 处的链指针必须跳过 59..64 的碎字节直达 64
        assert_eq!(store.read_u32_at(50).unwrap(), 64);
        // 最后一条用 0 结束
        assert_eq!(store.read_u32_at(82).unwrap(), 0);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn allocation_runs_to_full_disk() {
        let (store, path) = scratch_store(256, 32);
        let mut pool = INodePool::build(&store, 256, 32).unwrap();
        let total = pool.number_of_inodes();

        let mut allocated = 0;
        while let Ok(offset) = pool.get_free_inode(&store) {
            allocated += 1;
            let node = INode::load(&store, offset).unwrap();
            assert_eq!(node.kind, INODE_TAKEN);
            assert!(allocated < total, "allocated more inodes than the pool holds");
        }

        // 根目录占掉一条，其余全部可分配
        assert_eq!(allocated, total - 1);
        assert!(matches!(
            pool.get_free_inode(&store),
            Err(DiskError::FullDisk)
        ));
        assert_eq!(pool.number_of_inodes(), total);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn mount_recovers_counts_from_the_chain() {
        let (store, path) = scratch_store(256, 32);
        let mut pool = INodePool::build(&store, 256, 32).unwrap();
        pool.get_free_inode(&store).unwrap();
        pool.get_free_inode(&store).unwrap();

        let reloaded =
            INodePool::from_header(&store, pool.first_free_inode_offset, 256, 32).unwrap();
        assert_eq!(reloaded.free_inodes(), 3);
        assert_eq!(reloaded.taken_inodes(), 3);
        assert_eq!(reloaded.number_of_inodes(), 6);

        std::fs::remove_file(&path).unwrap();
    }
}
