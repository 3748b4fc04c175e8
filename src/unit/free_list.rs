use crate::disk::BackingStore;
use crate::unit::error::{DiskError, Result};

/// 空闲块分配器。
///
/// 空闲块本身兼作链表元数据的存储：根空闲块的前 block_size/4 个
/// 4 字节槽位是指向其他空闲块的目录，槽位 0 存上一个根的块号
/// （0 表示链表到头）。内存里只保留根块号和游标两个字段，
/// 簿记开销与磁盘大小无关。
#[derive(Debug)]
pub struct FreeBlockAllocator {
    pub first_free_block: u32,       // 当前根目录块号，0 = 无空闲块
    pub first_free_block_index: u32, // 根目录内的游标，[0, block_size/4 - 1]
    block_size: u32,
}

impl FreeBlockAllocator {
    /// 新建磁盘时的空分配器。
    pub fn new(block_size: u32) -> Self {
        Self {
            first_free_block: 0,
            first_free_block_index: 0,
            block_size,
        }
    }

    /// 挂载时从头部字段恢复。
    pub fn from_header(first_free_block: u32, first_free_block_index: u32, block_size: u32) -> Self {
        Self {
            first_free_block,
            first_free_block_index,
            block_size,
        }
    }

    /// 根目录的最后一个槽位下标。
    fn last_slot(&self) -> u32 {
        self.block_size / 4 - 1
    }

    /// 把块 bn 压入空闲链表。
    pub fn register_free_block(&mut self, store: &BackingStore, bn: u32) -> Result<()> {
        let bs = self.block_size as u64;

        if self.first_free_block == 0 {
            // bn 成为第一个根，槽位 0 写哨兵 0 结束链表
            self.first_free_block = bn;
            store.write_u32_at(bn as u64 * bs, 0)?;
            self.first_free_block_index = 0;
        } else if self.first_free_block_index == self.last_slot() {
            // 当前根目录已满：bn 成为新根，指回旧根
            store.write_u32_at(bn as u64 * bs, self.first_free_block)?;
            self.first_free_block = bn;
            self.first_free_block_index = 0;
        } else {
            // 目录未满：bn 记入根块自己的下一个槽位
            self.first_free_block_index += 1;
            store.write_u32_at(
                self.first_free_block as u64 * bs + 4 * self.first_free_block_index as u64,
                bn,
            )?;
        }
        Ok(())
    }

    /// 弹出一个空闲块号。
    pub fn get_free_block_number(&mut self, store: &BackingStore) -> Result<u32> {
        if self.first_free_block == 0 {
            return Err(DiskError::FullDisk);
        }

        let bn = self.first_free_block;
        if self.first_free_block_index != 0 {
            // 消耗根目录的一个槽位，不碰磁盘
            self.first_free_block_index -= 1;
        } else {
            // 根块本身被分出去，链到上一个目录块
            let bs = self.block_size as u64;
            self.first_free_block = store.read_u32_at(bn as u64 * bs)?;
            self.first_free_block_index = self.last_slot();
        }
        Ok(bn)
    }
}
