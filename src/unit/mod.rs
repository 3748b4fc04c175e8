use std::path::Path;

use crate::disk::{BackingStore, DEFAULT_BLOCK_SIZE, DEFAULT_CAPACITY, MIN_BLOCK_SIZE};
use crate::unit::{
    error::{DiskError, Result},
    free_list::FreeBlockAllocator,
    header::DiskHeader,
    inode_pool::INodePool,
};

pub mod error;
pub mod free_list;
pub mod header;
pub mod inode_pool;

/// 一个已上电的虚拟磁盘。
/// 分配器和 i-node 池的活动状态都归实例所有，不共享进程级可变量，
/// 同一进程可以同时挂多块盘互不干扰。
#[derive(Debug)]
pub struct DiskUnit {
    store: BackingStore,           // 底层磁盘文件，几何参数也归它管
    allocator: FreeBlockAllocator, // 空闲块链表
    pool: INodePool,               // i-node 池
}

impl DiskUnit {
    /// 创建一块新盘：校验参数、预留文件空间、构建 i-node 池、
    /// 把数据区所有块按升序登记为空闲、写入头部，最后关闭文件
    /// （新盘保持下电状态，用 mount 再上电）。
    pub fn create(path: &Path, capacity: u32, block_size: u32) -> Result<()> {
        if capacity == 0 || !capacity.is_power_of_two() {
            return Err(DiskError::InvalidParameter(format!(
                "capacity must be a positive power of two, got {}",
                capacity
            )));
        }
        if block_size < MIN_BLOCK_SIZE || !block_size.is_power_of_two() {
            return Err(DiskError::InvalidParameter(format!(
                "block size must be a power of two >= {}, got {}",
                MIN_BLOCK_SIZE, block_size
            )));
        }

        // 出错时文件句柄随 store 一起 drop，不泄漏描述符
        let store = BackingStore::create(path, capacity, block_size)?;

        let pool = INodePool::build(&store, capacity, block_size)?;

        let mut allocator = FreeBlockAllocator::new(block_size);
        for bn in pool.first_data_block()..capacity {
            allocator.register_free_block(&store, bn)?;
        }

        DiskHeader {
            capacity,
            block_size,
            first_free_block: allocator.first_free_block,
            first_free_block_index: allocator.first_free_block_index,
            first_free_inode_offset: pool.first_free_inode_offset,
            inode_count: pool.number_of_inodes(),
        }
        .sync(&store)?;

        store.close();
        Ok(())
    }

    /// 用默认几何参数（256 块 × 32 字节）创建。
    pub fn create_default(path: &Path) -> Result<()> {
        Self::create(path, DEFAULT_CAPACITY, DEFAULT_BLOCK_SIZE)
    }

    /// 上电：打开磁盘文件，把头部读进本实例的活动状态。
    pub fn mount(path: &Path) -> Result<Self> {
        let mut store = BackingStore::open(path)?;
        let header = DiskHeader::load(&store)?;
        store.set_geometry(header.capacity, header.block_size);

        let allocator = FreeBlockAllocator::from_header(
            header.first_free_block,
            header.first_free_block_index,
            header.block_size,
        );
        let pool = INodePool::from_header(
            &store,
            header.first_free_inode_offset,
            header.capacity,
            header.block_size,
        )?;

        Ok(Self {
            store,
            allocator,
            pool,
        })
    }

    /// 读块 block_num 到 buf。
    pub fn read(&self, block_num: u32, buf: &mut [u8]) -> Result<()> {
        self.store.read_block(block_num, buf)
    }

    /// 把 buf 写入块 block_num（块 0 受保护）。
    pub fn write(&self, block_num: u32, buf: &[u8]) -> Result<()> {
        self.store.write_block(block_num, buf)
    }

    /// 低级格式化：数据区所有块清零，头部和 i-node 池不动。
    pub fn low_level_format(&self) -> Result<()> {
        self.low_level_format_with(|_, _| {})
    }

    /// 同上，每清完一块回调一次 (已完成, 总数)，供进度条使用。
    pub fn low_level_format_with(&self, mut progress: impl FnMut(u32, u32)) -> Result<()> {
        let zeroes = vec![0u8; self.block_size() as usize];
        let first = self.pool.first_data_block();
        let total = self.capacity() - first;

        for (done, bn) in (first..self.capacity()).enumerate() {
            self.store.write_block(bn, &zeroes)?;
            progress(done as u32 + 1, total);
        }
        Ok(())
    }

    /// 弹出一个空闲块号。分配器状态随即写回头部。
    pub fn get_free_block_number(&mut self) -> Result<u32> {
        let bn = self.allocator.get_free_block_number(&self.store)?;
        self.sync_header()?;
        Ok(bn)
    }

    /// 把块 bn 登记回空闲链表。分配器状态随即写回头部。
    /// 只有数据区的块可以登记，头部和 i-node 池的块号直接拒绝。
    pub fn register_free_block(&mut self, bn: u32) -> Result<()> {
        if bn < self.pool.first_data_block() || bn >= self.capacity() {
            return Err(DiskError::InvalidBlockNumber(bn));
        }
        self.allocator.register_free_block(&self.store, bn)?;
        self.sync_header()
    }

    /// 分配一个空闲 i-node，返回它的字节偏移。
    pub fn get_free_inode(&mut self) -> Result<u32> {
        let offset = self.pool.get_free_inode(&self.store)?;
        self.sync_header()?;
        Ok(offset)
    }

    /// 下电：关闭底层文件，幂等。
    pub fn shutdown(&self) {
        self.store.close();
    }

    // 诊断访问器

    pub fn capacity(&self) -> u32 {
        self.store.capacity()
    }

    pub fn block_size(&self) -> u32 {
        self.store.block_size()
    }

    pub fn first_free_block(&self) -> u32 {
        self.allocator.first_free_block
    }

    pub fn first_free_block_index(&self) -> u32 {
        self.allocator.first_free_block_index
    }

    pub fn first_free_inode_offset(&self) -> u32 {
        self.pool.first_free_inode_offset
    }

    pub fn number_of_inodes(&self) -> u32 {
        self.pool.number_of_inodes()
    }

    pub fn free_inodes(&self) -> u32 {
        self.pool.free_inodes()
    }

    pub fn taken_inodes(&self) -> u32 {
        self.pool.taken_inodes()
    }

    pub fn first_data_block(&self) -> u32 {
        self.pool.first_data_block()
    }

    /// 每次分配器/池状态变化后把头部写回块 0，
    /// 保证两次操作之间掉电也不丢分配状态。
    fn sync_header(&self) -> Result<()> {
        DiskHeader {
            capacity: self.capacity(),
            block_size: self.block_size(),
            first_free_block: self.allocator.first_free_block,
            first_free_block_index: self.allocator.first_free_block_index,
            first_free_inode_offset: self.pool.first_free_inode_offset,
            inode_count: self.pool.number_of_inodes(),
        }
        .sync(&self.store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch_path() -> PathBuf {
        std::env::temp_dir().join(format!("vdisk-unit-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn create_rejects_bad_geometry() {
        let path = scratch_path();
        for (capacity, block_size) in [(255, 32), (256, 31), (0, 32), (256, 0), (100, 48)] {
            let err = DiskUnit::create(&path, capacity, block_size).unwrap_err();
            assert!(
                matches!(err, DiskError::InvalidParameter(_)),
                "({}, {}) should be rejected",
                capacity,
                block_size
            );
            // 参数非法时连文件都不该出现
            assert!(!path.exists());
        }
    }

    #[test]
    fn create_twice_fails_existing_disk() {
        let path = scratch_path();
        DiskUnit::create_default(&path).unwrap();

        let err = DiskUnit::create_default(&path).unwrap_err();
        assert!(matches!(err, DiskError::ExistingDisk(_)));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn mount_of_missing_disk_fails() {
        let err = DiskUnit::mount(&scratch_path()).unwrap_err();
        assert!(matches!(err, DiskError::NonExistingDisk(_)));
    }

    #[test]
    fn fresh_default_disk_header_bytes() {
        let path = scratch_path();
        DiskUnit::create_default(&path).unwrap();

        // 默认盘 256 块 × 32 字节：i-node 池占块 1..=2，共 6 条记录，
        // 数据块 3..=255 升序登记后根目录落在 251、游标 4
        let raw = std::fs::read(&path).unwrap();
        assert_eq!(raw.len(), 256 * 32);
        assert_eq!(&raw[0..4], &256u32.to_le_bytes());
        assert_eq!(&raw[4..8], &32u32.to_le_bytes());
        assert_eq!(&raw[8..12], &251u32.to_le_bytes());
        assert_eq!(&raw[12..16], &4u32.to_le_bytes());
        assert_eq!(&raw[16..20], &41u32.to_le_bytes());
        assert_eq!(&raw[20..24], &6u32.to_le_bytes());

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn mount_loads_header_into_live_state() {
        let path = scratch_path();
        DiskUnit::create_default(&path).unwrap();

        let unit = DiskUnit::mount(&path).unwrap();
        assert_eq!(unit.capacity(), 256);
        assert_eq!(unit.block_size(), 32);
        assert_eq!(unit.first_free_block(), 251);
        assert_eq!(unit.first_free_block_index(), 4);
        assert_eq!(unit.first_free_inode_offset(), 41);
        assert_eq!(unit.number_of_inodes(), 6);
        assert_eq!(unit.first_data_block(), 3);

        unit.shutdown();
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn block_round_trip_and_bounds() {
        let path = scratch_path();
        DiskUnit::create_default(&path).unwrap();
        let unit = DiskUnit::mount(&path).unwrap();

        let data: Vec<u8> = (0..32u8).collect();
        unit.write(100, &data).unwrap();
        let mut back = vec![0u8; 32];
        unit.read(100, &mut back).unwrap();
        assert_eq!(data, back);

        // 头部块禁止写，读到容量上界都要报 InvalidBlockNumber
        assert!(matches!(
            unit.write(0, &data),
            Err(DiskError::InvalidBlockNumber(0))
        ));
        assert!(matches!(
            unit.write(256, &data),
            Err(DiskError::InvalidBlockNumber(256))
        ));
        assert!(matches!(
            unit.read(256, &mut back),
            Err(DiskError::InvalidBlockNumber(256))
        ));

        unit.shutdown();
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn allocate_then_release_restores_allocator_state() {
        let path = scratch_path();
        DiskUnit::create_default(&path).unwrap();
        let mut unit = DiskUnit::mount(&path).unwrap();

        let before = (unit.first_free_block(), unit.first_free_block_index());
        let bn = unit.get_free_block_number().unwrap();
        unit.register_free_block(bn).unwrap();
        assert_eq!(
            (unit.first_free_block(), unit.first_free_block_index()),
            before
        );

        unit.shutdown();
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn register_rejects_blocks_outside_the_data_region() {
        let path = scratch_path();
        DiskUnit::create_default(&path).unwrap();
        let mut unit = DiskUnit::mount(&path).unwrap();

        // 头部、i-node 池和越界块号都不能进空闲链表
        for bn in [0u32, 1, 2, 256] {
            assert!(matches!(
                unit.register_free_block(bn),
                Err(DiskError::InvalidBlockNumber(_))
            ));
        }

        unit.shutdown();
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn allocator_state_survives_remount() {
        let path = scratch_path();
        DiskUnit::create_default(&path).unwrap();

        let mut unit = DiskUnit::mount(&path).unwrap();
        assert_eq!(unit.get_free_block_number().unwrap(), 251);
        assert_eq!(unit.get_free_block_number().unwrap(), 251);
        let inode = unit.get_free_inode().unwrap();
        assert_eq!(inode, 41);
        unit.shutdown();

        // 头部是随操作写回的，重新挂载要看到同样的状态
        let unit = DiskUnit::mount(&path).unwrap();
        assert_eq!(unit.first_free_block(), 251);
        assert_eq!(unit.first_free_block_index(), 2);
        assert_eq!(unit.first_free_inode_offset(), 50);
        assert_eq!(unit.number_of_inodes(), 6);
        assert_eq!(unit.free_inodes(), 4);

        unit.shutdown();
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn inode_pool_exhaustion_through_the_facade() {
        let path = scratch_path();
        DiskUnit::create_default(&path).unwrap();
        let mut unit = DiskUnit::mount(&path).unwrap();

        let total = unit.number_of_inodes();
        let mut allocated = 0;
        while unit.get_free_inode().is_ok() {
            allocated += 1;
            assert!(allocated < total);
        }
        // 根目录预占一条
        assert_eq!(allocated, total - 1);
        assert!(matches!(unit.get_free_inode(), Err(DiskError::FullDisk)));

        unit.shutdown();
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn low_level_format_zeroes_only_the_data_region() {
        let path = scratch_path();
        DiskUnit::create_default(&path).unwrap();
        let unit = DiskUnit::mount(&path).unwrap();

        let data = vec![0xabu8; 32];
        unit.write(100, &data).unwrap();
        unit.low_level_format().unwrap();

        let mut buf = vec![0u8; 32];
        for bn in [3u32, 100, 255] {
            unit.read(bn, &mut buf).unwrap();
            assert!(buf.iter().all(|&b| b == 0), "block {} not zeroed", bn);
        }

        // 头部原样保留
        unit.read(0, &mut buf).unwrap();
        assert_eq!(&buf[0..4], &256u32.to_le_bytes());
        assert_eq!(&buf[8..12], &251u32.to_le_bytes());
        // i-node 池原样保留：根目录的类型字节还是 1
        unit.read(1, &mut buf).unwrap();
        assert_eq!(buf[8], 1);

        unit.shutdown();
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn two_disks_keep_independent_state() {
        let path_a = scratch_path();
        let path_b = scratch_path();
        DiskUnit::create_default(&path_a).unwrap();
        DiskUnit::create(&path_b, 512, 64).unwrap();

        let mut a = DiskUnit::mount(&path_a).unwrap();
        let b = DiskUnit::mount(&path_b).unwrap();

        let before_b = (b.first_free_block(), b.first_free_block_index());
        a.get_free_block_number().unwrap();
        a.get_free_block_number().unwrap();

        // a 上的分配不能影响 b 的活动状态
        assert_eq!((b.first_free_block(), b.first_free_block_index()), before_b);
        assert_eq!(b.capacity(), 512);
        assert_eq!(b.block_size(), 64);

        a.shutdown();
        b.shutdown();
        std::fs::remove_file(&path_a).unwrap();
        std::fs::remove_file(&path_b).unwrap();
    }
}
