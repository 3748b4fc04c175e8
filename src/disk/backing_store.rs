use std::{
    fs::{File, OpenOptions},
    io::{self, Read, Seek, SeekFrom, Write},
    path::Path,
    sync::Mutex,
};

use crate::unit::error::{DiskError, Result};

/// 模拟磁盘的宿主文件抽象层。
/// 所有读写都基于 seek 定位，以"块"或 4 字节字为单位。
#[derive(Debug)]
pub struct BackingStore {
    file: Mutex<Option<File>>, // shutdown 之后为 None
    capacity: u32,             // 块总数
    block_size: u32,           // 每块字节数
}

impl BackingStore {
    /// 创建一个新的磁盘文件并预留 capacity * block_size 字节。
    /// 文件已存在时返回 ExistingDisk。
    pub fn create(path: &Path, capacity: u32, block_size: u32) -> Result<Self> {
        if path.exists() {
            return Err(DiskError::ExistingDisk(path.display().to_string()));
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        // 顶分配空间
        file.set_len(capacity as u64 * block_size as u64)?;

        Ok(Self {
            file: Mutex::new(Some(file)),
            capacity,
            block_size,
        })
    }

    /// 打开一个已存在的磁盘文件。
    /// 几何参数此时未知，由调用方读完头部后通过 set_geometry 设置。
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DiskError::NonExistingDisk(path.display().to_string()));
        }

        let file = OpenOptions::new().read(true).write(true).open(path)?;

        Ok(Self {
            file: Mutex::new(Some(file)),
            capacity: 0,
            block_size: 0,
        })
    }

    pub fn set_geometry(&mut self, capacity: u32, block_size: u32) {
        self.capacity = capacity;
        self.block_size = block_size;
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// 读取块 block_id 的全部内容到 buf。
    /// 块号必须在 [0, capacity) 内，头部块可读。
    pub fn read_block(&self, block_id: u32, buf: &mut [u8]) -> Result<()> {
        if block_id >= self.capacity {
            return Err(DiskError::InvalidBlockNumber(block_id));
        }
        if buf.len() != self.block_size as usize {
            return Err(DiskError::InvalidBlock(format!(
                "buffer is {} bytes, block size is {}",
                buf.len(),
                self.block_size
            )));
        }

        let mut guard = self.file.lock().unwrap();
        let file = guard.as_mut().ok_or_else(Self::powered_off)?;
        file.seek(SeekFrom::Start(block_id as u64 * self.block_size as u64))?;
        file.read_exact(buf)?;
        Ok(())
    }

    /// 将 buf 写入块 block_id。
    /// 块 0 是头部，禁止直接写，块号范围 [1, capacity)。
    pub fn write_block(&self, block_id: u32, buf: &[u8]) -> Result<()> {
        if block_id == 0 || block_id >= self.capacity {
            return Err(DiskError::InvalidBlockNumber(block_id));
        }
        if buf.len() != self.block_size as usize {
            return Err(DiskError::InvalidBlock(format!(
                "buffer is {} bytes, block size is {}",
                buf.len(),
                self.block_size
            )));
        }

        let mut guard = self.file.lock().unwrap();
        let file = guard.as_mut().ok_or_else(Self::powered_off)?;
        file.seek(SeekFrom::Start(block_id as u64 * self.block_size as u64))?;
        file.write_all(buf)?;
        Ok(())
    }

    /// 从任意字节偏移读取 buf.len() 个字节。
    /// 供空闲链表、i-node 池和头部等内部结构使用，不做块号检查。
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let mut guard = self.file.lock().unwrap();
        let file = guard.as_mut().ok_or_else(Self::powered_off)?;
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)?;
        Ok(())
    }

    /// 向任意字节偏移写入 buf 的全部内容。
    pub fn write_at(&self, offset: u64, buf: &[u8]) -> Result<()> {
        let mut guard = self.file.lock().unwrap();
        let file = guard.as_mut().ok_or_else(Self::powered_off)?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(buf)?;
        Ok(())
    }

    /// 读取 offset 处的一个小端 u32。
    pub fn read_u32_at(&self, offset: u64) -> Result<u32> {
        let mut word = [0u8; 4];
        self.read_at(offset, &mut word)?;
        Ok(u32::from_le_bytes(word))
    }

    /// 向 offset 处写入一个小端 u32。
    pub fn write_u32_at(&self, offset: u64, value: u32) -> Result<()> {
        self.write_at(offset, &value.to_le_bytes())
    }

    /// 关闭文件句柄，幂等。
    /// 关闭后的任何读写都返回 NotConnected 错误。
    pub fn close(&self) {
        let mut guard = self.file.lock().unwrap();
        guard.take();
    }

    fn powered_off() -> DiskError {
        DiskError::Io(io::Error::new(
            io::ErrorKind::NotConnected,
            "disk is shut down",
        ))
    }
}
