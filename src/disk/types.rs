/// 默认磁盘容量：256 个逻辑块
/// createdisk 不带几何参数时使用。
pub const DEFAULT_CAPACITY: u32 = 256;

/// 默认块大小：32 字节
pub const DEFAULT_BLOCK_SIZE: u32 = 32;

/// 块大小下限（字节）
/// 头部要占 24 字节，小于 32 的块放不下任何有用结构。
pub const MIN_BLOCK_SIZE: u32 = 32;

/// 磁盘头部大小：块 0 的前 24 字节（六个小端 u32）
pub const HEADER_SIZE: u32 = 24;

/// 每个 i-node 记录的大小（字节）：
/// 4 字节指针 + 4 字节大小 + 1 字节类型
pub const INODE_SIZE: u32 = 9;
