use std::fmt;

/// 磁盘模拟器错误类型
#[derive(Debug)]
pub enum DiskError {
    Io(std::io::Error),       // 底层 I/O 错误
    ExistingDisk(String),     // 创建时磁盘名已存在
    NonExistingDisk(String),  // 挂载目标不存在
    InvalidParameter(String), // 容量/块大小参数非法
    InvalidBlockNumber(u32),  // 块号越界
    InvalidBlock(String),     // 缓冲区大小与块不符
    FullDisk,                 // 没有空闲块或空闲 i-node
    NotMounted,               // 操作要求先挂载磁盘
}

impl From<std::io::Error> for DiskError {
    fn from(e: std::io::Error) -> Self {
        DiskError::Io(e)
    }
}

// 实现 Display trait，用于打印错误信息
impl fmt::Display for DiskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "Disk I/O error: {}", e),
            Self::ExistingDisk(name) => write!(f, "Disk name is already used: {}", name),
            Self::NonExistingDisk(name) => write!(f, "No disk has name: {}", name),
            Self::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            Self::InvalidBlockNumber(bn) => write!(f, "Invalid block location: {}", bn),
            Self::InvalidBlock(msg) => write!(f, "Invalid block: {}", msg),
            Self::FullDisk => write!(f, "Disk is full"),
            Self::NotMounted => write!(f, "No disk mounted"),
        }
    }
}

// 支持链式错误，方便追踪底层原因
impl std::error::Error for DiskError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// 磁盘模拟器统一结果类型
pub type Result<T> = std::result::Result<T, DiskError>;
