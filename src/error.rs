use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    // capacity
    #[error("{total_blocks} blocks leave no data region after the inode table for {inode_count} inodes")]
    Capacity { total_blocks: u64, inode_count: u64 },

    #[error("invalid geometry: {0}")]
    Geometry(String),

    #[error("file too large: {size} bytes, at most {max} fit in direct blocks")]
    FileTooLarge { size: u64, max: u64 },

    // exhaustion
    #[error("no free inode")]
    NoFreeInode,

    #[error("not enough free data blocks: need {needed}, {available} free")]
    NoFreeBlocks { needed: usize, available: usize },

    #[error("no free directory entry slot in root")]
    NoFreeDirEntry,

    // corruption
    #[error("bad magic number: {0:#x}")]
    BadMagic(u32),

    #[error("root directory data block {0} lies outside the data region")]
    CorruptRootPointer(u32),

    #[error("corrupt layout: {0}")]
    CorruptLayout(String),

    // policy / lookup
    #[error("invalid file name: {0:?}")]
    InvalidName(String),

    #[error("{0}: already exists in root")]
    DuplicateName(String),

    #[error("{0}: no such file or directory")]
    NotFound(String),
}
