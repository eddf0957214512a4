// On-disk constants of the MiniVSFS format.

pub const BLOCK_SIZE: usize = 4096;
pub const MAGIC: u32 = 0x4D56_5346; // "MVSF"
pub const VERSION: u32 = 1;

pub const SUPERBLOCK_SIZE: usize = 116;
pub const INODE_SIZE: usize = 128;
pub const DIRENT_SIZE: usize = 64;

pub const DIRECT_MAX: usize = 12; // direct block pointers per inode
pub const NAME_MAX: usize = 58; // dirent name field, not NUL-terminated when full

pub const ROOT_INODE: u32 = 1; // inode number of root directory("/")
pub const SUPERBLOCK_BLOCK: u64 = 0;
pub const INODE_BITMAP_START: u64 = 1;
pub const DATA_BITMAP_START: u64 = 2;
pub const INODE_TABLE_START: u64 = 3;

pub const BITS_PER_BITMAP_BLOCK: u64 = (BLOCK_SIZE * 8) as u64;
pub const INODES_PER_BLOCK: usize = BLOCK_SIZE / INODE_SIZE;
pub const DIRENTS_PER_BLOCK: usize = BLOCK_SIZE / DIRENT_SIZE;
pub const MAX_FILE_SIZE: u64 = (DIRECT_MAX * BLOCK_SIZE) as u64;

const _: () = assert!(SUPERBLOCK_SIZE <= BLOCK_SIZE);
const _: () = assert!(BLOCK_SIZE % INODE_SIZE == 0);
const _: () = assert!(BLOCK_SIZE % DIRENT_SIZE == 0);

// inode.mode / dirent.type
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InodeType {
    Dir,
    File,
}

impl InodeType {
    pub const fn mode(self) -> u16 {
        match self {
            InodeType::Dir => 0x4000,
            InodeType::File => 0x8000,
        }
    }

    pub const fn dirent_type(self) -> u8 {
        match self {
            InodeType::File => 1,
            InodeType::Dir => 2,
        }
    }

    pub fn from_mode(mode: u16) -> Option<InodeType> {
        match mode {
            0x4000 => Some(InodeType::Dir),
            0x8000 => Some(InodeType::File),
            _ => None,
        }
    }

    pub fn from_dirent_type(t: u8) -> Option<InodeType> {
        match t {
            1 => Some(InodeType::File),
            2 => Some(InodeType::Dir),
            _ => None,
        }
    }
}

impl std::fmt::Display for InodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use InodeType::*;
        match self {
            Dir => write!(f, "directory"),
            File => write!(f, "file"),
        }
    }
}
