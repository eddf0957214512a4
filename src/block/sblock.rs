use crate::checksum::crc32;
use crate::converter::*;
use crate::error::{Error, Result};
use crate::types::*;

// field offsets inside block 0
const OFF_MAGIC: usize = 0;
const OFF_VERSION: usize = 4;
const OFF_BLOCK_SIZE: usize = 8;
const OFF_TOTAL_BLOCKS: usize = 12;
const OFF_INODE_COUNT: usize = 20;
const OFF_INODE_BITMAP_START: usize = 28;
const OFF_INODE_BITMAP_BLOCKS: usize = 36;
const OFF_DATA_BITMAP_START: usize = 44;
const OFF_DATA_BITMAP_BLOCKS: usize = 52;
const OFF_INODE_TABLE_START: usize = 60;
const OFF_INODE_TABLE_BLOCKS: usize = 68;
const OFF_DATA_REGION_START: usize = 76;
const OFF_DATA_REGION_BLOCKS: usize = 84;
const OFF_ROOT_INODE: usize = 92;
const OFF_MTIME: usize = 100;
const OFF_FLAGS: usize = 108;
const OFF_CHECKSUM: usize = 112;

const _: () = assert!(OFF_CHECKSUM + 4 == SUPERBLOCK_SIZE);

// Super Block
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Superblock {
    pub magic: u32,
    pub version: u32,
    pub block_size: u32,
    pub total_blocks: u64,
    pub inode_count: u64,
    pub inode_bitmap_start: u64,
    pub inode_bitmap_blocks: u64,
    pub data_bitmap_start: u64,
    pub data_bitmap_blocks: u64,
    pub inode_table_start: u64,
    pub inode_table_blocks: u64,
    pub data_region_start: u64,
    pub data_region_blocks: u64,
    pub root_inode: u64,
    pub mtime_epoch: u64,
    pub flags: u32,
    pub checksum: u32, // crc32 of block 0 minus its last 4 bytes, this field zeroed
}

impl Superblock {
    /// Serializes into a zero-padded block.
    pub fn to_block(&self) -> [u8; BLOCK_SIZE] {
        let mut b = [0u8; BLOCK_SIZE];
        write_u32(&mut b, OFF_MAGIC, self.magic);
        write_u32(&mut b, OFF_VERSION, self.version);
        write_u32(&mut b, OFF_BLOCK_SIZE, self.block_size);
        write_u64(&mut b, OFF_TOTAL_BLOCKS, self.total_blocks);
        write_u64(&mut b, OFF_INODE_COUNT, self.inode_count);
        write_u64(&mut b, OFF_INODE_BITMAP_START, self.inode_bitmap_start);
        write_u64(&mut b, OFF_INODE_BITMAP_BLOCKS, self.inode_bitmap_blocks);
        write_u64(&mut b, OFF_DATA_BITMAP_START, self.data_bitmap_start);
        write_u64(&mut b, OFF_DATA_BITMAP_BLOCKS, self.data_bitmap_blocks);
        write_u64(&mut b, OFF_INODE_TABLE_START, self.inode_table_start);
        write_u64(&mut b, OFF_INODE_TABLE_BLOCKS, self.inode_table_blocks);
        write_u64(&mut b, OFF_DATA_REGION_START, self.data_region_start);
        write_u64(&mut b, OFF_DATA_REGION_BLOCKS, self.data_region_blocks);
        write_u64(&mut b, OFF_ROOT_INODE, self.root_inode);
        write_u64(&mut b, OFF_MTIME, self.mtime_epoch);
        write_u32(&mut b, OFF_FLAGS, self.flags);
        write_u32(&mut b, OFF_CHECKSUM, self.checksum);
        b
    }

    /// Computes the checksum over the serialized block, stores and returns it.
    pub fn finalize_checksum(&mut self) -> u32 {
        self.checksum = 0;
        let block = self.to_block();
        self.checksum = crc32(&block[..BLOCK_SIZE - 4]);
        self.checksum
    }

    /// Checks the stored checksum against the raw bytes of block 0, padding
    /// included.
    pub fn verify_checksum(block: &[u8]) -> bool {
        if block.len() < BLOCK_SIZE {
            return false;
        }
        let mut copy = [0u8; BLOCK_SIZE];
        copy.copy_from_slice(&block[..BLOCK_SIZE]);
        let stored = read_u32(&copy, OFF_CHECKSUM);
        write_u32(&mut copy, OFF_CHECKSUM, 0);
        crc32(&copy[..BLOCK_SIZE - 4]) == stored
    }
}

/// Decodes the superblock from the start of an image.
pub fn u8_slice_as_superblock(s: &[u8]) -> Result<Superblock> {
    if s.len() < BLOCK_SIZE {
        return Err(Error::CorruptLayout(format!(
            "image is {} bytes, smaller than one block",
            s.len()
        )));
    }
    Ok(Superblock {
        magic: read_u32(s, OFF_MAGIC),
        version: read_u32(s, OFF_VERSION),
        block_size: read_u32(s, OFF_BLOCK_SIZE),
        total_blocks: read_u64(s, OFF_TOTAL_BLOCKS),
        inode_count: read_u64(s, OFF_INODE_COUNT),
        inode_bitmap_start: read_u64(s, OFF_INODE_BITMAP_START),
        inode_bitmap_blocks: read_u64(s, OFF_INODE_BITMAP_BLOCKS),
        data_bitmap_start: read_u64(s, OFF_DATA_BITMAP_START),
        data_bitmap_blocks: read_u64(s, OFF_DATA_BITMAP_BLOCKS),
        inode_table_start: read_u64(s, OFF_INODE_TABLE_START),
        inode_table_blocks: read_u64(s, OFF_INODE_TABLE_BLOCKS),
        data_region_start: read_u64(s, OFF_DATA_REGION_START),
        data_region_blocks: read_u64(s, OFF_DATA_REGION_BLOCKS),
        root_inode: read_u64(s, OFF_ROOT_INODE),
        mtime_epoch: read_u64(s, OFF_MTIME),
        flags: read_u32(s, OFF_FLAGS),
        checksum: read_u32(s, OFF_CHECKSUM),
    })
}

pub fn check_magic_number(s: &Superblock) -> Result<()> {
    if s.magic != MAGIC {
        return Err(Error::BadMagic(s.magic));
    }
    Ok(())
}
