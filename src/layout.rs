//! Region placement for a fresh image.
//!
//! ```text
//! block 0                      superblock
//! block 1                      inode bitmap
//! block 2                      data bitmap
//! blocks 3 .. 3+T              inode table, T = ceil(inode_count * 128 / 4096)
//! blocks 3+T .. total_blocks   data region
//! ```
use crate::error::{Error, Result};
use crate::types::*;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Layout {
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
}

impl Layout {
    pub fn compute(total_blocks: u64, inode_count: u64) -> Result<Layout> {
        if inode_count == 0 {
            return Err(Error::Geometry("inode count must be at least 1".into()));
        }
        if inode_count > BITS_PER_BITMAP_BLOCK {
            return Err(Error::Geometry(format!(
                "{} inodes do not fit a one-block bitmap ({} max)",
                inode_count, BITS_PER_BITMAP_BLOCK
            )));
        }
        let inode_table_blocks = (inode_count * INODE_SIZE as u64 + BLOCK_SIZE as u64 - 1)
            / BLOCK_SIZE as u64;
        let data_region_start = INODE_TABLE_START + inode_table_blocks;
        if data_region_start >= total_blocks {
            return Err(Error::Capacity {
                total_blocks,
                inode_count,
            });
        }
        let data_region_blocks = total_blocks - data_region_start;
        if data_region_blocks > BITS_PER_BITMAP_BLOCK {
            return Err(Error::Geometry(format!(
                "{} data blocks do not fit a one-block bitmap ({} max)",
                data_region_blocks, BITS_PER_BITMAP_BLOCK
            )));
        }
        Ok(Layout {
            total_blocks,
            inode_count,
            inode_bitmap_start: INODE_BITMAP_START,
            inode_bitmap_blocks: 1,
            data_bitmap_start: DATA_BITMAP_START,
            data_bitmap_blocks: 1,
            inode_table_start: INODE_TABLE_START,
            inode_table_blocks,
            data_region_start,
            data_region_blocks,
        })
    }

    pub fn image_bytes(&self) -> usize {
        self.total_blocks as usize * BLOCK_SIZE
    }
}
