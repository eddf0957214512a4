// Offset arithmetic between block/inode/dirent numbers and byte ranges of an
// image, plus little-endian field access used by the record codecs.
use crate::block::sblock::Superblock;
use crate::types::*;
use std::ops::Range;

pub fn block_num_to_addr_range(block_num: u64) -> Range<usize> {
    let start = block_num as usize * BLOCK_SIZE;
    start..start + BLOCK_SIZE
}

/// Byte range of `blocks` consecutive blocks starting at `start`.
pub fn region_to_addr_range(start: u64, blocks: u64) -> Range<usize> {
    let begin = start as usize * BLOCK_SIZE;
    begin..begin + blocks as usize * BLOCK_SIZE
}

/// `inode_num` is 1-based; table slot 0 holds inode 1.
pub fn inode_num_to_addr_range(inode_num: u32, sblock: &Superblock) -> Range<usize> {
    let table = sblock.inode_table_start as usize * BLOCK_SIZE;
    let slot = (inode_num as usize - 1) * INODE_SIZE;
    table + slot..table + slot + INODE_SIZE
}

/// `rel` is relative to the start of the data region.
pub fn data_block_to_addr_range(rel: u32, sblock: &Superblock) -> Range<usize> {
    block_num_to_addr_range(sblock.data_region_start + rel as u64)
}

/// Range of a dirent slot inside one directory block.
pub fn dirent_slot_range(slot: usize) -> Range<usize> {
    slot * DIRENT_SIZE..(slot + 1) * DIRENT_SIZE
}

pub fn read_u16(s: &[u8], off: usize) -> u16 {
    let mut b = [0u8; 2];
    b.copy_from_slice(&s[off..off + 2]);
    u16::from_le_bytes(b)
}

pub fn read_u32(s: &[u8], off: usize) -> u32 {
    let mut b = [0u8; 4];
    b.copy_from_slice(&s[off..off + 4]);
    u32::from_le_bytes(b)
}

pub fn read_u64(s: &[u8], off: usize) -> u64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&s[off..off + 8]);
    u64::from_le_bytes(b)
}

pub fn write_u16(s: &mut [u8], off: usize, v: u16) {
    s[off..off + 2].copy_from_slice(&v.to_le_bytes());
}

pub fn write_u32(s: &mut [u8], off: usize, v: u32) {
    s[off..off + 4].copy_from_slice(&v.to_le_bytes());
}

pub fn write_u64(s: &mut [u8], off: usize, v: u64) {
    s[off..off + 8].copy_from_slice(&v.to_le_bytes());
}
