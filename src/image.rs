//! An owned image buffer together with the superblock read back from it.
//!
//! Region offsets come from the superblock and are trusted as recorded; they
//! are range-checked once in [`Image::open`] so later accessors can slice the
//! buffer directly.
use crate::block::dirent::{u8_slice_as_dirent, u8_slice_as_dirents, Dirent};
use crate::block::inode::{u8_slice_as_inode, Inode};
use crate::block::sblock::{check_magic_number, u8_slice_as_superblock, Superblock};
use crate::converter::*;
use crate::error::{Error, Result};
use crate::types::*;
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the Unix epoch.
pub fn now_epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    buf: Vec<u8>,
    sblock: Superblock,
}

fn region_end(start: u64, blocks: u64) -> Option<u64> {
    start
        .checked_add(blocks)?
        .checked_mul(BLOCK_SIZE as u64)
}

impl Image {
    /// Parses an existing image. Fails on a bad magic number or when a
    /// region recorded in the superblock does not fit the buffer.
    pub fn open(buf: Vec<u8>) -> Result<Image> {
        let sblock = u8_slice_as_superblock(&buf)?;
        check_magic_number(&sblock)?;
        if sblock.block_size as usize != BLOCK_SIZE {
            return Err(Error::CorruptLayout(format!(
                "unsupported block size {}",
                sblock.block_size
            )));
        }
        let regions = [
            ("inode bitmap", sblock.inode_bitmap_start, sblock.inode_bitmap_blocks),
            ("data bitmap", sblock.data_bitmap_start, sblock.data_bitmap_blocks),
            ("inode table", sblock.inode_table_start, sblock.inode_table_blocks),
            ("data region", sblock.data_region_start, sblock.data_region_blocks),
        ];
        for (what, start, blocks) in regions.iter() {
            match region_end(*start, *blocks) {
                Some(end) if *blocks > 0 && *start > SUPERBLOCK_BLOCK && end <= buf.len() as u64 => {}
                _ => {
                    return Err(Error::CorruptLayout(format!(
                        "{} at block {} (+{}) does not fit a {} byte image",
                        what,
                        start,
                        blocks,
                        buf.len()
                    )))
                }
            }
        }
        if sblock.inode_count == 0 || sblock.inode_count > BITS_PER_BITMAP_BLOCK {
            return Err(Error::CorruptLayout(format!(
                "inode count {} out of range",
                sblock.inode_count
            )));
        }
        if sblock.data_region_blocks > BITS_PER_BITMAP_BLOCK {
            return Err(Error::CorruptLayout(format!(
                "{} data blocks exceed the data bitmap",
                sblock.data_region_blocks
            )));
        }
        if sblock.inode_count * INODE_SIZE as u64 > sblock.inode_table_blocks * BLOCK_SIZE as u64 {
            return Err(Error::CorruptLayout(format!(
                "{} inodes do not fit {} table blocks",
                sblock.inode_count, sblock.inode_table_blocks
            )));
        }
        Ok(Image { buf, sblock })
    }

    /// Wraps a buffer whose layout was just computed by the formatter.
    pub(crate) fn from_parts(buf: Vec<u8>, sblock: Superblock) -> Image {
        Image { buf, sblock }
    }

    pub fn superblock(&self) -> &Superblock {
        &self.sblock
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn inode_bitmap(&self) -> &[u8] {
        &self.buf[block_num_to_addr_range(self.sblock.inode_bitmap_start)]
    }

    pub fn inode_bitmap_mut(&mut self) -> &mut [u8] {
        let r = block_num_to_addr_range(self.sblock.inode_bitmap_start);
        &mut self.buf[r]
    }

    pub fn data_bitmap(&self) -> &[u8] {
        &self.buf[block_num_to_addr_range(self.sblock.data_bitmap_start)]
    }

    pub fn data_bitmap_mut(&mut self) -> &mut [u8] {
        let r = block_num_to_addr_range(self.sblock.data_bitmap_start);
        &mut self.buf[r]
    }

    pub fn inode_table_mut(&mut self) -> &mut [u8] {
        let r = region_to_addr_range(self.sblock.inode_table_start, self.sblock.inode_table_blocks);
        &mut self.buf[r]
    }

    fn check_inode_num(&self, inode_num: u32) -> Result<()> {
        if inode_num == 0 || inode_num as u64 > self.sblock.inode_count {
            return Err(Error::CorruptLayout(format!(
                "inode {} out of range 1..={}",
                inode_num, self.sblock.inode_count
            )));
        }
        Ok(())
    }

    /// Raw record bytes of a 1-based inode number.
    pub fn inode_bytes(&self, inode_num: u32) -> Result<&[u8]> {
        self.check_inode_num(inode_num)?;
        Ok(&self.buf[inode_num_to_addr_range(inode_num, &self.sblock)])
    }

    pub fn read_inode(&self, inode_num: u32) -> Result<Inode> {
        Ok(u8_slice_as_inode(self.inode_bytes(inode_num)?))
    }

    pub fn write_inode(&mut self, inode_num: u32, inode: &Inode) -> Result<()> {
        self.check_inode_num(inode_num)?;
        let r = inode_num_to_addr_range(inode_num, &self.sblock);
        self.buf[r].copy_from_slice(&inode.to_bytes());
        Ok(())
    }

    fn check_data_block(&self, rel: u32) -> Result<()> {
        if rel as u64 >= self.sblock.data_region_blocks {
            return Err(Error::CorruptLayout(format!(
                "data block {} outside the data region ({} blocks)",
                rel, self.sblock.data_region_blocks
            )));
        }
        Ok(())
    }

    pub fn data_block(&self, rel: u32) -> Result<&[u8]> {
        self.check_data_block(rel)?;
        Ok(&self.buf[data_block_to_addr_range(rel, &self.sblock)])
    }

    pub fn data_block_mut(&mut self, rel: u32) -> Result<&mut [u8]> {
        self.check_data_block(rel)?;
        let r = data_block_to_addr_range(rel, &self.sblock);
        Ok(&mut self.buf[r])
    }

    pub fn read_dirent(&self, rel: u32, slot: usize) -> Result<Dirent> {
        Ok(u8_slice_as_dirent(&self.data_block(rel)?[dirent_slot_range(slot)]))
    }

    pub fn write_dirent(&mut self, rel: u32, slot: usize, dirent: &Dirent) -> Result<()> {
        self.data_block_mut(rel)?[dirent_slot_range(slot)].copy_from_slice(&dirent.to_bytes());
        Ok(())
    }

    /// Relative index of the root directory's block, validated against the
    /// data region.
    pub fn root_block(&self) -> Result<u32> {
        let root = self.read_inode(ROOT_INODE)?;
        let rel = root.direct[0];
        if rel as u64 >= self.sblock.data_region_blocks {
            return Err(Error::CorruptRootPointer(rel));
        }
        Ok(rel)
    }

    /// Occupied root entries with their slot index, in slot order.
    pub fn root_entries(&self) -> Result<Vec<(usize, Dirent)>> {
        let block = self.data_block(self.root_block()?)?;
        Ok(u8_slice_as_dirents(block)
            .into_iter()
            .enumerate()
            .filter(|(_, d)| !d.is_free())
            .collect())
    }

    /// Inode number of the first root entry called `name`.
    pub fn lookup(&self, name: &str) -> Result<u32> {
        self.root_entries()?
            .into_iter()
            .find(|(_, d)| d.name_bytes() == name.as_bytes())
            .map(|(_, d)| d.inode_no)
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    /// Contents of an inode, exactly `size_bytes` long.
    pub fn read_file(&self, inode_num: u32) -> Result<Vec<u8>> {
        let inode = self.read_inode(inode_num)?;
        if inode.size_bytes > MAX_FILE_SIZE {
            return Err(Error::CorruptLayout(format!(
                "inode {} claims {} bytes",
                inode_num, inode.size_bytes
            )));
        }
        let mut content = Vec::with_capacity(inode.blocks_in_use() * BLOCK_SIZE);
        for &rel in inode.used_blocks() {
            content.extend_from_slice(self.data_block(rel)?);
        }
        content.truncate(inode.size_bytes as usize);
        Ok(content)
    }

    /// Stamps the superblock, finalizes its checksum and writes block 0.
    /// Must be the last mutation of an operation.
    pub fn commit_superblock(&mut self, now: u64) -> u32 {
        self.sblock.mtime_epoch = now;
        let crc = self.sblock.finalize_checksum();
        self.buf[block_num_to_addr_range(SUPERBLOCK_BLOCK)].copy_from_slice(&self.sblock.to_block());
        crc
    }
}
