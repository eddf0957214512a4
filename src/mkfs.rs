use crate::block::bitmap::bit_set;
use crate::block::dirent::Dirent;
use crate::block::inode::Inode;
use crate::block::sblock::Superblock;
use crate::error::Result;
use crate::image::{now_epoch, Image};
use crate::layout::Layout;
use crate::types::*;
use log::{debug, info};

/// Builds a fresh image of `total_blocks` blocks holding only the root
/// directory.
pub fn format(total_blocks: u64, inode_count: u64) -> Result<Vec<u8>> {
    format_at(total_blocks, inode_count, now_epoch())
}

pub fn format_at(total_blocks: u64, inode_count: u64, now: u64) -> Result<Vec<u8>> {
    // fails before anything is allocated
    let layout = Layout::compute(total_blocks, inode_count)?;
    debug!("layout: {:?}", layout);

    let sblock = Superblock {
        magic: MAGIC,
        version: VERSION,
        block_size: BLOCK_SIZE as u32,
        total_blocks: layout.total_blocks,
        inode_count: layout.inode_count,
        inode_bitmap_start: layout.inode_bitmap_start,
        inode_bitmap_blocks: layout.inode_bitmap_blocks,
        data_bitmap_start: layout.data_bitmap_start,
        data_bitmap_blocks: layout.data_bitmap_blocks,
        inode_table_start: layout.inode_table_start,
        inode_table_blocks: layout.inode_table_blocks,
        data_region_start: layout.data_region_start,
        data_region_blocks: layout.data_region_blocks,
        root_inode: ROOT_INODE as u64,
        mtime_epoch: now,
        flags: 0,
        checksum: 0,
    };
    let mut img = Image::from_parts(vec![0u8; layout.image_bytes()], sblock);

    // root inode and its single data block
    bit_set(img.inode_bitmap_mut(), 0);
    bit_set(img.data_bitmap_mut(), 0);

    img.inode_table_mut().iter_mut().for_each(|b| *b = 0);
    let mut root = Inode::new(InodeType::Dir, 2, 2 * DIRENT_SIZE as u64, now);
    root.direct[0] = 0;
    root.finalize_checksum();
    img.write_inode(ROOT_INODE, &root)?;

    img.data_block_mut(0)?.iter_mut().for_each(|b| *b = 0);
    img.write_dirent(0, 0, &Dirent::new(ROOT_INODE, InodeType::Dir, b"."))?;
    img.write_dirent(0, 1, &Dirent::new(ROOT_INODE, InodeType::Dir, b".."))?;

    let crc = img.commit_superblock(now);
    info!(
        "formatted {} blocks: {} inodes in {} table blocks, {} data blocks from block {} (crc {:#010x})",
        layout.total_blocks,
        layout.inode_count,
        layout.inode_table_blocks,
        layout.data_region_blocks,
        layout.data_region_start,
        crc
    );
    Ok(img.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::dirent::u8_slice_as_dirents;
    use crate::block::inode::u8_slice_as_inode;
    use crate::block::sblock::u8_slice_as_superblock;
    use crate::error::Error;
    use crate::fsck;

    const NOW: u64 = 1_700_000_000;

    #[test]
    fn worked_example() {
        let bytes = format_at(45, 128, NOW).unwrap();
        assert_eq!(bytes.len(), 180 * 1024);

        let sb = u8_slice_as_superblock(&bytes).unwrap();
        assert_eq!(sb.magic, MAGIC);
        assert_eq!(sb.version, 1);
        assert_eq!(sb.inode_table_blocks, 4);
        assert_eq!(sb.data_region_start, 7);
        assert_eq!(sb.data_region_blocks, 38);
        assert_eq!(sb.root_inode, 1);
        assert_eq!(sb.mtime_epoch, NOW);
        assert_eq!(sb.flags, 0);

        let root = u8_slice_as_inode(&bytes[3 * BLOCK_SIZE..3 * BLOCK_SIZE + INODE_SIZE]);
        assert_eq!(root.kind(), Some(InodeType::Dir));
        assert_eq!(root.links, 2);
        assert_eq!(root.size_bytes, 128);
        assert_eq!(root.direct[0], 0);
        assert_eq!((root.atime, root.mtime, root.ctime), (NOW, NOW, NOW));
    }

    #[test]
    fn every_checksum_reverifies() {
        let bytes = format_at(45, 128, NOW).unwrap();
        assert!(Superblock::verify_checksum(&bytes[..BLOCK_SIZE]));
        assert!(Inode::verify_checksum(&bytes[3 * BLOCK_SIZE..]));
        let root_block = &bytes[7 * BLOCK_SIZE..8 * BLOCK_SIZE];
        assert!(Dirent::verify_checksum(&root_block[0..64]));
        assert!(Dirent::verify_checksum(&root_block[64..128]));
        assert!(fsck::check(&Image::open(bytes).unwrap()).is_clean());
    }

    #[test]
    fn checksums_reverify_across_geometries() {
        // 180..4096 KiB in multiples of 4, 128..512 inodes
        let sizes_kib = (180..=4096u64).step_by(52).chain(std::iter::once(4096));
        for size_kib in sizes_kib {
            let total_blocks = size_kib * 1024 / BLOCK_SIZE as u64;
            for &inodes in &[128u64, 129, 160, 255, 256, 257, 384, 511, 512] {
                let bytes = format_at(total_blocks, inodes, NOW).unwrap();
                let sb = u8_slice_as_superblock(&bytes).unwrap();
                assert!(Superblock::verify_checksum(&bytes), "{}/{}", size_kib, inodes);
                let root = 3 * BLOCK_SIZE;
                assert!(Inode::verify_checksum(&bytes[root..root + INODE_SIZE]));
                let start = sb.data_region_start as usize * BLOCK_SIZE;
                assert!(Dirent::verify_checksum(&bytes[start..start + 64]));
                assert!(Dirent::verify_checksum(&bytes[start + 64..start + 128]));
                let report = fsck::check(&Image::open(bytes).unwrap());
                assert!(report.is_clean(), "{}/{}: {:?}", size_kib, inodes, report);
            }
        }
    }

    #[test]
    fn root_directory_contents() {
        let bytes = format_at(64, 256, NOW).unwrap();
        let sb = u8_slice_as_superblock(&bytes).unwrap();
        let start = sb.data_region_start as usize * BLOCK_SIZE;
        let entries = u8_slice_as_dirents(&bytes[start..start + BLOCK_SIZE]);
        assert_eq!(entries[0].name(), ".");
        assert_eq!(entries[1].name(), "..");
        assert_eq!(entries[0].inode_no, 1);
        assert_eq!(entries[1].inode_no, 1);
        assert_eq!(entries[1].kind(), Some(InodeType::Dir));
        assert!(entries[2..].iter().all(Dirent::is_free));
        assert!(bytes[start + 128..start + BLOCK_SIZE].iter().all(|&b| b == 0));
    }

    #[test]
    fn only_root_is_allocated() {
        let img = Image::open(format_at(1024, 512, NOW).unwrap()).unwrap();
        assert_eq!(img.inode_bitmap()[0], 0b1);
        assert!(img.inode_bitmap()[1..].iter().all(|&b| b == 0));
        assert_eq!(img.data_bitmap()[0], 0b1);
        assert!(img.data_bitmap()[1..].iter().all(|&b| b == 0));
        assert!((2..=512).all(|n| img.read_inode(n).unwrap().is_unused()));
    }

    #[test]
    fn capacity_failure() {
        assert_eq!(
            format_at(7, 128, NOW),
            Err(Error::Capacity {
                total_blocks: 7,
                inode_count: 128
            })
        );
    }
}
