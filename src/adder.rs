//! Inserting one host file into the root directory.
//!
//! All work happens on a staged copy of the image that replaces the live one
//! only after every step succeeded, so a failed insertion leaves the caller's
//! image byte-for-byte unchanged.
use crate::block::bitmap::{bit_set, count_free, find_first_free, find_free};
use crate::block::dirent::{u8_slice_as_dirents, Dirent};
use crate::block::inode::Inode;
use crate::error::{Error, Result};
use crate::image::{now_epoch, Image};
use crate::types::*;
use log::{debug, info, warn};

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct AddOptions {
    /// Refuse a name already present in root. Off by default: duplicates
    /// get their own entry and inode.
    pub reject_duplicate_names: bool,
}

/// Adds `content` as `name` to a serialized image and returns the new image.
pub fn add_file(image: &[u8], name: &str, content: &[u8]) -> Result<Vec<u8>> {
    let mut img = Image::open(image.to_vec())?;
    img.add_file(name, content, AddOptions::default())?;
    Ok(img.into_bytes())
}

fn check_name(name: &str) -> Result<&[u8]> {
    if name.is_empty() || name.contains('/') || name.contains('\0') {
        return Err(Error::InvalidName(name.to_string()));
    }
    let bytes = name.as_bytes();
    if bytes.len() > NAME_MAX {
        warn!("{}: name truncated to {} bytes", name, NAME_MAX);
        return Ok(&bytes[..NAME_MAX]);
    }
    Ok(bytes)
}

/// Data blocks needed for `size` bytes; an empty file still takes one.
fn blocks_needed(size: u64) -> Result<usize> {
    let need = ((size + BLOCK_SIZE as u64 - 1) / BLOCK_SIZE as u64).max(1);
    if need > DIRECT_MAX as u64 {
        return Err(Error::FileTooLarge {
            size,
            max: MAX_FILE_SIZE,
        });
    }
    Ok(need as usize)
}

impl Image {
    /// Adds a file, returning its inode number.
    pub fn add_file(&mut self, name: &str, content: &[u8], opts: AddOptions) -> Result<u32> {
        self.add_file_at(name, content, opts, now_epoch())
    }

    pub fn add_file_at(
        &mut self,
        name: &str,
        content: &[u8],
        opts: AddOptions,
        now: u64,
    ) -> Result<u32> {
        let mut staged = self.clone();
        let inode_num = staged.insert(name, content, opts, now)?;
        *self = staged;
        Ok(inode_num)
    }

    fn insert(&mut self, name: &str, content: &[u8], opts: AddOptions, now: u64) -> Result<u32> {
        let stored_name = check_name(name)?;
        let size = content.len() as u64;
        let need = blocks_needed(size)?;
        if opts.reject_duplicate_names
            && self
                .root_entries()?
                .iter()
                .any(|(_, d)| d.name_bytes() == stored_name)
        {
            return Err(Error::DuplicateName(name.to_string()));
        }

        let sb = *self.superblock();
        let inode_limit = sb.inode_count as usize;
        let data_limit = sb.data_region_blocks as usize;

        let slot = find_first_free(self.inode_bitmap(), inode_limit).ok_or(Error::NoFreeInode)?;
        let inode_num = slot as u32 + 1;
        let blocks = find_free(self.data_bitmap(), data_limit, need).ok_or_else(|| {
            Error::NoFreeBlocks {
                needed: need,
                available: count_free(self.data_bitmap(), data_limit),
            }
        })?;
        debug!("{}: inode {}, data blocks {:?}", name, inode_num, blocks);

        let mut inode = Inode::new(InodeType::File, 1, size, now);
        for (p, &rel) in inode.direct.iter_mut().zip(blocks.iter()) {
            *p = rel as u32;
        }
        inode.finalize_checksum();

        bit_set(self.inode_bitmap_mut(), slot);
        for (i, &rel) in blocks.iter().enumerate() {
            bit_set(self.data_bitmap_mut(), rel);
            let start = (i * BLOCK_SIZE).min(content.len());
            let end = ((i + 1) * BLOCK_SIZE).min(content.len());
            let chunk = &content[start..end];
            let block = self.data_block_mut(rel as u32)?;
            block[..chunk.len()].copy_from_slice(chunk);
            block[chunk.len()..].iter_mut().for_each(|b| *b = 0);
        }
        self.write_inode(inode_num, &inode)?;

        // root's pointer is checked before its block is touched
        let root_rel = self.root_block()?;
        let free_slot = u8_slice_as_dirents(self.data_block(root_rel)?)
            .iter()
            .position(Dirent::is_free)
            .ok_or(Error::NoFreeDirEntry)?;
        self.write_dirent(
            root_rel,
            free_slot,
            &Dirent::new(inode_num, InodeType::File, stored_name),
        )?;

        let mut root = self.read_inode(ROOT_INODE)?;
        root.links = root
            .links
            .checked_add(1)
            .ok_or_else(|| Error::CorruptLayout(format!("root link count {}", root.links)))?;
        root.size_bytes = root
            .size_bytes
            .checked_add(DIRENT_SIZE as u64)
            .ok_or_else(|| Error::CorruptLayout(format!("root size {}", root.size_bytes)))?;
        root.finalize_checksum();
        self.write_inode(ROOT_INODE, &root)?;

        self.commit_superblock(now);
        info!(
            "{} added as inode {} ({} bytes, {} blocks, root slot {})",
            name, inode_num, size, need, free_slot
        );
        Ok(inode_num)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::bitmap::bit_get;
    use crate::block::sblock::{u8_slice_as_superblock, Superblock};
    use crate::fsck;
    use crate::mkfs::format_at;

    const NOW: u64 = 1_700_000_000;

    fn fresh() -> Image {
        Image::open(format_at(45, 128, NOW).unwrap()).unwrap()
    }

    fn add(img: &mut Image, name: &str, content: &[u8]) -> Result<u32> {
        img.add_file_at(name, content, AddOptions::default(), NOW + 60)
    }

    #[test]
    fn worked_example() {
        let mut img = fresh();
        let ino = add(&mut img, "hello.txt", b"0123456789").unwrap();
        assert_eq!(ino, 2);

        let inode = img.read_inode(2).unwrap();
        assert_eq!(inode.kind(), Some(InodeType::File));
        assert_eq!(inode.links, 1);
        assert_eq!(inode.size_bytes, 10);
        assert_eq!(inode.direct[0], 1);
        assert_eq!(inode.mtime, NOW + 60);

        let entries = img.root_entries().unwrap();
        assert_eq!(entries.len(), 3);
        let (slot, d) = &entries[2];
        assert_eq!(*slot, 2);
        assert_eq!(d.inode_no, 2);
        assert_eq!(d.r#type, 1);
        assert_eq!(d.name(), "hello.txt");

        let root = img.read_inode(ROOT_INODE).unwrap();
        assert_eq!(root.links, 3);
        assert_eq!(root.size_bytes, 192);
        assert_eq!(img.superblock().mtime_epoch, NOW + 60);
        assert!(Superblock::verify_checksum(img.as_bytes()));
        assert!(fsck::check(&img).is_clean());
    }

    #[test]
    fn round_trip_through_bytes() {
        let bytes = format_at(45, 128, NOW).unwrap();
        let content: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let out = add_file(&bytes, "data.bin", &content).unwrap();
        assert_eq!(out.len(), bytes.len());

        let img = Image::open(out).unwrap();
        let ino = img.lookup("data.bin").unwrap();
        assert_eq!(img.read_file(ino).unwrap(), content);
        let inode = img.read_inode(ino).unwrap();
        assert_eq!(inode.size_bytes, 10_000);
        assert_eq!(inode.used_blocks(), &[1, 2, 3]);
        // tail of the last block is zero padded
        let last = img.data_block(3).unwrap();
        assert!(last[10_000 - 2 * BLOCK_SIZE..].iter().all(|&b| b == 0));
    }

    #[test]
    fn empty_file_takes_one_block() {
        let mut img = fresh();
        let ino = add(&mut img, "empty", b"").unwrap();
        let inode = img.read_inode(ino).unwrap();
        assert_eq!(inode.size_bytes, 0);
        assert_eq!(inode.direct[0], 1);
        assert!(bit_get(img.data_bitmap(), 1));
        assert!(img.read_file(ino).unwrap().is_empty());
        assert!(fsck::check(&img).is_clean());
    }

    #[test]
    fn direct_pointer_boundary() {
        let mut img = fresh();
        let max = vec![0xA5u8; MAX_FILE_SIZE as usize];
        let ino = add(&mut img, "max", &max).unwrap();
        assert_eq!(img.read_inode(ino).unwrap().used_blocks().len(), DIRECT_MAX);
        assert_eq!(img.read_file(ino).unwrap(), max);

        let before = img.clone();
        let over = vec![0u8; MAX_FILE_SIZE as usize + 1];
        assert_eq!(
            add(&mut img, "over", &over),
            Err(Error::FileTooLarge {
                size: MAX_FILE_SIZE + 1,
                max: MAX_FILE_SIZE
            })
        );
        assert_eq!(img, before);
    }

    #[test]
    fn not_enough_blocks_leaves_image_untouched() {
        // 38 data blocks: root uses 1, three 12-block files use 36, one left
        let mut img = fresh();
        let big = vec![1u8; MAX_FILE_SIZE as usize];
        for name in &["a", "b", "c"] {
            add(&mut img, name, &big).unwrap();
        }
        let before = img.as_bytes().to_vec();
        assert_eq!(
            add(&mut img, "d", &[2u8; BLOCK_SIZE + 1]),
            Err(Error::NoFreeBlocks {
                needed: 2,
                available: 1
            })
        );
        assert_eq!(img.as_bytes(), &before[..]);
        assert!(add_file(&before, "d", &[2u8; BLOCK_SIZE + 1]).is_err());

        add(&mut img, "d", &[2u8; BLOCK_SIZE]).unwrap();
        assert_eq!(add(&mut img, "e", b"x").unwrap_err(), Error::NoFreeBlocks {
            needed: 1,
            available: 0
        });
    }

    #[test]
    fn inode_exhaustion() {
        let mut img = Image::open(format_at(200, 32, NOW).unwrap()).unwrap();
        for i in 0..31 {
            assert_eq!(add(&mut img, &format!("f{}", i), b"x").unwrap(), i + 2);
        }
        let before = img.clone();
        assert_eq!(add(&mut img, "last", b"x"), Err(Error::NoFreeInode));
        assert_eq!(img, before);
    }

    #[test]
    fn full_root_directory_rolls_back() {
        let mut img = Image::open(format_at(200, 128, NOW).unwrap()).unwrap();
        // 64 slots, two taken by "." and ".."
        for i in 0..62 {
            add(&mut img, &format!("f{}", i), b"").unwrap();
        }
        let before = img.as_bytes().to_vec();
        assert_eq!(add(&mut img, "one-more", b"abc"), Err(Error::NoFreeDirEntry));
        assert_eq!(img.as_bytes(), &before[..]);
        assert!(!bit_get(img.inode_bitmap(), 63));
        assert!(!bit_get(img.data_bitmap(), 63));
        assert!(fsck::check(&img).is_clean());
    }

    #[test]
    fn corrupt_root_pointer_is_reported() {
        let mut img = fresh();
        let mut root = img.read_inode(ROOT_INODE).unwrap();
        root.direct[0] = 99;
        root.finalize_checksum();
        img.write_inode(ROOT_INODE, &root).unwrap();
        let before = img.clone();
        assert_eq!(add(&mut img, "x", b"x"), Err(Error::CorruptRootPointer(99)));
        assert_eq!(img, before);
    }

    #[test]
    fn saturated_root_counts_are_reported() {
        let mut img = fresh();
        let mut root = img.read_inode(ROOT_INODE).unwrap();
        root.links = u16::MAX;
        root.finalize_checksum();
        img.write_inode(ROOT_INODE, &root).unwrap();
        let before = img.clone();
        assert!(matches!(
            add(&mut img, "x", b"x"),
            Err(Error::CorruptLayout(_))
        ));
        assert_eq!(img, before);

        root.links = 2;
        root.size_bytes = u64::MAX - 1;
        root.finalize_checksum();
        img.write_inode(ROOT_INODE, &root).unwrap();
        let before = img.clone();
        assert!(matches!(
            add(&mut img, "x", b"x"),
            Err(Error::CorruptLayout(_))
        ));
        assert_eq!(img, before);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut bytes = format_at(45, 128, NOW).unwrap();
        bytes[..4].copy_from_slice(&0x1020_3040u32.to_le_bytes());
        assert_eq!(add_file(&bytes, "x", b"x"), Err(Error::BadMagic(0x1020_3040)));
    }

    #[test]
    fn first_free_slot_is_reused() {
        let mut img = fresh();
        add(&mut img, "a", b"a").unwrap();
        add(&mut img, "b", b"b").unwrap();
        // free slot 2 by hand; the next insert must land there
        let root_rel = img.root_block().unwrap();
        img.write_dirent(root_rel, 2, &Dirent::default()).unwrap();
        add(&mut img, "c", b"c").unwrap();
        let c = img.read_dirent(root_rel, 2).unwrap();
        assert_eq!(c.name(), "c");
        assert_eq!(c.inode_no, 4);
    }

    #[test]
    fn duplicate_names() {
        let mut img = fresh();
        let a = add(&mut img, "same", b"1").unwrap();
        let b = add(&mut img, "same", b"2").unwrap();
        assert_ne!(a, b);
        assert_eq!(
            img.root_entries()
                .unwrap()
                .iter()
                .filter(|(_, d)| d.name() == "same")
                .count(),
            2
        );

        let strict = AddOptions {
            reject_duplicate_names: true,
        };
        let before = img.clone();
        assert_eq!(
            img.add_file_at("same", b"3", strict, NOW),
            Err(Error::DuplicateName("same".into()))
        );
        assert_eq!(img, before);
        assert!(img.add_file_at("other", b"3", strict, NOW).is_ok());
    }

    #[test]
    fn names() {
        let mut img = fresh();
        let long = "n".repeat(80);
        let ino = add(&mut img, &long, b"x").unwrap();
        let (_, d) = img.root_entries().unwrap().pop().unwrap();
        assert_eq!(d.inode_no, ino);
        assert_eq!(d.name(), "n".repeat(NAME_MAX));
        assert_eq!(img.lookup(&"n".repeat(NAME_MAX)).unwrap(), ino);

        for bad in &["", "a/b", "nul\0"] {
            assert_eq!(add(&mut img, bad, b"x"), Err(Error::InvalidName(bad.to_string())));
        }
    }

    #[test]
    fn superblock_offsets_are_reused_verbatim() {
        let bytes = format_at(45, 128, NOW).unwrap();
        let out = add_file(&bytes, "f", b"f").unwrap();
        let (a, b) = (
            u8_slice_as_superblock(&bytes).unwrap(),
            u8_slice_as_superblock(&out).unwrap(),
        );
        assert_eq!(a.data_region_start, b.data_region_start);
        assert_eq!(a.inode_table_blocks, b.inode_table_blocks);
        // bitmaps changed in place
        assert_ne!(bytes[BLOCK_SIZE..3 * BLOCK_SIZE], out[BLOCK_SIZE..3 * BLOCK_SIZE]);
    }
}
