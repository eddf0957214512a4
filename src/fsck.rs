//! Read-only consistency check of an image.
use crate::block::bitmap::bit_get;
use crate::block::dirent::{u8_slice_as_dirents, Dirent};
use crate::block::inode::Inode;
use crate::block::sblock::Superblock;
use crate::converter::dirent_slot_range;
use crate::image::Image;
use crate::types::*;
use log::warn;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Problem {
    SuperblockChecksum,
    InodeChecksum(u32),
    SizeOutOfRange { inode: u32, size_bytes: u64 },
    InodeBitmap { inode: u32, bit_set: bool },
    DataBitmap { block: u32, bit_set: bool },
    PointerOutOfRange { inode: u32, block: u32 },
    SharedBlock { block: u32, first: u32, second: u32 },
    RootPointer(u32),
    RootNotDirectory,
    RootCounts { links: u16, size_bytes: u64, entries: usize },
    DirentChecksum(usize),
    DanglingEntry { slot: usize, inode: u32 },
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Problem::*;
        match self {
            SuperblockChecksum => write!(f, "superblock checksum mismatch"),
            InodeChecksum(n) => write!(f, "inode {}: checksum mismatch", n),
            SizeOutOfRange { inode, size_bytes } => write!(
                f,
                "inode {}: size {} exceeds {} bytes",
                inode, size_bytes, MAX_FILE_SIZE
            ),
            InodeBitmap { inode, bit_set: true } => {
                write!(f, "inode {}: marked allocated but unused", inode)
            }
            InodeBitmap { inode, bit_set: false } => {
                write!(f, "inode {}: in use but marked free", inode)
            }
            DataBitmap { block, bit_set: true } => {
                write!(f, "data block {}: marked allocated but unreferenced", block)
            }
            DataBitmap { block, bit_set: false } => {
                write!(f, "data block {}: referenced but marked free", block)
            }
            PointerOutOfRange { inode, block } => {
                write!(f, "inode {}: block {} outside the data region", inode, block)
            }
            SharedBlock { block, first, second } => write!(
                f,
                "data block {}: referenced by inodes {} and {}",
                block, first, second
            ),
            RootPointer(rel) => write!(f, "root directory block {} outside the data region", rel),
            RootNotDirectory => write!(f, "root inode is not a directory"),
            RootCounts {
                links,
                size_bytes,
                entries,
            } => write!(
                f,
                "root has {} entries but links={} size={}",
                entries, links, size_bytes
            ),
            DirentChecksum(slot) => write!(f, "root entry {}: checksum mismatch", slot),
            DanglingEntry { slot, inode } => {
                write!(f, "root entry {}: inode {} is not allocated", slot, inode)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub problems: Vec<Problem>,
}

impl Report {
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }
}

pub fn check(img: &Image) -> Report {
    let mut problems = Vec::new();
    let sb = img.superblock();
    let inode_count = sb.inode_count as u32;
    let data_blocks = sb.data_region_blocks as u32;

    if !Superblock::verify_checksum(img.as_bytes()) {
        problems.push(Problem::SuperblockChecksum);
    }

    // inode table against the inode bitmap, collecting block owners
    let mut owner: HashMap<u32, u32> = HashMap::new();
    let mut allocated = vec![false; inode_count as usize + 1];
    for n in 1..=inode_count {
        let (raw, inode) = match (img.inode_bytes(n), img.read_inode(n)) {
            (Ok(raw), Ok(inode)) => (raw, inode),
            _ => continue,
        };
        let bit = bit_get(img.inode_bitmap(), n as usize - 1);
        if bit == inode.is_unused() {
            problems.push(Problem::InodeBitmap {
                inode: n,
                bit_set: bit,
            });
        }
        if inode.is_unused() {
            continue;
        }
        allocated[n as usize] = true;
        if !Inode::verify_checksum(raw) {
            problems.push(Problem::InodeChecksum(n));
        }
        if inode.size_bytes > MAX_FILE_SIZE {
            problems.push(Problem::SizeOutOfRange {
                inode: n,
                size_bytes: inode.size_bytes,
            });
        }
        for &block in inode.used_blocks() {
            if block >= data_blocks {
                problems.push(Problem::PointerOutOfRange { inode: n, block });
                continue;
            }
            if let Some(&first) = owner.get(&block) {
                problems.push(Problem::SharedBlock {
                    block,
                    first,
                    second: n,
                });
            } else {
                owner.insert(block, n);
            }
        }
    }

    for block in 0..data_blocks {
        let bit = bit_get(img.data_bitmap(), block as usize);
        if bit != owner.contains_key(&block) {
            problems.push(Problem::DataBitmap {
                block,
                bit_set: bit,
            });
        }
    }

    check_root(img, &allocated, &mut problems);

    for p in &problems {
        warn!("{}", p);
    }
    Report { problems }
}

fn check_root(img: &Image, allocated: &[bool], problems: &mut Vec<Problem>) {
    let root = match img.read_inode(ROOT_INODE) {
        Ok(root) => root,
        Err(_) => return,
    };
    if root.kind() != Some(InodeType::Dir) {
        problems.push(Problem::RootNotDirectory);
    }
    let block = match img.root_block().and_then(|rel| img.data_block(rel)) {
        Ok(block) => block,
        Err(_) => {
            problems.push(Problem::RootPointer(root.direct[0]));
            return;
        }
    };
    let mut entries = 0;
    for (slot, d) in u8_slice_as_dirents(block).iter().enumerate() {
        if d.is_free() {
            continue;
        }
        entries += 1;
        if !Dirent::verify_checksum(&block[dirent_slot_range(slot)]) {
            problems.push(Problem::DirentChecksum(slot));
        }
        if !allocated.get(d.inode_no as usize).copied().unwrap_or(false) {
            problems.push(Problem::DanglingEntry {
                slot,
                inode: d.inode_no,
            });
        }
    }
    if root.links as usize != entries || root.size_bytes != (entries * DIRENT_SIZE) as u64 {
        problems.push(Problem::RootCounts {
            links: root.links,
            size_bytes: root.size_bytes,
            entries,
        });
    }
}
