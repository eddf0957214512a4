use crate::checksum::crc32;
use crate::converter::*;
use crate::types::*;

const OFF_MODE: usize = 0;
const OFF_LINKS: usize = 2;
const OFF_UID: usize = 4;
const OFF_GID: usize = 8;
const OFF_SIZE: usize = 12;
const OFF_ATIME: usize = 20;
const OFF_MTIME: usize = 28;
const OFF_CTIME: usize = 36;
const OFF_DIRECT: usize = 44;
const OFF_RESERVED: usize = 92;
const OFF_PROJ_ID: usize = 104;
const OFF_UID16_GID16: usize = 108;
const OFF_XATTR_PTR: usize = 112;
const OFF_CRC: usize = 120;

const _: () = assert!(OFF_DIRECT + DIRECT_MAX * 4 == OFF_RESERVED);
const _: () = assert!(OFF_CRC + 8 == INODE_SIZE);

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Inode {
    pub mode: u16,
    pub links: u16,
    pub uid: u32,
    pub gid: u32,
    pub size_bytes: u64,
    pub atime: u64,
    pub mtime: u64,
    pub ctime: u64,
    pub direct: [u32; DIRECT_MAX], // relative to data region start
    pub reserved: [u32; 3],
    pub proj_id: u32,
    pub uid16_gid16: u32,
    pub xattr_ptr: u64,
    pub inode_crc: u64, // low 4 bytes = crc32 of bytes [0..120)
}

impl Inode {
    /// A fresh inode of `kind` with every timestamp set to `now`.
    pub fn new(kind: InodeType, links: u16, size_bytes: u64, now: u64) -> Inode {
        Inode {
            mode: kind.mode(),
            links,
            size_bytes,
            atime: now,
            mtime: now,
            ctime: now,
            ..Inode::default()
        }
    }

    pub fn kind(&self) -> Option<InodeType> {
        InodeType::from_mode(self.mode)
    }

    /// Slot 0 of an unused table entry is all zeroes.
    pub fn is_unused(&self) -> bool {
        self.mode == 0
    }

    /// Number of direct pointers backing `size_bytes`; an empty file still
    /// owns one block. Sizes past `MAX_FILE_SIZE` count as all twelve.
    pub fn blocks_in_use(&self) -> usize {
        let size = self.size_bytes.min(MAX_FILE_SIZE) as usize;
        let n = (size + BLOCK_SIZE - 1) / BLOCK_SIZE;
        n.max(1).min(DIRECT_MAX)
    }

    /// The direct pointers backing this inode, in file order.
    pub fn used_blocks(&self) -> &[u32] {
        &self.direct[..self.blocks_in_use()]
    }

    pub fn to_bytes(&self) -> [u8; INODE_SIZE] {
        let mut b = [0u8; INODE_SIZE];
        write_u16(&mut b, OFF_MODE, self.mode);
        write_u16(&mut b, OFF_LINKS, self.links);
        write_u32(&mut b, OFF_UID, self.uid);
        write_u32(&mut b, OFF_GID, self.gid);
        write_u64(&mut b, OFF_SIZE, self.size_bytes);
        write_u64(&mut b, OFF_ATIME, self.atime);
        write_u64(&mut b, OFF_MTIME, self.mtime);
        write_u64(&mut b, OFF_CTIME, self.ctime);
        for (i, p) in self.direct.iter().enumerate() {
            write_u32(&mut b, OFF_DIRECT + i * 4, *p);
        }
        for (i, r) in self.reserved.iter().enumerate() {
            write_u32(&mut b, OFF_RESERVED + i * 4, *r);
        }
        write_u32(&mut b, OFF_PROJ_ID, self.proj_id);
        write_u32(&mut b, OFF_UID16_GID16, self.uid16_gid16);
        write_u64(&mut b, OFF_XATTR_PTR, self.xattr_ptr);
        write_u64(&mut b, OFF_CRC, self.inode_crc);
        b
    }

    pub fn finalize_checksum(&mut self) {
        let mut tmp = self.to_bytes();
        tmp[OFF_CRC..].iter_mut().for_each(|b| *b = 0);
        self.inode_crc = crc32(&tmp[..OFF_CRC]) as u64;
    }

    pub fn verify_checksum(raw: &[u8]) -> bool {
        raw.len() >= INODE_SIZE && crc32(&raw[..OFF_CRC]) as u64 == read_u64(raw, OFF_CRC)
    }
}

pub fn u8_slice_as_inode(s: &[u8]) -> Inode {
    let mut direct = [0u32; DIRECT_MAX];
    for (i, p) in direct.iter_mut().enumerate() {
        *p = read_u32(s, OFF_DIRECT + i * 4);
    }
    let mut reserved = [0u32; 3];
    for (i, r) in reserved.iter_mut().enumerate() {
        *r = read_u32(s, OFF_RESERVED + i * 4);
    }
    Inode {
        mode: read_u16(s, OFF_MODE),
        links: read_u16(s, OFF_LINKS),
        uid: read_u32(s, OFF_UID),
        gid: read_u32(s, OFF_GID),
        size_bytes: read_u64(s, OFF_SIZE),
        atime: read_u64(s, OFF_ATIME),
        mtime: read_u64(s, OFF_MTIME),
        ctime: read_u64(s, OFF_CTIME),
        direct,
        reserved,
        proj_id: read_u32(s, OFF_PROJ_ID),
        uid16_gid16: read_u32(s, OFF_UID16_GID16),
        xattr_ptr: read_u64(s, OFF_XATTR_PTR),
        inode_crc: read_u64(s, OFF_CRC),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_offsets() {
        let mut ino = Inode::new(InodeType::Dir, 2, 128, 7);
        ino.direct[0] = 0;
        ino.direct[11] = 0xAABB_CCDD;
        let b = ino.to_bytes();
        assert_eq!(read_u16(&b, 0), 0x4000);
        assert_eq!(read_u16(&b, 2), 2);
        assert_eq!(read_u64(&b, 12), 128);
        assert_eq!(read_u64(&b, 36), 7);
        assert_eq!(read_u32(&b, 88), 0xAABB_CCDD);
        assert_eq!(u8_slice_as_inode(&b), ino);
    }

    #[test]
    fn checksum_covers_leading_bytes_only() {
        let mut ino = Inode::new(InodeType::File, 1, 10, 1_700_000_000);
        ino.direct[0] = 1;
        ino.finalize_checksum();
        assert_eq!(ino.inode_crc >> 32, 0);
        let b = ino.to_bytes();
        assert!(Inode::verify_checksum(&b));
        assert_eq!(ino.inode_crc, crc32(&b[..120]) as u64);

        let mut other = ino;
        other.links = 3;
        other.finalize_checksum();
        assert_ne!(other.inode_crc, ino.inode_crc);
        assert!(!Inode::verify_checksum(&{
            let mut t = b;
            t[2] = 9;
            t
        }));
    }

    #[test]
    fn block_usage() {
        let mut ino = Inode::new(InodeType::File, 1, 0, 0);
        assert_eq!(ino.blocks_in_use(), 1);
        ino.size_bytes = 4096;
        assert_eq!(ino.blocks_in_use(), 1);
        ino.size_bytes = 4097;
        assert_eq!(ino.blocks_in_use(), 2);
        ino.size_bytes = MAX_FILE_SIZE;
        assert_eq!(ino.used_blocks().len(), DIRECT_MAX);
        ino.size_bytes = u64::MAX;
        assert_eq!(ino.blocks_in_use(), DIRECT_MAX);
        assert!(Inode::default().is_unused());
    }
}
