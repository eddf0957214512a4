use crate::checksum::xor8;
use crate::converter::*;
use crate::types::*;

const OFF_INODE_NO: usize = 0;
const OFF_TYPE: usize = 4;
const OFF_NAME: usize = 5;
const OFF_CHECKSUM: usize = OFF_NAME + NAME_MAX;

const _: () = assert!(OFF_CHECKSUM + 1 == DIRENT_SIZE);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Dirent {
    pub inode_no: u32, // 0 if free
    pub r#type: u8,
    pub name: [u8; NAME_MAX],
    pub checksum: u8, // XOR of bytes [0..63)
}

impl Default for Dirent {
    fn default() -> Dirent {
        Dirent {
            inode_no: 0,
            r#type: 0,
            name: [0; NAME_MAX],
            checksum: 0,
        }
    }
}

impl Dirent {
    /// Builds an entry with its checksum already finalized. Names longer
    /// than the field are cut at `NAME_MAX` bytes.
    pub fn new(inode_no: u32, kind: InodeType, name: &[u8]) -> Dirent {
        let mut d = Dirent {
            inode_no,
            r#type: kind.dirent_type(),
            ..Dirent::default()
        };
        let len = name.len().min(NAME_MAX);
        d.name[..len].copy_from_slice(&name[..len]);
        d.finalize_checksum();
        d
    }

    pub fn is_free(&self) -> bool {
        self.inode_no == 0
    }

    pub fn kind(&self) -> Option<InodeType> {
        InodeType::from_dirent_type(self.r#type)
    }

    /// Name bytes up to the first NUL, or the whole field when full.
    pub fn name_bytes(&self) -> &[u8] {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(NAME_MAX);
        &self.name[..end]
    }

    pub fn name(&self) -> String {
        String::from_utf8_lossy(self.name_bytes()).into_owned()
    }

    pub fn to_bytes(&self) -> [u8; DIRENT_SIZE] {
        let mut b = [0u8; DIRENT_SIZE];
        write_u32(&mut b, OFF_INODE_NO, self.inode_no);
        b[OFF_TYPE] = self.r#type;
        b[OFF_NAME..OFF_CHECKSUM].copy_from_slice(&self.name);
        b[OFF_CHECKSUM] = self.checksum;
        b
    }

    pub fn finalize_checksum(&mut self) {
        self.checksum = xor8(&self.to_bytes()[..OFF_CHECKSUM]);
    }

    pub fn verify_checksum(raw: &[u8]) -> bool {
        raw.len() >= DIRENT_SIZE && xor8(&raw[..OFF_CHECKSUM]) == raw[OFF_CHECKSUM]
    }
}

pub fn u8_slice_as_dirent(s: &[u8]) -> Dirent {
    let mut name = [0u8; NAME_MAX];
    name.copy_from_slice(&s[OFF_NAME..OFF_CHECKSUM]);
    Dirent {
        inode_no: read_u32(s, OFF_INODE_NO),
        r#type: s[OFF_TYPE],
        name,
        checksum: s[OFF_CHECKSUM],
    }
}

/// Every slot of one directory block, free ones included.
pub fn u8_slice_as_dirents(block: &[u8]) -> Vec<Dirent> {
    (0..DIRENTS_PER_BLOCK)
        .map(|i| u8_slice_as_dirent(&block[dirent_slot_range(i)]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_entry_bytes() {
        let d = Dirent::new(ROOT_INODE, InodeType::Dir, b".");
        let b = d.to_bytes();
        assert_eq!(&b[0..4], &[1, 0, 0, 0]);
        assert_eq!(b[4], 2);
        assert_eq!(b[5], b'.');
        // 1 ^ 2 ^ '.'
        assert_eq!(b[63], 0x2D);
        assert!(Dirent::verify_checksum(&b));
        assert_eq!(u8_slice_as_dirent(&b), d);
    }

    #[test]
    fn long_names_fill_the_field_unterminated() {
        let long = [b'a'; 70];
        let d = Dirent::new(2, InodeType::File, &long);
        assert_eq!(d.name_bytes().len(), NAME_MAX);
        assert!(d.name.iter().all(|&c| c == b'a'));
        assert!(Dirent::verify_checksum(&d.to_bytes()));
    }

    #[test]
    fn free_slots() {
        let block = [0u8; BLOCK_SIZE];
        let all = u8_slice_as_dirents(&block);
        assert_eq!(all.len(), DIRENTS_PER_BLOCK);
        assert!(all.iter().all(Dirent::is_free));
        assert_eq!(all[0].name(), "");
    }

    #[test]
    fn corrupted_entry() {
        let mut b = Dirent::new(2, InodeType::File, b"hello.txt").to_bytes();
        b[10] ^= 0x20;
        assert!(!Dirent::verify_checksum(&b));
    }
}
