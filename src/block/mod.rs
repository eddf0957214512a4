pub mod bitmap;
pub mod dirent;
pub mod inode;
pub mod sblock;
