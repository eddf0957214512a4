//! MiniVSFS: a flat single-directory filesystem image.
//!
//! [`mkfs::format`] builds a fresh image and [`adder::add_file`] inserts one
//! host file into its root directory. Both work on an in-memory buffer; the
//! [`file`] and [`subcommand`] modules are the host-side layer used by the
//! binary.
pub mod adder;
pub mod block;
pub mod checksum;
pub mod converter;
pub mod error;
pub mod file;
pub mod fsck;
pub mod image;
pub mod layout;
pub mod mkfs;
pub mod subcommand;
pub mod types;

pub use adder::{add_file, AddOptions};
pub use error::{Error, Result};
pub use image::Image;
pub use mkfs::format;
