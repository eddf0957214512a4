use crate::adder::AddOptions;
use crate::file::*;
use crate::fsck;
use crate::image::Image;
use crate::mkfs;
use crate::types::BLOCK_SIZE;
use anyhow::{ensure, Context, Result};
use std::io::Write;
use std::path::Path;

pub const SIZE_KIB_MIN: u64 = 180;
pub const SIZE_KIB_MAX: u64 = 4096;
pub const INODES_MIN: u64 = 128;
pub const INODES_MAX: u64 = 512;

pub fn validate_size_kib(s: String) -> std::result::Result<(), String> {
    match s.parse::<u64>() {
        Ok(n) if (SIZE_KIB_MIN..=SIZE_KIB_MAX).contains(&n) && n % 4 == 0 => Ok(()),
        _ => Err(format!(
            "must be {}..{} and a multiple of 4",
            SIZE_KIB_MIN, SIZE_KIB_MAX
        )),
    }
}

pub fn validate_inodes(s: String) -> std::result::Result<(), String> {
    match s.parse::<u64>() {
        Ok(n) if (INODES_MIN..=INODES_MAX).contains(&n) => Ok(()),
        _ => Err(format!("must be {}..{}", INODES_MIN, INODES_MAX)),
    }
}

fn open_image(path: &Path) -> Result<Image> {
    let bytes = read_file(path).with_context(|| format!("reading {}", path.display()))?;
    Image::open(bytes).with_context(|| format!("{}: not a usable image", path.display()))
}

pub fn mkfs(image: &Path, size_kib: u64, inodes: u64) -> Result<()> {
    validate_size_kib(size_kib.to_string()).map_err(|e| anyhow::anyhow!("--size-kib {}", e))?;
    validate_inodes(inodes.to_string()).map_err(|e| anyhow::anyhow!("--inodes {}", e))?;
    let total_blocks = size_kib * 1024 / BLOCK_SIZE as u64;
    let bytes = mkfs::format(total_blocks, inodes)?;
    write_file(image, &bytes).with_context(|| format!("writing {}", image.display()))?;
    Ok(())
}

/// Adds `host_file` to the image at `input` and writes the result to
/// `output`, which may be the same path. Returns the new inode number.
pub fn add(input: &Path, output: &Path, host_file: &Path, opts: AddOptions) -> Result<u32> {
    ensure!(
        is_regular_file(host_file).with_context(|| format!("stat {}", host_file.display()))?,
        "{}: not a regular file",
        host_file.display()
    );
    let name = host_file
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("{}: no usable file name", host_file.display()))?;
    let mut img = open_image(input)?;
    let content =
        read_file(host_file).with_context(|| format!("reading {}", host_file.display()))?;
    let inode_num = img.add_file(name, &content, opts)?;
    write_file(output, img.as_bytes()).with_context(|| format!("writing {}", output.display()))?;
    Ok(inode_num)
}

pub fn ls<W: Write>(image: &Path, out: &mut W) -> Result<()> {
    let img = open_image(image)?;
    for (_, entry) in img.root_entries()? {
        let kind = entry
            .kind()
            .map(|k| k.to_string())
            .unwrap_or_else(|| "?".to_string());
        let size = img
            .read_inode(entry.inode_no)
            .map(|i| i.size_bytes.to_string())
            .unwrap_or_else(|_| "?".to_string());
        writeln!(out, "{:>5} {:<9} {:>8} {}", entry.inode_no, kind, size, entry.name())?;
    }
    Ok(())
}

pub fn cat<W: Write>(image: &Path, name: &str, out: &mut W) -> Result<()> {
    let img = open_image(image)?;
    let inode_num = img.lookup(name)?;
    out.write_all(&img.read_file(inode_num)?)?;
    Ok(())
}

/// Prints every problem found; `Ok(true)` when the image is consistent.
pub fn check<W: Write>(image: &Path, out: &mut W) -> Result<bool> {
    let img = open_image(image)?;
    let report = fsck::check(&img);
    for p in &report.problems {
        writeln!(out, "{}", p)?;
    }
    Ok(report.is_clean())
}
