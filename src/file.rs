use memmap::{MmapMut, MmapOptions};
use std::fs::{metadata, File, OpenOptions};
use std::io;
use std::path::Path;

pub fn get_file_size<P: AsRef<Path>>(path: P) -> io::Result<usize> {
    Ok(metadata(path)?.len() as usize)
}

pub fn is_regular_file<P: AsRef<Path>>(path: P) -> io::Result<bool> {
    Ok(metadata(path)?.is_file())
}

pub fn open_readable_file<P: AsRef<Path>>(path: P) -> io::Result<File> {
    OpenOptions::new().read(true).open(path)
}

pub fn get_memory_mapped_file(file: &File, len: usize) -> io::Result<MmapMut> {
    unsafe { MmapOptions::new().len(len).map_mut(file) }
}

pub fn open_new_file<P: AsRef<Path>>(path: P) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

/// Reads a whole file into an owned buffer through a read-only map.
pub fn read_file<P: AsRef<Path>>(path: P) -> io::Result<Vec<u8>> {
    let file = open_readable_file(&path)?;
    let len = file.metadata()?.len() as usize;
    if len == 0 {
        // zero-length files cannot be mapped
        return Ok(Vec::new());
    }
    let m = unsafe { MmapOptions::new().len(len).map(&file)? };
    Ok(m.to_vec())
}

/// Creates (or truncates) `path` and fills it with `bytes`.
pub fn write_file<P: AsRef<Path>>(path: P, bytes: &[u8]) -> io::Result<()> {
    let file = open_new_file(path)?;
    if bytes.is_empty() {
        return Ok(());
    }
    file.set_len(bytes.len() as u64)?;
    let mut m = get_memory_mapped_file(&file, bytes.len())?;
    m.copy_from_slice(bytes);
    m.flush()
}
