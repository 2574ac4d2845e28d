use skipledger_core::{Error, SkipTable, WitnessRepo, ROW_WIDTH};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

fn io_err(context: &'static str, err: std::io::Error) -> Error {
    Error::StorageIo(format!("{context}: {err}"))
}

/// A single flat file of concatenated 64-byte row records, append-only.
/// Opened once at construction; every operation seeks explicitly rather
/// than relying on an implicit cursor, since reads and writes interleave
/// under the ledger's own `RwLock`.
pub struct FileSkipTable {
    file: File,
    size: u64,
}

impl FileSkipTable {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| io_err("opening skip table file", e))?;
        let len = file.metadata().map_err(|e| io_err("reading skip table metadata", e))?.len();
        if len % ROW_WIDTH as u64 != 0 {
            return Err(Error::Malformed("skip table file length is not a multiple of ROW_WIDTH"));
        }
        Ok(Self { file, size: len / ROW_WIDTH as u64 })
    }
}

impl SkipTable for FileSkipTable {
    fn size(&self) -> u64 {
        self.size
    }

    fn add_rows(&mut self, bytes: &[u8], at_index: u64) -> Result<u64, Error> {
        if at_index != self.size {
            return Err(Error::Concurrent);
        }
        if bytes.len() % ROW_WIDTH != 0 {
            return Err(Error::Malformed("add_rows length not a multiple of ROW_WIDTH"));
        }
        self.file
            .seek(SeekFrom::Start(at_index * ROW_WIDTH as u64))
            .map_err(|e| io_err("seeking to append position", e))?;
        self.file.write_all(bytes).map_err(|e| io_err("writing rows", e))?;
        self.file.flush().map_err(|e| io_err("flushing rows", e))?;
        self.size += (bytes.len() / ROW_WIDTH) as u64;
        Ok(self.size)
    }

    fn read_row(&self, index: u64) -> Result<[u8; ROW_WIDTH], Error> {
        if index >= self.size {
            return Err(Error::OutOfRange(index + 1));
        }
        let mut file = self.file.try_clone().map_err(|e| io_err("cloning file handle", e))?;
        file.seek(SeekFrom::Start(index * ROW_WIDTH as u64))
            .map_err(|e| io_err("seeking to row", e))?;
        let mut buf = [0u8; ROW_WIDTH];
        file.read_exact(&mut buf).map_err(|e| io_err("reading row", e))?;
        Ok(buf)
    }

    fn trim_size(&mut self, new_size: u64) -> Result<(), Error> {
        if new_size > self.size {
            return Err(Error::OutOfRange(new_size));
        }
        self.file
            .set_len(new_size * ROW_WIDTH as u64)
            .map_err(|e| io_err("truncating skip table file", e))?;
        self.size = new_size;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Error> {
        self.file.flush().map_err(|e| io_err("flushing on close", e))
    }
}

/// A flat file of length-prefixed witness records: 8-byte row number,
/// 4-byte body length, body. An in-memory index of `(row, offset, len)` is
/// built once at open and kept current by `put_trail`, so `ids`/`trail`
/// never rescan the file.
pub struct FileWitnessRepo {
    path: PathBuf,
    file: File,
    index: Vec<(u64, u64, u32)>,
}

impl FileWitnessRepo {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| io_err("opening witness file", e))?;
        let index = scan_index(&mut file)?;
        Ok(Self { path, file, index })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn scan_index(file: &mut File) -> Result<Vec<(u64, u64, u32)>, Error> {
    file.seek(SeekFrom::Start(0)).map_err(|e| io_err("seeking witness file", e))?;
    let mut index = Vec::new();
    let mut offset = 0u64;
    loop {
        let mut header = [0u8; 12];
        match file.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(io_err("reading witness header", e)),
        }
        let row = u64::from_be_bytes(header[0..8].try_into().unwrap());
        let len = u32::from_be_bytes(header[8..12].try_into().unwrap());
        let body_offset = offset + 12;
        file.seek(SeekFrom::Current(len as i64)).map_err(|e| io_err("skipping witness body", e))?;
        index.push((row, body_offset, len));
        offset = body_offset + len as u64;
    }
    Ok(index)
}

impl WitnessRepo for FileWitnessRepo {
    fn ids(&self) -> Vec<u64> {
        self.index.iter().map(|(row, _, _)| *row).collect()
    }

    fn put_trail(&mut self, row_no: u64, trail: Vec<u8>) -> Result<(), Error> {
        if let Some(&(last, _, _)) = self.index.last() {
            if row_no <= last {
                return Err(Error::Malformed("witness rows must be strictly increasing"));
            }
        }
        let offset = self.file.seek(SeekFrom::End(0)).map_err(|e| io_err("seeking to witness end", e))?;
        self.file.write_all(&row_no.to_be_bytes()).map_err(|e| io_err("writing witness row", e))?;
        self.file.write_all(&(trail.len() as u32).to_be_bytes()).map_err(|e| io_err("writing witness length", e))?;
        self.file.write_all(&trail).map_err(|e| io_err("writing witness body", e))?;
        self.file.flush().map_err(|e| io_err("flushing witness file", e))?;
        self.index.push((row_no, offset + 12, trail.len() as u32));
        Ok(())
    }

    fn trail(&self, row_no: u64) -> Result<Option<Vec<u8>>, Error> {
        let Some(&(_, offset, len)) = self.index.iter().find(|(row, _, _)| *row == row_no) else {
            return Ok(None);
        };
        let mut file = self.file.try_clone().map_err(|e| io_err("cloning witness handle", e))?;
        file.seek(SeekFrom::Start(offset)).map_err(|e| io_err("seeking to witness body", e))?;
        let mut buf = vec![0u8; len as usize];
        file.read_exact(&mut buf).map_err(|e| io_err("reading witness body", e))?;
        Ok(Some(buf))
    }

    fn trim_by_row_number(&mut self, new_size: u64) -> Result<(), Error> {
        let mut keep: Vec<(u64, Vec<u8>)> = Vec::new();
        for &(row, offset, len) in self.index.iter().filter(|(row, _, _)| *row <= new_size) {
            let mut file = self.file.try_clone().map_err(|e| io_err("cloning witness handle", e))?;
            file.seek(SeekFrom::Start(offset)).map_err(|e| io_err("seeking witness body", e))?;
            let mut buf = vec![0u8; len as usize];
            file.read_exact(&mut buf).map_err(|e| io_err("reading witness body", e))?;
            keep.push((row, buf));
        }

        self.file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|e| io_err("reopening witness file for trim", e))?;
        self.index.clear();
        for (row, trail) in keep {
            self.put_trail(row, trail)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skipledger_digest::Hash;
    use tempfile::NamedTempFile;

    fn input(b: u8) -> Hash {
        [b; 32]
    }

    #[test]
    fn file_skip_table_persists_rows() {
        let path = NamedTempFile::new().unwrap().into_temp_path();
        {
            let mut table = FileSkipTable::open(&path).unwrap();
            let mut bytes = Vec::new();
            bytes.extend_from_slice(&input(1));
            bytes.extend_from_slice(&[0u8; 32]);
            table.add_rows(&bytes, 0).unwrap();
        }
        let table = FileSkipTable::open(&path).unwrap();
        assert_eq!(table.size(), 1);
        let record = table.read_row(0).unwrap();
        assert_eq!(&record[0..32], &input(1));
    }

    #[test]
    fn file_skip_table_rejects_misaligned_file() {
        let path = NamedTempFile::new().unwrap().into_temp_path();
        std::fs::write(&path, [0u8; 10]).unwrap();
        assert!(matches!(FileSkipTable::open(&path), Err(Error::Malformed(_))));
    }

    #[test]
    fn file_witness_repo_round_trips_and_trims() {
        let path = NamedTempFile::new().unwrap().into_temp_path();
        {
            let mut witness = FileWitnessRepo::open(&path).unwrap();
            witness.put_trail(2, vec![0xAA, 0xBB]).unwrap();
            witness.put_trail(9, vec![0xCC]).unwrap();
        }
        let mut witness = FileWitnessRepo::open(&path).unwrap();
        assert_eq!(witness.ids(), vec![2, 9]);
        assert_eq!(witness.trail(2).unwrap(), Some(vec![0xAA, 0xBB]));

        witness.trim_by_row_number(5).unwrap();
        assert_eq!(witness.ids(), vec![2]);

        let reopened = FileWitnessRepo::open(&path).unwrap();
        assert_eq!(reopened.ids(), vec![2]);
    }
}
