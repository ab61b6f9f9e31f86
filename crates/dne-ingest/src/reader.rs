//! Snapshot reader
//!
//! Streams [`AddressRecord`]s out of an ordered list of raw logradouro
//! files: files in the given order, lines in file order, one pass. Lines
//! the decoder rejects are skipped silently; I/O failures end the run.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use crate::decoder;
use crate::record::AddressRecord;

/// Lazy, single-pass record source over a set of snapshot files.
pub struct SnapshotReader {
    files: VecDeque<PathBuf>,
    current: Option<BufReader<File>>,
    buf: Vec<u8>,
    decoded: u64,
}

impl SnapshotReader {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self {
            files: files.into(),
            current: None,
            buf: Vec::with_capacity(600),
            decoded: 0,
        }
    }

    /// Number of records yielded so far. After full consumption this is the
    /// snapshot's total decoded-record count.
    pub fn decoded_count(&self) -> u64 {
        self.decoded
    }
}

impl Iterator for SnapshotReader {
    type Item = io::Result<AddressRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current.is_none() {
                let path = self.files.pop_front()?;
                match File::open(&path) {
                    Ok(file) => self.current = Some(BufReader::new(file)),
                    Err(err) => return Some(Err(err)),
                }
            }
            let Some(reader) = self.current.as_mut() else {
                return None;
            };

            self.buf.clear();
            match reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    // End of this file, move on to the next one.
                    self.current = None;
                },
                Ok(_) => {
                    while matches!(self.buf.last(), Some(b'\n' | b'\r')) {
                        self.buf.pop();
                    }
                    if let Some(record) = decoder::decode(&self.buf) {
                        self.decoded += 1;
                        return Some(Ok(record));
                    }
                },
                Err(err) => {
                    self.current = None;
                    return Some(Err(err));
                },
            }
        }
    }
}
