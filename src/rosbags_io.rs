use std::collections::{HashMap, VecDeque};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use rosbag::{ChunkRecord, MessageRecord, RosBag};

use crate::error::ExportError;

const VERSION_LINE: &[u8] = b"#ROSBAG V2.0\n";

/// One message as it sits in the log, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub channel: String,
    /// Receive time in seconds.
    pub timestamp: f64,
    pub payload: Vec<u8>,
}

/// Byte range of the chunk section, as declared by the bag header record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSection {
    /// First byte after the bag header record.
    pub start: u64,
    /// `index_pos` from the bag header.
    pub end: u64,
}

/// Read the version line and the bag header record.
///
/// Record layout: `<header_len: u32><header><data_len: u32><data>`, where the
/// header is a list of `<field_len: u32><name>=<value>` fields.
fn read_chunk_section<R: Read>(reader: &mut R) -> std::io::Result<Option<ChunkSection>> {
    let mut version = [0u8; VERSION_LINE.len()];
    reader.read_exact(&mut version)?;
    if version != VERSION_LINE {
        return Ok(None);
    }

    let header_len = reader.read_u32::<LittleEndian>()?;
    let mut header = vec![0u8; header_len as usize];
    reader.read_exact(&mut header)?;
    let data_len = reader.read_u32::<LittleEndian>()?;

    let mut index_pos = None;
    let mut fields = header.as_slice();
    while fields.len() >= 4 {
        let field_len = (&fields[..4]).read_u32::<LittleEndian>()? as usize;
        let Some(field) = fields.get(4..4 + field_len) else {
            return Ok(None);
        };
        if let Some(value) = field.strip_prefix(b"index_pos=") {
            index_pos = Some((&*value).read_u64::<LittleEndian>()?);
        }
        fields = &fields[4 + field_len..];
    }

    let start = (VERSION_LINE.len() + 8) as u64 + u64::from(header_len) + u64::from(data_len);
    Ok(index_pos.map(|end| ChunkSection { start, end }))
}

/// Open a bag and check that its chunk section lies inside the file.
///
/// A bag whose recording was never closed has `index_pos == 0`, and a
/// truncated copy declares an index past the end of the file. Both are
/// rejected here, before any record is read.
pub fn open_bag(path: &Path) -> Result<RosBag, ExportError> {
    let bag = RosBag::new(path).map_err(|e| ExportError::OpenLog {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let file = File::open(path).map_err(|e| ExportError::io(path, e))?;
    let len = file.metadata().map_err(|e| ExportError::io(path, e))?.len();
    let section = read_chunk_section(&mut BufReader::new(file))
        .ok()
        .flatten()
        .ok_or_else(|| ExportError::LogCorrupt {
            message: format!("'{}': unreadable bag header record", path.display()),
        })?;

    if section.end < section.start {
        return Err(ExportError::LogCorrupt {
            message: format!(
                "'{}': bag is not indexed (index_pos={}); \
                 the recording was not closed, run `rosbag reindex` on it",
                path.display(),
                section.end
            ),
        });
    }
    if section.end > len {
        return Err(ExportError::LogCorrupt {
            message: format!(
                "'{}': bag is truncated (index at byte {} but file is {} bytes)",
                path.display(),
                section.end,
                len
            ),
        });
    }
    tracing::debug!(start = section.start, end = section.end, "chunk section");
    Ok(bag)
}

type ChunkIter<'a> = Box<dyn Iterator<Item = Result<ChunkRecord<'a>, String>> + 'a>;

/// Forward-only reader over the messages of a bag.
///
/// Holds at most one chunk worth of records. On a container error the
/// records read before it are yielded first, then the error once, after
/// which the scanner is exhausted.
pub struct BagScanner<'a> {
    chunks: ChunkIter<'a>,
    connections: HashMap<u32, String>,
    pending: VecDeque<LogRecord>,
    error: Option<ExportError>,
    done: bool,
}

impl<'a> BagScanner<'a> {
    /// `bag` should come from [`open_bag`], which validates the chunk section.
    pub fn new(bag: &'a RosBag) -> Self {
        Self {
            chunks: Box::new(bag.chunk_records().map(|r| r.map_err(|e| e.to_string()))),
            connections: HashMap::new(),
            pending: VecDeque::new(),
            error: None,
            done: false,
        }
    }

    /// Number of connections (channels) learned so far.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    fn fill_from_next_chunk(&mut self) -> Result<bool, ExportError> {
        let Some(record) = self.chunks.next() else {
            return Ok(false);
        };
        let record = record.map_err(|message| ExportError::LogCorrupt { message })?;
        if let ChunkRecord::Chunk(chunk) = record {
            for msg in chunk.messages() {
                let msg = msg.map_err(|e| ExportError::LogCorrupt {
                    message: e.to_string(),
                })?;
                match msg {
                    MessageRecord::Connection(conn) => {
                        self.connections.insert(conn.id, conn.topic.to_string());
                    }
                    MessageRecord::MessageData(data) => match self.connections.get(&data.conn_id) {
                        Some(topic) => self.pending.push_back(LogRecord {
                            channel: topic.clone(),
                            timestamp: data.time as f64 / 1_000_000_000.0,
                            payload: data.data.to_vec(),
                        }),
                        None => {
                            tracing::debug!(
                                conn_id = data.conn_id,
                                "message on unknown connection; skipping"
                            );
                        }
                    },
                }
            }
        }
        Ok(true)
    }
}

impl Iterator for BagScanner<'_> {
    type Item = Result<LogRecord, ExportError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.pending.pop_front() {
                return Some(Ok(record));
            }
            if let Some(e) = self.error.take() {
                return Some(Err(e));
            }
            if self.done {
                return None;
            }
            match self.fill_from_next_chunk() {
                Ok(true) => {}
                Ok(false) => self.done = true,
                Err(e) => {
                    self.done = true;
                    self.error = Some(e);
                }
            }
        }
    }
}
