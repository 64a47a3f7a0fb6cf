//! Journal format, replay and rebuild
//!
//! File format:
//! ```text
//! libcore.io.DiskLruCache
//! 1
//! <app version>
//! <value count>
//!
//! DIRTY <key>
//! CLEAN <key> <len_0> ... <len_n>
//! REMOVE <key>
//! READ <key>
//! ```
//!
//! A rebuild writes `journal.tmp`, moves the live journal to `journal.bkp`,
//! renames the temp file into place and deletes the backup, so a crash at
//! any point leaves one complete journal behind.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while_m_n},
    character::complete::{char, u32 as dec_u32, u64 as dec_u64},
    combinator::{map, value},
    multi::count,
    sequence::{preceded, terminated, tuple},
    IResult,
};

use crate::error::{Error, Result};
use crate::key::{is_key_byte, MAX_KEY_LEN};

/// Journal file name
pub const JOURNAL_FILE: &str = "journal";

/// Journal being rebuilt
pub const JOURNAL_FILE_TEMP: &str = "journal.tmp";

/// Previous journal, kept while a rebuild swaps files
pub const JOURNAL_FILE_BACKUP: &str = "journal.bkp";

/// First header line
pub const MAGIC: &str = "libcore.io.DiskLruCache";

/// Journal format version
pub const VERSION: &str = "1";

/// Values from the journal header that must match the opening cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JournalHeader {
    /// Application version; a change invalidates the cache
    pub app_version: u32,
    /// Number of value slots per entry
    pub value_count: usize,
}

/// One journal line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// An edit started
    Dirty(String),
    /// An edit committed with the given slot lengths
    Clean(String, Vec<u64>),
    /// The entry was removed, or its first edit aborted
    Remove(String),
    /// The entry was read
    Read(String),
}

impl Record {
    /// Key the record refers to
    pub fn key(&self) -> &str {
        match self {
            Record::Dirty(key) | Record::Clean(key, _) | Record::Remove(key) | Record::Read(key) => key,
        }
    }

    fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        match self {
            Record::Dirty(key) => writeln!(out, "DIRTY {}", key),
            Record::Remove(key) => writeln!(out, "REMOVE {}", key),
            Record::Read(key) => writeln!(out, "READ {}", key),
            Record::Clean(key, lengths) => {
                write!(out, "CLEAN {}", key)?;
                for len in lengths {
                    write!(out, " {}", len)?;
                }
                writeln!(out)
            }
        }
    }
}

/// Serialize the journal header
pub fn create_header(header: JournalHeader) -> Vec<u8> {
    format!(
        "{}\n{}\n{}\n{}\n\n",
        MAGIC, VERSION, header.app_version, header.value_count
    )
    .into_bytes()
}

/// Parse the five header lines
pub fn parse_header(input: &[u8]) -> IResult<&[u8], JournalHeader> {
    let (input, (_, _, app_version, value_count, _)) = tuple((
        terminated(tag(MAGIC), char('\n')),
        terminated(tag(VERSION), char('\n')),
        terminated(dec_u32, char('\n')),
        terminated(dec_u64, char('\n')),
        char('\n'),
    ))(input)?;

    Ok((
        input,
        JournalHeader {
            app_version,
            value_count: value_count as usize,
        },
    ))
}

#[derive(Clone, Copy)]
enum Op {
    Clean,
    Dirty,
    Remove,
    Read,
}

fn parse_key(input: &[u8]) -> IResult<&[u8], String> {
    map(take_while_m_n(1, MAX_KEY_LEN, is_key_byte), |key: &[u8]| {
        // key bytes are ASCII
        String::from_utf8_lossy(key).into_owned()
    })(input)
}

/// Parse one `\n`-terminated record
///
/// A CLEAN record must carry exactly `value_count` lengths.
pub fn parse_record(input: &[u8], value_count: usize) -> IResult<&[u8], Record> {
    let (input, op) = alt((
        value(Op::Clean, tag("CLEAN")),
        value(Op::Dirty, tag("DIRTY")),
        value(Op::Remove, tag("REMOVE")),
        value(Op::Read, tag("READ")),
    ))(input)?;
    let (input, key) = preceded(char(' '), parse_key)(input)?;

    match op {
        Op::Clean => {
            let (input, lengths) = terminated(
                count(preceded(char(' '), dec_u64), value_count),
                char('\n'),
            )(input)?;
            Ok((input, Record::Clean(key, lengths)))
        }
        Op::Dirty => map(char('\n'), |_| Record::Dirty(key.clone()))(input),
        Op::Remove => map(char('\n'), |_| Record::Remove(key.clone()))(input),
        Op::Read => map(char('\n'), |_| Record::Read(key.clone()))(input),
    }
}

/// Result of reading a journal from disk
#[derive(Debug)]
pub struct Replay {
    /// Well-formed records in file order
    pub records: Vec<Record>,
    /// Bytes dropped after the last well-formed record
    pub dropped_bytes: usize,
}

impl Replay {
    /// Whether a malformed or truncated tail was dropped
    pub fn recovered_corruption(&self) -> bool {
        self.dropped_bytes > 0
    }
}

/// Read and parse the journal at `path`
///
/// Fails with [`Error::Journal`] when the header does not match `expected`.
/// Records are accepted up to the first malformed one; the remainder is
/// reported through [`Replay::dropped_bytes`].
pub fn read_journal(path: &Path, expected: JournalHeader) -> Result<Replay> {
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Err(Error::Journal("empty journal".to_string()));
    }

    // SAFETY: the journal is only written through this process' single
    // cache instance, and it is not appended to while being replayed.
    let mmap = unsafe { Mmap::map(&file)? };

    let (mut input, header) = parse_header(&mmap[..])?;
    if header != expected {
        return Err(Error::Journal(format!(
            "unexpected journal header: found {:?}, expected {:?}",
            header, expected
        )));
    }

    let mut records = Vec::new();
    while !input.is_empty() {
        match parse_record(input, expected.value_count) {
            Ok((rest, record)) => {
                records.push(record);
                input = rest;
            }
            Err(_) => break,
        }
    }

    Ok(Replay {
        records,
        dropped_bytes: input.len(),
    })
}

/// Append handle for the live journal
pub struct JournalWriter {
    path: PathBuf,
    file: BufWriter<File>,
}

impl JournalWriter {
    /// Open the journal at `path` for appending
    pub fn open_append(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file: BufWriter::new(file),
        })
    }

    /// Write one record and flush it to the OS
    pub fn append(&mut self, record: &Record) -> Result<()> {
        record.write_to(&mut self.file)?;
        self.file.flush()?;
        Ok(())
    }

    /// Flush and fsync
    pub fn sync(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.get_ref().sync_all()?;
        Ok(())
    }

    /// Path of the journal file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Restore the journal from a backup left by an interrupted rebuild
pub fn recover_backup(directory: &Path) -> Result<()> {
    let backup = directory.join(JOURNAL_FILE_BACKUP);
    if !backup.exists() {
        return Ok(());
    }

    let journal = directory.join(JOURNAL_FILE);
    if journal.exists() {
        fs::remove_file(&backup)?;
    } else {
        fs::rename(&backup, &journal)?;
    }
    Ok(())
}

/// Write a fresh journal containing `records` and swap it into place
///
/// Returns an append handle on the new journal.
pub fn rebuild<I>(directory: &Path, header: JournalHeader, records: I) -> Result<JournalWriter>
where
    I: IntoIterator<Item = Record>,
{
    let journal = directory.join(JOURNAL_FILE);
    let temp = directory.join(JOURNAL_FILE_TEMP);
    let backup = directory.join(JOURNAL_FILE_BACKUP);

    {
        let mut out = BufWriter::new(File::create(&temp)?);
        out.write_all(&create_header(header))?;
        for record in records {
            record.write_to(&mut out)?;
        }
        out.flush()?;
        out.get_ref().sync_all()?;
    }

    if journal.exists() {
        fs::rename(&journal, &backup)?;
    }
    fs::rename(&temp, &journal)?;
    delete_if_exists(&backup)?;

    JournalWriter::open_append(&journal)
}

/// Remove a file, treating a missing file as success
pub(crate) fn delete_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HEADER: JournalHeader = JournalHeader {
        app_version: 1,
        value_count: 2,
    };

    fn write_journal(dir: &Path, body: &[u8]) -> PathBuf {
        let path = dir.join(JOURNAL_FILE);
        let mut bytes = create_header(HEADER);
        bytes.extend_from_slice(body);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_parse_header() {
        let header = create_header(HEADER);
        let (rest, parsed) = parse_header(&header).unwrap();

        assert!(rest.is_empty());
        assert_eq!(parsed, HEADER);
    }

    #[test]
    fn test_parse_header_invalid_magic() {
        let mut header = create_header(HEADER);
        header[0] = b'X';

        assert!(parse_header(&header).is_err());
    }

    #[test]
    fn test_parse_records() {
        let input = b"DIRTY abc\nCLEAN abc 3 14\nREAD abc\nREMOVE abc\n";

        let (rest, dirty) = parse_record(input, 2).unwrap();
        assert_eq!(dirty, Record::Dirty("abc".to_string()));
        let (rest, clean) = parse_record(rest, 2).unwrap();
        assert_eq!(clean, Record::Clean("abc".to_string(), vec![3, 14]));
        let (rest, read) = parse_record(rest, 2).unwrap();
        assert_eq!(read, Record::Read("abc".to_string()));
        let (rest, remove) = parse_record(rest, 2).unwrap();
        assert_eq!(remove, Record::Remove("abc".to_string()));
        assert!(rest.is_empty());
    }

    #[test]
    fn test_parse_clean_wrong_length_count() {
        assert!(parse_record(b"CLEAN abc 3\n", 2).is_err());
        assert!(parse_record(b"CLEAN abc 3 4 5\n", 2).is_err());
    }

    #[test]
    fn test_parse_rejects_bad_keys() {
        assert!(parse_record(b"DIRTY ABC\n", 1).is_err());
        assert!(parse_record(b"DIRTY \n", 1).is_err());
        assert!(parse_record(b"UPDATE abc\n", 1).is_err());
    }

    #[test]
    fn test_record_lines() {
        let mut out = Vec::new();
        Record::Clean("k".to_string(), vec![1, 22]).write_to(&mut out).unwrap();
        Record::Read("k".to_string()).write_to(&mut out).unwrap();
        assert_eq!(out, b"CLEAN k 1 22\nREAD k\n");
    }

    #[test]
    fn test_read_journal_drops_truncated_tail() {
        let dir = TempDir::new().unwrap();
        let path = write_journal(dir.path(), b"DIRTY abc\nCLEAN abc 1 2\nDIRTY de");

        let replay = read_journal(&path, HEADER).unwrap();
        assert_eq!(replay.records.len(), 2);
        assert_eq!(replay.dropped_bytes, b"DIRTY de".len());
        assert!(replay.recovered_corruption());
    }

    #[test]
    fn test_read_journal_stops_at_garbage() {
        let dir = TempDir::new().unwrap();
        let path = write_journal(dir.path(), b"DIRTY abc\n\x00\x01junk\nCLEAN abc 1 2\n");

        let replay = read_journal(&path, HEADER).unwrap();
        assert_eq!(replay.records, vec![Record::Dirty("abc".to_string())]);
        assert!(replay.recovered_corruption());
    }

    #[test]
    fn test_read_journal_header_mismatch() {
        let dir = TempDir::new().unwrap();
        let path = write_journal(dir.path(), b"");

        let other = JournalHeader {
            app_version: 2,
            value_count: 2,
        };
        assert!(matches!(read_journal(&path, other), Err(Error::Journal(_))));
    }

    #[test]
    fn test_read_empty_journal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(JOURNAL_FILE);
        File::create(&path).unwrap();

        assert!(matches!(read_journal(&path, HEADER), Err(Error::Journal(_))));
    }

    #[test]
    fn test_rebuild_replaces_journal() {
        let dir = TempDir::new().unwrap();
        write_journal(dir.path(), b"DIRTY a\nCLEAN a 1 1\nREAD a\nREAD a\n");

        let records = vec![Record::Clean("a".to_string(), vec![1, 1])];
        let mut writer = rebuild(dir.path(), HEADER, records).unwrap();
        writer.append(&Record::Read("a".to_string())).unwrap();

        let replay = read_journal(&dir.path().join(JOURNAL_FILE), HEADER).unwrap();
        assert_eq!(
            replay.records,
            vec![
                Record::Clean("a".to_string(), vec![1, 1]),
                Record::Read("a".to_string()),
            ]
        );
        assert!(!dir.path().join(JOURNAL_FILE_TEMP).exists());
        assert!(!dir.path().join(JOURNAL_FILE_BACKUP).exists());
    }

    #[test]
    fn test_recover_backup() {
        let dir = TempDir::new().unwrap();
        let backup = dir.path().join(JOURNAL_FILE_BACKUP);
        fs::write(&backup, create_header(HEADER)).unwrap();

        recover_backup(dir.path()).unwrap();
        assert!(!backup.exists());
        assert!(dir.path().join(JOURNAL_FILE).exists());

        // a backup next to a complete journal is stale
        fs::write(&backup, b"stale").unwrap();
        recover_backup(dir.path()).unwrap();
        assert!(!backup.exists());
        assert_eq!(
            fs::read(dir.path().join(JOURNAL_FILE)).unwrap(),
            create_header(HEADER)
        );
    }
}
