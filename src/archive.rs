//! Lists the class files inside a jar. Only entry names are read; entry
//! contents are never decompressed.
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use zip::ZipArchive;

use crate::artifact::ArtifactSpec;

/// Entries whose names end with this suffix are compiled classes
pub const CLASS_SUFFIX: &str = ".class";

/// The class-file entries of one archive, in the order the archive lists them,
/// together with the label of the archive they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveListing {
    /// The label of the archive's `ArtifactSpec`
    pub label: String,
    /// Names of the archive's `.class` entries
    pub class_entries: Vec<String>,
}

/// Is the entry named `name` a class file?
#[must_use]
pub fn is_class_file(name: &str) -> bool {
    name.ends_with(CLASS_SUFFIX)
}

/// Open the archive at `path` and return the names of its class files
pub fn class_entries(path: &Path) -> Result<Vec<String>> {
    let file =
        File::open(path).with_context(|| format!("Can't open archive: {}", path.display()))?;
    class_entries_of(BufReader::new(file))
        .with_context(|| format!("Can't read archive: {}", path.display()))
}

/// The reader-generic part of `class_entries`. The zip reader validates the
/// archive, but it keeps one entry per name, so the names themselves come from
/// the central directory records, repeats included.
pub fn class_entries_of(mut reader: impl Read + Seek) -> Result<Vec<String>> {
    drop(ZipArchive::new(&mut reader)?);
    let names = central_directory_names(&mut reader)?;
    Ok(names.into_iter().filter(|name| is_class_file(name)).collect())
}

const EOCD_SIGNATURE: u32 = 0x0605_4b50;
const EOCD_LEN: usize = 22;
const ZIP64_LOCATOR_SIGNATURE: u32 = 0x0706_4b50;
const ZIP64_LOCATOR_LEN: u64 = 20;
const ZIP64_EOCD_SIGNATURE: u32 = 0x0606_4b50;
const ZIP64_EOCD_LEN: usize = 56;
const CENTRAL_HEADER_SIGNATURE: u32 = 0x0201_4b50;
const CENTRAL_HEADER_LEN: usize = 46;
const MAX_COMMENT_LEN: usize = u16::MAX as usize;

fn u16_at(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

fn u32_at(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn u64_at(buf: &[u8], at: usize) -> u64 {
    let mut bytes = [0; 8];
    bytes.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(bytes)
}

fn read_exact_at(reader: &mut (impl Read + Seek), at: u64, len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0; len];
    reader.seek(SeekFrom::Start(at))?;
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Where the central directory starts, and how many records it holds
struct CentralDirectory {
    start: u64,
    records: u64,
}

/// Find the end of central directory record by scanning back from the end of
/// the archive, following the zip64 locator when the record's fields overflow.
/// The directory's start is computed back from the end record rather than
/// taken from its offset field, so jars with a prepended stub still list.
fn locate_central_directory(reader: &mut (impl Read + Seek)) -> Result<CentralDirectory> {
    let file_len = reader.seek(SeekFrom::End(0))?;
    let tail_len = usize::try_from(file_len).map_or(EOCD_LEN + MAX_COMMENT_LEN, |len| {
        len.min(EOCD_LEN + MAX_COMMENT_LEN)
    });
    anyhow::ensure!(tail_len >= EOCD_LEN, "too short to be a zip archive");
    let tail_start = file_len - tail_len as u64;
    let tail = read_exact_at(reader, tail_start, tail_len)?;

    let eocd = (0..=tail_len.saturating_sub(EOCD_LEN))
        .rev()
        .find(|&at| u32_at(&tail, at) == EOCD_SIGNATURE)
        .context("no end of central directory record")?;
    let eocd_offset = tail_start + eocd as u64;
    let records = u64::from(u16_at(&tail, eocd + 10));
    let size = u64::from(u32_at(&tail, eocd + 12));
    let offset = u32_at(&tail, eocd + 16);

    let overflowed =
        records == u64::from(u16::MAX) || size == u64::from(u32::MAX) || offset == u32::MAX;
    if overflowed {
        if let Some(zip64) = locate_zip64_directory(reader, eocd_offset)? {
            return Ok(zip64);
        }
    }
    let start = eocd_offset.checked_sub(size).context("central directory size out of range")?;
    Ok(CentralDirectory { start, records })
}

/// Follow the zip64 locator just before the end record at `eocd_offset`, if
/// there is one.
fn locate_zip64_directory(
    reader: &mut (impl Read + Seek),
    eocd_offset: u64,
) -> Result<Option<CentralDirectory>> {
    let Some(locator_offset) = eocd_offset.checked_sub(ZIP64_LOCATOR_LEN) else {
        return Ok(None);
    };
    let locator = read_exact_at(reader, locator_offset, ZIP64_LOCATOR_LEN as usize)?;
    if u32_at(&locator, 0) != ZIP64_LOCATOR_SIGNATURE {
        return Ok(None);
    }
    // The locator's offset is relative to the start of the archive proper; with
    // a prepended stub the end record sits directly before the locator instead.
    let recorded = u64_at(&locator, 8);
    let adjacent = locator_offset.checked_sub(ZIP64_EOCD_LEN as u64);
    let mut found = None;
    for zip64_offset in std::iter::once(recorded).chain(adjacent) {
        match read_exact_at(reader, zip64_offset, ZIP64_EOCD_LEN) {
            Ok(zip64) if u32_at(&zip64, 0) == ZIP64_EOCD_SIGNATURE => {
                found = Some((zip64_offset, zip64));
                break;
            }
            _ => continue,
        }
    }
    let (zip64_offset, zip64) = found.context("missing zip64 end record")?;
    let records = u64_at(&zip64, 32);
    let size = u64_at(&zip64, 40);
    let start = zip64_offset.checked_sub(size).context("central directory size out of range")?;
    Ok(Some(CentralDirectory { start, records }))
}

/// Every entry name in the central directory, in directory order
fn central_directory_names(reader: &mut (impl Read + Seek)) -> Result<Vec<String>> {
    let CentralDirectory { start, records } = locate_central_directory(reader)?;
    reader.seek(SeekFrom::Start(start))?;
    let mut names = Vec::new();
    let mut header = [0; CENTRAL_HEADER_LEN];
    for idx in 0..records {
        reader
            .read_exact(&mut header)
            .with_context(|| format!("Can't read entry number {idx}"))?;
        anyhow::ensure!(
            u32_at(&header, 0) == CENTRAL_HEADER_SIGNATURE,
            "bad central directory header for entry number {idx}"
        );
        let name_len = usize::from(u16_at(&header, 28));
        let skip = i64::from(u16_at(&header, 30)) + i64::from(u16_at(&header, 32));
        let mut name = vec![0; name_len];
        reader
            .read_exact(&mut name)
            .with_context(|| format!("Can't read the name of entry number {idx}"))?;
        reader.seek(SeekFrom::Current(skip))?;
        names.push(String::from_utf8_lossy(&name).into_owned());
    }
    Ok(names)
}

/// An iterator over the listings of the archives named by `specs`. Each
/// archive is opened, listed and closed when its listing is requested, so the
/// caller sees archives one at a time, in order.
pub struct Listings<'a> {
    specs: std::slice::Iter<'a, ArtifactSpec>,
}

impl<'a> From<&'a [ArtifactSpec]> for Listings<'a> {
    fn from(specs: &'a [ArtifactSpec]) -> Self {
        Listings { specs: specs.iter() }
    }
}

impl Iterator for Listings<'_> {
    type Item = Result<ArchiveListing>;
    fn next(&mut self) -> Option<Self::Item> {
        self.specs.next().map(|spec| {
            tracing::debug!(path = %spec.path.display(), label = %spec.label, "scanning archive");
            let class_entries = class_entries(&spec.path)?;
            Ok(ArchiveListing { label: spec.label.clone(), class_entries })
        })
    }
}
