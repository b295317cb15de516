//! Remnants feed: the authoritative stock export of the watch supplier
//!
//! The supplier publishes a zip archive holding one Excel workbook. The first rows of
//! the sheet are a report banner; the column header sits at a fixed row offset and the
//! rows below it are one product each. Text exports of the same sheet are accepted too.

use std::borrow::Cow;
use std::io::{Cursor, Read};
use std::path::Path;

use calamine::{Data, Reader, Xls};
use encoding_rs::WINDOWS_1251;
use reqwest::Client;

use crate::error::{Result, SyncError};
use crate::models::RawFeedRecord;

/// Where the supplier publishes the remnants archive
pub const REMNANTS_URL: &str = "https://timeworld.ru/upload/files/ostatki.zip";

/// Banner rows above the column header
pub const HEADER_ROW_OFFSET: usize = 17;

const CODE_COLUMN: &str = "Код";
const QUANTITY_COLUMN: &str = "Количество";
const PRICE_COLUMN: &str = "Цена";

/// Archive entries that hold the table, in order of preference
const TABLE_EXTENSIONS: [&str; 4] = ["xls", "csv", "tsv", "txt"];

/// Compound document signature of binary Excel files
const OLE_MAGIC: [u8; 4] = [0xD0, 0xCF, 0x11, 0xE0];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Downloader for the zipped remnants export
pub struct RemnantsArchive {
    client: Client,
    url: String,
}

impl RemnantsArchive {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }

    /// Use a preconfigured HTTP client (timeouts, proxies)
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Download the archive and parse the table inside it
    pub async fn download(&self) -> Result<Vec<RawFeedRecord>> {
        log::info!("Downloading remnants from {}", self.url);

        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::HttpStatus { status, body });
        }

        let bytes = response.bytes().await?;
        log::debug!("Remnants archive: {} bytes", bytes.len());

        let table = extract_table(&bytes)?;
        let records = parse_remnants(&table)?;
        log::info!("Loaded {} remnant rows", records.len());
        Ok(records)
    }
}

impl Default for RemnantsArchive {
    fn default() -> Self {
        Self::new(REMNANTS_URL)
    }
}

/// Read remnants from a local file, either the zip archive or the bare table
pub fn read_remnants(path: &Path) -> Result<Vec<RawFeedRecord>> {
    log::info!("Reading remnants from {}", path.display());

    let data = std::fs::read(path)?;
    let is_zip = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));

    let records = if is_zip {
        parse_remnants(&extract_table(&data)?)?
    } else {
        parse_remnants(&data)?
    };
    log::info!("Loaded {} remnant rows", records.len());
    Ok(records)
}

/// Pull the table entry out of a zip archive
pub fn extract_table(archive: &[u8]) -> Result<Vec<u8>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(archive))?;

    let mut chosen: Option<(usize, usize)> = None;
    for index in 0..archive.len() {
        let entry = archive.by_index(index)?;
        if !entry.is_file() {
            continue;
        }
        let rank = TABLE_EXTENSIONS.iter().position(|ext| {
            Path::new(entry.name())
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case(ext))
        });
        if let Some(rank) = rank {
            if chosen.map_or(true, |(best, _)| rank < best) {
                chosen = Some((rank, index));
            }
        }
    }

    let (_, index) = chosen
        .ok_or_else(|| SyncError::Feed("archive holds no remnants table".to_string()))?;
    let mut entry = archive.by_index(index)?;
    log::debug!("Extracting {} ({} bytes)", entry.name(), entry.size());

    let mut table = Vec::new();
    entry.read_to_end(&mut table)?;
    Ok(table)
}

/// Parse the remnants table: banner rows, header row, then one product per row.
///
/// Binary Excel workbooks are read from their first sheet. Text tables take their
/// delimiter from the header row (`;`, tab or `,`) and may be UTF-8 or Windows-1251.
/// Rows without a code are skipped.
pub fn parse_remnants(data: &[u8]) -> Result<Vec<RawFeedRecord>> {
    if data.starts_with(&OLE_MAGIC) {
        parse_workbook(data)
    } else {
        parse_text_table(data)
    }
}

/// Required column positions in the header row
struct Columns {
    code: usize,
    quantity: usize,
    price: usize,
}

impl Columns {
    fn locate<S: AsRef<str>>(header: &[S]) -> Result<Self> {
        let column = |name: &str| {
            header
                .iter()
                .position(|h| h.as_ref().trim() == name)
                .ok_or_else(|| SyncError::Feed(format!("column '{name}' not found")))
        };
        Ok(Self {
            code: column(CODE_COLUMN)?,
            quantity: column(QUANTITY_COLUMN)?,
            price: column(PRICE_COLUMN)?,
        })
    }

    /// `None` for rows without a code (totals, separators)
    fn record(&self, field: impl Fn(usize) -> String) -> Option<RawFeedRecord> {
        let code = field(self.code).trim().to_string();
        if code.is_empty() {
            return None;
        }
        Some(RawFeedRecord {
            code,
            quantity: field(self.quantity).trim().to_string(),
            price: field(self.price).trim().to_string(),
        })
    }
}

fn parse_workbook(data: &[u8]) -> Result<Vec<RawFeedRecord>> {
    let mut workbook: Xls<_> = Xls::new(Cursor::new(data))?;
    let sheet = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| SyncError::Feed("workbook has no sheets".to_string()))??;

    // Sheet rows are addressed absolutely; the range itself starts at the first
    // non-empty cell.
    let header_row = HEADER_ROW_OFFSET as u32;
    let Some((last_row, last_col)) = sheet.end().filter(|&(row, _)| row >= header_row) else {
        return Err(SyncError::Feed(format!(
            "no header row after {HEADER_ROW_OFFSET} banner rows"
        )));
    };
    let cell = |row: u32, col: usize| {
        sheet
            .get_value((row, col as u32))
            .map(Data::to_string)
            .unwrap_or_default()
    };

    let header: Vec<String> = (0..=last_col as usize)
        .map(|col| cell(header_row, col))
        .collect();
    let columns = Columns::locate(&header)?;
    log::debug!("Workbook sheet: {} rows below header", last_row - header_row);

    Ok((header_row + 1..=last_row)
        .filter_map(|row| columns.record(|col| cell(row, col)))
        .collect())
}

fn parse_text_table(data: &[u8]) -> Result<Vec<RawFeedRecord>> {
    let text = decode_text(data);

    let header_start: usize = text
        .split_inclusive('\n')
        .take(HEADER_ROW_OFFSET)
        .map(str::len)
        .sum();
    let table = &text[header_start..];
    let header_line = table.lines().next().unwrap_or_default();
    if header_line.trim().is_empty() {
        return Err(SyncError::Feed(format!(
            "no header row after {HEADER_ROW_OFFSET} banner rows"
        )));
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(detect_delimiter(header_line))
        .flexible(true)
        .from_reader(table.as_bytes());

    let headers = reader.headers()?.clone();
    let header: Vec<&str> = headers.iter().collect();
    let columns = Columns::locate(&header)?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let field = |idx: usize| row.get(idx).unwrap_or_default().to_string();
        if let Some(record) = columns.record(field) {
            records.push(record);
        }
    }

    Ok(records)
}

/// UTF-8 when valid, otherwise the Windows-1251 that Russian Excel exports
fn decode_text(data: &[u8]) -> Cow<'_, str> {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
    match std::str::from_utf8(data) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            log::debug!("Remnants table is not UTF-8, decoding as Windows-1251");
            WINDOWS_1251.decode_without_bom_handling(data).0
        }
    }
}

fn detect_delimiter(header_line: &str) -> u8 {
    [b';', b'\t', b',']
        .into_iter()
        .max_by_key(|d| header_line.bytes().filter(|b| b == d).count())
        .filter(|d| header_line.as_bytes().contains(d))
        .unwrap_or(b';')
}

#[cfg(test)]
#[path = "feed_tests.rs"]
mod tests;
