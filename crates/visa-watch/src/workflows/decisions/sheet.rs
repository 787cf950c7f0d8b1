//! Reads the first table of an OpenDocument spreadsheet into a grid that
//! keeps absolute positions.
//!
//! Row 0 is the first `table:table-row` and column 0 is column A, whatever the
//! content. Blank leading rows and columns, repeated rows and cells, and
//! covered (merged) cells all keep their place in the grid. Trailing blank
//! repeats, which office suites write out to the sheet limits, are dropped.

use std::io::{Cursor, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

const CONTENT_ENTRY: &str = "content.xml";

const TABLE: &[u8] = b"table:table";
const ROW: &[u8] = b"table:table-row";
const CELL: &[u8] = b"table:table-cell";
const COVERED_CELL: &[u8] = b"table:covered-table-cell";
const PARAGRAPH: &[u8] = b"text:p";
const SPACE: &[u8] = b"text:s";
const TAB: &[u8] = b"text:tab";
const LINE_BREAK: &[u8] = b"text:line-break";
const ANNOTATION: &[u8] = b"office:annotation";

const ROWS_REPEATED: &[u8] = b"table:number-rows-repeated";
const COLUMNS_REPEATED: &[u8] = b"table:number-columns-repeated";
const VALUE_TYPE: &[u8] = b"office:value-type";
const VALUE: &[u8] = b"office:value";
const SPACE_COUNT: &[u8] = b"text:c";

#[derive(Debug, thiserror::Error)]
pub enum SheetError {
    #[error("not an OpenDocument archive: {0}")]
    Archive(String),
    #[error("malformed spreadsheet content: {0}")]
    Xml(String),
    #[error("spreadsheet contains no sheets")]
    NoTables,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

static EMPTY: Cell = Cell::Empty;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    pub fn from_ods(bytes: &[u8]) -> Result<Self, SheetError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|err| SheetError::Archive(err.to_string()))?;
        let mut entry = archive
            .by_name(CONTENT_ENTRY)
            .map_err(|err| SheetError::Archive(err.to_string()))?;

        let mut xml = String::new();
        entry
            .read_to_string(&mut xml)
            .map_err(|err| SheetError::Archive(err.to_string()))?;

        parse_content(&xml)
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Columns up to and including the right-most non-empty cell.
    pub fn width(&self) -> usize {
        self.rows
            .iter()
            .filter_map(|row| row.iter().rposition(|cell| !cell.is_empty()))
            .map(|last| last + 1)
            .max()
            .unwrap_or(0)
    }

    /// Cell at an absolute position; anything outside the grid is empty.
    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .unwrap_or(&EMPTY)
    }
}

#[derive(Default)]
struct RowBuilder {
    cells: Vec<Cell>,
    pending_empty: usize,
}

impl RowBuilder {
    fn push(&mut self, cell: Cell, repeat: usize) {
        if cell.is_empty() {
            self.pending_empty += repeat;
            return;
        }
        self.cells
            .extend(std::iter::repeat(Cell::Empty).take(self.pending_empty));
        self.pending_empty = 0;
        self.cells.extend(std::iter::repeat(cell).take(repeat));
    }
}

#[derive(Default)]
struct GridBuilder {
    rows: Vec<Vec<Cell>>,
    pending_empty: usize,
}

impl GridBuilder {
    fn push(&mut self, cells: Vec<Cell>, repeat: usize) {
        if cells.is_empty() {
            self.pending_empty += repeat;
            return;
        }
        self.rows
            .extend(std::iter::repeat_with(Vec::new).take(self.pending_empty));
        self.pending_empty = 0;
        self.rows.extend(std::iter::repeat(cells).take(repeat));
    }

    fn finish(self) -> Sheet {
        Sheet { rows: self.rows }
    }
}

struct CellBuilder {
    value_type: Option<String>,
    value: Option<String>,
    repeat: usize,
    text: String,
    paragraphs: usize,
    paragraph_depth: usize,
    annotation_depth: usize,
}

impl CellBuilder {
    fn start(element: &BytesStart<'_>) -> Result<Self, SheetError> {
        Ok(Self {
            value_type: attribute(element, VALUE_TYPE)?,
            value: attribute(element, VALUE)?,
            repeat: repeat_count(element, COLUMNS_REPEATED)?,
            text: String::new(),
            paragraphs: 0,
            paragraph_depth: 0,
            annotation_depth: 0,
        })
    }

    fn collecting(&self) -> bool {
        self.paragraph_depth > 0 && self.annotation_depth == 0
    }

    fn open_paragraph(&mut self) {
        if self.annotation_depth > 0 {
            return;
        }
        if self.paragraphs > 0 {
            self.text.push('\n');
        }
        self.paragraphs += 1;
        self.paragraph_depth += 1;
    }

    fn close_paragraph(&mut self) {
        if self.annotation_depth == 0 {
            self.paragraph_depth = self.paragraph_depth.saturating_sub(1);
        }
    }

    fn push_text(&mut self, text: &str) {
        if self.collecting() {
            self.text.push_str(text);
        }
    }

    fn finish(self) -> (Cell, usize) {
        let number = match self.value_type.as_deref() {
            Some("float" | "percentage" | "currency") => self
                .value
                .as_deref()
                .and_then(|value| value.trim().parse::<f64>().ok()),
            _ => None,
        };

        let cell = match number {
            Some(value) => Cell::Number(value),
            None if self.text.is_empty() => Cell::Empty,
            None => Cell::Text(self.text),
        };
        (cell, self.repeat)
    }
}

fn xml_error(err: impl std::fmt::Display) -> SheetError {
    SheetError::Xml(err.to_string())
}

fn attribute(element: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, SheetError> {
    match element.try_get_attribute(key).map_err(xml_error)? {
        Some(attr) => Ok(Some(attr.unescape_value().map_err(xml_error)?.into_owned())),
        None => Ok(None),
    }
}

fn repeat_count(element: &BytesStart<'_>, key: &[u8]) -> Result<usize, SheetError> {
    match attribute(element, key)? {
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .map(|count| count.max(1))
            .map_err(|_| SheetError::Xml(format!("invalid repeat count '{raw}'"))),
        None => Ok(1),
    }
}

fn is_cell(name: &[u8]) -> bool {
    name == CELL || name == COVERED_CELL
}

/// Parses `content.xml` and returns the grid of its first table.
fn parse_content(xml: &str) -> Result<Sheet, SheetError> {
    let mut reader = Reader::from_str(xml);

    let mut grid: Option<GridBuilder> = None;
    let mut table_depth = 0usize;
    let mut row: Option<(RowBuilder, usize)> = None;
    let mut cell: Option<CellBuilder> = None;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(element) => {
                let name = element.name();
                let name = name.as_ref();
                if name == TABLE {
                    table_depth += 1;
                    if grid.is_none() {
                        grid = Some(GridBuilder::default());
                    }
                } else if table_depth != 1 {
                    continue;
                } else if name == ROW {
                    row = Some((
                        RowBuilder::default(),
                        repeat_count(&element, ROWS_REPEATED)?,
                    ));
                } else if is_cell(name) && row.is_some() {
                    cell = Some(CellBuilder::start(&element)?);
                } else if let Some(current) = cell.as_mut() {
                    if name == PARAGRAPH {
                        current.open_paragraph();
                    } else if name == ANNOTATION {
                        current.annotation_depth += 1;
                    }
                }
            }
            Event::Empty(element) => {
                let name = element.name();
                let name = name.as_ref();
                if name == TABLE && table_depth == 0 {
                    grid.get_or_insert_with(GridBuilder::default);
                    break;
                } else if table_depth != 1 {
                    continue;
                } else if name == ROW {
                    if let Some(grid) = grid.as_mut() {
                        grid.push(Vec::new(), repeat_count(&element, ROWS_REPEATED)?);
                    }
                } else if is_cell(name) {
                    if let Some((current_row, _)) = row.as_mut() {
                        let (value, repeat) = CellBuilder::start(&element)?.finish();
                        current_row.push(value, repeat);
                    }
                } else if let Some(current) = cell.as_mut() {
                    if name == SPACE {
                        let count = repeat_count(&element, SPACE_COUNT)?;
                        current.push_text(&" ".repeat(count));
                    } else if name == TAB {
                        current.push_text("\t");
                    } else if name == LINE_BREAK {
                        current.push_text("\n");
                    } else if name == PARAGRAPH {
                        current.open_paragraph();
                        current.close_paragraph();
                    }
                }
            }
            Event::Text(text) => {
                if let Some(current) = cell.as_mut() {
                    if current.collecting() {
                        let text = text.unescape().map_err(xml_error)?;
                        current.push_text(&text);
                    }
                }
            }
            Event::End(element) => {
                let name = element.name();
                let name = name.as_ref();
                if name == TABLE {
                    table_depth = table_depth.saturating_sub(1);
                    if table_depth == 0 && grid.is_some() {
                        break;
                    }
                } else if table_depth != 1 {
                    continue;
                } else if name == ROW {
                    if let (Some((finished, repeat)), Some(grid)) = (row.take(), grid.as_mut()) {
                        grid.push(finished.cells, repeat);
                    }
                } else if is_cell(name) {
                    if let (Some(finished), Some((current_row, _))) = (cell.take(), row.as_mut()) {
                        let (value, repeat) = finished.finish();
                        current_row.push(value, repeat);
                    }
                } else if let Some(current) = cell.as_mut() {
                    if name == PARAGRAPH {
                        current.close_paragraph();
                    } else if name == ANNOTATION {
                        current.annotation_depth = current.annotation_depth.saturating_sub(1);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    grid.map(GridBuilder::finish).ok_or(SheetError::NoTables)
}
