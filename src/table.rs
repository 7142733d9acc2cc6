use crate::payload::Table;
use regex_lite::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

pub fn extract_table(raw: &str) -> Option<Table> {
    if raw.trim().is_empty() {
        return None;
    }
    if looks_like_html(raw) {
        let document = Html::parse_fragment(raw);
        if let Some(table) = html_table(&document) {
            return Some(table);
        }
        if let Some(text) = pre_text(&document) {
            return text_table(&text);
        }
        return None;
    }
    text_table(raw)
}

fn looks_like_html(raw: &str) -> bool {
    let lower = raw.to_ascii_lowercase();
    lower.contains("<table") || lower.contains("<pre")
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn html_table(document: &Html) -> Option<Table> {
    let table_sel = selector("table")?;
    let row_sel = selector("tr")?;
    let header_sel = selector("th")?;
    let cell_sel = selector("td")?;

    let table = document.select(&table_sel).next()?;
    let mut headers: Vec<String> = Vec::new();
    let mut rows: Vec<Vec<Option<String>>> = Vec::new();

    for tr in table.select(&row_sel) {
        let ths: Vec<String> = tr.select(&header_sel).map(cell_text).collect();
        if headers.is_empty() && !ths.is_empty() {
            headers = ths;
            continue;
        }
        let cells: Vec<Option<String>> = tr
            .select(&cell_sel)
            .map(cell_text)
            .map(|text| if text.is_empty() { None } else { Some(text) })
            .collect();
        if cells.is_empty() {
            continue;
        }
        if headers.is_empty() {
            // No <th> row: the first data row carries the labels.
            headers = cells.into_iter().map(Option::unwrap_or_default).collect();
            continue;
        }
        rows.push(cells);
    }

    debug!(
        "Extracted HTML table with {} columns, {} rows",
        headers.len(),
        rows.len()
    );
    if headers.is_empty() {
        None
    } else {
        Some(Table { headers, rows })
    }
}

fn pre_text(document: &Html) -> Option<String> {
    let pre_sel = selector("pre")?;
    document
        .select(&pre_sel)
        .next()
        .map(|pre| pre.text().collect::<String>())
}

/// Split preformatted text. The first line mentioning a date is the header.
/// Tab or comma separated text is split on the separator; anything else is
/// read as fixed-width columns laid out under the header labels.
fn text_table(text: &str) -> Option<Table> {
    let mut lines = text.lines().map(str::trim_end).skip_while(|line| {
        !line.to_ascii_lowercase().contains("date")
    });
    let header_line = lines.next()?;
    let body = lines.filter(|line| !line.trim().is_empty());

    let splitter = if header_line.contains('\t') {
        Some(Regex::new(r"\t").ok()?)
    } else if header_line.contains(',') {
        Some(Regex::new(r"\s*,\s*").ok()?)
    } else {
        None
    };

    let Some(splitter) = splitter else {
        let starts = column_starts(header_line);
        let headers = slice_columns(header_line, &starts)
            .into_iter()
            .map(Option::unwrap_or_default)
            .collect();
        let rows = body.map(|line| slice_columns(line, &starts)).collect();
        return Some(Table { headers, rows });
    };

    let split = |line: &str| -> Vec<String> {
        splitter
            .split(line.trim())
            .map(|s| s.trim().to_string())
            .collect()
    };

    let headers = split(header_line);
    let rows = body
        .map(|line| {
            split(line)
                .into_iter()
                .map(|s| if s.is_empty() { None } else { Some(s) })
                .collect()
        })
        .collect();

    Some(Table { headers, rows })
}

fn column_starts(header: &str) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut gap = 0;
    for (i, c) in header.chars().enumerate() {
        if c.is_whitespace() {
            gap += 1;
            continue;
        }
        if starts.is_empty() || gap >= 2 {
            starts.push(i);
        }
        gap = 0;
    }
    starts
}

/// Cut a line at the column offsets. A blank slice is a missing value, so
/// the cells of a row stay under their own headers. A boundary falling
/// inside a word moves back to the word's start to keep right-aligned
/// values whole.
fn slice_columns(line: &str, starts: &[usize]) -> Vec<Option<String>> {
    let chars: Vec<char> = line.chars().collect();
    let mut bounds: Vec<usize> = starts.iter().map(|&s| s.min(chars.len())).collect();
    if let Some(first) = bounds.first_mut() {
        *first = 0;
    }
    for k in 1..bounds.len() {
        let mut b = bounds[k];
        while b > bounds[k - 1]
            && b < chars.len()
            && !chars[b].is_whitespace()
            && !chars[b - 1].is_whitespace()
        {
            b -= 1;
        }
        bounds[k] = b;
    }

    (0..bounds.len())
        .map(|k| {
            let end = bounds.get(k + 1).copied().unwrap_or(chars.len());
            let cell: String = chars[bounds[k]..end].iter().collect();
            let cell = cell.trim();
            if cell.is_empty() {
                None
            } else {
                Some(cell.to_string())
            }
        })
        .collect()
}
