use std::fmt::Write;

use chrono::{DateTime, Utc, Local, SecondsFormat};
use nimbus_lib::size::SizeUnit;
use nimbus_api::files::FileItem;

/// renders a byte count in the largest binary unit that keeps it at or
/// above 1, e.g. "2.00 MB"
pub fn bytes_to_unit(bytes: u64) -> String {
    let unit = SizeUnit::best_fit(bytes);

    if unit == SizeUnit::B {
        format!("{bytes} B")
    } else {
        format!("{:.2} {unit}", unit.from_bytes(bytes))
    }
}

pub fn speed(bytes_per_sec: f64) -> String {
    if !bytes_per_sec.is_finite() || bytes_per_sec <= 0.0 {
        return String::from("-");
    }

    format!("{}/s", bytes_to_unit(bytes_per_sec.round() as u64))
}

pub fn datetime(given: &DateTime<Utc>) -> String {
    given.with_timezone(&Local).to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// left aligned columns sized to their widest cell
pub struct Table {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(header: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>
    {
        Table {
            header: header.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn render(&self) -> String {
        let mut widths: Vec<usize> = self.header.iter().map(|h| h.chars().count()).collect();

        for row in &self.rows {
            for (index, cell) in row.iter().enumerate() {
                let len = cell.chars().count();

                match widths.get_mut(index) {
                    Some(width) => *width = usize::max(*width, len),
                    None => widths.push(len),
                }
            }
        }

        let mut output = String::new();

        for line in std::iter::once(&self.header).chain(self.rows.iter()) {
            let mut first = true;

            for (index, cell) in line.iter().enumerate() {
                if !first {
                    output.push_str("  ");
                }

                first = false;

                if index + 1 == line.len() {
                    output.push_str(cell);
                } else {
                    let _ = write!(output, "{:width$}", cell, width = widths[index]);
                }
            }

            output.push('\n');
        }

        output
    }
}

pub fn file_table(items: &[FileItem], pinned: impl Fn(&str) -> bool) -> Table {
    let mut table = Table::new(["id", "type", "size", "modified", "name"]);

    for item in items {
        let mut name = item.name.clone();

        if item.is_folder {
            name.push('/');
        }

        if pinned(&item.id) {
            name.push_str(" *");
        }

        table.row(vec![
            item.id.clone(),
            item.file_type.to_string(),
            if item.is_folder { String::from("-") } else { bytes_to_unit(item.size_bytes()) },
            datetime(&item.modified_at),
            name,
        ]);
    }

    table
}
