use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use strata_core::FlatTable;

/// Write a table as CSV to `path`, returning the number of bytes written.
///
/// Columns keep the table's order; nulls are written as empty fields.
pub fn write_table_csv(path: &Path, table: &FlatTable) -> Result<u64, csv::Error> {
    let writer = BufWriter::new(File::create(path).map_err(csv::Error::from)?);
    write_csv(writer, table)
}

/// Write a table as CSV to any writer.
pub fn write_csv<W: Write>(writer: W, table: &FlatTable) -> Result<u64, csv::Error> {
    let counting = CountingWriter::new(writer);
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(counting);

    writer.write_record(table.column_names())?;
    for row in table.iter_rows() {
        let record: Vec<String> = row.iter().map(|value| value.to_csv()).collect();
        writer.write_record(&record)?;
    }

    writer.flush()?;
    let counting = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(counting.bytes_written())
}

struct CountingWriter<W: Write> {
    inner: W,
    bytes: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, bytes: 0 }
    }

    fn bytes_written(&self) -> u64 {
        self.bytes
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let size = self.inner.write(buf)?;
        self.bytes = self.bytes.saturating_add(size as u64);
        Ok(size)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use strata_core::Value;

    use super::*;

    #[test]
    fn writes_header_and_rows() {
        let mut table = FlatTable::new(2);
        table
            .insert("region", vec![Value::Int(1), Value::Int(2)])
            .unwrap();
        table
            .insert("label", vec![Value::from("a, b"), Value::Null])
            .unwrap();

        let mut out = Vec::new();
        let bytes = write_csv(&mut out, &table).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "region,label\n1,\"a, b\"\n2,\n");
        assert_eq!(bytes, text.len() as u64);
    }
}
