use crate::powertracker::category::PowerEventCategory;
use crate::powertracker::record::{header, PowerRecord};
use crate::prelude::{CoreError, CoreResult};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Comma-delimited sink for power records. The header row is always
/// written, even when no record follows.
pub struct PowerRecordWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> PowerRecordWriter<W> {
    pub fn new(inner: W) -> CoreResult<Self> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(inner);
        writer.write_record(header())?;
        Ok(Self { writer })
    }

    pub fn write(&mut self, record: &PowerRecord) -> CoreResult<()> {
        self.writer.serialize(record)?;
        Ok(())
    }

    pub fn finish(mut self) -> CoreResult<()> {
        self.writer.flush().map_err(csv::Error::from)?;
        Ok(())
    }
}

pub fn write_records<W: Write>(inner: W, records: &[PowerRecord]) -> CoreResult<()> {
    let mut sink = PowerRecordWriter::new(inner)?;
    for record in records {
        sink.write(record)?;
    }
    sink.finish()
}

pub fn write_records_to_path(path: &Path, records: &[PowerRecord]) -> CoreResult<()> {
    let file = File::create(path).map_err(|source| CoreError::io(path, source))?;
    write_records(file, records)
}

/// Reads a table header back into the category column order.
pub fn read_category_order<R: Read>(input: R) -> CoreResult<Vec<PowerEventCategory>> {
    let mut reader = csv::Reader::from_reader(input);
    let headers = reader.headers()?;
    Ok(headers
        .iter()
        .filter_map(PowerEventCategory::from_field)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn sink_writes_header_and_rows() {
        let mut buffer = Vec::new();
        let record = PowerRecord::from_times(1, [1.0, 0.5, 0.2, 0.1, 0.05]);
        write_records(&mut buffer, &[record]).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "mote_id,monitored_time,on_time,tx_time,rx_time,int_time",
                "1,1.0,0.5,0.2,0.1,0.05"
            ]
        );
    }

    #[test]
    fn empty_sink_still_has_header() {
        let mut buffer = Vec::new();
        write_records(&mut buffer, &[]).unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap().trim_end(),
            "mote_id,monitored_time,on_time,tx_time,rx_time,int_time"
        );
    }

    #[test]
    fn header_round_trips_to_category_order() {
        let temp = NamedTempFile::new().unwrap();
        write_records_to_path(temp.path(), &[]).unwrap();
        let order = read_category_order(File::open(temp.path()).unwrap()).unwrap();
        assert_eq!(order, PowerEventCategory::ALL.to_vec());
    }
}
