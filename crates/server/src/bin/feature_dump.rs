//! Print the records of a feature file for inspection.

use clap::{Parser, ValueEnum};
use retrieval_core::source::RecordReader;
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    /// Rust debug form
    Default,
    /// Pretty-printed JSON
    Json,
}

#[derive(Parser)]
#[command(name = "feature-dump", about = "Dump the records of a feature file")]
struct Args {
    /// Feature file to read (stdin when omitted)
    #[arg(short, long)]
    input: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = Format::Default)]
    format: Format,

    /// Stop after this many records
    #[arg(short, long)]
    limit: Option<usize>,
}

fn dump<R: Read, W: Write>(
    reader: RecordReader<R>,
    out: &mut W,
    format: Format,
    limit: Option<usize>,
) -> Result<usize, Box<dyn std::error::Error>> {
    let mut printed = 0;
    for record in reader.take(limit.unwrap_or(usize::MAX)) {
        let record = record?;
        printed += 1;
        writeln!(out, "---- #{:06}th record ----", printed)?;
        match format {
            Format::Default => writeln!(out, "{:?}", record)?,
            Format::Json => writeln!(out, "{}", serde_json::to_string_pretty(&record)?)?,
        }
    }
    out.flush()?;
    Ok(printed)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let printed = match &args.input {
        Some(path) => dump(RecordReader::open(path)?, &mut out, args.format, args.limit)?,
        None => dump(
            RecordReader::new(io::stdin().lock()),
            &mut out,
            args.format,
            args.limit,
        )?,
    };
    tracing::debug!(records = printed, "dump finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use retrieval_core::source::RecordWriter;
    use retrieval_core::Record;
    use std::io::Cursor;

    fn feature_bytes(n: usize) -> Vec<u8> {
        let mut writer = RecordWriter::new(Vec::new());
        for i in 0..n {
            writer
                .write(&Record::new(format!("img{i}"), i as i32, vec![i as f32, 0.5]))
                .unwrap();
        }
        writer.finish().unwrap()
    }

    #[test]
    fn test_dump_default_with_limit() {
        let mut out = Vec::new();
        let reader = RecordReader::new(Cursor::new(feature_bytes(5)));
        let printed = dump(reader, &mut out, Format::Default, Some(2)).unwrap();
        assert_eq!(printed, 2);
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("---- #000001th record ----\n"));
        assert!(text.contains("---- #000002th record ----"));
        assert!(!text.contains("#000003th"));
        assert!(text.contains("img1"));
    }

    #[test]
    fn test_dump_json() {
        let mut out = Vec::new();
        let reader = RecordReader::new(Cursor::new(feature_bytes(1)));
        dump(reader, &mut out, Format::Json, None).unwrap();
        let text = String::from_utf8(out).unwrap();
        let body = text.split_once('\n').unwrap().1;
        let value: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(value["id"], "img0");
        assert_eq!(value["label"], 0);
    }
}
