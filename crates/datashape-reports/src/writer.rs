use std::fmt;
use std::io::Write;
use std::str::FromStr;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::detection::Detection;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One detection per line.
    #[default]
    Jsonl,
    /// A single pretty-printed array.
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Jsonl => write!(f, "jsonl"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jsonl" | "ndjson" => Ok(OutputFormat::Jsonl),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}. Supported formats: jsonl, json", s)),
        }
    }
}

/// Streams detections as JSON lines.
pub struct JsonLinesWriter<W: Write> {
    inner: W,
    written: usize,
}

impl<W: Write> JsonLinesWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    pub fn write(&mut self, detection: &Detection) -> Result<()> {
        serde_json::to_writer(&mut self.inner, detection)?;
        self.inner.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    #[must_use]
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn finish(mut self) -> Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

/// Write every detection in the requested format.
pub fn write_detections<W: Write>(inner: W, format: OutputFormat, detections: &[Detection]) -> Result<()> {
    match format {
        OutputFormat::Jsonl => {
            let mut writer = JsonLinesWriter::new(inner);
            for detection in detections {
                writer.write(detection)?;
            }
            writer.finish()?;
        }
        OutputFormat::Json => {
            let mut inner = inner;
            serde_json::to_writer_pretty(&mut inner, detections)?;
            inner.write_all(b"\n")?;
            inner.flush()?;
        }
    }
    log::debug!("wrote {} detections as {}", detections.len(), format);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::SourceLocation;

    fn detections() -> Vec<Detection> {
        vec![
            Detection::Presence {
                rule: "eval_usage".to_string(),
                location: SourceLocation::from_points("a.js", (0, 0), (0, 8)),
                content: Some("eval(x)".to_string()),
            },
            Detection::Error {
                file: "b.rb".to_string(),
                message: "unreadable".to_string(),
            },
        ]
    }

    #[test]
    fn test_json_lines() {
        let mut buffer = Vec::new();
        write_detections(&mut buffer, OutputFormat::Jsonl, &detections()).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(Detection::from_json(lines[1]).unwrap(), detections()[1]);
    }

    #[test]
    fn test_json_array() {
        let mut buffer = Vec::new();
        write_detections(&mut buffer, OutputFormat::Json, &detections()).unwrap();

        let parsed: Vec<Detection> = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(parsed, detections());
    }

    #[test]
    fn test_writer_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        let file = std::fs::File::create(&path).unwrap();

        let mut writer = JsonLinesWriter::new(file);
        for detection in detections() {
            writer.write(&detection).unwrap();
        }
        assert_eq!(writer.written(), 2);
        writer.finish().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("JSONL".parse::<OutputFormat>().unwrap(), OutputFormat::Jsonl);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("sarif".parse::<OutputFormat>().unwrap_err().contains("Supported formats"));
    }
}
