use anyhow::Context;
use betl_data::records::Record;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;


/// Where exported records go. Opened once at the start of a run, closed
/// exactly once at the end, success or failure. Access is serialized by the
/// pipeline, so implementations never see interleaved writes.
pub trait ItemExporter: Send {
    fn open(&mut self) -> anyhow::Result<()>;

    fn export_item(&mut self, record: &Record<'_>) -> anyhow::Result<()>;

    fn close(&mut self) -> anyhow::Result<()>;
}


enum Target {
    Stdout,
    File(PathBuf),
}


/// Writes one JSON object per line to a file or stdout.
pub struct JsonLinesExporter {
    target: Target,
    out: Option<BufWriter<Box<dyn Write + Send>>>,
}


impl JsonLinesExporter {
    pub fn stdout() -> Self {
        Self {
            target: Target::Stdout,
            out: None,
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            target: Target::File(path.into()),
            out: None,
        }
    }
}


impl ItemExporter for JsonLinesExporter {
    fn open(&mut self) -> anyhow::Result<()> {
        if self.out.is_some() {
            return Ok(())
        }
        let writer: Box<dyn Write + Send> = match &self.target {
            Target::Stdout => Box::new(std::io::stdout()),
            Target::File(path) => {
                let file = File::create(path)
                    .with_context(|| format!("failed to create {}", path.display()))?;
                Box::new(file)
            }
        };
        self.out = Some(BufWriter::new(writer));
        Ok(())
    }

    fn export_item(&mut self, record: &Record<'_>) -> anyhow::Result<()> {
        let out = self.out.as_mut().context("exporter is not open")?;
        serde_json::to_writer(&mut *out, record)?;
        out.write_all(b"\n")?;
        Ok(())
    }

    fn close(&mut self) -> anyhow::Result<()> {
        if let Some(mut out) = self.out.take() {
            out.flush()?;
        }
        Ok(())
    }
}
