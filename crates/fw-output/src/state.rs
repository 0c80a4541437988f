//! JSON state dump, overwritten every cycle.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use fw_tracker::TrackerDump;

use crate::OutputResult;
use crate::csv::tmp_path;

pub const STATE_FILE: &str = "vehicle_states.json";

/// Writes the tracker dump as pretty JSON through a temp file and a rename,
/// so readers never see a half-written file.
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    pub fn new(path: &Path) -> Self {
        Self { path: path.to_owned() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, dump: &TrackerDump) -> OutputResult<()> {
        let tmp = tmp_path(&self.path);
        {
            let mut out = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer_pretty(&mut out, dump)?;
            out.write_all(b"\n")?;
            out.flush()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
