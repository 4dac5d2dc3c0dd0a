//! Reader for the scene description table.
//!
//! The file is plain comma separated text. The first line is a header and is
//! ignored, every following line places one exhibit:
//!
//! ```text
//! type,model,texture,px,py,pz,rx,ry,rz,sx,sy,sz
//! statue,assets/models/venus.obj,assets/textures/marble.jpg,0,-4,0,0,0,90,1,1,1
//! ```
//!
//! Rows that do not yield three non-empty strings followed by nine numbers
//! are skipped with a warning.

use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
};

const MAX_KIND_LEN: usize = 31;
const MAX_PATH_LEN: usize = 255;

#[derive(thiserror::Error, Debug)]
pub enum SceneError {
    #[error("could not open scene description {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read scene description")]
    Io(#[from] io::Error),
    #[error("scene description has no header line")]
    MissingHeader,
}

/// One placed exhibit. Rotation is in degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneRow {
    pub kind: String,
    pub mesh: String,
    pub texture: String,
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
}

fn truncated(field: &str, max: usize) -> String {
    field.chars().take(max).collect()
}

impl SceneRow {
    /// Parses a data line, `None` if any of the twelve fields is missing or malformed.
    pub fn parse(line: &str) -> Option<Self> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() < 12 || fields[..3].iter().any(|f| f.is_empty()) {
            return None;
        }
        let mut numbers = [0.0f32; 9];
        for (slot, field) in numbers.iter_mut().zip(&fields[3..12]) {
            *slot = field.parse().ok()?;
        }
        Some(Self {
            kind: truncated(fields[0], MAX_KIND_LEN),
            mesh: truncated(fields[1], MAX_PATH_LEN),
            texture: truncated(fields[2], MAX_PATH_LEN),
            position: [numbers[0], numbers[1], numbers[2]],
            rotation: [numbers[3], numbers[4], numbers[5]],
            scale: [numbers[6], numbers[7], numbers[8]],
        })
    }
}

/// Reads at most `max_rows` rows after the header line.
pub fn read_scene_rows<R: BufRead>(reader: R, max_rows: usize) -> Result<Vec<SceneRow>, SceneError> {
    let mut lines = reader.lines();
    match lines.next() {
        Some(header) => {
            header?;
        }
        None => return Err(SceneError::MissingHeader),
    }

    let mut rows = Vec::new();
    for (number, line) in lines.enumerate() {
        if rows.len() >= max_rows {
            log::warn!("Scene description exceeds {} rows, ignoring the rest", max_rows);
            break;
        }
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match SceneRow::parse(&line) {
            Some(row) => rows.push(row),
            // +2: 1-based and the header
            None => log::warn!("Skipping malformed scene row {}: {:?}", number + 2, line),
        }
    }
    Ok(rows)
}

pub fn load_scene_rows(path: impl AsRef<Path>, max_rows: usize) -> Result<Vec<SceneRow>, SceneError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| SceneError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let rows = read_scene_rows(BufReader::new(file), max_rows)?;
    log::info!("Read {} scene rows from {}", rows.len(), path.display());
    Ok(rows)
}
