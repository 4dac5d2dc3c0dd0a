//! Loader for the line-oriented polygon mesh format (`.obj` style).
//!
//! Loading runs in two passes over the same reader. The counting pass
//! classifies every line and totals the elements, [`Mesh::with_counts`]
//! allocates exactly that much storage, and the parsing pass rewinds the
//! reader and fills it. Polygonal faces are fan-triangulated while parsing.
//!
//! Numbers are read tolerantly: the scanner jumps to the next character that
//! can start a number and takes the longest numeric prefix from there, so
//! stray whitespace or trailing garbage never aborts a load. Only a missing
//! coordinate or a face with fewer than three points is an error.

use std::{
    fmt,
    fs::File,
    io::{self, BufRead, BufReader, Seek},
    path::{Path, PathBuf},
};

use crate::data_structures::mesh::{
    FacePoint, Mesh, MeshCounts, Normal, TexCoord, Triangle, Vertex,
};

/// Most reference tokens read from a single face line.
pub const MAX_FACE_POINTS: usize = 32;
/// Longer face tokens are cut to this many characters before parsing.
pub const MAX_TOKEN_LEN: usize = 127;

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("unable to open mesh file {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read mesh data")]
    Io(#[from] io::Error),
    #[error("line {line}: the {axis} value of the {element} is missing")]
    MissingCoordinate {
        line: usize,
        element: ElementKind,
        axis: char,
    },
    #[error("line {line}: face has {points} points, at least 3 are required")]
    DegenerateFace { line: usize, points: usize },
    #[error("{element}: counted {counted} but parsed {parsed}")]
    CountMismatch {
        element: ElementKind,
        counted: usize,
        parsed: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Vertex,
    TexCoord,
    Normal,
    Face,
    Other,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ElementKind::Vertex => "vertex",
            ElementKind::TexCoord => "texture coordinate",
            ElementKind::Normal => "normal",
            ElementKind::Face => "face",
            ElementKind::Other => "other",
        })
    }
}

/// Classifies a line by its first non-blank characters.
pub fn classify(line: &str) -> ElementKind {
    let mut chars = line.trim_start_matches([' ', '\t']).chars();
    match chars.next() {
        Some('v') => match chars.next() {
            Some('t') => ElementKind::TexCoord,
            Some('n') => ElementKind::Normal,
            _ => ElementKind::Vertex,
        },
        Some('f') => ElementKind::Face,
        _ => ElementKind::Other,
    }
}

fn is_numeric(c: char) -> bool {
    c.is_ascii_digit() || c == '-' || c == '.'
}

/// A classified line of a mesh file. Line numbers start at 1.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjLine {
    pub number: usize,
    pub kind: ElementKind,
    pub text: String,
}

/// Lazy sequence of classified lines. Restart it by rewinding the underlying reader.
pub struct ObjLines<R> {
    reader: R,
    number: usize,
    buf: Vec<u8>,
}

impl<R: BufRead> ObjLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            number: 0,
            buf: Vec::new(),
        }
    }
}

impl<R: BufRead> Iterator for ObjLines<R> {
    type Item = io::Result<ObjLine>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                self.number += 1;
                let text = String::from_utf8_lossy(&self.buf)
                    .trim_end_matches(['\n', '\r'])
                    .to_string();
                Some(Ok(ObjLine {
                    number: self.number,
                    kind: classify(&text),
                    text,
                }))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// Whitespace-delimited tokens after the face marker that look like element references.
fn face_tokens(line: &str) -> impl Iterator<Item = &str> {
    let after_marker = line
        .find('f')
        .map(|at| &line[at + 1..])
        .unwrap_or_default();
    after_marker
        .split([' ', '\t'])
        .filter(|token| token.chars().next().is_some_and(is_numeric))
        .take(MAX_FACE_POINTS)
}

/// Counting pass: totals every element kind without storing anything.
pub fn count_elements<R: BufRead>(reader: R) -> Result<MeshCounts, LoadError> {
    let mut counts = MeshCounts::default();
    for line in ObjLines::new(reader) {
        let line = line?;
        match line.kind {
            ElementKind::Vertex => counts.vertices += 1,
            ElementKind::TexCoord => counts.tex_coords += 1,
            ElementKind::Normal => counts.normals += 1,
            ElementKind::Face => counts.triangles += face_tokens(&line.text).count().saturating_sub(2),
            ElementKind::Other => (),
        }
    }
    Ok(counts)
}

/// Parses the longest numeric prefix of `text`, the way C's `atof` does. No prefix reads as 0.
fn parse_float_prefix(text: &str) -> f32 {
    let bytes = text.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'-' | b'+')) {
        end += 1;
    }
    let digits = |from: usize| {
        bytes[from..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };
    let int_digits = digits(end);
    end += int_digits;
    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = digits(end + 1);
        end += 1 + frac_digits;
    }
    if int_digits + frac_digits == 0 {
        return 0.0;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'-' | b'+')) {
            exp_end += 1;
        }
        let exp_digits = digits(exp_end);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }
    text[..end].parse().unwrap_or(0.0)
}

/// Parses a leading integer the way C's `atoi` does. No prefix reads as 0.
fn parse_int_prefix(text: &str) -> i32 {
    let text = text.trim_start();
    let (negative, rest) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let value = rest
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, d| {
            (acc * 10 + i64::from(d - b'0')).min(i64::from(i32::MAX) + 1)
        });
    let value = if negative { -value } else { value };
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Reads up to `N` numbers from `text` with the tolerant scan.
///
/// Returns the index of the first coordinate that could not be located.
pub fn scan_floats<const N: usize>(text: &str) -> Result<[f32; N], usize> {
    let mut values = [0.0; N];
    let mut rest = text;
    for (axis, value) in values.iter_mut().enumerate() {
        let start = rest.find(is_numeric).ok_or(axis)?;
        rest = &rest[start..];
        *value = parse_float_prefix(rest);
        rest = rest.find(' ').map(|at| &rest[at..]).unwrap_or_default();
    }
    Ok(values)
}

/// Parses one `v`, `v/vt`, `v//vn` or `v/vt/vn` reference. Missing fields are 0.
pub fn parse_face_point(token: &str) -> FacePoint {
    let token = match token.char_indices().nth(MAX_TOKEN_LEN) {
        Some((cut, _)) => &token[..cut],
        None => token,
    };
    let mut fields = token.splitn(3, '/');
    let mut next = || fields.next().map(parse_int_prefix).unwrap_or(0);
    FacePoint {
        vertex: next(),
        tex_coord: next(),
        normal: next(),
    }
}

const AXES: [char; 3] = ['x', 'y', 'z'];
const TEX_AXES: [char; 2] = ['u', 'v'];

fn missing(line: &ObjLine, axes: &[char], at: usize) -> LoadError {
    LoadError::MissingCoordinate {
        line: line.number,
        element: line.kind,
        axis: axes.get(at).copied().unwrap_or('?'),
    }
}

/// Parsing pass: appends every element of the file to storage sized by [`count_elements`].
pub fn read_elements<R: BufRead>(reader: R, mesh: &mut Mesh) -> Result<(), LoadError> {
    for line in ObjLines::new(reader) {
        let line = line?;
        match line.kind {
            ElementKind::Vertex => {
                let [x, y, z] = scan_floats(&line.text).map_err(|at| missing(&line, &AXES, at))?;
                mesh.vertices.push(Vertex { x, y, z });
            }
            ElementKind::TexCoord => {
                let [u, v] =
                    scan_floats(&line.text).map_err(|at| missing(&line, &TEX_AXES, at))?;
                mesh.tex_coords.push(TexCoord { u, v });
            }
            ElementKind::Normal => {
                let [x, y, z] = scan_floats(&line.text).map_err(|at| missing(&line, &AXES, at))?;
                mesh.normals.push(Normal { x, y, z });
            }
            ElementKind::Face => {
                let points: Vec<FacePoint> =
                    face_tokens(&line.text).map(parse_face_point).collect();
                if points.len() < 3 {
                    return Err(LoadError::DegenerateFace {
                        line: line.number,
                        points: points.len(),
                    });
                }
                mesh.triangles
                    .extend(points.windows(2).skip(1).map(|pair| Triangle {
                        points: [points[0], pair[0], pair[1]],
                    }));
            }
            ElementKind::Other => (),
        }
    }
    Ok(())
}

fn check_count(element: ElementKind, counted: usize, parsed: usize) -> Result<(), LoadError> {
    if counted == parsed {
        Ok(())
    } else {
        Err(LoadError::CountMismatch {
            element,
            counted,
            parsed,
        })
    }
}

/// Loads a mesh from any seekable reader. `name` only appears in log output.
pub fn load_mesh_from<R: BufRead + Seek>(mut reader: R, name: &str) -> Result<Mesh, LoadError> {
    log::debug!("Counting the elements of {}", name);
    let counts = count_elements(&mut reader)?;
    let mut mesh = Mesh::with_counts(counts);
    reader.rewind()?;
    read_elements(&mut reader, &mut mesh)?;

    let parsed = mesh.counts();
    check_count(ElementKind::Vertex, counts.vertices, parsed.vertices)?;
    check_count(ElementKind::TexCoord, counts.tex_coords, parsed.tex_coords)?;
    check_count(ElementKind::Normal, counts.normals, parsed.normals)?;
    check_count(ElementKind::Face, counts.triangles, parsed.triangles)?;
    log::info!(
        "Loaded mesh {}: {} vertices, {} texture coordinates, {} normals, {} triangles",
        name,
        parsed.vertices,
        parsed.tex_coords,
        parsed.normals,
        parsed.triangles
    );
    Ok(mesh)
}

pub fn load_mesh(path: impl AsRef<Path>) -> Result<Mesh, LoadError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    load_mesh_from(BufReader::new(file), &path.display().to_string())
}
