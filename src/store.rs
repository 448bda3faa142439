//! Textual polygon persistence.
//!
//! One file per polygon: the shared denominator, the plane coordinate range
//! as `x0,x1,y0,y1`, the vertex count, one `x,y` pair per line, and a `.`
//! sentinel. Files are numbered sequentially per region kind from 0 with no
//! gaps; loading stops at the first missing number.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use kurbo::Rect;
use log::{debug, info};

use crate::error::PolyError;
use crate::grid::DENOMINATOR;
use crate::polygon::Polygon;
use crate::RegionKind;

/// File name of polygon `index` of the given kind, e.g. `intpoly0003`.
pub fn file_name(kind: RegionKind, index: usize) -> String {
    format!("{}poly{:04}", kind.prefix(), index)
}

pub fn save(pg: &Polygon, path: &Path) -> Result<(), PolyError> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "{}", pg.denominator)?;
    writeln!(
        out,
        "{},{},{},{}",
        pg.window.x0, pg.window.x1, pg.window.y0, pg.window.y1
    )?;
    writeln!(out, "{}", pg.vertices.len())?;
    for &(x, y) in &pg.vertices {
        writeln!(out, "{x},{y}")?;
    }
    writeln!(out, ".")?;
    Ok(())
}

/// Load one polygon file.
///
/// A garbled denominator or range line falls back to the defaults rather
/// than failing (`1 << 25` and `fallback_window`); a garbled count or vertex
/// line is a fatal format error naming the file.
pub fn load(path: &Path, fallback_window: Rect) -> Result<Polygon, PolyError> {
    let file = File::open(path)?;
    let mut lines = BufReader::new(file).lines();

    let mut next_line = |what: &str| -> Result<String, PolyError> {
        match lines.next() {
            Some(line) => Ok(line?),
            None => Err(PolyError::PolygonFormat {
                path: path.to_path_buf(),
                message: format!("unexpected end of file before {what}"),
            }),
        }
    };

    let denominator = next_line("denominator")?
        .trim()
        .parse::<i64>()
        .unwrap_or(DENOMINATOR);

    let range_line = next_line("range")?;
    let window = parse_window(&range_line).unwrap_or(fallback_window);

    let count_line = next_line("vertex count")?;
    let count = count_line
        .trim()
        .parse::<usize>()
        .map_err(|_| PolyError::PolygonFormat {
            path: path.to_path_buf(),
            message: format!("bad vertex count line {count_line:?}"),
        })?;

    let mut vertices = Vec::with_capacity(count);
    for _ in 0..count {
        let line = next_line("vertex")?;
        let pair = parse_pair(&line).ok_or_else(|| PolyError::PolygonFormat {
            path: path.to_path_buf(),
            message: format!("bad vertex line {line:?}"),
        })?;
        vertices.push(pair);
    }

    Ok(Polygon::from_vertices(vertices, denominator, window))
}

fn parse_window(line: &str) -> Option<Rect> {
    let mut parts = line.trim().split(',').map(|p| p.trim().parse::<f64>());
    let x0 = parts.next()?.ok()?;
    let x1 = parts.next()?.ok()?;
    let y0 = parts.next()?.ok()?;
    let y1 = parts.next()?.ok()?;
    Some(Rect::new(x0, y0, x1, y1))
}

fn parse_pair(line: &str) -> Option<(i64, i64)> {
    let (x, y) = line.trim().split_once(',')?;
    Some((x.trim().parse().ok()?, y.trim().parse().ok()?))
}

/// Load one kind's collection by probing sequential names from 0.
pub fn load_kind(
    dir: &Path,
    kind: RegionKind,
    fallback_window: Rect,
) -> Result<Vec<Polygon>, PolyError> {
    let mut polygons = Vec::new();
    loop {
        let path = dir.join(file_name(kind, polygons.len()));
        if !path.is_file() {
            break;
        }
        debug!("loading {}", path.display());
        polygons.push(load(&path, fallback_window)?);
    }
    Ok(polygons)
}

/// Load both collections from `dir`.
pub fn load_all(dir: &Path, fallback_window: Rect) -> Result<(Vec<Polygon>, Vec<Polygon>), PolyError> {
    let interior = load_kind(dir, RegionKind::Interior, fallback_window)?;
    let exterior = load_kind(dir, RegionKind::Exterior, fallback_window)?;
    info!(
        "loaded {} interior and {} exterior polygons from {}",
        interior.len(),
        exterior.len(),
        dir.display()
    );
    Ok((interior, exterior))
}

/// Persist a freshly built collection under sequential names.
pub fn save_all(dir: &Path, kind: RegionKind, polygons: &[Polygon]) -> Result<Vec<PathBuf>, PolyError> {
    let mut paths = Vec::with_capacity(polygons.len());
    for (i, pg) in polygons.iter().enumerate() {
        let path = dir.join(file_name(kind, i));
        save(pg, &path)?;
        info!("saved polygon with {} vertices to {}", pg.len(), path.display());
        paths.push(path);
    }
    Ok(paths)
}
