use crate::error::{CliError, Result};
use nalgebra::Point3;
use pairforce::workflows::evaluate::FrameResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize)]
struct CoordinateRecord {
    x: f64,
    y: f64,
    z: f64,
}

#[derive(Debug, Serialize)]
struct ResultRecord {
    particle: usize,
    fx: f64,
    fy: f64,
    fz: f64,
    energy: Option<f64>,
}

/// Reads one frame of coordinates from a CSV file with an `x,y,z` header.
pub fn read_frame(path: &Path) -> Result<Vec<Point3<f64>>> {
    let parse_error = |e: csv::Error| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    };
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(parse_error)?;

    let positions = reader
        .deserialize::<CoordinateRecord>()
        .map(|record| record.map(|r| Point3::new(r.x, r.y, r.z)))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(parse_error)?;
    debug!("Read {} positions from {:?}", positions.len(), path);
    Ok(positions)
}

/// Writes per-particle forces and, when present, per-particle energies.
pub fn write_frame_result(path: &Path, result: &FrameResult) -> Result<()> {
    let write_error = |e: csv::Error| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    };
    let mut writer = csv::Writer::from_path(path).map_err(write_error)?;
    for (particle, force) in result.forces.iter().enumerate() {
        writer
            .serialize(ResultRecord {
                particle,
                fx: force.x,
                fy: force.y,
                fz: force.z,
                energy: result
                    .energy_by_particle
                    .as_ref()
                    .and_then(|e| e.get(particle).copied()),
            })
            .map_err(write_error)?;
    }
    writer.flush()?;
    Ok(())
}

/// `out.csv` for a single frame, `out_1.csv`, `out_2.csv`, ... for several.
pub fn output_path_for(base: &Path, frame: usize, total: usize) -> PathBuf {
    if total <= 1 {
        return base.to_path_buf();
    }
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match base.extension() {
        Some(ext) => format!("{}_{}.{}", stem, frame, ext.to_string_lossy()),
        None => format!("{}_{}", stem, frame),
    };
    base.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;
    use std::fs;

    #[test]
    fn reads_coordinates_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.csv");
        fs::write(&path, "x,y,z\n0.0, 0.0, 0.0\n2.0,0.5,-1.0\n").unwrap();
        let positions = read_frame(&path).unwrap();
        assert_eq!(
            positions,
            vec![Point3::origin(), Point3::new(2.0, 0.5, -1.0)]
        );
    }

    #[test]
    fn malformed_coordinates_report_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.csv");
        fs::write(&path, "x,y,z\n0.0,abc,0.0\n").unwrap();
        match read_frame(&path) {
            Err(CliError::FileParsing { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("unexpected result: {:?}", other.map(|p| p.len())),
        }
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_frame(&dir.path().join("absent.csv")).is_err());
    }

    #[test]
    fn writes_forces_and_optional_energies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let result = FrameResult {
            total_energy: 0.5,
            energy_by_particle: Some(vec![0.5, 0.5]),
            forces: vec![Vector3::new(-0.25, 0.0, 0.0), Vector3::new(0.25, 0.0, 0.0)],
        };
        write_frame_result(&path, &result).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines[0], "particle,fx,fy,fz,energy");
        assert_eq!(lines[1], "0,-0.25,0.0,0.0,0.5");
        assert_eq!(lines[2], "1,0.25,0.0,0.0,0.5");

        let without_energy = FrameResult {
            energy_by_particle: None,
            ..result
        };
        write_frame_result(&path, &without_energy).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().nth(1), Some("0,-0.25,0.0,0.0,"));
    }

    #[test]
    fn output_paths_are_numbered_for_several_frames() {
        let base = Path::new("results/out.csv");
        assert_eq!(output_path_for(base, 1, 1), PathBuf::from("results/out.csv"));
        assert_eq!(output_path_for(base, 2, 3), PathBuf::from("results/out_2.csv"));
        assert_eq!(
            output_path_for(Path::new("out"), 1, 2),
            PathBuf::from("out_1")
        );
    }
}
