//! ARC grids and the transformations applied to them

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Highest colour index in the ARC palette
pub const MAX_COLOUR: u8 = 9;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("grid has no rows")]
    Empty,
    #[error("row {row} has no cells")]
    EmptyRow { row: usize },
    #[error("row {row} has {found} cells, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("cell ({row}, {col}) holds {value}, colours must be 0-9")]
    ColourOutOfRange { row: usize, col: usize, value: i64 },
    #[error("invalid grid JSON: {0}")]
    Json(String),
    #[error("unknown transformation: {0}")]
    UnknownTransformation(String),
}

/// A rectangular, non-empty grid of ARC colours
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Grid {
    rows: Vec<Vec<u8>>,
}

/// Transformations from the grid playground
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transformation {
    /// Swap colours 0 and 1, leave the rest
    Invert,
    /// Rotate 90 degrees clockwise
    Rotate,
    /// Flip left to right
    Mirror,
}

impl std::str::FromStr for Transformation {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "invert" => Ok(Transformation::Invert),
            "rotate" => Ok(Transformation::Rotate),
            "mirror" => Ok(Transformation::Mirror),
            other => Err(GridError::UnknownTransformation(other.to_string())),
        }
    }
}

impl Grid {
    /// Validate and wrap raw rows
    pub fn new(rows: Vec<Vec<u8>>) -> Result<Self, GridError> {
        let width = rows.first().ok_or(GridError::Empty)?.len();
        for (row, cells) in rows.iter().enumerate() {
            if cells.is_empty() {
                return Err(GridError::EmptyRow { row });
            }
            if cells.len() != width {
                return Err(GridError::Ragged {
                    row,
                    expected: width,
                    found: cells.len(),
                });
            }
            if let Some(col) = cells.iter().position(|&c| c > MAX_COLOUR) {
                return Err(GridError::ColourOutOfRange {
                    row,
                    col,
                    value: i64::from(cells[col]),
                });
            }
        }
        Ok(Self { rows })
    }

    /// Build from wider integers, as found in JSON and model replies
    pub fn from_i64_rows(rows: Vec<Vec<i64>>) -> Result<Self, GridError> {
        let mut converted = Vec::with_capacity(rows.len());
        for (row, cells) in rows.into_iter().enumerate() {
            let mut out = Vec::with_capacity(cells.len());
            for (col, value) in cells.into_iter().enumerate() {
                if !(0..=i64::from(MAX_COLOUR)).contains(&value) {
                    return Err(GridError::ColourOutOfRange { row, col, value });
                }
                out.push(value as u8);
            }
            converted.push(out);
        }
        Self::new(converted)
    }

    pub fn rows(&self) -> &[Vec<u8>] {
        &self.rows
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.rows[0].len()
    }

    /// `(height, width)`
    pub fn dimensions(&self) -> (usize, usize) {
        (self.height(), self.width())
    }

    pub fn get(&self, row: usize, col: usize) -> Option<u8> {
        self.rows.get(row).and_then(|r| r.get(col)).copied()
    }

    /// How many cells hold each colour
    pub fn colour_counts(&self) -> BTreeMap<u8, usize> {
        let mut counts = BTreeMap::new();
        for &cell in self.rows.iter().flatten() {
            *counts.entry(cell).or_insert(0) += 1;
        }
        counts
    }

    pub fn transform(&self, transformation: Transformation) -> Grid {
        let rows = match transformation {
            Transformation::Invert => self
                .rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|&c| match c {
                            0 => 1,
                            1 => 0,
                            other => other,
                        })
                        .collect()
                })
                .collect(),
            Transformation::Rotate => (0..self.width())
                .map(|col| self.rows.iter().rev().map(|row| row[col]).collect())
                .collect(),
            Transformation::Mirror => self
                .rows
                .iter()
                .map(|row| row.iter().rev().copied().collect())
                .collect(),
        };
        Grid { rows }
    }

    /// Compact JSON array-of-arrays text
    pub fn to_json(&self) -> String {
        // Vec<Vec<u8>> always serialises
        serde_json::to_string(&self.rows).unwrap_or_default()
    }

    pub fn from_json(text: &str) -> Result<Self, GridError> {
        let rows: Vec<Vec<i64>> =
            serde_json::from_str(text).map_err(|e| GridError::Json(e.to_string()))?;
        Self::from_i64_rows(rows)
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.rows.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            let line: Vec<String> = row.iter().map(|c| c.to_string()).collect();
            write!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}

impl Serialize for Grid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.rows.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Grid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rows = Vec::<Vec<i64>>::deserialize(deserializer)?;
        Grid::from_i64_rows(rows).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[u8]]) -> Grid {
        Grid::new(rows.iter().map(|r| r.to_vec()).collect()).unwrap()
    }

    #[test]
    fn test_rejects_malformed_grids() {
        assert_eq!(Grid::new(vec![]), Err(GridError::Empty));
        assert_eq!(
            Grid::new(vec![vec![]]),
            Err(GridError::EmptyRow { row: 0 })
        );
        assert_eq!(
            Grid::new(vec![vec![1, 2], vec![3]]),
            Err(GridError::Ragged {
                row: 1,
                expected: 2,
                found: 1
            })
        );
        assert!(matches!(
            Grid::new(vec![vec![1, 12]]),
            Err(GridError::ColourOutOfRange { row: 0, col: 1, .. })
        ));
        assert!(matches!(
            Grid::from_i64_rows(vec![vec![-1]]),
            Err(GridError::ColourOutOfRange { value: -1, .. })
        ));
    }

    #[test]
    fn test_invert_only_swaps_zero_and_one() {
        let g = grid(&[&[0, 1, 2], &[1, 0, 9]]);
        assert_eq!(g.transform(Transformation::Invert), grid(&[&[1, 0, 2], &[0, 1, 9]]));
    }

    #[test]
    fn test_rotate_clockwise() {
        let g = grid(&[&[1, 2, 3], &[4, 5, 6]]);
        let rotated = g.transform(Transformation::Rotate);
        assert_eq!(rotated, grid(&[&[4, 1], &[5, 2], &[6, 3]]));
        assert_eq!(rotated.dimensions(), (3, 2));
    }

    #[test]
    fn test_rotate_four_times_is_identity() {
        let g = grid(&[&[1, 2, 3], &[4, 5, 6]]);
        let back = (0..4).fold(g.clone(), |acc, _| acc.transform(Transformation::Rotate));
        assert_eq!(back, g);
    }

    #[test]
    fn test_mirror_twice_is_identity() {
        let g = grid(&[&[1, 2, 3], &[4, 5, 6]]);
        let mirrored = g.transform(Transformation::Mirror);
        assert_eq!(mirrored, grid(&[&[3, 2, 1], &[6, 5, 4]]));
        assert_eq!(mirrored.transform(Transformation::Mirror), g);
    }

    #[test]
    fn test_json_text() {
        let g = grid(&[&[0, 1], &[2, 3]]);
        assert_eq!(g.to_json(), "[[0,1],[2,3]]");
        assert_eq!(Grid::from_json("[[0, 1], [2, 3]]").unwrap(), g);
        assert!(matches!(Grid::from_json("{}"), Err(GridError::Json(_))));
        assert!(Grid::from_json("[[1, 2], [3]]").is_err());
    }

    #[test]
    fn test_colour_counts_and_display() {
        let g = grid(&[&[0, 0], &[3, 0]]);
        let counts = g.colour_counts();
        assert_eq!(counts.get(&0), Some(&3));
        assert_eq!(counts.get(&3), Some(&1));
        assert_eq!(g.to_string(), "0 0\n3 0");
    }

    #[test]
    fn test_transformation_parse() {
        assert_eq!("Rotate".parse::<Transformation>(), Ok(Transformation::Rotate));
        assert!("shear".parse::<Transformation>().is_err());
    }
}
