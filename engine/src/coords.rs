use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::DeviceError;

pub const BUTTONS_FILE: &str = "buttons.json";
pub const MOVEMENTS_FILE: &str = "movements.json";

/// Eight-way compass direction of a movement swipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    N,
    S,
    E,
    W,
    Ne,
    Nw,
    Se,
    Sw,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::N,
        Direction::S,
        Direction::E,
        Direction::W,
        Direction::Ne,
        Direction::Nw,
        Direction::Se,
        Direction::Sw,
    ];

    /// Key used in `movements.json`.
    pub fn code(self) -> &'static str {
        match self {
            Self::N => "n",
            Self::S => "s",
            Self::E => "e",
            Self::W => "w",
            Self::Ne => "ne",
            Self::Nw => "nw",
            Self::Se => "se",
            Self::Sw => "sw",
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Self::N => "up",
            Self::S => "down",
            Self::E => "right",
            Self::W => "left",
            Self::Ne => "up-right",
            Self::Nw => "up-left",
            Self::Se => "down-right",
            Self::Sw => "down-left",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Name of the coordinate folder for this resolution, e.g. `1080x1920`.
    pub fn bucket(self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    pub fn scale(self, x: f32, y: f32) -> (u32, u32) {
        (
            (x * self.width as f32).max(0.0) as u32,
            (y * self.height as f32).max(0.0) as u32,
        )
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::new(1080, 1920)
    }
}

/// Normalized (0..1) screen coordinates for named buttons and movement swipes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoordinateTable {
    #[serde(default)]
    pub buttons: HashMap<String, Vec<f32>>,
    #[serde(default)]
    pub movements: HashMap<String, [[f32; 2]; 2]>,
}

impl CoordinateTable {
    pub fn from_json(buttons: &str, movements: &str) -> Result<Self, DeviceError> {
        let buttons = serde_json::from_str(buttons)
            .map_err(|e| DeviceError::InvalidCoordinate(format!("{BUTTONS_FILE}: {e}")))?;
        let movements = serde_json::from_str(movements)
            .map_err(|e| DeviceError::InvalidCoordinate(format!("{MOVEMENTS_FILE}: {e}")))?;
        let table = Self { buttons, movements };
        table.validate()?;
        Ok(table)
    }

    pub fn load_dir(dir: &Path) -> Result<Self, DeviceError> {
        let buttons = fs::read_to_string(dir.join(BUTTONS_FILE))?;
        let movements = fs::read_to_string(dir.join(MOVEMENTS_FILE))?;
        Self::from_json(&buttons, &movements)
    }

    fn validate(&self) -> Result<(), DeviceError> {
        for (name, coords) in &self.buttons {
            if coords.len() < 2 {
                return Err(DeviceError::InvalidCoordinate(format!(
                    "button '{name}' needs at least x and y"
                )));
            }
        }
        Ok(())
    }

    pub fn button(&self, name: &str) -> Result<(f32, f32), DeviceError> {
        self.buttons
            .get(name)
            .map(|c| (c[0], c[1]))
            .ok_or_else(|| DeviceError::MissingCoordinate {
                kind: "button",
                name: name.to_string(),
            })
    }

    pub fn movement(&self, direction: Direction) -> Result<[[f32; 2]; 2], DeviceError> {
        self.movements
            .get(direction.code())
            .copied()
            .ok_or_else(|| DeviceError::MissingCoordinate {
                kind: "movement",
                name: direction.code().to_string(),
            })
    }
}

/// `<data>/coords/<W>x<H>/` folders, one per supported resolution.
#[derive(Debug, Clone)]
pub struct CoordinateLibrary {
    root: PathBuf,
}

impl CoordinateLibrary {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            root: data_dir.as_ref().join("coords"),
        }
    }

    pub fn buckets(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().into_string().ok())
            .collect();
        names.sort();
        names
    }

    /// Picks the folder for `resolution`, falling back to the first one found.
    pub fn select(&self, resolution: Resolution) -> Result<(String, CoordinateTable), DeviceError> {
        let wanted = resolution.bucket();
        let buckets = self.buckets();
        let bucket = if buckets.iter().any(|b| *b == wanted) {
            wanted
        } else {
            let first = buckets.first().cloned().ok_or_else(|| {
                DeviceError::InvalidCoordinate(format!(
                    "no coordinate folders under {}",
                    self.root.display()
                ))
            })?;
            warn!("no coordinates for {wanted}, trying with {first}");
            first
        };
        debug!("loading coordinates from bucket {bucket}");
        let table = CoordinateTable::load_dir(&self.root.join(&bucket))?;
        Ok((bucket, table))
    }
}
