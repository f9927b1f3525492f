//! Binary serialization for [`SchematicDef`].
//!
//! The MTSM format stores a schematic by node name so files can move between
//! games with different node ids. All integers are big-endian.
//!
//! ## Binary Layout
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 4 | Magic bytes `"MTSM"` |
//! | 4 | 2 | Format version (`u16`, currently 3) |
//! | 6 | 6 | Size X, Y, Z (`u16` each) |
//! | 12 | Y | Per-slice probability (`u8` per Y layer) |
//! | .. | 2 | Name count N (`u16`) |
//! | .. | N × (2 + len) | Names (`u16` length + UTF-8 bytes) |
//! | .. | 2 × C | Name index per cell (`u16`, x fastest, then y, then z) |
//! | .. | C | `param1` (probability) per cell |
//! | .. | C | `param2` per cell |
//!
//! Where C = X × Y × Z.

use std::path::Path;

use glam::IVec3;
use hashbrown::HashMap;

use super::{PROB_ALWAYS, SchematicDef, SchematicError, SchematicNodeDef, SliceProb};

/// Magic bytes identifying the MTSM format.
const MAGIC: [u8; 4] = *b"MTSM";

/// Current format version.
const FORMAT_VERSION: u16 = 3;

/// Bounds-checked cursor over a byte slice.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], SchematicError> {
        let end = self.pos + n;
        if end > self.data.len() {
            return Err(SchematicError::Truncated {
                expected: end,
                actual: self.data.len(),
            });
        }
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn u16(&mut self) -> Result<u16, SchematicError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }
}

impl SchematicDef {
    /// Serializes this definition in the MTSM binary format.
    pub fn to_mts_bytes(&self) -> Result<Vec<u8>, SchematicError> {
        self.validate()?;
        let max = i32::from(u16::MAX);
        if self.size.cmpgt(IVec3::splat(max)).any() {
            return Err(SchematicError::InvalidSize(self.size));
        }

        // Name table in order of first use.
        let mut names: Vec<&str> = Vec::new();
        let mut name_index: HashMap<&str, u16> = HashMap::new();
        let mut indices = Vec::with_capacity(self.data.len());
        for cell in &self.data {
            let idx = match name_index.get(cell.name.as_str()) {
                Some(&idx) => idx,
                None => {
                    let idx = names.len() as u16;
                    names.push(&cell.name);
                    name_index.insert(&cell.name, idx);
                    idx
                }
            };
            indices.push(idx);
        }

        let cells = self.data.len();
        let names_len: usize = names.iter().map(|n| 2 + n.len()).sum();
        let mut buf = Vec::with_capacity(12 + self.size.y as usize + 2 + names_len + cells * 4);

        // Header
        buf.extend_from_slice(&MAGIC);
        buf.extend_from_slice(&FORMAT_VERSION.to_be_bytes());
        for axis in [self.size.x, self.size.y, self.size.z] {
            buf.extend_from_slice(&(axis as u16).to_be_bytes());
        }
        buf.extend_from_slice(&self.slice_probs());

        // Name table
        buf.extend_from_slice(&(names.len() as u16).to_be_bytes());
        for name in &names {
            buf.extend_from_slice(&(name.len() as u16).to_be_bytes());
            buf.extend_from_slice(name.as_bytes());
        }

        // Cell data
        for idx in indices {
            buf.extend_from_slice(&idx.to_be_bytes());
        }
        buf.extend(self.data.iter().map(|c| c.prob));
        buf.extend(self.data.iter().map(|c| c.param2));

        Ok(buf)
    }

    /// Deserializes a definition from MTSM bytes.
    pub fn from_mts_bytes(data: &[u8]) -> Result<Self, SchematicError> {
        if data.len() < 4 || data[0..4] != MAGIC {
            return Err(SchematicError::InvalidMagic);
        }
        let mut r = Reader { data, pos: 4 };

        let version = r.u16()?;
        if version != FORMAT_VERSION {
            return Err(SchematicError::UnsupportedVersion(version));
        }

        let size = IVec3::new(
            i32::from(r.u16()?),
            i32::from(r.u16()?),
            i32::from(r.u16()?),
        );
        if size.cmpeq(IVec3::ZERO).any() {
            return Err(SchematicError::InvalidSize(size));
        }
        let slice_probs = r.take(size.y as usize)?;
        let yslice_prob = slice_probs
            .iter()
            .enumerate()
            .filter(|&(_, &p)| p != PROB_ALWAYS)
            .map(|(y, &prob)| SliceProb {
                ypos: y as i32,
                prob,
            })
            .collect();

        let name_count = r.u16()? as usize;
        let mut names = Vec::with_capacity(name_count);
        for _ in 0..name_count {
            let len = r.u16()? as usize;
            let bytes = r.take(len)?;
            let name = std::str::from_utf8(bytes).map_err(SchematicError::InvalidName)?;
            names.push(name.to_string());
        }

        let cells = size.x as usize * size.y as usize * size.z as usize;
        let index_bytes = r.take(cells * 2)?;
        let param1 = r.take(cells)?;
        let param2 = r.take(cells)?;

        let mut out = Vec::with_capacity(cells);
        for (i, pair) in index_bytes.chunks_exact(2).enumerate() {
            let index = u16::from_be_bytes([pair[0], pair[1]]);
            let name = names
                .get(index as usize)
                .ok_or(SchematicError::NameIndexOutOfRange {
                    index,
                    count: names.len(),
                })?;
            out.push(SchematicNodeDef {
                name: name.clone(),
                prob: param1[i],
                param2: param2[i],
            });
        }

        Ok(Self {
            size,
            data: out,
            yslice_prob,
        })
    }

    /// Writes the definition to an MTSM file.
    pub fn save_mts(&self, path: &Path) -> Result<(), SchematicError> {
        let bytes = self.to_mts_bytes()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(SchematicError::Io)?;
        }
        std::fs::write(path, bytes).map_err(SchematicError::Io)?;
        tracing::debug!("Saved schematic to {}", path.display());
        Ok(())
    }

    /// Reads a definition from an MTSM file.
    pub fn load_mts(path: &Path) -> Result<Self, SchematicError> {
        let bytes = std::fs::read(path).map_err(SchematicError::Io)?;
        Self::from_mts_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SchematicDef {
        let names = ["default:tree", "air", "default:leaves", "default:tree"];
        SchematicDef {
            size: IVec3::new(2, 2, 1),
            data: names
                .iter()
                .enumerate()
                .map(|(i, n)| SchematicNodeDef {
                    name: n.to_string(),
                    prob: if i == 1 { 0 } else { 200 + i as u8 },
                    param2: i as u8,
                })
                .collect(),
            yslice_prob: vec![SliceProb { ypos: 1, prob: 77 }],
        }
    }

    #[test]
    fn test_header_layout() {
        let bytes = sample().to_mts_bytes().unwrap();
        assert_eq!(&bytes[0..4], b"MTSM");
        assert_eq!(&bytes[4..6], &[0, 3]);
        assert_eq!(&bytes[6..12], &[0, 2, 0, 2, 0, 1]);
        assert_eq!(&bytes[12..14], &[PROB_ALWAYS, 77]);
        // Three distinct names.
        assert_eq!(&bytes[14..16], &[0, 3]);
        let cells = 4;
        let names_len = 2 + 12 + 2 + 3 + 2 + 14;
        assert_eq!(bytes.len(), 16 + names_len + cells * 4);
    }

    #[test]
    fn test_bytes_preserve_definition() {
        let def = sample();
        let back = SchematicDef::from_mts_bytes(&def.to_mts_bytes().unwrap()).unwrap();
        assert_eq!(back, def);
    }

    #[test]
    fn test_invalid_magic() {
        assert!(matches!(
            SchematicDef::from_mts_bytes(b"MTSX\0\x03"),
            Err(SchematicError::InvalidMagic)
        ));
        assert!(matches!(
            SchematicDef::from_mts_bytes(b"MT"),
            Err(SchematicError::InvalidMagic)
        ));
    }

    #[test]
    fn test_unsupported_version() {
        let mut bytes = sample().to_mts_bytes().unwrap();
        bytes[5] = 9;
        assert!(matches!(
            SchematicDef::from_mts_bytes(&bytes),
            Err(SchematicError::UnsupportedVersion(9))
        ));
    }

    #[test]
    fn test_truncated() {
        let bytes = sample().to_mts_bytes().unwrap();
        let cut = &bytes[..bytes.len() - 1];
        assert!(matches!(
            SchematicDef::from_mts_bytes(cut),
            Err(SchematicError::Truncated { .. })
        ));
    }

    #[test]
    fn test_bad_name_index() {
        let mut bytes = sample().to_mts_bytes().unwrap();
        let names_end = 16 + (2 + 12) + (2 + 3) + (2 + 14);
        bytes[names_end] = 0;
        bytes[names_end + 1] = 40;
        assert!(matches!(
            SchematicDef::from_mts_bytes(&bytes),
            Err(SchematicError::NameIndexOutOfRange { index: 40, count: 3 })
        ));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schems").join("tree.mts");
        let def = sample();
        def.save_mts(&path).unwrap();
        assert_eq!(SchematicDef::load_mts(&path).unwrap(), def);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            SchematicDef::load_mts(&dir.path().join("missing.mts")),
            Err(SchematicError::Io(_))
        ));
    }
}
