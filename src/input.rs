use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

/// Reads a whole input, either a file or stdin for "-".
pub fn read_input<P: AsRef<Path>>(input_path: P) -> Result<Vec<u8>> {
    let path = input_path.as_ref();
    let mut data = Vec::new();

    if path.to_string_lossy() == "-" {
        io::stdin().lock().read_to_end(&mut data)?;
    } else {
        let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
        BufReader::new(file).read_to_end(&mut data)?;
    }

    Ok(data)
}

/// Expands the packet inputs into a list of files. Directories contribute
/// their regular files sorted by name; files are kept in the order given.
pub fn collect_packet_paths(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for input in inputs {
        if input.is_dir() {
            let mut entries = fs::read_dir(input)
                .with_context(|| format!("cannot read directory {}", input.display()))?
                .map(|entry| entry.map(|e| e.path()))
                .collect::<io::Result<Vec<_>>>()?;
            entries.retain(|p| p.is_file());
            entries.sort();

            log::debug!("{}: {} packet files", input.display(), entries.len());
            paths.extend(entries);
        } else {
            paths.push(input.clone());
        }
    }

    if paths.is_empty() {
        bail!("no packet files found");
    }

    Ok(paths)
}

/// Yields the contents of packet files one at a time.
pub struct PacketReader {
    paths: std::vec::IntoIter<PathBuf>,
}

impl PacketReader {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths: paths.into_iter(),
        }
    }
}

impl Iterator for PacketReader {
    type Item = Result<(PathBuf, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.paths.next()?;
        Some(read_input(&path).map(|data| (path, data)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.paths.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_directory_name_order() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path();
        fs::write(dir.join("0002.alac"), [2]).unwrap();
        fs::write(dir.join("0010.alac"), [10]).unwrap();
        fs::write(dir.join("0001.alac"), [1]).unwrap();
        fs::create_dir(dir.join("nested")).unwrap();

        let extra = dir.join("nested").join("extra");
        fs::write(&extra, [99]).unwrap();

        let paths = collect_packet_paths(&[dir.to_path_buf(), extra]).unwrap();
        let packets: Vec<Vec<u8>> = PacketReader::new(paths)
            .map(|p| p.map(|(_, data)| data))
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(packets, vec![vec![1], vec![2], vec![10], vec![99]]);
    }

    #[test]
    fn test_missing_inputs() {
        let tmp = tempdir().unwrap();

        assert!(collect_packet_paths(&[tmp.path().to_path_buf()]).is_err());

        let mut reader = PacketReader::new(vec![tmp.path().join("absent")]);
        assert!(matches!(reader.next(), Some(Err(_))));
        assert!(reader.next().is_none());
    }
}
