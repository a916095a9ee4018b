use std::path::{Path, PathBuf};

/// Index-aligned samples and ground-truth labels, in sorted path order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleSet {
    pub samples: Vec<Vec<i8>>,
    pub labels: Vec<u8>,
}

impl SampleSet {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Loads every `*.{extension}` file in `dir` as a (sample, label) pair.
///
/// Entries are sorted by path before parsing, so repeated scans of the same
/// directory yield the same pairs in the same order.
pub fn parse_directory(dir: &Path, extension: &str) -> Result<SampleSet, StoreError> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(extension)
        })
        .collect();
    paths.sort();

    let mut samples = Vec::with_capacity(paths.len());
    let mut labels = Vec::with_capacity(paths.len());
    for path in &paths {
        let (sample, label) = parse_input_file(path)?;
        samples.push(sample);
        labels.push(label);
    }

    Ok(SampleSet { samples, labels })
}

/// Parses one sample file: label from the filename, values from the content.
pub fn parse_input_file(path: &Path) -> Result<(Vec<i8>, u8), StoreError> {
    let label = label_from_path(path)?;

    let bytes = std::fs::read(path)?;
    if bytes.is_empty() {
        return Err(StoreError::EmptySample(path.to_owned()));
    }
    let sample = bytes.into_iter().map(|b| b as i8).collect();

    Ok((sample, label))
}

/// The label is the hex token of the filename stem between the first `_` and
/// the first `~` (e.g. `sample_1F~extra.P` carries label 0x1F).
fn label_from_path(path: &Path) -> Result<u8, StoreError> {
    let malformed = || StoreError::MalformedFilename(path.to_owned());

    let stem = path.file_stem().and_then(|s| s.to_str()).ok_or_else(malformed)?;
    let token = stem.split('_').nth(1).ok_or_else(malformed)?;
    let token = match token.split_once('~') {
        Some((head, _)) => head,
        None => token,
    };

    u8::from_str_radix(token.trim(), 16).map_err(|_| malformed())
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("filename {0:?} does not contain a parsable hex label")]
    MalformedFilename(PathBuf),
    #[error("sample file {0:?} is empty")]
    EmptySample(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
