use flatvec::FileVec;

use crate::config::Configuration;
use crate::protocol::{self, ProtocolError};
use crate::samples::{self, StoreError};
use crate::transport::{Transport, TransportError};

/// Drives the full sample set through the device, one sample at a time.
///
/// The ground-truth labels are written to `<prefix>_y_test.P` up front; the
/// predictions artifact `<prefix>_y_pred.P` is rewritten after every sample,
/// so an aborted run still leaves a valid prefix of the results on disk.
/// Returns the accumulated predictions.
pub fn execute_test(
    com: &mut impl Transport,
    config: &Configuration,
) -> Result<Vec<u8>, RunError> {
    let set = samples::parse_directory(&config.input_path, &config.sample_extension)?;
    log::info!("Loaded {} samples from {:?}", set.len(), config.input_path);

    std::fs::create_dir_all(&config.output_path)?;
    let mut truth =
        FileVec::create(config.output_path.join(format!("{}_y_test.P", config.prefix)))?;
    truth.extend_from_slice(&set.labels)?;

    let mut predictions =
        FileVec::create(config.output_path.join(format!("{}_y_pred.P", config.prefix)))?;

    let timing = config.timing();
    for (index, (sample, label)) in set.samples.iter().zip(&set.labels).enumerate() {
        let prediction = protocol::run_sample(
            com,
            sample,
            &timing,
            config.iterations,
            config.verify_element_echo,
        )?;
        predictions.push(prediction)?;

        log::info!(
            "Sample {}/{}: label {}, prediction {}",
            index + 1,
            set.len(),
            label,
            prediction
        );
    }

    Ok(predictions.as_ref().to_vec())
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
