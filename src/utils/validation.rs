use crate::config::TrainingConfig;
use crate::error::{RecError, Result};

/// Checks that every required column is present in a CSV header row.
pub fn require_columns(
    headers: &csv::StringRecord,
    required: &[&str],
    table: &'static str,
) -> Result<()> {
    for column in required {
        if !headers.iter().any(|h| h == *column) {
            return Err(RecError::Schema {
                table,
                column: column.to_string(),
            });
        }
    }

    Ok(())
}

pub fn validate_top_n(n: usize) -> Result<()> {
    if n == 0 {
        return Err(RecError::InvalidRequest(
            "number of recommendations must be greater than 0".to_string(),
        ));
    }

    if n > 1000 {
        return Err(RecError::InvalidRequest(
            "number of recommendations too large (max 1000)".to_string(),
        ));
    }

    Ok(())
}

pub fn validate_training(config: &TrainingConfig) -> Result<()> {
    if config.embedding_dim == 0 {
        return Err(RecError::Config(
            "embedding_dim must be greater than 0".to_string(),
        ));
    }

    if config.epochs == 0 {
        return Err(RecError::Config("epochs must be greater than 0".to_string()));
    }

    if config.batch_size == 0 {
        return Err(RecError::Config(
            "batch_size must be greater than 0".to_string(),
        ));
    }

    if config.learning_rate <= 0.0 {
        return Err(RecError::Config(
            "learning_rate must be greater than 0".to_string(),
        ));
    }

    // a split of 1.0 would leave nothing to train on
    if !(0.0..1.0).contains(&config.validation_split) {
        return Err(RecError::Config(
            "validation_split must be in [0.0, 1.0)".to_string(),
        ));
    }

    Ok(())
}
