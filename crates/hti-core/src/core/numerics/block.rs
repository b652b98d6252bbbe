use super::NumericsError;

/// Mean and standard error of a time series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockEstimate {
    pub mean: f64,
    pub error: f64,
}

/// Block average of `data` after discarding the first `skip` samples.
///
/// The retained samples are cut into consecutive blocks of `block_size`; a trailing
/// partial block is dropped. The error is the standard deviation of the block means
/// divided by `sqrt(n_blocks)`. A single block yields an error of zero.
pub fn block_average(
    data: &[f64],
    skip: usize,
    block_size: usize,
) -> Result<BlockEstimate, NumericsError> {
    let block_size = block_size.max(1);
    let kept = data.get(skip..).unwrap_or(&[]);
    let n_blocks = kept.len() / block_size;
    if n_blocks == 0 {
        return Err(NumericsError::InsufficientPoints {
            what: "block average",
            required: skip + block_size,
            actual: data.len(),
        });
    }

    let means: Vec<f64> = kept
        .chunks_exact(block_size)
        .map(|block| block.iter().sum::<f64>() / block_size as f64)
        .collect();
    let mean = means.iter().sum::<f64>() / n_blocks as f64;
    let variance = means.iter().map(|m| (m - mean).powi(2)).sum::<f64>() / n_blocks as f64;
    let error = (variance / n_blocks as f64).sqrt();

    if !mean.is_finite() || !error.is_finite() {
        return Err(NumericsError::NonFinite("block average"));
    }
    Ok(BlockEstimate { mean, error })
}

/// One representative sample per block, used where roughly uncorrelated samples are needed.
pub fn block_subsample(data: &[f64], skip: usize, block_size: usize) -> Vec<f64> {
    let block_size = block_size.max(1);
    data.get(skip..)
        .unwrap_or(&[])
        .chunks_exact(block_size)
        .map(|block| block[0])
        .collect()
}
