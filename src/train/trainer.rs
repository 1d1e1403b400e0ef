use crate::data::Sample;
use crate::error::Result;
use crate::loss::LossType;
use crate::network::Network;
use crate::numeric::{NumericPolicy, Scalar};

/// Runs forward, loss and backward for one sample, leaving its weight
/// gradients in the layers' accumulators. Returns the sample's loss.
pub fn train_sample<P: NumericPolicy>(
    network: &mut Network<P>,
    sample: &Sample<P>,
    loss: LossType,
) -> Result<f64> {
    let output = network.forward(&sample.input)?;
    let value = loss.compute::<P>(&output, &sample.target)?;
    let gradient = loss.gradient::<P>(&output, &sample.target)?;
    network.backward(&gradient)?;
    Ok(value.to_f64_lossy())
}
