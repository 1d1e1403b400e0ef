pub mod dimensions;
pub mod finite_diff;
pub mod init;
pub mod tensor;

pub use dimensions::Dimensions;
pub use init::Initializer;
pub use tensor::Tensor;
