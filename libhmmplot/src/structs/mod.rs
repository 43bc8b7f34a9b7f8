pub mod hmm;
pub use hmm::Hmm;
pub use hmm::Node;
