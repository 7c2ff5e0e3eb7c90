// Job recommendation engine.
// Encodes a preference query into the catalog's feature space and ranks
// postings by cosine similarity. No I/O after the artifact bundle is loaded.

pub mod artifacts;
pub mod encoder;
pub mod handlers;
pub mod scorer;
pub mod vector;
